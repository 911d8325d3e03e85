//! # Repository Layer
//!
//! Repositories wrap SeaORM operations for the inventory entities. Each one
//! borrows a connection, which may be the pool or an open transaction, so
//! several repositories can take part in one unit of work.

pub mod access_secret;
pub mod host;
pub mod keyed;
pub mod tag;
pub mod tenant;

pub use access_secret::{AccessSecretRepository, NewAccessSecret};
pub use host::{HostRepository, HostUpdate, NewHost};
pub use keyed::{KeyedChild, KeyedChildren};
pub use tag::TagRepository;
pub use tenant::{NewTenant, TenantRepository};
