//! # Inventory Schema
//!
//! SeaORM entities for the multi-tenant host inventory: tenants, hosts,
//! per-host variables, tags and shared access secrets.
//!
//! Only the inventory is modeled here. Workflow definitions and the
//! versioned configuration that interprets inventory data live in external
//! systems which merely reference these records.

pub mod access_secret;
pub mod describe;
pub mod host;
pub mod host_tagging;
pub mod host_variable;
pub mod tag;
pub mod tenant;

pub use access_secret::Entity as AccessSecret;
pub use describe::Describe;
pub use host::{Entity as Host, IpAddress};
pub use host_tagging::Entity as HostTagging;
pub use host_variable::Entity as HostVariable;
pub use tag::{Entity as Tag, TagKind};
pub use tenant::Entity as Tenant;
