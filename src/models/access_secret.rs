//! Access secret entity model
//!
//! An access secret is a credential for reaching one or more hosts of a
//! single tenant. For now it is a PEM-encoded certificate that may wrap an
//! encrypted private key; unlocking it is the job of an external secret
//! service, so the blob is stored and returned untouched.
//!
//! Secrets such as vault files belong to the versioned configuration, not to
//! the inventory.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::describe::{Describe, describe_fields};

/// Shareable credential owned by exactly one tenant
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "access_secrets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning tenant
    pub tenant_id: Uuid,

    /// Opaque certificate blob
    #[sea_orm(column_type = "Text", nullable)]
    pub cert: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
    #[sea_orm(has_many = "super::host::Entity")]
    Host,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::host::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Host.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Describe for Model {
    fn describe(&self) -> String {
        describe_fields("AccessSecret", &[("id", &self.id)])
    }
}
