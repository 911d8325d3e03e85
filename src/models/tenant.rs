//! Tenant entity model
//!
//! This module contains the SeaORM entity model for the tenants table,
//! the isolation boundary for every other inventory record.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::describe::{Describe, describe_fields};

/// Tenant entity representing multi-tenant isolation
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    /// Unique identifier for the tenant (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name for the tenant (optional)
    pub name: Option<String>,

    /// Timestamp when the tenant was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the tenant was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::host::Entity")]
    Host,
    #[sea_orm(has_many = "super::access_secret::Entity")]
    AccessSecret,
}

impl Related<super::host::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Host.def()
    }
}

impl Related<super::access_secret::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessSecret.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Describe for Model {
    fn describe(&self) -> String {
        describe_fields("Tenant", &[("id", &self.id)])
    }
}
