//! Host variable entity model
//!
//! One row is one key/value binding for one host, analogous to per-node
//! variable overrides in automation tooling. Values are arbitrary JSON.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

use super::describe::{Describe, describe_fields};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "host_variables")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub host_id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,

    #[sea_orm(column_type = "Json", nullable)]
    pub value: Option<JsonValue>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::host::Entity",
        from = "Column::HostId",
        to = "super::host::Column::Id",
        on_delete = "Cascade"
    )]
    Host,
}

impl Related<super::host::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Host.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Describe for Model {
    fn describe(&self) -> String {
        let value = self.value.clone().unwrap_or(JsonValue::Null);
        describe_fields("HostVariables", &[("key", &self.key), ("value", &value)])
    }
}
