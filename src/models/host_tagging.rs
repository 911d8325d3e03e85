//! Association between hosts and tags.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use super::describe::{Describe, describe_fields};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "host_tagging")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub host_id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub tag_name: String,
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
    #[sea_orm(
        belongs_to = "super::tag::Entity",
        from = "Column::TagName",
        to = "super::tag::Column::Name",
        on_delete = "Cascade"
    )]
    Tag,
}

impl Related<super::host::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Host.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Describe for Model {
    fn describe(&self) -> String {
        describe_fields(
            "HostTagging",
            &[("host_id", &self.host_id), ("tag_name", &self.tag_name)],
        )
    }
}
