//! Tag entity model
//!
//! Tags label hosts with groupings such as automation groups, regions and
//! cells, as well as arbitrary other labels. Rather than subtyping, the kind
//! of a tag is carried by a name prefix (`group-`, `region-`, `cell-`).
//! Hierarchies of groups, if any, are described outside the inventory.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::describe::{Describe, describe_fields};

/// Globally named tag (not tenant-scoped)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn kind(&self) -> TagKind {
        TagKind::of(&self.name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::host_tagging::Entity")]
    HostTagging,
}

impl Related<super::host_tagging::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HostTagging.def()
    }
}

impl Related<super::host::Entity> for Entity {
    fn to() -> RelationDef {
        super::host_tagging::Relation::Host.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::host_tagging::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Describe for Model {
    fn describe(&self) -> String {
        describe_fields("Tag", &[("name", &self.name)])
    }
}

/// Tag kind derived from the name prefix.
///
/// The prefix is a naming convention only; any name is a valid tag and
/// names without a known prefix classify as [`TagKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Group,
    Region,
    Cell,
    Other,
}

impl TagKind {
    const PREFIXED: [TagKind; 3] = [TagKind::Group, TagKind::Region, TagKind::Cell];

    /// Classifies a tag name by its prefix.
    pub fn of(name: &str) -> Self {
        Self::PREFIXED
            .into_iter()
            .find(|kind| kind.prefix().is_some_and(|prefix| name.starts_with(prefix)))
            .unwrap_or(TagKind::Other)
    }

    pub fn prefix(self) -> Option<&'static str> {
        match self {
            TagKind::Group => Some("group-"),
            TagKind::Region => Some("region-"),
            TagKind::Cell => Some("cell-"),
            TagKind::Other => None,
        }
    }

    /// Builds a conventional tag name, e.g. `TagKind::Region.tag_name("us-east")`
    /// yields `region-us-east`.
    pub fn tag_name(self, suffix: &str) -> String {
        format!("{}{}", self.prefix().unwrap_or_default(), suffix)
    }
}
