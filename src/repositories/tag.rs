//! Tag repository for database operations
//!
//! Tags are global, keyed by name. Deleting a tag removes its host
//! associations and leaves the hosts untouched.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::db;
use crate::error::RepositoryError;
use crate::models::tag::{self, Entity as Tag, TagKind};
use crate::models::{host, host_tagging};

/// Maximum tag name length, matching the `VARCHAR(255)` primary key.
pub const MAX_TAG_NAME_LEN: usize = 255;

/// Repository for tag database operations
pub struct TagRepository<'a, C> {
    db: &'a C,
}

impl<'a, C> TagRepository<'a, C>
where
    C: ConnectionTrait + TransactionTrait,
{
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Creates a tag; `UniqueViolation` when the name is taken.
    pub async fn create(&self, name: &str) -> Result<tag::Model, RepositoryError> {
        validate_tag_name(name)?;

        let now = Utc::now();
        let created = tag::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await?;

        tracing::info!(tag = %created.name, kind = ?created.kind(), "Tag created");
        Ok(created)
    }

    /// Returns the named tag, creating it first when missing.
    pub async fn ensure(&self, name: &str) -> Result<tag::Model, RepositoryError> {
        validate_tag_name(name)?;

        let now = Utc::now();
        Tag::insert(tag::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        })
        .on_conflict(OnConflict::column(tag::Column::Name).do_nothing().to_owned())
        .exec_without_returning(self.db)
        .await?;

        self.get(name).await
    }

    pub async fn find(&self, name: &str) -> Result<Option<tag::Model>, RepositoryError> {
        Ok(Tag::find_by_id(name.to_string()).one(self.db).await?)
    }

    pub async fn get(&self, name: &str) -> Result<tag::Model, RepositoryError> {
        self.find(name)
            .await?
            .ok_or_else(|| RepositoryError::not_found("tag", name))
    }

    /// All tags ordered by name
    pub async fn list(&self) -> Result<Vec<tag::Model>, RepositoryError> {
        Ok(Tag::find()
            .order_by_asc(tag::Column::Name)
            .all(self.db)
            .await?)
    }

    /// Tags whose name starts with `prefix`, ordered by name
    pub async fn list_with_prefix(&self, prefix: &str) -> Result<Vec<tag::Model>, RepositoryError> {
        let tags = Tag::find()
            .filter(tag::Column::Name.starts_with(prefix))
            .order_by_asc(tag::Column::Name)
            .all(self.db)
            .await?;

        // LIKE treats `_` as a wildcard; keep literal prefix matches only.
        Ok(tags
            .into_iter()
            .filter(|tag| tag.name.starts_with(prefix))
            .collect())
    }

    /// Tags classified as `kind` by their name prefix
    pub async fn list_by_kind(&self, kind: TagKind) -> Result<Vec<tag::Model>, RepositoryError> {
        let tags = match kind.prefix() {
            Some(prefix) => self.list_with_prefix(prefix).await?,
            None => self.list().await?,
        };
        Ok(tags.into_iter().filter(|tag| tag.kind() == kind).collect())
    }

    /// Hosts carrying the tag, ordered by ID
    pub async fn hosts(&self, name: &str) -> Result<Vec<host::Model>, RepositoryError> {
        let tag = self.get(name).await?;
        Ok(tag
            .find_related(host::Entity)
            .order_by_asc(host::Column::Id)
            .all(self.db)
            .await?)
    }

    /// Deletes the tag together with its host associations.
    pub async fn delete(&self, name: &str) -> Result<(), RepositoryError> {
        let txn = db::begin(self.db).await?;
        let result = delete_tag(&txn, name).await;
        let untagged = db::finish(txn, result).await?;

        tracing::info!(tag = %name, untagged_hosts = untagged, "Tag deleted");
        Ok(())
    }
}

async fn delete_tag(txn: &DatabaseTransaction, name: &str) -> Result<u64, RepositoryError> {
    let untagged = host_tagging::Entity::delete_many()
        .filter(host_tagging::Column::TagName.eq(name))
        .exec(txn)
        .await?
        .rows_affected;

    let deleted = Tag::delete_by_id(name.to_string()).exec(txn).await?;
    if deleted.rows_affected == 0 {
        return Err(RepositoryError::not_found("tag", name));
    }

    Ok(untagged)
}

/// Tag names must be non-empty and fit the name column.
pub fn validate_tag_name(name: &str) -> Result<(), RepositoryError> {
    if name.trim().is_empty() {
        return Err(RepositoryError::validation_error(
            "tag name",
            "tag name cannot be empty",
        ));
    }
    if name.chars().count() > MAX_TAG_NAME_LEN {
        return Err(RepositoryError::validation_error(
            "tag name",
            format!("tag name cannot exceed {MAX_TAG_NAME_LEN} characters"),
        ));
    }
    Ok(())
}
