//! # Keyed child collections
//!
//! Some entities own a child table of `(owner, key) -> value` rows. This
//! module exposes such a table as a mutable associative container: get,
//! set, delete, contains, length and iteration over one owner's bindings.
//! Host variables are the canonical instance.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::marker::PhantomData;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Value,
};
use serde_json::Value as JsonValue;

use crate::error::RepositoryError;

/// Maximum key length, matching the `VARCHAR(255)` key column.
pub const MAX_KEY_LEN: usize = 255;

/// An entity whose rows are key/value bindings belonging to an owner row.
pub trait KeyedChild: EntityTrait {
    /// Primary key type of the owning entity.
    type Owner: Into<Value> + Clone + Display + Send + Sync;

    /// Name used in not-found errors, e.g. `"host variable"`.
    const NAME: &'static str;

    fn owner_column() -> Self::Column;
    fn key_column() -> Self::Column;
    fn value_column() -> Self::Column;
    fn updated_at_column() -> Self::Column;

    fn binding(
        owner: Self::Owner,
        key: String,
        value: JsonValue,
        now: DateTimeWithTimeZone,
    ) -> Self::ActiveModel;

    fn key(model: &Self::Model) -> &str;
    fn value(model: Self::Model) -> JsonValue;
}

/// Associative-container view over a [`KeyedChild`] table.
///
/// Every operation takes the connection explicitly so it can run on the
/// pool or inside a caller's transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyedChildren<E> {
    _entity: PhantomData<E>,
}

impl<E> KeyedChildren<E>
where
    E: KeyedChild + 'static,
    E::Model: IntoActiveModel<E::ActiveModel> + Send + Sync + 'static,
    E::ActiveModel: ActiveModelTrait<Entity = E> + Send,
{
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    /// Reads the value bound to `key`; `NotFound` when absent.
    pub async fn get<C>(
        &self,
        db: &C,
        owner: E::Owner,
        key: &str,
    ) -> Result<JsonValue, RepositoryError>
    where
        C: ConnectionTrait,
    {
        E::find()
            .filter(E::owner_column().eq(owner.clone()))
            .filter(E::key_column().eq(key))
            .one(db)
            .await?
            .map(E::value)
            .ok_or_else(|| RepositoryError::not_found(E::NAME, format!("{owner}/{key}")))
    }

    /// Binds `key` to `value`, creating the row or overwriting its value.
    pub async fn set<C>(
        &self,
        db: &C,
        owner: E::Owner,
        key: &str,
        value: JsonValue,
    ) -> Result<(), RepositoryError>
    where
        C: ConnectionTrait,
    {
        validate_key(key)?;

        let row = E::binding(owner, key.to_string(), value, Utc::now().into());
        E::insert(row)
            .on_conflict(
                OnConflict::columns([E::owner_column(), E::key_column()])
                    .update_columns([E::value_column(), E::updated_at_column()])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        Ok(())
    }

    /// Removes the binding for `key`; `NotFound` when absent.
    pub async fn delete<C>(
        &self,
        db: &C,
        owner: E::Owner,
        key: &str,
    ) -> Result<(), RepositoryError>
    where
        C: ConnectionTrait,
    {
        let result = E::delete_many()
            .filter(E::owner_column().eq(owner.clone()))
            .filter(E::key_column().eq(key))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found(E::NAME, format!("{owner}/{key}")));
        }

        Ok(())
    }

    /// Removes every binding of `owner`, returning how many were removed.
    pub async fn clear<C>(&self, db: &C, owner: E::Owner) -> Result<u64, RepositoryError>
    where
        C: ConnectionTrait,
    {
        let result = E::delete_many()
            .filter(E::owner_column().eq(owner))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn contains<C>(
        &self,
        db: &C,
        owner: E::Owner,
        key: &str,
    ) -> Result<bool, RepositoryError>
    where
        C: ConnectionTrait,
    {
        let count = E::find()
            .filter(E::owner_column().eq(owner))
            .filter(E::key_column().eq(key))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    /// Number of bindings held by `owner`.
    pub async fn len<C>(&self, db: &C, owner: E::Owner) -> Result<u64, RepositoryError>
    where
        C: ConnectionTrait,
    {
        Ok(E::find()
            .filter(E::owner_column().eq(owner))
            .count(db)
            .await?)
    }

    /// Keys of `owner` in ascending order.
    pub async fn keys<C>(&self, db: &C, owner: E::Owner) -> Result<Vec<String>, RepositoryError>
    where
        C: ConnectionTrait,
    {
        Ok(E::find()
            .select_only()
            .column(E::key_column())
            .filter(E::owner_column().eq(owner))
            .order_by_asc(E::key_column())
            .into_tuple::<String>()
            .all(db)
            .await?)
    }

    /// All bindings of `owner` as an ordered map.
    pub async fn entries<C>(
        &self,
        db: &C,
        owner: E::Owner,
    ) -> Result<BTreeMap<String, JsonValue>, RepositoryError>
    where
        C: ConnectionTrait,
    {
        let rows = E::find()
            .filter(E::owner_column().eq(owner))
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (E::key(&row).to_string(), E::value(row)))
            .collect())
    }
}

/// Keys must be non-empty and fit the key column.
pub fn validate_key(key: &str) -> Result<(), RepositoryError> {
    if key.trim().is_empty() {
        return Err(RepositoryError::validation_error("key", "key cannot be empty"));
    }
    if key.chars().count() > MAX_KEY_LEN {
        return Err(RepositoryError::validation_error(
            "key",
            format!("key cannot exceed {MAX_KEY_LEN} characters"),
        ));
    }
    Ok(())
}
