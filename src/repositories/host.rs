//! Host repository for database operations
//!
//! Hosts are tenant-scoped. Besides keyed CRUD this repository exposes the
//! per-host variable mapping, host tagging, and the `with_characteristic`
//! lookup over variable bindings.

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Alias, Expr, Func, OnConflict, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::db;
use crate::error::RepositoryError;
use crate::models::host::{self, Entity as Host, IpAddress};
use crate::models::{access_secret, host_tagging, host_variable, tag};
use crate::repositories::keyed::{KeyedChild, KeyedChildren};

/// Maximum hostname length, matching the `VARCHAR(255)` column.
pub const MAX_HOSTNAME_LEN: usize = 255;

/// Request data for creating a host
#[derive(Debug, Clone)]
pub struct NewHost {
    pub tenant_id: Uuid,
    pub hostname: String,
    pub ip_address: IpAddr,
    /// Shared credential; must belong to the same tenant
    pub access_secret_id: Option<i32>,
    /// Defaults to `true`
    pub active: Option<bool>,
}

/// Partial update of a host. `None` leaves a field unchanged;
/// `access_secret_id: Some(None)` detaches the secret.
#[derive(Debug, Clone, Default)]
pub struct HostUpdate {
    pub hostname: Option<String>,
    pub ip_address: Option<IpAddr>,
    pub active: Option<bool>,
    pub access_secret_id: Option<Option<i32>>,
}

impl KeyedChild for host_variable::Entity {
    type Owner = i32;

    const NAME: &'static str = "host variable";

    fn owner_column() -> host_variable::Column {
        host_variable::Column::HostId
    }

    fn key_column() -> host_variable::Column {
        host_variable::Column::Key
    }

    fn value_column() -> host_variable::Column {
        host_variable::Column::Value
    }

    fn updated_at_column() -> host_variable::Column {
        host_variable::Column::UpdatedAt
    }

    fn binding(
        owner: i32,
        key: String,
        value: JsonValue,
        now: DateTimeWithTimeZone,
    ) -> host_variable::ActiveModel {
        host_variable::ActiveModel {
            host_id: Set(owner),
            key: Set(key),
            value: Set(Some(value)),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    fn key(model: &host_variable::Model) -> &str {
        &model.key
    }

    fn value(model: host_variable::Model) -> JsonValue {
        model.value.unwrap_or(JsonValue::Null)
    }
}

/// Repository for host database operations
pub struct HostRepository<'a, C> {
    db: &'a C,
    variables: KeyedChildren<host_variable::Entity>,
}

impl<'a, C> HostRepository<'a, C>
where
    C: ConnectionTrait + TransactionTrait,
{
    pub fn new(db: &'a C) -> Self {
        Self {
            db,
            variables: KeyedChildren::new(),
        }
    }

    /// Creates a host.
    ///
    /// Fails with `UniqueViolation` on a duplicate hostname or IP address
    /// within the tenant, `ForeignKeyViolation` for a missing tenant or
    /// secret, and `TenantMismatch` when the secret belongs to another tenant.
    pub async fn create(&self, request: NewHost) -> Result<host::Model, RepositoryError> {
        validate_hostname(&request.hostname)?;

        let txn = db::begin(self.db).await?;
        let result = insert_host(&txn, request).await;
        let created = db::finish(txn, result).await?;

        tracing::info!(
            host_id = created.id,
            tenant_id = %created.tenant_id,
            hostname = %created.hostname,
            "Host created"
        );
        Ok(created)
    }

    pub async fn find(&self, id: i32) -> Result<Option<host::Model>, RepositoryError> {
        Ok(Host::find_by_id(id).one(self.db).await?)
    }

    pub async fn get(&self, id: i32) -> Result<host::Model, RepositoryError> {
        self.find(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("host", id))
    }

    pub async fn find_by_hostname(
        &self,
        tenant_id: Uuid,
        hostname: &str,
    ) -> Result<Option<host::Model>, RepositoryError> {
        Ok(Host::find()
            .filter(host::Column::TenantId.eq(tenant_id))
            .filter(host::Column::Hostname.eq(hostname))
            .one(self.db)
            .await?)
    }

    pub async fn find_by_ip_address(
        &self,
        tenant_id: Uuid,
        ip_address: IpAddr,
    ) -> Result<Option<host::Model>, RepositoryError> {
        let backend = self.db.get_database_backend();
        Ok(Host::find()
            .filter(host::Column::TenantId.eq(tenant_id))
            .filter(
                Expr::col((Host, host::Column::IpAddress)).eq(ip_address_expr(backend, ip_address)),
            )
            .one(self.db)
            .await?)
    }

    /// Lists a tenant's hosts ordered by ID
    pub async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<host::Model>, RepositoryError> {
        Ok(Host::find()
            .filter(host::Column::TenantId.eq(tenant_id))
            .order_by_asc(host::Column::Id)
            .all(self.db)
            .await?)
    }

    /// Applies a partial update; the secret's tenant is re-checked when the
    /// secret changes.
    pub async fn update(&self, id: i32, changes: HostUpdate) -> Result<host::Model, RepositoryError> {
        if let Some(hostname) = changes.hostname.as_deref() {
            validate_hostname(hostname)?;
        }

        let txn = db::begin(self.db).await?;
        let result = update_host(&txn, id, changes).await;
        let updated = db::finish(txn, result).await?;

        tracing::info!(host_id = updated.id, "Host updated");
        Ok(updated)
    }

    /// Sets the administrative flag.
    pub async fn set_active(&self, id: i32, active: bool) -> Result<host::Model, RepositoryError> {
        self.update(
            id,
            HostUpdate {
                active: Some(active),
                ..Default::default()
            },
        )
        .await
    }

    /// Attaches (or with `None`, detaches) a shared access secret.
    pub async fn assign_access_secret(
        &self,
        id: i32,
        access_secret_id: Option<i32>,
    ) -> Result<host::Model, RepositoryError> {
        self.update(
            id,
            HostUpdate {
                access_secret_id: Some(access_secret_id),
                ..Default::default()
            },
        )
        .await
    }

    /// Deletes the host with its variable bindings and tag associations.
    pub async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let txn = db::begin(self.db).await?;
        let result = self.delete_host(&txn, id).await;
        db::finish(txn, result).await?;

        tracing::info!(host_id = id, "Host deleted");
        Ok(())
    }

    async fn delete_host(&self, txn: &DatabaseTransaction, id: i32) -> Result<(), RepositoryError> {
        self.variables.clear(txn, id).await?;

        host_tagging::Entity::delete_many()
            .filter(host_tagging::Column::HostId.eq(id))
            .exec(txn)
            .await?;

        let deleted = Host::delete_by_id(id).exec(txn).await?;
        if deleted.rows_affected == 0 {
            return Err(RepositoryError::not_found("host", id));
        }

        Ok(())
    }

    /// Reads a variable; `NotFound` when the key is not bound.
    pub async fn get_variable(&self, host_id: i32, key: &str) -> Result<JsonValue, RepositoryError> {
        self.variables.get(self.db, host_id, key).await
    }

    /// Reads a variable and decodes it into `T`.
    pub async fn get_variable_as<T>(&self, host_id: i32, key: &str) -> Result<T, RepositoryError>
    where
        T: DeserializeOwned,
    {
        let value = self.get_variable(host_id, key).await?;
        serde_json::from_value(value)
            .map_err(|err| RepositoryError::validation_error("variable value", err.to_string()))
    }

    /// Binds `key` to `value`, overwriting any previous value.
    ///
    /// `ForeignKeyViolation` when the host does not exist; `Validation` when
    /// the value cannot be represented as JSON.
    pub async fn set_variable<T>(
        &self,
        host_id: i32,
        key: &str,
        value: &T,
    ) -> Result<(), RepositoryError>
    where
        T: Serialize + ?Sized,
    {
        let value = to_json(value)?;
        self.variables.set(self.db, host_id, key, value).await?;

        tracing::debug!(host_id, key, "Host variable set");
        Ok(())
    }

    /// Binds several variables at once; either all are written or none.
    pub async fn set_variables<I, K, V>(&self, host_id: i32, entries: I) -> Result<(), RepositoryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let mut bindings = Vec::new();
        for (key, value) in entries {
            bindings.push((key.as_ref().to_string(), to_json(&value)?));
        }

        let txn = db::begin(self.db).await?;
        let result = self.write_variables(&txn, host_id, bindings).await;
        let written = db::finish(txn, result).await?;

        tracing::debug!(host_id, written, "Host variables set");
        Ok(())
    }

    async fn write_variables(
        &self,
        txn: &DatabaseTransaction,
        host_id: i32,
        bindings: Vec<(String, JsonValue)>,
    ) -> Result<usize, RepositoryError> {
        let count = bindings.len();
        for (key, value) in bindings {
            self.variables.set(txn, host_id, &key, value).await?;
        }
        Ok(count)
    }

    /// Removes a variable; `NotFound` when the key is not bound.
    pub async fn delete_variable(&self, host_id: i32, key: &str) -> Result<(), RepositoryError> {
        self.variables.delete(self.db, host_id, key).await?;

        tracing::debug!(host_id, key, "Host variable deleted");
        Ok(())
    }

    pub async fn contains_variable(&self, host_id: i32, key: &str) -> Result<bool, RepositoryError> {
        self.variables.contains(self.db, host_id, key).await
    }

    pub async fn variable_count(&self, host_id: i32) -> Result<u64, RepositoryError> {
        self.variables.len(self.db, host_id).await
    }

    /// Bound keys in ascending order
    pub async fn variable_keys(&self, host_id: i32) -> Result<Vec<String>, RepositoryError> {
        self.variables.keys(self.db, host_id).await
    }

    /// The host's full variable mapping
    pub async fn list_variables(
        &self,
        host_id: i32,
    ) -> Result<BTreeMap<String, JsonValue>, RepositoryError> {
        self.variables.entries(self.db, host_id).await
    }

    /// Hosts whose variables bind `key` to exactly `value`, ordered by ID.
    ///
    /// Hosts are joined to their binding for `key` in one query; the values
    /// are compared as JSON here, since JSON equality differs per backend.
    pub async fn with_characteristic(
        &self,
        key: &str,
        value: &JsonValue,
    ) -> Result<Vec<host::Model>, RepositoryError> {
        self.hosts_with_characteristic(None, key, value).await
    }

    /// Like [`Self::with_characteristic`], restricted to one tenant.
    pub async fn with_characteristic_in_tenant(
        &self,
        tenant_id: Uuid,
        key: &str,
        value: &JsonValue,
    ) -> Result<Vec<host::Model>, RepositoryError> {
        self.hosts_with_characteristic(Some(tenant_id), key, value)
            .await
    }

    async fn hosts_with_characteristic(
        &self,
        tenant_id: Option<Uuid>,
        key: &str,
        value: &JsonValue,
    ) -> Result<Vec<host::Model>, RepositoryError> {
        let mut query = Host::find()
            .inner_join(host_variable::Entity)
            .select_also(host_variable::Entity)
            .filter(host_variable::Column::Key.eq(key));
        if let Some(tenant_id) = tenant_id {
            query = query.filter(host::Column::TenantId.eq(tenant_id));
        }

        let rows = query.order_by_asc(host::Column::Id).all(self.db).await?;
        Ok(rows
            .into_iter()
            .filter_map(|(host, binding)| {
                let bound = <host_variable::Entity as KeyedChild>::value(binding?);
                (bound == *value).then_some(host)
            })
            .collect())
    }

    /// Tags the host; tagging twice is a no-op.
    ///
    /// `ForeignKeyViolation` when the host or tag does not exist.
    pub async fn tag(&self, host_id: i32, tag_name: &str) -> Result<(), RepositoryError> {
        host_tagging::Entity::insert(host_tagging::ActiveModel {
            host_id: Set(host_id),
            tag_name: Set(tag_name.to_string()),
        })
        .on_conflict(
            OnConflict::columns([host_tagging::Column::HostId, host_tagging::Column::TagName])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(self.db)
        .await?;

        tracing::debug!(host_id, tag = %tag_name, "Host tagged");
        Ok(())
    }

    /// Removes a tag from the host; `NotFound` when the host is not tagged.
    pub async fn untag(&self, host_id: i32, tag_name: &str) -> Result<(), RepositoryError> {
        let result = host_tagging::Entity::delete_many()
            .filter(host_tagging::Column::HostId.eq(host_id))
            .filter(host_tagging::Column::TagName.eq(tag_name))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found(
                "host tag",
                format!("{host_id}/{tag_name}"),
            ));
        }

        tracing::debug!(host_id, tag = %tag_name, "Host untagged");
        Ok(())
    }

    /// Tags on the host ordered by name
    pub async fn tags(&self, host_id: i32) -> Result<Vec<tag::Model>, RepositoryError> {
        let host = self.get(host_id).await?;
        Ok(host
            .find_related(tag::Entity)
            .order_by_asc(tag::Column::Name)
            .all(self.db)
            .await?)
    }
}

async fn insert_host(
    txn: &DatabaseTransaction,
    request: NewHost,
) -> Result<host::Model, RepositoryError> {
    if let Some(secret_id) = request.access_secret_id {
        ensure_secret_tenant(txn, request.tenant_id, secret_id).await?;
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let backend = txn.get_database_backend();
    let insert = Query::insert()
        .into_table(Host)
        .columns([
            host::Column::TenantId,
            host::Column::AccessSecretId,
            host::Column::Hostname,
            host::Column::IpAddress,
            host::Column::Active,
            host::Column::CreatedAt,
            host::Column::UpdatedAt,
        ])
        .values([
            request.tenant_id.into(),
            request.access_secret_id.into(),
            request.hostname.into(),
            ip_address_expr(backend, request.ip_address),
            request.active.unwrap_or(true).into(),
            now.into(),
            now.into(),
        ])
        .map_err(|err| DbErr::Custom(err.to_string()))?
        .returning_col(host::Column::Id)
        .to_owned();

    let row = txn
        .query_one(backend.build(&insert))
        .await?
        .ok_or(DbErr::RecordNotInserted)?;
    let id: i32 = row.try_get("", "id")?;

    Host::find_by_id(id)
        .one(txn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("host", id))
}

async fn update_host(
    txn: &DatabaseTransaction,
    id: i32,
    changes: HostUpdate,
) -> Result<host::Model, RepositoryError> {
    let existing = Host::find_by_id(id)
        .one(txn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("host", id))?;

    if let Some(Some(secret_id)) = changes.access_secret_id {
        ensure_secret_tenant(txn, existing.tenant_id, secret_id).await?;
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut update = Host::update_many()
        .col_expr(host::Column::UpdatedAt, Expr::value(now))
        .filter(host::Column::Id.eq(id));
    if let Some(hostname) = changes.hostname {
        update = update.col_expr(host::Column::Hostname, Expr::value(hostname));
    }
    if let Some(ip_address) = changes.ip_address {
        let backend = txn.get_database_backend();
        update = update.col_expr(host::Column::IpAddress, ip_address_expr(backend, ip_address));
    }
    if let Some(flag) = changes.active {
        update = update.col_expr(host::Column::Active, Expr::value(flag));
    }
    if let Some(access_secret_id) = changes.access_secret_id {
        update = update.col_expr(host::Column::AccessSecretId, Expr::value(access_secret_id));
    }
    update.exec(txn).await?;

    Host::find_by_id(id)
        .one(txn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("host", id))
}

/// Binds an address for the `ip_address` column, which is an `inet` on
/// Postgres and text elsewhere.
fn ip_address_expr(backend: DbBackend, ip_address: IpAddr) -> SimpleExpr {
    let text = SimpleExpr::from(IpAddress(ip_address));
    match backend {
        DbBackend::Postgres => Func::cast_as(text, Alias::new("inet")).into(),
        _ => text,
    }
}

/// A host may only use a secret owned by its own tenant.
async fn ensure_secret_tenant<C>(
    db: &C,
    tenant_id: Uuid,
    access_secret_id: i32,
) -> Result<(), RepositoryError>
where
    C: ConnectionTrait,
{
    let secret = access_secret::Entity::find_by_id(access_secret_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            RepositoryError::ForeignKeyViolation(format!(
                "access secret {access_secret_id} does not exist"
            ))
        })?;

    if secret.tenant_id != tenant_id {
        return Err(RepositoryError::TenantMismatch {
            host_tenant: tenant_id,
            access_secret_id,
            secret_tenant: secret.tenant_id,
        });
    }

    Ok(())
}

fn to_json<T>(value: &T) -> Result<JsonValue, RepositoryError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_value(value)
        .map_err(|err| RepositoryError::validation_error("variable value", err.to_string()))
}

/// Parses a textual IP address; `Validation` when malformed.
pub fn parse_ip_address(raw: &str) -> Result<IpAddr, RepositoryError> {
    raw.trim()
        .parse()
        .map_err(|_| RepositoryError::validation_error("ip address", format!("'{raw}' is not an IP address")))
}

/// Hostnames must be non-empty, free of whitespace, and fit the column.
pub fn validate_hostname(hostname: &str) -> Result<(), RepositoryError> {
    if hostname.is_empty() {
        return Err(RepositoryError::validation_error(
            "hostname",
            "hostname cannot be empty",
        ));
    }
    if hostname.chars().count() > MAX_HOSTNAME_LEN {
        return Err(RepositoryError::validation_error(
            "hostname",
            format!("hostname cannot exceed {MAX_HOSTNAME_LEN} characters"),
        ));
    }
    if hostname.chars().any(char::is_whitespace) {
        return Err(RepositoryError::validation_error(
            "hostname",
            "hostname cannot contain whitespace",
        ));
    }
    Ok(())
}
