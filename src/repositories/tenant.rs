//! # Tenant Repository
//!
//! CRUD operations for tenants and traversal to the hosts and access
//! secrets they own. Deleting a tenant never cascades: the store rejects it
//! while dependents exist.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::tenant::{
    ActiveModel as TenantActiveModel, Column as TenantColumn, Entity as Tenant,
    Model as TenantModel,
};
use crate::models::{access_secret, host};

/// Maximum tenant name length, matching the `VARCHAR(255)` column.
pub const MAX_TENANT_NAME_LEN: usize = 255;

/// Request data for creating a new tenant
#[derive(Debug, Clone, Default)]
pub struct NewTenant {
    /// Explicit identifier; a v4 UUID is generated when absent
    pub id: Option<Uuid>,
    /// Display name for the tenant
    pub name: Option<String>,
}

/// Repository for Tenant database operations
pub struct TenantRepository<'a, C> {
    db: &'a C,
}

impl<'a, C> TenantRepository<'a, C>
where
    C: ConnectionTrait,
{
    /// Create a new TenantRepository over a connection or transaction
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Create a new tenant
    pub async fn create(&self, request: NewTenant) -> Result<TenantModel, RepositoryError> {
        if let Some(name) = request.name.as_deref() {
            validate_tenant_name(name)?;
        }

        let now = Utc::now();
        let tenant = TenantActiveModel {
            id: Set(request.id.unwrap_or_else(Uuid::new_v4)),
            name: Set(request.name),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let created = tenant.insert(self.db).await?;
        tracing::info!(tenant_id = %created.id, "Tenant created");

        Ok(created)
    }

    /// Find a tenant by ID, `None` when absent
    pub async fn find(&self, tenant_id: Uuid) -> Result<Option<TenantModel>, RepositoryError> {
        Ok(Tenant::find_by_id(tenant_id).one(self.db).await?)
    }

    /// Get a tenant by ID, `NotFound` when absent
    pub async fn get(&self, tenant_id: Uuid) -> Result<TenantModel, RepositoryError> {
        self.find(tenant_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("tenant", tenant_id))
    }

    /// List all tenants ordered by name, then ID
    pub async fn list(&self) -> Result<Vec<TenantModel>, RepositoryError> {
        Ok(Tenant::find()
            .order_by_asc(TenantColumn::Name)
            .order_by_asc(TenantColumn::Id)
            .all(self.db)
            .await?)
    }

    /// Update tenant name
    pub async fn rename(
        &self,
        tenant_id: Uuid,
        name: Option<String>,
    ) -> Result<TenantModel, RepositoryError> {
        if let Some(name) = name.as_deref() {
            validate_tenant_name(name)?;
        }

        let tenant = self.get(tenant_id).await?;

        let mut active_tenant = tenant.into_active_model();
        active_tenant.name = Set(name);
        active_tenant.updated_at = Set(Utc::now().into());

        Ok(active_tenant.update(self.db).await?)
    }

    /// Delete a tenant.
    ///
    /// Fails with `ForeignKeyViolation` while the tenant still owns hosts or
    /// access secrets.
    pub async fn delete(&self, tenant_id: Uuid) -> Result<(), RepositoryError> {
        let tenant = self.get(tenant_id).await?;

        tenant.delete(self.db).await?;
        tracing::info!(tenant_id = %tenant_id, "Tenant deleted");

        Ok(())
    }

    /// Hosts owned by the tenant, ordered by ID
    pub async fn hosts(&self, tenant_id: Uuid) -> Result<Vec<host::Model>, RepositoryError> {
        let tenant = self.get(tenant_id).await?;
        Ok(tenant
            .find_related(host::Entity)
            .order_by_asc(host::Column::Id)
            .all(self.db)
            .await?)
    }

    /// Access secrets owned by the tenant, ordered by ID
    pub async fn access_secrets(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<access_secret::Model>, RepositoryError> {
        let tenant = self.get(tenant_id).await?;
        Ok(tenant
            .find_related(access_secret::Entity)
            .order_by_asc(access_secret::Column::Id)
            .all(self.db)
            .await?)
    }
}

/// Validate tenant name length
fn validate_tenant_name(name: &str) -> Result<(), RepositoryError> {
    if name.trim().is_empty() {
        return Err(RepositoryError::validation_error(
            "tenant name",
            "Tenant name cannot be empty",
        ));
    }

    if name.chars().count() > MAX_TENANT_NAME_LEN {
        return Err(RepositoryError::validation_error(
            "tenant name",
            format!("Tenant name cannot exceed {MAX_TENANT_NAME_LEN} characters"),
        ));
    }

    Ok(())
}
