//! Access secret repository for database operations
//!
//! Access secrets are stored and returned as opaque certificate blobs; no
//! decryption happens here.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::access_secret::{self, Entity as AccessSecret};
use crate::models::host;

/// Request data for creating an access secret
#[derive(Debug, Clone)]
pub struct NewAccessSecret {
    pub tenant_id: Uuid,
    pub cert: Option<String>,
}

/// Repository for access secret database operations
pub struct AccessSecretRepository<'a, C> {
    db: &'a C,
}

impl<'a, C> AccessSecretRepository<'a, C>
where
    C: ConnectionTrait,
{
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Creates a secret owned by `tenant_id`; `ForeignKeyViolation` when the
    /// tenant does not exist.
    pub async fn create(
        &self,
        request: NewAccessSecret,
    ) -> Result<access_secret::Model, RepositoryError> {
        let now = Utc::now();
        let secret = access_secret::ActiveModel {
            tenant_id: Set(request.tenant_id),
            cert: Set(request.cert),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let created = secret.insert(self.db).await?;
        tracing::info!(
            access_secret_id = created.id,
            tenant_id = %created.tenant_id,
            "Access secret created"
        );

        Ok(created)
    }

    pub async fn find(&self, id: i32) -> Result<Option<access_secret::Model>, RepositoryError> {
        Ok(AccessSecret::find_by_id(id).one(self.db).await?)
    }

    pub async fn get(&self, id: i32) -> Result<access_secret::Model, RepositoryError> {
        self.find(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("access secret", id))
    }

    /// Lists a tenant's secrets ordered by ID
    pub async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<access_secret::Model>, RepositoryError> {
        Ok(AccessSecret::find()
            .filter(access_secret::Column::TenantId.eq(tenant_id))
            .order_by_asc(access_secret::Column::Id)
            .all(self.db)
            .await?)
    }

    /// Replaces the certificate blob
    pub async fn update_cert(
        &self,
        id: i32,
        cert: Option<String>,
    ) -> Result<access_secret::Model, RepositoryError> {
        let secret = self.get(id).await?;

        let mut active = secret.into_active_model();
        active.cert = Set(cert);
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(self.db).await?)
    }

    /// Hosts sharing this secret, ordered by ID
    pub async fn hosts(&self, id: i32) -> Result<Vec<host::Model>, RepositoryError> {
        let secret = self.get(id).await?;
        Ok(secret
            .find_related(host::Entity)
            .order_by_asc(host::Column::Id)
            .all(self.db)
            .await?)
    }

    /// Deletes a secret; `ForeignKeyViolation` while hosts still reference it.
    pub async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let result = AccessSecret::delete_by_id(id).exec(self.db).await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("access secret", id));
        }

        tracing::info!(access_secret_id = id, "Access secret deleted");
        Ok(())
    }
}
