//! Host entity model
//!
//! This module contains the SeaORM entity model for the hosts table. A host
//! is descriptive data about a managed machine; it carries no reachability
//! or health state.

use std::fmt;
use std::net::{AddrParseError, IpAddr};

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{ArrayType, Nullable, ValueType, ValueTypeErr};
use sea_orm::{ColIdx, QueryResult, TryGetError, TryGetable};

use super::describe::{Describe, describe_fields};

/// Host entity scoped to a tenant
///
/// `(tenant_id, hostname)` and `(tenant_id, ip_address)` are unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "hosts")]
pub struct Model {
    /// Auto-assigned identifier (primary key)
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning tenant
    pub tenant_id: Uuid,

    /// Optional credential used to reach the host, shared with other hosts
    /// of the same tenant
    pub access_secret_id: Option<i32>,

    pub hostname: String,

    /// Host IP address; an `INET` on Postgres, read back as text
    #[sea_orm(column_type = "Text", select_as = "text")]
    pub ip_address: IpAddress,

    /// Administrative flag. An inactive host is excluded from administration;
    /// an active host may still be unreachable.
    pub active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn ip_addr(&self) -> IpAddr {
        self.ip_address.0
    }
}

/// IP address column value.
///
/// Writes bind the canonical text (RFC 5952 for IPv6). Reads accept that
/// text or Postgres' `inet` text cast, which appends the prefix length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IpAddress(pub IpAddr);

impl IpAddress {
    pub fn parse_stored(raw: &str) -> Result<Self, AddrParseError> {
        let addr = raw.split_once('/').map_or(raw, |(addr, _)| addr);
        addr.parse().map(Self)
    }
}

impl From<IpAddr> for IpAddress {
    fn from(addr: IpAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<IpAddress> for Value {
    fn from(addr: IpAddress) -> Self {
        Value::String(Some(Box::new(addr.0.to_string())))
    }
}

impl TryGetable for IpAddress {
    fn try_get_by<I: ColIdx>(res: &QueryResult, index: I) -> Result<Self, TryGetError> {
        let raw = String::try_get_by(res, index)?;
        Self::parse_stored(&raw).map_err(|err| {
            TryGetError::DbErr(DbErr::Type(format!("invalid ip address '{raw}': {err}")))
        })
    }
}

impl ValueType for IpAddress {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        match v {
            Value::String(Some(raw)) => Self::parse_stored(&raw).map_err(|_| ValueTypeErr),
            _ => Err(ValueTypeErr),
        }
    }

    fn type_name() -> String {
        "IpAddress".to_owned()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        ColumnType::Text
    }
}

impl Nullable for IpAddress {
    fn null() -> Value {
        Value::String(None)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
    #[sea_orm(
        belongs_to = "super::access_secret::Entity",
        from = "Column::AccessSecretId",
        to = "super::access_secret::Column::Id"
    )]
    AccessSecret,
    #[sea_orm(has_many = "super::host_variable::Entity")]
    HostVariable,
    #[sea_orm(has_many = "super::host_tagging::Entity")]
    HostTagging,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::access_secret::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessSecret.def()
    }
}

impl Related<super::host_variable::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HostVariable.def()
    }
}

impl Related<super::host_tagging::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HostTagging.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::host_tagging::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::host_tagging::Relation::Host.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Describe for Model {
    fn describe(&self) -> String {
        describe_fields("Host", &[("id", &self.id), ("hostname", &self.hostname)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_addresses_drop_the_prefix_length() {
        let v4 = IpAddress::parse_stored("10.0.0.1/32").unwrap();
        assert_eq!(v4.to_string(), "10.0.0.1");
        let v6 = IpAddress::parse_stored("2001:db8::1/128").unwrap();
        assert_eq!(v6.to_string(), "2001:db8::1");
        assert_eq!(IpAddress::parse_stored("10.0.0.1").unwrap(), v4);
        assert!(IpAddress::parse_stored("web01").is_err());
    }

    #[test]
    fn binds_canonical_text() {
        let addr = IpAddress("2001:db8:0:0:0:0:0:1".parse().unwrap());
        assert_eq!(Value::from(addr), Value::String(Some(Box::new("2001:db8::1".to_owned()))));
        assert_eq!(<IpAddress as ValueType>::try_from(Value::from(addr)).ok(), Some(addr));
    }
}
