//! Integration tests for the per-host variable mapping and characteristic lookup.

use anyhow::Result;
use host_inventory::error::RepositoryError;
use host_inventory::repositories::HostRepository;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{create_test_host, create_test_tenant, setup_test_db};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Limits {
    cpu: u32,
    memory_mb: u64,
}

#[tokio::test]
async fn set_then_get_returns_the_value() -> Result<()> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let host = create_test_host(&db, tenant.id, "web01", "10.0.0.1").await?;
    let repo = HostRepository::new(&db);

    repo.set_variable(host.id, "env", "prod").await?;
    repo.set_variable(host.id, "ports", &[80, 443]).await?;
    repo.set_variable(host.id, "meta", &json!({"rack": "r12", "slot": 4}))
        .await?;

    assert_eq!(repo.get_variable(host.id, "env").await?, json!("prod"));
    assert_eq!(repo.get_variable(host.id, "ports").await?, json!([80, 443]));
    assert_eq!(
        repo.get_variable(host.id, "meta").await?,
        json!({"rack": "r12", "slot": 4})
    );
    Ok(())
}

#[tokio::test]
async fn set_overwrites_existing_binding() -> Result<()> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let host = create_test_host(&db, tenant.id, "web01", "10.0.0.1").await?;
    let repo = HostRepository::new(&db);

    repo.set_variable(host.id, "env", "staging").await?;
    repo.set_variable(host.id, "env", "prod").await?;

    assert_eq!(repo.get_variable(host.id, "env").await?, json!("prod"));
    assert_eq!(repo.variable_count(host.id).await?, 1);
    Ok(())
}

#[tokio::test]
async fn typed_values_roundtrip() -> Result<()> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let host = create_test_host(&db, tenant.id, "web01", "10.0.0.1").await?;
    let repo = HostRepository::new(&db);

    let limits = Limits {
        cpu: 8,
        memory_mb: 16384,
    };
    repo.set_variable(host.id, "limits", &limits).await?;

    let decoded: Limits = repo.get_variable_as(host.id, "limits").await?;
    assert_eq!(decoded, limits);

    let err = repo
        .get_variable_as::<String>(host.id, "limits")
        .await
        .expect_err("object is not a string");
    assert!(matches!(err, RepositoryError::Validation { .. }));
    Ok(())
}

#[tokio::test]
async fn delete_then_get_is_not_found() -> Result<()> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let host = create_test_host(&db, tenant.id, "web01", "10.0.0.1").await?;
    let repo = HostRepository::new(&db);

    repo.set_variable(host.id, "env", "prod").await?;
    repo.delete_variable(host.id, "env").await?;

    let err = repo
        .get_variable(host.id, "env")
        .await
        .expect_err("deleted key");
    assert!(err.is_not_found());
    assert!(!repo.contains_variable(host.id, "env").await?);

    let err = repo
        .delete_variable(host.id, "env")
        .await
        .expect_err("deleting twice");
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn contains_count_and_keys_agree() -> Result<()> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let host = create_test_host(&db, tenant.id, "web01", "10.0.0.1").await?;
    let repo = HostRepository::new(&db);

    assert_eq!(repo.variable_count(host.id).await?, 0);
    assert!(repo.variable_keys(host.id).await?.is_empty());

    repo.set_variable(host.id, "role", "web").await?;
    repo.set_variable(host.id, "env", "prod").await?;
    repo.set_variable(host.id, "owner", &json!(null)).await?;

    assert!(repo.contains_variable(host.id, "env").await?);
    assert!(repo.contains_variable(host.id, "owner").await?);
    assert!(!repo.contains_variable(host.id, "missing").await?);
    assert_eq!(repo.variable_count(host.id).await?, 3);
    assert_eq!(
        repo.variable_keys(host.id).await?,
        vec!["env".to_string(), "owner".to_string(), "role".to_string()]
    );

    let all = repo.list_variables(host.id).await?;
    let expected: BTreeMap<String, serde_json::Value> = [
        ("env".to_string(), json!("prod")),
        ("owner".to_string(), json!(null)),
        ("role".to_string(), json!("web")),
    ]
    .into_iter()
    .collect();
    assert_eq!(all, expected);
    Ok(())
}

#[tokio::test]
async fn variables_are_scoped_per_host() -> Result<()> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let web01 = create_test_host(&db, tenant.id, "web01", "10.0.0.1").await?;
    let web02 = create_test_host(&db, tenant.id, "web02", "10.0.0.2").await?;
    let repo = HostRepository::new(&db);

    repo.set_variable(web01.id, "env", "prod").await?;
    repo.set_variable(web02.id, "env", "dev").await?;

    assert_eq!(repo.get_variable(web01.id, "env").await?, json!("prod"));
    assert_eq!(repo.get_variable(web02.id, "env").await?, json!("dev"));
    Ok(())
}

#[tokio::test]
async fn set_on_missing_host_is_a_foreign_key_violation() -> Result<()> {
    let db = setup_test_db().await?;
    let repo = HostRepository::new(&db);

    let err = repo
        .set_variable(404, "env", "prod")
        .await
        .expect_err("host does not exist");
    assert!(err.is_foreign_key_violation(), "unexpected error: {err:?}");
    Ok(())
}

#[tokio::test]
async fn invalid_keys_are_rejected() -> Result<()> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let host = create_test_host(&db, tenant.id, "web01", "10.0.0.1").await?;
    let repo = HostRepository::new(&db);

    let err = repo
        .set_variable(host.id, "", "x")
        .await
        .expect_err("empty key");
    assert!(matches!(err, RepositoryError::Validation { field: "key", .. }));
    Ok(())
}

#[tokio::test]
async fn set_variables_is_all_or_nothing() -> Result<()> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let host = create_test_host(&db, tenant.id, "web01", "10.0.0.1").await?;
    let repo = HostRepository::new(&db);

    repo.set_variables(host.id, [("env", json!("prod")), ("role", json!("web"))])
        .await?;
    assert_eq!(repo.variable_count(host.id).await?, 2);

    let long_key = "k".repeat(300);
    let err = repo
        .set_variables(
            host.id,
            [
                ("env", json!("staging")),
                ("zone", json!("a")),
                (long_key.as_str(), json!(1)),
            ],
        )
        .await
        .expect_err("oversized key aborts the batch");
    assert!(matches!(err, RepositoryError::Validation { .. }));

    assert_eq!(repo.get_variable(host.id, "env").await?, json!("prod"));
    assert!(!repo.contains_variable(host.id, "zone").await?);
    assert_eq!(repo.variable_count(host.id).await?, 2);
    Ok(())
}

#[tokio::test]
async fn with_characteristic_finds_matching_hosts() -> Result<()> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let web01 = create_test_host(&db, tenant.id, "web01", "10.0.0.1").await?;
    let web02 = create_test_host(&db, tenant.id, "web02", "10.0.0.2").await?;
    let db01 = create_test_host(&db, tenant.id, "db01", "10.0.0.3").await?;
    let repo = HostRepository::new(&db);

    repo.set_variable(web01.id, "env", "prod").await?;
    repo.set_variable(web02.id, "env", "dev").await?;
    repo.set_variable(db01.id, "env", "prod").await?;
    repo.set_variable(web02.id, "tier", "prod").await?;

    let prod: Vec<_> = repo
        .with_characteristic("env", &json!("prod"))
        .await?
        .into_iter()
        .map(|host| host.hostname)
        .collect();
    assert_eq!(prod, vec!["web01".to_string(), "db01".to_string()]);

    assert!(repo
        .with_characteristic("env", &json!("qa"))
        .await?
        .is_empty());
    assert!(repo
        .with_characteristic("missing", &json!("prod"))
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn with_characteristic_compares_structured_values() -> Result<()> {
    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let web01 = create_test_host(&db, tenant.id, "web01", "10.0.0.1").await?;
    let web02 = create_test_host(&db, tenant.id, "web02", "10.0.0.2").await?;
    let repo = HostRepository::new(&db);

    repo.set_variable(web01.id, "port", &8080).await?;
    repo.set_variable(web02.id, "port", "8080").await?;
    repo.set_variable(web01.id, "zones", &json!(["a", "b"])).await?;

    let numeric = repo.with_characteristic("port", &json!(8080)).await?;
    assert_eq!(numeric.len(), 1);
    assert_eq!(numeric[0].id, web01.id);

    let zones = repo
        .with_characteristic("zones", &json!(["a", "b"]))
        .await?;
    assert_eq!(zones.len(), 1);
    assert!(repo
        .with_characteristic("zones", &json!(["b", "a"]))
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn with_characteristic_in_tenant_scopes_results() -> Result<()> {
    let db = setup_test_db().await?;
    let acme = create_test_tenant(&db, "acme").await?;
    let globex = create_test_tenant(&db, "globex").await?;
    let a = create_test_host(&db, acme.id, "web01", "10.0.0.1").await?;
    let g = create_test_host(&db, globex.id, "web01", "10.0.0.1").await?;
    let repo = HostRepository::new(&db);

    repo.set_variable(a.id, "env", "prod").await?;
    repo.set_variable(g.id, "env", "prod").await?;

    assert_eq!(repo.with_characteristic("env", &json!("prod")).await?.len(), 2);

    let scoped = repo
        .with_characteristic_in_tenant(globex.id, "env", &json!("prod"))
        .await?;
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].id, g.id);
    Ok(())
}

#[tokio::test]
async fn with_characteristic_handles_more_matches_than_bind_parameters() -> Result<()> {
    const HOSTS: usize = 40_000;

    let db = setup_test_db().await?;
    let tenant = create_test_tenant(&db, "acme").await?;
    let now: DateTimeWithTimeZone = chrono::Utc::now().into();

    db.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        r#"WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 40000)
           INSERT INTO hosts (tenant_id, hostname, ip_address, active, created_at, updated_at)
           SELECT ?, 'host' || n,
                  '10.' || (n / 65536) || '.' || ((n / 256) % 256) || '.' || (n % 256),
                  1, ?, ?
           FROM seq"#,
        [tenant.id.into(), now.into(), now.into()],
    ))
    .await?;
    db.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        "INSERT INTO host_variables (host_id, key, value, created_at, updated_at)
         SELECT id, 'env', ?, created_at, updated_at FROM hosts",
        [json!("prod").into()],
    ))
    .await?;

    let repo = HostRepository::new(&db);
    let first = repo
        .find_by_hostname(tenant.id, "host1")
        .await?
        .expect("seeded host");
    repo.set_variable(first.id, "env", "dev").await?;

    let prod = repo.with_characteristic("env", &json!("prod")).await?;
    assert_eq!(prod.len(), HOSTS - 1);
    assert!(prod.windows(2).all(|pair| pair[0].id < pair[1].id));
    assert!(prod.iter().all(|host| host.id != first.id));
    assert_eq!(prod[0].hostname, "host2");
    assert_eq!(prod[0].ip_address.to_string(), "10.0.0.2");

    let scoped = repo
        .with_characteristic_in_tenant(tenant.id, "env", &json!("prod"))
        .await?;
    assert_eq!(scoped.len(), HOSTS - 1);
    Ok(())
}
