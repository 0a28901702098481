//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use cjs_common::config::{GroupConfig, ItemConfig, PairWeightConfig, SurveyConfig};
use cjs_common::db::init::init_database;
use cjs_common::db::models::WeightingMode;
use cjs_common::db::setup::setup_database;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// A private temp-file database; the directory is removed on drop.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn empty_db() -> TestDb {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("cjs.db")).await.unwrap();
    TestDb { pool, _dir: dir }
}

/// Honor RUST_LOG in test runs; repeated calls are fine.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Initialize a database populated from `config`.
pub async fn seeded_db(config: &SurveyConfig) -> TestDb {
    let db = empty_db().await;
    setup_database(&db.pool, config).await.unwrap();
    db
}

pub fn item(name: &str) -> ItemConfig {
    ItemConfig {
        name: name.to_string(),
        display_name: name.to_uppercase(),
        image: format!("{}.png", name),
    }
}

pub fn weight(a: &str, b: &str, w: f64) -> PairWeightConfig {
    PairWeightConfig {
        item_a: a.to_string(),
        item_b: b.to_string(),
        weight: w,
    }
}

/// Single group "g1" under equal weighting.
pub fn equal_config(items: &[&str], item_preference: bool) -> SurveyConfig {
    SurveyConfig {
        weighting: WeightingMode::Equal,
        item_preference,
        user_fields: vec![],
        groups: vec![GroupConfig {
            name: "g1".to_string(),
            display_name: "Group 1".to_string(),
            items: items.iter().map(|n| item(n)).collect(),
            weights: vec![],
        }],
    }
}

/// Single group "g1" under manual weighting with the given pair table.
pub fn custom_config(items: &[&str], weights: Vec<PairWeightConfig>) -> SurveyConfig {
    SurveyConfig {
        weighting: WeightingMode::Custom,
        item_preference: false,
        user_fields: vec![],
        groups: vec![GroupConfig {
            name: "g1".to_string(),
            display_name: "Group 1".to_string(),
            items: items.iter().map(|n| item(n)).collect(),
            weights,
        }],
    }
}

pub async fn group_id_by_name(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar("SELECT group_id FROM groups WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn item_id_by_name(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar("SELECT item_id FROM items WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}
