//! Setup-time database population
//!
//! Writes the validated survey definition into the database: groups,
//! items, item-group links and (under manual weighting) the custom
//! pair-weight table. Runs once before the survey opens; the resulting
//! rows are read-only for the lifetime of the survey.

use crate::config::{GroupConfig, SurveyConfig};
use crate::db::models::WeightingMode;
use crate::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::info;

/// Populate the database from a survey definition.
///
/// The definition is re-validated first so a caller that assembled the
/// config in code gets the same setup-time guarantees as `from_path`.
pub async fn setup_database(pool: &SqlitePool, config: &SurveyConfig) -> Result<()> {
    config.validate()?;

    for group in &config.groups {
        let group_id = insert_group(pool, group).await?;
        let item_ids = insert_items(pool, group_id, group).await?;

        if config.weighting == WeightingMode::Custom {
            insert_custom_pairs(pool, group_id, group, &item_ids).await?;
        }
    }

    info!(
        groups = config.groups.len(),
        weighting = config.weighting.as_str(),
        "Survey setup complete"
    );
    Ok(())
}

async fn insert_group(pool: &SqlitePool, group: &GroupConfig) -> Result<i64> {
    let result = sqlx::query("INSERT INTO groups (name, display_name, created) VALUES (?, ?, ?)")
        .bind(&group.name)
        .bind(&group.display_name)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Insert the group's items and link them to the group. An item with
/// identical (name, display_name, image) already in the database is
/// reused so the same item may belong to multiple groups.
async fn insert_items(
    pool: &SqlitePool,
    group_id: i64,
    group: &GroupConfig,
) -> Result<HashMap<String, i64>> {
    let mut item_ids = HashMap::new();

    for item in &group.items {
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT item_id FROM items WHERE name = ? AND display_name = ? AND image = ?",
        )
        .bind(&item.name)
        .bind(&item.display_name)
        .bind(&item.image)
        .fetch_optional(pool)
        .await?;

        let item_id = match existing {
            Some(id) => {
                info!(item = %item.name, "Duplicated item, using existing item information");
                id
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO items (name, display_name, image, created) VALUES (?, ?, ?, ?)",
                )
                .bind(&item.name)
                .bind(&item.display_name)
                .bind(&item.image)
                .bind(Utc::now().to_rfc3339())
                .execute(pool)
                .await?;
                result.last_insert_rowid()
            }
        };

        sqlx::query("INSERT INTO item_groups (item_id, group_id, created) VALUES (?, ?, ?)")
            .bind(item_id)
            .bind(group_id)
            .bind(Utc::now().to_rfc3339())
            .execute(pool)
            .await?;

        item_ids.insert(item.name.clone(), item_id);
    }

    Ok(item_ids)
}

async fn insert_custom_pairs(
    pool: &SqlitePool,
    group_id: i64,
    group: &GroupConfig,
    item_ids: &HashMap<String, i64>,
) -> Result<()> {
    for pair in &group.weights {
        let item_a_id = resolve_item(item_ids, &pair.item_a, &group.name)?;
        let item_b_id = resolve_item(item_ids, &pair.item_b, &group.name)?;

        sqlx::query(
            r#"
            INSERT INTO custom_item_pairs (group_id, item_a_id, item_b_id, weight, created)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(group_id)
        .bind(item_a_id)
        .bind(item_b_id)
        .bind(pair.weight)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Weight names are checked against the group's items by validation;
/// a miss here means the definition bypassed it.
fn resolve_item(item_ids: &HashMap<String, i64>, name: &str, group_name: &str) -> Result<i64> {
    item_ids.get(name).copied().ok_or_else(|| {
        Error::Internal(format!(
            "Unresolved item '{}' in weights of group '{}'",
            name, group_name
        ))
    })
}
