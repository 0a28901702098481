//! Weighting store
//!
//! Read-only access to the custom pair-weight table populated at setup
//! time. Under equal weighting this table is empty and never consulted.

use cjs_common::db::models::CustomItemPair;
use cjs_common::Result;
use sqlx::{Row, SqlitePool};

/// Load all custom pair weights for a set of groups, in insertion order.
pub async fn load_group_pairs(pool: &SqlitePool, group_ids: &[i64]) -> Result<Vec<CustomItemPair>> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        r#"
        SELECT pair_id, group_id, item_a_id, item_b_id, weight
        FROM custom_item_pairs
        WHERE group_id IN ({})
        ORDER BY pair_id
        "#,
        vec!["?"; group_ids.len()].join(", ")
    );

    let mut q = sqlx::query(&query);
    for &group_id in group_ids {
        q = q.bind(group_id);
    }
    let rows = q.fetch_all(pool).await?;

    Ok(rows
        .iter()
        .map(|row| CustomItemPair {
            pair_id: row.get("pair_id"),
            group_id: row.get("group_id"),
            item_a_id: row.get("item_a_id"),
            item_b_id: row.get("item_b_id"),
            weight: row.get("weight"),
        })
        .collect())
}
