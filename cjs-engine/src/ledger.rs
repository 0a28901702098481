//! Comparison ledger and catalog queries
//!
//! Append-only record of every decision a respondent has made, plus the
//! read-side item queries the selector draws from. Rows are only ever
//! inserted by `submit` and mutated in place by `rejudge`; nothing here
//! deletes.
//!
//! Every query that touches a comparison row filters by respondent id
//! as well, so one respondent can never read or rewrite another's
//! decisions.

use chrono::Utc;
use cjs_common::db::models::{parse_timestamp, Comparison, ComparisonState, Item};
use cjs_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Running per-respondent totals, derived on demand from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonStats {
    /// Decided comparisons (selected or tied)
    pub compared: u64,
    /// Comparisons the respondent declined
    pub skipped: u64,
}

/// Insert a new comparison in a terminal state. Returns the allocated
/// comparison id (monotonically increasing).
pub async fn insert_comparison(
    pool: &SqlitePool,
    user_id: i64,
    item_a_id: i64,
    item_b_id: i64,
    state: ComparisonState,
    selected_item_id: Option<i64>,
) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO comparisons (user_id, item_a_id, item_b_id, selected_item_id, state, created, updated)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(item_a_id)
    .bind(item_b_id)
    .bind(selected_item_id)
    .bind(state.as_str())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Overwrite state and selected item of an existing comparison,
/// refreshing its `updated` timestamp. Fails with `NotFound` when the
/// id does not exist or belongs to another respondent.
pub async fn update_comparison(
    pool: &SqlitePool,
    comparison_id: i64,
    user_id: i64,
    state: ComparisonState,
    selected_item_id: Option<i64>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE comparisons
        SET state = ?, selected_item_id = ?, updated = ?
        WHERE comparison_id = ? AND user_id = ?
        "#,
    )
    .bind(state.as_str())
    .bind(selected_item_id)
    .bind(Utc::now().to_rfc3339())
    .bind(comparison_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "Comparison {} for user {}",
            comparison_id, user_id
        )));
    }
    Ok(())
}

/// Fetch one comparison, constrained to the requesting respondent.
pub async fn fetch_comparison(
    pool: &SqlitePool,
    comparison_id: i64,
    user_id: i64,
) -> Result<Comparison> {
    let row = sqlx::query(
        r#"
        SELECT comparison_id, user_id, item_a_id, item_b_id, selected_item_id, state, created, updated
        FROM comparisons
        WHERE comparison_id = ? AND user_id = ?
        "#,
    )
    .bind(comparison_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => comparison_from_row(&row),
        None => Err(Error::NotFound(format!(
            "Comparison {} for user {}",
            comparison_id, user_id
        ))),
    }
}

/// Count comparisons by state; selected and tied both count as
/// "compared". Tolerates a respondent with no comparisons yet.
pub async fn comparison_stats(pool: &SqlitePool, user_id: i64) -> Result<ComparisonStats> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT state, COUNT(comparison_id)
        FROM comparisons
        WHERE user_id = ?
        GROUP BY state
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut stats = ComparisonStats {
        compared: 0,
        skipped: 0,
    };
    for (state, count) in rows {
        match ComparisonState::parse(&state)? {
            ComparisonState::Selected | ComparisonState::Tied => stats.compared += count as u64,
            ComparisonState::Skipped => stats.skipped += count as u64,
        }
    }
    Ok(stats)
}

/// All comparison ids of one respondent in allocation order. For a
/// single respondent allocation order and submission order coincide, so
/// this is the session rebuild source.
pub async fn comparison_ids(pool: &SqlitePool, user_id: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT comparison_id FROM comparisons WHERE user_id = ? ORDER BY comparison_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Fetch one item by id.
pub async fn fetch_item(pool: &SqlitePool, item_id: i64) -> Result<Item> {
    let row = sqlx::query("SELECT item_id, name, display_name, image FROM items WHERE item_id = ?")
        .bind(item_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(item_from_row(&row)),
        None => Err(Error::NotFound(format!("Item {}", item_id))),
    }
}

/// Items belonging to the respondent's selected groups, deduplicated by
/// item id across groups.
pub async fn group_items(pool: &SqlitePool, user_id: i64, group_ids: &[i64]) -> Result<Vec<Item>> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        r#"
        SELECT DISTINCT i.item_id, i.name, i.display_name, i.image
        FROM user_groups ug
        JOIN item_groups ig ON ig.group_id = ug.group_id
        JOIN items i ON i.item_id = ig.item_id
        WHERE ug.user_id = ? AND ug.group_id IN ({})
        ORDER BY i.item_id
        "#,
        placeholders(group_ids.len())
    );

    let mut q = sqlx::query(&query).bind(user_id);
    for &group_id in group_ids {
        q = q.bind(group_id);
    }
    let rows = q.fetch_all(pool).await?;

    Ok(rows.iter().map(item_from_row).collect())
}

/// Items the respondent marked as known during screening. Deduplicated
/// by item id; the earliest answer wins for each item.
pub async fn known_items(pool: &SqlitePool, user_id: i64) -> Result<Vec<Item>> {
    let rows = sqlx::query(
        r#"
        SELECT i.item_id, i.name, i.display_name, i.image
        FROM user_items ui
        JOIN items i ON i.item_id = ui.item_id
        WHERE ui.user_id = ? AND ui.known = 1
        ORDER BY ui.user_item_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut seen = std::collections::HashSet::new();
    let mut items = Vec::new();
    for row in &rows {
        let item = item_from_row(row);
        if seen.insert(item.item_id) {
            items.push(item);
        }
    }
    Ok(items)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn item_from_row(row: &SqliteRow) -> Item {
    Item {
        item_id: row.get("item_id"),
        name: row.get("name"),
        display_name: row.get("display_name"),
        image: row.get("image"),
    }
}

fn comparison_from_row(row: &SqliteRow) -> Result<Comparison> {
    let state: String = row.get("state");
    let created: String = row.get("created");
    let updated: String = row.get("updated");

    Ok(Comparison {
        comparison_id: row.get("comparison_id"),
        user_id: row.get("user_id"),
        item_a_id: row.get("item_a_id"),
        item_b_id: row.get("item_b_id"),
        selected_item_id: row.get("selected_item_id"),
        state: ComparisonState::parse(&state)?,
        created: parse_timestamp(&created)?,
        updated: parse_timestamp(&updated)?,
    })
}
