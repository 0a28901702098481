//! Respondent registration and item-preference screening
//!
//! Registration inserts the user row, its key-value profile attributes
//! and the chosen group memberships, then hands back a fresh session
//! state. Group selection is where the manual-weighting single-group
//! invariant is enforced; the selector re-checks it but a violation
//! should never get past this point.

use crate::ledger;
use crate::session::SessionState;
use cjs_common::config::SurveyConfig;
use cjs_common::db::models::{Item, WeightingMode};
use cjs_common::{Error, Result};
use chrono::Utc;
use rand::Rng;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::info;

/// Register a respondent: profile attributes validated against the
/// configured field schema, group memberships persisted, session
/// initialized with empty history.
pub async fn register(
    pool: &SqlitePool,
    config: &SurveyConfig,
    attributes: &[(String, String)],
    group_ids: &[i64],
) -> Result<SessionState> {
    if group_ids.is_empty() {
        return Err(Error::InvalidInput(
            "At least one group must be selected".to_string(),
        ));
    }
    if config.weighting == WeightingMode::Custom && group_ids.len() > 1 {
        return Err(Error::Config(format!(
            "Manual weighting permits selecting one group, got {}",
            group_ids.len()
        )));
    }
    config.validate_attributes(attributes)?;

    let result = sqlx::query("INSERT INTO users (created) VALUES (?)")
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    let user_id = result.last_insert_rowid();

    for (key, value) in attributes {
        sqlx::query("INSERT INTO user_attributes (user_id, key, value) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }

    for &group_id in group_ids {
        sqlx::query("INSERT INTO user_groups (user_id, group_id, created) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(group_id)
            .bind(Utc::now().to_rfc3339())
            .execute(pool)
            .await?;
    }

    info!(user_id, groups = group_ids.len(), "Respondent registered");
    Ok(SessionState::initialize(
        user_id,
        group_ids.to_vec(),
        config.weighting,
    ))
}

/// Record one screening answer. The first answer for an item wins;
/// repeats are ignored so a double-posted form never flips a preference.
pub async fn record_item_preference(
    pool: &SqlitePool,
    user_id: i64,
    item_id: i64,
    known: bool,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_items (user_id, item_id, known, created)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (user_id, item_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .bind(known)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Pick a random item from the respondent's groups that has no
/// screening answer yet, or `None` when screening is complete.
pub async fn next_unscreened_item<R: Rng>(
    pool: &SqlitePool,
    session: &SessionState,
    rng: &mut R,
) -> Result<Option<Item>> {
    let items = ledger::group_items(pool, session.user_id, &session.group_ids).await?;
    if items.is_empty() {
        return Ok(None);
    }

    let answered: HashSet<i64> =
        sqlx::query_scalar("SELECT item_id FROM user_items WHERE user_id = ?")
            .bind(session.user_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    let mut remaining: Vec<Item> = items
        .into_iter()
        .filter(|item| !answered.contains(&item.item_id))
        .collect();
    if remaining.is_empty() {
        return Ok(None);
    }

    let index = rng.gen_range(0..remaining.len());
    Ok(Some(remaining.swap_remove(index)))
}
