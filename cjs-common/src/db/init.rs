//! Database initialization
//!
//! Creates the database on first run and brings the schema up
//! idempotently; every `create_*_table` call is safe to repeat.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize the database connection and create tables if needed.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; respondents only
    // ever write rows scoped to their own user_id.
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Bounded wait on lock contention
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_groups_table(&pool).await?;
    create_items_table(&pool).await?;
    create_item_groups_table(&pool).await?;
    create_users_table(&pool).await?;
    create_user_attributes_table(&pool).await?;
    create_user_groups_table(&pool).await?;
    create_user_items_table(&pool).await?;
    create_custom_item_pairs_table(&pool).await?;
    create_comparisons_table(&pool).await?;

    Ok(pool)
}

async fn create_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            group_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            created TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            item_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            display_name TEXT NOT NULL,
            image TEXT NOT NULL,
            created TEXT NOT NULL,
            UNIQUE (name, display_name, image)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_item_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS item_groups (
            item_group_id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id INTEGER NOT NULL REFERENCES items(item_id),
            group_id INTEGER NOT NULL REFERENCES groups(group_id),
            created TEXT NOT NULL,
            UNIQUE (item_id, group_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY AUTOINCREMENT,
            created TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Respondent profile fields live in a key-value table validated
/// against the configured field schema, never as physical columns.
async fn create_user_attributes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_attributes (
            user_attribute_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            UNIQUE (user_id, key)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_user_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_groups (
            user_group_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            group_id INTEGER NOT NULL REFERENCES groups(group_id),
            created TEXT NOT NULL,
            UNIQUE (user_id, group_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_user_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_items (
            user_item_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            item_id INTEGER NOT NULL REFERENCES items(item_id),
            known INTEGER NOT NULL,
            created TEXT NOT NULL,
            UNIQUE (user_id, item_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_custom_item_pairs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS custom_item_pairs (
            pair_id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL REFERENCES groups(group_id),
            item_a_id INTEGER NOT NULL REFERENCES items(item_id),
            item_b_id INTEGER NOT NULL REFERENCES items(item_id),
            weight REAL NOT NULL,
            created TEXT NOT NULL,
            UNIQUE (group_id, item_a_id, item_b_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// AUTOINCREMENT keeps comparison ids monotonically increasing in
/// allocation order; session navigation relies on that.
async fn create_comparisons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comparisons (
            comparison_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            item_a_id INTEGER NOT NULL REFERENCES items(item_id),
            item_b_id INTEGER NOT NULL REFERENCES items(item_id),
            selected_item_id INTEGER REFERENCES items(item_id),
            state TEXT NOT NULL,
            created TEXT NOT NULL,
            updated TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
