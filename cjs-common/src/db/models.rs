//! Database row models
//!
//! Enum columns are stored as short TEXT codes (`equal`/`manual`,
//! `selected`/`tied`/`skipped`) so the exported dataset stays readable
//! by downstream scaling tools.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How item pairs are drawn for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightingMode {
    /// Uniform random pairing over eligible items
    Equal,
    /// Researcher-assigned pair probabilities ("manual" in stored form)
    #[serde(rename = "manual")]
    Custom,
}

impl WeightingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightingMode::Equal => "equal",
            WeightingMode::Custom => "manual",
        }
    }

    pub fn parse(code: &str) -> Result<Self> {
        match code {
            "equal" => Ok(WeightingMode::Equal),
            "manual" => Ok(WeightingMode::Custom),
            other => Err(Error::Internal(format!(
                "Unknown weighting mode '{}'",
                other
            ))),
        }
    }
}

/// Terminal state of one persisted comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonState {
    /// One item was preferred
    Selected,
    /// Both items judged equally; no distinction made
    Tied,
    /// Respondent declined to compare the pair
    Skipped,
}

impl ComparisonState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonState::Selected => "selected",
            ComparisonState::Tied => "tied",
            ComparisonState::Skipped => "skipped",
        }
    }

    pub fn parse(code: &str) -> Result<Self> {
        match code {
            "selected" => Ok(ComparisonState::Selected),
            "tied" => Ok(ComparisonState::Tied),
            "skipped" => Ok(ComparisonState::Skipped),
            other => Err(Error::Internal(format!(
                "Unknown comparison state '{}'",
                other
            ))),
        }
    }
}

/// One object being compared. Immutable after setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: i64,
    pub name: String,
    pub display_name: String,
    pub image: String,
}

/// Named cluster of items sharing a weighting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub group_id: i64,
    pub name: String,
    pub display_name: String,
}

/// One persisted decision event between two items for one respondent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub comparison_id: i64,
    pub user_id: i64,
    pub item_a_id: i64,
    pub item_b_id: i64,
    pub selected_item_id: Option<i64>,
    pub state: ComparisonState,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Researcher-assigned selection probability for one unordered item pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomItemPair {
    pub pair_id: i64,
    pub group_id: i64,
    pub item_a_id: i64,
    pub item_b_id: i64,
    pub weight: f64,
}

/// Respondent's screening answer for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserItem {
    pub user_item_id: i64,
    pub user_id: i64,
    pub item_id: i64,
    pub known: bool,
}

/// Parse an RFC 3339 TEXT timestamp column.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", raw, e)))
}
