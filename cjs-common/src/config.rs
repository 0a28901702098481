//! Survey configuration loading and validation
//!
//! The survey definition (groups, items, weighting mode, respondent
//! profile fields) is loaded once from a TOML file into an immutable
//! `SurveyConfig` value object and validated exhaustively before any
//! database row is written. Components receive the value at
//! construction time; there is no global configuration state.

use crate::db::models::WeightingMode;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Custom pair weights must sum to 1.0 within this tolerance.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.02;

/// Top-level survey definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Pairing weight configuration shared by the whole survey
    pub weighting: WeightingMode,
    /// Whether respondents screen items (known/unknown) before comparing
    #[serde(default)]
    pub item_preference: bool,
    /// Respondent profile fields collected at registration
    #[serde(default)]
    pub user_fields: Vec<UserFieldConfig>,
    pub groups: Vec<GroupConfig>,
}

/// One respondent profile field (stored as a key-value attribute).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFieldConfig {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

/// One comparison group and the items it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub display_name: String,
    pub items: Vec<ItemConfig>,
    /// Pair weights, only meaningful (and mandatory) under manual weighting
    #[serde(default)]
    pub weights: Vec<PairWeightConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemConfig {
    pub name: String,
    pub display_name: String,
    pub image: String,
}

/// Researcher-assigned selection probability for one unordered item pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairWeightConfig {
    pub item_a: String,
    pub item_b: String,
    pub weight: f64,
}

impl SurveyConfig {
    /// Load and validate a survey definition from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SurveyConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the full definition. Called by `from_path`; exposed for
    /// configurations assembled in code.
    pub fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(Error::Config("At least one group is required".to_string()));
        }

        if self.weighting == WeightingMode::Custom && self.item_preference {
            return Err(Error::Config(
                "Item preference screening cannot be combined with manual weighting".to_string(),
            ));
        }

        let mut field_names = HashSet::new();
        for field in &self.user_fields {
            if !field_names.insert(field.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate user field '{}'",
                    field.name
                )));
            }
        }

        let mut group_names = HashSet::new();
        for group in &self.groups {
            if !group_names.insert(group.name.as_str()) {
                return Err(Error::Config(format!("Duplicate group '{}'", group.name)));
            }
            self.validate_group(group)?;
        }

        Ok(())
    }

    fn validate_group(&self, group: &GroupConfig) -> Result<()> {
        let mut item_names = HashSet::new();
        for item in &group.items {
            if !item_names.insert(item.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate item '{}' in group '{}'",
                    item.name, group.name
                )));
            }
        }

        match self.weighting {
            WeightingMode::Equal => {
                if !group.weights.is_empty() {
                    return Err(Error::Config(format!(
                        "Group '{}' defines pair weights but weighting is equal",
                        group.name
                    )));
                }
                Ok(())
            }
            WeightingMode::Custom => self.validate_group_weights(group, &item_names),
        }
    }

    /// Under manual weighting every unordered pair of the group's items
    /// must be covered exactly once, with weights in [0, 1] summing to
    /// 1.0 within `WEIGHT_SUM_TOLERANCE`.
    fn validate_group_weights(&self, group: &GroupConfig, item_names: &HashSet<&str>) -> Result<()> {
        let mut covered: HashSet<(String, String)> = HashSet::new();
        let mut sum = 0.0;

        for pair in &group.weights {
            if pair.item_a == pair.item_b {
                return Err(Error::Config(format!(
                    "Group '{}' pairs item '{}' with itself",
                    group.name, pair.item_a
                )));
            }
            for name in [&pair.item_a, &pair.item_b] {
                if !item_names.contains(name.as_str()) {
                    return Err(Error::Config(format!(
                        "Group '{}' weight references unknown item '{}'",
                        group.name, name
                    )));
                }
            }
            if !(0.0..=1.0).contains(&pair.weight) {
                return Err(Error::Config(format!(
                    "Group '{}' pair ({}, {}) has weight {} outside [0, 1]",
                    group.name, pair.item_a, pair.item_b, pair.weight
                )));
            }

            // Normalize the unordered pair so (a, b) and (b, a) collide.
            let key = if pair.item_a <= pair.item_b {
                (pair.item_a.clone(), pair.item_b.clone())
            } else {
                (pair.item_b.clone(), pair.item_a.clone())
            };
            if !covered.insert(key) {
                return Err(Error::Config(format!(
                    "Group '{}' weights pair ({}, {}) more than once",
                    group.name, pair.item_a, pair.item_b
                )));
            }
            sum += pair.weight;
        }

        let n = group.items.len();
        let expected_pairs = n * n.saturating_sub(1) / 2;
        if covered.len() != expected_pairs {
            return Err(Error::Config(format!(
                "Group '{}' covers {} pairs but its {} items require {}",
                group.name,
                covered.len(),
                n,
                expected_pairs
            )));
        }

        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Config(format!(
                "Group '{}' pair weights sum to {:.4}, expected 1.0 (±{})",
                group.name, sum, WEIGHT_SUM_TOLERANCE
            )));
        }

        Ok(())
    }

    /// Validate respondent attributes posted at registration against the
    /// configured field schema: no unknown keys, no missing required keys.
    pub fn validate_attributes(&self, attributes: &[(String, String)]) -> Result<()> {
        for (key, _) in attributes {
            if !self.user_fields.iter().any(|f| &f.name == key) {
                return Err(Error::InvalidInput(format!(
                    "Unknown registration field '{}'",
                    key
                )));
            }
        }
        for field in &self.user_fields {
            if field.required && !attributes.iter().any(|(k, _)| k == &field.name) {
                return Err(Error::InvalidInput(format!(
                    "Missing required registration field '{}'",
                    field.name
                )));
            }
        }
        Ok(())
    }
}
