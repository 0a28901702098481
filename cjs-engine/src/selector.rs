//! Pair selector
//!
//! Decides which two items a respondent sees next. The decision is an
//! ordered match on `SelectionStrategy`: rejudge lookups short-circuit
//! everything, then the weighting mode and screening flag pick one of
//! the random-draw strategies.
//!
//! "Not enough to compare" is an `Ok(None)` sentinel, never an error;
//! callers render an empty state for it. All randomness flows through a
//! caller-supplied `Rng`, so a seeded generator makes selection fully
//! deterministic.

use crate::ledger;
use crate::session::SessionState;
use crate::weights;
use cjs_common::config::SurveyConfig;
use cjs_common::db::models::{Item, WeightingMode};
use cjs_common::{Error, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::index::sample;
use rand::Rng;
use sqlx::SqlitePool;
use tracing::debug;

/// The implemented (weighting mode, screening) combinations, spelled
/// out so a new combination is a compile-time hole here instead of a
/// silently-swallowed `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Equal weighting, draw from the respondent's group items
    EqualNoScreen,
    /// Equal weighting, draw from the respondent's known items
    EqualScreen,
    /// Manual weighting, draw a pair from the custom weight table
    Custom,
    /// Explicit sentinel for combinations added later; selects nothing
    Unsupported,
}

impl SelectionStrategy {
    /// Strategy for a session. Custom weighting wins regardless of the
    /// screening flag (screening is rejected for it at setup anyway).
    pub fn for_session(weighting: WeightingMode, screening: bool) -> Self {
        match (weighting, screening) {
            (WeightingMode::Custom, _) => SelectionStrategy::Custom,
            (WeightingMode::Equal, true) => SelectionStrategy::EqualScreen,
            (WeightingMode::Equal, false) => SelectionStrategy::EqualNoScreen,
        }
    }
}

/// Selects the next item pair to present to a respondent.
pub struct PairSelector {
    pool: SqlitePool,
    /// Whether item-preference screening is active for this survey
    item_preference: bool,
}

impl PairSelector {
    pub fn new(pool: SqlitePool, config: &SurveyConfig) -> Self {
        PairSelector {
            pool,
            item_preference: config.item_preference,
        }
    }

    /// Produce the next pair for this session, or `None` when there is
    /// nothing to compare.
    ///
    /// With `rejudge_comparison_id` set, returns that comparison's two
    /// items unchanged and moves the session's rejudge pointer to the
    /// comparison preceding it. Fails with `NotFound` when the id does
    /// not exist or belongs to another respondent. The selector never
    /// writes to the ledger.
    pub async fn select_pair<R: Rng>(
        &self,
        session: &mut SessionState,
        rejudge_comparison_id: Option<i64>,
        rng: &mut R,
    ) -> Result<Option<(Item, Item)>> {
        if let Some(comparison_id) = rejudge_comparison_id {
            return self.rejudge_pair(session, comparison_id).await.map(Some);
        }

        let strategy = SelectionStrategy::for_session(session.weighting, self.item_preference);
        debug!(user_id = session.user_id, ?strategy, "Selecting next pair");

        match strategy {
            SelectionStrategy::Custom => self.custom_pair(session, rng).await,
            SelectionStrategy::EqualScreen => self.screened_pair(session, rng).await,
            SelectionStrategy::EqualNoScreen => self.group_pair(session, rng).await,
            SelectionStrategy::Unsupported => Ok(None),
        }
    }

    /// Rejudge: fetch the prior comparison (respondent-constrained) and
    /// return its items in stored order.
    async fn rejudge_pair(
        &self,
        session: &mut SessionState,
        comparison_id: i64,
    ) -> Result<(Item, Item)> {
        let comparison = ledger::fetch_comparison(&self.pool, comparison_id, session.user_id).await?;
        session.record_rejudge_entry(comparison_id);

        let item_a = ledger::fetch_item(&self.pool, comparison.item_a_id).await?;
        let item_b = ledger::fetch_item(&self.pool, comparison.item_b_id).await?;
        Ok((item_a, item_b))
    }

    /// Weighted draw from the custom pair table. Exactly one group must
    /// be selected under manual weighting; anything else is a
    /// configuration inconsistency and fails instead of guessing.
    async fn custom_pair<R: Rng>(
        &self,
        session: &SessionState,
        rng: &mut R,
    ) -> Result<Option<(Item, Item)>> {
        if session.group_ids.len() != 1 {
            return Err(Error::Config(format!(
                "Manual weighting requires exactly one selected group, got {}",
                session.group_ids.len()
            )));
        }

        let pairs = weights::load_group_pairs(&self.pool, &session.group_ids).await?;
        if pairs.is_empty() {
            return Ok(None);
        }

        let index = WeightedIndex::new(pairs.iter().map(|p| p.weight))
            .map_err(|e| Error::Config(format!("Invalid pair weights: {}", e)))?;
        let pair = &pairs[index.sample(rng)];

        let item_a = ledger::fetch_item(&self.pool, pair.item_a_id).await?;
        let item_b = ledger::fetch_item(&self.pool, pair.item_b_id).await?;
        Ok(Some((item_a, item_b)))
    }

    /// Uniform draw of two distinct items from the respondent's known
    /// items.
    async fn screened_pair<R: Rng>(
        &self,
        session: &SessionState,
        rng: &mut R,
    ) -> Result<Option<(Item, Item)>> {
        let items = ledger::known_items(&self.pool, session.user_id).await?;
        Ok(draw_two(items, rng))
    }

    /// Uniform draw of two distinct items from the respondent's group
    /// memberships.
    async fn group_pair<R: Rng>(
        &self,
        session: &SessionState,
        rng: &mut R,
    ) -> Result<Option<(Item, Item)>> {
        let items = ledger::group_items(&self.pool, session.user_id, &session.group_ids).await?;
        Ok(draw_two(items, rng))
    }
}

/// Draw two distinct items uniformly without replacement. Draw order is
/// presentation order; repeats across the session are possible by
/// design.
fn draw_two<R: Rng>(mut items: Vec<Item>, rng: &mut R) -> Option<(Item, Item)> {
    if items.len() < 2 {
        return None;
    }
    let picked = sample(rng, items.len(), 2);
    let (first, second) = (picked.index(0), picked.index(1));
    // Remove the higher index first so the lower one stays valid.
    if first > second {
        let item_a = items.swap_remove(first);
        let item_b = items.swap_remove(second);
        Some((item_a, item_b))
    } else {
        let item_b = items.swap_remove(second);
        let item_a = items.swap_remove(first);
        Some((item_a, item_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(id: i64) -> Item {
        Item {
            item_id: id,
            name: format!("item-{}", id),
            display_name: format!("Item {}", id),
            image: format!("item-{}.png", id),
        }
    }

    #[test]
    fn strategy_mapping_is_exhaustive() {
        assert_eq!(
            SelectionStrategy::for_session(WeightingMode::Equal, false),
            SelectionStrategy::EqualNoScreen
        );
        assert_eq!(
            SelectionStrategy::for_session(WeightingMode::Equal, true),
            SelectionStrategy::EqualScreen
        );
        assert_eq!(
            SelectionStrategy::for_session(WeightingMode::Custom, false),
            SelectionStrategy::Custom
        );
        assert_eq!(
            SelectionStrategy::for_session(WeightingMode::Custom, true),
            SelectionStrategy::Custom
        );
    }

    #[test]
    fn draw_two_returns_none_below_two_items() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(draw_two(vec![], &mut rng).is_none());
        assert!(draw_two(vec![item(1)], &mut rng).is_none());
    }

    #[test]
    fn draw_two_with_exactly_two_items_returns_both() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (a, b) = draw_two(vec![item(1), item(2)], &mut rng).unwrap();
            let mut ids = [a.item_id, b.item_id];
            ids.sort();
            assert_eq!(ids, [1, 2]);
        }
    }

    #[test]
    fn draw_two_never_repeats_an_item() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let items: Vec<Item> = (1..=6).map(item).collect();
            let (a, b) = draw_two(items, &mut rng).unwrap();
            assert_ne!(a.item_id, b.item_id);
        }
    }
}
