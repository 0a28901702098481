//! Session state tracker
//!
//! Per-respondent state for one browsing session: the chronological
//! list of comparison ids made so far, the rejudge navigation pointer
//! and the weighting/group context cached at registration. The struct
//! is serde-serializable so the request layer can park it in whatever
//! session storage it uses; the engine itself never persists it.
//!
//! The id list is authoritative for "previous" navigation. It is kept
//! in submission order and never sorted.

use crate::ledger;
use cjs_common::db::models::WeightingMode;
use cjs_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub user_id: i64,
    /// Group memberships chosen at registration
    pub group_ids: Vec<i64>,
    /// Weighting mode cached at registration
    pub weighting: WeightingMode,
    /// Comparison ids in submission order
    pub comparison_ids: Vec<i64>,
    /// Comparison eligible for rejudge navigation
    pub previous_comparison_id: Option<i64>,
}

impl SessionState {
    /// Fresh state at registration: empty history, no pointer.
    pub fn initialize(user_id: i64, group_ids: Vec<i64>, weighting: WeightingMode) -> Self {
        SessionState {
            user_id,
            group_ids,
            weighting,
            comparison_ids: Vec::new(),
            previous_comparison_id: None,
        }
    }

    /// Recover session history from the ledger, e.g. after the session
    /// store lost a write. Ids come back in allocation order, which for
    /// one respondent equals submission order; the pointer lands on the
    /// most recent comparison.
    pub async fn rebuild(
        pool: &SqlitePool,
        user_id: i64,
        group_ids: Vec<i64>,
        weighting: WeightingMode,
    ) -> Result<Self> {
        let comparison_ids = ledger::comparison_ids(pool, user_id).await?;
        let previous_comparison_id = comparison_ids.last().copied();
        Ok(SessionState {
            user_id,
            group_ids,
            weighting,
            comparison_ids,
            previous_comparison_id,
        })
    }

    /// A new comparison was persisted: append its id and point the
    /// rejudge navigation at it.
    pub fn record_submission(&mut self, comparison_id: i64) {
        self.comparison_ids.push(comparison_id);
        self.previous_comparison_id = Some(comparison_id);
    }

    /// Entering rejudge mode on `comparison_id`: the pointer moves to
    /// the comparison immediately preceding it in submission order, or
    /// to none if it was the first ever made.
    ///
    /// The id has already been authenticated against the ledger, so a
    /// missing list entry can only mean a stale or rebuilt session; the
    /// pointer is cleared rather than failing the request.
    pub fn record_rejudge_entry(&mut self, comparison_id: i64) {
        match self.comparison_ids.iter().position(|&id| id == comparison_id) {
            Some(0) => self.previous_comparison_id = None,
            Some(index) => self.previous_comparison_id = Some(self.comparison_ids[index - 1]),
            None => {
                warn!(
                    comparison_id,
                    user_id = self.user_id,
                    "Rejudged comparison missing from session history"
                );
                self.previous_comparison_id = None;
            }
        }
    }

    /// Exiting rejudge mode: the pointer returns to the most recent
    /// comparison made, not to the one before the rejudged comparison.
    /// This asymmetry with `record_rejudge_entry` is intentional,
    /// observed product behavior.
    pub fn record_rejudge_exit(&mut self) {
        self.previous_comparison_id = self.comparison_ids.last().copied();
    }

    /// Rejudging is offered once some comparison has been made and the
    /// navigation pointer is set.
    pub fn can_rejudge(&self) -> bool {
        !self.comparison_ids.is_empty() && self.previous_comparison_id.is_some()
    }
}
