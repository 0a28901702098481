//! Comparison state machine
//!
//! A presented pair is conceptually pending until the respondent acts;
//! pending pairs are never persisted, so abandoning the page needs no
//! cleanup. A decision moves the comparison into one of three terminal
//! states (selected, tied, skipped), all of which stay eligible for
//! rejudging. Rejudge mutates the existing row in place; it never
//! creates a duplicate ledger entry.

use crate::ledger;
use crate::session::SessionState;
use cjs_common::db::models::ComparisonState;
use cjs_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// What the respondent did with the presented pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Confirmed a judgement (with or without a preferred item)
    Confirmed,
    /// Declined to compare the pair
    Skipped,
}

/// One decision posted for a presented pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub selected_item_id: Option<i64>,
}

impl Decision {
    pub fn confirmed(selected_item_id: Option<i64>) -> Self {
        Decision {
            action: Action::Confirmed,
            selected_item_id,
        }
    }

    pub fn skipped() -> Self {
        Decision {
            action: Action::Skipped,
            selected_item_id: None,
        }
    }

    /// Terminal state for this decision: confirmed with an item is
    /// selected, confirmed without one is tied, and skipped is skipped
    /// regardless of any carried item.
    pub fn state(&self) -> ComparisonState {
        match (self.action, self.selected_item_id) {
            (Action::Confirmed, Some(_)) => ComparisonState::Selected,
            (Action::Confirmed, None) => ComparisonState::Tied,
            (Action::Skipped, _) => ComparisonState::Skipped,
        }
    }

    /// Selected item as persisted: only a selected state keeps one.
    fn effective_selected(&self) -> Option<i64> {
        match self.state() {
            ComparisonState::Selected => self.selected_item_id,
            ComparisonState::Tied | ComparisonState::Skipped => None,
        }
    }
}

/// Persist a decision for a freshly presented pair. Appends the new
/// comparison id to the session history and points rejudge navigation
/// at it.
pub async fn submit(
    pool: &SqlitePool,
    session: &mut SessionState,
    item_a_id: i64,
    item_b_id: i64,
    decision: Decision,
) -> Result<i64> {
    if let Some(selected) = decision.effective_selected() {
        if selected != item_a_id && selected != item_b_id {
            return Err(Error::InvalidInput(format!(
                "Selected item {} is not part of the presented pair ({}, {})",
                selected, item_a_id, item_b_id
            )));
        }
    }

    let comparison_id = ledger::insert_comparison(
        pool,
        session.user_id,
        item_a_id,
        item_b_id,
        decision.state(),
        decision.effective_selected(),
    )
    .await?;

    session.record_submission(comparison_id);
    debug!(
        comparison_id,
        user_id = session.user_id,
        state = decision.state().as_str(),
        "Comparison submitted"
    );
    Ok(comparison_id)
}

/// Apply a new decision to an existing comparison in place. The session
/// id list is not appended to; the rejudge pointer returns to the most
/// recent comparison made. Fails with `NotFound` when the id does not
/// exist or belongs to another respondent.
pub async fn rejudge(
    pool: &SqlitePool,
    session: &mut SessionState,
    comparison_id: i64,
    decision: Decision,
) -> Result<()> {
    ledger::update_comparison(
        pool,
        comparison_id,
        session.user_id,
        decision.state(),
        decision.effective_selected(),
    )
    .await?;

    session.record_rejudge_exit();
    debug!(
        comparison_id,
        user_id = session.user_id,
        state = decision.state().as_str(),
        "Comparison rejudged"
    );
    Ok(())
}
