//! # CJS Engine
//!
//! Item-pair selection and comparison-session engine for
//! comparative-judgement surveys:
//! - Pair selector (equal, screened and custom-weighted pairing)
//! - Comparison ledger (persisted decisions and running statistics)
//! - Session state tracker (comparison history, rejudge navigation)
//! - Comparison state machine (submit / rejudge lifecycle)
//! - Respondent registration and item-preference screening
//!
//! The web layer consumes this crate; routing, templates and session
//! storage live outside it.

pub mod judgement;
pub mod ledger;
pub mod respondent;
pub mod selector;
pub mod session;
pub mod weights;

pub use judgement::{Action, Decision};
pub use ledger::ComparisonStats;
pub use selector::{PairSelector, SelectionStrategy};
pub use session::SessionState;
