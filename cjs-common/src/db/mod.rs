//! Database schema, initialization and row models

pub mod init;
pub mod models;
pub mod setup;

pub use init::*;
pub use models::*;
pub use setup::*;
