pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Decimal, DistributionRecord, LedgerEntry, LedgerEntryKind, Position, PositionId, PositionKind,
    PositionStatus, TimeMs, UserId,
};
pub use error::AppError;
pub use orchestration::{Orchestrator, RunReport};
