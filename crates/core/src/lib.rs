// Crashguard Core - Domain Logic, Reconciliation Engine & Ports
// NO cluster client dependencies: adapters live in infra crates

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, ReconcileError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
