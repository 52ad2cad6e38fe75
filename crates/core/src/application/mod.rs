// Application Layer - Reconciliation engine

pub mod bridge;
pub mod controller;
pub mod queue;
pub mod reconcile;
pub mod retry;
pub mod worker;

// Re-exports
pub use bridge::EventBridge;
pub use controller::Controller;
pub use queue::{ItemExponentialFailureRateLimiter, KeyQueue, RateLimiter};
pub use reconcile::{CrashLoopReconciler, NamespaceScope, Reconciler, WorkloadObserver};
pub use retry::{RetryDecision, RetryPolicy};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
