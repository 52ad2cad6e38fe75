// Panic isolation for worker safety: each reconciliation runs in its own task
use std::any::Any;
use tokio::task::JoinError;
use tracing::error;

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Describe a failed reconciliation task.
///
/// A panic inside the task is caught by the runtime and surfaces here instead of
/// unwinding through the worker loop.
pub fn describe_join_error(join_err: JoinError) -> String {
    if join_err.is_panic() {
        let payload = join_err.into_panic();
        let panic_msg = panic_message(payload.as_ref());
        error!(panic_msg = %panic_msg, "Reconciliation task panicked");
        panic_msg
    } else {
        error!(error = %join_err, "Reconciliation task cancelled");
        "task cancelled".to_string()
    }
}
