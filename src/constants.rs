// -
// Thread names

pub(crate) const INPUT_EXECUTOR_THREAD: &str = "sigline-exec-input";
pub(crate) const OUTPUT_EXECUTOR_THREAD: &str = "sigline-exec-output";
pub(crate) const WATCHER_THREAD: &str = "sigline-watch";
pub(crate) const DISPATCH_THREAD_PREFIX: &str = "sigline-dispatch-";

// -
// Settings

/// Environment variable prefix for settings overrides, e.g. `SIGLINE__WATCHER__SHUTDOWN_GRACE_MS`
pub(crate) const ENV_PREFIX: &str = "SIGLINE";
pub(crate) const ENV_SEPARATOR: &str = "__";
