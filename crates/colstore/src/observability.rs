//! Logging macros for colstore diagnostics.
//!
//! Every event goes to the `colstore` target and carries a `component`
//! (`memory`, `disk`, `enhanced`, `ingest`, ...) and an `event` name so a
//! subscriber can filter on either. The library never installs a subscriber.

pub(crate) const COLSTORE_TARGET: &str = "colstore";

macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::COLSTORE_TARGET, $($field)*)
    };
}

macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::COLSTORE_TARGET, $($field)*)
    };
}

macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::COLSTORE_TARGET, $($field)*)
    };
}

macro_rules! log_error {
    ($($field:tt)*) => {
        ::tracing::error!(target: $crate::observability::COLSTORE_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_warn;
