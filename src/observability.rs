//! Logging infrastructure for widecol.
//!
//! All events go through `tracing` with target "widecol" and carry an `event`
//! field for filtering.
//!
//! ## Library Integration
//!
//! widecol never initializes a global subscriber. Applications configure
//! tracing via `tracing_subscriber` or similar.
//!
//! ## Conventions
//!
//! - `event`: snake_case event name (required)
//! - `component`: subsystem (e.g., "read", "mutate", "consistency")
//! - Use `%` for Display, `?` for Debug formatting
//! - Row keys are logged with `?` so binary keys stay readable

/// Target for all widecol log events.
pub(crate) const WIDECOL_TARGET: &str = "widecol";

/// Macro for info-level log events.
///
/// # Example
/// ```ignore
/// log_info!(
///     component = "consistency",
///     event = "consistency_reached",
///     polls = polls,
/// );
/// ```
macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::WIDECOL_TARGET, $($field)*)
    };
}

/// Macro for debug-level log events.
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::WIDECOL_TARGET, $($field)*)
    };
}

/// Macro for warn-level log events.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::WIDECOL_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_info;
pub(crate) use log_warn;
