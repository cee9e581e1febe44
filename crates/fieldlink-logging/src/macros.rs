//! ---
//! fl_section: "03-logging-metrics"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Context-enriched logging macros."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
//! Each macro accepts an optional `context = <LogContext>` prefix.

#[doc(hidden)]
#[macro_export]
macro_rules! __fl_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext = &$ctx;
        $crate::tracing::event!(
            $level,
            stage = ctx.stage.unwrap_or(""),
            attempt = ctx.attempt.unwrap_or_default(),
            command = ctx.command.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with stage context.
#[macro_export]
macro_rules! fl_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fl_event!($crate::tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fl_event!($crate::tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with stage context.
#[macro_export]
macro_rules! fl_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fl_event!($crate::tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fl_event!($crate::tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with stage context.
#[macro_export]
macro_rules! fl_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fl_event!($crate::tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fl_event!($crate::tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with stage context.
#[macro_export]
macro_rules! fl_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fl_event!($crate::tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fl_event!($crate::tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
