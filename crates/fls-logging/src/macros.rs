//! ---
//! fls_section: "03-persistence-logging"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Structured logging adapters and sinks."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! `fls_*!` macros. Each accepts an optional leading `context = <LogContext>`.

#[doc(hidden)]
#[macro_export]
macro_rules! __fls_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $level,
            machine = ctx.machine.unwrap_or(""),
            user = ctx.user.unwrap_or(""),
            identifier = ctx.identifier.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with lease context.
#[macro_export]
macro_rules! fls_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fls_event!($crate::tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fls_event!($crate::tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with lease context.
#[macro_export]
macro_rules! fls_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fls_event!($crate::tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fls_event!($crate::tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with lease context.
#[macro_export]
macro_rules! fls_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fls_event!($crate::tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fls_event!($crate::tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with lease context.
#[macro_export]
macro_rules! fls_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fls_event!($crate::tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fls_event!($crate::tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
