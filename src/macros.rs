// Conditional tracing support
//
// These macros forward to `tracing` when the `tracing` feature is enabled
// and expand to nothing otherwise.

/// Enter an info span for the rest of the enclosing block.
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!($name $(, $($field)*)?).entered();
    };
}

/// Emit a debug event.
macro_rules! trace_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::debug!($($arg)*);
    };
}

/// Emit a warning event.
macro_rules! trace_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::warn!($($arg)*);
    };
}
