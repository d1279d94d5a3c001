//! Stage instrumentation.
//!
//! `trace_span!` opens a span around a pipeline stage, `trace_event!` reports
//! per-image counts at info level and `trace_debug!` reports per-class counts
//! at debug level. Without the `tracing` feature all three expand to code
//! that only evaluates the field values.

#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::span!(tracing::Level::INFO, $name $(, $key = $value)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:literal $(, $key:ident = $value:expr)* $(,)?) => {{
        let _ = ($($value,)*);
        $crate::trace::DisabledSpan
    }};
}

#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::event!(name: $name, tracing::Level::INFO, $($key = $value),*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:literal $(, $key:ident = $value:expr)* $(,)?) => {{
        let _ = ($($value,)*);
    }};
}

#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($name:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::event!(name: $name, tracing::Level::DEBUG, $($key = $value),*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($name:literal $(, $key:ident = $value:expr)* $(,)?) => {{
        let _ = ($($value,)*);
    }};
}

pub(crate) use trace_debug;
pub(crate) use trace_event;
pub(crate) use trace_span;

/// Returned by `trace_span!` when the `tracing` feature is off.
#[cfg(not(feature = "tracing"))]
pub(crate) struct DisabledSpan;

#[cfg(not(feature = "tracing"))]
impl DisabledSpan {
    #[inline]
    pub(crate) fn entered(self) -> DisabledSpan {
        self
    }
}
