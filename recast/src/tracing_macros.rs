//! `trace!` and `debug!` for synthesis, cache and dispatch logging.
//!
//! Both forward to `tracing` under the `recast` target when the `tracing`
//! feature is on, and always in unit tests. Otherwise they expand to nothing
//! and their arguments are never evaluated.

#[cfg(any(test, feature = "tracing"))]
mod enabled {
    macro_rules! trace {
        ($($arg:tt)*) => {
            tracing::trace!(target: "recast", $($arg)*)
        };
    }

    macro_rules! debug {
        ($($arg:tt)*) => {
            tracing::debug!(target: "recast", $($arg)*)
        };
    }

    pub(crate) use {debug, trace};
}

#[cfg(not(any(test, feature = "tracing")))]
mod enabled {
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    pub(crate) use {debug, trace};
}

pub(crate) use enabled::{debug, trace};
