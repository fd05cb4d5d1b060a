//! Provider routing for copperclaw.
//!
//! Two pieces, deliberately separate:
//!
//! - [`classify`]: turns an arbitrary backend failure into a
//!   `{kind, retryable}` judgment from its error text alone.
//! - [`fallback`]: walks an ordered registry of (backend, model) pairs
//!   until one succeeds, guided entirely by that judgment.
//!
//! The split keeps the retry policy in one place: auth failures and
//! context overflows follow the request to every backend, so falling back
//! on them only wastes money; everything else is assumed transient or
//! backend-specific and worth another try elsewhere.

pub mod classify;
pub mod fallback;

pub use classify::{ClassifiedError, ErrorKind, classify_error};
pub use fallback::{
    ChatCall, FallbackAttempt, FallbackError, FallbackResult, FallbackRouter, ProviderEntry,
};
