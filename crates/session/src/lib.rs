//! Session storage for copperclaw.
//!
//! One conversation may have at most one turn in flight: building the
//! prompt, calling the backend, and appending the response all read and
//! mutate the same session state, and interleaving two turns corrupts it.
//! Rather than leaving that rule to caller discipline, the store hands
//! out turn guards; holding the guard is holding the session.

pub mod store;

pub use store::{SessionStore, TurnGuard};
