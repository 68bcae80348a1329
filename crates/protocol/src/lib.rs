//! Data types for portal session acquisition.
//!
//! This crate contains the serde-serializable values that flow between the
//! orchestrator, the browser runtime and the daemon: what the caller hands in
//! (credentials, term, login preference) and what it gets back (cookies and the
//! session-usage record).
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: behavior is limited to construction checks and formatting
//! * Caller-owned: nothing here reaches for a browser or a clock
//! * Stable: field names match the JSON written for downstream consumers
//!
//! The state machine that produces these values lives in `autoin`.

pub mod cookie;
pub mod credentials;
pub mod login;
pub mod session;
pub mod term;

pub use cookie::*;
pub use credentials::*;
pub use login::*;
pub use session::*;
pub use term::*;
