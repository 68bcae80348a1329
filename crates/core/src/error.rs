//! Error types for the browser capability and the orchestrator's failure taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by a [`BrowserAutomation`](crate::BrowserAutomation) implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrowserError {
	#[error("timed out after {timeout:?} waiting for '{selector}'")]
	Timeout { selector: String, timeout: Duration },

	#[error("navigation to {url} failed: {message}")]
	Navigation { url: String, message: String },

	#[error("{kind} handle {id} is no longer valid")]
	StaleHandle { kind: &'static str, id: u64 },

	#[error("no element matches '{selector}'")]
	NotFound { selector: String },

	#[error("browser protocol error: {0}")]
	Protocol(String),
}

impl BrowserError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}

/// Result alias for capability calls.
pub type Result<T, E = BrowserError> = std::result::Result<T, E>;

/// Category of a [`Fault`], for callers that branch on the kind of hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
	RetryBudgetExhausted,
	ElementMissing,
	PasscodeMismatch,
	ContractViolation,
	Browser,
}

/// Reason an invocation ended in a hard failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Fault {
	#[error("attempts exhausted after {attempts} unclassified sign-on outcomes")]
	AttemptsExhausted { attempts: u32 },

	/// A non-initial push session was asked for a second factor again.
	#[error("portal demanded two-factor on a session expected to be established")]
	ContractViolation,

	#[error("two-factor element missing: {0}")]
	ElementMissing(&'static str),

	#[error("passcode hint has unexpected text: {0:?}")]
	UnreadableHint(String),

	#[error("no candidate passcode starts with {hint:?}")]
	NoMatchingPasscode { hint: String },

	#[error("portal rejected the submitted passcode")]
	PasscodeRejected,

	#[error("two-factor step failed: {0}")]
	Browser(#[from] BrowserError),
}

impl Fault {
	pub fn kind(&self) -> FaultKind {
		match self {
			Self::AttemptsExhausted { .. } => FaultKind::RetryBudgetExhausted,
			Self::ContractViolation => FaultKind::ContractViolation,
			Self::ElementMissing(_) | Self::UnreadableHint(_) => FaultKind::ElementMissing,
			Self::NoMatchingPasscode { .. } | Self::PasscodeRejected => FaultKind::PasscodeMismatch,
			Self::Browser(_) => FaultKind::Browser,
		}
	}
}

/// Diagnostic attached to a soft failure. Callers retry the same way for every cause.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SoftCause {
	#[error("navigation failed: {0}")]
	Navigation(BrowserError),

	#[error("portal answered with HTTP {0}")]
	Status(u16),

	#[error("post-login controls never appeared: {0}")]
	PostLoginControls(BrowserError),

	#[error("transient browser error: {0}")]
	Browser(BrowserError),
}
