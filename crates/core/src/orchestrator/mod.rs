//! The sign-on state machine.
//!
//! One call to [`Orchestrator::acquire_session`] drives a shared browser from a
//! fresh page to an extracted cookie string:
//!
//! ```text
//! Init -> PageLoaded -> (CredentialsSubmitted | AlreadyAuthenticated)
//!      -> Classifying{LoggedIn | NeedsTwoFactor | Unclassified}
//!      -> [TwoFactor] -> AwaitingPostLoginControls -> TermSelection? -> CookieExtraction
//! ```
//!
//! `Unclassified` loops back to `Init` until [`MAX_ATTEMPTS`] is reached. Every
//! other failure ends the invocation; the caller owns retry with backoff.

mod duo;
mod race;

#[cfg(test)]
mod tests;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use autoin_protocol::{Credentials, LoginPreference, SessionRecord, TermContext};
use tracing::{Instrument, debug, error, info, info_span, warn};

pub use self::race::Classification;
use crate::browser::BrowserAutomation;
use crate::error::{Fault, SoftCause};
use crate::portal::{Portal, PortalLayout};

/// Unclassified sign-on outcomes tolerated before giving up.
pub const MAX_ATTEMPTS: u32 = 6;

/// Label used for sessions without a term.
pub const ALL_TERMS: &str = "ALL";

/// Outcome of one [`Orchestrator::acquire_session`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
	/// `"; "`-joined `name=value` cookie pairs.
	Success(String),
	/// Transient; retry the whole call later.
	SoftFailure(SoftCause),
	/// Retry budget exhausted or the portal deviated from the expected flow.
	HardFailure(Fault),
}

impl SessionResult {
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success(_))
	}
}

/// Fixed delays and timeouts of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
	/// After the entry page loads, before inspecting it.
	pub settle: Duration,
	/// How long to wait for the post-login "go" control while classifying.
	pub login_timeout: Duration,
	/// Interval between two-factor frame probes while classifying.
	pub poll_interval: Duration,
	/// After classification, before acting on it.
	pub post_classify_settle: Duration,
	/// Before looking for the cancel control of an auto-sent push.
	pub auto_push_delay: Duration,
	/// After submitting an SMS passcode, before checking for rejection.
	pub passcode_settle: Duration,
}

impl Default for Timings {
	fn default() -> Self {
		Self {
			settle: Duration::from_secs(3),
			login_timeout: Duration::from_secs(30),
			poll_interval: Duration::from_millis(500),
			post_classify_settle: Duration::from_secs(4),
			auto_push_delay: Duration::from_secs(1),
			passcode_settle: Duration::from_secs(3),
		}
	}
}

/// Read-only inputs of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext<'a> {
	pub credentials: &'a Credentials,
	pub term: Option<&'a TermContext>,
	pub preference: &'a LoginPreference,
	/// The portal may have sent a push on page load that must be cancelled first.
	pub auto_push: bool,
	/// No session has been established for this context yet.
	pub is_init: bool,
}

impl SessionContext<'_> {
	/// Term name, or [`ALL_TERMS`].
	pub fn label(&self) -> &str {
		self.term.map_or(ALL_TERMS, |term| term.term_name.as_str())
	}
}

/// Drives a browser through the portal's sign-on flow.
pub struct Orchestrator<B> {
	browser: B,
	layout: PortalLayout,
	timings: Timings,
}

impl<B: BrowserAutomation> Orchestrator<B> {
	pub fn new(browser: B, layout: PortalLayout) -> Self {
		Self {
			browser,
			layout,
			timings: Timings::default(),
		}
	}

	pub fn with_timings(mut self, timings: Timings) -> Self {
		self.timings = timings;
		self
	}

	pub fn browser(&self) -> &B {
		&self.browser
	}

	pub fn into_browser(self) -> B {
		self.browser
	}

	/// Signs in and extracts the session cookies, recording the success in `record`.
	pub async fn acquire_session(&self, ctx: &SessionContext<'_>, record: &mut SessionRecord) -> SessionResult {
		let span = info_span!("session", term = %ctx.label());
		self.run(ctx, record).instrument(span).await
	}

	async fn run(&self, ctx: &SessionContext<'_>, record: &mut SessionRecord) -> SessionResult {
		let portal = Portal::new(&self.browser, &self.layout);
		let mut attempts: u32 = 0;

		let (page, classification) = loop {
			let page = match portal.fresh_page().await {
				Ok(page) => page,
				Err(err) => return soft(SoftCause::Browser(err)),
			};

			match portal.open_entry(page).await {
				Err(err) => {
					warn!(target = "autoin.orchestrator", error = %err, "navigation failed");
					return SessionResult::SoftFailure(SoftCause::Navigation(err));
				}
				Ok(None) => {
					attempts += 1;
					warn!(target = "autoin.orchestrator", attempts, "navigation returned no response, reloading");
					continue;
				}
				Ok(Some(response)) if !response.is_success() => {
					warn!(target = "autoin.orchestrator", status = response.status, url = %response.url, "portal returned error status");
					return SessionResult::SoftFailure(SoftCause::Status(response.status));
				}
				Ok(Some(response)) => {
					debug!(target = "autoin.orchestrator", status = response.status, url = %response.url, "entry page loaded");
				}
			}

			self.browser.wait(self.timings.settle).await;

			match portal.shows_sign_on(page).await {
				Ok(true) => {
					info!(target = "autoin.orchestrator", user = %ctx.credentials.username, "submitting credentials");
					if let Err(err) = portal.submit_credentials(page, ctx.credentials).await {
						return soft(SoftCause::Browser(err));
					}
				}
				Ok(false) => debug!(target = "autoin.orchestrator", "sign-on form absent, already authenticated"),
				Err(err) => return soft(SoftCause::Browser(err)),
			}

			match race::classify(&portal, page, &self.timings).await {
				Classification::Unclassified => {
					attempts += 1;
					if attempts >= MAX_ATTEMPTS {
						error!(target = "autoin.orchestrator", attempts, "could not classify sign-on outcome, giving up");
						return SessionResult::HardFailure(Fault::AttemptsExhausted { attempts });
					}
					warn!(target = "autoin.orchestrator", attempts, max = MAX_ATTEMPTS, "sign-on outcome unclassified, retrying");
				}
				classified => break (page, classified),
			}
		};

		info!(target = "autoin.orchestrator", ?classification, "sign-on outcome classified");

		if classification == Classification::NeedsTwoFactor && !ctx.is_init && ctx.preference.is_push() {
			error!(target = "autoin.orchestrator", "two-factor requested again on an established push session");
			return SessionResult::HardFailure(Fault::ContractViolation);
		}

		self.browser.wait(self.timings.post_classify_settle).await;

		if classification == Classification::NeedsTwoFactor {
			if let Err(fault) = duo::complete(&portal, page, ctx, &self.timings).await {
				error!(target = "autoin.orchestrator", error = %fault, kind = ?fault.kind(), "two-factor failed");
				return SessionResult::HardFailure(fault);
			}
		}

		if let Err(err) = portal.wait_for_post_login_controls(page).await {
			warn!(target = "autoin.orchestrator", error = %err, "post-login controls did not appear");
			return SessionResult::SoftFailure(SoftCause::PostLoginControls(err));
		}

		if let Some(term) = ctx.term {
			debug!(target = "autoin.orchestrator", value = %term.selector_value(), "selecting term");
			if let Err(err) = portal.select_term(page, term).await {
				return soft(SoftCause::Browser(err));
			}
		}

		let cookie = match portal.cookie_string(page, ctx.term).await {
			Ok(cookie) => cookie,
			Err(err) => return soft(SoftCause::Browser(err)),
		};

		let stamp = record.record_success(now_millis());
		info!(target = "autoin.orchestrator", at = stamp, successes = record.successes(), "session cookies extracted");
		SessionResult::Success(cookie)
	}
}

fn soft(cause: SoftCause) -> SessionResult {
	warn!(target = "autoin.orchestrator", error = %cause, "transient failure");
	SessionResult::SoftFailure(cause)
}

fn now_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or(0)
}
