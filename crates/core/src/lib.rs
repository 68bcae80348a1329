//! Portal sign-on automation.
//!
//! `autoin` drives a browser through a credential and two-factor gated portal
//! and hands back the authenticated session as a cookie string.
//!
//! # Layers
//!
//! - [`BrowserAutomation`]: the page-level capability, implemented by
//!   `autoin-runtime` on top of Chromium and by a scripted fake in tests.
//! - [`Portal`]: owns every selector and URL ([`PortalLayout`]) and exposes the
//!   portal's controls as domain operations.
//! - [`Orchestrator`]: the sign-on state machine. One
//!   [`acquire_session`](Orchestrator::acquire_session) call yields a
//!   [`SessionResult`] and updates the caller's
//!   [`SessionRecord`](autoin_protocol::SessionRecord).
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(browser, PortalLayout::default());
//! let ctx = SessionContext {
//!     credentials: &credentials,
//!     term: term.as_ref(),
//!     preference: &LoginPreference::Push,
//!     auto_push: false,
//!     is_init: true,
//! };
//! match orchestrator.acquire_session(&ctx, &mut record).await {
//!     SessionResult::Success(cookie) => consumer.deliver(ctx.label(), &cookie, &record).await?,
//!     SessionResult::SoftFailure(cause) => schedule_retry(cause),
//!     SessionResult::HardFailure(fault) => return Err(fault.into()),
//! }
//! ```

pub mod browser;
pub mod consumer;
pub mod error;
pub mod orchestrator;
pub mod passcode;
pub mod portal;
pub mod term;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use browser::{BrowserAutomation, ElementHandle, FrameHandle, NavigationResponse, PageHandle, Scope, WaitOptions};
pub use consumer::SessionConsumer;
pub use error::{BrowserError, Fault, FaultKind, Result, SoftCause};
pub use orchestrator::{ALL_TERMS, Classification, MAX_ATTEMPTS, Orchestrator, SessionContext, SessionResult, Timings};
pub use portal::{Portal, PortalLayout, Selectors, TwoFactorControl};
