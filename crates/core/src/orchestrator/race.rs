use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use super::Timings;
use crate::browser::{BrowserAutomation, PageHandle};
use crate::portal::Portal;

/// What the page showed after credentials were submitted (or skipped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
	LoggedIn,
	NeedsTwoFactor,
	Unclassified,
}

/// Races the post-login control against the two-factor frame.
///
/// The login waiter is polled first, so it wins when both are ready at once.
/// The frame prober has no timeout of its own; it stops once the login waiter
/// has seen the control, and the race ends when the login waiter times out.
pub(super) async fn classify<B>(portal: &Portal<'_, B>, page: PageHandle, timings: &Timings) -> Classification
where
	B: BrowserAutomation + ?Sized,
{
	let logged_in = AtomicBool::new(false);

	let mut login_waiter = Box::pin(async {
		match portal.wait_for_term_go(page, timings.login_timeout).await {
			Ok(_) => {
				logged_in.store(true, Ordering::Release);
				Classification::LoggedIn
			}
			Err(err) if err.is_timeout() => {
				debug!(target = "autoin.orchestrator", timeout = ?timings.login_timeout, "post-login control not seen");
				Classification::Unclassified
			}
			Err(err) => {
				warn!(target = "autoin.orchestrator", error = %err, "post-login wait failed");
				Classification::Unclassified
			}
		}
	});

	let mut frame_prober = Box::pin(async {
		loop {
			if logged_in.load(Ordering::Acquire) {
				return None;
			}
			match portal.two_factor_ready(page).await {
				Ok(Some(_)) => return Some(Classification::NeedsTwoFactor),
				Ok(None) => {}
				Err(err) => debug!(target = "autoin.orchestrator", error = %err, "two-factor probe failed"),
			}
			portal.browser().wait(timings.poll_interval).await;
		}
	});

	let classification = tokio::select! {
		biased;
		outcome = &mut login_waiter => outcome,
		Some(outcome) = &mut frame_prober => outcome,
	};

	drop(frame_prober);
	drop(login_waiter);
	classification
}
