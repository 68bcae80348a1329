//! Refresh loop keeping one session per term alive.

use std::future::Future;
use std::time::Duration;

use autoin::{ALL_TERMS, BrowserAutomation, Orchestrator, SessionConsumer, SessionContext, SessionResult};
use autoin_protocol::{Credentials, LoginPreference, SessionRecord, TermContext};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

/// When to refresh a live session and how to back off after a soft failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
	pub interval: Duration,
	pub retry_base: Duration,
	pub retry_max: Duration,
}

impl Default for RefreshPolicy {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(30 * 60),
			retry_base: Duration::from_secs(30),
			retry_max: Duration::from_secs(15 * 60),
		}
	}
}

impl RefreshPolicy {
	/// `retry_base × 2^streak`, capped at `retry_max`.
	pub fn backoff(&self, streak: u32) -> Duration {
		let factor = 1u32.checked_shl(streak).unwrap_or(u32::MAX);
		self.retry_base.saturating_mul(factor).min(self.retry_max)
	}
}

/// Sign-on inputs shared by every slot.
#[derive(Debug, Clone)]
pub struct Account {
	pub credentials: Credentials,
	pub preference: LoginPreference,
	pub auto_push: bool,
}

/// Bookkeeping for one logical session.
#[derive(Debug, Clone)]
pub struct TermSlot {
	pub term: Option<TermContext>,
	pub record: SessionRecord,
	/// True until the first success.
	pub is_init: bool,
	/// Consecutive soft failures.
	pub streak: u32,
	pub due: Instant,
	pub retired: bool,
}

impl TermSlot {
	fn new(term: Option<TermContext>, due: Instant) -> Self {
		Self {
			term,
			record: SessionRecord::new(),
			is_init: true,
			streak: 0,
			due,
			retired: false,
		}
	}

	pub fn label(&self) -> &str {
		self.term.as_ref().map_or(ALL_TERMS, |term| term.term_name.as_str())
	}

	pub fn is_active(&self) -> bool {
		!self.retired
	}
}

/// What one slot invocation led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
	Refreshed,
	RetryIn(Duration),
	Retired,
}

/// Why [`Keeper::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
	Shutdown,
	AllRetired,
}

/// Runs the orchestrator for each slot when it falls due and hands successes to the consumer.
pub struct Keeper<B, C> {
	orchestrator: Orchestrator<B>,
	consumer: C,
	account: Account,
	policy: RefreshPolicy,
	slots: Vec<TermSlot>,
}

impl<B, C> Keeper<B, C>
where
	B: BrowserAutomation,
	C: SessionConsumer,
{
	/// One slot per term, or a single default-scope slot when `terms` is empty. All start due now.
	pub fn new(orchestrator: Orchestrator<B>, consumer: C, account: Account, terms: Vec<TermContext>, policy: RefreshPolicy) -> Self {
		let now = Instant::now();
		let slots = if terms.is_empty() {
			vec![TermSlot::new(None, now)]
		} else {
			terms.into_iter().map(|term| TermSlot::new(Some(term), now)).collect()
		};
		Self {
			orchestrator,
			consumer,
			account,
			policy,
			slots,
		}
	}

	pub fn slots(&self) -> &[TermSlot] {
		&self.slots
	}

	pub fn consumer(&self) -> &C {
		&self.consumer
	}

	pub fn into_orchestrator(self) -> Orchestrator<B> {
		self.orchestrator
	}

	/// Invokes every due slot in order and returns how many slots are still active.
	pub async fn run_due(&mut self) -> usize {
		for index in 0..self.slots.len() {
			let slot = &self.slots[index];
			if slot.is_active() && slot.due <= Instant::now() {
				self.step(index).await;
			}
		}
		self.slots.iter().filter(|slot| slot.is_active()).count()
	}

	/// Runs one invocation for the slot at `index` and reschedules it.
	pub async fn step(&mut self, index: usize) -> StepOutcome {
		let slot = &mut self.slots[index];
		let ctx = SessionContext {
			credentials: &self.account.credentials,
			term: slot.term.as_ref(),
			preference: &self.account.preference,
			auto_push: self.account.auto_push,
			is_init: slot.is_init,
		};
		let result = self.orchestrator.acquire_session(&ctx, &mut slot.record).await;

		let outcome = match result {
			SessionResult::Success(cookie) => match self.consumer.deliver(slot.label(), &cookie, &slot.record).await {
				Ok(()) => {
					slot.is_init = false;
					slot.streak = 0;
					info!(
						target = "autoin.keeper",
						term = %slot.label(),
						successes = slot.record.successes(),
						next_in = ?self.policy.interval,
						"session refreshed"
					);
					StepOutcome::Refreshed
				}
				Err(err) => {
					slot.is_init = false;
					let delay = self.policy.backoff(slot.streak);
					slot.streak = slot.streak.saturating_add(1);
					warn!(target = "autoin.keeper", term = %slot.label(), error = %err, retry_in = ?delay, "session delivery failed");
					StepOutcome::RetryIn(delay)
				}
			},
			SessionResult::SoftFailure(cause) => {
				let delay = self.policy.backoff(slot.streak);
				slot.streak = slot.streak.saturating_add(1);
				warn!(
					target = "autoin.keeper",
					term = %slot.label(),
					cause = %cause,
					streak = slot.streak,
					retry_in = ?delay,
					"session refresh failed, retrying"
				);
				StepOutcome::RetryIn(delay)
			}
			SessionResult::HardFailure(fault) => {
				slot.retired = true;
				error!(target = "autoin.keeper", term = %slot.label(), kind = ?fault.kind(), error = %fault, "session retired");
				StepOutcome::Retired
			}
		};

		match outcome {
			StepOutcome::Refreshed => slot.due = Instant::now() + self.policy.interval,
			StepOutcome::RetryIn(delay) => slot.due = Instant::now() + delay,
			StepOutcome::Retired => {}
		}
		outcome
	}

	fn next_due(&self) -> Option<Instant> {
		self.slots.iter().filter(|slot| slot.is_active()).map(|slot| slot.due).min()
	}

	/// Refreshes slots as they fall due until `shutdown` resolves or every slot is retired.
	pub async fn run<F>(&mut self, shutdown: F) -> RunExit
	where
		F: Future<Output = ()>,
	{
		tokio::pin!(shutdown);
		loop {
			let active = tokio::select! {
				biased;
				_ = &mut shutdown => None,
				active = self.run_due() => Some(active),
			};
			let Some(active) = active else {
				return self.stopped();
			};
			let Some(next) = self.next_due() else {
				error!(target = "autoin.keeper", "every session retired");
				return RunExit::AllRetired;
			};
			debug!(target = "autoin.keeper", active, wait = ?next.saturating_duration_since(Instant::now()), "sleeping until next refresh");
			tokio::select! {
				biased;
				_ = &mut shutdown => return self.stopped(),
				_ = sleep_until(next) => {}
			}
		}
	}

	fn stopped(&self) -> RunExit {
		info!(target = "autoin.keeper", "shutdown requested");
		RunExit::Shutdown
	}
}
