use serde::{Deserialize, Serialize};

/// Usage record for one long-lived logical session.
///
/// `start` is the unix time in milliseconds of the first successful cookie
/// extraction, `0` until then. Every later success appends to `call_history`.
/// Entries are non-decreasing and strictly later than `start`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
	pub start: u64,
	#[serde(default)]
	pub call_history: Vec<u64>,
}

impl SessionRecord {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_started(&self) -> bool {
		self.start != 0
	}

	/// Number of successful extractions recorded so far.
	pub fn successes(&self) -> usize {
		if self.is_started() { 1 + self.call_history.len() } else { 0 }
	}

	/// Records a successful extraction at `now_ms` and returns the stored value.
	///
	/// A timestamp that would break ordering (clock stepped back, or two calls in
	/// the same millisecond) is raised to the smallest admissible value.
	pub fn record_success(&mut self, now_ms: u64) -> u64 {
		if !self.is_started() {
			self.start = now_ms.max(1);
			return self.start;
		}

		let floor = self.call_history.last().copied().unwrap_or(0).max(self.start.saturating_add(1));
		let stamp = now_ms.max(floor);
		self.call_history.push(stamp);
		stamp
	}
}
