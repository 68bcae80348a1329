use serde::{Deserialize, Serialize};

/// The academic term a session is scoped to.
///
/// The portal's term picker is keyed by `"<sequence_id>:::<term_name>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermContext {
	pub sequence_id: u32,
	pub term_name: String,
}

impl TermContext {
	pub fn new(sequence_id: u32, term_name: impl Into<String>) -> Self {
		Self {
			sequence_id,
			term_name: term_name.into(),
		}
	}

	/// Value of the term picker option for this term.
	pub fn selector_value(&self) -> String {
		format!("{}:::{}", self.sequence_id, self.term_name)
	}
}
