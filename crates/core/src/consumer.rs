use async_trait::async_trait;
use autoin_protocol::SessionRecord;

/// Receives freshly extracted session cookies.
///
/// `label` names the logical session: the term name, or `ALL` for the
/// default scope.
#[async_trait]
pub trait SessionConsumer: Send + Sync {
	type Error: std::error::Error + Send + Sync + 'static;

	async fn deliver(&self, label: &str, cookie: &str, record: &SessionRecord) -> Result<(), Self::Error>;
}
