//! Browser automation capability consumed by the orchestrator.
//!
//! Handles are opaque ids minted by the implementation. A handle outlives the
//! DOM node it names only as long as the implementation can re-resolve it; once
//! it cannot, operations report [`BrowserError::StaleHandle`].

use std::time::Duration;

use async_trait::async_trait;
use autoin_protocol::Cookie;

use crate::error::Result;

/// An open page (tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageHandle(pub u64);

/// An element located by [`BrowserAutomation::query`] or [`BrowserAutomation::wait_for_selector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// The document nested inside an iframe element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Where a selector query is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
	Page(PageHandle),
	Frame(FrameHandle),
}

impl From<PageHandle> for Scope {
	fn from(page: PageHandle) -> Self {
		Self::Page(page)
	}
}

impl From<FrameHandle> for Scope {
	fn from(frame: FrameHandle) -> Self {
		Self::Frame(frame)
	}
}

/// Options for [`BrowserAutomation::wait_for_selector`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitOptions {
	/// Require the element to be rendered, not merely attached.
	pub visible: bool,
	/// `None` uses the implementation's default timeout.
	pub timeout: Option<Duration>,
}

impl WaitOptions {
	pub fn visible() -> Self {
		Self {
			visible: true,
			timeout: None,
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}
}

/// Main-document response observed by a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResponse {
	pub status: u16,
	pub url: String,
}

impl NavigationResponse {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Page-level browser operations.
///
/// Implementations share one browser across calls. Callers serialize
/// invocations that list or close pages.
#[async_trait]
pub trait BrowserAutomation: Send + Sync {
	async fn open_page(&self) -> Result<PageHandle>;

	async fn close_page(&self, page: PageHandle) -> Result<()>;

	async fn list_pages(&self) -> Result<Vec<PageHandle>>;

	/// Navigates and returns the main-document response, or `None` when the
	/// navigation completed without one (cache hit, same-document jump).
	async fn navigate(&self, page: PageHandle, url: &str) -> Result<Option<NavigationResponse>>;

	/// Serialized HTML of the page's main document.
	async fn content(&self, page: PageHandle) -> Result<String>;

	/// First element matching `selector` in `scope`, if any.
	async fn query(&self, scope: Scope, selector: &str) -> Result<Option<ElementHandle>>;

	async fn type_text(&self, element: ElementHandle, text: &str) -> Result<()>;

	async fn click(&self, element: ElementHandle) -> Result<()>;

	/// Resolves once `selector` matches, failing with [`BrowserError::Timeout`](crate::BrowserError::Timeout).
	async fn wait_for_selector(&self, page: PageHandle, selector: &str, options: WaitOptions) -> Result<ElementHandle>;

	/// Suspends for `duration` without blocking a thread.
	async fn wait(&self, duration: Duration) {
		tokio::time::sleep(duration).await;
	}

	/// Sets the value of the `<select>` matching `selector`.
	async fn select(&self, page: PageHandle, selector: &str, value: &str) -> Result<()>;

	/// Cookies the browser would send to `url`, in browser order.
	async fn cookies(&self, page: PageHandle, url: &str) -> Result<Vec<Cookie>>;

	/// Nested document of an iframe element, or `None` while it has none.
	async fn content_frame(&self, element: ElementHandle) -> Result<Option<FrameHandle>>;

	/// Rendered text of an element, or `None` when it has none.
	async fn element_text(&self, element: ElementHandle) -> Result<Option<String>>;

	/// Serialized HTML of a frame's document.
	async fn frame_content(&self, frame: FrameHandle) -> Result<String>;
}
