//! [`BrowserAutomation`] over a chromiumoxide [`Browser`].
//!
//! Handles are registry ids. Pages map to chromiumoxide [`Page`]s; elements and
//! frames are recorded as a frame selector chain plus a selector and are
//! re-resolved on every call, so a handle survives re-renders of its document.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use autoin::{BrowserAutomation, BrowserError, ElementHandle, FrameHandle, NavigationResponse, PageHandle, Scope, WaitOptions};
use autoin_protocol::Cookie;
use chromiumoxide::cdp::browser_protocol::network::GetCookiesParams;
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use chromiumoxide::{Browser, Page};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::protocol;
use crate::script::{self, Action, Probe};

type CapResult<T> = std::result::Result<T, BrowserError>;

/// An element or frame document: iframe selectors from the top document, then a selector.
#[derive(Debug, Clone)]
struct Located {
	page: u64,
	path: Vec<String>,
	selector: String,
}

#[derive(Debug, Clone)]
struct FramePath {
	page: u64,
	path: Vec<String>,
}

#[derive(Default)]
struct Registry {
	next_id: u64,
	pages: HashMap<u64, Page>,
	by_target: HashMap<TargetId, u64>,
	elements: HashMap<u64, Located>,
	frames: HashMap<u64, FramePath>,
}

impl Registry {
	fn mint(&mut self) -> u64 {
		self.next_id += 1;
		self.next_id
	}

	fn adopt(&mut self, page: Page) -> PageHandle {
		if let Some(&id) = self.by_target.get(page.target_id()) {
			return PageHandle(id);
		}
		let id = self.mint();
		self.by_target.insert(page.target_id().clone(), id);
		self.pages.insert(id, page);
		PageHandle(id)
	}

	fn forget(&mut self, page: PageHandle) -> Option<Page> {
		let removed = self.pages.remove(&page.0)?;
		self.by_target.remove(removed.target_id());
		self.elements.retain(|_, loc| loc.page != page.0);
		self.frames.retain(|_, frame| frame.page != page.0);
		Some(removed)
	}

	fn page(&self, page: u64) -> CapResult<Page> {
		self.pages
			.get(&page)
			.cloned()
			.ok_or(BrowserError::StaleHandle { kind: "page", id: page })
	}

	fn element(&self, element: ElementHandle) -> CapResult<Located> {
		self.elements.get(&element.0).cloned().ok_or(BrowserError::StaleHandle {
			kind: "element",
			id: element.0,
		})
	}

	fn frame(&self, frame: FrameHandle) -> CapResult<FramePath> {
		self.frames.get(&frame.0).cloned().ok_or(BrowserError::StaleHandle {
			kind: "frame",
			id: frame.0,
		})
	}
}

/// Chromium instance shared by every orchestrator invocation.
pub struct ChromiumBrowser {
	browser: tokio::sync::Mutex<Browser>,
	handler: JoinHandle<()>,
	registry: Mutex<Registry>,
	default_timeout: Duration,
	poll_interval: Duration,
}

impl ChromiumBrowser {
	pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, default_timeout: Duration) -> Self {
		Self {
			browser: tokio::sync::Mutex::new(browser),
			handler,
			registry: Mutex::new(Registry::default()),
			default_timeout,
			poll_interval: Duration::from_millis(100),
		}
	}

	/// Closes the browser process and stops the event handler.
	pub async fn close(self) {
		let mut browser = self.browser.lock().await;
		if let Err(err) = browser.close().await {
			warn!(target = "autoin.runtime", error = %err, "browser did not close cleanly");
		}
		if let Err(err) = browser.wait().await {
			debug!(target = "autoin.runtime", error = %err, "browser process wait failed");
		}
	}

	fn page(&self, page: PageHandle) -> CapResult<Page> {
		self.registry.lock().page(page.0)
	}

	async fn run(&self, page: u64, path: &[String], selector: Option<&str>, action: Action<'_>) -> CapResult<Probe> {
		let tab = self.registry.lock().page(page)?;
		let expression = script::build(path, selector, action);
		let result = tab.evaluate_expression(expression).await.map_err(protocol)?;
		result
			.into_value::<Probe>()
			.map_err(|err| BrowserError::Protocol(format!("unexpected script result: {err}")))
	}

	fn mint_element(&self, located: Located) -> ElementHandle {
		let mut registry = self.registry.lock();
		let id = registry.mint();
		registry.elements.insert(id, located);
		ElementHandle(id)
	}

	fn scope(&self, scope: Scope) -> CapResult<FramePath> {
		match scope {
			Scope::Page(page) => {
				self.page(page)?;
				Ok(FramePath {
					page: page.0,
					path: Vec::new(),
				})
			}
			Scope::Frame(frame) => self.registry.lock().frame(frame),
		}
	}

	async fn on_element(&self, element: ElementHandle, action: Action<'_>) -> CapResult<Value> {
		let located = self.registry.lock().element(element)?;
		match self
			.run(located.page, &located.path, Some(&located.selector), action)
			.await?
		{
			Probe::Ok { value } => Ok(value),
			Probe::Missing => Err(BrowserError::NotFound {
				selector: located.selector,
			}),
			Probe::Stale => Err(BrowserError::StaleHandle {
				kind: "element",
				id: element.0,
			}),
		}
	}
}

impl Drop for ChromiumBrowser {
	fn drop(&mut self) {
		self.handler.abort();
	}
}

#[async_trait]
impl BrowserAutomation for ChromiumBrowser {
	async fn open_page(&self) -> CapResult<PageHandle> {
		let page = self.browser.lock().await.new_page("about:blank").await.map_err(protocol)?;
		let handle = self.registry.lock().adopt(page);
		debug!(target = "autoin.runtime", page = handle.0, "opened page");
		Ok(handle)
	}

	async fn close_page(&self, page: PageHandle) -> CapResult<()> {
		let tab = self
			.registry
			.lock()
			.forget(page)
			.ok_or(BrowserError::StaleHandle { kind: "page", id: page.0 })?;
		tab.close().await.map_err(protocol)?;
		debug!(target = "autoin.runtime", page = page.0, "closed page");
		Ok(())
	}

	async fn list_pages(&self) -> CapResult<Vec<PageHandle>> {
		let pages = self.browser.lock().await.pages().await.map_err(protocol)?;
		let mut registry = self.registry.lock();
		Ok(pages.into_iter().map(|page| registry.adopt(page)).collect())
	}

	async fn navigate(&self, page: PageHandle, url: &str) -> CapResult<Option<NavigationResponse>> {
		let tab = self.page(page)?;
		tab.goto(url).await.map_err(|err| BrowserError::Navigation {
			url: url.to_string(),
			message: err.to_string(),
		})?;
		let request = tab
			.wait_for_navigation_response()
			.await
			.map_err(|err| BrowserError::Navigation {
				url: url.to_string(),
				message: err.to_string(),
			})?;

		let response = request.and_then(|request| {
			request.response.as_ref().map(|response| NavigationResponse {
				status: u16::try_from(response.status).unwrap_or(0),
				url: response.url.clone(),
			})
		});
		trace!(target = "autoin.runtime", %url, ?response, "navigation finished");
		Ok(response)
	}

	async fn content(&self, page: PageHandle) -> CapResult<String> {
		self.page(page)?.content().await.map_err(protocol)
	}

	async fn query(&self, scope: Scope, selector: &str) -> CapResult<Option<ElementHandle>> {
		let frame = self.scope(scope)?;
		match self.run(frame.page, &frame.path, Some(selector), Action::Exists).await? {
			Probe::Ok { .. } => Ok(Some(self.mint_element(Located {
				page: frame.page,
				path: frame.path,
				selector: selector.to_string(),
			}))),
			Probe::Missing => Ok(None),
			Probe::Stale => Err(match scope {
				Scope::Frame(frame) => BrowserError::StaleHandle { kind: "frame", id: frame.0 },
				Scope::Page(page) => BrowserError::StaleHandle { kind: "page", id: page.0 },
			}),
		}
	}

	async fn type_text(&self, element: ElementHandle, text: &str) -> CapResult<()> {
		let located = self.registry.lock().element(element)?;
		if located.path.is_empty() {
			let tab = self.registry.lock().page(located.page)?;
			let node = tab.find_element(located.selector.as_str()).await.map_err(protocol)?;
			node.click().await.map_err(protocol)?;
			node.type_str(text).await.map_err(protocol)?;
			return Ok(());
		}
		self.on_element(element, Action::SetValue(text)).await.map(drop)
	}

	async fn click(&self, element: ElementHandle) -> CapResult<()> {
		let located = self.registry.lock().element(element)?;
		if located.path.is_empty() {
			let tab = self.registry.lock().page(located.page)?;
			let node = tab.find_element(located.selector.as_str()).await.map_err(protocol)?;
			node.click().await.map_err(protocol)?;
			return Ok(());
		}
		self.on_element(element, Action::Click).await.map(drop)
	}

	async fn wait_for_selector(&self, page: PageHandle, selector: &str, options: WaitOptions) -> CapResult<ElementHandle> {
		let timeout = options.timeout.unwrap_or(self.default_timeout);
		let action = if options.visible { Action::Visible } else { Action::Exists };
		let start = Instant::now();
		loop {
			if let Probe::Ok { .. } = self.run(page.0, &[], Some(selector), action).await? {
				return Ok(self.mint_element(Located {
					page: page.0,
					path: Vec::new(),
					selector: selector.to_string(),
				}));
			}
			if start.elapsed() >= timeout {
				return Err(BrowserError::Timeout {
					selector: selector.to_string(),
					timeout,
				});
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}

	async fn select(&self, page: PageHandle, selector: &str, value: &str) -> CapResult<()> {
		match self.run(page.0, &[], Some(selector), Action::SetValue(value)).await? {
			Probe::Ok { .. } => Ok(()),
			Probe::Missing | Probe::Stale => Err(BrowserError::NotFound {
				selector: selector.to_string(),
			}),
		}
	}

	async fn cookies(&self, page: PageHandle, url: &str) -> CapResult<Vec<Cookie>> {
		let tab = self.page(page)?;
		let response = tab
			.execute(GetCookiesParams::builder().url(url).build())
			.await
			.map_err(protocol)?;
		Ok(response
			.result
			.cookies
			.iter()
			.map(|cookie| Cookie {
				name: cookie.name.clone(),
				value: cookie.value.clone(),
				domain: Some(cookie.domain.clone()),
				path: Some(cookie.path.clone()),
			})
			.collect())
	}

	async fn content_frame(&self, element: ElementHandle) -> CapResult<Option<FrameHandle>> {
		let located = self.registry.lock().element(element)?;
		match self
			.run(located.page, &located.path, Some(&located.selector), Action::FrameAttached)
			.await?
		{
			Probe::Ok { .. } => {
				let mut path = located.path;
				path.push(located.selector);
				let mut registry = self.registry.lock();
				let id = registry.mint();
				registry.frames.insert(id, FramePath { page: located.page, path });
				Ok(Some(FrameHandle(id)))
			}
			Probe::Missing => Ok(None),
			Probe::Stale => Err(BrowserError::StaleHandle {
				kind: "element",
				id: element.0,
			}),
		}
	}

	async fn element_text(&self, element: ElementHandle) -> CapResult<Option<String>> {
		let value = self.on_element(element, Action::Text).await?;
		Ok(value.as_str().map(str::to_string))
	}

	async fn frame_content(&self, frame: FrameHandle) -> CapResult<String> {
		let located = self.registry.lock().frame(frame)?;
		match self.run(located.page, &located.path, None, Action::DocumentHtml).await? {
			Probe::Ok { value } => Ok(value.as_str().unwrap_or_default().to_string()),
			Probe::Missing | Probe::Stale => Err(BrowserError::StaleHandle { kind: "frame", id: frame.0 }),
		}
	}
}
