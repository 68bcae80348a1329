//! Scripted in-memory portal for orchestrator tests.
//!
//! [`FakeBrowser`] answers capability calls from a per-navigation [`Attempt`]
//! script and records every interaction as an [`Event`]. Timelines are measured
//! with `tokio::time`, so tests run on a paused clock.
//!
//! ```ignore
//! let browser = FakeBrowser::new();
//! browser.script(Attempt::two_factor_after(Duration::from_secs(2)));
//! let orchestrator = Orchestrator::new(browser.clone(), PortalLayout::default());
//! // ...
//! assert!(browser.events().contains(&Event::Clicked(selectors.push.clone())));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autoin_protocol::Cookie;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::browser::{BrowserAutomation, ElementHandle, FrameHandle, NavigationResponse, PageHandle, Scope, WaitOptions};
use crate::error::{BrowserError, Result};
use crate::portal::PortalLayout;

const POLL: Duration = Duration::from_millis(100);

/// Result of a scripted navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nav {
	Status(u16),
	NoResponse,
	Fail,
}

/// What the portal does after one navigation.
#[derive(Debug, Clone)]
pub struct Attempt {
	pub nav: Nav,
	/// Username/password form shown until credentials are submitted.
	pub sign_on: bool,
	/// Post-login controls become visible this long after load.
	pub logged_in_after: Option<Duration>,
	/// Two-factor frame and its form become present this long after load.
	pub two_factor_after: Option<Duration>,
	/// The two-factor frame is detached again this long after load.
	pub two_factor_gone_after: Option<Duration>,
}

impl Attempt {
	pub fn logged_in_after(delay: Duration) -> Self {
		Self {
			nav: Nav::Status(200),
			sign_on: false,
			logged_in_after: Some(delay),
			two_factor_after: None,
			two_factor_gone_after: None,
		}
	}

	pub fn two_factor_after(delay: Duration) -> Self {
		Self {
			nav: Nav::Status(200),
			sign_on: false,
			logged_in_after: None,
			two_factor_after: Some(delay),
			two_factor_gone_after: None,
		}
	}

	/// Neither outcome ever shows up.
	pub fn silent() -> Self {
		Self {
			nav: Nav::Status(200),
			sign_on: false,
			logged_in_after: None,
			two_factor_after: None,
			two_factor_gone_after: None,
		}
	}

	pub fn nav(nav: Nav) -> Self {
		Self { nav, ..Self::silent() }
	}

	pub fn with_sign_on(mut self) -> Self {
		self.sign_on = true;
		self
	}

	pub fn frame_gone_after(mut self, delay: Duration) -> Self {
		self.two_factor_gone_after = Some(delay);
		self
	}
}

/// Interaction recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	OpenPage(u64),
	ClosePage(u64),
	Navigate(String),
	Typed(String, String),
	Clicked(String),
	Selected(String, String),
	Cookies(String),
}

#[derive(Debug, Clone)]
enum Target {
	Page(String),
	Frame(String),
}

struct State {
	layout: PortalLayout,
	script: VecDeque<Attempt>,
	current: Attempt,
	loaded_at: Instant,
	frame_id: u64,
	pages: Vec<u64>,
	next_id: u64,
	elements: HashMap<u64, Target>,
	events: Vec<Event>,
	credentials_submitted: bool,
	approved: bool,
	typed_passcode: Option<String>,
	passcode_rejected: bool,

	cancel_present: bool,
	frame_without_form: bool,
	hint_text: Option<String>,
	reject_passcode: bool,
	approve_push: bool,
	cookies: Vec<Cookie>,
	default_timeout: Duration,
}

impl State {
	fn mint(&mut self) -> u64 {
		self.next_id += 1;
		self.next_id
	}

	fn elapsed_at_least(&self, delay: Option<Duration>) -> bool {
		delay.is_some_and(|d| self.loaded_at.elapsed() >= d)
	}

	fn form_gone(&self) -> bool {
		!self.current.sign_on || self.credentials_submitted
	}

	fn controls_visible(&self) -> bool {
		self.form_gone() && (self.approved || self.elapsed_at_least(self.current.logged_in_after))
	}

	fn frame_present(&self) -> bool {
		self.form_gone()
			&& self.elapsed_at_least(self.current.two_factor_after)
			&& !self.elapsed_at_least(self.current.two_factor_gone_after)
	}

	fn page_has(&self, selector: &str) -> bool {
		let s = &self.layout.selectors;
		if selector == s.username || selector == s.password || selector == s.submit {
			!self.form_gone()
		} else if selector == s.term_go || selector == s.term_selector {
			self.controls_visible()
		} else if selector == s.two_factor_frame {
			self.frame_present()
		} else {
			false
		}
	}

	fn frame_has(&self, selector: &str) -> bool {
		let s = &self.layout.selectors;
		if selector == s.cancel {
			self.cancel_present
		} else if selector == s.passcode_hint {
			self.hint_text.is_some()
		} else if selector == s.two_factor_ready {
			!self.frame_without_form
		} else {
			[
				&s.remember_me,
				&s.push,
				&s.passcode_button,
				&s.passcode_input,
				&s.passcode_submit,
			]
			.iter()
			.any(|known| known.as_str() == selector)
		}
	}

	fn target(&self, element: ElementHandle) -> Result<Target> {
		self.elements.get(&element.0).cloned().ok_or(BrowserError::StaleHandle {
			kind: "element",
			id: element.0,
		})
	}

	fn query(&mut self, scope: Scope, selector: &str) -> Result<Option<ElementHandle>> {
		let target = match scope {
			Scope::Page(_) => self.page_has(selector).then(|| Target::Page(selector.to_string())),
			Scope::Frame(frame) => {
				if frame.0 != self.frame_id || !self.frame_present() {
					return Err(BrowserError::StaleHandle { kind: "frame", id: frame.0 });
				}
				self.frame_has(selector).then(|| Target::Frame(selector.to_string()))
			}
		};
		Ok(target.map(|target| {
			let id = self.mint();
			self.elements.insert(id, target);
			ElementHandle(id)
		}))
	}
}

/// Cloneable handle to one scripted portal. Clones share state.
#[derive(Clone)]
pub struct FakeBrowser {
	state: Arc<Mutex<State>>,
}

impl Default for FakeBrowser {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeBrowser {
	pub fn new() -> Self {
		Self {
			state: Arc::new(Mutex::new(State {
				layout: PortalLayout::default(),
				script: VecDeque::new(),
				current: Attempt::silent(),
				loaded_at: Instant::now(),
				frame_id: 0,
				pages: vec![1],
				next_id: 1,
				elements: HashMap::new(),
				events: Vec::new(),
				credentials_submitted: false,
				approved: false,
				typed_passcode: None,
				passcode_rejected: false,
				cancel_present: false,
				frame_without_form: false,
				hint_text: None,
				reject_passcode: false,
				approve_push: true,
				cookies: vec![Cookie::new("a", "1"), Cookie::new("b", "2")],
				default_timeout: Duration::from_secs(30),
			})),
		}
	}

	/// Queues attempts; once the queue is empty every navigation is immediately logged in.
	pub fn script(&self, attempts: impl IntoIterator<Item = Attempt>) -> &Self {
		self.state.lock().script.extend(attempts);
		self
	}

	pub fn with_open_pages(&self, count: u64) -> &Self {
		let mut state = self.state.lock();
		state.pages = (1..=count).collect();
		state.next_id = state.next_id.max(count);
		self
	}

	pub fn with_auto_push_prompt(&self) -> &Self {
		self.state.lock().cancel_present = true;
		self
	}

	/// The two-factor frame attaches but its form never renders.
	pub fn with_frame_without_form(&self) -> &Self {
		self.state.lock().frame_without_form = true;
		self
	}

	pub fn with_hint(&self, text: &str) -> &Self {
		self.state.lock().hint_text = Some(text.to_string());
		self
	}

	pub fn rejecting_passcodes(&self) -> &Self {
		self.state.lock().reject_passcode = true;
		self
	}

	pub fn ignoring_push(&self) -> &Self {
		self.state.lock().approve_push = false;
		self
	}

	pub fn events(&self) -> Vec<Event> {
		self.state.lock().events.clone()
	}

	pub fn navigations(&self) -> usize {
		self.events().iter().filter(|e| matches!(e, Event::Navigate(_))).count()
	}

	pub fn open_pages(&self) -> Vec<u64> {
		self.state.lock().pages.clone()
	}

	pub fn clicked(&self, selector: &str) -> bool {
		self.events().contains(&Event::Clicked(selector.to_string()))
	}
}

#[async_trait]
impl BrowserAutomation for FakeBrowser {
	async fn open_page(&self) -> Result<PageHandle> {
		let mut state = self.state.lock();
		let id = state.mint();
		state.pages.push(id);
		state.events.push(Event::OpenPage(id));
		Ok(PageHandle(id))
	}

	async fn close_page(&self, page: PageHandle) -> Result<()> {
		let mut state = self.state.lock();
		let Some(pos) = state.pages.iter().position(|&p| p == page.0) else {
			return Err(BrowserError::StaleHandle { kind: "page", id: page.0 });
		};
		state.pages.remove(pos);
		state.events.push(Event::ClosePage(page.0));
		Ok(())
	}

	async fn list_pages(&self) -> Result<Vec<PageHandle>> {
		Ok(self.state.lock().pages.iter().copied().map(PageHandle).collect())
	}

	async fn navigate(&self, _page: PageHandle, url: &str) -> Result<Option<NavigationResponse>> {
		let mut state = self.state.lock();
		state.events.push(Event::Navigate(url.to_string()));
		let attempt = state
			.script
			.pop_front()
			.unwrap_or_else(|| Attempt::logged_in_after(Duration::ZERO));
		let nav = attempt.nav.clone();
		state.current = attempt;
		state.loaded_at = Instant::now();
		state.frame_id = state.mint();
		state.elements.clear();
		state.credentials_submitted = false;
		state.approved = false;
		state.typed_passcode = None;
		state.passcode_rejected = false;

		match nav {
			Nav::Status(status) => Ok(Some(NavigationResponse {
				status,
				url: url.to_string(),
			})),
			Nav::NoResponse => Ok(None),
			Nav::Fail => Err(BrowserError::Navigation {
				url: url.to_string(),
				message: "net::ERR_CONNECTION_RESET".into(),
			}),
		}
	}

	async fn content(&self, _page: PageHandle) -> Result<String> {
		let state = self.state.lock();
		Ok(if state.form_gone() {
			"<main>Welcome back</main>".to_string()
		} else {
			format!("<form><h1>{}</h1></form>", state.layout.sign_on_marker)
		})
	}

	async fn query(&self, scope: Scope, selector: &str) -> Result<Option<ElementHandle>> {
		self.state.lock().query(scope, selector)
	}

	async fn type_text(&self, element: ElementHandle, text: &str) -> Result<()> {
		let mut state = self.state.lock();
		let target = state.target(element)?;
		let selector = match target {
			Target::Page(selector) => selector,
			Target::Frame(selector) => {
				if selector == state.layout.selectors.passcode_input {
					state.typed_passcode = Some(text.to_string());
				}
				selector
			}
		};
		state.events.push(Event::Typed(selector, text.to_string()));
		Ok(())
	}

	async fn click(&self, element: ElementHandle) -> Result<()> {
		let mut state = self.state.lock();
		let selector = match state.target(element)? {
			Target::Page(selector) => {
				if selector == state.layout.selectors.submit {
					state.credentials_submitted = true;
				}
				selector
			}
			Target::Frame(selector) => {
				let s = state.layout.selectors.clone();
				if selector == s.push {
					state.approved = state.approve_push;
				} else if selector == s.cancel {
					state.cancel_present = false;
				} else if selector == s.passcode_submit && state.typed_passcode.is_some() {
					state.passcode_rejected = state.reject_passcode;
					state.approved = !state.reject_passcode;
				}
				selector
			}
		};
		state.events.push(Event::Clicked(selector));
		Ok(())
	}

	async fn wait_for_selector(&self, page: PageHandle, selector: &str, options: WaitOptions) -> Result<ElementHandle> {
		let timeout = options.timeout.unwrap_or(self.state.lock().default_timeout);
		let deadline = Instant::now() + timeout;
		loop {
			let found = self.state.lock().query(Scope::Page(page), selector)?;
			if let Some(element) = found {
				return Ok(element);
			}
			let now = Instant::now();
			if now >= deadline {
				return Err(BrowserError::Timeout {
					selector: selector.to_string(),
					timeout,
				});
			}
			tokio::time::sleep(POLL.min(deadline - now)).await;
		}
	}

	async fn select(&self, _page: PageHandle, selector: &str, value: &str) -> Result<()> {
		let mut state = self.state.lock();
		if !state.page_has(selector) {
			return Err(BrowserError::NotFound {
				selector: selector.to_string(),
			});
		}
		state.events.push(Event::Selected(selector.to_string(), value.to_string()));
		Ok(())
	}

	async fn cookies(&self, _page: PageHandle, url: &str) -> Result<Vec<Cookie>> {
		let mut state = self.state.lock();
		state.events.push(Event::Cookies(url.to_string()));
		Ok(state.cookies.clone())
	}

	async fn content_frame(&self, element: ElementHandle) -> Result<Option<FrameHandle>> {
		let state = self.state.lock();
		match state.target(element)? {
			Target::Page(selector) if selector == state.layout.selectors.two_factor_frame => {
				Ok(state.frame_present().then_some(FrameHandle(state.frame_id)))
			}
			_ => Ok(None),
		}
	}

	async fn element_text(&self, element: ElementHandle) -> Result<Option<String>> {
		let state = self.state.lock();
		match state.target(element)? {
			Target::Frame(selector) if selector == state.layout.selectors.passcode_hint => Ok(state.hint_text.clone()),
			_ => Ok(None),
		}
	}

	async fn frame_content(&self, frame: FrameHandle) -> Result<String> {
		let state = self.state.lock();
		if frame.0 != state.frame_id {
			return Err(BrowserError::StaleHandle { kind: "frame", id: frame.0 });
		}
		Ok(if state.passcode_rejected {
			format!("<div class=\"message\">{}. Please try again.</div>", state.layout.incorrect_passcode_marker)
		} else {
			"<div class=\"message\">Success! Logging you in...</div>".to_string()
		})
	}
}
