//! Portal layout and the adapter that turns it into domain operations.
//!
//! Every selector and URL the sign-on flow touches lives in [`PortalLayout`].
//! The orchestrator talks to [`Portal`], which resolves them against a
//! [`BrowserAutomation`] implementation.

use std::time::Duration;

use autoin_protocol::{Credentials, TermContext, cookie_header};
use serde::Deserialize;

use crate::browser::{BrowserAutomation, ElementHandle, FrameHandle, NavigationResponse, PageHandle, Scope, WaitOptions};
use crate::error::{BrowserError, Result};

/// URLs and page markers of the portal being signed into.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortalLayout {
	pub entry_url: String,
	/// Cookie scope when no term is selected.
	pub cookie_url: String,
	/// Cookie scope for a selected term. `{term}` is replaced by the term name.
	pub term_cookie_url: String,
	/// Text present in the page while the username/password form is shown.
	pub sign_on_marker: String,
	/// Text the two-factor frame shows after a rejected passcode.
	pub incorrect_passcode_marker: String,
	pub selectors: Selectors,
}

impl Default for PortalLayout {
	fn default() -> Self {
		Self {
			entry_url: "https://portal.example.edu/webreg/start".into(),
			cookie_url: "https://portal.example.edu/webreg/svc".into(),
			term_cookie_url: "https://portal.example.edu/webreg/svc/schedule?termcode={term}".into(),
			sign_on_marker: "Single Sign-On".into(),
			incorrect_passcode_marker: "Incorrect passcode".into(),
			selectors: Selectors::default(),
		}
	}
}

impl PortalLayout {
	/// Cookie scope for `term`, or the default scope.
	pub fn cookie_url_for(&self, term: Option<&TermContext>) -> String {
		match term {
			Some(term) => self.term_cookie_url.replace("{term}", &term.term_name),
			None => self.cookie_url.clone(),
		}
	}
}

/// CSS selectors for every control the flow interacts with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Selectors {
	pub username: String,
	pub password: String,
	pub submit: String,
	pub term_selector: String,
	pub term_go: String,
	pub two_factor_frame: String,
	/// Element inside the two-factor document that marks it as rendered.
	pub two_factor_ready: String,
	pub cancel: String,
	pub remember_me: String,
	pub push: String,
	pub passcode_button: String,
	pub passcode_hint: String,
	pub passcode_input: String,
	pub passcode_submit: String,
}

impl Default for Selectors {
	fn default() -> Self {
		Self {
			username: "#ssousername".into(),
			password: "#ssopassword".into(),
			submit: "button[type=submit]".into(),
			term_selector: "#startpage-select-term".into(),
			term_go: "#startpage-button-go".into(),
			two_factor_frame: "iframe#duo_iframe".into(),
			two_factor_ready: "#login-form".into(),
			cancel: "button.btn-cancel".into(),
			remember_me: "input[name=\"dampen_choice\"]".into(),
			push: "button.positive.auth-button".into(),
			passcode_button: "#passcode".into(),
			passcode_hint: ".next-passcode-msg".into(),
			passcode_input: "input[name=\"passcode\"]".into(),
			passcode_submit: "#passcode".into(),
		}
	}
}

/// Controls inside the two-factor document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorControl {
	Ready,
	Cancel,
	RememberMe,
	Push,
	PasscodeButton,
	PasscodeHint,
	PasscodeInput,
	PasscodeSubmit,
}

impl TwoFactorControl {
	pub fn name(self) -> &'static str {
		match self {
			Self::Ready => "two-factor form",
			Self::Cancel => "cancel button",
			Self::RememberMe => "remember-me checkbox",
			Self::Push => "push button",
			Self::PasscodeButton => "passcode button",
			Self::PasscodeHint => "passcode hint",
			Self::PasscodeInput => "passcode input",
			Self::PasscodeSubmit => "passcode submit",
		}
	}
}

/// Domain operations over one browser and one layout.
pub struct Portal<'a, B: ?Sized> {
	browser: &'a B,
	layout: &'a PortalLayout,
}

impl<'a, B: BrowserAutomation + ?Sized> Portal<'a, B> {
	pub fn new(browser: &'a B, layout: &'a PortalLayout) -> Self {
		Self { browser, layout }
	}

	pub fn browser(&self) -> &'a B {
		self.browser
	}

	/// Closes every page but the first, then opens a fresh one for this attempt.
	pub async fn fresh_page(&self) -> Result<PageHandle> {
		let pages = self.browser.list_pages().await?;
		for page in pages.into_iter().skip(1) {
			self.browser.close_page(page).await?;
		}
		self.browser.open_page().await
	}

	pub async fn open_entry(&self, page: PageHandle) -> Result<Option<NavigationResponse>> {
		self.browser.navigate(page, &self.layout.entry_url).await
	}

	/// Whether the page still shows the username/password form.
	pub async fn shows_sign_on(&self, page: PageHandle) -> Result<bool> {
		let html = self.browser.content(page).await?;
		Ok(html.contains(&self.layout.sign_on_marker))
	}

	pub async fn submit_credentials(&self, page: PageHandle, credentials: &Credentials) -> Result<()> {
		let selectors = &self.layout.selectors;
		let username = self.require(page.into(), &selectors.username).await?;
		self.browser.type_text(username, &credentials.username).await?;
		let password = self.require(page.into(), &selectors.password).await?;
		self.browser.type_text(password, credentials.password()).await?;
		let submit = self.require(page.into(), &selectors.submit).await?;
		self.browser.click(submit).await
	}

	/// Waits for the term "go" control, the signal that sign-on completed.
	pub async fn wait_for_term_go(&self, page: PageHandle, timeout: Duration) -> Result<ElementHandle> {
		self.browser
			.wait_for_selector(page, &self.layout.selectors.term_go, WaitOptions::visible().with_timeout(timeout))
			.await
	}

	/// The attached two-factor frame's document, if there is one.
	pub async fn two_factor_frame(&self, page: PageHandle) -> Result<Option<FrameHandle>> {
		let Some(iframe) = self.browser.query(page.into(), &self.layout.selectors.two_factor_frame).await? else {
			return Ok(None);
		};
		self.browser.content_frame(iframe).await
	}

	/// Frame and ready element both present.
	pub async fn two_factor_ready(&self, page: PageHandle) -> Result<Option<FrameHandle>> {
		let Some(frame) = self.two_factor_frame(page).await? else {
			return Ok(None);
		};
		Ok(self.control(frame, TwoFactorControl::Ready).await?.map(|_| frame))
	}

	/// Looks up a control inside the two-factor document.
	pub async fn control(&self, frame: FrameHandle, control: TwoFactorControl) -> Result<Option<ElementHandle>> {
		self.browser.query(frame.into(), self.control_selector(control)).await
	}

	pub async fn frame_text(&self, frame: FrameHandle) -> Result<String> {
		self.browser.frame_content(frame).await
	}

	pub fn passcode_rejected(&self, frame_html: &str) -> bool {
		frame_html.contains(&self.layout.incorrect_passcode_marker)
	}

	/// Waits with the browser's default timeout for the term picker and its "go" control.
	pub async fn wait_for_post_login_controls(&self, page: PageHandle) -> Result<()> {
		let selectors = &self.layout.selectors;
		self.browser
			.wait_for_selector(page, &selectors.term_selector, WaitOptions::visible())
			.await?;
		self.browser
			.wait_for_selector(page, &selectors.term_go, WaitOptions::visible())
			.await?;
		Ok(())
	}

	pub async fn select_term(&self, page: PageHandle, term: &TermContext) -> Result<()> {
		let selectors = &self.layout.selectors;
		self.browser
			.select(page, &selectors.term_selector, &term.selector_value())
			.await?;
		let go = self.require(page.into(), &selectors.term_go).await?;
		self.browser.click(go).await
	}

	/// Cookie header for the term's scope (or the default scope).
	pub async fn cookie_string(&self, page: PageHandle, term: Option<&TermContext>) -> Result<String> {
		let url = self.layout.cookie_url_for(term);
		let cookies = self.browser.cookies(page, &url).await?;
		Ok(cookie_header(&cookies))
	}

	fn control_selector(&self, control: TwoFactorControl) -> &'a str {
		let selectors = &self.layout.selectors;
		match control {
			TwoFactorControl::Ready => &selectors.two_factor_ready,
			TwoFactorControl::Cancel => &selectors.cancel,
			TwoFactorControl::RememberMe => &selectors.remember_me,
			TwoFactorControl::Push => &selectors.push,
			TwoFactorControl::PasscodeButton => &selectors.passcode_button,
			TwoFactorControl::PasscodeHint => &selectors.passcode_hint,
			TwoFactorControl::PasscodeInput => &selectors.passcode_input,
			TwoFactorControl::PasscodeSubmit => &selectors.passcode_submit,
		}
	}

	async fn require(&self, scope: Scope, selector: &str) -> Result<ElementHandle> {
		self.browser
			.query(scope, selector)
			.await?
			.ok_or_else(|| BrowserError::NotFound {
				selector: selector.to_string(),
			})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn term_cookie_url_substitutes_term_name() {
		let layout = PortalLayout::default();
		let term = TermContext::new(5200, "SP22");
		assert_eq!(
			layout.cookie_url_for(Some(&term)),
			"https://portal.example.edu/webreg/svc/schedule?termcode=SP22"
		);
		assert_eq!(layout.cookie_url_for(None), layout.cookie_url);
	}

	#[test]
	fn partial_layout_keeps_defaults() {
		let layout: PortalLayout = serde_json::from_str(
			r##"{"entryUrl":"https://sso.test/start","selectors":{"termGo":"#go"}}"##,
		)
		.unwrap();
		assert_eq!(layout.entry_url, "https://sso.test/start");
		assert_eq!(layout.selectors.term_go, "#go");
		assert_eq!(layout.selectors.username, Selectors::default().username);
		assert_eq!(layout.sign_on_marker, PortalLayout::default().sign_on_marker);
	}
}
