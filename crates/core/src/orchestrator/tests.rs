use std::time::Duration;

use autoin_protocol::{Credentials, LoginPreference, SessionRecord, TermContext};

use super::*;
use crate::error::{BrowserError, FaultKind};
use crate::portal::Selectors;
use crate::testing::{Attempt, Event, FakeBrowser, Nav};

fn credentials() -> Credentials {
	Credentials::new("alice", "hunter2")
}

fn sms() -> LoginPreference {
	LoginPreference::sms(["512345", "734521", "798123"]).unwrap()
}

fn context<'a>(credentials: &'a Credentials, preference: &'a LoginPreference) -> SessionContext<'a> {
	SessionContext {
		credentials,
		term: None,
		preference,
		auto_push: false,
		is_init: true,
	}
}

fn orchestrator(browser: &FakeBrowser) -> Orchestrator<FakeBrowser> {
	Orchestrator::new(browser.clone(), PortalLayout::default())
}

fn secs(n: u64) -> Duration {
	Duration::from_secs(n)
}

#[tokio::test(start_paused = true)]
async fn logged_in_page_yields_cookie_string() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::logged_in_after(secs(1))]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert_eq!(result, SessionResult::Success("a=1; b=2".into()));
	assert!(record.is_started());
	assert!(record.call_history.is_empty());
	assert!(
		browser
			.events()
			.contains(&Event::Cookies(PortalLayout::default().cookie_url))
	);
}

#[tokio::test(start_paused = true)]
async fn logged_in_first_skips_two_factor() {
	let browser = FakeBrowser::new();
	browser.script([Attempt {
		two_factor_after: Some(secs(5)),
		..Attempt::logged_in_after(secs(1))
	}]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert!(result.is_success());
	let selectors = Selectors::default();
	assert!(!browser.clicked(&selectors.remember_me));
	assert!(!browser.clicked(&selectors.push));
}

#[tokio::test(start_paused = true)]
async fn two_factor_first_sends_push() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::two_factor_after(secs(2))]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert!(result.is_success());
	let selectors = Selectors::default();
	assert!(browser.clicked(&selectors.remember_me));
	assert!(browser.clicked(&selectors.push));
	assert!(!browser.clicked(&selectors.passcode_button));
}

#[tokio::test(start_paused = true)]
async fn simultaneous_outcomes_favor_logged_in() {
	let browser = FakeBrowser::new();
	browser.script([Attempt {
		two_factor_after: Some(Duration::ZERO),
		..Attempt::logged_in_after(Duration::ZERO)
	}]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert!(result.is_success());
	assert!(!browser.clicked(&Selectors::default().push));
}

#[tokio::test(start_paused = true)]
async fn unclassified_attempts_exhaust_budget() {
	let browser = FakeBrowser::new();
	browser.script(std::iter::repeat_with(Attempt::silent).take(10));
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	let SessionResult::HardFailure(fault) = result else {
		panic!("expected hard failure, got {result:?}");
	};
	assert_eq!(fault, Fault::AttemptsExhausted { attempts: MAX_ATTEMPTS });
	assert_eq!(fault.kind(), FaultKind::RetryBudgetExhausted);
	assert_eq!(browser.navigations(), MAX_ATTEMPTS as usize);
	assert!(!record.is_started());
}

#[tokio::test(start_paused = true)]
async fn unclassified_attempt_retries_then_succeeds() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::silent(), Attempt::logged_in_after(secs(3))]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert!(result.is_success());
	assert_eq!(browser.navigations(), 2);
}

#[tokio::test(start_paused = true)]
async fn frame_without_form_is_never_two_factor() {
	let browser = FakeBrowser::new();
	browser
		.script(std::iter::repeat_with(|| Attempt::two_factor_after(secs(1))).take(10))
		.with_frame_without_form();
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert_eq!(result, SessionResult::HardFailure(Fault::AttemptsExhausted { attempts: MAX_ATTEMPTS }));
	assert_eq!(browser.navigations(), MAX_ATTEMPTS as usize);
	assert!(!browser.events().iter().any(|event| matches!(event, Event::Clicked(_))));
}

#[tokio::test(start_paused = true)]
async fn frame_detached_before_two_factor_is_hard_failure() {
	let browser = FakeBrowser::new();
	// Seen by the prober at 4s, gone before the post-classification settle ends.
	browser.script([Attempt::two_factor_after(secs(4)).frame_gone_after(secs(6))]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert_eq!(result, SessionResult::HardFailure(Fault::ElementMissing("two-factor frame")));
	assert_eq!(browser.navigations(), 1);
	assert!(!browser.clicked(&Selectors::default().remember_me));
	assert!(!record.is_started());
}

#[tokio::test(start_paused = true)]
async fn missing_response_reloads() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::nav(Nav::NoResponse), Attempt::nav(Nav::NoResponse)]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert!(result.is_success());
	assert_eq!(browser.navigations(), 3);
}

#[tokio::test(start_paused = true)]
async fn missing_responses_count_toward_budget() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::nav(Nav::NoResponse)]);
	browser.script(std::iter::repeat_with(Attempt::silent).take(10));
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert_eq!(result, SessionResult::HardFailure(Fault::AttemptsExhausted { attempts: MAX_ATTEMPTS }));
	assert_eq!(browser.navigations(), MAX_ATTEMPTS as usize);
}

#[tokio::test(start_paused = true)]
async fn error_status_is_soft_without_retry() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::nav(Nav::Status(503))]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert_eq!(result, SessionResult::SoftFailure(SoftCause::Status(503)));
	assert_eq!(browser.navigations(), 1);
	assert!(!record.is_started());
}

#[tokio::test(start_paused = true)]
async fn navigation_error_is_soft() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::nav(Nav::Fail)]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert!(matches!(
		result,
		SessionResult::SoftFailure(SoftCause::Navigation(BrowserError::Navigation { .. }))
	));
	assert_eq!(browser.navigations(), 1);
}

#[tokio::test(start_paused = true)]
async fn sign_on_form_gets_credentials() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::logged_in_after(secs(2)).with_sign_on()]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert!(result.is_success());
	let selectors = Selectors::default();
	let events = browser.events();
	assert!(events.contains(&Event::Typed(selectors.username.clone(), "alice".into())));
	assert!(events.contains(&Event::Typed(selectors.password.clone(), "hunter2".into())));
	assert!(events.contains(&Event::Clicked(selectors.submit.clone())));
}

#[tokio::test(start_paused = true)]
async fn authenticated_page_skips_credentials() {
	let browser = FakeBrowser::new();
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert!(result.is_success());
	assert!(!browser.events().iter().any(|e| matches!(e, Event::Typed(..))));
}

#[tokio::test(start_paused = true)]
async fn extra_pages_are_closed_before_each_attempt() {
	let browser = FakeBrowser::new();
	browser.with_open_pages(3);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert!(result.is_success());
	let events = browser.events();
	assert!(events.contains(&Event::ClosePage(2)));
	assert!(events.contains(&Event::ClosePage(3)));
	assert!(!events.contains(&Event::ClosePage(1)));
	assert_eq!(browser.open_pages().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn established_push_session_asked_for_two_factor_is_contract_violation() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::two_factor_after(secs(1))]);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();
	let ctx = SessionContext {
		is_init: false,
		..context(&creds, &push)
	};

	let result = orchestrator(&browser).acquire_session(&ctx, &mut record).await;

	assert_eq!(result, SessionResult::HardFailure(Fault::ContractViolation));
	let selectors = Selectors::default();
	assert!(!browser.clicked(&selectors.push));
	assert!(!browser.clicked(&selectors.remember_me));
}

#[tokio::test(start_paused = true)]
async fn established_sms_session_may_answer_two_factor_again() {
	let browser = FakeBrowser::new();
	browser
		.script([Attempt::two_factor_after(secs(1))])
		.with_hint("Your next SMS Passcode starts with 5");
	let creds = credentials();
	let pref = sms();
	let mut record = SessionRecord::new();
	let ctx = SessionContext {
		is_init: false,
		..context(&creds, &pref)
	};

	let result = orchestrator(&browser).acquire_session(&ctx, &mut record).await;

	assert!(result.is_success());
}

#[tokio::test(start_paused = true)]
async fn sms_submits_passcode_matching_hint() {
	let browser = FakeBrowser::new();
	browser
		.script([Attempt::two_factor_after(secs(1))])
		.with_hint("Your next SMS Passcode starts with 7");
	let creds = credentials();
	let pref = sms();
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &pref), &mut record).await;

	assert!(result.is_success());
	let selectors = Selectors::default();
	let events = browser.events();
	assert!(events.contains(&Event::Typed(selectors.passcode_input.clone(), "734521".into())));
	assert!(events.contains(&Event::Clicked(selectors.passcode_button.clone())));
	assert!(!browser.clicked(&selectors.push));
}

#[tokio::test(start_paused = true)]
async fn sms_without_matching_passcode_is_hard_failure() {
	let browser = FakeBrowser::new();
	browser
		.script([Attempt::two_factor_after(secs(1))])
		.with_hint("Your next SMS Passcode starts with 9");
	let creds = credentials();
	let pref = sms();
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &pref), &mut record).await;

	assert_eq!(
		result,
		SessionResult::HardFailure(Fault::NoMatchingPasscode { hint: "9".into() })
	);
	assert!(!browser.events().iter().any(|e| matches!(e, Event::Typed(..))));
}

#[tokio::test(start_paused = true)]
async fn rejected_passcode_is_hard_failure() {
	let browser = FakeBrowser::new();
	browser
		.script([Attempt::two_factor_after(secs(1))])
		.with_hint("Your next SMS Passcode starts with 7")
		.rejecting_passcodes();
	let creds = credentials();
	let pref = sms();
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &pref), &mut record).await;

	assert_eq!(result, SessionResult::HardFailure(Fault::PasscodeRejected));
	assert!(!record.is_started());
}

#[tokio::test(start_paused = true)]
async fn unreadable_hint_is_hard_failure() {
	let browser = FakeBrowser::new();
	browser
		.script([Attempt::two_factor_after(secs(1))])
		.with_hint("Enter a passcode from your device");
	let creds = credentials();
	let pref = sms();
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &pref), &mut record).await;

	let SessionResult::HardFailure(fault) = result else {
		panic!("expected hard failure, got {result:?}");
	};
	assert_eq!(fault.kind(), FaultKind::ElementMissing);
}

#[tokio::test(start_paused = true)]
async fn missing_hint_element_is_hard_failure() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::two_factor_after(secs(1))]);
	let creds = credentials();
	let pref = sms();
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &pref), &mut record).await;

	assert_eq!(result, SessionResult::HardFailure(Fault::ElementMissing("passcode hint")));
}

#[tokio::test(start_paused = true)]
async fn auto_sent_push_is_cancelled_first() {
	let browser = FakeBrowser::new();
	browser
		.script([Attempt::two_factor_after(secs(1))])
		.with_auto_push_prompt();
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();
	let ctx = SessionContext {
		auto_push: true,
		..context(&creds, &push)
	};

	let result = orchestrator(&browser).acquire_session(&ctx, &mut record).await;

	assert!(result.is_success());
	let selectors = Selectors::default();
	let clicks: Vec<String> = browser
		.events()
		.into_iter()
		.filter_map(|e| match e {
			Event::Clicked(selector) => Some(selector),
			_ => None,
		})
		.collect();
	assert_eq!(clicks, vec![selectors.cancel, selectors.remember_me, selectors.push]);
}

#[tokio::test(start_paused = true)]
async fn unapproved_push_times_out_softly() {
	let browser = FakeBrowser::new();
	browser.script([Attempt::two_factor_after(secs(1))]).ignoring_push();
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	let result = orchestrator(&browser).acquire_session(&context(&creds, &push), &mut record).await;

	assert!(matches!(
		result,
		SessionResult::SoftFailure(SoftCause::PostLoginControls(BrowserError::Timeout { .. }))
	));
	assert!(!record.is_started());
}

#[tokio::test(start_paused = true)]
async fn term_is_selected_before_reading_term_cookies() {
	let browser = FakeBrowser::new();
	let creds = credentials();
	let push = LoginPreference::Push;
	let term = TermContext::new(5200, "SP22");
	let mut record = SessionRecord::new();
	let ctx = SessionContext {
		term: Some(&term),
		..context(&creds, &push)
	};
	assert_eq!(ctx.label(), "SP22");

	let result = orchestrator(&browser).acquire_session(&ctx, &mut record).await;

	assert!(result.is_success());
	let layout = PortalLayout::default();
	let events = browser.events();
	let selected = events
		.iter()
		.position(|e| *e == Event::Selected(layout.selectors.term_selector.clone(), "5200:::SP22".into()))
		.expect("term selected");
	let go = events
		.iter()
		.position(|e| *e == Event::Clicked(layout.selectors.term_go.clone()))
		.expect("go clicked");
	let cookies = events
		.iter()
		.position(|e| *e == Event::Cookies(layout.cookie_url_for(Some(&term))))
		.expect("term cookies read");
	assert!(selected < go && go < cookies);
}

#[tokio::test(start_paused = true)]
async fn repeated_successes_keep_record_ordered() {
	let browser = FakeBrowser::new();
	let orchestrator = orchestrator(&browser);
	let creds = credentials();
	let push = LoginPreference::Push;
	let mut record = SessionRecord::new();

	for run in 0..4 {
		let ctx = SessionContext {
			is_init: run == 0,
			..context(&creds, &push)
		};
		assert!(orchestrator.acquire_session(&ctx, &mut record).await.is_success());
	}

	assert!(record.is_started());
	assert_eq!(record.call_history.len(), 3);
	assert!(record.call_history.windows(2).all(|w| w[0] <= w[1]));
	assert!(record.call_history.iter().all(|&t| t > record.start));
}

#[test]
fn label_defaults_to_all() {
	let creds = credentials();
	let push = LoginPreference::Push;
	assert_eq!(context(&creds, &push).label(), ALL_TERMS);
}
