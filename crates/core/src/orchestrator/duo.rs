//! Two-factor prompt handling: cancel an auto-sent push, remember the device,
//! then answer with a push or an SMS passcode.

use autoin_protocol::LoginPreference;
use tracing::{debug, info, warn};

use super::{SessionContext, Timings};
use crate::browser::{BrowserAutomation, ElementHandle, FrameHandle, PageHandle};
use crate::error::Fault;
use crate::passcode::{match_passcode, parse_hint};
use crate::portal::{Portal, TwoFactorControl};

pub(super) async fn complete<B>(
	portal: &Portal<'_, B>,
	page: PageHandle,
	ctx: &SessionContext<'_>,
	timings: &Timings,
) -> Result<(), Fault>
where
	B: BrowserAutomation + ?Sized,
{
	let browser = portal.browser();
	let frame = portal
		.two_factor_frame(page)
		.await?
		.ok_or(Fault::ElementMissing("two-factor frame"))?;
	require(portal, frame, TwoFactorControl::Ready).await?;

	if ctx.auto_push {
		browser.wait(timings.auto_push_delay).await;
		if let Some(cancel) = portal.control(frame, TwoFactorControl::Cancel).await? {
			info!(target = "autoin.duo", "cancelling auto-sent push");
			browser.click(cancel).await?;
		} else {
			debug!(target = "autoin.duo", "no auto-sent push to cancel");
		}
	}

	let remember = require(portal, frame, TwoFactorControl::RememberMe).await?;
	browser.click(remember).await?;

	match ctx.preference {
		LoginPreference::Sms(passcodes) => {
			let button = require(portal, frame, TwoFactorControl::PasscodeButton).await?;
			browser.click(button).await?;

			let hint_element = require(portal, frame, TwoFactorControl::PasscodeHint).await?;
			let text = browser.element_text(hint_element).await?.unwrap_or_default();
			let hint = parse_hint(&text).ok_or_else(|| Fault::UnreadableHint(text.clone()))?;
			let Some(passcode) = match_passcode(hint, passcodes.candidates()) else {
				warn!(target = "autoin.duo", %hint, "no passcode matches hint");
				return Err(Fault::NoMatchingPasscode { hint: hint.to_string() });
			};
			info!(target = "autoin.duo", %hint, "submitting sms passcode");

			let input = require(portal, frame, TwoFactorControl::PasscodeInput).await?;
			browser.type_text(input, passcode).await?;
			let submit = require(portal, frame, TwoFactorControl::PasscodeSubmit).await?;
			browser.click(submit).await?;

			browser.wait(timings.passcode_settle).await;
			if portal.passcode_rejected(&portal.frame_text(frame).await?) {
				return Err(Fault::PasscodeRejected);
			}
		}
		LoginPreference::Push => {
			let push = require(portal, frame, TwoFactorControl::Push).await?;
			info!(target = "autoin.duo", "sending push, waiting for approval");
			browser.click(push).await?;
		}
	}

	Ok(())
}

async fn require<B>(portal: &Portal<'_, B>, frame: FrameHandle, control: TwoFactorControl) -> Result<ElementHandle, Fault>
where
	B: BrowserAutomation + ?Sized,
{
	portal
		.control(frame, control)
		.await?
		.ok_or(Fault::ElementMissing(control.name()))
}
