//! Chromium launch.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use futures_util::StreamExt;
use tracing::{debug, info};

use crate::browser::ChromiumBrowser;
use crate::discovery::find_chrome;
use crate::error::{LaunchError, Result};
use crate::profile::{default_profile_dir, prepare_profile_dir};

/// How to start the shared browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	/// Explicit executable; discovered when `None`.
	pub executable: Option<PathBuf>,
	pub headless: bool,
	/// Persistent profile, so "remember this device" survives restarts.
	pub user_data_dir: Option<PathBuf>,
	/// Timeout for selector waits that do not carry their own.
	pub default_timeout: Duration,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			executable: None,
			headless: true,
			user_data_dir: None,
			default_timeout: Duration::from_secs(30),
		}
	}
}

/// Flags added to every launch. Two-factor frames are cross-origin; running them
/// in-process with web security off lets page scripts reach their documents.
const LAUNCH_ARGS: &[&str] = &[
	"--no-first-run",
	"--no-default-browser-check",
	"--disable-infobars",
	"--disable-blink-features=AutomationControlled",
	"--disable-web-security",
	"--disable-features=IsolateOrigins,site-per-process",
];

/// Starts Chromium and spawns the task that drives its event stream.
pub async fn launch(options: &LaunchOptions) -> Result<ChromiumBrowser> {
	let executable = find_chrome(options.executable.as_deref()).ok_or(LaunchError::ExecutableNotFound)?;
	if executable.is_absolute() && !executable.exists() {
		return Err(LaunchError::MissingExecutable(executable));
	}

	let profile = options
		.user_data_dir
		.clone()
		.or_else(default_profile_dir)
		.ok_or_else(|| LaunchError::Config("no user data directory available".into()))?;
	prepare_profile_dir(&profile)?;

	let mut builder = BrowserConfig::builder()
		.chrome_executable(&executable)
		.user_data_dir(&profile)
		.viewport(None)
		.request_timeout(options.default_timeout);
	for arg in LAUNCH_ARGS {
		builder = builder.arg(*arg);
	}
	if !options.headless {
		builder = builder.with_head();
	}
	let config = builder.build().map_err(LaunchError::Config)?;

	info!(
		target = "autoin.runtime",
		executable = %executable.display(),
		profile = %profile.display(),
		headless = options.headless,
		"launching browser"
	);
	let (browser, mut handler) = Browser::launch(config).await?;
	let handler = tokio::spawn(async move {
		while let Some(event) = handler.next().await {
			if let Err(err) = event {
				debug!(target = "autoin.runtime", error = %err, "browser handler error");
			}
		}
	});

	Ok(ChromiumBrowser::new(browser, handler, options.default_timeout))
}
