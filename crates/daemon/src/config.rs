//! Daemon configuration file.
//!
//! A camelCase JSON document read from `AUTOIN_CONFIG`, or
//! `<config dir>/autoin/config.json` when unset. Only `credentials` and `login`
//! are required; every other section falls back to its defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use autoin::{PortalLayout, Timings, term};
use autoin_protocol::{Credentials, LoginPreference, TermContext};
use autoin_runtime::LaunchOptions;
use serde::Deserialize;

use crate::keeper::RefreshPolicy;

pub const CONFIG_ENV: &str = "AUTOIN_CONFIG";

/// Location of the config file.
pub fn config_path() -> Option<PathBuf> {
	if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
		return Some(PathBuf::from(path));
	}
	dirs::config_dir().map(|dir| dir.join("autoin").join("config.json"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
	pub credentials: Credentials,
	pub login: LoginPreference,
	#[serde(default)]
	pub auto_push: bool,
	/// Term codes such as `SP24`. Empty means one session for the default scope.
	#[serde(default)]
	pub terms: Vec<String>,
	#[serde(default)]
	pub portal: PortalLayout,
	#[serde(default)]
	pub browser: BrowserSection,
	#[serde(default)]
	pub refresh: RefreshSection,
	#[serde(default)]
	pub output: OutputSection,
	#[serde(default)]
	pub timings: TimingsSection,
}

impl Config {
	/// Reads and validates the file at `path`.
	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
		let config = Self::parse(&raw).with_context(|| format!("invalid config {}", path.display()))?;
		Ok(config)
	}

	pub fn parse(raw: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(raw)?;
		config.term_contexts()?;
		Ok(config)
	}

	/// Resolved term contexts, in configured order.
	pub fn term_contexts(&self) -> Result<Vec<TermContext>> {
		let mut contexts: Vec<TermContext> = Vec::with_capacity(self.terms.len());
		for code in &self.terms {
			let Some(context) = term::term_context(code) else {
				bail!("unknown term code {code:?}");
			};
			if contexts.iter().any(|known| known.term_name == context.term_name) {
				bail!("term {} listed twice", context.term_name);
			}
			contexts.push(context);
		}
		Ok(contexts)
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserSection {
	pub executable: Option<PathBuf>,
	pub headless: bool,
	pub user_data_dir: Option<PathBuf>,
	pub default_timeout_ms: u64,
}

impl Default for BrowserSection {
	fn default() -> Self {
		Self {
			executable: None,
			headless: true,
			user_data_dir: None,
			default_timeout_ms: 30_000,
		}
	}
}

impl BrowserSection {
	pub fn launch_options(&self) -> LaunchOptions {
		LaunchOptions {
			executable: self.executable.clone(),
			headless: self.headless,
			user_data_dir: self.user_data_dir.clone(),
			default_timeout: Duration::from_millis(self.default_timeout_ms),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshSection {
	pub interval_secs: u64,
	pub retry_base_secs: u64,
	pub retry_max_secs: u64,
}

impl Default for RefreshSection {
	fn default() -> Self {
		Self {
			interval_secs: 30 * 60,
			retry_base_secs: 30,
			retry_max_secs: 15 * 60,
		}
	}
}

impl RefreshSection {
	pub fn policy(&self) -> RefreshPolicy {
		RefreshPolicy {
			interval: Duration::from_secs(self.interval_secs),
			retry_base: Duration::from_secs(self.retry_base_secs),
			retry_max: Duration::from_secs(self.retry_max_secs.max(self.retry_base_secs)),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputSection {
	pub dir: PathBuf,
}

impl Default for OutputSection {
	fn default() -> Self {
		let dir = dirs::data_local_dir()
			.map(|dir| dir.join("autoin").join("sessions"))
			.unwrap_or_else(|| PathBuf::from("sessions"));
		Self { dir }
	}
}

/// [`Timings`] overrides in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimingsSection {
	pub settle_ms: u64,
	pub login_timeout_ms: u64,
	pub poll_interval_ms: u64,
	pub post_classify_settle_ms: u64,
	pub auto_push_delay_ms: u64,
	pub passcode_settle_ms: u64,
}

impl Default for TimingsSection {
	fn default() -> Self {
		let t = Timings::default();
		Self {
			settle_ms: millis(t.settle),
			login_timeout_ms: millis(t.login_timeout),
			poll_interval_ms: millis(t.poll_interval),
			post_classify_settle_ms: millis(t.post_classify_settle),
			auto_push_delay_ms: millis(t.auto_push_delay),
			passcode_settle_ms: millis(t.passcode_settle),
		}
	}
}

impl TimingsSection {
	pub fn timings(&self) -> Timings {
		Timings {
			settle: Duration::from_millis(self.settle_ms),
			login_timeout: Duration::from_millis(self.login_timeout_ms),
			poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
			post_classify_settle: Duration::from_millis(self.post_classify_settle_ms),
			auto_push_delay: Duration::from_millis(self.auto_push_delay_ms),
			passcode_settle: Duration::from_millis(self.passcode_settle_ms),
		}
	}
}

fn millis(duration: Duration) -> u64 {
	duration.as_millis() as u64
}
