use std::path::PathBuf;

use autoin::BrowserError;
use chromiumoxide::error::CdpError;
use thiserror::Error;

/// Failures while starting Chromium.
#[derive(Debug, Error)]
pub enum LaunchError {
	#[error("could not find a Chrome/Chromium executable; install one or set browser.executable")]
	ExecutableNotFound,

	#[error("configured browser executable does not exist: {0}")]
	MissingExecutable(PathBuf),

	#[error("invalid browser configuration: {0}")]
	Config(String),

	#[error("failed to prepare profile directory {path}: {source}")]
	Profile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to launch browser: {0}")]
	Launch(#[from] CdpError),
}

pub type Result<T> = std::result::Result<T, LaunchError>;

/// Maps a CDP failure onto the capability's error type.
pub(crate) fn protocol(err: CdpError) -> BrowserError {
	match err {
		CdpError::Timeout => BrowserError::Protocol("request timed out".into()),
		CdpError::NotFound => BrowserError::Protocol("requested value not found".into()),
		other => BrowserError::Protocol(other.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cdp_errors_become_protocol_errors() {
		assert_eq!(
			protocol(CdpError::NoResponse),
			BrowserError::Protocol("Received no response from the chromium instance.".into())
		);
		assert_eq!(protocol(CdpError::Timeout), BrowserError::Protocol("request timed out".into()));
	}
}
