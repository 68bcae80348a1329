//! Cookie file output.
//!
//! Each logical session is written to `<dir>/<label>.json`:
//!
//! ```json
//! {"cookie": "a=1; b=2", "session": {"start": 1700000000000, "callHistory": []}, "updatedAt": 1700000000000}
//! ```
//!
//! Files are replaced by writing a sibling temp file and renaming it, so a
//! reader never observes a partial document.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use autoin::SessionConsumer;
use autoin_protocol::SessionRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SinkError {
	#[error("failed to write {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to encode session file: {0}")]
	Json(#[from] serde_json::Error),
}

/// On-disk document for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
	pub cookie: String,
	pub session: SessionRecord,
	pub updated_at: u64,
}

/// Writes delivered cookies under a directory, one file per session label.
#[derive(Debug, Clone)]
pub struct CookieFileSink {
	dir: PathBuf,
}

impl CookieFileSink {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn path_for(&self, label: &str) -> PathBuf {
		self.dir.join(format!("{}.json", file_stem(label)))
	}

	fn temp_path_for(&self, label: &str) -> PathBuf {
		self.dir.join(format!(".{}.json.tmp", file_stem(label)))
	}
}

#[async_trait]
impl SessionConsumer for CookieFileSink {
	type Error = SinkError;

	async fn deliver(&self, label: &str, cookie: &str, record: &SessionRecord) -> Result<(), SinkError> {
		let document = SessionFile {
			cookie: cookie.to_string(),
			session: record.clone(),
			updated_at: unix_millis(),
		};
		let json = serde_json::to_vec_pretty(&document)?;

		fs::create_dir_all(&self.dir).await.map_err(|source| SinkError::Io {
			path: self.dir.clone(),
			source,
		})?;
		let path = self.path_for(label);
		let temp = self.temp_path_for(label);
		fs::write(&temp, &json).await.map_err(|source| SinkError::Io {
			path: temp.clone(),
			source,
		})?;
		fs::rename(&temp, &path).await.map_err(|source| SinkError::Io {
			path: path.clone(),
			source,
		})?;

		debug!(target = "autoin.sink", %label, path = %path.display(), "session file written");
		Ok(())
	}
}

/// Keeps labels from escaping the output directory.
fn file_stem(label: &str) -> String {
	label
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
		.collect()
}

fn unix_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or(0)
}
