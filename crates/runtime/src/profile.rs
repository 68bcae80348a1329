//! Chrome profile directory helpers.
//!
//! A crashed browser leaves `Singleton*` files behind that make the next launch
//! refuse the profile. They are removed when the process named by the lock is
//! gone.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{LaunchError, Result};

const SINGLETON_FILES: &[&str] = &["SingletonLock", "SingletonSocket", "SingletonCookie"];

/// Default profile location, `<data dir>/autoin/chrome-profile`.
pub fn default_profile_dir() -> Option<PathBuf> {
	dirs::data_local_dir().map(|dir| dir.join("autoin").join("chrome-profile"))
}

/// Creates `dir` and clears a stale profile lock inside it.
pub fn prepare_profile_dir(dir: &Path) -> Result<()> {
	std::fs::create_dir_all(dir).map_err(|source| LaunchError::Profile {
		path: dir.to_path_buf(),
		source,
	})?;

	let lock = dir.join("SingletonLock");
	let Ok(target) = std::fs::read_link(&lock) else {
		return Ok(());
	};
	let owner = lock_owner_pid(&target.to_string_lossy());
	if owner.is_some_and(pid_is_alive) {
		debug!(target = "autoin.runtime", path = %dir.display(), pid = ?owner, "profile lock held by live process");
		return Ok(());
	}

	info!(target = "autoin.runtime", path = %dir.display(), pid = ?owner, "removing stale profile lock");
	for name in SINGLETON_FILES {
		let _ = std::fs::remove_file(dir.join(name));
	}
	Ok(())
}

/// Parses the pid out of a `<hostname>-<pid>` lock target.
fn lock_owner_pid(target: &str) -> Option<u32> {
	target.rsplit_once('-').and_then(|(_, pid)| pid.parse().ok())
}

/// Returns `true` when a process with `pid` appears alive on this platform.
fn pid_is_alive(pid: u32) -> bool {
	#[cfg(unix)]
	{
		if pid == 0 {
			return false;
		}
		if PathBuf::from("/proc").join(pid.to_string()).exists() {
			return true;
		}
		std::process::Command::new("kill")
			.arg("-0")
			.arg(pid.to_string())
			.status()
			.map(|status| status.success())
			.unwrap_or(pid == std::process::id())
	}

	#[cfg(not(unix))]
	{
		pid == std::process::id()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_pid_from_lock_target() {
		assert_eq!(lock_owner_pid("workstation-4242"), Some(4242));
		assert_eq!(lock_owner_pid("my-host-name-17"), Some(17));
		assert_eq!(lock_owner_pid("garbage"), None);
	}

	#[test]
	fn creates_missing_profile_dir() {
		let temp = tempfile::tempdir().unwrap();
		let dir = temp.path().join("profile");
		prepare_profile_dir(&dir).unwrap();
		assert!(dir.is_dir());
	}

	#[cfg(unix)]
	#[test]
	fn current_process_is_alive() {
		assert!(pid_is_alive(std::process::id()));
		assert!(!pid_is_alive(0));
	}

	#[cfg(unix)]
	#[test]
	fn stale_lock_is_removed() {
		let temp = tempfile::tempdir().unwrap();
		let lock = temp.path().join("SingletonLock");
		std::os::unix::fs::symlink("somehost-0", &lock).unwrap();
		std::fs::write(temp.path().join("SingletonCookie"), b"").unwrap();

		prepare_profile_dir(temp.path()).unwrap();

		assert!(std::fs::symlink_metadata(&lock).is_err());
		assert!(!temp.path().join("SingletonCookie").exists());
	}

	#[cfg(unix)]
	#[test]
	fn live_lock_is_kept() {
		let temp = tempfile::tempdir().unwrap();
		let lock = temp.path().join("SingletonLock");
		std::os::unix::fs::symlink(format!("somehost-{}", std::process::id()), &lock).unwrap();

		prepare_profile_dir(temp.path()).unwrap();

		assert!(std::fs::symlink_metadata(&lock).is_ok());
	}
}
