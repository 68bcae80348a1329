//! Chrome/Chromium executable discovery.

use std::path::{Path, PathBuf};

/// Environment variable that overrides discovery.
pub const CHROME_ENV: &str = "AUTOIN_CHROME";

/// Resolves the browser executable: `explicit`, then `AUTOIN_CHROME`, then well-known locations.
pub fn find_chrome(explicit: Option<&Path>) -> Option<PathBuf> {
	if let Some(path) = explicit {
		return Some(path.to_path_buf());
	}
	if let Some(path) = std::env::var_os(CHROME_ENV).filter(|v| !v.is_empty()) {
		return Some(PathBuf::from(path));
	}
	platform_candidates().into_iter().find_map(|candidate| resolve(&candidate))
}

/// Absolute candidates must exist; bare names are looked up on `PATH`.
fn resolve(candidate: &str) -> Option<PathBuf> {
	let path = Path::new(candidate);
	if path.is_absolute() {
		path.exists().then(|| path.to_path_buf())
	} else {
		which::which(candidate).ok()
	}
}

fn platform_candidates() -> Vec<String> {
	if cfg!(target_os = "macos") {
		[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
		]
		.map(String::from)
		.into()
	} else if cfg!(target_os = "windows") {
		windows_candidates()
	} else {
		[
			"google-chrome-stable",
			"google-chrome",
			"chromium",
			"chromium-browser",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/google-chrome",
			"/usr/bin/chromium",
			"/usr/bin/chromium-browser",
			"/snap/bin/chromium",
			"/run/current-system/sw/bin/chromium",
		]
		.map(String::from)
		.into()
	}
}

fn windows_candidates() -> Vec<String> {
	let mut roots: Vec<PathBuf> = ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
		.into_iter()
		.filter_map(std::env::var_os)
		.map(PathBuf::from)
		.collect();
	if roots.is_empty() {
		roots.push(PathBuf::from(r"C:\Program Files"));
	}

	let mut candidates: Vec<String> = roots
		.iter()
		.flat_map(|root| {
			[
				root.join(r"Google\Chrome\Application\chrome.exe"),
				root.join(r"Chromium\Application\chrome.exe"),
				root.join(r"Microsoft\Edge\Application\msedge.exe"),
			]
		})
		.map(|path| path.to_string_lossy().into_owned())
		.collect();
	candidates.extend(["chrome.exe", "msedge.exe", "chromium.exe"].map(String::from));
	candidates
}
