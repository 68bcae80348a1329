use std::sync::LazyLock;

use regex::Regex;

static HINT_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\s*Your next SMS Passcode starts with (\S+)").expect("HINT_RE should compile"));

/// Extracts the prefix from the portal's "Your next SMS Passcode starts with N" hint.
pub fn parse_hint(text: &str) -> Option<&str> {
	HINT_RE.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// First candidate, in caller order, that starts with `hint`.
pub fn match_passcode<'a>(hint: &str, candidates: &'a [String]) -> Option<&'a str> {
	candidates
		.iter()
		.find(|code| code.starts_with(hint))
		.map(String::as_str)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_hint_prefix() {
		assert_eq!(parse_hint("Your next SMS Passcode starts with 7"), Some("7"));
		assert_eq!(parse_hint("  Your next SMS Passcode starts with 12\n"), Some("12"));
	}

	#[test]
	fn unexpected_text_has_no_hint() {
		assert_eq!(parse_hint("Enter a passcode"), None);
		assert_eq!(parse_hint("Your next SMS Passcode starts with "), None);
	}

	#[test]
	fn picks_first_matching_candidate() {
		let codes: Vec<String> = ["512345", "734521", "798123"].map(String::from).into();
		assert_eq!(match_passcode("7", &codes), Some("734521"));
		assert_eq!(match_passcode("79", &codes), Some("798123"));
		assert_eq!(match_passcode("9", &codes), None);
	}
}
