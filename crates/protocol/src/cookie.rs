use serde::{Deserialize, Serialize};

/// A cookie as read from the browser for a target URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
}

impl Cookie {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: None,
			path: None,
		}
	}
}

/// Joins cookies into a `Cookie` header value.
///
/// Pairs keep the order they were read in and are separated by `"; "`. Domain
/// and path are not part of the header form.
pub fn cookie_header(cookies: &[Cookie]) -> String {
	cookies
		.iter()
		.map(|cookie| format!("{}={}", cookie.name, cookie.value))
		.collect::<Vec<_>>()
		.join("; ")
}
