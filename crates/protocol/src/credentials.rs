use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Sign-on credentials for the portal.
///
/// The password is kept in a [`SecretString`] so it never shows up in `Debug`
/// output or logs; [`Credentials::password`] is the one place it is exposed.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
	pub username: String,
	password: SecretString,
}

impl Credentials {
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			password: SecretString::from(password.into()),
		}
	}

	pub fn password(&self) -> &str {
		self.password.expose_secret()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn debug_output_redacts_password() {
		let creds = Credentials::new("student", "hunter2");
		let debug = format!("{creds:?}");
		assert!(debug.contains("student"));
		assert!(!debug.contains("hunter2"));
	}

	#[test]
	fn deserializes_from_config_json() {
		let creds: Credentials = serde_json::from_str(r#"{"username":"u","password":"p"}"#).unwrap();
		assert_eq!(creds.username, "u");
		assert_eq!(creds.password(), "p");
	}
}
