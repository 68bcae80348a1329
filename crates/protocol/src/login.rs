use serde::Deserialize;

/// How the second factor is answered when the portal asks for one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "LoginPreferenceRepr")]
pub enum LoginPreference {
	/// Send a push notification and let a paired device approve it.
	Push,
	/// Answer with one of the pre-provisioned SMS passcodes.
	Sms(Passcodes),
}

impl LoginPreference {
	/// Builds an SMS preference, or `None` when no passcodes are given.
	pub fn sms<I, S>(passcodes: I) -> Option<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Passcodes::new(passcodes).map(Self::Sms)
	}

	pub fn is_push(&self) -> bool {
		matches!(self, Self::Push)
	}
}

/// Non-empty, caller-ordered list of one-time SMS passcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passcodes(Vec<String>);

impl Passcodes {
	pub fn new<I, S>(passcodes: I) -> Option<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let list: Vec<String> = passcodes.into_iter().map(Into::into).collect();
		if list.is_empty() { None } else { Some(Self(list)) }
	}

	/// Candidates in the order the caller supplied them.
	pub fn candidates(&self) -> &[String] {
		&self.0
	}
}

#[derive(Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
enum LoginPreferenceRepr {
	Push,
	Sms { passcodes: Vec<String> },
}

impl TryFrom<LoginPreferenceRepr> for LoginPreference {
	type Error = String;

	fn try_from(repr: LoginPreferenceRepr) -> Result<Self, Self::Error> {
		match repr {
			LoginPreferenceRepr::Push => Ok(Self::Push),
			LoginPreferenceRepr::Sms { passcodes } => {
				Self::sms(passcodes).ok_or_else(|| "sms login requires at least one passcode".to_string())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_passcode_list_is_rejected() {
		assert!(LoginPreference::sms(Vec::<String>::new()).is_none());
	}

	#[test]
	fn sms_keeps_caller_order() {
		let pref = LoginPreference::sms(["512345", "734521"]).unwrap();
		let LoginPreference::Sms(codes) = pref else {
			panic!("expected sms preference");
		};
		assert_eq!(codes.candidates(), ["512345", "734521"]);
	}

	#[test]
	fn deserializes_tagged_variants() {
		let push: LoginPreference = serde_json::from_str(r#"{"method":"push"}"#).unwrap();
		assert!(push.is_push());

		let sms: LoginPreference = serde_json::from_str(r#"{"method":"sms","passcodes":["1234567"]}"#).unwrap();
		assert_eq!(sms, LoginPreference::sms(["1234567"]).unwrap());
	}

	#[test]
	fn deserializing_empty_sms_list_fails() {
		let err = serde_json::from_str::<LoginPreference>(r#"{"method":"sms","passcodes":[]}"#).unwrap_err();
		assert!(err.to_string().contains("at least one passcode"));
	}
}
