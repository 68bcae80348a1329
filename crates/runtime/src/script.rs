//! In-page scripts for frame-scoped element operations.
//!
//! Every script walks a chain of iframe selectors from the top document, looks
//! up one element in the innermost document and performs an [`Action`] on it.
//! Arguments are embedded as one JSON literal, so selectors and typed text need
//! no escaping of their own.

use serde::Deserialize;
use serde_json::{Value, json};

const TEMPLATE: &str = r#"(() => {
  const args = __ARGS__;
  let doc = document;
  for (const frameSelector of args.path) {
    const frame = doc.querySelector(frameSelector);
    const next = frame && (frame.contentDocument || (frame.contentWindow && frame.contentWindow.document));
    if (!next) return { state: "stale" };
    doc = next;
  }
  const el = args.selector === null ? null : doc.querySelector(args.selector);
  if (args.selector !== null && !el) return { state: "missing" };
  __ACTION__
})()"#;

/// What to do with the located element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
	Exists,
	/// Present and rendered with a non-empty box.
	Visible,
	Click,
	/// Assigns `value` and fires `input` and `change`.
	SetValue(&'a str),
	Text,
	/// The element is an iframe whose document is reachable.
	FrameAttached,
	/// Serialized HTML of the innermost document (no selector).
	DocumentHtml,
}

impl Action<'_> {
	fn body(&self) -> &'static str {
		match self {
			Self::Exists => r#"return { state: "ok", value: true };"#,
			Self::Visible => {
				r#"const style = el.ownerDocument.defaultView.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  if (style.visibility === "hidden" || style.display === "none" || rect.width === 0 || rect.height === 0) return { state: "missing" };
  return { state: "ok", value: true };"#
			}
			Self::Click => r#"el.click(); return { state: "ok", value: null };"#,
			Self::SetValue(_) => {
				r#"try { el.focus(); } catch (_) {}
  el.value = String(args.text);
  el.dispatchEvent(new Event("input", { bubbles: true }));
  el.dispatchEvent(new Event("change", { bubbles: true }));
  return { state: "ok", value: null };"#
			}
			Self::Text => r#"return { state: "ok", value: el.innerText ?? el.textContent };"#,
			Self::FrameAttached => {
				r#"const inner = el.contentDocument || (el.contentWindow && el.contentWindow.document);
  return inner ? { state: "ok", value: true } : { state: "missing" };"#
			}
			Self::DocumentHtml => r#"return { state: "ok", value: doc.documentElement ? doc.documentElement.outerHTML : "" };"#,
		}
	}

	fn text(&self) -> Option<&str> {
		match self {
			Self::SetValue(text) => Some(text),
			_ => None,
		}
	}
}

/// Builds the expression that performs `action` on `selector` inside the frame chain `path`.
pub fn build(path: &[String], selector: Option<&str>, action: Action<'_>) -> String {
	let args = json!({
		"path": path,
		"selector": selector,
		"text": action.text(),
	});
	TEMPLATE.replace("__ACTION__", action.body()).replace("__ARGS__", &args.to_string())
}

/// Result reported by a script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Probe {
	Ok {
		#[serde(default)]
		value: Value,
	},
	/// The selector matched nothing (or nothing visible).
	Missing,
	/// A frame on the path is gone or its document is unreachable.
	Stale,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn arguments_are_embedded_as_json() {
		let path = vec!["iframe#duo_iframe".to_string()];
		let script = build(&path, Some("input[name=\"passcode\"]"), Action::SetValue("73\"4521"));
		assert!(script.contains(r#""path":["iframe#duo_iframe"]"#));
		assert!(script.contains(r#""selector":"input[name=\"passcode\"]""#));
		assert!(script.contains(r#""text":"73\"4521""#));
		assert!(!script.contains("__ACTION__"));
		assert!(!script.contains("__ARGS__"));
	}

	#[test]
	fn document_scripts_have_null_selector() {
		let script = build(&[], None, Action::DocumentHtml);
		assert!(script.contains(r#""selector":null"#));
		assert!(script.contains("outerHTML"));
	}

	#[test]
	fn placeholder_text_in_arguments_is_not_expanded() {
		let script = build(&[], Some("#x"), Action::SetValue("__ACTION__"));
		assert!(script.contains(r#""text":"__ACTION__""#));
		assert!(script.contains("el.value = String(args.text)"));
	}

	#[test]
	fn probes_deserialize() {
		let ok: Probe = serde_json::from_str(r#"{"state":"ok","value":"hi"}"#).unwrap();
		assert_eq!(ok, Probe::Ok { value: json!("hi") });
		let missing: Probe = serde_json::from_str(r#"{"state":"missing"}"#).unwrap();
		assert_eq!(missing, Probe::Missing);
		let stale: Probe = serde_json::from_str(r#"{"state":"stale"}"#).unwrap();
		assert_eq!(stale, Probe::Stale);
	}
}
