//! Revert reason extraction.
//!
//! Nodes, wallets and dev chains each phrase a revert differently. These
//! helpers pull a readable reason out of the common formats and otherwise
//! fall back to the first line of the message.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static REVERT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	[
		r"reverted with reason string '([^']*)'",
		r"VM Exception while processing transaction: revert ([^\n\x22]+)",
		r"execution reverted: ([^\n\x22]+)",
	]
	.iter()
	.filter_map(|pattern| Regex::new(pattern).ok())
	.collect()
});

/// First line of `message`, trimmed.
pub fn first_line(message: &str) -> &str {
	message.lines().next().unwrap_or_default().trim()
}

/// Best-effort human readable revert reason.
pub fn revert_reason(message: &str) -> String {
	for pattern in REVERT_PATTERNS.iter() {
		let reason = pattern
			.captures(message)
			.and_then(|captures| captures.get(1))
			.map(|m| m.as_str().trim());
		if let Some(reason) = reason.filter(|r| !r.is_empty()) {
			return reason.to_string();
		}
	}

	if let Some(inner) = json_message(message) {
		if inner != message {
			return revert_reason(&inner);
		}
	}

	first_line(message).to_string()
}

/// The `message` field of a JSON payload embedded in `message`.
fn json_message(message: &str) -> Option<String> {
	let start = message.find('{')?;
	let end = message.rfind('}')?;
	if end <= start {
		return None;
	}
	let value: Value = serde_json::from_str(&message[start..=end]).ok()?;
	find_message(&value)
}

fn find_message(value: &Value) -> Option<String> {
	let object = value.as_object()?;
	if let Some(message) = object.get("message").and_then(Value::as_str) {
		return Some(message.to_string());
	}
	object.values().find_map(find_message)
}
