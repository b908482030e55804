//! String formatting utilities.
//!
//! Hex prefix handling, unit formatting for wei amounts and truncation of
//! hashes for log lines.

/// Truncates a hex string for display, keeping the first 10 characters.
///
/// Ten characters keep the `0x` prefix plus four bytes, enough to tell
/// transaction hashes apart in logs.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(10) {
		Some((end, _)) => format!("{}..", &id[..end]),
		None => id.to_string(),
	}
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Formats an integer amount given as a decimal string with `decimals` places.
///
/// Trailing zeros of the fractional part are dropped, so
/// `format_units("1500000000000000000", 18)` is `"1.5"` and whole amounts
/// have no fractional part at all.
pub fn format_units(amount: &str, decimals: u8) -> String {
	if decimals == 0 {
		return amount.to_string();
	}

	let places = decimals as usize;

	let (whole, fraction) = if amount.len() <= places {
		("0".to_string(), format!("{:0>width$}", amount, width = places))
	} else {
		let split = amount.len() - places;
		(amount[..split].to_string(), amount[split..].to_string())
	};

	let fraction = fraction.trim_end_matches('0');
	if fraction.is_empty() {
		whole
	} else {
		format!("{}.{}", whole, fraction)
	}
}
