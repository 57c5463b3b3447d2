//! String formatting utilities.
//!
//! Hex prefix handling and short identifiers for log lines.

use alloy_primitives::Address;

/// Truncates an identifier for display, keeping the first 8 characters.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}

/// Renders an address as `0x1234..abcd` for log fields.
pub fn short_address(address: &Address) -> String {
	let full = format!("{:#x}", address);
	format!("{}..{}", &full[..6], &full[full.len() - 4..])
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes a "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(truncate_id("0x1234567890"), "0x123456..");
	}

	#[test]
	fn test_short_address() {
		let addr = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
		assert_eq!(short_address(&addr), "0x7099..79c8");
	}

	#[test]
	fn test_prefix_helpers() {
		assert_eq!(with_0x_prefix("abcd"), "0xabcd");
		assert_eq!(with_0x_prefix("0xabcd"), "0xabcd");
		assert_eq!(without_0x_prefix("0Xabcd"), "abcd");
		assert_eq!(without_0x_prefix("abcd"), "abcd");
	}
}
