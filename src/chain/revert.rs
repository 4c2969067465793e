//! Revert reason extraction from RPC error text

use alloy::hex;

/// Error(string) selector
const ERROR_STRING_SELECTOR: &str = "0x08c379a0";

/// Parse a human-readable revert reason out of an RPC error message
///
/// Handles `revert: <reason>` messages and raw `Error(string)` payloads.
/// Anything else is returned unchanged.
pub fn parse_revert_reason(error: &str) -> String {
    if !error.contains("execution reverted") {
        return error.to_string();
    }

    if let Some(start) = error.find("revert: ") {
        let reason = &error[start + 8..];
        if let Some(end) = reason.find('"') {
            return reason[..end].to_string();
        }
        return reason.to_string();
    }

    if let Some(start) = error.find("0x") {
        let hex_data = &error[start..];
        let end = hex_data
            .find(|c: char| !c.is_ascii_hexdigit() && c != 'x')
            .unwrap_or(hex_data.len());
        let payload = &hex_data[..end];

        // selector (10 chars) + offset word (64) + length word (64)
        if payload.starts_with(ERROR_STRING_SELECTOR) && payload.len() > 138 {
            if let Ok(decoded) = hex::decode(&payload[138..]) {
                let filtered: Vec<u8> = decoded.into_iter().filter(|&b| b != 0).collect();
                if let Ok(s) = String::from_utf8(filtered) {
                    return s;
                }
            }
        }
        return format!("reverted with data: {}", payload);
    }

    "execution reverted".to_string()
}
