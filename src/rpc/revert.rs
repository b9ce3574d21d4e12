//! Revert reason extraction from RPC error text

use alloy::hex;

/// `Error(string)` selector
const ERROR_STRING_SELECTOR: &str = "0x08c379a0";

/// Pull a human-readable revert reason out of an RPC error message.
///
/// Falls back to the full message when nothing recognisable is found.
pub fn parse_revert_reason(error: &str) -> String {
    if !error.contains("execution reverted") {
        return error.to_string();
    }

    if let Some(start) = error.find("revert: ") {
        let reason = &error[start + 8..];
        return match reason.find('"') {
            Some(end) => reason[..end].to_string(),
            None => reason.to_string(),
        };
    }

    if let Some(start) = error.find("0x") {
        let data = &error[start..];
        let end = data[2..]
            .find(|c: char| !c.is_ascii_hexdigit())
            .map(|i| i + 2)
            .unwrap_or(data.len());
        let data = &data[..end];

        // selector + offset word + length word
        if data.starts_with(ERROR_STRING_SELECTOR) && data.len() > 138 {
            if let Ok(decoded) = hex::decode(&data[138..]) {
                let text: Vec<u8> = decoded.into_iter().filter(|&b| b != 0).collect();
                if let Ok(s) = String::from_utf8(text) {
                    return s;
                }
            }
        }
        return format!("Reverted with data: {}", data);
    }

    "execution reverted".to_string()
}
