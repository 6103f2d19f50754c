//! `+CMT:` new-message notification.
//!
//! With `AT+CSMP=17,167,0,8` the modem reports incoming SMS as:
//!
//! ```text
//! +CMT: "<sender as UTF-16BE hex>",<length>\r\n
//! <body as UTF-16BE hex>\r\n
//! ```
//!
//! The sender field and the body line are rewritten independently; everything
//! else in the view is left byte-for-byte as received.
use regex::Regex;

use super::{decode_utf16be, hex_to_bytes, Recognizer};

pub struct CmtRecognizer {
    sender: Regex,
    body: Regex,
}

impl CmtRecognizer {
    pub fn new() -> Self {
        Self {
            // Marker, opening quote | quoted field | closing quote and rest of line.
            sender: Regex::new(r#"(?m)^(\+CMT:[\s\x1C-\x1F]*")([^"]*)(".*)$"#)
                .expect("valid sender pattern"),
            // A line holding only hex digits, optionally followed by whitespace.
            // Trailing whitespace includes the 0x1C-0x1F separators.
            body: Regex::new(r"(?m)^([0-9A-Fa-f]+)[\s\x1C-\x1F]*$").expect("valid body pattern"),
        }
    }
}

impl Default for CmtRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// UTF-16BE text of a hex field, empty when the field holds no data.
fn decode_field(hex_field: &str) -> String {
    let bytes = hex_to_bytes(hex_field);
    if bytes.is_empty() {
        return String::new();
    }
    decode_utf16be(&bytes)
}

impl Recognizer for CmtRecognizer {
    fn name(&self) -> &'static str {
        "cmt"
    }

    fn matches(&self, view: &str) -> bool {
        self.sender.is_match(view)
    }

    fn transform(&self, view: &str) -> Option<String> {
        let field = self.sender.captures(view)?.get(2)?;
        let sender = decode_field(field.as_str());
        if sender.is_empty() {
            return None;
        }

        let mut text = String::with_capacity(view.len());
        text.push_str(&view[..field.start()]);
        text.push_str(&sender);
        text.push_str(&view[field.end()..]);

        // Heuristic: the body is the last all-hex line. Two notifications merged
        // into one message would only get the second body decoded.
        let body_span = self
            .body
            .captures_iter(&text)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|m| m.range());
        if let Some(span) = body_span {
            let body = decode_field(&text[span.clone()]);
            if !body.is_empty() {
                text.replace_range(span, &body);
            }
        }

        Some(text)
    }
}
