//! # Content Decoder
//!
//! Recovers readable text from a logged payload. Decoding never fails: every
//! undecodable field falls back to the less transformed text.
//!
//! The payload is first rendered as a Latin-1 working view (one byte, one
//! code point). That mapping is total and reversible, so text patterns can be
//! matched on otherwise binary data without committing to an encoding. The
//! first [`Recognizer`] whose pattern matches the view then rewrites the
//! fields it knows to be UTF-16BE hex.
//!
//! ```rust
//! use air780e::decoder::decode_payload_hex;
//!
//! // "+CMT: \"<UTF-16BE hex of 5555>\",25\r\n\r\n<UTF-16BE hex of hello>\r\n"
//! let stored = hex::encode(
//!     "+CMT: \"0035003500350035\",25\r\n\r\n00680065006C006C006F\r\n",
//! );
//! let text = decode_payload_hex(&stored);
//! assert_eq!(text, "+CMT: \"5555\",25\r\n\r\nhello\r\n");
//! ```
//!
//! New notification shapes are added as new recognizers; the dispatch order
//! is the order of the list.

use std::sync::OnceLock;

pub mod cmt;

pub use cmt::CmtRecognizer;

/// One notification shape the decoder understands.
pub trait Recognizer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether this recognizer claims the working view.
    fn matches(&self, view: &str) -> bool;

    /// Rewritten text, or `None` to decline and keep the view.
    fn transform(&self, view: &str) -> Option<String>;
}

/// Display text of one payload plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    /// Name of the recognizer that claimed the payload, if any.
    pub recognizer: Option<&'static str>,
    /// Whether the recognizer rewrote anything.
    pub changed: bool,
}

impl Decoded {
    /// Claimed by a recognizer but shown unchanged: its fields did not decode.
    pub fn is_fallback(&self) -> bool {
        self.recognizer.is_some() && !self.changed
    }
}

/// Ordered list of recognizers; the first match wins.
pub struct ContentDecoder {
    recognizers: Vec<Box<dyn Recognizer>>,
}

impl Default for ContentDecoder {
    fn default() -> Self {
        Self::new(vec![Box::new(CmtRecognizer::new())])
    }
}

impl ContentDecoder {
    pub fn new(recognizers: Vec<Box<dyn Recognizer>>) -> Self {
        Self { recognizers }
    }

    /// Append a recognizer after the existing ones.
    pub fn with_recognizer(mut self, recognizer: Box<dyn Recognizer>) -> Self {
        self.recognizers.push(recognizer);
        self
    }

    pub fn recognizer_names(&self) -> Vec<&'static str> {
        self.recognizers.iter().map(|r| r.name()).collect()
    }

    /// Decode raw payload bytes.
    pub fn decode(&self, raw: &[u8]) -> String {
        self.inspect(raw).text
    }

    /// Decode raw payload bytes and report which recognizer claimed them.
    pub fn inspect(&self, raw: &[u8]) -> Decoded {
        let view = latin1_view(raw);
        for recognizer in &self.recognizers {
            if recognizer.matches(&view) {
                log::trace!("payload claimed by {}", recognizer.name());
                let rewritten = recognizer.transform(&view);
                let changed = rewritten.as_ref().is_some_and(|text| *text != view);
                return Decoded {
                    text: rewritten.unwrap_or(view),
                    recognizer: Some(recognizer.name()),
                    changed,
                };
            }
        }
        Decoded {
            text: view,
            recognizer: None,
            changed: false,
        }
    }

    /// Decode a payload as stored in the log. Invalid hex is an empty payload.
    pub fn decode_hex(&self, message_hex: &str) -> String {
        self.decode(&hex_to_bytes(message_hex))
    }
}

fn default_decoder() -> &'static ContentDecoder {
    static DECODER: OnceLock<ContentDecoder> = OnceLock::new();
    DECODER.get_or_init(ContentDecoder::default)
}

/// Decode a stored hex payload with the default recognizers.
pub fn decode_payload_hex(message_hex: &str) -> String {
    default_decoder().decode_hex(message_hex)
}

/// Decode raw payload bytes with the default recognizers.
pub fn decode_bytes(raw: &[u8]) -> String {
    default_decoder().decode(raw)
}

/// [`ContentDecoder::inspect`] with the default recognizers.
pub fn inspect_bytes(raw: &[u8]) -> Decoded {
    default_decoder().inspect(raw)
}

/// Byte value to code point, 0..=255.
pub fn latin1_view(raw: &[u8]) -> String {
    encoding_rs::mem::decode_latin1(raw).into_owned()
}

/// Hex digits to bytes. Odd length or non-hex characters give no data.
pub fn hex_to_bytes(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str).unwrap_or_default()
}

/// Big-endian UTF-16. Unpaired surrogates and a trailing odd byte become
/// U+FFFD instead of failing.
pub fn decode_utf16be(data: &[u8]) -> String {
    let (text, _had_errors) = encoding_rs::UTF_16BE.decode_without_bom_handling(data);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_view_is_one_char_per_byte() {
        let raw: Vec<u8> = (0u8..=255).collect();
        let view = latin1_view(&raw);
        assert_eq!(view.chars().count(), 256);
        let back: Vec<u8> = view.chars().map(|c| c as u32 as u8).collect();
        assert_eq!(back, raw);
    }

    #[test]
    fn hex_to_bytes_rejects_bad_input() {
        assert_eq!(hex_to_bytes("0041"), vec![0x00, 0x41]);
        assert_eq!(hex_to_bytes("00A"), Vec::<u8>::new());
        assert_eq!(hex_to_bytes("zz"), Vec::<u8>::new());
        assert_eq!(hex_to_bytes(""), Vec::<u8>::new());
    }

    #[test]
    fn utf16be_handles_cjk_and_odd_bytes() {
        assert_eq!(decode_utf16be(&[0x4F, 0x60, 0x59, 0x7D]), "你好");
        assert_eq!(decode_utf16be(&[0x00, 0x41, 0x00]), "A\u{FFFD}");
        assert_eq!(decode_utf16be(&[]), "");
    }

    #[test]
    fn non_matching_payload_is_returned_as_view() {
        let raw = b"\r\nRDY\r\n\xff";
        assert_eq!(decode_bytes(raw), "\r\nRDY\r\n\u{ff}");
    }

    struct Shout;
    impl Recognizer for Shout {
        fn name(&self) -> &'static str {
            "shout"
        }
        fn matches(&self, view: &str) -> bool {
            view.starts_with("RING")
        }
        fn transform(&self, view: &str) -> Option<String> {
            Some(view.to_uppercase() + "!")
        }
    }

    struct Decline;
    impl Recognizer for Decline {
        fn name(&self) -> &'static str {
            "decline"
        }
        fn matches(&self, _view: &str) -> bool {
            true
        }
        fn transform(&self, _view: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn first_matching_recognizer_wins() {
        let decoder = ContentDecoder::default().with_recognizer(Box::new(Shout));
        assert_eq!(decoder.recognizer_names(), vec!["cmt", "shout"]);
        assert_eq!(decoder.decode(b"RING\r\n"), "RING\r\n!");

        let declining = ContentDecoder::new(vec![Box::new(Decline), Box::new(Shout)]);
        assert_eq!(declining.decode(b"RING\r\n"), "RING\r\n");
    }

    #[test]
    fn inspect_reports_claim_and_fallback() {
        let decoder = ContentDecoder::new(vec![Box::new(Decline)]);
        let declined = decoder.inspect(b"RING\r\n");
        assert_eq!(declined.recognizer, Some("decline"));
        assert!(declined.is_fallback());

        let shouted = ContentDecoder::new(vec![Box::new(Shout)]).inspect(b"RING\r\n");
        assert!(shouted.changed);
        assert!(!shouted.is_fallback());

        let plain = inspect_bytes(b"OK\r\n");
        assert_eq!(plain.recognizer, None);
        assert!(!plain.is_fallback());
    }
}
