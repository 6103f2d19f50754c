//! Decoding stored payloads into display text.

mod common;

use air780e::decoder::{
    decode_bytes, decode_payload_hex, inspect_bytes, latin1_view, ContentDecoder, Recognizer,
};
use air780e::metrics;
use common::utf16_hex;
use proptest::prelude::*;

#[test]
fn stored_cmt_round_trip() {
    let stored = hex::encode("+CMT: \"0035003500350035\",25\r\n\r\n00680065006C006C006F\r\n");
    assert_eq!(decode_payload_hex(&stored), "+CMT: \"5555\",25\r\n\r\nhello\r\n");
}

#[test]
fn chinese_body_with_international_sender() {
    let raw = format!(
        "\r\n+CMT: \"{}\",\"\",\"25/11/02,08:14:03+32\"\r\n{}\r\n",
        utf16_hex("+8613800138000"),
        utf16_hex("您的验证码是 482913，5分钟内有效。")
    );
    assert_eq!(
        decode_bytes(raw.as_bytes()),
        concat!(
            "\r\n+CMT: \"+8613800138000\",\"\",\"25/11/02,08:14:03+32\"\r\n",
            "您的验证码是 482913，5分钟内有效。\r\n"
        )
    );
}

#[test]
fn non_cmt_payloads_are_shown_as_received() {
    let samples: [&[u8]; 4] = [b"+CMTI: \"SM\",3\r\n", b"RING\r\n", b"\r\nOK\r\n", b"0041\r\n"];
    for raw in samples {
        assert_eq!(decode_bytes(raw), latin1_view(raw));
    }
}

#[test]
fn high_bytes_survive_as_latin1() {
    assert_eq!(decode_bytes(b"\xe9t\xe9\r\n"), "\u{e9}t\u{e9}\r\n");
}

#[test]
fn invalid_stored_hex_is_empty() {
    assert_eq!(decode_payload_hex("not hex"), "");
    assert_eq!(decode_payload_hex("abc"), "");
}

#[test]
fn two_notifications_in_one_message_decode_last_body_only() {
    let raw = format!(
        "+CMT: \"{}\",25\r\n{}\r\n+CMT: \"{}\",25\r\n{}\r\n",
        utf16_hex("10086"),
        utf16_hex("first"),
        utf16_hex("10010"),
        utf16_hex("second")
    );
    let text = decode_bytes(raw.as_bytes());
    assert!(text.starts_with("+CMT: \"10086\",25\r\n"));
    assert!(text.contains(&utf16_hex("first")));
    assert!(text.ends_with("\r\nsecond\r\n"));
}

#[test]
fn decoding_leaves_capture_counters_alone() {
    let before = metrics::snapshot();
    let bad_sender = format!("+CMT: \"0A1\",25\r\n{}\r\n", utf16_hex("hi"));
    let decoded = inspect_bytes(bad_sender.as_bytes());
    assert!(decoded.is_fallback());
    assert_eq!(decoded.text, bad_sender);
    let _ = decode_bytes(b"+CMT: \"0031\",25\r\n00680\r\n");
    assert_eq!(metrics::snapshot(), before);
}

struct Ring;

impl Recognizer for Ring {
    fn name(&self) -> &'static str {
        "ring"
    }

    fn matches(&self, view: &str) -> bool {
        view.contains("RING")
    }

    fn transform(&self, _view: &str) -> Option<String> {
        Some("incoming call".to_string())
    }
}

#[test]
fn extra_recognizers_run_after_cmt() {
    let decoder = ContentDecoder::default().with_recognizer(Box::new(Ring));
    assert_eq!(decoder.recognizer_names(), vec!["cmt", "ring"]);
    assert_eq!(decoder.decode(b"RING\r\n"), "incoming call");

    let cmt = format!("+CMT: \"{}\",25\r\nRING\r\n", utf16_hex("1"));
    assert_eq!(decoder.decode(cmt.as_bytes()), "+CMT: \"1\",25\r\nRING\r\n");
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(raw in prop::collection::vec(any::<u8>(), 0..256)) {
        let text = decode_bytes(&raw);
        if !raw.windows(4).any(|w| w == b"+CMT") {
            prop_assert_eq!(text, latin1_view(&raw));
        }
    }

    #[test]
    fn arbitrary_stored_hex_never_panics(s in ".{0,128}") {
        let _ = decode_payload_hex(&s);
    }

    #[test]
    fn malformed_cmt_fields_never_panic(
        sender in "[0-9A-Fa-fxz\"]{0,24}",
        body in "[0-9A-Fa-f ]{0,40}",
    ) {
        let raw = format!("+CMT: \"{}\",25\r\n{}\r\n", sender, body);
        let _ = decode_bytes(raw.as_bytes());
    }
}
