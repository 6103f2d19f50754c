//! Logging helpers that keep modem traffic on a single log line.
//! AT traffic is full of CR/LF pairs and occasional binary; these escape it for display.

/// Longest preview emitted before truncating with an ellipsis.
const MAX_PREVIEW: usize = 300;

/// Escape a decoded string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
/// - other control characters => `\\xNN`
///
/// Output is capped at [`MAX_PREVIEW`] characters.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        push_escaped(&mut out, ch);
    }
    out
}

/// Escape raw line bytes. Printable ASCII passes through, everything else is
/// shown as an escape so a logged line never depends on the modem's charset.
pub fn escape_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().min(MAX_PREVIEW) + 8);
    for (count, &b) in data.iter().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        if b.is_ascii() {
            push_escaped(&mut out, b as char);
        } else {
            use std::fmt::Write;
            let _ = write!(&mut out, "\\x{:02X}", b);
        }
    }
    out
}

/// Lowercase hex of at most `max` leading bytes, for trace output of raw reads.
pub fn hex_snippet(data: &[u8], max: usize) -> String {
    hex::encode(&data[..data.len().min(max)])
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c if c.is_control() => {
            use std::fmt::Write;
            let _ = write!(out, "\\x{:02X}", c as u32);
        }
        c => out.push(c),
    }
}
