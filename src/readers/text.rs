use encoding_rs::{UTF_8, WINDOWS_1252};
use std::borrow::Cow;
use tracing::debug;

/// Decode file contents as UTF-8, falling back to Windows-1252 for the
/// exports that embed a raw `°` byte.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return text;
    }
    debug!("Input is not valid UTF-8, decoding as Windows-1252");
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text
}

/// Everything after the first `count` lines.
pub fn skip_lines(text: &str, count: usize) -> &str {
    let mut rest = text;
    for _ in 0..count {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}
