//! Payload escaping
//!
//! Free-form fields cannot carry the field separator or a newline, so both are
//! replaced by placeholders on the way out and restored on the way in.

pub const COLON_PLACEHOLDER: &str = "<colon>";
pub const NEWLINE_PLACEHOLDER: &str = "<nl>";

/// Leading tags that mark a payload as file-transfer data
const FILE_TAG_PREFIXES: [&str; 2] = ["<file|", "</file|"];

pub fn escape_for_wire(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ':' => out.push_str(COLON_PLACEHOLDER),
            '\n' => out.push_str(NEWLINE_PLACEHOLDER),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

pub fn unescape_from_wire(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('<') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if let Some(after) = tail.strip_prefix(COLON_PLACEHOLDER) {
            out.push(':');
            rest = after;
        } else if let Some(after) = tail.strip_prefix(NEWLINE_PLACEHOLDER) {
            out.push('\n');
            rest = after;
        } else {
            out.push('<');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// File-transfer payloads are already base64 and must travel byte-exact.
pub fn is_file_payload(payload: &str) -> bool {
    FILE_TAG_PREFIXES
        .iter()
        .any(|prefix| payload.starts_with(prefix))
}
