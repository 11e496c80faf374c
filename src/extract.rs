use crate::{APP_MODULE, HEADER_SENTINEL, INF_MARKER};

/// Decodes one raw line from the log, replacing the invalid UTF-8 sequences
/// (RTT logs are often garbled at connect/reset) and dropping the line terminator.
pub fn decode_line(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    s.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string()
}

/// Returns the application payload of an info trace line,
/// i.e., what follows `<inf>`, whitespace, `app:`, whitespace, trimmed.
/// Any other line gives `None`.
pub fn parse_app_inf_payload(line: &str) -> Option<&str> {
    for (i, _) in line.match_indices(INF_MARKER) {
        let rest = &line[i + INF_MARKER.len()..];
        let after_ws = rest.trim_start();
        if after_ws.len() == rest.len() {
            continue;
        }
        let after_module = match after_ws.strip_prefix(APP_MODULE) {
            Some(s) => s,
            None => continue,
        };
        let payload = after_module.trim_start();
        if payload.len() == after_module.len() {
            continue;
        }
        return Some(payload.trim());
    }
    None
}

/// data rows start with the timestamp, so a digit or a minus sign
pub fn is_number_row(payload: &str) -> bool {
    match payload.chars().next() {
        Some(c) => c.is_ascii_digit() || c == '-',
        None => false,
    }
}

pub fn is_header_start(payload: &str) -> bool {
    payload.starts_with(HEADER_SENTINEL)
}
