//! Formatting helpers: JSON pretty-printing, string clamping, time and size
//! rendering.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// Cells longer than this are truncated before rendering.
pub const CELL_CLAMP_WIDTH: usize = 180;

const ELLIPSIS: char = '…';

/// Pretty-print `input` if it parses as a JSON object.
///
/// Returns `(pretty, true)` on success and `(input, false)` otherwise. Keys
/// come out sorted because `serde_json::Map` is ordered.
pub fn try_format_json(input: &str) -> (String, bool) {
    match serde_json::from_str::<serde_json::Value>(input) {
        Ok(value @ serde_json::Value::Object(_)) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => (pretty, true),
            Err(_) => (input.to_string(), false),
        },
        _ => (input.to_string(), false),
    }
}

/// Truncate `s` to at most `n` characters.
///
/// Strings of `n` or more characters keep their first `n - 1` characters and
/// get an ellipsis appended, which makes the operation idempotent.
pub fn clamp(s: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(n - 1).collect();
    if chars.next().is_none() {
        return head;
    }
    let mut out = head;
    out.push(ELLIPSIS);
    out
}

/// Clamp a table cell to [`CELL_CLAMP_WIDTH`].
pub fn clamp_cell(s: &str) -> String {
    clamp(s, CELL_CLAMP_WIDTH)
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render epoch milliseconds; out-of-range values fall back to the raw number.
pub fn format_epoch_millis(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(t) => format_time(&t),
        None => millis.to_string(),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1}G", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}K", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// `MMm SSs` countdown rendering.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}m {:02}s", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_pretty_sorted() {
        let input = r#"{"userId": 1,"id": 1,"title": "delectus aut autem","completed": false}"#;
        let (out, ok) = try_format_json(input);
        assert!(ok);
        assert_eq!(
            out,
            "{\n  \"completed\": false,\n  \"id\": 1,\n  \"title\": \"delectus aut autem\",\n  \"userId\": 1\n}"
        );
    }

    #[test]
    fn test_json_non_object_passthrough() {
        assert_eq!(try_format_json("Hello"), ("Hello".to_string(), false));
        assert_eq!(try_format_json(""), (String::new(), false));
        assert_eq!(try_format_json("[1,2]"), ("[1,2]".to_string(), false));
        assert_eq!(try_format_json("{broken"), ("{broken".to_string(), false));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp("short", 10), "short");
        assert_eq!(clamp("abcdef", 6), "abcde…");
        assert_eq!(clamp("abcdefgh", 6), "abcde…");
        assert_eq!(clamp("abcde", 6), "abcde");
        assert_eq!(clamp("anything", 0), "");
    }

    #[test]
    fn test_clamp_idempotent() {
        for s in ["", "a", "abcdef", "héllo wörld, this is long", "exactly10!"] {
            for n in [1usize, 3, 6, 10, 180] {
                let once = clamp(s, n);
                assert_eq!(clamp(&once, n), once, "s={s:?} n={n}");
                assert!(once.chars().count() <= n);
            }
        }
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.0K");
        assert_eq!(format_countdown(Duration::from_secs(61)), "01m 01s");
        assert_eq!(format_epoch_millis(0), "1970-01-01 00:00:00");
    }
}
