//! Tolerant extraction of a JSON object from raw LLM output (§4.4 "a
//! tolerant extractor (accept fenced blocks, strip leading commentary,
//! re-balance braces once) before a strict parse").

/// Pulls the most likely JSON object out of `raw` and parses it as `T`.
///
/// Tried in order: the content of a fenced code block (``` ```json or
/// plain ```), then the substring between the first `{` and the matching
/// closing brace computed by depth-tracking, re-balancing by appending
/// missing closing braces exactly once if the source was truncated
/// mid-object. Returns the first strict parse that succeeds.
pub fn extract_json<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    for candidate in candidates(raw) {
        if let Ok(value) = serde_json::from_str(&candidate) {
            return Some(value);
        }
        if let Some(rebalanced) = rebalance(&candidate) {
            if let Ok(value) = serde_json::from_str(&rebalanced) {
                return Some(value);
            }
        }
    }
    None
}

fn candidates(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(fenced) = fenced_block(raw) {
        out.push(fenced);
    }
    if let Some(braced) = first_brace_span(raw) {
        out.push(braced);
    }
    out.push(raw.trim().to_string());
    out
}

/// Extracts the body of the first fenced code block, tolerating an
/// optional language tag (e.g. ` ```json `).
fn fenced_block(raw: &str) -> Option<String> {
    let start = raw.find("```")?;
    let after_fence = &raw[start + 3..];
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim().to_string())
}

/// Extracts the substring spanning the first `{` through its matching
/// `}`, ignoring braces inside string literals.
fn first_brace_span(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let bytes = raw.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        let ch = byte as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(raw[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// If `candidate` looks like a truncated object (more `{` than `}`),
/// appends exactly enough `}` to balance it once. Does not attempt to
/// repair truncated strings or arrays.
fn rebalance(candidate: &str) -> Option<String> {
    let opens = candidate.matches('{').count();
    let closes = candidate.matches('}').count();
    if opens > closes {
        let mut repaired = candidate.to_string();
        for _ in 0..(opens - closes) {
            repaired.push('}');
        }
        Some(repaired)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn parses_bare_json() {
        let parsed: Point = extract_json(r#"{"x": 1, "y": 2}"#).unwrap();
        assert_eq!(parsed, Point { x: 1, y: 2 });
    }

    #[test]
    fn strips_fenced_block_with_language_tag() {
        let raw = "Here is the plan:\n```json\n{\"x\": 3, \"y\": 4}\n```\nLet me know.";
        let parsed: Point = extract_json(raw).unwrap();
        assert_eq!(parsed, Point { x: 3, y: 4 });
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let raw = r#"{"x": 1, "y": 2, "note": "use {curly} literally"}"#;
        let parsed: Point = extract_json(raw).unwrap();
        assert_eq!(parsed, Point { x: 1, y: 2 });
    }

    #[test]
    fn rebalances_truncated_object_once() {
        let raw = r#"{"x": 5, "y": 6"#;
        let parsed: Point = extract_json(raw).unwrap();
        assert_eq!(parsed, Point { x: 5, y: 6 });
    }

    #[test]
    fn returns_none_for_unparseable_garbage() {
        let parsed: Option<Point> = extract_json("not json at all");
        assert!(parsed.is_none());
    }
}
