//! Cleanup of action payloads
//!
//! Models sometimes wrap file contents in markdown code fences even when
//! told not to. The final payload of an action has a leading and trailing
//! fence line removed (only when both are present), stray backticks at
//! either end removed, surrounding whitespace trimmed and, for file
//! actions, exactly one trailing newline.

use forge_types::ActionKind;

const FENCE: &str = "```";

/// Clean the complete payload of a closed action
pub fn clean(raw: &str, kind: ActionKind) -> String {
    let mut body = raw.trim();

    if let Some(inner) = strip_fence_pair(body) {
        body = inner.trim();
    }

    let body = body.trim_matches('`').trim();

    let mut cleaned = body.to_string();
    if kind == ActionKind::File && !cleaned.is_empty() {
        cleaned.push('\n');
    }
    cleaned
}

/// Best-effort cleanup of a payload that is still streaming.
///
/// Only a complete leading fence line is removed; the closing fence cannot
/// be told apart from content until the action closes.
pub fn clean_streaming(raw: &str) -> String {
    let body = raw.trim_start();
    match opening_fence_len(body) {
        Some(len) => body[len..].to_string(),
        None if FENCE.starts_with(body) || body.starts_with(FENCE) && !body.contains('\n') => {
            String::new()
        }
        None => body.to_string(),
    }
}

/// Length of an opening fence line such as "```ts\n", newline included
fn opening_fence_len(body: &str) -> Option<usize> {
    let rest = body.strip_prefix(FENCE)?;
    let newline = rest.find('\n')?;
    let info = rest[..newline].trim();
    let is_info_string = info
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.' | '#'));
    is_info_string.then_some(FENCE.len() + newline + 1)
}

fn strip_fence_pair(body: &str) -> Option<&str> {
    let open = opening_fence_len(body)?;
    let inner = &body[open..];
    let without_close = inner.strip_suffix(FENCE)?;
    // the closing fence must sit on its own line (or close an empty body)
    if without_close.is_empty() || without_close.ends_with('\n') {
        Some(without_close)
    } else {
        None
    }
}
