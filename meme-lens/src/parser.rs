use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::models::ChannelJudgment;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?").expect("valid fence regex"));
static OBJECT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid object regex"));

/// Pull a JSON judgment out of a model reply.
///
/// Tries the outermost `{...}` span first, then the whole reply with fences removed.
/// Returns `None` when neither is an object or array.
pub fn parse_judgment(reply: &str) -> Option<ChannelJudgment> {
    let stripped = FENCE.replace_all(reply, "");
    let stripped = stripped.trim();

    let from_span = OBJECT_SPAN
        .find(stripped)
        .and_then(|span| serde_json::from_str::<Value>(span.as_str()).ok());

    let parsed = from_span
        .or_else(|| serde_json::from_str::<Value>(stripped).ok())
        .filter(|value| value.is_object() || value.is_array());

    if parsed.is_none() {
        debug!(reply_len = reply.len(), "Reply carried no structured judgment");
    }

    parsed.map(ChannelJudgment)
}
