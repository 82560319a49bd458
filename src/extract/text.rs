use std::sync::LazyLock;

use regex::Regex;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static ENUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s*").unwrap());

/// Collapse whitespace runs (newlines included) to single spaces, trim,
/// and strip a leading `<digits>. ` enumeration prefix. Both resolver
/// strategies run their flattened text through this so sentence
/// formatting is identical regardless of extraction path.
pub fn normalize(raw: &str) -> String {
    let collapsed = WS_RE.replace_all(raw, " ");
    ENUM_RE.replace(collapsed.trim(), "").to_string()
}

// ── Tests ──
