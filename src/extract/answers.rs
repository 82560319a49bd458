use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::lesson::GapId;

/// Gap index → correct answer, decoded from the page's embedded quiz data.
pub type AnswerTable = BTreeMap<GapId, String>;

/// Bootstrap line of the JCloze answer array; identifies the one script
/// block that carries the answer assignments.
pub const TABLE_SENTINEL: &str = "I = new Array();";

static ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"I\[(\d+)\]\[1\]\[0\]\[0\]\s*=\s*'((?:[^'\\]|\\.)*)';").unwrap()
});

/// Scan the first script block containing [`TABLE_SENTINEL`] for
/// `I[n][1][0][0] = '…';` assignments. No such block yields an empty
/// table; entries whose value fails to decode are skipped.
pub fn parse_answer_table<'a, I>(scripts: I) -> AnswerTable
where
    I: IntoIterator<Item = &'a str>,
{
    let mut table = AnswerTable::new();
    let Some(block) = scripts.into_iter().find(|s| s.contains(TABLE_SENTINEL)) else {
        return table;
    };

    for caps in ASSIGN_RE.captures_iter(block) {
        let Ok(idx) = caps[1].parse::<GapId>() else {
            debug!("answer index out of range: {}", &caps[1]);
            continue;
        };
        match unescape(&caps[2]) {
            Some(value) => {
                table.insert(idx, value);
            }
            None => debug!("unparsable answer value at index {}", idx),
        }
    }
    table
}

/// Decode a single-quoted JS string body. Unknown escapes drop the
/// backslash; a dangling trailing backslash makes the value unparsable.
fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            other => out.push(other),
        }
    }
    Some(out)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "var I = new Array();\n\
        I[0] = new Array();I[0][1] = new Array();I[0][1][0] = new Array();\n\
        I[0][1][0][0] = 'at';\n\
        I[3][1][0][0] = 'on';\n\
        I[12][1][0][0] = 'o\\'clock';\n";

    #[test]
    fn parses_indexed_assignments() {
        let table = parse_answer_table([BLOCK]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(&0).map(String::as_str), Some("at"));
        assert_eq!(table.get(&3).map(String::as_str), Some("on"));
    }

    #[test]
    fn decodes_escapes() {
        let table = parse_answer_table([BLOCK]);
        assert_eq!(table.get(&12).map(String::as_str), Some("o'clock"));

        let block = "I = new Array(); I[5][1][0][0] = 'line\\nbreak';";
        let table = parse_answer_table([block]);
        assert_eq!(table.get(&5).map(String::as_str), Some("line\nbreak"));
    }

    #[test]
    fn no_sentinel_block_is_empty_not_error() {
        assert!(parse_answer_table(["var x = 1;", "alert('hi');"]).is_empty());
        assert!(parse_answer_table(std::iter::empty::<&str>()).is_empty());
    }

    #[test]
    fn picks_first_sentinel_block() {
        let decoy = "I[9][1][0][0] = 'under';"; // no sentinel, must be ignored
        let real = "I = new Array(); I[1][1][0][0] = 'with';";
        let table = parse_answer_table([decoy, real]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&1).map(String::as_str), Some("with"));
    }

    #[test]
    fn malformed_value_fails_soft() {
        let block = "I = new Array();\n\
            I[0][1][0][0] = 'before';\n\
            I[1][1][0][0] = 'broken\\';\n\
            I[2][1][0][0] = 'after';";
        let table = parse_answer_table([block]);
        assert_eq!(table.len(), 2);
        assert!(table.contains_key(&0));
        assert!(!table.contains_key(&1));
        assert!(table.contains_key(&2));
    }
}
