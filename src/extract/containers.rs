use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::lesson::{GapId, ELISION, PLACEHOLDER};

use super::answers::AnswerTable;
use super::gaps::{self, LocatedGap};
use super::text;

static LI_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".ClozeBody").unwrap());
static FORM_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static MARK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{E000}(\d+)\x{E000}").unwrap());

/// Private-use delimiter for in-text gap markers; survives whitespace
/// collapsing and cannot occur in page text.
const GAP_MARK: char = '\u{E000}';

/// Elements that contribute no sentence text.
const DROP_TAGS: &[&str] = &["script", "style", "noscript", "button", "textarea"];

/// A normalized sentence with its matched gaps, before options and
/// explanations are attached.
#[derive(Debug, Clone)]
pub struct RawSentence {
    pub text: String,
    pub gaps: Vec<LocatedGap>,
}

type Strategy = fn(&Html, &AnswerTable) -> Vec<RawSentence>;

/// Extraction strategies in priority order; the first to yield a
/// sentence wins the page.
const STRATEGIES: &[Strategy] = &[list_items, whole_body];

pub fn resolve_sentences(doc: &Html, answers: &AnswerTable) -> Vec<RawSentence> {
    for strategy in STRATEGIES {
        let sentences = strategy(doc, answers);
        if !sentences.is_empty() {
            return sentences;
        }
    }
    Vec::new()
}

/// Strategy 1: one candidate sentence per list item. Items with no
/// matched gap are skipped, never emitted empty.
fn list_items(doc: &Html, answers: &AnswerTable) -> Vec<RawSentence> {
    let mut out = Vec::new();
    for li in doc.select(&LI_SEL) {
        let gaps = gaps::locate_gaps(li, answers);
        if gaps.is_empty() {
            continue;
        }
        let text = text::normalize(&flatten(li, answers, |_| PLACEHOLDER.to_string()));
        out.push(RawSentence { text, gaps });
    }
    out
}

/// Strategy 2: whole-body fallback for pages without list structure.
/// All matched controls are tagged in-place, the container is flattened
/// to text, and the text is split into sentence-like chunks. A chunk
/// holding N gap markers emits N sentences, each with one live blank and
/// the co-occurring markers elided, so every emitted sentence carries
/// exactly one scored gap.
fn whole_body(doc: &Html, answers: &AnswerTable) -> Vec<RawSentence> {
    let Some(container) = doc
        .select(&BODY_SEL)
        .next()
        .or_else(|| doc.select(&FORM_SEL).next())
    else {
        return Vec::new();
    };

    let located = gaps::locate_gaps(container, answers);
    if located.is_empty() {
        return Vec::new();
    }
    let by_id: HashMap<GapId, &LocatedGap> = located.iter().map(|g| (g.id, g)).collect();

    let tagged = flatten(container, answers, |id| format!("{GAP_MARK}{id}{GAP_MARK}"));

    let mut out = Vec::new();
    for chunk in split_chunks(&tagged) {
        for (live, gap) in sentences_from_chunk(chunk, &by_id) {
            out.push(RawSentence {
                text: live,
                gaps: vec![gap],
            });
        }
    }
    out
}

/// Emit one (text, gap) pair per distinct marker in `chunk`: the target
/// marker becomes the blank placeholder, the others the elision marker.
fn sentences_from_chunk(
    chunk: &str,
    by_id: &HashMap<GapId, &LocatedGap>,
) -> Vec<(String, LocatedGap)> {
    let mut seen = std::collections::HashSet::new();
    let ids: Vec<GapId> = MARK_RE
        .captures_iter(chunk)
        .filter_map(|c| c[1].parse().ok())
        .filter(|id| seen.insert(*id))
        .collect();

    ids.into_iter()
        .filter_map(|id| {
            let gap = by_id.get(&id)?;
            let replaced = MARK_RE.replace_all(chunk, |caps: &regex::Captures<'_>| {
                if caps[1].parse::<GapId>() == Ok(id) {
                    PLACEHOLDER
                } else {
                    ELISION
                }
            });
            Some((text::normalize(&replaced), (*gap).clone()))
        })
        .collect()
}

/// Flatten a container to plain text. Matched controls render through
/// `render_gap`; unmatched controls and [`DROP_TAGS`] subtrees are
/// dropped so nothing but sentence text and gap markers remains.
fn flatten<F>(container: ElementRef<'_>, answers: &AnswerTable, mut render_gap: F) -> String
where
    F: FnMut(GapId) -> String,
{
    let mut out = String::new();
    flatten_into(*container, answers, &mut render_gap, &mut out);
    out
}

fn flatten_into(
    node: NodeRef<'_, Node>,
    answers: &AnswerTable,
    render_gap: &mut dyn FnMut(GapId) -> String,
    out: &mut String,
) {
    for child in node.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => {
                if DROP_TAGS.contains(&el.name()) {
                    continue;
                }
                if gaps::is_control(el) {
                    if let Some(id) = gaps::control_gap_id(el) {
                        if answers.contains_key(&id) {
                            out.push_str(&render_gap(id));
                        }
                    }
                    continue;
                }
                flatten_into(child, answers, render_gap, out);
            }
            _ => {}
        }
    }
}

/// Split flattened text on sentence-terminal punctuation followed by
/// whitespace. Best-effort; chunks without gap markers are discarded by
/// the caller.
fn split_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = iter.peek() {
                if next.is_whitespace() {
                    let end = i + c.len_utf8();
                    chunks.push(&text[start..end]);
                    start = end;
                }
            }
        }
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

// ── Tests ──
