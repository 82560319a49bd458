use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Selector};

use crate::lesson::GapId;

use super::answers::AnswerTable;

static CONTROL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input, select").unwrap());
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// A blank control matched to an answer-table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedGap {
    pub id: GapId,
    pub correct: String,
}

/// Whether an element is an interactive placeholder control.
pub fn is_control(el: &Element) -> bool {
    matches!(el.name(), "input" | "select")
}

/// Gap index embedded in a control's `id` attribute: the first run of
/// digits. Controls without one are decorative and carry no score.
pub fn control_gap_id(el: &Element) -> Option<GapId> {
    let id = el.attr("id")?;
    DIGITS_RE.find(id)?.as_str().parse().ok()
}

/// Enumerate input/select controls inside `container` in document order
/// and keep those whose embedded index has an answer-table entry. This
/// is the only filter separating scored blanks from decorative controls.
pub fn locate_gaps(container: ElementRef<'_>, answers: &AnswerTable) -> Vec<LocatedGap> {
    container
        .select(&CONTROL_SEL)
        .filter_map(|ctl| {
            let id = control_gap_id(ctl.value())?;
            let correct = answers.get(&id)?;
            Some(LocatedGap {
                id,
                correct: correct.clone(),
            })
        })
        .collect()
}

// ── Tests ──
