pub mod answers;
pub mod containers;
pub mod distractors;
pub mod explain;
pub mod gaps;
pub mod text;

use std::sync::LazyLock;

use rand::Rng;
use scraper::{Html, Selector};
use tracing::debug;

use crate::lesson::{Gap, Lesson, Level, Sentence};
use containers::RawSentence;

static SCRIPT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());
static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static H2_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").unwrap());

/// Turn one raw exercise page into a lesson: answer table → container
/// resolution → per-gap options and explanations. `None` means the page
/// yielded no usable sentence and should be skipped, never that the
/// batch failed. `level` stays at its default; the caller consults the
/// difficulty index afterwards.
pub fn extract_lesson(slug: &str, html: &str) -> Option<Lesson> {
    extract_lesson_with_rng(slug, html, &mut rand::thread_rng())
}

/// [`extract_lesson`] with an injected rng so tests can pin option sets.
pub fn extract_lesson_with_rng<R: Rng>(slug: &str, html: &str, rng: &mut R) -> Option<Lesson> {
    let doc = Html::parse_document(html);

    let scripts: Vec<String> = doc.select(&SCRIPT_SEL).map(|s| s.text().collect()).collect();
    let answers = answers::parse_answer_table(scripts.iter().map(String::as_str));

    let raw = containers::resolve_sentences(&doc, &answers);
    if raw.is_empty() {
        debug!("no sentences extracted from {}", slug);
        return None;
    }

    // Distractors draw on the whole lesson, so the pool is collected
    // only after every strategy has run.
    let pool = lesson_pool(&raw);

    let sentences = raw
        .into_iter()
        .enumerate()
        .map(|(seq, rs)| {
            let gaps = rs
                .gaps
                .iter()
                .map(|g| Gap {
                    id: g.id,
                    correct: g.correct.clone(),
                    options: distractors::generate_options(&g.correct, &pool, rng),
                    explanation: explain::explain(&g.correct, &rs.text),
                })
                .collect();
            Sentence {
                id: seq as u32,
                text: rs.text,
                gaps,
            }
        })
        .collect();

    Some(Lesson {
        id: slug.to_string(),
        title: page_title(&doc).unwrap_or_else(|| slug.to_string()),
        level: Level::default(),
        sentences,
    })
}

/// Distinct lowercased correct answers of the matched gaps, in first
/// appearance order.
fn lesson_pool(sentences: &[RawSentence]) -> Vec<String> {
    let mut pool: Vec<String> = Vec::new();
    for rs in sentences {
        for gap in &rs.gaps {
            let p = gap.correct.trim().to_lowercase();
            if !pool.contains(&p) {
                pool.push(p);
            }
        }
    }
    pool
}

fn page_title(doc: &Html) -> Option<String> {
    for sel in [&*H1_SEL, &*H2_SEL] {
        if let Some(h) = doc.select(sel).next() {
            let t = h.text().collect::<String>().trim().to_string();
            if !t.is_empty() {
                return Some(t);
            }
        }
    }
    None
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::lesson::PLACEHOLDER;

    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.htm", name)).unwrap()
    }

    fn extract_fixture(name: &str, seed: u64) -> Option<Lesson> {
        let html = fixture(name);
        extract_lesson_with_rng(name, &html, &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn list_page_extracts_matched_gaps() {
        let lesson = extract_fixture("prep_list", 1).unwrap();
        assert_eq!(lesson.id, "prep_list");
        assert_eq!(lesson.title, "Prepositions of Time");
        assert_eq!(lesson.level, Level::Elementary);
        assert_eq!(lesson.sentences.len(), 3);

        let first = &lesson.sentences[0];
        assert_eq!(first.id, 0);
        assert_eq!(first.text, "She arrived ____ noon.");
        assert_eq!(first.gaps.len(), 1);
        assert_eq!(first.gaps[0].id, 0);
        assert_eq!(first.gaps[0].correct, "at");

        // Sentence ids are sequential in source order.
        let ids: Vec<u32> = lesson.sentences.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn orphan_answer_entries_produce_no_gaps() {
        // The fixture's answer table has an entry at index 7 that no
        // control references.
        let lesson = extract_fixture("prep_list", 2).unwrap();
        assert!(lesson
            .sentences
            .iter()
            .flat_map(|s| &s.gaps)
            .all(|g| g.id != 7));
    }

    #[test]
    fn gap_ids_unique_within_lesson() {
        for name in ["prep_list", "prep_body"] {
            let lesson = extract_fixture(name, 3).unwrap();
            let mut ids: Vec<u32> = lesson
                .sentences
                .iter()
                .flat_map(|s| &s.gaps)
                .map(|g| g.id)
                .collect();
            let total = ids.len();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), total);
        }
    }

    #[test]
    fn every_gap_has_three_unique_options_with_correct() {
        for name in ["prep_list", "prep_body"] {
            let lesson = extract_fixture(name, 4).unwrap();
            for gap in lesson.sentences.iter().flat_map(|s| &s.gaps) {
                assert_eq!(gap.options.len(), 3);
                let correct_hits = gap
                    .options
                    .iter()
                    .filter(|o| o.eq_ignore_ascii_case(&gap.correct))
                    .count();
                assert_eq!(correct_hits, 1, "gap {} in {}", gap.id, name);
                let mut uniq = gap.options.clone();
                uniq.sort();
                uniq.dedup();
                assert_eq!(uniq.len(), 3);
            }
        }
    }

    #[test]
    fn body_fallback_duplicates_sentence_per_gap() {
        let lesson = extract_fixture("prep_body", 5).unwrap();
        assert_eq!(lesson.title, "Roald Dahl");
        assert_eq!(lesson.sentences.len(), 3);

        let s0 = &lesson.sentences[0];
        let s1 = &lesson.sentences[1];
        assert_eq!(s0.text, "He went ____ boarding school … the south coast.");
        assert_eq!(s0.gaps.len(), 1);
        assert_eq!(s0.gaps[0].correct, "to");
        assert_eq!(s1.text, "He went … boarding school ____ the south coast.");
        assert_eq!(s1.gaps[0].correct, "on");
    }

    #[test]
    fn body_fallback_reaches_idiom_explanations() {
        let lesson = extract_fixture("prep_body", 6).unwrap();
        let last = lesson.sentences.last().unwrap();
        assert_eq!(last.text, "He learned many poems ____ heart.");
        assert_eq!(
            last.gaps[0].explanation,
            "'By heart' means 'from memory' or 'memorized completely'."
        );
    }

    #[test]
    fn idempotent_apart_from_option_order() {
        for name in ["prep_list", "prep_body"] {
            let a = extract_fixture(name, 10).unwrap();
            let b = extract_fixture(name, 20).unwrap();
            assert_eq!(a.id, b.id);
            assert_eq!(a.title, b.title);
            assert_eq!(a.sentences.len(), b.sentences.len());
            for (sa, sb) in a.sentences.iter().zip(&b.sentences) {
                assert_eq!(sa.id, sb.id);
                assert_eq!(sa.text, sb.text);
                for (ga, gb) in sa.gaps.iter().zip(&sb.gaps) {
                    assert_eq!(ga.id, gb.id);
                    assert_eq!(ga.correct, gb.correct);
                    assert_eq!(ga.explanation, gb.explanation);
                    let mut oa = ga.options.clone();
                    let mut ob = gb.options.clone();
                    oa.sort();
                    ob.sort();
                    assert_eq!(oa, ob);
                }
            }
        }
    }

    #[test]
    fn substituting_answers_reconstructs_sentences() {
        let lesson = extract_fixture("prep_list", 7).unwrap();
        let rebuilt: Vec<String> = lesson
            .sentences
            .iter()
            .map(|s| {
                let mut text = s.text.clone();
                for gap in &s.gaps {
                    text = text.replacen(PLACEHOLDER, &gap.correct, 1);
                }
                text
            })
            .collect();
        assert_eq!(
            rebuilt,
            vec![
                "She arrived at noon.",
                "We met on Monday.",
                "The war ended in 1945.",
            ]
        );
    }

    #[test]
    fn page_without_exercise_yields_no_lesson() {
        assert!(extract_fixture("prep_empty", 8).is_none());
    }

    #[test]
    fn batch_records_skips_without_raising() {
        let mut extracted = 0;
        let mut skipped = 0;
        for name in ["prep_list", "prep_empty", "prep_body"] {
            match extract_fixture(name, 9) {
                Some(_) => extracted += 1,
                None => skipped += 1,
            }
        }
        assert_eq!(extracted, 2);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn pool_is_ordered_and_distinct() {
        let raw = vec![
            RawSentence {
                text: String::new(),
                gaps: vec![
                    gaps::LocatedGap { id: 0, correct: "At".into() },
                    gaps::LocatedGap { id: 1, correct: "on".into() },
                ],
            },
            RawSentence {
                text: String::new(),
                gaps: vec![gaps::LocatedGap { id: 2, correct: "at".into() }],
            },
        ];
        assert_eq!(lesson_pool(&raw), vec!["at".to_string(), "on".to_string()]);
    }
}
