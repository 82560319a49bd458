use rand::seq::SliceRandom;
use rand::Rng;

/// Options per gap, correct answer included.
pub const OPTION_COUNT: usize = 3;

/// Last-resort filler when pool and confusables run dry.
const COMMON_FALLBACK: &[&str] = &["in", "at", "on", "to", "for", "of", "with", "by"];

/// Prepositions commonly confused with each key, most-confusable first.
const CONFUSABLE: &[(&str, &[&str])] = &[
    ("in", &["at", "on", "into", "within"]),
    ("at", &["in", "on", "to", "by"]),
    ("on", &["in", "at", "upon", "onto"]),
    ("to", &["at", "for", "into", "towards"]),
    ("for", &["to", "since", "during", "of"]),
    ("of", &["from", "for", "off", "about"]),
    ("with", &["by", "about", "without", "through"]),
    ("by", &["with", "at", "through", "near"]),
    ("about", &["of", "on", "around", "over"]),
    ("from", &["of", "since", "off", "out"]),
    ("since", &["from", "for", "after", "during"]),
    ("during", &["for", "while", "in", "through"]),
    ("while", &["during", "when", "as", "until"]),
    ("into", &["in", "to", "onto", "inside"]),
    ("onto", &["on", "into", "upon", "to"]),
    ("through", &["by", "across", "via", "over"]),
    ("over", &["above", "on", "across", "through"]),
    ("under", &["below", "beneath", "underneath", "down"]),
    ("above", &["over", "on", "up", "upon"]),
    ("below", &["under", "beneath", "down", "underneath"]),
    ("between", &["among", "within", "amid", "amongst"]),
    ("among", &["between", "amid", "amongst", "within"]),
    ("before", &["after", "until", "by", "prior"]),
    ("after", &["before", "since", "following", "behind"]),
    ("behind", &["after", "beyond", "back", "past"]),
    ("beyond", &["past", "behind", "after", "through"]),
    ("against", &["for", "towards", "with", "on"]),
    ("along", &["across", "through", "beside", "by"]),
    ("around", &["about", "round", "near"]),
    ("out", &["in", "off", "outside", "away"]),
    ("off", &["out", "from", "away", "down"]),
    ("up", &["down", "above", "over", "on"]),
    ("down", &["up", "below", "under", "off"]),
    ("away", &["off", "out", "from", "back"]),
    ("back", &["away", "behind", "return", "again"]),
    ("across", &["through", "over", "along", "past"]),
    ("past", &["beyond", "through", "by", "after"]),
    ("beside", &["by", "next", "near", "alongside"]),
    ("near", &["by", "beside", "close", "around"]),
    ("inside", &["in", "within", "into"]),
    ("outside", &["out", "beyond", "without", "external"]),
    ("within", &["in", "inside", "during", "among"]),
    ("without", &["with", "outside", "lacking", "minus"]),
];

fn confusable_with(prep: &str) -> &'static [&'static str] {
    CONFUSABLE
        .iter()
        .find(|(k, _)| *k == prep)
        .map(|(_, v)| *v)
        .unwrap_or(&[])
}

/// Build the 3-option multiple-choice set for one gap. Slots beyond the
/// correct answer fill in priority order: lesson-pool members that are
/// also confusable with the correct answer, remaining pool members,
/// remaining confusables, then the common-preposition filler. The
/// layering terminates with 3 unique lowercase options for any
/// non-empty answer; final order comes from the injected rng.
pub fn generate_options<R: Rng>(correct: &str, lesson_pool: &[String], rng: &mut R) -> Vec<String> {
    let correct = correct.trim().to_lowercase();
    let similar = confusable_with(&correct);

    let pool: Vec<String> = lesson_pool
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| *p != correct)
        .collect();

    let mut options = vec![correct.clone()];
    let mut push = |options: &mut Vec<String>, candidate: &str| {
        if options.len() < OPTION_COUNT && !options.iter().any(|o| o == candidate) {
            options.push(candidate.to_string());
        }
    };

    for p in pool.iter().filter(|p| similar.contains(&p.as_str())) {
        push(&mut options, p);
    }
    for p in &pool {
        push(&mut options, p);
    }
    for p in similar {
        push(&mut options, p);
    }
    for p in COMMON_FALLBACK {
        push(&mut options, p);
    }

    options.shuffle(rng);
    options
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn pool(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn assert_valid(options: &[String], correct: &str) {
        assert_eq!(options.len(), OPTION_COUNT);
        assert_eq!(
            options.iter().filter(|o| o.as_str() == correct).count(),
            1
        );
        let mut unique: Vec<&String> = options.iter().collect();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), OPTION_COUNT);
    }

    #[test]
    fn confusable_pool_members_win() {
        // "at" and "on" are both in the lesson and confusable with "in";
        // "from" is in the lesson but not confusable, so it loses.
        let options = generate_options("in", &pool(&["from", "at", "on"]), &mut rng());
        assert_valid(&options, "in");
        assert!(options.contains(&"at".to_string()));
        assert!(options.contains(&"on".to_string()));
    }

    #[test]
    fn falls_back_to_pool_then_confusables() {
        let options = generate_options("in", &pool(&["from"]), &mut rng());
        assert_valid(&options, "in");
        // One slot from the pool, the last from the confusable table.
        assert!(options.contains(&"from".to_string()));
        assert!(options.iter().any(|o| confusable_with("in").contains(&o.as_str())));
    }

    #[test]
    fn empty_pool_uses_confusable_table() {
        let options = generate_options("under", &[], &mut rng());
        assert_valid(&options, "under");
        for o in options.iter().filter(|o| o.as_str() != "under") {
            assert!(confusable_with("under").contains(&o.as_str()));
        }
    }

    #[test]
    fn unknown_answer_still_fills_three() {
        let options = generate_options("betwixt", &[], &mut rng());
        assert_valid(&options, "betwixt");
        for o in options.iter().filter(|o| o.as_str() != "betwixt") {
            assert!(COMMON_FALLBACK.contains(&o.as_str()));
        }
    }

    #[test]
    fn case_and_pool_duplicates_collapse() {
        let options = generate_options("At", &pool(&["AT", "at", "In", "in"]), &mut rng());
        assert_valid(&options, "at");
    }

    #[test]
    fn set_is_stable_across_shuffles() {
        // Identity of the chosen options is deterministic; only order is
        // randomized. Compare sets across differently seeded rngs.
        let mut a = generate_options("on", &pool(&["in", "at"]), &mut StdRng::seed_from_u64(1));
        let mut b = generate_options("on", &pool(&["in", "at"]), &mut StdRng::seed_from_u64(99));
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
}
