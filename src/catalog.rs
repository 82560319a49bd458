/// Index page listing every preposition exercise with its difficulty.
pub const INDEX_URL: &str =
    "https://www.english-grammar.at/online_exercises/prepositions/preposition-index.htm";

/// The preposition exercises to scrape. The site has no machine-readable
/// catalog, so the list is pinned here.
pub const EXERCISE_URLS: &[&str] = &[
    "https://www.english-grammar.at/online_exercises/prepositions/prep042-in-at-on.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep041-in-at-on.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep040.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep039.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep038.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep037.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep036.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep035.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep034.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep033.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep032-prepositional-phrases.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep031.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep030-drugs.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep029.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep028.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep027.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep026-my-husband-harry.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep025-in-at-on-to.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep024.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep023-identical-twins.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep022.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep021-prepositional-phrases.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep020.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep019-roald-dahl.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep018-various-prepositions.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep017-in-at-on.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep016.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep015-on-at-in.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prep014.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions013.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions012.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions011.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions010.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions9.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions8.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions7.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/preposiitons6.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions1.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions2.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions3.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/preposiitons4.htm",
    "https://www.english-grammar.at/online_exercises/prepositions/prepositions5.htm",
];

/// Page identifier: final path segment without its extension.
pub fn slug_for(url: &str) -> String {
    let file = url.rsplit('/').next().unwrap_or(url);
    let file = file.split(['?', '#']).next().unwrap_or(file);
    file.trim_end_matches(".html")
        .trim_end_matches(".htm")
        .to_string()
}

/// Catalog as (url, slug) pairs for seeding the page queue.
pub fn exercise_pages() -> Vec<(String, String)> {
    EXERCISE_URLS
        .iter()
        .map(|url| (url.to_string(), slug_for(url)))
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_strips_path_and_extension() {
        assert_eq!(
            slug_for("https://www.english-grammar.at/online_exercises/prepositions/prep042-in-at-on.htm"),
            "prep042-in-at-on"
        );
        assert_eq!(slug_for("prep019-roald-dahl.htm"), "prep019-roald-dahl");
        assert_eq!(slug_for("https://x.test/a/b.html?v=2"), "b");
    }

    #[test]
    fn catalog_slugs_unique() {
        let pages = exercise_pages();
        assert_eq!(pages.len(), EXERCISE_URLS.len());
        let mut slugs: Vec<_> = pages.iter().map(|(_, s)| s.clone()).collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), pages.len());
    }
}
