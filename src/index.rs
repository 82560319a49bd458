use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

use crate::catalog::{self, INDEX_URL};
use crate::lesson::Level;

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[alt]").unwrap());

/// Page slug → difficulty level, scraped once from the exercise index
/// page and read many times during extraction.
#[derive(Debug, Default)]
pub struct DifficultyIndex {
    levels: HashMap<String, Level>,
}

impl DifficultyIndex {
    /// Level for a page slug; Elementary when the index has no entry.
    pub fn lookup(&self, slug: &str) -> Level {
        self.levels.get(slug).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Parse the index page. Each exercise link takes the level from the
    /// difficulty icon in its table row, else from the enclosing list
    /// item's text, else Elementary.
    pub fn parse(html: &str) -> DifficultyIndex {
        let doc = Html::parse_document(html);
        let mut levels = HashMap::new();
        for a in doc.select(&LINK_SEL) {
            let Some(href) = a.value().attr("href") else {
                continue;
            };
            let slug = catalog::slug_for(href);
            if slug.is_empty() {
                continue;
            }
            let level = row_icon_level(a)
                .or_else(|| item_text_level(a))
                .unwrap_or_default();
            levels.insert(slug, level);
        }
        DifficultyIndex { levels }
    }
}

fn ancestor_named<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == name)
}

fn row_icon_level(a: ElementRef<'_>) -> Option<Level> {
    let row = ancestor_named(a, "tr")?;
    row.select(&IMG_SEL)
        .find_map(|img| Level::parse(img.value().attr("alt")?))
}

fn item_text_level(a: ElementRef<'_>) -> Option<Level> {
    let li = ancestor_named(a, "li")?;
    let text: String = li.text().collect();
    if text.contains("Advanced") {
        Some(Level::Advanced)
    } else if text.contains("Intermediate") {
        Some(Level::Intermediate)
    } else {
        None
    }
}

/// Fetch and parse the difficulty index. Transport failure degrades to
/// an empty index so extraction proceeds with default levels.
pub async fn fetch_difficulty_index() -> DifficultyIndex {
    info!("Fetching difficulty index: {}", INDEX_URL);
    match fetch_index_html().await {
        Ok(html) => {
            let index = DifficultyIndex::parse(&html);
            info!("Found difficulty levels for {} exercises", index.len());
            index
        }
        Err(e) => {
            warn!("Difficulty index unavailable ({}); defaulting levels", e);
            DifficultyIndex::default()
        }
    }
}

async fn fetch_index_html() -> Result<String> {
    let client = reqwest::Client::new();
    let resp = client
        .get(INDEX_URL)
        .send()
        .await
        .context("Failed to fetch difficulty index")?
        .error_for_status()?;
    Ok(resp.text().await?)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> DifficultyIndex {
        let html = std::fs::read_to_string("tests/fixtures/index.htm").unwrap();
        DifficultyIndex::parse(&html)
    }

    #[test]
    fn levels_from_table_row_icons() {
        let idx = index();
        assert_eq!(idx.lookup("prep042-in-at-on"), Level::Intermediate);
        assert_eq!(idx.lookup("prep041-in-at-on"), Level::Advanced);
        assert_eq!(idx.lookup("prep040"), Level::Elementary);
    }

    #[test]
    fn levels_from_list_item_text() {
        let idx = index();
        assert_eq!(idx.lookup("prepositions5"), Level::Advanced);
        assert_eq!(idx.lookup("prepositions1"), Level::Elementary);
    }

    #[test]
    fn unknown_slug_defaults_to_elementary() {
        assert_eq!(index().lookup("prep999"), Level::Elementary);
        assert_eq!(DifficultyIndex::default().lookup("prep040"), Level::Elementary);
    }
}
