use anyhow::Result;
use rusqlite::Connection;

use crate::lesson::{Gap, Lesson, Level, Sentence};

const DB_PATH: &str = "data/lessons.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id         INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            slug       TEXT NOT NULL,
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pages_visited ON pages(visited);

        CREATE TABLE IF NOT EXISTS page_data (
            id         INTEGER PRIMARY KEY,
            page_id    INTEGER NOT NULL REFERENCES pages(id),
            url        TEXT NOT NULL,
            slug       TEXT NOT NULL,
            html       TEXT,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            processed  BOOLEAN NOT NULL DEFAULT 0,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_page_data_slug ON page_data(slug);

        -- Extracted lessons
        CREATE TABLE IF NOT EXISTS lessons (
            slug           TEXT PRIMARY KEY,
            url            TEXT NOT NULL,
            title          TEXT NOT NULL,
            level          TEXT NOT NULL CHECK(level IN ('Elementary','Intermediate','Advanced')),
            sentence_count INTEGER NOT NULL DEFAULT 0,
            extracted_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sentences (
            id           INTEGER PRIMARY KEY,
            lesson_slug  TEXT NOT NULL REFERENCES lessons(slug),
            seq          INTEGER NOT NULL,
            text         TEXT NOT NULL,
            UNIQUE(lesson_slug, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_sentences_lesson ON sentences(lesson_slug);

        CREATE TABLE IF NOT EXISTS gaps (
            id           INTEGER PRIMARY KEY,
            lesson_slug  TEXT NOT NULL REFERENCES lessons(slug),
            sentence_seq INTEGER NOT NULL,
            gap_id       INTEGER NOT NULL,
            correct      TEXT NOT NULL,
            options      TEXT NOT NULL,
            explanation  TEXT NOT NULL,
            UNIQUE(lesson_slug, gap_id)
        );
        CREATE INDEX IF NOT EXISTS idx_gaps_lesson ON gaps(lesson_slug);
        ",
    )?;
    Ok(())
}

// ── Fetching ──

pub fn insert_pages(conn: &Connection, pages: &[(String, String)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO pages (url, slug) VALUES (?1, ?2)")?;
        for (url, slug) in pages {
            count += stmt.execute(rusqlite::params![url, slug])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_unvisited(
    conn: &Connection,
    limit: Option<usize>,
) -> Result<Vec<(i64, String, String)>> {
    let sql = match limit {
        Some(n) => format!(
            "SELECT id, url, slug FROM pages WHERE visited = 0 ORDER BY id LIMIT {}",
            n
        ),
        None => "SELECT id, url, slug FROM pages WHERE visited = 0 ORDER BY id".to_string(),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct FetchRow {
    pub page_id: i64,
    pub url: String,
    pub slug: String,
    pub html: Option<String>,
    pub status: Option<i32>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

// ── Extraction ──

pub struct FetchedPage {
    pub page_data_id: i64,
    pub slug: String,
    pub url: String,
    pub html: String,
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<FetchedPage>> {
    let sql = format!(
        "SELECT id, slug, url, html FROM page_data
         WHERE html IS NOT NULL AND processed = 0
         ORDER BY id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FetchedPage {
                page_data_id: row.get(0)?,
                slug: row.get(1)?,
                url: row.get(2)?,
                html: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Result of extracting one fetched page. `lesson` is None for
/// no-result pages, which are still marked processed so re-runs skip
/// them.
pub struct ExtractOutcome {
    pub page_data_id: i64,
    pub slug: String,
    pub url: String,
    pub lesson: Option<Lesson>,
}

pub fn save_outcomes(conn: &Connection, outcomes: &[ExtractOutcome]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut lesson_stmt = tx.prepare(
            "INSERT OR REPLACE INTO lessons (slug, url, title, level, sentence_count)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut clear_sent = tx.prepare("DELETE FROM sentences WHERE lesson_slug = ?1")?;
        let mut clear_gaps = tx.prepare("DELETE FROM gaps WHERE lesson_slug = ?1")?;
        let mut sent_stmt =
            tx.prepare("INSERT INTO sentences (lesson_slug, seq, text) VALUES (?1, ?2, ?3)")?;
        let mut gap_stmt = tx.prepare(
            "INSERT INTO gaps (lesson_slug, sentence_seq, gap_id, correct, options, explanation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        let mut mark_stmt = tx.prepare("UPDATE page_data SET processed = 1 WHERE id = ?1")?;

        for outcome in outcomes {
            if let Some(lesson) = &outcome.lesson {
                // Children first: REPLACE on lessons deletes the old row,
                // which must not still be referenced.
                clear_gaps.execute(rusqlite::params![lesson.id])?;
                clear_sent.execute(rusqlite::params![lesson.id])?;
                lesson_stmt.execute(rusqlite::params![
                    lesson.id,
                    outcome.url,
                    lesson.title,
                    lesson.level.as_str(),
                    lesson.sentences.len() as i64,
                ])?;
                for sentence in &lesson.sentences {
                    sent_stmt.execute(rusqlite::params![
                        lesson.id,
                        sentence.id as i64,
                        sentence.text,
                    ])?;
                    for gap in &sentence.gaps {
                        gap_stmt.execute(rusqlite::params![
                            lesson.id,
                            sentence.id as i64,
                            gap.id as i64,
                            gap.correct,
                            serde_json::to_string(&gap.options)?,
                            gap.explanation,
                        ])?;
                    }
                }
            }
            mark_stmt.execute(rusqlite::params![outcome.page_data_id])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Export ──

/// Reassemble lessons in catalog order (pages.id) for JSON export.
pub fn fetch_lessons(conn: &Connection) -> Result<Vec<Lesson>> {
    let mut lesson_stmt = conn.prepare(
        "SELECT l.slug, l.title, l.level FROM lessons l
         JOIN pages p ON p.slug = l.slug
         ORDER BY p.id",
    )?;
    let mut sent_stmt =
        conn.prepare("SELECT seq, text FROM sentences WHERE lesson_slug = ?1 ORDER BY seq")?;
    let mut gap_stmt = conn.prepare(
        "SELECT gap_id, correct, options, explanation FROM gaps
         WHERE lesson_slug = ?1 AND sentence_seq = ?2
         ORDER BY id",
    )?;

    let shells = lesson_stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut lessons = Vec::with_capacity(shells.len());
    for (slug, title, level) in shells {
        let sentence_rows = sent_stmt
            .query_map([&slug], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sentences = Vec::with_capacity(sentence_rows.len());
        for (seq, text) in sentence_rows {
            let gaps = gap_stmt
                .query_map(rusqlite::params![&slug, seq], |row| {
                    Ok(Gap {
                        id: row.get::<_, i64>(0)? as u32,
                        correct: row.get(1)?,
                        options: serde_json::from_str(&row.get::<_, String>(2)?)
                            .unwrap_or_default(),
                        explanation: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            sentences.push(Sentence {
                id: seq as u32,
                text,
                gaps,
            });
        }

        lessons.push(Lesson {
            id: slug,
            title,
            level: Level::parse(&level).unwrap_or_default(),
            sentences,
        });
    }
    Ok(lessons)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub visited: usize,
    pub unvisited: usize,
    pub fetched: usize,
    pub errors: usize,
    pub lessons: usize,
    pub skipped: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> {
        Ok(conn.query_row(sql, [], |row| row.get::<_, i64>(0))? as usize)
    };
    let total = count("SELECT COUNT(*) FROM pages")?;
    let visited = count("SELECT COUNT(*) FROM pages WHERE visited = 1")?;
    let fetched = count("SELECT COUNT(*) FROM page_data WHERE html IS NOT NULL")?;
    let errors = count("SELECT COUNT(*) FROM page_data WHERE error IS NOT NULL")?;
    let lessons = count("SELECT COUNT(*) FROM lessons")?;
    let skipped = count(
        "SELECT COUNT(*) FROM page_data
         WHERE processed = 1 AND slug NOT IN (SELECT slug FROM lessons)",
    )?;
    Ok(Stats {
        total,
        visited,
        unvisited: total - visited,
        fetched,
        errors,
        lessons,
        skipped,
    })
}

// ── Overview ──

pub struct OverviewRow {
    pub slug: String,
    pub title: String,
    pub level: String,
    pub sentence_count: i64,
    pub gap_count: i64,
}

pub fn fetch_overview(
    conn: &Connection,
    level: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let filter = match level {
        Some(_) => " WHERE l.level = ?1",
        None => "",
    };
    let sql = format!(
        "SELECT l.slug, l.title, l.level, l.sentence_count,
                (SELECT COUNT(*) FROM gaps g WHERE g.lesson_slug = l.slug)
         FROM lessons l
         JOIN pages p ON p.slug = l.slug{}
         ORDER BY p.id LIMIT {}",
        filter, limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row<'_>| {
        Ok(OverviewRow {
            slug: row.get(0)?,
            title: row.get(1)?,
            level: row.get(2)?,
            sentence_count: row.get(3)?,
            gap_count: row.get(4)?,
        })
    };
    let rows = match level {
        Some(l) => stmt.query_map([l], map_row)?.collect::<Result<Vec<_>, _>>()?,
        None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn sample_lesson(slug: &str) -> Lesson {
        Lesson {
            id: slug.to_string(),
            title: "Prepositions of Time".to_string(),
            level: Level::Intermediate,
            sentences: vec![Sentence {
                id: 0,
                text: "She arrived ____ noon.".to_string(),
                gaps: vec![Gap {
                    id: 3,
                    correct: "at".to_string(),
                    options: vec!["at".into(), "in".into(), "on".into()],
                    explanation: "x".to_string(),
                }],
            }],
        }
    }

    fn seed_page(conn: &Connection, url: &str, slug: &str, html: Option<&str>) -> i64 {
        insert_pages(conn, &[(url.to_string(), slug.to_string())]).unwrap();
        let page_id: i64 = conn
            .query_row("SELECT id FROM pages WHERE slug = ?1", [slug], |r| r.get(0))
            .unwrap();
        conn.execute(
            "INSERT INTO page_data (page_id, url, slug, html, status) VALUES (?1, ?2, ?3, ?4, 200)",
            rusqlite::params![page_id, url, slug, html],
        )
        .unwrap();
        conn.query_row("SELECT last_insert_rowid()", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn insert_pages_ignores_duplicates() {
        let conn = test_conn();
        let pages = vec![
            ("https://x.test/a.htm".to_string(), "a".to_string()),
            ("https://x.test/b.htm".to_string(), "b".to_string()),
        ];
        assert_eq!(insert_pages(&conn, &pages).unwrap(), 2);
        assert_eq!(insert_pages(&conn, &pages).unwrap(), 0);
        assert_eq!(fetch_unvisited(&conn, None).unwrap().len(), 2);
        assert_eq!(fetch_unvisited(&conn, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn lesson_store_roundtrip() {
        let conn = test_conn();
        let pd = seed_page(&conn, "https://x.test/prep001.htm", "prep001", Some("<html>"));

        let outcome = ExtractOutcome {
            page_data_id: pd,
            slug: "prep001".to_string(),
            url: "https://x.test/prep001.htm".to_string(),
            lesson: Some(sample_lesson("prep001")),
        };
        save_outcomes(&conn, &[outcome]).unwrap();

        let lessons = fetch_lessons(&conn).unwrap();
        assert_eq!(lessons.len(), 1);
        let l = &lessons[0];
        assert_eq!(l.id, "prep001");
        assert_eq!(l.level, Level::Intermediate);
        assert_eq!(l.sentences.len(), 1);
        assert_eq!(l.sentences[0].text, "She arrived ____ noon.");
        assert_eq!(l.sentences[0].gaps[0].id, 3);
        assert_eq!(
            l.sentences[0].gaps[0].options,
            vec!["at".to_string(), "in".to_string(), "on".to_string()]
        );
    }

    #[test]
    fn no_result_pages_marked_skipped() {
        let conn = test_conn();
        let ok = seed_page(&conn, "https://x.test/ok.htm", "ok", Some("<html>"));
        let empty = seed_page(&conn, "https://x.test/empty.htm", "empty", Some("<html>"));

        save_outcomes(
            &conn,
            &[
                ExtractOutcome {
                    page_data_id: ok,
                    slug: "ok".to_string(),
                    url: "https://x.test/ok.htm".to_string(),
                    lesson: Some(sample_lesson("ok")),
                },
                ExtractOutcome {
                    page_data_id: empty,
                    slug: "empty".to_string(),
                    url: "https://x.test/empty.htm".to_string(),
                    lesson: None,
                },
            ],
        )
        .unwrap();

        assert!(fetch_unprocessed(&conn, None).unwrap().is_empty());
        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.lessons, 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn export_order_follows_catalog() {
        let conn = test_conn();
        let first = seed_page(&conn, "https://x.test/first.htm", "first", Some("<html>"));
        let second = seed_page(&conn, "https://x.test/second.htm", "second", Some("<html>"));

        // Saved in reverse order; export must still follow pages.id.
        save_outcomes(
            &conn,
            &[
                ExtractOutcome {
                    page_data_id: second,
                    slug: "second".to_string(),
                    url: "https://x.test/second.htm".to_string(),
                    lesson: Some(sample_lesson("second")),
                },
                ExtractOutcome {
                    page_data_id: first,
                    slug: "first".to_string(),
                    url: "https://x.test/first.htm".to_string(),
                    lesson: Some(sample_lesson("first")),
                },
            ],
        )
        .unwrap();

        let ids: Vec<String> = fetch_lessons(&conn)
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn overview_filters_by_level() {
        let conn = test_conn();
        let pd = seed_page(&conn, "https://x.test/prep001.htm", "prep001", Some("<html>"));
        save_outcomes(
            &conn,
            &[ExtractOutcome {
                page_data_id: pd,
                slug: "prep001".to_string(),
                url: "https://x.test/prep001.htm".to_string(),
                lesson: Some(sample_lesson("prep001")),
            }],
        )
        .unwrap();

        let all = fetch_overview(&conn, None, 50).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].gap_count, 1);
        assert!(fetch_overview(&conn, Some("Advanced"), 50).unwrap().is_empty());
        assert_eq!(
            fetch_overview(&conn, Some("Intermediate"), 50).unwrap().len(),
            1
        );
    }
}
