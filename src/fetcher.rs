use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::db::FetchRow;

const CONCURRENCY: usize = 4;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const FETCH_DELAY_MS: u64 = 200;
const TIMEOUT_SECS: u64 = 30;

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// Fetch pages concurrently, saving each result to DB as it arrives.
pub async fn fetch_pages_streaming(
    conn: &Connection,
    pages: Vec<(i64, String, String)>,
) -> Result<FetchStats> {
    let client = Client::builder()
        .user_agent(concat!("cloze_scraper/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .build()?;
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total = pages.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send results, main loop saves to DB
    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchRow>(CONCURRENCY * 2);

    for (page_id, url, slug) in pages {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            tokio::time::sleep(Duration::from_millis(FETCH_DELAY_MS)).await;
            let row = fetch_with_retry(&client, page_id, &url, &slug).await;
            let _ = tx.send(row).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;

    // Prepare statements once, reuse for each row
    let mut insert_stmt = conn.prepare(
        "INSERT INTO page_data (page_id, url, slug, html, status, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    let mut update_stmt =
        conn.prepare("UPDATE pages SET visited = 1, visited_at = datetime('now') WHERE id = ?1")?;

    while let Some(row) = rx.recv().await {
        if row.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }
        save_one(&mut insert_stmt, &mut update_stmt, &row)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} pages ({} ok, {} errors)", total, ok, errors);

    Ok(FetchStats { total, ok, errors })
}

/// Save a single fetch result to DB using pre-prepared statements.
fn save_one(
    insert: &mut rusqlite::Statement,
    update: &mut rusqlite::Statement,
    row: &FetchRow,
) -> Result<()> {
    insert.execute(rusqlite::params![
        row.page_id, row.url, row.slug, row.html, row.status, row.error, row.latency_ms,
    ])?;
    update.execute(rusqlite::params![row.page_id])?;
    Ok(())
}

async fn fetch_with_retry(client: &Client, page_id: i64, url: &str, slug: &str) -> FetchRow {
    let mut attempt = 0;
    loop {
        let row = fetch_one(client, page_id, url, slug).await;

        if !is_retryable(row.status) || attempt == MAX_RETRIES {
            return row;
        }

        let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
        warn!(
            "Retryable status {:?} on {} (attempt {}/{}), backing off {:.1}s",
            row.status,
            slug,
            attempt + 1,
            MAX_RETRIES,
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}

fn is_retryable(status: Option<i32>) -> bool {
    matches!(status, Some(429 | 500 | 502 | 503))
}

async fn fetch_one(client: &Client, page_id: i64, url: &str, slug: &str) -> FetchRow {
    let start = Instant::now();
    let row = |html, status, error| FetchRow {
        page_id,
        url: url.to_string(),
        slug: slug.to_string(),
        html,
        status,
        error,
        latency_ms: Some(start.elapsed().as_millis() as i64),
    };

    match client.get(url).send().await {
        Ok(resp) => {
            let status = resp.status().as_u16() as i32;
            if !resp.status().is_success() {
                return row(None, Some(status), Some(format!("HTTP {}", status)));
            }
            match resp.text().await {
                Ok(html) => row(Some(html), Some(status), None),
                Err(e) => row(None, Some(status), Some(e.to_string())),
            }
        }
        Err(e) => row(None, None, Some(e.to_string())),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        for s in [429, 500, 502, 503] {
            assert!(is_retryable(Some(s)));
        }
        for s in [200, 301, 404, 410] {
            assert!(!is_retryable(Some(s)));
        }
        assert!(!is_retryable(None));
    }
}
