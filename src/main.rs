mod catalog;
mod db;
mod extract;
mod fetcher;
mod index;
mod lesson;

use std::time::Instant;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cloze_scraper", about = "Cloze exercise scraper for english-grammar.at")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the page queue from the built-in exercise catalog
    Init,
    /// Fetch unvisited exercise pages
    Fetch {
        /// Max pages to fetch (default: all unvisited)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract lessons from fetched pages
    Extract {
        /// Max pages to extract (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Fetch + extract in one pipeline
    Run {
        /// Max pages to fetch+extract
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Write the lesson collection as a single JSON array
    Export {
        /// Output path
        #[arg(short, long, default_value = "data/lessons.json")]
        out: std::path::PathBuf,
    },
    /// Show scraping statistics
    Stats,
    /// Lessons overview table
    Overview {
        /// Filter by level (Elementary, Intermediate, Advanced)
        #[arg(short, long)]
        level: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = catalog::exercise_pages();
            let inserted = db::insert_pages(&conn, &pages)?;
            println!(
                "Inserted {} new exercise URLs ({} in catalog)",
                inserted,
                pages.len()
            );
            Ok(())
        }
        Commands::Fetch { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first or all pages are fetched.");
                return Ok(());
            }
            println!("Fetching {} pages (streaming to DB)...", pages.len());
            let stats = fetcher::fetch_pages_streaming(&conn, pages).await?;
            println!(
                "Done: {} fetched ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Extract { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unprocessed(&conn, limit)?;
            if pages.is_empty() {
                println!("No unprocessed pages. Run 'fetch' first.");
                return Ok(());
            }
            let levels = index::fetch_difficulty_index().await;
            println!("Extracting {} pages...", pages.len());
            let counts = process_pages(&conn, &pages, &levels)?;
            counts.print();
            Ok(())
        }
        Commands::Run { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first.");
                return Ok(());
            }

            // Phase 1: Fetch (streaming to DB)
            let t_fetch = Instant::now();
            println!("Pipeline: fetching {} pages (streaming to DB)...", pages.len());
            let stats = fetcher::fetch_pages_streaming(&conn, pages).await?;
            println!(
                "Fetched {} pages ({} ok, {} errors) in {:.1}s",
                stats.total,
                stats.ok,
                stats.errors,
                t_fetch.elapsed().as_secs_f64()
            );

            // Phase 2: Extract
            let t_extract = Instant::now();
            let unprocessed = db::fetch_unprocessed(&conn, None)?;
            if unprocessed.is_empty() {
                println!("Nothing to extract (all fetched pages had errors).");
                return Ok(());
            }
            let levels = index::fetch_difficulty_index().await;
            println!("Extracting {} pages...", unprocessed.len());
            let counts = process_pages(&conn, &unprocessed, &levels)?;
            println!("Extracted in {:.1}s", t_extract.elapsed().as_secs_f64());
            counts.print();
            Ok(())
        }
        Commands::Export { out } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let lessons = db::fetch_lessons(&conn)?;
            if lessons.is_empty() {
                println!("No lessons to export. Run 'extract' first.");
                return Ok(());
            }
            if let Some(dir) = out.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&out, serde_json::to_string_pretty(&lessons)?)?;
            println!("Saved {} lessons to {}", lessons.len(), out.display());
            Ok(())
        }
        Commands::Overview { level, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, level.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No lessons found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<24} | {:<32} | {:<12} | {:>9} | {:>4}",
                "#", "Lesson", "Title", "Level", "Sentences", "Gaps"
            );
            println!("{}", "-".repeat(100));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<24} | {:<32} | {:<12} | {:>9} | {:>4}",
                    i + 1,
                    truncate(&r.slug, 24),
                    truncate(&r.title, 32),
                    r.level,
                    r.sentence_count,
                    r.gap_count
                );
            }

            println!("\n{} lessons", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:     {}", s.total);
            println!("Visited:   {}", s.visited);
            println!("Unvisited: {}", s.unvisited);
            println!("Fetched:   {}", s.fetched);
            println!("Errors:    {}", s.errors);
            println!("Lessons:   {}", s.lessons);
            println!("Skipped:   {}", s.skipped);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ExtractCounts {
    lessons: usize,
    sentences: usize,
    gaps: usize,
    skipped: usize,
}

impl ExtractCounts {
    fn print(&self) {
        println!(
            "Saved {} lessons ({} sentences, {} gaps), {} pages skipped.",
            self.lessons, self.sentences, self.gaps, self.skipped,
        );
    }
}

fn process_pages(
    conn: &rusqlite::Connection,
    pages: &[db::FetchedPage],
    levels: &index::DifficultyIndex,
) -> anyhow::Result<ExtractCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ExtractCounts {
        lessons: 0,
        sentences: 0,
        gaps: 0,
        skipped: 0,
    };

    for chunk in pages.chunks(50) {
        let outcomes: Vec<db::ExtractOutcome> = chunk
            .par_iter()
            .map(|page| {
                let lesson = extract::extract_lesson(&page.slug, &page.html).map(|mut l| {
                    l.level = levels.lookup(&page.slug);
                    l
                });
                db::ExtractOutcome {
                    page_data_id: page.page_data_id,
                    slug: page.slug.clone(),
                    url: page.url.clone(),
                    lesson,
                }
            })
            .collect();

        for outcome in &outcomes {
            match &outcome.lesson {
                Some(lesson) => {
                    counts.lessons += 1;
                    counts.sentences += lesson.sentences.len();
                    counts.gaps += lesson.sentences.iter().map(|s| s.gaps.len()).sum::<usize>();
                }
                None => {
                    tracing::warn!("No lesson extracted from {}", outcome.slug);
                    counts.skipped += 1;
                }
            }
        }

        db::save_outcomes(conn, &outcomes)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
