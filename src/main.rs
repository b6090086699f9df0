mod delivery;
mod extractor;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use scraper::Html;
use tracing::{info, warn};

use delivery::{deliver_or_print, ClipboardSink, FileSink, Sink, StdoutSink};
use extractor::{
    ExtractOptions, ExtractOutcome, ScanStats, DEFAULT_FALLBACK_MAX, DEFAULT_FALLBACK_MIN,
    DEFAULT_MIN_CHARS, SENTINEL,
};

#[derive(Parser)]
#[command(
    name = "tjdft_scraper",
    about = "Extract case records from saved TJDFT result pages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull case records out of one or more result-page snapshots
    Extract {
        /// Saved HTML pages, in the order they were captured ("-" reads stdin)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        out: OutputArgs,
        /// Minimum record length in characters
        #[arg(long, default_value_t = DEFAULT_MIN_CHARS)]
        min_chars: usize,
        /// Lower length bound for the anchor-text fallback scan (exclusive)
        #[arg(long, default_value_t = DEFAULT_FALLBACK_MIN)]
        fallback_min: usize,
        /// Upper length bound for the anchor-text fallback scan (exclusive)
        #[arg(long, default_value_t = DEFAULT_FALLBACK_MAX)]
        fallback_max: usize,
        /// Separator written between records
        #[arg(long, default_value = SENTINEL, hide_default_value = true)]
        separator: String,
        /// CSS selector to try before the built-in list (repeatable)
        #[arg(long = "selector", value_name = "SELECTOR")]
        selectors: Vec<String>,
    },
    /// Copy the whole page text verbatim, skipping the heuristics
    Dump {
        /// Saved HTML page ("-" reads stdin)
        file: PathBuf,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Inspect a collection file built from previous runs
    Stats {
        /// Accumulated output file
        file: PathBuf,
        /// Separator the file was written with
        #[arg(long, default_value = SENTINEL, hide_default_value = true)]
        separator: String,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Write to a file instead of the clipboard
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Append to the output file instead of overwriting it
    #[arg(long, requires = "output")]
    append: bool,
    /// Print to stdout instead of the clipboard
    #[arg(long, conflicts_with_all = ["output", "append"])]
    print: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            files,
            out,
            min_chars,
            fallback_min,
            fallback_max,
            separator,
            selectors,
        } => {
            let opts = ExtractOptions {
                min_chars,
                fallback_min,
                fallback_max,
                extra_selectors: selectors,
            };
            run_extract(&files, &out, &opts, &separator)
        }
        Commands::Dump { file, out } => run_dump(&file, &out),
        Commands::Stats { file, separator } => run_stats(&file, &separator),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn run_extract(
    files: &[PathBuf],
    out: &OutputArgs,
    opts: &ExtractOptions,
    separator: &str,
) -> Result<()> {
    let pages = load_pages(files)?;
    let outcomes = extract_pages(&pages, opts)?;

    let mut chunks: Vec<String> = Vec::new();
    let mut totals = ScanStats::default();
    let mut pages_with_records = 0usize;

    for (label, outcome) in outcomes {
        match outcome {
            ExtractOutcome::Records {
                chunks: page_chunks,
                source,
                stats,
            } => {
                info!(page = label.as_str(), records = page_chunks.len(), %source, "extracted");
                totals.absorb(&stats);
                pages_with_records += 1;
                chunks.extend(page_chunks);
            }
            ExtractOutcome::NoCandidates => {
                warn!(page = label.as_str(), "no result elements found");
            }
            ExtractOutcome::NoneRelevant { stats } => {
                warn!(page = label.as_str(), analyzed = stats.analyzed, "no relevant results");
                totals.absorb(&stats);
            }
        }
    }

    if chunks.is_empty() {
        if totals.analyzed == 0 {
            println!("No results found.");
            println!(
                "Make sure each results page finished loading before it was saved, then capture it again."
            );
        } else {
            println!(
                "No relevant results in {} candidate elements.",
                totals.analyzed
            );
            println!(
                "Try `tjdft_scraper dump <page.html>` to capture the whole page text instead."
            );
        }
        return Ok(());
    }

    let blob = extractor::join_chunks(&chunks, separator);
    let delivered = deliver_blob(&blob, out, Some(separator))?;

    println!(
        "Extracted {} records from {} of {} pages ({} analyzed, {} rejected, {} skipped).",
        chunks.len(),
        pages_with_records,
        pages.len(),
        totals.analyzed,
        totals.rejected,
        totals.skipped,
    );
    match delivered {
        Delivered::Clipboard => {
            println!("{} records copied to the clipboard.", chunks.len());
            println!("Paste at the end of your collection file, then run again on the next page.");
        }
        Delivered::File { path, appended } => {
            let verb = if appended { "Appended" } else { "Wrote" };
            println!("{} {} records to {}.", verb, chunks.len(), path.display());
        }
        Delivered::Printed | Delivered::FallbackPrinted => {}
    }

    Ok(())
}

fn run_dump(file: &Path, out: &OutputArgs) -> Result<()> {
    let (label, html) = read_input(file)?;
    let doc = Html::parse_document(&html);
    let text = extractor::text::rendered_text(page_body(&doc));

    if text.is_empty() {
        println!("No visible text in {}.", label);
        return Ok(());
    }

    let delivered = deliver_blob(&text, out, None)?;
    match delivered {
        Delivered::Clipboard => {
            println!(
                "{} characters copied to the clipboard from {}.",
                text.chars().count(),
                label
            );
        }
        Delivered::File { path, appended } => {
            let verb = if appended { "Appended" } else { "Wrote" };
            println!(
                "{} {} characters from {} to {}.",
                verb,
                text.chars().count(),
                label,
                path.display()
            );
        }
        Delivered::Printed | Delivered::FallbackPrinted => {}
    }

    Ok(())
}

fn page_body(doc: &Html) -> scraper::ElementRef<'_> {
    static BODY: std::sync::LazyLock<scraper::Selector> =
        std::sync::LazyLock::new(|| scraper::Selector::parse("body").unwrap());
    doc.select(&BODY).next().unwrap_or_else(|| doc.root_element())
}

fn run_stats(file: &Path, separator: &str) -> Result<()> {
    let blob = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    if blob.trim().is_empty() {
        println!("Empty collection file.");
        return Ok(());
    }

    let chunks: Vec<&str> = blob.split(separator).collect();
    let with_case_number = chunks
        .iter()
        .filter(|c| extractor::filter::has_case_number(c))
        .count();
    let total_chars: usize = chunks.iter().map(|c| c.chars().count()).sum();

    println!("Records:          {}", chunks.len());
    println!("With case number: {}", with_case_number);
    println!("Total chars:      {}", total_chars);
    println!("Mean length:      {}", total_chars / chunks.len());
    Ok(())
}

enum Delivered {
    Clipboard,
    Printed,
    FallbackPrinted,
    File { path: PathBuf, appended: bool },
}

/// Route the blob to the requested target. Appends get the separator
/// written first when the file already has content, so records stay
/// split across runs. Clipboard failure falls back to printing, once.
fn deliver_blob(blob: &str, out: &OutputArgs, separator: Option<&str>) -> Result<Delivered> {
    if let Some(path) = &out.output {
        let has_content =
            out.append && fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
        let mut sink = FileSink {
            path: path.clone(),
            append: out.append,
        };
        match (has_content, separator) {
            (true, Some(sep)) => sink.deliver(&format!("{}{}", sep, blob))?,
            _ => sink.deliver(blob)?,
        }
        return Ok(Delivered::File {
            path: path.clone(),
            appended: out.append,
        });
    }

    if out.print {
        StdoutSink.deliver(blob)?;
        return Ok(Delivered::Printed);
    }

    if deliver_or_print(&mut ClipboardSink, blob) {
        Ok(Delivered::Clipboard)
    } else {
        Ok(Delivered::FallbackPrinted)
    }
}

fn load_pages(files: &[PathBuf]) -> Result<Vec<(String, String)>> {
    let mut pages = Vec::new();
    let mut errors = 0usize;
    for file in files {
        match read_input(file) {
            Ok(page) => pages.push(page),
            Err(e) => {
                warn!("{:#}", e);
                errors += 1;
            }
        }
    }
    if pages.is_empty() {
        bail!("none of the {} input files could be read", files.len());
    }
    if errors > 0 {
        println!("Skipped {} unreadable files.", errors);
    }
    Ok(pages)
}

fn read_input(file: &Path) -> Result<(String, String)> {
    if file.as_os_str() == "-" {
        let html = std::io::read_to_string(std::io::stdin()).context("reading stdin")?;
        return Ok(("stdin".to_string(), html));
    }
    let html = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    Ok((file.display().to_string(), html))
}

/// Parse and extract each page on its own thread; parsing dominates the
/// cost on big snapshots. Results come back in input order.
fn extract_pages(
    pages: &[(String, String)],
    opts: &ExtractOptions,
) -> Result<Vec<(String, ExtractOutcome)>> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = if pages.len() > 1 {
        let pb = ProgressBar::new(pages.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len}")?
                .progress_chars("=> "),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let outcomes = pages
        .par_iter()
        .map(|(label, html)| {
            let doc = Html::parse_document(html);
            let outcome = extractor::extract_records(&doc, opts)?;
            pb.inc(1);
            Ok((label.clone(), outcome))
        })
        .collect::<Result<Vec<_>>>();

    pb.finish_and_clear();
    outcomes
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
