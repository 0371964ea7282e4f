use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crash_extract::config::EngineConfig;
use crash_extract::output;
use crash_extract::parser::{self, lines::LineStream, pages, Extraction};

#[derive(Parser)]
#[command(name = "crash_extract", about = "Structured records from OH-1 crash report text dumps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one JSON record per document
    Extract {
        /// Text dumps (pages separated by form feeds) or directories of them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory; records are written as <stem>.json
        #[arg(short, long, default_value = "out")]
        output: PathBuf,
        /// JSON file with calibration and jurisdiction overrides
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the page type of every page
    Classify {
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show section ranges, warnings and unresolved fields for one document
    Inspect {
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            inputs,
            output: out_dir,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let paths = output::collect_inputs(&inputs)?;
            if paths.is_empty() {
                println!("No .txt documents found.");
                return Ok(());
            }
            println!("Extracting {} documents...", paths.len());
            let counts = extract_documents(&paths, &out_dir, &config)?;
            counts.print();
            Ok(())
        }
        Commands::Classify { input, config } => {
            let config = load_config(config.as_deref())?;
            let doc = output::read_document(&input)?;
            let stream = LineStream::build(&doc.source_ref, &doc.pages)?;
            for p in 0..stream.page_count() {
                let lines = stream.page_lines(p);
                let kind = pages::classify(lines, config.calibration.classify_window);
                let first = lines.first().map(|l| l.text.as_str()).unwrap_or("");
                println!("{:>3} | {:<12} | {:>4} lines | {}", p + 1, kind, lines.len(), truncate(first, 48));
            }
            Ok(())
        }
        Commands::Inspect { input, config } => {
            let config = load_config(config.as_deref())?;
            let doc = output::read_document(&input)?;
            let out = parser::process_document(&doc, &config)?;
            print_inspection(&out);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::load(p),
        None => Ok(EngineConfig::default()),
    }
}

#[derive(Default)]
struct ProcessCounts {
    ok: usize,
    failed: usize,
    vehicles: usize,
    persons: usize,
    misses: usize,
    warnings: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Extracted {} documents ({} failed): {} vehicles, {} persons, {} unresolved fields, {} warnings.",
            self.ok, self.failed, self.vehicles, self.persons, self.misses, self.warnings,
        );
    }
}

fn extract_documents(paths: &[PathBuf], out_dir: &Path, config: &EngineConfig) -> Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts::default();

    for chunk in paths.chunks(500) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|path| extract_one(path, config))
            .collect();

        for (path, result) in chunk.iter().zip(results) {
            match result {
                Ok(out) => {
                    let persons: usize = out.record.vehicles.iter().map(|v| v.persons.len()).sum();
                    counts.ok += 1;
                    counts.vehicles += out.record.vehicles.len();
                    counts.persons += persons;
                    counts.misses += out.diagnostics.misses.len();
                    counts.warnings += out.diagnostics.warnings.len();
                    let written = output::write_record(out_dir, path, &out.record)?;
                    info!(
                        "{} -> {} ({} vehicles, {} persons)",
                        path.display(),
                        written.display(),
                        out.record.vehicles.len(),
                        persons
                    );
                }
                Err(e) => {
                    error!("{}: {:#}", path.display(), e);
                    counts.failed += 1;
                }
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn extract_one(path: &Path, config: &EngineConfig) -> Result<Extraction> {
    let doc = output::read_document(path)?;
    Ok(parser::process_document(&doc, config)?)
}

fn print_inspection(out: &Extraction) {
    let types: Vec<String> = out.layout.page_types.iter().map(|t| t.to_string()).collect();
    println!("Pages:    {}", types.join(", "));

    println!("\n--- Vehicles ---");
    for s in &out.layout.vehicles {
        println!("  lines {:>4}..{:<4} anchor {:>4}", s.start, s.end, s.anchor);
    }
    for v in &out.record.vehicles {
        println!(
            "  unit {:<3} {} {} {} ({} persons)",
            v.fields.vehicle_unit,
            v.fields.vehicle_year,
            v.fields.make,
            v.fields.model,
            v.persons.len()
        );
    }

    println!("\n--- Persons ---");
    for s in &out.layout.persons {
        println!("  lines {:>4}..{:<4} anchor {:>4}", s.start, s.end, s.anchor);
    }

    if !out.diagnostics.warnings.is_empty() {
        println!("\n--- Warnings ---");
        for w in &out.diagnostics.warnings {
            println!("  {}", w);
        }
    }

    println!("\n--- Unresolved fields ({}) ---", out.diagnostics.misses.len());
    for m in &out.diagnostics.misses {
        println!("  {:<14} {:<28} {}", m.scope, m.field, m.reason);
    }
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
