//! Process command - run a batch of invoice files through the pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use sheetdrop_core::pipeline::{BatchProcessor, FileOutcome, UploadedFile};
use sheetdrop_core::{MemoryStore, ProcessingStatus};

use crate::collaborators::{CsvFileSink, PopplerRenderer, TesseractEngine};
use crate::state;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// User id to process for
    #[arg(short, long)]
    user: String,

    /// Sender email the files arrived from
    #[arg(long)]
    sender: String,

    /// Input files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Target spreadsheet id (required on caller-selected tiers)
    #[arg(long)]
    spreadsheet: Option<String>,

    /// Directory holding the per-spreadsheet CSV files
    #[arg(long, default_value = "sheets")]
    sink_dir: PathBuf,

    /// Print outcomes as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Also write an outcome summary CSV
    #[arg(long)]
    summary: Option<PathBuf>,
}

pub fn run(args: ProcessArgs, state_path: &Path) -> anyhow::Result<()> {
    let start = Instant::now();

    let store = state::load(state_path)?;
    let mut user = store
        .get_user(&args.user)
        .with_context(|| format!("unknown user: {}", args.user))?;

    let files = collect_files(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("no matching files found");
    }
    info!("found {} file(s) to process", files.len());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("Processing...");

    let uploads = load_uploads(&files, &pb)?;
    pb.set_position(files.len() as u64);

    let sink = CsvFileSink::new(&args.sink_dir);
    let renderer = PopplerRenderer;
    let ocr = TesseractEngine;
    let processor = BatchProcessor::new(&store, &sink, &renderer, &ocr);
    let outcomes = processor.process_batch(
        &mut user,
        &args.sender,
        &uploads,
        args.spreadsheet.as_deref(),
    )?;
    pb.finish_with_message("Complete");

    store.put_user(&user);
    state::save(&store, state_path)?;

    if args.json {
        let values: Vec<_> = outcomes.iter().map(FileOutcome::to_json).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
    } else {
        print_summary(&outcomes);
    }

    if let Some(summary_path) = &args.summary {
        write_summary_csv(&outcomes, summary_path)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    debug!("total processing time: {:?}", start.elapsed());
    Ok(())
}

/// Expand the input patterns into a deduplicated, ordered file list.
fn collect_files(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        for entry in glob(pattern)? {
            let path = entry?;
            if path.is_file() && !files.contains(&path) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

fn load_uploads(files: &[PathBuf], pb: &ProgressBar) -> anyhow::Result<Vec<UploadedFile>> {
    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let content = fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        // Plain-text files carry their own text; everything else goes through
        // the format-specific extractors.
        let upload = if path.extension().and_then(|e| e.to_str()) == Some("txt") {
            let text = String::from_utf8_lossy(&content).into_owned();
            UploadedFile::new(name, content).with_extracted_text(text)
        } else {
            UploadedFile::new(name, content)
        };
        uploads.push(upload);
        pb.inc(1);
    }
    Ok(uploads)
}

fn print_summary(outcomes: &[FileOutcome]) {
    let mut auto = 0;
    let mut review = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for outcome in outcomes {
        match outcome {
            FileOutcome::Processed { status, .. } => {
                if *status == ProcessingStatus::AutoProcessed {
                    auto += 1;
                } else {
                    review += 1;
                }
            }
            FileOutcome::DuplicateSkipped { .. }
            | FileOutcome::InvalidRowSkipped
            | FileOutcome::NoInvoiceNumberFound => skipped += 1,
            FileOutcome::OcrFailed { .. } | FileOutcome::ParseFailed { .. } => failed += 1,
        }
    }

    println!();
    println!("{} {} auto-processed", style("✓").green(), auto);
    println!("{} {} in review", style("ℹ").blue(), review);
    if skipped > 0 {
        println!("{} {} skipped", style("⚠").yellow(), skipped);
    }
    if failed > 0 {
        println!("{} {} failed", style("✗").red(), failed);
    }
}

fn write_summary_csv(outcomes: &[FileOutcome], path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["invoice_number", "status", "confidence", "detail"])?;

    for outcome in outcomes {
        let record = match outcome {
            FileOutcome::Processed {
                invoice_number,
                status,
                confidence_score,
                sink_error,
            } => [
                invoice_number.clone(),
                status.to_string(),
                confidence_score.to_string(),
                sink_error.clone().unwrap_or_default(),
            ],
            FileOutcome::DuplicateSkipped { invoice_number } => [
                invoice_number.clone(),
                "DUPLICATE_SKIPPED".to_string(),
                String::new(),
                String::new(),
            ],
            FileOutcome::OcrFailed { file_name } => [
                String::new(),
                "OCR_FAILED".to_string(),
                String::new(),
                file_name.clone(),
            ],
            FileOutcome::ParseFailed { file_name } => [
                String::new(),
                "PARSE_FAILED".to_string(),
                String::new(),
                file_name.clone(),
            ],
            FileOutcome::InvalidRowSkipped => [
                String::new(),
                "INVALID_ROW_SKIPPED".to_string(),
                String::new(),
                String::new(),
            ],
            FileOutcome::NoInvoiceNumberFound => [
                String::new(),
                "NO_INVOICE_NUMBER_FOUND".to_string(),
                String::new(),
                String::new(),
            ],
        };
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
