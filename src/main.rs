use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "quiz-sheet-extract",
    version,
    about = "Extract multiple-choice questions and their answer key from PDFs and scans"
)]
struct Cli {
    /// Documents or directories of documents (pdf/png/jpg/tiff)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write one <name>.json per document into this directory instead of stdout
    #[arg(short = 'o', long = "out-dir")]
    out_dir: Option<PathBuf>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// OCR language (tesseract code, e.g. eng)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Skip the embedded text layer and recognize rendered pages
    #[arg(long = "force-ocr")]
    force_ocr: bool,

    /// Documents processed at the same time
    #[arg(short = 'j', long = "jobs")]
    jobs: Option<usize>,

    /// Move successfully processed inputs into this directory
    #[arg(long = "processed-dir")]
    processed_dir: Option<PathBuf>,

    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    quiz_sheet_extract::logging::init(cli.verbose)?;

    let write_stdout = cli.out_dir.is_none();
    let summary = quiz_sheet_extract::run(quiz_sheet_extract::Config {
        inputs: cli.inputs,
        out_dir: cli.out_dir,
        processed_dir: cli.processed_dir,
        settings_path: cli.read_settings,
        lang: cli.lang,
        force_ocr: cli.force_ocr,
        jobs: cli.jobs,
    })
    .await?;

    if write_stdout {
        if let Some(json) = quiz_sheet_extract::format_sheets_json(&summary)? {
            println!("{}", json);
        }
    }
    for outcome in &summary.outcomes {
        if let Err(err) = &outcome.result {
            eprintln!("{}: {:#}", outcome.path.display(), err);
        }
    }
    eprintln!(
        "processed {}/{} documents",
        summary.succeeded,
        summary.total()
    );

    if summary.succeeded == 0 {
        return Err(anyhow!("no document produced questions"));
    }
    Ok(())
}
