//! omrgrid CLI — command-line interface for answer-sheet scanning.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use omrgrid::{render_sheet, scan, ScanConfig, SheetLayout, MAX_QUESTIONS};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "omrgrid")]
#[command(about = "Scan photographs of printed multiple-choice answer sheets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a sheet photograph and report the detected answers.
    Scan(CliScanArgs),

    /// Render a synthetic sheet image from the layout.
    Render(CliRenderArgs),

    /// Print the sheet layout as JSON.
    LayoutInfo {
        /// Path to a layout JSON file (defaults to the embedded layout).
        #[arg(long)]
        layout: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct CliScanArgs {
    /// Path to the captured photograph.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the scan report (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Path to write the annotated canonical image (PNG).
    #[arg(long)]
    annotated: Option<PathBuf>,

    /// Number of questions on the sheet (1–100).
    #[arg(long, default_value = "100")]
    questions: usize,

    /// Expected answers, one letter per question; use '-' for questions
    /// without an expected answer (e.g. "AB-D"). Affects annotation
    /// colors only.
    #[arg(long)]
    key: Option<String>,

    /// Path to a layout JSON file (defaults to the embedded layout).
    #[arg(long)]
    layout: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliRenderArgs {
    /// Path to write the sheet image (PNG).
    #[arg(long)]
    out: PathBuf,

    /// Number of questions on the sheet (1–100).
    #[arg(long, default_value = "100")]
    questions: usize,

    /// Choices to pre-fill, one letter per question; '-' leaves a
    /// question blank (e.g. "A-CD").
    #[arg(long)]
    fill: Option<String>,

    /// Path to a layout JSON file (defaults to the embedded layout).
    #[arg(long)]
    layout: Option<PathBuf>,
}

/// Parse "AB-D" style per-question letter lists; '-' and '.' mean none.
fn parse_choice_list(s: &str) -> Vec<Option<char>> {
    s.chars()
        .map(|c| match c {
            '-' | '.' => None,
            other => Some(other.to_ascii_uppercase()),
        })
        .collect()
}

fn load_layout(path: Option<&PathBuf>) -> CliResult<SheetLayout> {
    match path {
        Some(p) => SheetLayout::from_json_file(p),
        None => Ok(SheetLayout::default()),
    }
}

fn run_scan(args: &CliScanArgs) -> CliResult<()> {
    let layout = load_layout(args.layout.as_ref())?;
    let photo = image::open(&args.image)?.to_rgb8();
    let key = args.key.as_deref().map(parse_choice_list);

    let result = scan(
        &photo,
        &layout,
        args.questions.clamp(1, MAX_QUESTIONS),
        key.as_deref(),
        &ScanConfig::default(),
    )?;

    let json = serde_json::to_string_pretty(&result.report())?;
    std::fs::write(&args.out, json)?;

    if let Some(path) = &args.annotated {
        result.annotated.save(path)?;
    }

    let answered = result.answers.iter().filter(|a| a.is_some()).count();
    println!(
        "scanned {}: {} of {} questions answered",
        args.image.display(),
        answered,
        result.answers.len()
    );
    Ok(())
}

fn run_render(args: &CliRenderArgs) -> CliResult<()> {
    let layout = load_layout(args.layout.as_ref())?;
    layout.validate()?;
    let filled = args
        .fill
        .as_deref()
        .map(parse_choice_list)
        .unwrap_or_default();

    let sheet = render_sheet(&layout, args.questions.clamp(1, MAX_QUESTIONS), &filled);
    sheet.save(&args.out)?;
    println!("wrote {}", args.out.display());
    Ok(())
}

fn run_layout_info(path: Option<&PathBuf>) -> CliResult<()> {
    let layout = load_layout(path)?;
    println!("{}", layout.to_json()?);
    Ok(())
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Scan(args) => run_scan(args),
        Commands::Render(args) => run_render(args),
        Commands::LayoutInfo { layout } => run_layout_info(layout.as_ref()),
    }
}
