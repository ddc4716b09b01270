//! Laytime - Statement of Facts extraction CLI
//!
//! The `laytime` command turns SoF text exports into a reconciled event
//! timeline.
//!
//! ## Commands
//!
//! - `extract`: Extract events and print the extraction as JSON
//! - `timeline`: Extract events and print a markdown timeline
//! - `verify`: Check a stored extraction artifact against its digest
//! - `config`: Print the effective engine configuration as TOML

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use laytime_core::config::CONFIG_ENV;
use laytime_core::domain::timefmt::parse_lenient;
use laytime_core::{
    content_type_for_path, read_extraction_artifact, render_timeline_md,
    write_extraction_artifact, Capability, DocumentExtraction, Engine, EngineConfig, FixedClock,
    PlainTextProvider, ProcessCollaborator,
};

#[derive(Parser)]
#[command(name = "laytime")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Statement of Facts event extraction", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract events from a document and print the result as JSON
    Extract {
        /// Document to read
        file: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also store a digest-checked artifact in this directory
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,

        /// Artifact file stem (default: the document's file stem)
        #[arg(long)]
        stem: Option<String>,
    },

    /// Extract events and print a markdown timeline
    Timeline {
        /// Document to read
        file: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Verify a stored extraction artifact
    Verify {
        /// Directory holding the artifact
        dir: PathBuf,

        /// Artifact file stem
        stem: String,
    },

    /// Print the effective engine configuration
    Config {
        /// Engine config file (TOML)
        #[arg(long, env = CONFIG_ENV)]
        config: Option<PathBuf>,
    },
}

/// Options shared by the commands that run the engine.
#[derive(Args, Debug, Default, Clone)]
struct EngineArgs {
    /// Engine config file (TOML)
    #[arg(long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Content type of the document (default: guessed from the extension)
    #[arg(long)]
    content_type: Option<String>,

    /// Fixed "now" for reproducible output, e.g. "2024-01-20 12:00:00"
    #[arg(long)]
    now: Option<String>,

    /// External augmentation helper, run once per request
    #[arg(long, env = "LAYTIME_AUGMENT_CMD")]
    augment_cmd: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    laytime_core::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Extract {
            file,
            engine,
            output,
            artifacts_dir,
            stem,
        } => {
            cmd_extract(
                &file,
                &engine,
                output.as_deref(),
                artifacts_dir.as_deref(),
                stem.as_deref(),
            )
            .await
        }
        Commands::Timeline { file, engine } => cmd_timeline(&file, &engine).await,
        Commands::Verify { dir, stem } => cmd_verify(&dir, &stem),
        Commands::Config { config } => cmd_config(config.as_deref()),
    };

    if cli.verbose {
        laytime_core::METRICS.flush();
    }
    result
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load engine config: {:?}", path)),
        None => Ok(EngineConfig::default()),
    }
}

fn build_engine(args: &EngineArgs) -> Result<Engine> {
    let mut engine = Engine::new(load_config(args.config.as_deref())?);

    if let Some(raw) = args.now.as_deref() {
        let now = parse_lenient(raw)
            .with_context(|| format!("Invalid --now timestamp: {raw:?}"))?;
        engine = engine.with_clock(FixedClock(now));
    }

    if let Some(command) = args.augment_cmd.as_deref() {
        let collaborator = ProcessCollaborator::from_command_line(command)
            .context("--augment-cmd must not be empty")?;
        engine = engine.with_capability(Capability::augmented(collaborator));
    }
    Ok(engine)
}

async fn run_extraction(file: &Path, args: &EngineArgs) -> Result<DocumentExtraction> {
    let engine = build_engine(args)?;
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read document: {:?}", file))?;
    let content_type = args
        .content_type
        .as_deref()
        .unwrap_or_else(|| content_type_for_path(file));
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    engine
        .extract_document(&PlainTextProvider, &bytes, content_type, &filename)
        .await
        .with_context(|| format!("Failed to extract events from {:?}", file))
}

/// Extract events and print or store the JSON
async fn cmd_extract(
    file: &Path,
    args: &EngineArgs,
    output: Option<&Path>,
    artifacts_dir: Option<&Path>,
    stem: Option<&str>,
) -> Result<()> {
    let extraction = run_extraction(file, args).await?;
    let json = serde_json::to_string_pretty(&extraction)?;

    if let Some(dir) = artifacts_dir {
        let stem = stem
            .map(str::to_string)
            .or_else(|| file.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "extraction".to_string());
        let path = write_extraction_artifact(dir, &stem, &extraction)
            .with_context(|| format!("Failed to write artifact to {:?}", dir))?;
        info!(path = %path.display(), "extraction artifact stored");
    }

    if let Some(path) = output {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write extraction to {:?}", path))?;
        println!(
            "Extracted {} events from {} to {:?}",
            extraction.total_events, extraction.extracted_from, path
        );
    } else {
        println!("{json}");
    }
    Ok(())
}

/// Extract events and print the markdown timeline
async fn cmd_timeline(file: &Path, args: &EngineArgs) -> Result<()> {
    let extraction = run_extraction(file, args).await?;
    print!("{}", render_timeline_md(&extraction));
    Ok(())
}

/// Check a stored artifact and print its summary
fn cmd_verify(dir: &Path, stem: &str) -> Result<()> {
    let extraction = read_extraction_artifact(dir, stem)
        .with_context(|| format!("Artifact {stem} in {:?} failed verification", dir))?;
    println!(
        "Verified {}: {} events, {} anomalies, total laytime {}",
        stem,
        extraction.total_events,
        extraction.anomaly_count(),
        extraction.total_laytime
    );
    Ok(())
}

/// Print the effective configuration
fn cmd_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use laytime_core::{ExtractionMethod, LaytimeBasis};

    const SOF: &str = "Vessel Name: MV Ocean Trader\n\
        10 Jan 2024 08:30 - Vessel arrived at port limits\n\
        10 Jan 2024 11:00 - Vessel berthed\n";

    fn fixed_now() -> EngineArgs {
        EngineArgs {
            now: Some("2024-01-20 12:00:00".to_string()),
            ..EngineArgs::default()
        }
    }

    #[test]
    fn cli_parses_extract_flags() {
        let cli = Cli::try_parse_from([
            "laytime",
            "--json",
            "extract",
            "sof.txt",
            "--now",
            "2024-01-20 12:00:00",
            "--artifacts-dir",
            "out",
        ])
        .expect("parse");
        assert!(cli.json);
        match cli.command {
            Commands::Extract {
                file,
                engine,
                artifacts_dir,
                ..
            } => {
                assert_eq!(file, PathBuf::from("sof.txt"));
                assert_eq!(engine.now.as_deref(), Some("2024-01-20 12:00:00"));
                assert_eq!(artifacts_dir, Some(PathBuf::from("out")));
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn invalid_now_is_rejected() {
        let args = EngineArgs {
            now: Some("yesterday".to_string()),
            ..EngineArgs::default()
        };
        let err = build_engine(&args).expect_err("bad timestamp");
        assert!(err.to_string().contains("--now"));
    }

    #[test]
    fn augment_cmd_enables_collaborator() {
        let args = EngineArgs {
            augment_cmd: Some("sof-helper --json".to_string()),
            ..EngineArgs::default()
        };
        let engine = build_engine(&args).expect("engine");
        assert!(engine.capability().is_augmented());
        assert!(!build_engine(&EngineArgs::default())
            .expect("engine")
            .capability()
            .is_augmented());
    }

    #[test]
    fn config_file_is_applied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("laytime.toml");
        std::fs::write(&path, "laytime_basis = \"all_events\"\n").expect("write config");
        let args = EngineArgs {
            config: Some(path),
            ..EngineArgs::default()
        };
        let engine = build_engine(&args).expect("engine");
        assert_eq!(engine.config().laytime_basis, LaytimeBasis::AllEvents);
    }

    #[tokio::test]
    async fn extract_reads_file_and_stores_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = dir.path().join("ocean-trader.txt");
        std::fs::write(&doc, SOF).expect("write sof");
        let artifacts = dir.path().join("artifacts");
        let output = dir.path().join("out.json");

        cmd_extract(&doc, &fixed_now(), Some(&output), Some(&artifacts), None)
            .await
            .expect("extract");

        let written: DocumentExtraction =
            serde_json::from_slice(&std::fs::read(&output).expect("read output"))
                .expect("valid json");
        assert_eq!(written.total_events, 2);
        assert_eq!(written.extracted_from, "ocean-trader.txt");
        assert_eq!(written.extraction_method, ExtractionMethod::RuleBased);

        cmd_verify(&artifacts, "ocean-trader").expect("artifact verifies");
    }

    #[tokio::test]
    async fn unsupported_content_type_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = dir.path().join("sof.pdf");
        std::fs::write(&doc, b"%PDF-1.7").expect("write pdf");
        let err = run_extraction(&doc, &fixed_now())
            .await
            .expect_err("pdf unsupported");
        assert!(format!("{err:#}").contains("unsupported format"));
    }

    #[test]
    fn verify_rejects_missing_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(cmd_verify(dir.path(), "missing").is_err());
    }
}
