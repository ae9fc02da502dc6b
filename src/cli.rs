//! Command-line interface for larasmell.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use crate::config::{self, ScanConfig};
use crate::detect::Runner;
use crate::report;
use crate::score;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default config file names to search for.
const DEFAULT_CONFIG_NAMES: &[&str] = &["larasmell.yaml", ".larasmell.yaml"];

/// Laravel code smell detector.
///
/// Larasmell walks the AST of a Laravel codebase and flags maintainability
/// smells: query results filtered in PHP, silently swallowed exceptions,
/// business logic in route files, hardcoded filesystem paths, ambiguous
/// find() usage, and relationships lazy loaded inside loops.
#[derive(Parser)]
#[command(name = "larasmell")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a Laravel project for code smells
    #[command(visible_alias = "check")]
    Scan(ScanArgs),
    /// Create a new larasmell config from a template
    Init(InitArgs),
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Path to scan (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Maximum acceptable smell score (exit non-zero if exceeded)
    #[arg(short, long)]
    pub threshold: Option<i32>,

    /// Show suppressed issues in output
    #[arg(long)]
    pub show_suppressed: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "larasmell.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "laravel")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available config templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

static TEMPLATES: &[Template] = &[
    Template {
        name: "laravel",
        description: "Standard Laravel layout with default rule settings",
        content: include_str!("templates/laravel.yaml"),
    },
    Template {
        name: "strict",
        description: "Lower thresholds and no whitelists - for new projects",
        content: include_str!("templates/strict.yaml"),
    },
];

/// Discover a config file in the current directory.
fn discover_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Collect PHP files to scan.
fn collect_files(root: &Path, config: &ScanConfig) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            if e.file_type().is_dir() {
                // Skip hidden and dependency/runtime directories.
                if name.starts_with('.') && name.len() > 1 {
                    return false;
                }
                if matches!(
                    name.as_ref(),
                    "vendor" | "node_modules" | "storage" | "bootstrap" | "tests" | "public"
                ) {
                    return false;
                }
            }
            true
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("php") {
            continue;
        }
        // Blade templates are mostly markup; the rules work on plain PHP.
        if path.to_string_lossy().ends_with(".blade.php") {
            continue;
        }
        if config.is_path_excluded(path) {
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    // Discover and load config; a missing config falls back to defaults.
    let (scan_config, config_path) = match &args.config {
        Some(p) => (ScanConfig::parse_file(p)?, p.to_string_lossy().to_string()),
        None => match discover_config() {
            Some(p) => (ScanConfig::parse_file(&p)?, p.to_string_lossy().to_string()),
            None => (ScanConfig::default(), "(defaults)".to_string()),
        },
    };

    if let Err(e) = config::validate(&scan_config) {
        eprintln!("Error: invalid config: {}", e);
        return Ok(EXIT_ERROR);
    }

    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let metadata = std::fs::metadata(&abs_path)?;
    let (base_dir, files) = if metadata.is_dir() {
        (abs_path.clone(), collect_files(&abs_path, &scan_config)?)
    } else {
        let base = abs_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| abs_path.clone());
        (base, vec![abs_path.clone()])
    };

    if files.is_empty() {
        eprintln!("Warning: no PHP files to scan");
        return Ok(EXIT_SUCCESS);
    }

    let spinner = if args.format == "pretty" && files.len() > 25 {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("scanning {} files", files.len()));
        bar.enable_steady_tick(Duration::from_millis(120));
        Some(bar)
    } else {
        None
    };

    let runner = Runner::new(&base_dir, scan_config.clone());
    let result = runner.run(&files)?;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let threshold = args
        .threshold
        .or(scan_config.threshold)
        .unwrap_or(score::DEFAULT_THRESHOLD);
    let smell_score = score::calculate(&result, threshold);

    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&path_str, &config_path, &result, &smell_score)?,
        _ => report::write_pretty(&path_str, &result, &smell_score, args.show_suppressed),
    }

    if smell_score.passed {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        return list_templates();
    }

    let template = match TEMPLATES.iter().find(|t| t.name == args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'larasmell init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };

    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&args.output, template.content)?;

    println!(
        "Created {} from template '{}'",
        args.output.display(),
        template.name
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your project layout", args.output.display());
    println!("  2. Run: larasmell scan . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

/// List available templates.
fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let name = if template.name == "laravel" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<20} {}", name, template.description);
    }

    println!();
    println!("Usage:");
    println!("  larasmell init --template <name>");

    Ok(EXIT_SUCCESS)
}
