//! CLI entry point for `phishsift`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use phishsift::config::Config;
use phishsift::dataset::{parse_data_from_mbox, DatasetOptions};
use phishsift::export;
use phishsift::extract::Assembler;
use phishsift::features::FeaturePipeline;
use phishsift::model::fields::{EmailFieldSet, LabeledFieldSet};
use phishsift::parser::eml::parse_eml;

/// Extract phishing signals and classifier features from email.
#[derive(Parser)]
#[command(name = "phishsift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the field-set of every message as JSON lines
    Parse {
        /// MBOX archive or single .eml file
        path: PathBuf,
    },
    /// Build the feature matrix and write it as CSV
    Features {
        path: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Columns to leave out (overrides the configured list)
        #[arg(long, value_delimiter = ',')]
        exclude: Option<Vec<String>>,
        /// Keep raw values instead of standardizing
        #[arg(long)]
        no_normalize: bool,
    },
    /// Print the sequence-model text input of every message
    Text { path: PathBuf },
    /// Export a labeled dataset
    Export {
        path: PathBuf,
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        #[arg(short, long)]
        output: PathBuf,
        /// Label attached to every row
        #[arg(short, long, value_enum, default_value_t = Label::Unlabeled)]
        label: Label,
    },
    /// Show signal statistics
    Stats {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Jsonl,
}

#[derive(Clone, Copy, ValueEnum)]
enum Label {
    Phishy,
    Legit,
    Unlabeled,
}

impl Label {
    fn as_option(self) -> Option<bool> {
        match self {
            Label::Phishy => Some(true),
            Label::Legit => Some(false),
            Label::Unlabeled => None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = phishsift::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Parse { path } => cmd_parse(&path, &config),
        Commands::Features {
            path,
            output,
            exclude,
            no_normalize,
        } => cmd_features(&path, output.as_deref(), exclude, no_normalize, &config),
        Commands::Text { path } => cmd_text(&path, &config),
        Commands::Export {
            path,
            format,
            output,
            label,
        } => cmd_export(&path, format, &output, label, &config),
        Commands::Stats { path, json } => cmd_stats(&path, json, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = phishsift::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "phishsift.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Assemble every message of an mbox archive or a single `.eml` file.
fn load_dataset(
    path: &Path,
    label: Option<bool>,
    config: &Config,
) -> anyhow::Result<Vec<LabeledFieldSet>> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let is_eml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"));
    if is_eml {
        let message = parse_eml(path)?;
        return Ok(vec![LabeledFieldSet {
            fields: Assembler::new().assemble(&message),
            is_phishy: label,
        }]);
    }

    let file_size = std::fs::metadata(path)?.len();
    let pb = ProgressBar::new(file_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Extracting [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let options = DatasetOptions {
        is_phishy: label,
        max_message_size: config.performance.max_message_size,
    };
    let rows = parse_data_from_mbox(
        path,
        options,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;
    pb.finish_and_clear();
    Ok(rows)
}

fn load_fields(path: &Path, config: &Config) -> anyhow::Result<Vec<EmailFieldSet>> {
    Ok(load_dataset(path, None, config)?
        .into_iter()
        .map(|row| row.fields)
        .collect())
}

fn cmd_parse(path: &Path, config: &Config) -> anyhow::Result<()> {
    let fields = load_fields(path, config)?;
    let stdout = std::io::stdout();
    export::json::write_jsonl(&fields, &mut stdout.lock())?;
    Ok(())
}

fn cmd_features(
    path: &Path,
    output: Option<&Path>,
    exclude: Option<Vec<String>>,
    no_normalize: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let mut features = config.features.clone();
    if let Some(exclude) = exclude {
        features.exclude = exclude;
    }
    if no_normalize {
        features.normalize = false;
    }
    let pipeline = FeaturePipeline::new(&features.exclude, features.normalize)?;

    let fields = load_fields(path, config)?;
    let matrix = pipeline.fit_transform(&fields)?;

    match output {
        Some(output) => {
            export::csv::export_features_csv(&matrix, None, output)?;
            println!(
                "  Wrote {} x {} feature matrix to {}",
                matrix.n_rows(),
                matrix.n_columns(),
                output.display()
            );
        }
        None => {
            let stdout = std::io::stdout();
            export::csv::write_features_csv(&matrix, None, &mut stdout.lock())?;
        }
    }
    Ok(())
}

fn cmd_text(path: &Path, config: &Config) -> anyhow::Result<()> {
    let concat = config.text_concat()?;
    let fields = load_fields(path, config)?;
    for text in concat.transform_batch(&fields)? {
        println!("{}", serde_json::to_string(&text)?);
    }
    Ok(())
}

fn cmd_export(
    path: &Path,
    format: ExportFormat,
    output: &Path,
    label: Label,
    config: &Config,
) -> anyhow::Result<()> {
    let rows = load_dataset(path, label.as_option(), config)?;
    match format {
        ExportFormat::Csv => export::csv::export_dataset_csv(&rows, output)?,
        ExportFormat::Jsonl => export::json::export_jsonl(&rows, output)?,
    }
    println!("  Exported {} message(s) to {}", rows.len(), output.display());
    Ok(())
}

/// Aggregate signal counts over a set of field-sets.
#[derive(Default, serde::Serialize)]
struct SignalStats {
    messages: usize,
    html: usize,
    javascript: usize,
    css: usize,
    with_attachments: usize,
    with_urls: usize,
    with_ips: usize,
    urls: usize,
    ips: usize,
    images: usize,
}

impl SignalStats {
    fn collect(fields: &[EmailFieldSet]) -> Self {
        let mut stats = Self {
            messages: fields.len(),
            ..Default::default()
        };
        for f in fields {
            stats.html += usize::from(f.is_html);
            stats.javascript += usize::from(f.is_javascript);
            stats.css += usize::from(f.is_css);
            stats.with_attachments += usize::from(f.attachment_count > 0);
            stats.with_urls += usize::from(f.url_count > 0);
            stats.with_ips += usize::from(f.ip_count > 0);
            stats.urls += f.url_count;
            stats.ips += f.ip_count;
            stats.images += f.image_count;
        }
        stats
    }

    fn percent(&self, n: usize) -> f64 {
        if self.messages == 0 {
            0.0
        } else {
            n as f64 / self.messages as f64 * 100.0
        }
    }
}

fn cmd_stats(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let start = Instant::now();
    let fields = load_fields(path, config)?;
    let elapsed = start.elapsed();
    let file_size = std::fs::metadata(path)?.len();
    let stats = SignalStats::collect(&fields);

    if json {
        let output = serde_json::json!({
            "file": path.to_string_lossy(),
            "file_size": file_size,
            "extraction_time_ms": elapsed.as_millis(),
            "signals": stats,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_stats_table(path, file_size, &stats, elapsed);
    }
    Ok(())
}

/// Print statistics in a human-readable table.
fn print_stats_table(
    path: &Path,
    file_size: u64,
    stats: &SignalStats,
    elapsed: std::time::Duration,
) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<20} {}", "File:", path.display());
    println!("  {:<20} {}", "File size:", format_size(file_size, BINARY));
    println!("  {:<20} {}", "Messages:", stats.messages);
    println!("  {:<20} {:.2?}", "Extraction time:", elapsed);
    println!();

    let rows = [
        ("HTML", stats.html),
        ("JavaScript", stats.javascript),
        ("CSS", stats.css),
        ("With attachments", stats.with_attachments),
        ("With URLs", stats.with_urls),
        ("With IPs", stats.with_ips),
    ];
    for (name, count) in rows {
        println!("  {:<20} {} ({:.1}%)", name, count, stats.percent(count));
    }
    println!();
    println!("  {:<20} {}", "URLs total:", stats.urls);
    println!("  {:<20} {}", "IPs total:", stats.ips);
    println!("  {:<20} {}", "Images total:", stats.images);
    println!();
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "phishsift", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
