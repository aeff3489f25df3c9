use std::fs;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use refstash::config::{ConfigLoader, ResolvedConfig};
use refstash::error::RefstashError;
use refstash::fetch::{BatchResult, FetchOptions, FetchOrchestrator};
use refstash::output::{JsonOutput, OutputMode, TracingSink};
use refstash::parser::RecordParser;
use refstash::sources::SourceRegistry;
use refstash::stage::Stager;

#[derive(Parser)]
#[command(name = "refstash")]
#[command(about = "Fetch and parse bibliographic references from known online sources")]
#[command(version, author)]
struct Cli {
    /// Path to a refstash.json config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print machine-readable JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch metadata and documents for one or more URLs")]
    Fetch(FetchArgs),
    #[command(about = "Parse a bibliographic record file")]
    Parse(ParseArgs),
    #[command(about = "Show which source handles a URL")]
    Match(MatchArgs),
    #[command(about = "List configured sources in match order")]
    Sources,
}

#[derive(Args)]
struct FetchArgs {
    #[arg(required = true)]
    urls: Vec<String>,

    /// Treat URLs without a matching source as failures
    #[arg(long)]
    strict: bool,

    #[arg(long)]
    staging_dir: Option<String>,
}

#[derive(Args)]
struct ParseArgs {
    file: String,

    /// Print the canonical record text instead of JSON
    #[arg(long)]
    bibtex: bool,
}

#[derive(Args)]
struct MatchArgs {
    url: String,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<RefstashError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &RefstashError) -> u8 {
    match error {
        RefstashError::MalformedRecord(_) | RefstashError::UnsupportedSource(_) => 2,
        RefstashError::SourceHttp(_) | RefstashError::SourceStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch(args) => run_fetch(args, config, output_mode),
        Commands::Parse(args) => run_parse(args, output_mode),
        Commands::Match(args) => run_match(args, config, output_mode),
        Commands::Sources => run_sources(config, output_mode),
    }
}

fn run_fetch(
    args: FetchArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let registry = SourceRegistry::from_config(&config)?;
    let staging_dir = args
        .staging_dir
        .map(Utf8PathBuf::from)
        .or(config.staging_dir.clone());
    let stager = match staging_dir {
        Some(root) => Stager::new_with_root(root),
        None => Stager::new()?,
    };
    let orchestrator = FetchOrchestrator::new(registry, stager);
    let options = FetchOptions {
        require_match: args.strict,
    };

    let result = orchestrator.fetch_all(&args.urls, &options, &TracingSink);
    match output_mode {
        OutputMode::Json => JsonOutput::print_batch(&result).into_diagnostic()?,
        OutputMode::Human => print_fetch_summary(&result),
    }

    if result.failed() > 0 {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_parse(args: ParseArgs, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let text = fs::read_to_string(&args.file)
        .map_err(|err| RefstashError::Filesystem(format!("read {}: {err}", args.file)))?;
    let record = RecordParser::parse(&text)?;

    if args.bibtex {
        println!("{record}");
        return Ok(ExitCode::SUCCESS);
    }
    match output_mode {
        OutputMode::Json => JsonOutput::print_record(&record).into_diagnostic()?,
        OutputMode::Human => {
            println!("{} {}", record.entry_type(), record.reference_key());
            if !record.has_recognized_type() {
                println!("  (unrecognized entry type)");
            }
            for (key, value) in record.fields().iter() {
                println!("  {key}: {value}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_match(
    args: MatchArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let registry = SourceRegistry::from_config(&config)?;
    let handle = registry.resolve(&args.url);
    let source = handle.as_ref().map(|handle| handle.source());
    match output_mode {
        OutputMode::Json => JsonOutput::print_match(&args.url, source).into_diagnostic()?,
        OutputMode::Human => match source {
            Some(source) => println!("{source}"),
            None => println!("no source handles {}", args.url),
        },
    }
    Ok(if source.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn run_sources(config: ResolvedConfig, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let registry = SourceRegistry::from_config(&config)?;
    let names = registry.names();
    match output_mode {
        OutputMode::Json => JsonOutput::print_sources(&names).into_diagnostic()?,
        OutputMode::Human => {
            for (idx, name) in names.iter().enumerate() {
                println!("{}. {name}", idx + 1);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_fetch_summary(result: &BatchResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}refstash summary{reset}");
    println!("{green}fetched: {}{reset}", result.succeeded());
    println!("{red}failed: {}{reset}", result.failed());

    for item in &result.items {
        match (&item.result, &item.error) {
            (Some(fetched), _) => {
                let source = fetched.source.as_deref().unwrap_or("none");
                println!("{cyan}{} ({source}){reset}", item.url);
                if let Some(record) = &fetched.record {
                    println!(
                        "{green}   record: @{}{{{}}}{reset}",
                        record.entry_type(),
                        record.reference_key()
                    );
                    if let Some(title) = record.field("title") {
                        println!("{green}   title: {title}{reset}");
                    }
                }
                if let Some(path) = fetched.staged_document_path() {
                    println!("{green}   document: {path}{reset}");
                }
                for warning in &fetched.warnings {
                    println!("{yellow}   warning: {warning}{reset}");
                }
            }
            (None, Some(error)) => println!("{red}{}: {error}{reset}", item.url),
            (None, None) => {}
        }
    }
}
