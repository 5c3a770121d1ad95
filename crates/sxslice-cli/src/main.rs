use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use sxslice_core::{
    CommandDecoder, DeltaDecoder, ExtractReport, ResolveError, Resolver, UnsupportedDecoder,
};

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;
const EXIT_MANIFEST_ERROR: u8 = 2;
const EXIT_VERIFY_ERROR: u8 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "sxslice",
    version,
    about = "Extract a self-contained slice of a component servicing store"
)]
struct Cli {
    /// Root package manifest (.mum) to resolve from; its .cat catalog must
    /// sit alongside it.
    source_mum: PathBuf,

    /// Destination directory, created if absent.
    destination: PathBuf,

    /// External delta decoder for packed manifests, invoked as
    /// `<decoder> <packed> <output> [template]`.
    #[arg(long)]
    delta_decoder: Option<PathBuf>,

    /// Reference template file passed to the delta decoder.
    #[arg(long, requires = "delta_decoder")]
    delta_template: Option<PathBuf>,

    /// Output the final report as structured JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false)]
    trace: bool,
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SXSLICE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let decoder: Box<dyn DeltaDecoder> = match cli.delta_decoder {
        Some(program) => {
            let mut decoder = CommandDecoder::new(program);
            if let Some(template) = cli.delta_template {
                decoder = decoder.with_template(template);
            }
            Box::new(decoder)
        }
        None => Box::new(UnsupportedDecoder),
    };

    match Resolver::new(&cli.destination, decoder).extract(&cli.source_mum) {
        Ok(report) => print_report(&report, cli.json),
        Err(e) => {
            eprintln!("error: {e}");
            let code = match e {
                ResolveError::Manifest { .. } => EXIT_MANIFEST_ERROR,
                ResolveError::IdentityMismatch { .. } => EXIT_VERIFY_ERROR,
                _ => EXIT_FAILURE,
            };
            ExitCode::from(code)
        }
    }
}

fn print_report(report: &ExtractReport, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: JSON serialization failed: {e}");
                return ExitCode::from(EXIT_FAILURE);
            }
        }
    } else {
        println!(
            "extracted {} packages and {} assemblies ({} already present)",
            report.packages_copied, report.assemblies_copied, report.skipped_existing
        );
        for name in &report.missing_sources {
            println!("  MISSING {name}");
        }
    }
    ExitCode::from(EXIT_SUCCESS)
}
