use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bucketindex_cli::{backend, config::Settings, fanout, template};

const DEFAULT_TEMPLATE: &str = "index-src.html";
const DEFAULT_INDEX: &str = "index.html";

const USAGE_EXIT: u8 = 2;

fn print_usage() {
    eprintln!("\nUsage:");
    eprintln!("  bucketindex upload-file -i <local_file> -o <bucket_name>");
    eprintln!("  bucketindex upload-index [-i <template_file>] -o <bucket_name>\n");
}

struct CliArgs {
    input: Option<String>,
    bucket: Option<String>,
}

/// Parse `-i/--input` and `-o/--output` flag pairs. Returns None on any
/// unknown flag or a flag missing its value.
fn parse_flags(args: &[String]) -> Option<CliArgs> {
    let mut input = None;
    let mut bucket = None;
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter.next()?;
        match flag.as_str() {
            "-i" | "--input" => input = Some(value.clone()),
            "-o" | "--output" => bucket = Some(value.clone()),
            _ => return None,
        }
    }
    Some(CliArgs { input, bucket })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = match args.get(1) {
        Some(c) => c.as_str(),
        None => {
            print_usage();
            return ExitCode::from(USAGE_EXIT);
        }
    };
    let flags = match parse_flags(&args[2..]) {
        Some(f) => f,
        None => {
            print_usage();
            return ExitCode::from(USAGE_EXIT);
        }
    };
    let bucket = match flags.bucket {
        Some(b) => b,
        None => {
            print_usage();
            return ExitCode::from(USAGE_EXIT);
        }
    };

    let result = match command {
        "upload-file" => match flags.input {
            Some(input) => run_fanout(&bucket, &input).await,
            None => {
                print_usage();
                return ExitCode::from(USAGE_EXIT);
            }
        },
        "upload-index" => {
            let template_path = flags.input.unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
            match template::rewrite(Path::new(&template_path), Path::new(DEFAULT_INDEX), &bucket) {
                Ok(()) => run_fanout(&bucket, DEFAULT_INDEX).await,
                Err(e) => Err(e),
            }
        }
        _ => {
            print_usage();
            return ExitCode::from(USAGE_EXIT);
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!(error = %e, "Run aborted");
            ExitCode::from(1)
        }
    }
}

/// Returns Ok(true) when every upload succeeded.
async fn run_fanout(bucket: &str, local_file: &str) -> anyhow::Result<bool> {
    let settings = Settings::discover()?;
    let store = backend::from_settings(bucket, &settings);

    let report =
        fanout::copy_to_all_folders(store.as_ref(), local_file, &settings.ignore_prefixes).await?;

    info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        "Fan-out complete"
    );
    for key in &report.failed {
        error!(key = %key, "upload failed");
    }
    Ok(report.all_succeeded())
}
