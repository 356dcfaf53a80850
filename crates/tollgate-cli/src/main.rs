//! Command-line host adapter for the tollgate verification core.
//!
//! Reads the credential on stdin (never argv, where it would leak into
//! process listings), runs one verification attempt, prints the verdict
//! on stdout, and exits with a distinct code per outcome:
//! 0 success, 1 auth-mismatch, 2 user-unknown, 3 service-unavailable.

use std::io::Read;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tollgate::{Authenticator, HttpFetcher, HttpFetcherConfig, ModuleConfig, Outcome};

#[derive(Parser, Debug)]
#[command(
    name = "tollgate-cli",
    about = "Verify a credential against an OAuth2 tokeninfo endpoint",
    version
)]
struct Cli {
    /// Tokeninfo endpoint URL; the credential is appended verbatim, so
    /// include any query prefix (e.g. `...?access_token=`).
    #[arg(long)]
    tokeninfo_url: String,

    /// Response field that must equal the username.
    #[arg(long, default_value = "sub")]
    login_field: String,

    /// Additional claim check as key=value. Repeatable.
    #[arg(long = "check", value_name = "KEY=VALUE")]
    checks: Vec<String>,

    /// Whole-request timeout in seconds.
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Allow plaintext http:// endpoints (development only).
    #[arg(long)]
    allow_plaintext: bool,

    /// Log format (json or pretty).
    #[arg(long, env = "TOLLGATE_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Username being authenticated.
    username: String,
}

fn init_logging(format: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&cli.log_format) {
        eprintln!("error: failed to initialize logging: {err}");
        return ExitCode::from(3);
    }

    let mut args: Vec<&str> = vec![&cli.tokeninfo_url, &cli.login_field];
    args.extend(cli.checks.iter().map(String::as_str));

    let config = match ModuleConfig::from_args(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(3);
        }
    };

    let mut credential = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut credential) {
        eprintln!("error: failed to read credential from stdin: {err}");
        return ExitCode::from(3);
    }
    let credential = credential.trim_end_matches(['\r', '\n']);

    let fetcher = match HttpFetcher::new(HttpFetcherConfig {
        timeout: Duration::from_secs(cli.timeout),
        allow_plaintext: cli.allow_plaintext,
        ..Default::default()
    }) {
        Ok(fetcher) => fetcher,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(3);
        }
    };
    let authenticator = Authenticator::with_fetcher(config, fetcher);

    let outcome = authenticator.authenticate(&cli.username, credential);
    println!("{outcome}");

    match outcome {
        Outcome::Success => ExitCode::SUCCESS,
        Outcome::AuthMismatch => ExitCode::from(1),
        Outcome::UserUnknown => ExitCode::from(2),
        Outcome::ServiceUnavailable => ExitCode::from(3),
    }
}
