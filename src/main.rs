use anyhow::Result;
use clap::Parser;
use problemset_dl::{run, Credentials, Error, PortalConfigBuilder};
use reqwest::Url;
use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Download the problem set of a DOMjudge contest: every statement, one
/// merged PDF, and the sample archives.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// DOMjudge URL
    url: Url,

    /// Directory to write `pdf/` and `samples/` into
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Team username; omit for anonymous access
    #[arg(short, long, env = "DOMJUDGE_USERNAME", requires = "password")]
    username: Option<String>,

    #[arg(
        short,
        long,
        env = "DOMJUDGE_PASSWORD",
        hide_env_values = true,
        requires = "username"
    )]
    password: Option<String>,

    /// Seconds to wait after each problem request
    #[arg(short, long, default_value_t = 2)]
    delay: u64,

    /// Also write a JSON summary of the run to this file
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut builder = PortalConfigBuilder::default();
    builder
        .base_url(args.url)
        .output_dir(args.output)
        .delay(Duration::from_secs(args.delay));
    if let (Some(username), Some(password)) = (args.username, args.password) {
        builder.credentials(Credentials::new(username, password));
    }
    let config = builder.build()?;

    let report = match run(&config, &mut io::stdout()).await {
        Ok(report) => report,
        Err(Error::Auth(reason)) => {
            println!("login failed: {}", reason);
            process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &args.report {
        report.save(path)?;
    }
    if !report.is_complete() {
        process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "problemset_dl=debug"
    } else {
        "problemset_dl=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
