//! CLI entry point for `mail-downloader`.

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;

use mail_downloader::config::{default_config_path, parse_date};
use mail_downloader::logging::level_for_verbosity;
use mail_downloader::pipeline::{download, BarProgress, NoopProgress, ProgressReporter};
use mail_downloader::{init_logging, load_config, Config, ConfigOverrides, LogFormat, RunReport};

#[derive(Parser)]
#[command(name = "mail-downloader", version, about)]
struct Cli {
    /// Config file (defaults to ./config.yml, then the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// IMAP server host
    #[arg(long)]
    server: Option<String>,

    /// IMAP server port
    #[arg(long)]
    port: Option<u16>,

    /// Login name, also the top-level output directory
    #[arg(short, long)]
    username: Option<String>,

    #[arg(short, long, env = "MAIL_DOWNLOADER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Mailbox to read from
    #[arg(short, long)]
    mailbox: Option<String>,

    /// First day of the range (YYYY-MM-DD, inclusive)
    #[arg(long, value_parser = parse_date_arg)]
    from: Option<NaiveDate>,

    /// End of the range (YYYY-MM-DD, exclusive)
    #[arg(long, value_parser = parse_date_arg)]
    to: Option<NaiveDate>,

    /// Output root directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            server: self.server.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            mailbox: self.mailbox.clone(),
            from: self.from,
            to: self.to,
            output: self.output.clone(),
        }
    }
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(level_for_verbosity(cli.verbose), cli.log_format)
        .context("Failed to set up logging")?;

    let config = resolve_config(&cli)?;

    let progress: Box<dyn ProgressReporter> = if cli.no_progress {
        Box::new(NoopProgress)
    } else {
        Box::new(BarProgress::new())
    };

    let report = download(&config, progress.as_ref())
        .await
        .context("Download failed")?;

    print_report(&report);
    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = cli.config.clone().or_else(default_config_path);

    let mut config = match &path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration");
            load_config(path)?
        }
        None => Config::default(),
    };

    config.apply_overrides(cli.overrides());
    Ok(config)
}

fn print_report(report: &RunReport) {
    if report.has_pdf_errors() {
        println!("Could not render {} message(s):", report.pdf_errors.len());
        for error in &report.pdf_errors {
            println!();
            println!("{}", error);
        }
        println!();
    }
    println!("{}", report.summary());
}
