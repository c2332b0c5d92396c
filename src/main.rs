use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use datepipe::app::event_loop;
use datepipe::dates::{DateInput, SystemClock};
use datepipe::util::config::AppConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "datepipe", version, about = "Live relative-time display")]
struct Cli {
    /// Date to display: RFC 3339, YYYY-MM-DD, "YYYY-MM-DD HH:MM:SS" or epoch millis
    date: String,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Locale for the output, overriding the config
    #[arg(short, long)]
    locale: Option<String>,

    /// Drop the "ago"/"in" wrapper
    #[arg(long)]
    omit_suffix: bool,

    /// Print once and exit instead of refreshing
    #[arg(long)]
    once: bool,

    /// Enable debug logging to file
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;

    // Setup logging
    let _guard = setup_logging(&config, cli.debug)?;

    info!("datepipe starting");

    let dates = config
        .date_library(Arc::new(SystemClock))
        .context("Invalid locale in config")?;
    if let Some(locale) = &cli.locale {
        dates
            .set_locale(locale)
            .with_context(|| format!("Cannot switch to locale {locale}"))?;
    }

    let input = parse_date_arg(&cli.date);
    let omit_suffix = cli.omit_suffix || config.display.omit_suffix;

    if cli.once {
        println!("{}", event_loop::render_once(dates, input, omit_suffix)?);
        return Ok(());
    }

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let renders = event_loop::run(dates, input, omit_suffix, &mut io::stdout(), shutdown).await?;
    info!(renders, "datepipe stopped");
    Ok(())
}

fn parse_date_arg(arg: &str) -> DateInput {
    match arg.trim().parse::<i64>() {
        Ok(ms) => DateInput::Millis(ms),
        Err(_) => DateInput::Text(arg.to_string()),
    }
}

fn setup_logging(
    config: &AppConfig,
    debug: bool,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    if !debug {
        return Ok(None);
    }

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "datepipe.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter("datepipe=debug")
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}
