use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use recap_common::{RecapPeriod, ThemeStyle, DEFAULT_THEME_KEY};
use recap_core::{
    CardDataSource, ChallengeCard, Config, HttpAdapter, NotificationCard, RecapApi, RecapCard, RecapSession,
    Services, ShareOrchestrator, StubClient, ThemeTable, Toaster,
};
use recap_protocol::ToastLevel;

#[derive(Parser)]
#[command(name = "recap")]
#[command(about = "Browse a PlatPursuit monthly recap and export its share card")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Step through a recap in the terminal
    View {
        year: i32,
        month: u32,
        /// Skip count-ups, entrance effects and confetti
        #[arg(long)]
        reduced_motion: bool,
        /// Serve a canned recap instead of calling the backend
        #[arg(long)]
        offline: bool,
    },
    /// Save the recap share card as a PNG
    Download {
        year: i32,
        month: u32,
        #[arg(long, default_value = DEFAULT_THEME_KEY)]
        theme: String,
        #[arg(long)]
        offline: bool,
    },
    /// Save a platinum or challenge share card as a PNG
    Share {
        #[arg(value_enum)]
        kind: CardKind,
        id: u64,
        #[arg(long, default_value = DEFAULT_THEME_KEY)]
        theme: String,
        #[arg(long)]
        offline: bool,
    },
    /// List the gradient themes available for share cards
    Themes {
        year: Option<i32>,
        month: Option<u32>,
        #[arg(long)]
        offline: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CardKind {
    Notification,
    Challenge,
}

/// Prints toasts on stderr for the one-shot commands.
struct ConsoleToaster;

impl Toaster for ConsoleToaster {
    fn show(&self, level: ToastLevel, message: &str) {
        match level {
            ToastLevel::Error => eprintln!("error: {message}"),
            ToastLevel::Info | ToastLevel::Success => eprintln!("{message}"),
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        std::env::set_var("RUST_LOG", "debug");
    }

    let mut config = Config::load(cli.config.as_deref()).context("loading config")?;
    init_logging(&config)?;

    match cli.command {
        Some(Commands::View { year, month, reduced_motion, offline }) => {
            config.reduced_motion |= reduced_motion;
            view(&config, RecapPeriod::new(year, month)?, offline).await?;
        }
        Some(Commands::Download { year, month, theme, offline }) => {
            let period = RecapPeriod::new(year, month)?;
            export_card(&config, Arc::new(RecapCard { period }), &theme, offline).await?;
        }
        Some(Commands::Share { kind, id, theme, offline }) => {
            let source: Arc<dyn CardDataSource> = match kind {
                CardKind::Notification => Arc::new(NotificationCard { notification_id: id }),
                CardKind::Challenge => Arc::new(ChallengeCard { challenge_id: id }),
            };
            export_card(&config, source, &theme, offline).await?;
        }
        Some(Commands::Themes { year, month, offline }) => {
            let period = match (year, month) {
                (Some(year), Some(month)) => Some(RecapPeriod::new(year, month)?),
                _ => None,
            };
            list_themes(&config, period, offline).await?;
        }
        None => {
            let period = previous_month(Local::now().date_naive())?;
            view(&config, period, false).await?;
        }
    }

    Ok(())
}

/// Logs go to a file so they never tear the terminal UI.
fn init_logging(config: &Config) -> Result<()> {
    let path = config
        .log_path
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("recap.log"));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn api_for(config: &Config, offline: bool) -> Arc<dyn RecapApi> {
    if offline {
        Arc::new(StubClient)
    } else {
        Arc::new(HttpAdapter::from_config(config))
    }
}

/// Themes from the recap itself, then the configured theme file.
fn theme_table(config: &Config, manifest_themes: BTreeMap<String, ThemeStyle>) -> ThemeTable {
    let configured = config.load_themes().unwrap_or_else(|e| {
        tracing::warn!("could not read theme file: {e}");
        Default::default()
    });
    ThemeTable::first_available([manifest_themes, configured])
}

async fn view(config: &Config, period: RecapPeriod, offline: bool) -> Result<()> {
    let api = api_for(config, offline);
    let mut manifest = api
        .fetch_manifest(&period)
        .await
        .with_context(|| format!("loading recap for {period}"))?;
    let themes = theme_table(config, std::mem::take(&mut manifest.themes));
    let theme_keys = themes.keys().into_iter().map(str::to_string).collect();

    let services = Services::new(api, Arc::new(recap_core::LogToaster));
    let session = RecapSession::spawn(config, services, period, manifest, themes).await?;
    recap_tui::run_viewer(session, theme_keys).await
}

async fn export_card(config: &Config, source: Arc<dyn CardDataSource>, theme: &str, offline: bool) -> Result<()> {
    let services = Services::new(api_for(config, offline), Arc::new(ConsoleToaster));
    let orchestrator = ShareOrchestrator::new(services, source, config.download_dir.clone());
    match orchestrator.download(theme, None).await {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => anyhow::bail!("share card download failed"),
    }
}

async fn list_themes(config: &Config, period: Option<RecapPeriod>, offline: bool) -> Result<()> {
    let manifest_themes = match period {
        Some(period) => api_for(config, offline).fetch_manifest(&period).await?.themes,
        None => Default::default(),
    };
    let table = theme_table(config, manifest_themes);
    if table.is_degraded() {
        println!("(no gradient themes configured, using the default)");
    }
    for key in table.keys() {
        let style = table.resolve(key);
        println!("{key:<12} {:<16} {}", style.name, style.background);
    }
    Ok(())
}

fn previous_month(today: NaiveDate) -> Result<RecapPeriod> {
    let (year, month) = match today.month() {
        1 => (today.year() - 1, 12),
        m => (today.year(), m - 1),
    };
    RecapPeriod::new(year, month)
}
