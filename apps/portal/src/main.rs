use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    load_settings,
    views::{self, regions},
    FieldSet, HistoryNavigator, NavigationEvent, PortalClient, Submission, Surface,
};
use shared::domain::Section;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Member portal and system monitor client")]
struct Cli {
    /// Overrides `base_url` from the config file and environment.
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        code: String,
    },
    Logout,
    /// Loads one portal section, logging in first when credentials are given.
    Section {
        name: SectionArg,
        #[arg(long, requires = "password")]
        username: Option<String>,
        #[arg(long, requires = "username")]
        password: Option<String>,
    },
    Monitor {
        #[arg(long)]
        interval_ms: Option<u64>,
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SectionArg {
    Dashboard,
    Events,
    Finances,
    Documents,
}

impl From<SectionArg> for Section {
    fn from(value: SectionArg) -> Self {
        match value {
            SectionArg::Dashboard => Section::Dashboard,
            SectionArg::Events => Section::Events,
            SectionArg::Finances => Section::Finances,
            SectionArg::Documents => Section::Documents,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref()).context("loading settings")?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
        settings.validate().context("validating --base-url")?;
    }
    info!(base_url = %settings.base_url, "portal client configured");

    let navigator = Arc::new(HistoryNavigator::new());
    let client =
        PortalClient::new(settings, navigator.clone()).context("building HTTP transport")?;

    match cli.command {
        Command::Login { username, password } => {
            let input = FieldSet::new()
                .with("username", username)
                .with("password", password);
            let result = client.login_form().submit(&input).await;
            report(&result, client.surface(), regions::LOGIN_ERROR);
        }
        Command::Signup {
            username,
            password,
            code,
        } => {
            let input = FieldSet::new()
                .with("username", username)
                .with("password", password)
                .with("code", code);
            let result = client.signup_form().submit(&input).await;
            report(&result, client.surface(), regions::SIGNUP_ERROR);
        }
        Command::Logout => {
            let kind = client.logout().await;
            println!("logout: {kind}");
        }
        Command::Section {
            name,
            username,
            password,
        } => {
            if let (Some(username), Some(password)) = (username, password) {
                let input = FieldSet::new()
                    .with("username", username)
                    .with("password", password);
                let result = client.login_form().submit(&input).await;
                if !matches!(result, Submission::Succeeded(_)) {
                    report(&result, client.surface(), regions::LOGIN_ERROR);
                    return Ok(());
                }
            }
            let sections = client.open_main_view().await;
            let section = Section::from(name);
            if section != Section::Dashboard {
                sections.show(section).await;
            }
            print_regions(&client, views::section_regions(section));
        }
        Command::Monitor { interval_ms, ticks } => {
            let period = interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| client.settings().poll_interval());
            monitor(&client, period, ticks).await?;
        }
    }

    for event in navigator.events() {
        match event {
            NavigationEvent::Confirmed(message) => println!("confirm: {message}"),
            NavigationEvent::Navigated(view) => println!("navigate: {view}"),
        }
    }
    Ok(())
}

async fn monitor(client: &PortalClient, period: Duration, ticks: Option<u64>) -> Result<()> {
    let mut handle = client.system_monitor().start(period);
    let mut seen = 0_u64;
    loop {
        tokio::select! {
            _ = handle.wait_for_ticks(seen + 1) => {}
            signal = tokio::signal::ctrl_c() => {
                signal.context("waiting for ctrl-c")?;
                break;
            }
        }
        seen = handle.completed_ticks();
        println!("-- tick {seen}");
        print_regions(client, &views::MONITOR_REGIONS);
        if ticks.is_some_and(|limit| seen >= limit) {
            break;
        }
    }
    handle.stop();
    Ok(())
}

fn report(result: &Submission, surface: &Surface, error_region: &str) {
    match result {
        Submission::Succeeded(view) => println!("ok: {view}"),
        Submission::Busy => println!("busy: another submission is running"),
        Submission::Incomplete | Submission::Failed(_) => {
            println!("error: {}", surface.region(error_region).text());
        }
    }
}

fn print_regions(client: &PortalClient, names: &[&str]) {
    for (name, content) in client.regions_snapshot(names) {
        if !content.is_empty() {
            println!("{name}: {}", content.as_str());
        }
    }
}
