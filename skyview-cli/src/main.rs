mod app;
mod clipboard;
mod context;
mod demo;
mod loader;
mod logging;
mod services;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event as CEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use skyview_core::config::SkyviewConfig;
use skyview_core::profile::{
    ProfileError, active_profile_from_env, discover_home_profiles, picker_entries, profile_label,
};

use app::AppShell;
use clipboard::MemoryClipboard;
use context::AppContext;
use demo::DemoFactory;
use logging::LogConfig;
use ui::keys::binding_from_event;
use ui::theme::init_theme;

const DEFAULT_REGION: &str = "us-east-1";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "skyview", version)]
#[command(about = "Explore cloud resources from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Profile to start with (overrides AWS_PROFILE and the config file)
    #[arg(long, global = true)]
    profile: Option<String>,

    #[arg(long, global = true)]
    region: Option<String>,

    /// Configuration file (skips discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Per-request timeout for background loads
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard (default)
    Tui,
    /// List discovered profiles, marking the active one
    Profiles,
    /// Print the effective key bindings
    Keys,
    /// Print the effective configuration as YAML
    Config,
}

/// Startup settings after flags, environment and config file are merged.
struct Startup {
    config: SkyviewConfig,
    profile: Option<String>,
    region: String,
}

fn load_config(cli: &Cli) -> Result<SkyviewConfig> {
    let mut config = match &cli.config {
        Some(path) => SkyviewConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read working directory")?;
            let (path, config) = SkyviewConfig::discover(&cwd).context("Failed to load config")?;
            if let Some(path) = path {
                eprintln!("Loaded config from: {}", path.display());
            }
            config
        }
    };
    if let Some(timeout) = cli.timeout_ms {
        if timeout == 0 {
            bail!("--timeout-ms must be positive");
        }
        config.loader.timeout_ms = timeout;
    }
    Ok(config)
}

/// Flag, then environment, then config file.
fn resolve_profile(
    flag: Option<&str>,
    env: Option<String>,
    config: Option<&str>,
) -> Option<String> {
    flag.map(str::to_string)
        .or(env)
        .or_else(|| config.map(str::to_string))
}

fn startup(cli: &Cli) -> Result<Startup> {
    let config = load_config(cli)?;
    let profile = resolve_profile(
        cli.profile.as_deref(),
        active_profile_from_env(),
        config.profile.as_deref(),
    );
    let region = cli
        .region
        .clone()
        .or_else(|| config.region.clone())
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    Ok(Startup {
        config,
        profile,
        region,
    })
}

/// Profiles from the home directory. No home directory means no profiles;
/// an unreadable credentials file is fatal.
fn discover_profiles() -> Result<Vec<String>> {
    match discover_home_profiles() {
        Ok(profiles) => Ok(profiles),
        Err(ProfileError::NoHome) => Ok(Vec::new()),
        Err(e) => Err(e).context("Failed to read credentials"),
    }
}

fn print_profiles(cli: &Cli) -> Result<()> {
    let startup = startup(cli)?;
    let active = startup.profile.as_deref();
    for name in picker_entries(&discover_profiles()?) {
        let marker = if Some(name.as_str()) == active { "*" } else { " " };
        println!("{marker} {name}");
    }
    if active.is_none() {
        println!("(active: {})", profile_label(None));
    }
    Ok(())
}

fn print_keys(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let keymap = config.keymap()?;
    for (action, binding) in keymap.iter() {
        println!("{:<14} {:<18} {}", binding.to_string(), action.name(), action.help());
    }
    Ok(())
}

fn print_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    print!("{}", config.to_yaml()?);
    Ok(())
}

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    shell: &mut AppShell,
) -> Result<()> {
    let mut dirty = true;
    loop {
        if dirty {
            terminal.draw(|frame| shell.render(frame))?;
            dirty = false;
        }
        if shell.should_quit() {
            return Ok(());
        }

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(binding) = binding_from_event(&key) {
                        shell.handle_key(&binding);
                        dirty = true;
                    }
                }
                CEvent::Resize(..) => dirty = true,
                _ => {}
            }
        }
        dirty |= shell.tick(Instant::now());
    }
}

async fn run_tui(cli: &Cli) -> Result<()> {
    let Startup {
        config,
        profile,
        region,
    } = startup(cli)?;

    match logging::init_logging(LogConfig {
        verbose: cli.verbose,
        level: config.log_level.as_deref(),
    }) {
        Ok(path) => info!(path = %path.display(), "skyview starting"),
        Err(e) => eprintln!("Warning: file logging disabled: {e:#}"),
    }

    init_theme(config.theme);
    let keymap = config.keymap()?;
    let profiles = picker_entries(&discover_profiles()?);
    let ctx = AppContext::new(
        config,
        keymap,
        Arc::new(DemoFactory::new()),
        profile,
        region,
        profiles,
        Arc::new(MemoryClipboard::new()),
    )
    .context("Failed to initialise gateways")?;
    let mut shell = AppShell::new(Arc::new(ctx));

    let mut terminal = setup_terminal().context("Failed to set up terminal")?;
    let result = event_loop(&mut terminal, &mut shell);
    restore_terminal(terminal).context("Failed to restore terminal")?;
    info!("skyview exiting");
    result
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Profiles) => print_profiles(&cli),
        Some(Commands::Keys) => print_keys(&cli),
        Some(Commands::Config) => print_config(&cli),
        Some(Commands::Tui) | None => run_tui(&cli).await,
    };
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_precedence() {
        let env = || Some("from-env".to_string());
        assert_eq!(
            resolve_profile(Some("flag"), env(), Some("cfg")).as_deref(),
            Some("flag")
        );
        assert_eq!(resolve_profile(None, env(), Some("cfg")).as_deref(), Some("from-env"));
        assert_eq!(resolve_profile(None, None, Some("cfg")).as_deref(), Some("cfg"));
        assert_eq!(resolve_profile(None, None, None), None);
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skyview.yaml");
        std::fs::write(&path, "region: eu-west-1\nloader:\n  timeout_ms: 5000\n").unwrap();

        let cli = Cli::parse_from([
            "skyview",
            "--config",
            path.to_str().unwrap(),
            "--timeout-ms",
            "250",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.loader.timeout_ms, 250);
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));

        let cli = Cli::parse_from(["skyview", "--config", path.to_str().unwrap(), "--timeout-ms", "0"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_bad_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skyview.yaml");
        std::fs::write(&path, "pagination:\n  functions: 0\n").unwrap();
        let cli = Cli::parse_from(["skyview", "profiles", "--config", path.to_str().unwrap()]);
        assert!(load_config(&cli).is_err());
    }
}
