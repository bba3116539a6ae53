use std::fs::File;
use std::io::{self, Stdout};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use auv_console_lib::app::App;
use auv_console_lib::config::app_config::{default_config_path, read_config, Config};
use auv_console_lib::{LogSink, PasswordConnector, SessionManager};
use backtrace::Backtrace;
use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[clap(version, about)]
struct Cli {
    /// Target host, overrides [target].host
    #[clap(long)]
    host: Option<String>,

    /// Login user, overrides [target].user
    #[clap(long, short)]
    user: Option<String>,

    #[clap(long)]
    port: Option<u16>,

    /// Config file, defaults to ~/.config/auv-console/config.toml
    #[clap(long, short)]
    config: Option<PathBuf>,

    /// Write diagnostic tracing to this file
    #[clap(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(log_file) = &cli.log_file {
        init_tracing(log_file)?;
    }
    let config = load_config(&cli)?;

    set_panic_handlers()?;
    let mut terminal = create_terminal()?;

    let res = run_app(config, &mut terminal).await;
    restore_terminal(&mut terminal)?;

    res
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let mut config = read_config(&path)?;
    if let Some(host) = &cli.host {
        config.target.host = host.clone();
    }
    if let Some(user) = &cli.user {
        config.target.user = user.clone();
    }
    if let Some(port) = cli.port {
        config.target.port = port;
    }
    Ok(config)
}

fn init_tracing(log_file: &Path) -> Result<()> {
    let file = File::create(log_file)
        .with_context(|| format!("Unable to create log file at {:?}", log_file))?;
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("auv_console_lib=debug".parse()?)
                .add_directive("auv_console=debug".parse()?),
        )
        .with_ansi(false)
        .with_writer(file)
        .init();
    Ok(())
}

async fn run_app(
    config: Config,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
) -> Result<(), anyhow::Error> {
    let (sink, log_rx) = LogSink::channel();
    let manager = SessionManager::new(
        Arc::new(PasswordConnector),
        sink,
        config.remote.clone(),
    );
    let mut app = App::new(&config, manager.subscribe());
    info!("console started");
    app.run(terminal, manager, log_rx).await
}

fn create_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout)).context("unable to create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

// handle all panic here
fn set_panic_handlers() -> Result<()> {
    panic::set_hook(Box::new(|e| {
        if let Err(e) = disable_raw_mode() {
            eprintln!("unable to disable raw mode:\n{e}");
        }
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let backtrace = Backtrace::new();
        eprintln!("\nauv-console was closed due to an unexpected panic with the following info:\n\n{:?}\ntrace:\n{:?}", e, backtrace);
    }));
    Ok(())
}
