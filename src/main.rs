//! src/main.rs – StageFrost launcher: config, logging, terminal setup and the event loop
mod credentials_form;
mod palette;
mod text_input;
mod upload_form;
mod widgets;
mod workspace;

use std::path::{Path, PathBuf};
use std::process;
use std::{
    io::{self, Write},
    time::{Duration, Instant},
};

use clap::Parser;
use tracing::{error, info};

/* ─── modules / crates ─── */
use crate::workspace::Workspace;
use crossterm::event::Event;
use tui::{backend::CrosstermBackend, Terminal};
use StageFrost::config::Config;
use StageFrost::logging;

// ───── Unix-only imports ────────────────────────────────────────────
#[cfg(unix)]
use signal_hook::iterator::Signals;
#[cfg(unix)]
use libc::{SIGHUP, SIGTERM};
#[cfg(unix)]
use std::thread;

/*──────────────────────── CLI structures ──────────────────────*/
#[derive(Parser)]
#[command(name = "StageFrost")]
#[command(about = "Browse, clean up and fill Snowflake internal stages", long_about = None)]
struct Cli {
    /// Config file (defaults to StageFrost.toml next to the executable)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON credentials file to prefill the sidebar with
    #[arg(long, value_name = "FILE")]
    credentials: Option<PathBuf>,
}

/*──────────────────────── helpers ──────────────────────────────*/
/// Leaves the alternate screen and raw mode. Safe to call more than once.
fn restore_terminal() {
    let mut out = io::stdout();
    let _ = crossterm::execute!(
        out,
        crossterm::event::DisableBracketedPaste,
        crossterm::terminal::LeaveAlternateScreen
    );
    let _ = out.flush();
    let _ = crossterm::terminal::disable_raw_mode();
}

/// Log lines go beside the config file that was actually used.
fn log_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::data_dir)
}

/*──────────────────────── main ────────────────────────────────*/
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    /* Load configuration; a broken file falls back to defaults and is reported */
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let (config, mut startup_error) = match Config::load_from(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (Config::default(), Some(format!("{e:#}"))),
    };

    match logging::init(&log_dir(&config_path), &config.log_level) {
        Ok(path) => info!(config = %config_path.display(), log = %path.display(), "StageFrost starting"),
        Err(e) => {
            startup_error.get_or_insert_with(|| format!("{e:#}"));
        }
    }
    if let Some(msg) = &startup_error {
        error!(error = %msg, "startup problem");
    }

    palette::install(config.colors);
    let credentials = cli.credentials.or_else(|| config.credentials_file.clone());
    run_interactive_mode(config, credentials, startup_error)
}

fn run_interactive_mode(
    config: Config,
    credentials: Option<PathBuf>,
    startup_error: Option<String>,
) -> anyhow::Result<()> {
    /* ①  Workspace */
    let mut workspace = Workspace::new(&config, credentials);
    if let Some(msg) = startup_error {
        workspace.set_status(msg);
    }

    /* ───── console-control handler – restore & exit ───── */
    ctrlc::set_handler(|| {
        restore_terminal();
        process::exit(130);
    })?;

    /* ───── Unix (SIGHUP/SIGTERM) graceful-exit hook ───── */
    #[cfg(unix)]
    {
        let mut signals = Signals::new([SIGHUP, SIGTERM])?;
        thread::spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!(signal = sig, "terminating on signal");
                restore_terminal();
                process::exit(0);
            }
        });
    }

    /* ②  Crossterm / TUI init */
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::terminal::SetTitle("StageFrost"),
        crossterm::event::EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut term = Terminal::new(backend)?;

    let result = event_loop(&mut workspace, &mut term);

    /* ─── graceful quit: drop the session and restore console ─── */
    workspace.ctx.disconnect();
    restore_terminal();
    info!("StageFrost stopped");
    result
}

/*──────────────────────── ③ event/render loop ─────────────────*/
fn event_loop<W: Write>(
    workspace: &mut Workspace,
    term: &mut Terminal<CrosstermBackend<W>>,
) -> anyhow::Result<()> {
    let tick = Duration::from_millis(250);
    let mut last_draw = Instant::now();
    let mut dirty = true;

    'main: loop {
        // queued warehouse work: show the busy banner first, then block on it
        if workspace.has_pending() {
            workspace.render(term)?;
            workspace.run_pending();
            dirty = true;
        }

        let timeout = if dirty { Duration::from_millis(15) } else { tick };
        if crossterm::event::poll(timeout)? {
            match crossterm::event::read()? {
                Event::Key(k) if workspace.handle_key(k)? => break 'main, // Ctrl-Q
                Event::Key(_) => dirty = true,
                Event::Paste(s) => {
                    workspace.handle_paste(&s);
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }

        let had_status = workspace.status_message.is_some();
        workspace.update();
        if had_status && workspace.status_message.is_none() {
            dirty = true;
        }

        if dirty && last_draw.elapsed() >= Duration::from_millis(15) {
            workspace.render(term)?;
            last_draw = Instant::now();
            dirty = false;
        }
    }
    Ok(())
}
