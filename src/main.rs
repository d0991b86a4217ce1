use std::ffi::OsString;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture, KeyEventKind};
use crossterm::execute;

use ramtop::action::Action;
use ramtop::app::App;
use ramtop::config::{self, Config, ThemePreference, load_config, load_config_from_path};
use ramtop::event::{Event, EventHandler};
use ramtop::logging;
use ramtop::system::gpu::{GpuInfo, detect_gpu_info};
use ramtop::system::platform;
use ramtop::system::relaunch::{Relaunch, relaunch_elevated};
use ramtop::system::source::SysinfoSource;
use ramtop::system::terminate::SysinfoTerminator;
use ramtop::ui;

/// Drives status-message expiry; refreshes come from the scheduler.
const UI_TICK: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "ramtop", about = "Live process memory monitor for the terminal")]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh rate in milliseconds
    #[arg(long)]
    refresh_rate: Option<u64>,

    /// Theme: light, dark, modern, system
    #[arg(long)]
    theme: Option<String>,

    /// Re-run under sudo so every process can be inspected and terminated
    #[arg(long, default_value_t = false)]
    elevate: bool,

    /// Write JSON logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log at debug level (with --log-file)
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    if let Some(path) = &cli.log_file {
        logging::init_file_logging(path, cli.verbose)?;
    }

    if cli.elevate {
        match relaunch_elevated(relaunch_args())? {
            Relaunch::Exited(code) => std::process::exit(code.unwrap_or(1)),
            Relaunch::AlreadyElevated => {}
        }
    }

    let config = load_config_for_cli(&cli);
    let config_path = cli.config.clone().or_else(config::config_path);
    let gpu = detect_gpu_info();

    let mut terminal = ratatui::init();
    execute!(stdout(), EnableMouseCapture)?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        ratatui::restore();
        original_hook(panic_info);
    }));

    let result = run(&mut terminal, config, config_path, gpu).await;

    execute!(stdout(), DisableMouseCapture)?;
    ratatui::restore();

    result
}

async fn run(
    terminal: &mut ratatui::DefaultTerminal,
    config: Config,
    config_path: Option<PathBuf>,
    gpu: GpuInfo,
) -> Result<()> {
    let mut events = EventHandler::new(UI_TICK);
    let source = SysinfoSource::new().with_max_rows(config.general.max_rows);
    let mut app = App::new(
        &config,
        Box::new(source),
        Arc::new(events.bridge()),
        Box::new(SysinfoTerminator::new()),
    )
    .with_config_path(config_path)
    .with_gpu(gpu)
    .with_elevated(platform::is_elevated());
    app.start();

    terminal.draw(|frame| ui::draw(frame, &mut app))?;

    while app.running {
        let Some(event) = events.next().await else {
            break;
        };
        let should_draw = match event {
            Event::Key(key) => {
                if key.kind == KeyEventKind::Press {
                    let action = app.map_key(key);
                    app.dispatch(action);
                    true
                } else {
                    false
                }
            }
            Event::Mouse(mouse) => {
                let action = app.map_mouse(mouse);
                if action == Action::None {
                    false
                } else {
                    app.dispatch(action);
                    true
                }
            }
            Event::Tick => {
                app.on_tick();
                true
            }
            Event::Resize => true,
            Event::Published(publication) => app.apply_publication(*publication),
            Event::SamplingFailed {
                persistent,
                message,
            } => {
                app.on_sampling_failed(persistent, message);
                true
            }
        };
        if should_draw && app.running {
            terminal.draw(|frame| ui::draw(frame, &mut app))?;
        }
    }

    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(rate) = cli.refresh_rate {
        config.general.refresh_rate_ms = rate;
    }
    if let Some(ref theme) = cli.theme {
        config.theme = ThemePreference::from_tag(theme);
    }

    config
}

/// Arguments for the elevated copy, minus the flag that asked for it.
fn relaunch_args() -> Vec<OsString> {
    std::env::args_os()
        .skip(1)
        .filter(|arg| arg != "--elevate")
        .collect()
}
