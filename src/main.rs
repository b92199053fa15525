use std::io::{self, Write};
use std::rc::Rc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use crossterm::cursor;
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::{error, info};

use solar3d::assets::AssetLoader;
use solar3d::composer::asset_names;
use solar3d::config::Config;
use solar3d::error::{SessionUnavailable, SolarError, SolarResult};
use solar3d::session::check_environment;
use solar3d::{SolarSettings, SolarView};

fn init_logging(config: &Config) -> anyhow::Result<()> {
    let target = config.log_target().with_context(|| match &config.log_file {
        Some(path) => format!("unable to create log file {}", path.display()),
        None => "unable to open the log sink".to_string(),
    })?;
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Pipe(target));
    if config.log_file.is_some() && std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder.try_init()?;
    Ok(())
}

fn run_loop<W: Write>(out: &mut W, view: &mut SolarView, config: &Config) -> SolarResult<()> {
    let interval = config.frame_interval();
    let mut last_frame = Instant::now();
    while !view.should_quit() {
        let now = Instant::now();
        view.frame(now - last_frame);
        last_frame = now;
        view.paint();
        view.framebuffer().present(out)?;

        let deadline = now + interval;
        while !view.should_quit() {
            let timeout = deadline.saturating_duration_since(Instant::now());
            if !event::poll(timeout)? {
                break;
            }
            view.event(&event::read()?)?;
        }
    }
    Ok(())
}

fn run(config: &Config, columns: u16, rows: u16) -> SolarResult<()> {
    let settings = Rc::new(SolarSettings::with_multipliers(
        config.orbit_speed,
        config.rotation_speed,
    )?);
    let pending = AssetLoader::new(config.asset_latency()).load_all(asset_names());
    let mut view = SolarView::new(config, settings, columns, rows, pending);

    enable_raw_mode().map_err(|e| SessionUnavailable::RawMode(e.to_string()))?;
    let mut stdout = io::stdout();
    let result = execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange,
        cursor::Hide
    )
    .map_err(SolarError::from)
    .and_then(|()| run_loop(&mut stdout, &mut view, config));

    // Restore the terminal even when the loop failed
    let restored = execute!(
        stdout,
        cursor::Show,
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .and_then(|()| disable_raw_mode());
    result.and(restored.map_err(SolarError::from))
}

fn fatal(err: SolarError) -> anyhow::Error {
    error!("{err}");
    if let SolarError::SessionUnavailable(reason) = &err {
        eprintln!("{}", reason.remedy());
    }
    err.into()
}

pub fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(&config)?;

    let (columns, rows) = check_environment().map_err(fatal)?;
    info!("starting in a {columns}x{rows} terminal at {} fps", config.fps);
    run(&config, columns, rows).map_err(fatal)?;
    info!("bye");
    Ok(())
}
