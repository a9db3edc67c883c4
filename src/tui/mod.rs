//! Terminal user interface built on ratatui
//!
//! The app owns a single [`Document`](crate::modal::Document) that the page
//! and any open dialog mount into, and a [`ModalManager`](crate::modal::ModalManager)
//! that every page reaches through its [`ModalScope`](crate::modal::ModalScope).

pub mod app;
pub mod components;
pub mod events;
pub mod keys;
pub mod pages;
pub mod styles;

pub use app::App;
pub use events::{Event, EventHandler};
pub use keys::KeyMap;

use crate::config::Config;
use anyhow::Result;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use tracing::info;

pub type Backend = CrosstermBackend<io::Stdout>;
pub type Frame<'a> = ratatui::Frame<'a>;

/// Initialize the terminal for TUI mode
pub fn init_terminal(mouse_enabled: bool) -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if mouse_enabled {
        execute!(stdout, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Main TUI entry point
pub async fn run(config: Config) -> Result<()> {
    let mut event_handler = EventHandler::new(config.tick_rate());
    let mut app = App::new(config, event_handler.sender())?;
    let mut terminal = init_terminal(app.config.mouse_enabled)?;

    let result = run_app(&mut terminal, &mut app, &mut event_handler).await;

    restore_terminal(&mut terminal)?;
    info!("Terminal restored");
    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<Backend>,
    app: &mut App,
    event_handler: &mut EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        if let Some(event) = event_handler.next().await {
            if app.handle_event(event).await? {
                break;
            }
        }
    }
    Ok(())
}
