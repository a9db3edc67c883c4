use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, KeyEvent, MouseEvent};
use serde_json::Value;
use std::{io, time::Duration};
use tokio::sync::mpsc;

/// Application events
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input event
    Key(KeyEvent),

    /// Mouse input event
    Mouse(MouseEvent),

    /// Terminal resize event
    Resize(u16, u16),

    /// Periodic tick event
    Tick,

    /// Status message event
    StatusMessage(String),

    /// Clear status message event
    ClearStatus,

    /// Custom application events
    Custom(String, serde_json::Value),
}

/// Event handler for managing input events
pub struct EventHandler {
    /// Event receiver channel
    receiver: mpsc::UnboundedReceiver<Event>,

    /// Event sender channel
    sender: mpsc::UnboundedSender<Event>,

    /// Tick interval for periodic events
    tick_interval: Duration,
}

impl EventHandler {
    /// Create a new event handler ticking every `tick_interval`
    pub fn new(tick_interval: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        Self {
            receiver,
            sender,
            tick_interval,
        }
    }

    /// Get the next event
    pub async fn next(&mut self) -> Option<Event> {
        // Internal events first so results from spawned tasks are not starved
        if let Ok(event) = self.receiver.try_recv() {
            return Some(event);
        }

        let tick_interval = self.tick_interval;
        let polled = tokio::task::spawn_blocking(move || -> io::Result<Option<CrosstermEvent>> {
            if crossterm::event::poll(tick_interval)? {
                crossterm::event::read().map(Some)
            } else {
                Ok(None)
            }
        })
        .await;

        match polled {
            Ok(Ok(Some(event))) => Some(Self::convert_crossterm_event(event)),
            Ok(Err(error)) => {
                tracing::warn!(%error, "Failed to read terminal event");
                Some(Event::Tick)
            }
            _ => Some(Event::Tick),
        }
    }

    /// Convert crossterm events to application events
    fn convert_crossterm_event(event: CrosstermEvent) -> Event {
        match event {
            CrosstermEvent::Key(key_event) => Event::Key(key_event),
            CrosstermEvent::Mouse(mouse_event) => Event::Mouse(mouse_event),
            CrosstermEvent::Resize(width, height) => Event::Resize(width, height),
            CrosstermEvent::FocusGained => Event::Custom("focus_gained".to_string(), Value::Null),
            CrosstermEvent::FocusLost => Event::Custom("focus_lost".to_string(), Value::Null),
            CrosstermEvent::Paste(text) => Event::Custom("paste".to_string(), Value::String(text)),
        }
    }

    /// Send an internal event
    pub fn send(&self, event: Event) -> Result<()> {
        self.sender.send(event)?;
        Ok(())
    }

    /// Get a clone of the sender
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.sender.clone()
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}
