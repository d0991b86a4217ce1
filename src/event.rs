use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEvent};
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::system::scheduler::{PresentationBridge, Publication};
use crate::system::source::SourceError;

#[derive(Clone, Debug)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Tick,
    Resize,
    Published(Box<Publication>),
    SamplingFailed { persistent: bool, message: String },
}

pub struct EventHandler {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    _task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();
        let input_tx = tx.clone();

        let task = tokio::spawn(async move {
            let mut reader = event::EventStream::new();
            let mut tick_interval = tokio::time::interval(tick_rate);

            loop {
                tokio::select! {
                    maybe_event = reader.next() => {
                        match maybe_event {
                            Some(Ok(evt)) => {
                                let mapped = match evt {
                                    CrosstermEvent::Key(key) => Some(Event::Key(key)),
                                    CrosstermEvent::Mouse(mouse) => Some(Event::Mouse(mouse)),
                                    CrosstermEvent::Resize(_, _) => Some(Event::Resize),
                                    _ => None,
                                };
                                if let Some(e) = mapped
                                    && input_tx.send(e).is_err()
                                {
                                    break;
                                }
                            }
                            Some(Err(_)) => break,
                            None => break,
                        }
                    }
                    _ = tick_interval.tick() => {
                        if input_tx.send(Event::Tick).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            tx,
            rx,
            _task: task,
        }
    }

    /// Bridge that forwards scheduler output into this handler's queue.
    pub fn bridge(&self) -> ChannelBridge {
        ChannelBridge::new(self.tx.clone())
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Hands publications to the interaction loop instead of touching UI state
/// from the refresh worker.
pub struct ChannelBridge {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelBridge {
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    fn send(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event loop gone, dropping scheduler output");
        }
    }
}

impl PresentationBridge for ChannelBridge {
    fn render(&self, publication: Publication) {
        self.send(Event::Published(Box::new(publication)));
    }

    fn notify_transient_error(&self, error: &SourceError) {
        self.send(Event::SamplingFailed {
            persistent: false,
            message: error.to_string(),
        });
    }

    fn notify_persistent_error(&self, error: &SourceError) {
        self.send(Event::SamplingFailed {
            persistent: true,
            message: error.to_string(),
        });
    }
}
