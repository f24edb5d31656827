use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Terminal events
#[derive(Clone, Debug)]
pub enum Event {
    /// Periodic redraw
    Tick,
    Key(KeyEvent),
    Resize(u16, u16),
    /// The terminal input stream failed
    Error(String),
}

/// Reads terminal input on a background task and forwards it, together
/// with ticks, over a channel
pub struct EventHandler {
    receiver: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
}

impl EventHandler {
    /// Start reading input; stops when `parent` is cancelled or on `shutdown`
    pub fn new(tick_rate: Duration, parent: &CancellationToken) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = parent.child_token();

        tokio::spawn(read_events(sender, tick_rate, cancel.clone()));

        Self { receiver, cancel }
    }

    /// Receive the next event; `None` once the reader has stopped
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn read_events(
    sender: mpsc::UnboundedSender<Event>,
    tick_rate: Duration,
    cancel: CancellationToken,
) {
    let mut reader = EventStream::new();
    let mut ticks = tokio::time::interval(tick_rate);

    loop {
        let crossterm_event = reader.next().fuse();

        let event = tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticks.tick() => Event::Tick,

            maybe_event = crossterm_event => match maybe_event {
                // Release events are reported on some platforms; ignore them
                Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                    Event::Key(key)
                }
                Some(Ok(CrosstermEvent::Resize(w, h))) => Event::Resize(w, h),
                Some(Ok(_)) => continue,
                Some(Err(e)) => Event::Error(e.to_string()),
                None => break,
            },
        };

        if sender.send(event).is_err() {
            break;
        }
    }
}
