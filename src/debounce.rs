//! Debouncer - collapses a burst of values into the last one.
//!
//! `debounce(delay)` returns an input handle and an output stream. A value
//! is emitted only after no newer value arrived for `delay`; every value
//! pushed within that window replaces the pending one and restarts the
//! timer. Quiet periods are measured from when values were pushed, so a
//! value that settled while the consumer was busy is emitted as soon as the
//! consumer asks for it.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

enum Signal<T> {
    Value(T, Instant),
    Cancel(Instant),
}

/// Input side. Cheap to clone; the stream ends once every clone is dropped.
pub struct Debouncer<T> {
    sender: mpsc::UnboundedSender<Signal<T>>,
}

impl<T> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Debouncer {
            sender: self.sender.clone(),
        }
    }
}

impl<T> Debouncer<T> {
    /// Offer a new value, restarting the timer. Returns false if the output
    /// side is gone.
    pub fn push(&self, value: T) -> bool {
        self.sender.send(Signal::Value(value, Instant::now())).is_ok()
    }

    /// Discard the pending value, if any.
    pub fn cancel(&self) -> bool {
        self.sender.send(Signal::Cancel(Instant::now())).is_ok()
    }
}

/// Output side: settled values, in order.
pub struct Debounced<T> {
    receiver: mpsc::UnboundedReceiver<Signal<T>>,
    delay: Duration,
    /// Latest value not yet emitted, with the time it was pushed.
    held: Option<(T, Instant)>,
}

impl<T> Debounced<T> {
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for the next settled value.
    ///
    /// Returns `None` once every input handle is dropped and nothing is
    /// pending. A value still pending when the inputs go away is emitted
    /// right away.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            let Some((value, pushed_at)) = self.held.take() else {
                match self.receiver.recv().await? {
                    Signal::Value(value, at) => self.held = Some((value, at)),
                    Signal::Cancel(_) => {}
                }
                continue;
            };
            let deadline = pushed_at + self.delay;
            match timeout_at(deadline, self.receiver.recv()).await {
                Err(_) | Ok(None) => return Some(value),
                Ok(Some(Signal::Value(newer, at))) => {
                    self.held = Some((newer, at));
                    if at >= deadline {
                        return Some(value);
                    }
                }
                Ok(Some(Signal::Cancel(at))) => {
                    if at >= deadline {
                        return Some(value);
                    }
                }
            }
        }
    }
}

pub fn debounce<T>(delay: Duration) -> (Debouncer<T>, Debounced<T>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        Debouncer { sender },
        Debounced {
            receiver,
            delay,
            held: None,
        },
    )
}
