//! Flush timer
//!
//! A background thread that waits for the earliest armed deadline and then
//! runs a callback. The callback is expected to take the store lock, flush
//! the buffer if its deadline really has passed, and report the deadline that
//! is still armed (if any) so the thread keeps waiting for it.

use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::Result;

/// Messages accepted by the timer thread
#[derive(Debug, Clone, Copy)]
enum TimerEvent {
    /// Wake up at the given instant
    Arm(Instant),
    /// Exit the thread
    Shutdown,
}

/// Cloneable handle used to arm the timer
#[derive(Debug, Clone)]
pub struct TimerHandle {
    tx: Sender<TimerEvent>,
}

impl TimerHandle {
    /// Schedule a wakeup at `deadline`, replacing any earlier schedule
    pub fn arm(&self, deadline: Instant) {
        if self.tx.send(TimerEvent::Arm(deadline)).is_err() {
            tracing::debug!("flush timer already stopped; ignoring arm");
        }
    }
}

/// Owner of the timer thread; stops and joins it on drop
pub struct FlushTimer {
    handle: TimerHandle,
    thread: Option<JoinHandle<()>>,
}

impl FlushTimer {
    /// Spawn the timer thread
    ///
    /// `on_fire` runs on the timer thread once a deadline passes. Its return
    /// value is the next deadline to wait for, or `None` to go idle.
    pub fn spawn<F>(on_fire: F) -> Result<Self>
    where
        F: FnMut() -> Option<Instant> + Send + 'static,
    {
        let (tx, rx) = channel::unbounded();

        let thread = thread::Builder::new()
            .name("emberkv-flush".to_string())
            .spawn(move || run(rx, on_fire))?;

        Ok(Self {
            handle: TimerHandle { tx },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    /// Stop the thread and wait for it to exit
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.handle.tx.send(TimerEvent::Shutdown);
        if thread.join().is_err() {
            tracing::error!("flush timer thread panicked");
        }
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<F>(rx: Receiver<TimerEvent>, mut on_fire: F)
where
    F: FnMut() -> Option<Instant>,
{
    let mut deadline: Option<Instant> = None;

    loop {
        let event = match deadline {
            Some(at) => match rx.recv_deadline(at) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return,
            },
            None => match rx.recv() {
                Ok(event) => Some(event),
                Err(_) => return,
            },
        };

        match event {
            Some(TimerEvent::Arm(at)) => deadline = Some(at),
            Some(TimerEvent::Shutdown) => return,
            None => {
                tracing::trace!("flush timer fired");
                deadline = on_fire();
            }
        }
    }
}
