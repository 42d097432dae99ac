//! Serialized control-thread task queue.
//!
//! All lifecycle mutation runs on the thread that owns the [`ControlQueue`]:
//! either inside a public call made on that thread, or inside a task that
//! thread runs from [`ControlQueue::pump`]. Work finishing elsewhere
//! (instantiation, calls from other threads) is posted here.

use crate::error::{HostError, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send>;

/// The receiving end, owned by the control thread.
pub struct ControlQueue {
    tx: Sender<Task>,
    rx: Receiver<Task>,
    owner: ThreadId,
}

impl ControlQueue {
    /// Create a queue owned by the calling thread.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            owner: thread::current().id(),
        }
    }

    pub fn sender(&self) -> ControlSender {
        ControlSender {
            tx: self.tx.clone(),
            owner: self.owner,
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run every task that is already queued. Returns how many ran.
    ///
    /// Tasks posted while pumping run in the same call.
    pub fn pump(&self) -> usize {
        debug_assert!(
            thread::current().id() == self.owner,
            "control queue pumped off its owning thread"
        );
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Run tasks as they arrive until `done` holds or `timeout` passes.
    ///
    /// Returns whether `done` held.
    pub fn pump_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if done() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(task) => task(),
                Err(RecvTimeoutError::Timeout) => return done(),
                // unreachable while we hold `tx`
                Err(RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }
}

impl Default for ControlQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Posting end; clone freely across threads.
#[derive(Clone)]
pub struct ControlSender {
    tx: Sender<Task>,
    owner: ThreadId,
}

impl ControlSender {
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> Result<()> {
        self.tx
            .send(Box::new(task))
            .map_err(|_| HostError::ControlQueueClosed)
    }

    /// Whether the caller is the thread that pumps this queue.
    pub fn is_control_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}

impl std::fmt::Debug for ControlSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSender")
            .field("owner", &self.owner)
            .finish()
    }
}
