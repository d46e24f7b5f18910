//! Shared helpers for the ordering tests.

#![allow(dead_code)]

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use outbox_probe::{ConsumeContext, ConsumeError, ConsumeObserver, Consumer, DoWork, InMemoryQueue, Message};

pub const TIMEOUT: Duration = Duration::from_secs(2);

/// Poll `condition` until it holds or the timeout expires.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Wraps a consumer and keeps its unit of work open after it returns,
/// until the test releases it.
pub struct HoldOpen<C> {
    inner: C,
    reached: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

/// Test side of a `HoldOpen`.
pub struct Gate {
    reached: Receiver<()>,
    release: Sender<()>,
}

impl<C> HoldOpen<C> {
    pub fn new(inner: C) -> (Self, Gate) {
        let (reached_tx, reached_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        (
            Self {
                inner,
                reached: Mutex::new(reached_tx),
                release: Mutex::new(release_rx),
            },
            Gate {
                reached: reached_rx,
                release: release_tx,
            },
        )
    }
}

impl<C: Consumer<DoWork>> Consumer<DoWork> for HoldOpen<C> {
    fn consume(&self, ctx: &ConsumeContext<'_, DoWork>) -> Result<(), ConsumeError> {
        self.inner.consume(ctx)?;
        let _ = self.reached.lock().unwrap().send(());
        match self.release.lock().unwrap().recv_timeout(TIMEOUT) {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                Err(ConsumeError::Other("gate never released".into()))
            }
        }
    }
}

impl Gate {
    /// Block until the wrapped consumer has finished its own work.
    pub fn wait_reached(&self) {
        self.reached
            .recv_timeout(TIMEOUT)
            .expect("consumer never reached the gate");
    }

    /// Let the unit of work complete.
    pub fn release(&self) {
        self.release.send(()).unwrap();
    }
}

/// Records the transport's high-water sequence when each unit of work completes.
pub struct CompletionRecorder {
    transport: InMemoryQueue,
    completed: Mutex<Vec<(String, u64)>>,
    faulted: Mutex<Vec<(String, String)>>,
}

impl CompletionRecorder {
    pub fn new(transport: InMemoryQueue) -> Self {
        Self {
            transport,
            completed: Mutex::new(Vec::new()),
            faulted: Mutex::new(Vec::new()),
        }
    }

    pub fn completed(&self) -> Vec<(String, u64)> {
        self.completed.lock().unwrap().clone()
    }

    pub fn faulted(&self) -> Vec<(String, String)> {
        self.faulted.lock().unwrap().clone()
    }
}

impl ConsumeObserver for CompletionRecorder {
    fn post_consume(&self, _queue: &str, message: &Message) {
        self.completed
            .lock()
            .unwrap()
            .push((message.id.clone(), self.transport.last_sequence()));
    }

    fn consume_fault(&self, _queue: &str, message: &Message, error: &ConsumeError) {
        self.faulted
            .lock()
            .unwrap()
            .push((message.id.clone(), error.to_string()));
    }
}
