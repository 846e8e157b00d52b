// Event consumption: one dedicated worker thread per event source, processing
// payloads strictly in arrival order.

use bizrec_core::{Error, Result};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Blocking source of raw event payloads.
pub trait EventSource: Send + Sync {
    /// Next payload, blocking until one is available. `None` once the source
    /// is closed and drained.
    fn next_event(&self) -> Option<Vec<u8>>;

    /// Stop accepting events; already queued events are still delivered.
    fn close(&self);
}

/// In-process FIFO [`EventSource`].
#[derive(Default)]
pub struct EventQueue {
    events: Mutex<VecDeque<Vec<u8>>>,
    condvar: Condvar,
    closed: AtomicBool,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a payload. Returns `false` if the queue is closed.
    pub fn publish(&self, payload: Vec<u8>) -> bool {
        let mut events = self.events.lock();
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        events.push_back(payload);
        self.condvar.notify_one();
        true
    }

    pub fn pending(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl EventSource for EventQueue {
    fn next_event(&self) -> Option<Vec<u8>> {
        let mut events = self.events.lock();
        loop {
            if let Some(event) = events.pop_front() {
                return Some(event);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            self.condvar.wait(&mut events);
        }
    }

    fn close(&self) {
        let _events = self.events.lock();
        self.closed.store(true, Ordering::Release);
        self.condvar.notify_all();
    }
}

/// Where a pipeline is in its event-processing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PipelineState {
    Listening = 0,
    Processing = 1,
    Validating = 2,
    Appended = 3,
    Rebuilding = 4,
    Invalidating = 5,
    Recomputing = 6,
    Stopped = 7,
}

impl PipelineState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => PipelineState::Listening,
            1 => PipelineState::Processing,
            2 => PipelineState::Validating,
            3 => PipelineState::Appended,
            4 => PipelineState::Rebuilding,
            5 => PipelineState::Invalidating,
            6 => PipelineState::Recomputing,
            _ => PipelineState::Stopped,
        }
    }
}

/// Shared, lock-free view of a running pipeline.
#[derive(Debug)]
pub struct PipelineStatus {
    state: AtomicU8,
    received: AtomicU64,
    applied: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(PipelineState::Listening as u8),
            received: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

impl PipelineStatus {
    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: PipelineState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    /// Malformed or invalid events that were discarded.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Well-formed events whose downstream calls failed.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Events fully handled, whatever the outcome.
    pub fn processed(&self) -> u64 {
        self.applied() + self.rejected() + self.failed()
    }

    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            state: self.state(),
            received: self.received(),
            applied: self.applied(),
            rejected: self.rejected(),
            failed: self.failed(),
        }
    }

    fn record(&self, outcome: &Result<()>) {
        let counter = match outcome {
            Ok(()) => &self.applied,
            Err(Error::MalformedEvent(_) | Error::Validation(_)) => &self.rejected,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of a [`PipelineStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub state: PipelineState,
    pub received: u64,
    pub applied: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Processes one event payload.
///
/// Errors never stop the consumer: `MalformedEvent` and `Validation` count as
/// rejections, everything else as failures.
pub trait EventHandler: Send + 'static {
    fn name(&self) -> &'static str;
    fn handle(&self, payload: &[u8], status: &PipelineStatus) -> Result<()>;
}

/// Owner of a running consumer thread.
pub struct ConsumerHandle {
    name: &'static str,
    source: Arc<dyn EventSource>,
    status: Arc<PipelineStatus>,
    thread: Option<JoinHandle<()>>,
}

impl ConsumerHandle {
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn status(&self) -> &Arc<PipelineStatus> {
        &self.status
    }

    /// Close the source, let the worker drain what is queued, and join it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.source.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Consumer {} panicked", self.name);
            }
        }
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start a dedicated worker thread feeding events from `source` to `handler`.
pub fn spawn_consumer<H: EventHandler>(
    source: Arc<dyn EventSource>,
    handler: H,
) -> std::io::Result<ConsumerHandle> {
    let name = handler.name();
    let status = Arc::new(PipelineStatus::default());

    let worker_source = Arc::clone(&source);
    let worker_status = Arc::clone(&status);
    let thread = thread::Builder::new()
        .name(format!("bg-consumer-{}", name))
        .spawn(move || {
            tracing::info!("Consumer {} listening", name);
            while let Some(payload) = worker_source.next_event() {
                worker_status.received.fetch_add(1, Ordering::Relaxed);
                worker_status.set_state(PipelineState::Processing);

                let outcome = handler.handle(&payload, &worker_status);
                match &outcome {
                    Ok(()) => {}
                    Err(e @ (Error::MalformedEvent(_) | Error::Validation(_))) => {
                        tracing::warn!("{}: discarding event: {}", name, e);
                    }
                    Err(e) => tracing::error!("{}: event failed: {}", name, e),
                }
                worker_status.record(&outcome);
                worker_status.set_state(PipelineState::Listening);
            }
            worker_status.set_state(PipelineState::Stopped);
            tracing::info!("Consumer {} stopped", name);
        })?;

    Ok(ConsumerHandle {
        name,
        source,
        status,
        thread: Some(thread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl EventHandler for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn handle(&self, payload: &[u8], _status: &PipelineStatus) -> Result<()> {
            let text = String::from_utf8_lossy(payload).to_string();
            if text == "bad" {
                return Err(Error::MalformedEvent("bad".into()));
            }
            if text == "boom" {
                return Err(Error::Upstream("store down".into()));
            }
            self.seen.lock().push(text);
            Ok(())
        }
    }

    #[test]
    fn test_queue_drains_after_close() {
        let queue = EventQueue::new();
        assert!(queue.publish(b"a".to_vec()));
        queue.close();
        assert!(!queue.publish(b"b".to_vec()));
        assert_eq!(queue.next_event(), Some(b"a".to_vec()));
        assert_eq!(queue.next_event(), None);
    }

    #[test]
    fn test_consumer_processes_in_order_and_survives_errors() {
        let queue = Arc::new(EventQueue::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle = spawn_consumer(queue.clone(), Recorder { seen: seen.clone() }).unwrap();

        for event in ["one", "bad", "two", "boom", "three"] {
            queue.publish(event.as_bytes().to_vec());
        }
        let status = Arc::clone(handle.status());
        handle.shutdown();

        assert_eq!(*seen.lock(), vec!["one", "two", "three"]);
        assert_eq!(status.received(), 5);
        assert_eq!(status.applied(), 3);
        assert_eq!(status.rejected(), 1);
        assert_eq!(status.failed(), 1);
        assert_eq!(status.state(), PipelineState::Stopped);
    }

    #[test]
    fn test_consumer_blocks_until_event() {
        let queue = Arc::new(EventQueue::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle = spawn_consumer(queue.clone(), Recorder { seen: seen.clone() }).unwrap();

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.status().state(), PipelineState::Listening);
        queue.publish(b"late".to_vec());
        drop(handle);

        assert_eq!(*seen.lock(), vec!["late"]);
    }
}
