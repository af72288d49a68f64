use rate_gate_core::{UiDispatcher, UiJob};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::time::Duration;

/// Runs UI jobs on whichever thread asks. For hosts whose worker thread may
/// also present dialogs, and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineUiDispatcher;

impl UiDispatcher for InlineUiDispatcher {
    fn run_on_ui(&self, job: UiJob) {
        job();
    }
}

/// Sends UI jobs to a [`UiQueue`] drained by the UI-owning thread.
pub struct ChannelUiDispatcher {
    tx: Mutex<Sender<UiJob>>,
}

/// Receiving half of [`ChannelUiDispatcher`]. Not `Sync`; keep it on the UI thread.
pub struct UiQueue {
    rx: Receiver<UiJob>,
}

impl ChannelUiDispatcher {
    pub fn new() -> (Self, UiQueue) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Mutex::new(tx) }, UiQueue { rx })
    }
}

impl UiDispatcher for ChannelUiDispatcher {
    fn run_on_ui(&self, job: UiJob) {
        let sent = match self.tx.lock() {
            Ok(tx) => tx.send(job).is_ok(),
            Err(_) => false,
        };
        if !sent {
            tracing::warn!(event = "ui_queue_closed");
        }
    }
}

impl UiQueue {
    /// Runs every job already queued and returns how many ran.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Runs jobs as they arrive until `is_done` holds and the queue is empty.
    pub fn run_until(&self, poll: Duration, mut is_done: impl FnMut() -> bool) -> usize {
        let mut ran = 0;
        loop {
            match self.rx.recv_timeout(poll) {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if is_done() {
                        ran += self.drain();
                        return ran;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return ran,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn inline_dispatcher_runs_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        InlineUiDispatcher.run_on_ui(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn channel_dispatcher_defers_to_queue_owner() {
        let (dispatcher, queue) = ChannelUiDispatcher::new();
        let ui_thread = std::thread::current().id();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let worker = {
            let seen = seen.clone();
            std::thread::spawn(move || {
                dispatcher.run_on_ui(Box::new(move || {
                    seen.lock()
                        .expect("seen lock")
                        .push(std::thread::current().id());
                }));
            })
        };
        worker.join().expect("worker");

        assert!(seen.lock().expect("seen lock").is_empty());
        assert_eq!(queue.drain(), 1);
        assert_eq!(*seen.lock().expect("seen lock"), vec![ui_thread]);
    }

    #[test]
    fn run_until_stops_when_sender_is_gone() {
        let (dispatcher, queue) = ChannelUiDispatcher::new();
        dispatcher.run_on_ui(Box::new(|| {}));
        drop(dispatcher);
        assert_eq!(queue.run_until(Duration::from_millis(5), || false), 1);
    }
}
