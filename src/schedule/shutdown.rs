use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Wakes the scheduler out of its sleeps. `stop()`, or dropping the handle,
/// makes every pending and future wait return immediately. The stop is
/// latched: once requested it stays requested, no matter how many waits
/// observe it.
pub struct ShutdownHandle {
    stopped: Arc<AtomicBool>,
    tx: Sender<()>,
}

impl ShutdownHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }
}

impl Drop for ShutdownHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Receiving side, owned by the scheduler loop.
pub struct Shutdown {
    stopped: Arc<AtomicBool>,
    rx: Receiver<()>,
}

impl Shutdown {
    pub fn channel() -> (ShutdownHandle, Shutdown) {
        let (tx, rx) = mpsc::channel();
        let stopped = Arc::new(AtomicBool::new(false));
        let handle = ShutdownHandle {
            stopped: Arc::clone(&stopped),
            tx,
        };
        (handle, Shutdown { stopped, rx })
    }

    /// Sleep for `timeout` unless a stop arrives first. Returns `true` when
    /// the wait ran its full course and the loop should continue.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return false;
        }
        // The channel only serves as the wake-up; the flag is the state.
        match self.rx.recv_timeout(timeout) {
            Ok(()) => false,
            Err(RecvTimeoutError::Disconnected) => false,
            Err(RecvTimeoutError::Timeout) => !self.stopped.load(Ordering::SeqCst),
        }
    }

    pub fn stop_requested(&self) -> bool {
        !self.wait(Duration::ZERO)
    }
}
