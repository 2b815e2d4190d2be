//! Background execution primitives.
//!
//! Two shapes, both built on crossbeam channels and plain threads:
//! - [`SequentialWorker`]: one bounded queue, one thread. Requests are
//!   processed in submission order and never interleave. Used for
//!   presentation reads.
//! - [`TaskPool`]: one unbounded queue, a fixed set of threads, no ordering
//!   between tasks. Used for mutations.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crossbeam::channel::{Receiver, Sender, bounded, unbounded};

pub(crate) struct SequentialWorker<T: Send + 'static> {
    tx: Option<Sender<T>>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> SequentialWorker<T> {
    pub fn spawn(capacity: usize, mut handler: impl FnMut(T) + Send + 'static) -> Self {
        let (tx, rx): (Sender<T>, Receiver<T>) = bounded(capacity);
        let handle = std::thread::spawn(move || {
            for item in rx {
                handler(item);
            }
        });
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Enqueue a request; blocks while the queue is full. Returns false after
    /// shutdown.
    pub fn submit(&self, item: T) -> bool {
        match &self.tx {
            Some(tx) => tx.send(item).is_ok(),
            None => false,
        }
    }

    pub fn stop(&mut self) {
        // Closing the channel lets the loop drain and exit.
        self.tx = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl<T: Send + 'static> Drop for SequentialWorker<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

pub(crate) struct TaskPool<T: Send + 'static> {
    tx: Option<Sender<T>>,
    handles: Vec<JoinHandle<()>>,
    in_flight: Arc<InFlight>,
}

impl<T: Send + 'static> TaskPool<T> {
    pub fn spawn(workers: usize, handler: Arc<dyn Fn(T) + Send + Sync>) -> Self {
        let (tx, rx): (Sender<T>, Receiver<T>) = unbounded();
        let in_flight = Arc::new(InFlight::default());

        let mut handles = Vec::with_capacity(workers.max(1));
        for _ in 0..workers.max(1) {
            let rx = rx.clone();
            let handler = handler.clone();
            let in_flight = in_flight.clone();
            handles.push(std::thread::spawn(move || {
                for item in rx {
                    handler(item);
                    let mut count = in_flight.count.lock().expect("task pool lock poisoned");
                    *count -= 1;
                    if *count == 0 {
                        in_flight.idle.notify_all();
                    }
                }
            }));
        }

        Self {
            tx: Some(tx),
            handles,
            in_flight,
        }
    }

    /// Enqueue a task (fire-and-forget). Returns false after shutdown.
    pub fn submit(&self, item: T) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        {
            let mut count = self
                .in_flight
                .count
                .lock()
                .expect("task pool lock poisoned");
            *count += 1;
        }
        if tx.send(item).is_ok() {
            true
        } else {
            let mut count = self
                .in_flight
                .count
                .lock()
                .expect("task pool lock poisoned");
            *count -= 1;
            false
        }
    }

    /// Block until every queued and running task has completed.
    pub fn wait_idle(&self) {
        let mut count = self
            .in_flight
            .count
            .lock()
            .expect("task pool lock poisoned");
        while *count > 0 {
            count = self
                .in_flight
                .idle
                .wait(count)
                .expect("task pool lock poisoned");
        }
    }

    pub fn stop(&mut self) {
        self.tx = None;
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<T: Send + 'static> Drop for TaskPool<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn sequential_worker_preserves_submission_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut worker = SequentialWorker::spawn(8, move |n: usize| {
            sink.lock().unwrap().push(n);
        });

        for n in 0..100 {
            assert!(worker.submit(n));
        }
        worker.stop();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn task_pool_runs_everything_and_waits_for_idle() {
        let counter = Arc::new(AtomicUsize::new(0));
        let sink = counter.clone();
        let pool = TaskPool::spawn(
            4,
            Arc::new(move |_: ()| {
                sink.fetch_add(1, Ordering::SeqCst);
            }),
        );

        for _ in 0..50 {
            assert!(pool.submit(()));
        }
        pool.wait_idle();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn submit_after_stop_is_refused() {
        let mut worker = SequentialWorker::spawn(1, |_: usize| {});
        worker.stop();
        assert!(!worker.submit(1));

        let mut pool: TaskPool<usize> = TaskPool::spawn(2, Arc::new(|_| {}));
        pool.stop();
        assert!(!pool.submit(1));
        pool.wait_idle();
    }
}
