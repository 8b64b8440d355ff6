//! A fixed size pool of worker threads.
//!
//! Jobs are queued in submission order and picked up by the first idle worker. Each job reports
//! its result through a [`Task`], which can be waited on or polled.
use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// The worker pool.
///
/// Dropping the pool lets the workers finish all queued jobs, then joins them.
pub struct Pool {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

/// The eventual result of a job.
pub struct Task<T> {
    slot: Arc<Slot<T>>,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

#[derive(Default)]
struct Queue {
    jobs: VecDeque<Job>,
    closed: bool,
}

struct Slot<T> {
    result: Mutex<Option<thread::Result<T>>>,
    done: Condvar,
}

impl Pool {
    /// Start a pool with the given number of workers, at least one.
    pub fn new(workers: usize) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            available: Condvar::new(),
        });

        let mut pool = Pool {
            shared,
            workers: Vec::with_capacity(workers.max(1)),
        };

        for idx in 0..workers.max(1) {
            let shared = pool.shared.clone();
            let worker = thread::Builder::new()
                .name(format!("tcpterm-worker-{}", idx))
                .spawn(move || shared.work())?;
            pool.workers.push(worker);
        }

        Ok(pool)
    }

    /// The number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job.
    ///
    /// A panic inside the job is caught and resumed in the thread calling [`Task::wait`].
    pub fn spawn<F, T>(&self, job: F) -> Task<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let slot = Arc::new(Slot {
            result: Mutex::new(None),
            done: Condvar::new(),
        });

        let finished = slot.clone();
        let job: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job));
            *finished.result.lock() = Some(result);
            finished.done.notify_all();
        });

        self.shared.queue.lock().jobs.push_back(job);
        self.shared.available.notify_one();

        Task { slot }
    }
}

impl Shared {
    fn work(&self) {
        loop {
            let job = {
                let mut queue = self.queue.lock();
                loop {
                    if let Some(job) = queue.jobs.pop_front() {
                        break job;
                    }
                    if queue.closed {
                        return;
                    }
                    self.available.wait(&mut queue);
                }
            };

            job();
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.shared.queue.lock().closed = true;
        self.shared.available.notify_all();
        for worker in self.workers.drain(..) {
            // Job panics are caught, a worker never panics itself.
            let _ = worker.join();
        }
    }
}

impl<T> Task<T> {
    /// Block until the job finished and return its result.
    pub fn wait(self) -> T {
        let mut guard = self.slot.result.lock();
        let result = loop {
            if let Some(result) = guard.take() {
                break result;
            }
            self.slot.done.wait(&mut guard);
        };
        drop(guard);

        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Block until the job finished or the timeout elapsed.
    ///
    /// Returns whether the job finished.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.slot.result.lock();
        if guard.is_none() {
            self.slot.done.wait_for(&mut guard, timeout);
        }
        guard.is_some()
    }

    /// Whether the job finished.
    pub fn is_finished(&self) -> bool {
        self.slot.result.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn runs_jobs_and_returns_results() {
        let pool = Pool::new(3).unwrap();
        assert_eq!(pool.workers(), 3);
        let tasks: Vec<_> = (0..10).map(|i| pool.spawn(move || i * 2)).collect();
        let results: Vec<_> = tasks.into_iter().map(Task::wait).collect();
        assert_eq!(results, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn at_least_one_worker() {
        let pool = Pool::new(0).unwrap();
        assert_eq!(pool.workers(), 1);
        assert_eq!(pool.spawn(|| "done").wait(), "done");
    }

    #[test]
    fn jobs_run_concurrently() {
        let pool = Pool::new(2).unwrap();
        let gate = Arc::new((Mutex::new(0usize), Condvar::new()));

        // Each job waits until both started, which requires two workers.
        let tasks: Vec<_> = (0..2).map(|_| {
            let gate = gate.clone();
            pool.spawn(move || {
                let (count, cond) = &*gate;
                let mut count = count.lock();
                *count += 1;
                cond.notify_all();
                while *count < 2 {
                    cond.wait(&mut count);
                }
            })
        }).collect();

        for task in tasks {
            assert!(task.wait_timeout(Duration::from_secs(5)));
        }
    }

    #[test]
    fn drop_finishes_queued_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = Pool::new(1).unwrap();
            for _ in 0..5 {
                let counter = counter.clone();
                pool.spawn(move || {
                    thread::sleep(Duration::from_millis(1));
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    #[should_panic(expected = "job failed")]
    fn panic_is_resumed_on_wait() {
        let pool = Pool::new(1).unwrap();
        pool.spawn(|| -> () { panic!("job failed") }).wait();
    }
}
