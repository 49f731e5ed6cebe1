use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;

use anyhow::{Context, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of OS worker threads.
///
/// Each accepted connection becomes one job; the job runs the connection's
/// full request/response loop to completion on one thread. The pool is
/// pre-sized at startup so bursty accept load does not stall on thread
/// creation.
pub struct WorkerPool {
    handles: Vec<thread::JoinHandle<()>>,
    queue: Arc<(Mutex<VecDeque<Job>>, Condvar)>,
    stop: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self> {
        let queue = Arc::new((Mutex::new(VecDeque::new()), Condvar::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(size);

        for i in 0..size {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);

            let handle = thread::Builder::new()
                .name(format!("portico-worker-{i}"))
                .spawn(move || worker_loop(&queue, &stop))
                .context("failed to spawn worker thread")?;
            handles.push(handle);
        }

        Ok(Self {
            handles,
            queue,
            stop,
        })
    }

    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        let (lock, cvar) = &*self.queue;
        {
            let mut jobs = lock.lock().unwrap_or_else(PoisonError::into_inner);
            if self.stop.load(Ordering::Relaxed) {
                return;
            }
            jobs.push_back(Box::new(job));
        }
        cvar.notify_one();
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }
}

fn worker_loop(queue: &(Mutex<VecDeque<Job>>, Condvar), stop: &AtomicBool) {
    let (lock, cvar) = queue;
    loop {
        let job = {
            let mut jobs = lock.lock().unwrap_or_else(PoisonError::into_inner);
            loop {
                if let Some(job) = jobs.pop_front() {
                    break job;
                }
                if stop.load(Ordering::Acquire) {
                    return;
                }
                jobs = match cvar.wait(jobs) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
            }
        };

        job();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        let (_, cvar) = &*self.queue;
        cvar.notify_all();

        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
