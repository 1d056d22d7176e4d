//! # Pool de Workers
//! src/server/pool.rs
//!
//! N threads fijos que sacan trabajos de una cola FIFO compartida
//! (`Mutex<VecDeque>` + `Condvar`). Si todos los workers están ocupados los
//! trabajos esperan en la cola. Un pánico dentro de un trabajo se atrapa y el
//! worker sigue vivo.

use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<QueueState>,
    condvar: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bloquea hasta que haya un trabajo; `None` cuando el pool se cerró
    fn dequeue(&self) -> Option<Job> {
        let mut state = self.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            if state.closed {
                return None;
            }
            state = self.condvar.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Arranca `size` workers llamados `<name>-<i>`
    pub fn new(size: usize, name: &str) -> io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let mut workers = Vec::with_capacity(size);

        for i in 0..size {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("{name}-{i}"))
                .spawn(move || worker_loop(&shared))?;
            workers.push(handle);
        }

        Ok(Self { shared, workers })
    }

    /// Encola un trabajo para el próximo worker libre
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.lock().jobs.push_back(Box::new(job));
        self.shared.condvar.notify_one();
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Trabajos esperando un worker
    pub fn queued(&self) -> usize {
        self.shared.lock().jobs.len()
    }
}

fn worker_loop(shared: &Shared) {
    let name = thread::current().name().unwrap_or("worker").to_string();
    debug!(worker = %name, "worker iniciado");

    while let Some(job) = shared.dequeue() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(worker = %name, "pánico atrapado en un trabajo");
        }
    }

    debug!(worker = %name, "worker terminado");
}

impl Drop for WorkerPool {
    /// Termina los trabajos pendientes y espera a los workers
    fn drop(&mut self) {
        self.shared.lock().closed = true;
        self.shared.condvar.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
