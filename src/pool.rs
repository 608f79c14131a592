//! # Worker Pool Module
//!
//! Pool di worker isolati che eseguono il minimizer fuori dal coordinatore.
//!
//! ## Responsabilità:
//! - Crea N thread worker dedicati (nominati `css-minimizer-worker-<i>`)
//! - Serializza ogni task in JSON attraverso il confine (solo dati semplici,
//!   mai oggetti live come gli indici delle source map)
//! - Restituisce un risultato serializzato o un errore strutturato
//!   (messaggio, line/column opzionali, stack)
//! - Un panic in un worker viene catturato: il task fallisce con un
//!   `PoolFault`, il worker continua a servire gli altri task
//!
//! ## Lifecycle:
//! - `LazyPool`: il pool viene creato solo al primo `acquire()`
//! - `shutdown()`: chiude la coda e attende i worker; no-op se il pool non è
//!   mai stato creato

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::{oneshot, OnceCell};
use tracing::{debug, error, warn};

use crate::error::{OptimizeError, TransformError};
use crate::minify::{Minimizer, MinifyInput, MinifyOutput};

/// Serialized reply crossing back from a worker
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum WorkerResponse {
    Ok { output: MinifyOutput },
    Err { error: TransformError },
}

struct Job {
    payload: String,
    reply: oneshot::Sender<String>,
}

/// Fixed-size pool of worker threads
pub struct WorkerPool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize, minimizer: Minimizer) -> Result<Self, OptimizeError> {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = receiver.clone();
            let minimizer = minimizer.clone();
            let handle = std::thread::Builder::new()
                .name(format!("css-minimizer-worker-{}", id))
                .spawn(move || worker_loop(id, receiver, minimizer))
                .map_err(|e| OptimizeError::PoolFault(format!("failed to spawn worker {}: {}", id, e)))?;
            workers.push(handle);
        }

        debug!("Started worker pool with {} workers", size);
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Ship one task to the next free worker and wait for its reply.
    pub async fn transform(&self, input: &MinifyInput) -> Result<MinifyOutput, TransformError> {
        let payload = serde_json::to_string(input)
            .map_err(|e| TransformError::new(format!("failed to serialize task: {}", e)))?;
        let raw = self.transform_raw(payload).await?;
        decode_response(&raw)
    }

    /// Transport level: serialized task in, serialized response out.
    pub async fn transform_raw(&self, payload: String) -> Result<String, OptimizeError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| OptimizeError::PoolFault("worker pool is shut down".to_string()))?;

        let (reply, response) = oneshot::channel();
        sender
            .send(Job { payload, reply })
            .map_err(|_| OptimizeError::PoolFault("all workers have exited".to_string()))?;

        response
            .await
            .map_err(|_| OptimizeError::PoolFault("worker exited without a result".to_string()))
    }

    /// Close the queue and wait for every worker to drain and exit.
    pub async fn shutdown(mut self) {
        drop(self.sender.take());
        let workers = std::mem::take(&mut self.workers);

        let joined = tokio::task::spawn_blocking(move || {
            for worker in workers {
                if worker.join().is_err() {
                    warn!("Worker thread terminated abnormally");
                }
            }
        })
        .await;

        match joined {
            Ok(()) => debug!("Worker pool shut down"),
            Err(e) => error!("Failed to join worker pool: {}", e),
        }
    }
}

fn decode_response(raw: &str) -> Result<MinifyOutput, TransformError> {
    match serde_json::from_str::<WorkerResponse>(raw) {
        Ok(WorkerResponse::Ok { output }) => Ok(output),
        Ok(WorkerResponse::Err { error }) => Err(error),
        Err(e) => Err(OptimizeError::PoolFault(format!("unreadable worker response: {}", e)).into()),
    }
}

fn worker_loop(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>, minimizer: Minimizer) {
    loop {
        let job = {
            let guard = receiver.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.recv()
        };

        let Ok(job) = job else {
            debug!("Worker {} exiting", id);
            break;
        };

        let response = execute(&minimizer, &job.payload);
        // the requester may have gone away; nothing to do then
        let _ = job.reply.send(response);
    }
}

/// Runs one serialized task; always yields a serialized response.
fn execute(minimizer: &Minimizer, payload: &str) -> String {
    let response = match serde_json::from_str::<MinifyInput>(payload) {
        Ok(input) => match catch_unwind(AssertUnwindSafe(|| minimizer.run(input))) {
            Ok(Ok(output)) => WorkerResponse::Ok { output },
            Ok(Err(error)) => WorkerResponse::Err { error },
            Err(panic) => WorkerResponse::Err {
                error: OptimizeError::PoolFault(format!(
                    "minifier panicked: {}",
                    panic_message(panic.as_ref())
                ))
                .into(),
            },
        },
        Err(e) => WorkerResponse::Err {
            error: TransformError::new(format!("invalid task payload: {}", e)),
        },
    };

    serde_json::to_string(&response).unwrap_or_else(|e| {
        // decode_response turns this into a PoolFault on the other side
        format!("unserializable worker response: {}", e)
    })
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Pool created on first use and torn down once at the end of a pass.
pub struct LazyPool {
    size: usize,
    minimizer: Minimizer,
    pool: OnceCell<WorkerPool>,
}

impl LazyPool {
    pub fn new(size: usize, minimizer: Minimizer) -> Self {
        Self {
            size,
            minimizer,
            pool: OnceCell::new(),
        }
    }

    pub async fn acquire(&self) -> Result<&WorkerPool, OptimizeError> {
        self.pool
            .get_or_try_init(|| async { WorkerPool::new(self.size, self.minimizer.clone()) })
            .await
    }

    pub fn is_created(&self) -> bool {
        self.pool.initialized()
    }

    /// Number of workers actually started (0 if never created).
    pub fn workers(&self) -> usize {
        self.pool.get().map(WorkerPool::size).unwrap_or(0)
    }

    pub async fn shutdown(self) {
        if let Some(pool) = self.pool.into_inner() {
            pool.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minify::minify_fn;
    use futures::future::join_all;
    use serde_json::json;

    fn input(name: &str, code: &str) -> MinifyInput {
        MinifyInput {
            name: name.into(),
            code: code.into(),
            input_source_map: None,
            source_map: false,
            options: json!({}),
        }
    }

    fn upper() -> Minimizer {
        Minimizer::single(minify_fn("upper", |input| {
            if input.code.contains("explode") {
                panic!("kaboom in {}", input.name);
            }
            if input.code.contains("invalid") {
                return Err(TransformError::new("Unknown word").at(1, 4).with_stack("CssSyntaxError\n at x"));
            }
            Ok(Some(MinifyOutput {
                code: input.code.to_uppercase(),
                map: None,
                warnings: vec![],
            }))
        }))
    }

    #[tokio::test]
    async fn test_transform_round_trip() {
        let pool = WorkerPool::new(2, upper()).unwrap();
        assert_eq!(pool.size(), 2);

        let inputs: Vec<_> = (0..6).map(|i| input(&format!("{}.css", i), "a{}")).collect();
        let results = join_all(inputs.iter().map(|i| pool.transform(i))).await;
        for result in results {
            assert_eq!(result.unwrap().code, "A{}");
        }
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_structured_error_crosses_boundary() {
        let pool = WorkerPool::new(1, upper()).unwrap();
        let err = pool.transform(&input("bad.css", "invalid")).await.unwrap_err();
        assert_eq!(err.message, "Unknown word");
        assert_eq!((err.line, err.column), (Some(1), Some(4)));
        assert_eq!(err.stack.as_deref(), Some("CssSyntaxError\n at x"));
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let pool = WorkerPool::new(1, upper()).unwrap();

        let err = pool.transform(&input("boom.css", "explode")).await.unwrap_err();
        assert!(err.message.contains("kaboom in boom.css"));

        // the same single worker still serves the next task
        let ok = pool.transform(&input("fine.css", "b{}")).await.unwrap();
        assert_eq!(ok.code, "B{}");
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_garbage_payload_is_structured_error() {
        let pool = WorkerPool::new(1, upper()).unwrap();
        let raw = pool.transform_raw("not json".into()).await.unwrap();
        let err = decode_response(&raw).unwrap_err();
        assert!(err.message.starts_with("invalid task payload"));
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_lazy_pool_only_created_on_acquire() {
        let lazy = LazyPool::new(2, upper());
        assert!(!lazy.is_created());
        assert_eq!(lazy.workers(), 0);
        lazy.shutdown().await;

        let lazy = LazyPool::new(2, upper());
        let pool = lazy.acquire().await.unwrap();
        assert_eq!(pool.transform(&input("a.css", "x")).await.unwrap().code, "X");
        assert!(lazy.is_created());
        assert_eq!(lazy.workers(), 2);
        lazy.shutdown().await;
    }
}
