//! The telemetry worker and its host-side facade.
//!
//! The worker lives on its own OS thread with a private runtime, so host
//! schedulers never share a thread pool with resource probing. Requests
//! flow through [`TelemetryHandle`]; `getUsage` requests drain through a
//! single queue task (never two probes in flight), `getProcesses` requests
//! through an independent one that may run concurrently with usage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};

use crate::core::config::Config;

use super::protocol::{WorkerAction, WorkerRequest, WorkerResponse};
use super::source::{ProcessSource, SysinfoProcesses, SysinfoUsage, UsageSource};
use super::{ProcessSample, ResourceSnapshot};

type Envelope = (WorkerRequest, oneshot::Sender<WorkerResponse>);

/// Host-side facade over the telemetry worker.
///
/// Tolerates a worker that is not yet ready or has died: `get_usage`
/// returns a zero-valued snapshot and `get_processes` an empty list in
/// those cases, never an error: a telemetry panel must not take the rest
/// of the application down with it.
pub struct TelemetryHandle {
    request_tx: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
    ready_rx: watch::Receiver<bool>,
    next_id: AtomicU64,
}

impl TelemetryHandle {
    /// Spawn the worker with the real sysinfo-backed sources.
    pub fn spawn(config: &Config) -> Self {
        let usage = SysinfoUsage::new(config.cache_ttl(), config.disk_probing());
        Self::spawn_with_sources(Box::new(usage), Box::new(SysinfoProcesses::new()))
    }

    /// Spawn the worker with injected sources. This is the seam tests use
    /// to verify queueing behavior with instrumented probes.
    pub fn spawn_with_sources(
        usage: Box<dyn UsageSource>,
        processes: Box<dyn ProcessSource>,
    ) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel::<Envelope>();
        let (ready_tx, ready_rx) = watch::channel(false);

        let spawned = thread::Builder::new()
            .name("telemetry-worker".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_time()
                    .thread_name("telemetry-worker")
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        log::error!("telemetry worker runtime failed to start: {e}");
                        return;
                    }
                };
                runtime.block_on(worker_loop(request_rx, ready_tx, usage, processes));
            });
        if let Err(e) = spawned {
            // Handle stays usable; it just never turns ready and keeps
            // answering with zero snapshots.
            log::error!("failed to spawn telemetry worker thread: {e}");
        }

        Self {
            request_tx: Mutex::new(Some(request_tx)),
            ready_rx,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Wait until the worker has signalled readiness (or died). This is
    /// the in-process form of the protocol's reserved
    /// [`READY_ID`](super::protocol::READY_ID) startup message.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready_rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Current resource snapshot; zero-valued if the worker cannot answer.
    pub async fn get_usage(&self) -> ResourceSnapshot {
        match self.request(WorkerAction::GetUsage).await {
            Some(resp) if resp.success => resp
                .data
                .and_then(|data| serde_json::from_value(data).ok())
                .unwrap_or_else(ResourceSnapshot::zero),
            _ => ResourceSnapshot::zero(),
        }
    }

    /// Top resource-consuming processes; empty if the worker cannot answer.
    pub async fn get_processes(&self) -> Vec<ProcessSample> {
        match self.request(WorkerAction::GetProcesses).await {
            Some(resp) if resp.success => resp
                .data
                .and_then(|data| serde_json::from_value(data).ok())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Stop accepting requests and let the worker drain and exit.
    pub fn shutdown(&self) {
        self.request_tx.lock().take();
    }

    async fn request(&self, action: WorkerAction) -> Option<WorkerResponse> {
        if !self.is_ready() {
            return None;
        }
        let sender = self.request_tx.lock().as_ref()?.clone();
        let id = format!("req-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = WorkerRequest {
            id,
            action,
            params: None,
        };
        sender.send((request, reply_tx)).ok()?;
        reply_rx.await.ok()
    }
}

async fn worker_loop(
    mut request_rx: mpsc::UnboundedReceiver<Envelope>,
    ready_tx: watch::Sender<bool>,
    usage: Box<dyn UsageSource>,
    processes: Box<dyn ProcessSource>,
) {
    let (usage_tx, mut usage_rx) = mpsc::unbounded_channel::<Envelope>();
    let (proc_tx, mut proc_rx) = mpsc::unbounded_channel::<Envelope>();

    // The usage queue: one probe in flight at a time. A failed probe
    // answers that one request and the queue keeps serving.
    let usage_task = tokio::spawn(async move {
        let mut source = usage;
        while let Some((req, reply)) = usage_rx.recv().await {
            let response = match source.collect_usage() {
                Ok(snapshot) => match serde_json::to_value(&snapshot) {
                    Ok(data) => WorkerResponse::ok(req.id, data),
                    Err(e) => WorkerResponse::err(req.id, e.to_string()),
                },
                Err(e) => WorkerResponse::err(req.id, e.to_string()),
            };
            let _ = reply.send(response);
        }
    });

    // Process listings run independently of the usage queue.
    let proc_task = tokio::spawn(async move {
        let mut source = processes;
        while let Some((req, reply)) = proc_rx.recv().await {
            let samples = source.collect_processes();
            let response = match serde_json::to_value(&samples) {
                Ok(data) => WorkerResponse::ok(req.id, data),
                Err(e) => WorkerResponse::err(req.id, e.to_string()),
            };
            let _ = reply.send(response);
        }
    });

    // Queues are live: tell the host. A host-boundary transport would send
    // the protocol's reserved READY_ID response here instead.
    let _ = ready_tx.send(true);
    log::debug!("telemetry worker ready");

    while let Some((req, reply)) = request_rx.recv().await {
        let routed = match req.action {
            WorkerAction::GetUsage => usage_tx.send((req, reply)),
            WorkerAction::GetProcesses => proc_tx.send((req, reply)),
        };
        if let Err(mpsc::error::SendError((req, reply))) = routed {
            let _ = reply.send(WorkerResponse::err(req.id, "worker queue closed"));
        }
    }

    drop(usage_tx);
    drop(proc_tx);
    let _ = usage_task.await;
    let _ = proc_task.await;
    log::debug!("telemetry worker stopped");
}
