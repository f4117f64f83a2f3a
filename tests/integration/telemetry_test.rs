use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use procbridge::core::telemetry::{
    CpuMetricUnit, ProcessSample, ProcessSource, ResourceSnapshot, TelemetryHandle, UsageSource,
};
use procbridge::error::{BridgeError, Result};

/// Usage probe that records overlap: `overlapped` flips if two collects
/// are ever in flight at once.
struct SlowUsage {
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicBool>,
    overlapped: Arc<AtomicBool>,
}

impl UsageSource for SlowUsage {
    fn collect_usage(&mut self) -> Result<ResourceSnapshot> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        std::thread::sleep(Duration::from_millis(100));
        self.in_flight.store(false, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut snapshot = ResourceSnapshot::zero();
        snapshot.cpu_percent = 42.0;
        Ok(snapshot)
    }
}

struct FailingUsage {
    calls: Arc<AtomicUsize>,
}

impl UsageSource for FailingUsage {
    fn collect_usage(&mut self) -> Result<ResourceSnapshot> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            Err(BridgeError::worker("probe blew up"))
        } else {
            let mut snapshot = ResourceSnapshot::zero();
            snapshot.cpu_percent = 7.5;
            Ok(snapshot)
        }
    }
}

struct StaticProcesses;

impl ProcessSource for StaticProcesses {
    fn collect_processes(&mut self) -> Vec<ProcessSample> {
        vec![ProcessSample {
            pid: 4242,
            name: "fake-proc".to_string(),
            cpu_metric: 12.5,
            cpu_metric_unit: CpuMetricUnit::Percent,
            memory_mb: 128.0,
            memory_percent: 1.5,
        }]
    }
}

struct EmptyUsage;

impl UsageSource for EmptyUsage {
    fn collect_usage(&mut self) -> Result<ResourceSnapshot> {
        Ok(ResourceSnapshot::zero())
    }
}

struct EmptyProcesses;

impl ProcessSource for EmptyProcesses {
    fn collect_processes(&mut self) -> Vec<ProcessSample> {
        Vec::new()
    }
}

#[tokio::test]
async fn usage_requests_are_serialized_never_concurrent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let in_flight = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));

    let handle = TelemetryHandle::spawn_with_sources(
        Box::new(SlowUsage {
            calls: Arc::clone(&calls),
            in_flight: Arc::clone(&in_flight),
            overlapped: Arc::clone(&overlapped),
        }),
        Box::new(EmptyProcesses),
    );
    handle.wait_ready().await;

    let (a, b, c) = tokio::join!(handle.get_usage(), handle.get_usage(), handle.get_usage());

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!overlapped.load(Ordering::SeqCst), "probes overlapped");
    for snapshot in [a, b, c] {
        assert_eq!(snapshot.cpu_percent, 42.0);
    }

    handle.shutdown();
}

#[tokio::test]
async fn a_failed_probe_degrades_that_request_only() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handle = TelemetryHandle::spawn_with_sources(
        Box::new(FailingUsage {
            calls: Arc::clone(&calls),
        }),
        Box::new(EmptyProcesses),
    );
    handle.wait_ready().await;

    // First request hits the failing probe and comes back zeroed.
    let first = handle.get_usage().await;
    assert_eq!(first.cpu_percent, 0.0);

    // The worker survives and the next probe succeeds.
    let second = handle.get_usage().await;
    assert_eq!(second.cpu_percent, 7.5);

    handle.shutdown();
}

#[tokio::test]
async fn process_listing_flows_through_the_worker() {
    let handle =
        TelemetryHandle::spawn_with_sources(Box::new(EmptyUsage), Box::new(StaticProcesses));
    handle.wait_ready().await;

    let processes = handle.get_processes().await;
    assert_eq!(processes.len(), 1);
    assert_eq!(processes[0].pid, 4242);
    assert_eq!(processes[0].name, "fake-proc");

    handle.shutdown();
}

#[tokio::test]
async fn requests_after_shutdown_fall_back_to_defaults() {
    let handle =
        TelemetryHandle::spawn_with_sources(Box::new(EmptyUsage), Box::new(StaticProcesses));
    handle.wait_ready().await;
    handle.shutdown();

    let snapshot = handle.get_usage().await;
    assert_eq!(snapshot.cpu_percent, 0.0);
    assert!(handle.get_processes().await.is_empty());
}

#[tokio::test]
async fn readiness_is_observable_before_first_request() {
    let handle = TelemetryHandle::spawn_with_sources(Box::new(EmptyUsage), Box::new(EmptyProcesses));
    handle.wait_ready().await;
    assert!(handle.is_ready());
    handle.shutdown();
}
