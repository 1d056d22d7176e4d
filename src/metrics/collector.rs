//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Contadores por request que se muestran en la página `about`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Máximo de latencias guardadas para los percentiles
const MAX_LATENCIES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsData {
    total_requests: u64,

    /// Requests que terminaron en la respuesta genérica de error
    error_responses: u64,

    /// Latencias recientes en microsegundos
    latencies: VecDeque<u64>,

    /// Requests por handler (home, user, rss, ...)
    requests_per_handler: HashMap<String, u64>,

    /// Workers atendiendo una conexión ahora mismo
    active_workers: u64,

    posts_created: u64,
    logins: u64,
    registrations: u64,
}

/// Tipo de evento de identidad o contenido
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Login,
    Registration,
    PostCreated,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                latencies: VecDeque::with_capacity(MAX_LATENCIES),
                ..MetricsData::default()
            })),
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registra un request atendido
    pub fn record_request(&self, handler: &str, is_error: bool, latency: Duration) {
        let mut data = self.lock();

        data.total_requests += 1;
        if is_error {
            data.error_responses += 1;
        }

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);

        *data.requests_per_handler.entry(handler.to_string()).or_insert(0) += 1;
    }

    pub fn record_event(&self, event: Event) {
        let mut data = self.lock();
        match event {
            Event::Login => data.logins += 1,
            Event::Registration => data.registrations += 1,
            Event::PostCreated => data.posts_created += 1,
        }
    }

    pub fn increment_active_workers(&self) {
        self.lock().active_workers += 1;
    }

    pub fn decrement_active_workers(&self) {
        let mut data = self.lock();
        data.active_workers = data.active_workers.saturating_sub(1);
    }

    pub fn active_workers(&self) -> u64 {
        self.lock().active_workers
    }

    /// Obtiene un snapshot de las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.lock();
        let (p50, p95, p99, avg) = percentiles(&data.latencies);

        let mut handlers: Vec<(String, u64)> = data
            .requests_per_handler
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        handlers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        MetricsSnapshot {
            total_requests: data.total_requests,
            error_responses: data.error_responses,
            active_workers: data.active_workers,
            uptime_secs: self.start_time.elapsed().as_secs(),
            latency_p50_us: p50,
            latency_p95_us: p95,
            latency_p99_us: p99,
            latency_avg_us: avg,
            posts_created: data.posts_created,
            logins: data.logins,
            registrations: data.registrations,
            handlers,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Calcula p50, p95, p99 y promedio
fn percentiles(latencies: &VecDeque<u64>) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    let p50 = sorted[len * 50 / 100];
    let p95 = sorted[len * 95 / 100];
    let p99 = sorted[len * 99 / 100];
    let avg = sorted.iter().sum::<u64>() / len as u64;

    (p50, p95, p99, avg)
}

/// Snapshot de métricas
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub error_responses: u64,
    pub active_workers: u64,
    pub uptime_secs: u64,
    pub latency_p50_us: u64,
    pub latency_p95_us: u64,
    pub latency_p99_us: u64,
    pub latency_avg_us: u64,
    pub posts_created: u64,
    pub logins: u64,
    pub registrations: u64,
    /// Requests por handler, de más a menos usado
    pub handlers: Vec<(String, u64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_requests() {
        let collector = MetricsCollector::new();

        collector.record_request("home", false, Duration::from_millis(10));
        collector.record_request("home", false, Duration::from_millis(20));
        collector.record_request("error", true, Duration::from_millis(5));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.error_responses, 1);
        assert_eq!(snapshot.handlers[0], ("home".to_string(), 2));
    }

    #[test]
    fn test_percentiles() {
        let collector = MetricsCollector::new();
        for i in 1..=100 {
            collector.record_request("user", false, Duration::from_micros(i));
        }

        let snapshot = collector.snapshot();
        assert!(snapshot.latency_p50_us > 0);
        assert!(snapshot.latency_p95_us > snapshot.latency_p50_us);
        assert!(snapshot.latency_p99_us > snapshot.latency_p95_us);
    }

    #[test]
    fn test_active_workers_never_negative() {
        let collector = MetricsCollector::new();

        collector.increment_active_workers();
        collector.increment_active_workers();
        assert_eq!(collector.active_workers(), 2);

        collector.decrement_active_workers();
        collector.decrement_active_workers();
        collector.decrement_active_workers();
        assert_eq!(collector.active_workers(), 0);
    }

    #[test]
    fn test_events() {
        let collector = MetricsCollector::new();
        collector.record_event(Event::Registration);
        collector.record_event(Event::Login);
        collector.record_event(Event::Login);
        collector.record_event(Event::PostCreated);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.registrations, 1);
        assert_eq!(snapshot.logins, 2);
        assert_eq!(snapshot.posts_created, 1);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let collector = MetricsCollector::new();
        for i in 0..15_000 {
            collector.record_request("home", false, Duration::from_micros(i));
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_requests, 15_000);
        assert_eq!(collector.lock().latencies.len(), MAX_LATENCIES);
        // Solo quedan las más recientes
        assert!(snapshot.latency_p50_us >= 5_000);
    }
}
