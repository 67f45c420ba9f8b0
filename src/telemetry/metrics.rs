use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Extension, Request};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

/// Operation labels, index-aligned with the counter arrays.
const OPS: [&str; 5] = ["get", "put", "post", "delete", "other"];

/// Status class labels: 2xx, 3xx, 4xx, 5xx.
const CLASSES: [&str; 4] = ["2xx", "3xx", "4xx", "5xx"];

/// Histogram bucket upper bounds in seconds, exponential from 1ms.
const BUCKET_BOUNDS: [f64; 14] = [
    0.001, 0.002, 0.004, 0.008, 0.016, 0.032, 0.064, 0.128, 0.256, 0.512, 1.024, 2.048, 4.096,
    8.192,
];

/// Fixed-bucket latency histogram. Bucket counts are non-cumulative in
/// memory and accumulated at render time, as the exposition format expects.
struct Histogram {
    buckets: [AtomicU64; BUCKET_BOUNDS.len()],
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    fn observe(&self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        if let Some(idx) = BUCKET_BOUNDS.iter().position(|&bound| secs <= bound) {
            self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        }
        self.sum_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Node-wide request metrics.
///
/// Label cardinality is fixed (five ops, four status classes), so everything
/// lives in plain arrays of atomics and recording never allocates or locks.
pub struct Metrics {
    started: Instant,
    requests: [[AtomicU64; CLASSES.len()]; OPS.len()],
    in_flight: [AtomicI64; OPS.len()],
    duration: [Histogram; OPS.len()],
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests: std::array::from_fn(|_| std::array::from_fn(|_| AtomicU64::new(0))),
            in_flight: std::array::from_fn(|_| AtomicI64::new(0)),
            duration: std::array::from_fn(|_| Histogram::new()),
        }
    }

    fn op_index(method: &Method) -> usize {
        match *method {
            Method::GET => 0,
            Method::PUT => 1,
            Method::POST => 2,
            Method::DELETE => 3,
            _ => 4,
        }
    }

    fn class_index(status: StatusCode) -> Option<usize> {
        match status.as_u16() {
            200..=299 => Some(0),
            300..=399 => Some(1),
            400..=499 => Some(2),
            500..=599 => Some(3),
            _ => None,
        }
    }

    pub fn request_started(&self, method: &Method) {
        self.in_flight[Self::op_index(method)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_finished(&self, method: &Method, status: StatusCode, elapsed: Duration) {
        let op = Self::op_index(method);
        self.in_flight[op].fetch_sub(1, Ordering::Relaxed);
        if let Some(class) = Self::class_index(status) {
            self.requests[op][class].fetch_add(1, Ordering::Relaxed);
        }
        self.duration[op].observe(elapsed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Renders the full exposition. Gauges and counters are emitted for every
    /// label combination so the series set stays stable across scrapes.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(8 * 1024);

        let _ = writeln!(out, "# HELP requests_total Total HTTP requests handled");
        let _ = writeln!(out, "# TYPE requests_total counter");
        for (op_idx, op) in OPS.iter().enumerate() {
            for (class_idx, class) in CLASSES.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "requests_total{{op=\"{}\",class=\"{}\"}} {}",
                    op,
                    class,
                    self.requests[op_idx][class_idx].load(Ordering::Relaxed)
                );
            }
        }

        let _ = writeln!(
            out,
            "# HELP request_duration_seconds HTTP request latency in seconds"
        );
        let _ = writeln!(out, "# TYPE request_duration_seconds histogram");
        for (op_idx, op) in OPS.iter().enumerate() {
            let histogram = &self.duration[op_idx];
            let mut cumulative = 0u64;
            for (bucket_idx, bound) in BUCKET_BOUNDS.iter().enumerate() {
                cumulative += histogram.buckets[bucket_idx].load(Ordering::Relaxed);
                let _ = writeln!(
                    out,
                    "request_duration_seconds_bucket{{op=\"{}\",le=\"{}\"}} {}",
                    op, bound, cumulative
                );
            }
            let count = histogram.count.load(Ordering::Relaxed);
            let _ = writeln!(
                out,
                "request_duration_seconds_bucket{{op=\"{}\",le=\"+Inf\"}} {}",
                op, count
            );
            let _ = writeln!(
                out,
                "request_duration_seconds_sum{{op=\"{}\"}} {}",
                op,
                histogram.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
            );
            let _ = writeln!(out, "request_duration_seconds_count{{op=\"{}\"}} {}", op, count);
        }

        let _ = writeln!(out, "# HELP in_flight_requests Requests currently being served");
        let _ = writeln!(out, "# TYPE in_flight_requests gauge");
        for (op_idx, op) in OPS.iter().enumerate() {
            let _ = writeln!(
                out,
                "in_flight_requests{{op=\"{}\"}} {}",
                op,
                self.in_flight[op_idx].load(Ordering::Relaxed)
            );
        }

        let _ = writeln!(out, "# HELP uptime_seconds Seconds since process start");
        let _ = writeln!(out, "# TYPE uptime_seconds gauge");
        let _ = writeln!(out, "uptime_seconds {}", self.uptime_seconds());

        let _ = writeln!(out, "# HELP build_info Build metadata");
        let _ = writeln!(out, "# TYPE build_info gauge");
        let _ = writeln!(
            out,
            "build_info{{version=\"{}\",git_sha=\"{}\"}} 1",
            env!("CARGO_PKG_VERSION"),
            option_env!("GIT_SHA").unwrap_or("unknown")
        );

        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Axum middleware instrumenting every request with the in-flight gauge, the
/// per-op latency histogram, and the status-class counter.
pub async fn track_request(
    Extension(metrics): Extension<Arc<Metrics>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    metrics.request_started(&method);
    let start = Instant::now();

    let response = next.run(req).await;

    metrics.request_finished(&method, response.status(), start.elapsed());
    response
}
