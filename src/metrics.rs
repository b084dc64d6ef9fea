//! Service metrics with Prometheus text exposition

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Prometheus-compatible metrics registry
pub struct MetricsRegistry {
    started: Instant,

    pub http_requests_total: AtomicU64,
    pub http_errors_total: AtomicU64,

    pub spins_total: AtomicU64,
    pub spins_failed_total: AtomicU64,
    pub bonus_spins_total: AtomicU64,
    pub wagered_total: AtomicU64,
    pub paid_out_total: AtomicU64,
    spin_duration_micros_total: AtomicU64,

    pub accounts_created_total: AtomicU64,
    pub daily_bonuses_total: AtomicU64,
    pub active_accounts: AtomicU64,
}

/// Point-in-time copy, served as JSON
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub http_requests_total: u64,
    pub spins_total: u64,
    pub spins_failed_total: u64,
    pub bonus_spins_total: u64,
    pub wagered_total: u64,
    pub paid_out_total: u64,
    /// Paid out over wagered; 0 before the first spin
    pub observed_rtp: f64,
    pub avg_spin_ms: f64,
    pub active_accounts: u64,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            http_requests_total: AtomicU64::new(0),
            http_errors_total: AtomicU64::new(0),
            spins_total: AtomicU64::new(0),
            spins_failed_total: AtomicU64::new(0),
            bonus_spins_total: AtomicU64::new(0),
            wagered_total: AtomicU64::new(0),
            paid_out_total: AtomicU64::new(0),
            spin_duration_micros_total: AtomicU64::new(0),
            accounts_created_total: AtomicU64::new(0),
            daily_bonuses_total: AtomicU64::new(0),
            active_accounts: AtomicU64::new(0),
        }
    }

    pub fn record_http_request(&self, success: bool) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.http_errors_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_spin(&self, wagered: u64, paid_out: u64, bonus_spin: bool, elapsed: Duration) {
        self.spins_total.fetch_add(1, Ordering::Relaxed);
        if bonus_spin {
            self.bonus_spins_total.fetch_add(1, Ordering::Relaxed);
        }
        self.wagered_total.fetch_add(wagered, Ordering::Relaxed);
        self.paid_out_total.fetch_add(paid_out, Ordering::Relaxed);
        self.spin_duration_micros_total
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_spin_failure(&self) {
        self.spins_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_account_created(&self) {
        self.accounts_created_total.fetch_add(1, Ordering::Relaxed);
        self.active_accounts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_active_accounts(&self, count: u64) {
        self.active_accounts.store(count, Ordering::Relaxed);
    }

    pub fn record_daily_bonus(&self) {
        self.daily_bonuses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let spins = self.spins_total.load(Ordering::Relaxed);
        let wagered = self.wagered_total.load(Ordering::Relaxed);
        let paid_out = self.paid_out_total.load(Ordering::Relaxed);
        let micros = self.spin_duration_micros_total.load(Ordering::Relaxed);

        MetricsSnapshot {
            uptime_seconds: self.started.elapsed().as_secs(),
            http_requests_total: self.http_requests_total.load(Ordering::Relaxed),
            spins_total: spins,
            spins_failed_total: self.spins_failed_total.load(Ordering::Relaxed),
            bonus_spins_total: self.bonus_spins_total.load(Ordering::Relaxed),
            wagered_total: wagered,
            paid_out_total: paid_out,
            observed_rtp: if wagered > 0 { paid_out as f64 / wagered as f64 } else { 0.0 },
            avg_spin_ms: if spins > 0 { micros as f64 / spins as f64 / 1000.0 } else { 0.0 },
            active_accounts: self.active_accounts.load(Ordering::Relaxed),
        }
    }

    /// Generate Prometheus metrics format
    pub fn to_prometheus_format(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = String::new();

        push_metric(&mut output, "uptime_seconds", "gauge", "Seconds since start", snapshot.uptime_seconds);
        push_metric(&mut output, "http_requests_total", "counter", "Total number of HTTP requests", snapshot.http_requests_total);
        push_metric(
            &mut output,
            "http_errors_total",
            "counter",
            "HTTP requests answered with an error status",
            self.http_errors_total.load(Ordering::Relaxed),
        );
        push_metric(&mut output, "spins_total", "counter", "Settled spins", snapshot.spins_total);
        push_metric(
            &mut output,
            "spins_failed_total",
            "counter",
            "Spins rejected or failed before settlement",
            snapshot.spins_failed_total,
        );
        push_metric(&mut output, "bonus_spins_total", "counter", "Settled bonus spins", snapshot.bonus_spins_total);
        push_metric(&mut output, "wagered_total", "counter", "Credits staked", snapshot.wagered_total);
        push_metric(&mut output, "paid_out_total", "counter", "Credits paid out", snapshot.paid_out_total);
        push_metric(
            &mut output,
            "accounts_created_total",
            "counter",
            "Accounts opened",
            self.accounts_created_total.load(Ordering::Relaxed),
        );
        push_metric(
            &mut output,
            "daily_bonuses_total",
            "counter",
            "Daily bonuses claimed",
            self.daily_bonuses_total.load(Ordering::Relaxed),
        );
        push_metric(&mut output, "active_accounts", "gauge", "Known accounts", snapshot.active_accounts);

        output.push_str(&format!(
            "# HELP royale_avg_spin_seconds Average spin processing time\n\
             # TYPE royale_avg_spin_seconds gauge\n\
             royale_avg_spin_seconds {}\n",
            snapshot.avg_spin_ms / 1000.0
        ));

        output
    }
}

fn push_metric(output: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    output.push_str(&format!(
        "# HELP royale_{name} {help}\n# TYPE royale_{name} {kind}\nroyale_{name} {value}\n\n"
    ));
}
