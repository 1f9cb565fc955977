//! In-process metrics
//!
//! Labelled counters and gauges rendered in the Prometheus text format. The
//! cycle loop logs the rendering periodically; nothing here feeds a decision.
//!
//! Created: 2026-02-05

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fmt::Write;

pub const EXECUTIONS_TOTAL: &str = "executions_total";
pub const PROFIT_USD: &str = "profit_usd";
pub const ROUTES_GENERATED: &str = "routes_generated";
pub const CANDIDATES_ACCEPTED: &str = "candidates_accepted";
pub const CYCLES_PAUSED: &str = "cycles_paused";

type Labels = Vec<(&'static str, String)>;
type SeriesKey = (&'static str, Labels);

#[derive(Debug, Default)]
pub struct Metrics {
    counters: DashMap<SeriesKey, u64>,
    gauges: DashMap<SeriesKey, f64>,
}

fn key(name: &'static str, labels: &[(&'static str, &str)]) -> SeriesKey {
    let mut labels: Labels = labels.iter().map(|(k, v)| (*k, v.to_string())).collect();
    labels.sort();
    (name, labels)
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, name: &'static str, labels: &[(&'static str, &str)]) {
        self.add(name, labels, 1);
    }

    pub fn add(&self, name: &'static str, labels: &[(&'static str, &str)], n: u64) {
        *self.counters.entry(key(name, labels)).or_insert(0) += n;
    }

    pub fn set_gauge(&self, name: &'static str, labels: &[(&'static str, &str)], value: f64) {
        self.gauges.insert(key(name, labels), value);
    }

    pub fn add_gauge(&self, name: &'static str, labels: &[(&'static str, &str)], delta: f64) {
        *self.gauges.entry(key(name, labels)).or_insert(0.0) += delta;
    }

    pub fn counter(&self, name: &'static str, labels: &[(&'static str, &str)]) -> u64 {
        self.counters.get(&key(name, labels)).map(|v| *v).unwrap_or(0)
    }

    pub fn gauge(&self, name: &'static str, labels: &[(&'static str, &str)]) -> f64 {
        self.gauges.get(&key(name, labels)).map(|v| *v).unwrap_or(0.0)
    }

    // ── Pipeline helpers ────────────────────────────────────────────

    pub fn record_routes(&self, chain: &str, generated: usize, accepted: usize) {
        self.add(ROUTES_GENERATED, &[("chain", chain)], generated as u64);
        self.add(CANDIDATES_ACCEPTED, &[("chain", chain)], accepted as u64);
    }

    /// `status` is the execution row status, or "skipped".
    pub fn record_execution(&self, chain: &str, status: &str, profit_usd: Option<f64>) {
        self.inc(EXECUTIONS_TOTAL, &[("chain", chain), ("status", status)]);
        if let Some(p) = profit_usd {
            self.add_gauge(PROFIT_USD, &[("chain", chain)], p);
        }
    }

    pub fn record_pause(&self, reason: &str) {
        self.inc(CYCLES_PAUSED, &[("reason", reason)]);
    }

    /// Prometheus text exposition, series sorted by name then labels.
    pub fn render(&self) -> String {
        let mut counters: BTreeMap<SeriesKey, u64> = BTreeMap::new();
        for e in self.counters.iter() {
            counters.insert(e.key().clone(), *e.value());
        }
        let mut gauges: BTreeMap<SeriesKey, f64> = BTreeMap::new();
        for e in self.gauges.iter() {
            gauges.insert(e.key().clone(), *e.value());
        }

        let mut out = String::new();
        let mut last: Option<&str> = None;
        for ((name, labels), v) in &counters {
            if last != Some(*name) {
                let _ = writeln!(out, "# TYPE {} counter", name);
                last = Some(*name);
            }
            let _ = writeln!(out, "{}{} {}", name, render_labels(labels), v);
        }
        last = None;
        for ((name, labels), v) in &gauges {
            if last != Some(*name) {
                let _ = writeln!(out, "# TYPE {} gauge", name);
                last = Some(*name);
            }
            let _ = writeln!(out, "{}{} {}", name, render_labels(labels), v);
        }
        out
    }
}

fn render_labels(labels: &[(&'static str, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let inner: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{{{}}}", inner.join(","))
}
