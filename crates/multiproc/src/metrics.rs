// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics publisher pushing worker metrics to a Prometheus pushgateway.
//!
//! A publisher is only constructed when the gateway endpoint answers with
//! HTTP 200 within 5 seconds. Push failures are logged and swallowed; the
//! metrics channel must never take a worker group down.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};

/// The only supported pushgateway backend.
pub const PROMETHEUS_BACKEND: &str = "prometheus";

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Metric names the agent exports, mapped to their monitoring-system names.
const METRICS_MAPPING: &[(&str, &str)] =
    &[("world_size", "lattice_agent_monitor_world_size")];

fn mapped_name(name: &str) -> Option<&'static str> {
    METRICS_MAPPING
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
}

/// Validated pushgateway settings.
#[derive(Debug, Clone)]
pub struct MetricPublisherConfig {
    pub backend: String,
    pub endpoint: String,
    pub job_id: String,
}

impl MetricPublisherConfig {
    /// Validate the monitor config map; `None` disables publishing.
    ///
    /// Keys: `metric_pushgateway_backend`, `metric_pushgateway_endpoint`,
    /// `metric_pushgateway_job_id`.
    pub fn from_monitor_config(config: &HashMap<String, String>) -> Option<Self> {
        let backend = config.get("metric_pushgateway_backend").cloned().unwrap_or_default();
        let endpoint = config.get("metric_pushgateway_endpoint").cloned().unwrap_or_default();
        let job_id = config.get("metric_pushgateway_job_id").cloned().unwrap_or_default();

        if backend != PROMETHEUS_BACKEND {
            tracing::info!(backend, "invalid metric pushgateway backend");
            return None;
        }
        if endpoint.is_empty() {
            tracing::info!("empty metric pushgateway endpoint");
            return None;
        }
        if job_id.is_empty() {
            tracing::info!("empty metric pushgateway job id");
            return None;
        }
        Some(Self { backend, endpoint, job_id })
    }
}

/// Pushes gauge updates to a Prometheus pushgateway.
pub struct MetricPublisher {
    registry: Registry,
    gauges: Mutex<HashMap<&'static str, Gauge>>,
    endpoint: String,
    job_name: String,
    agent: ureq::Agent,
}

impl MetricPublisher {
    /// Build a publisher from the monitor config, probing the gateway.
    ///
    /// Returns `None` when the config is invalid or the endpoint does not
    /// answer 200 within the probe timeout.
    pub fn from_monitor_config(config: &HashMap<String, String>) -> Option<Self> {
        let config = MetricPublisherConfig::from_monitor_config(config)?;
        let agent = ureq::AgentBuilder::new().timeout(PROBE_TIMEOUT).build();

        let probe_url = format!("http://{}", config.endpoint);
        match agent.get(&probe_url).call() {
            Ok(response) if response.status() == 200 => {}
            Ok(response) => {
                tracing::info!(endpoint = %config.endpoint, status = response.status(),
                    "metric pushgateway endpoint is not reachable");
                return None;
            }
            Err(e) => {
                tracing::info!(endpoint = %config.endpoint, error = %e,
                    "metric pushgateway endpoint is not reachable");
                return None;
            }
        }

        tracing::info!(?config, "metric publisher configured");
        Some(Self {
            registry: Registry::new(),
            gauges: Mutex::new(HashMap::new()),
            endpoint: config.endpoint.clone(),
            job_name: format!("lattice-agent-monitor-{}", config.job_id),
            agent,
        })
    }

    /// Push mapped metrics to the gateway. Never propagates errors.
    pub fn push(&self, metrics: &HashMap<String, String>) {
        let mut need_push = false;
        {
            let mut gauges = self.gauges.lock();
            for (name, raw_value) in metrics {
                let Some(mapped) = mapped_name(name) else { continue };
                let Ok(value) = raw_value.parse::<f64>() else {
                    tracing::info!(name, raw_value, "unparseable metric value");
                    continue;
                };
                let gauge = match gauges.get(mapped) {
                    Some(gauge) => gauge.clone(),
                    None => {
                        let opts = Opts::new(mapped, "lattice agent monitor metric");
                        let Ok(gauge) = Gauge::with_opts(opts) else { continue };
                        if self.registry.register(Box::new(gauge.clone())).is_err() {
                            continue;
                        }
                        gauges.insert(mapped, gauge.clone());
                        gauge
                    }
                };
                gauge.set(value);
                need_push = true;
            }
        }

        if need_push {
            if let Err(e) = self.push_to_gateway() {
                tracing::info!(endpoint = %self.endpoint, job = %self.job_name, error = %e,
                    "pushing metrics to gateway failed");
            }
        }
    }

    fn push_to_gateway(&self) -> Result<(), Box<dyn std::error::Error>> {
        let mut body = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut body)?;
        let url = format!("http://{}/metrics/job/{}", self.endpoint, self.job_name);
        self.agent
            .post(&url)
            .set("Content-Type", "text/plain")
            .send_bytes(&body)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
