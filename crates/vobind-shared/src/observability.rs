//! Observability features: structured logging and binding metrics

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use vobind_core::FieldErrors;

use crate::config::{LoggingConfig, ObservabilityConfig};

/// Global observability system
static OBSERVABILITY: OnceCell<ObservabilitySystem> = OnceCell::new();

/// Process-wide logging and metrics setup
pub struct ObservabilitySystem {
    metrics: Option<PrometheusHandle>,
}

impl ObservabilitySystem {
    /// Initialize the observability system; fails when called twice
    pub fn init(config: &ObservabilityConfig) -> anyhow::Result<()> {
        if OBSERVABILITY.get().is_some() {
            anyhow::bail!("Observability system already initialized");
        }

        Self::init_logging(&config.logging)?;

        let metrics = if config.metrics.enabled {
            Some(PrometheusBuilder::new().install_recorder()?)
        } else {
            None
        };

        OBSERVABILITY
            .set(Self { metrics })
            .map_err(|_| anyhow::anyhow!("Observability system already initialized"))?;

        info!(metrics = config.metrics.enabled, "Observability system initialized");
        Ok(())
    }

    /// Initialize structured logging
    fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
        let level = parse_level(&config.level);

        let env_filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let registry = tracing_subscriber::registry().with(env_filter);

        match config.format.to_lowercase().as_str() {
            "json" => {
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE);
                registry.with(json_layer).try_init()?;
            }
            _ => {
                let pretty_layer = tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_span_events(FmtSpan::CLOSE);
                registry.with(pretty_layer).try_init()?;
            }
        }

        Ok(())
    }

    /// Get the global observability system
    pub fn get() -> Option<&'static ObservabilitySystem> {
        OBSERVABILITY.get()
    }

    /// Handle for an adapter exposing the Prometheus text format
    pub fn metrics_handle(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Outcome label of one bind attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Ok,
    BodyError,
    BodyTooLarge,
    DefinitionError,
    InvalidJson,
    InvalidFields,
}

impl BindOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindOutcome::Ok => "ok",
            BindOutcome::BodyError => "body_error",
            BindOutcome::BodyTooLarge => "body_too_large",
            BindOutcome::DefinitionError => "definition_error",
            BindOutcome::InvalidJson => "invalid_json",
            BindOutcome::InvalidFields => "invalid_fields",
        }
    }
}

/// Request binding metrics
pub struct BindMetrics;

impl BindMetrics {
    /// Record one finished bind attempt
    pub fn bind_finished(outcome: BindOutcome, duration: Duration) {
        counter!("vobind_bind_total", "outcome" => outcome.as_str())
            .increment(1);
        histogram!("vobind_bind_duration_seconds", "outcome" => outcome.as_str())
            .record(duration.as_secs_f64());
    }

    /// Record every rejected field, labelled by error kind
    pub fn field_errors(errors: &FieldErrors) {
        for e in errors.iter() {
            counter!("vobind_field_errors_total", "kind" => e.kind.code())
                .increment(1);
        }
    }
}
