// Metrics module
// Prometheus collectors for tool runs and gateway forwards

use anyhow::{Context, Result};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

use crate::tools::{ExecutionResult, ToolKind};

/// Collectors owned by one server
///
/// Each server gets its own registry, so two servers in one process (the
/// `run` launcher) do not clash on metric names.
#[derive(Clone)]
pub struct ToolMetrics {
    registry: Registry,
    executions: IntCounterVec,
    duration: HistogramVec,
    forwards: IntCounterVec,
}

impl ToolMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let executions = IntCounterVec::new(
            Opts::new("kali_mcp_tool_executions_total", "Tool executions by outcome"),
            &["tool", "outcome"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "kali_mcp_tool_duration_seconds",
                "Wall-clock duration of tool executions",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
            &["tool"],
        )?;
        let forwards = IntCounterVec::new(
            Opts::new("kali_mcp_gateway_forwards_total", "Gateway forwards by outcome"),
            &["tool", "outcome"],
        )?;

        registry.register(Box::new(executions.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(forwards.clone()))?;

        Ok(Self {
            registry,
            executions,
            duration,
            forwards,
        })
    }

    /// Record a finished tool run
    pub fn record_execution(&self, tool: ToolKind, result: &ExecutionResult, elapsed: Duration) {
        let outcome = if result.success { "success" } else { "failure" };
        self.executions
            .with_label_values(&[tool.as_str(), outcome])
            .inc();
        self.duration
            .with_label_values(&[tool.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a request rejected before execution
    pub fn record_rejection(&self, tool: ToolKind) {
        self.executions
            .with_label_values(&[tool.as_str(), "rejected"])
            .inc();
    }

    pub fn record_forward(&self, tool: &str, outcome: &str) {
        self.forwards.with_label_values(&[tool, outcome]).inc();
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output is not UTF-8")
    }
}
