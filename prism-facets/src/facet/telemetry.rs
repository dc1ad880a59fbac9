//! Facet phase execution telemetry

use crate::search::ContextId;
use std::time::Instant;
use tracing::{debug, warn};

/// Stage names recorded by the facet phase.
pub const STAGE_POST: &str = "post";
pub const STAGE_GLOBAL_COLLECTORS: &str = "global_collectors";
pub const STAGE_BUILD: &str = "build";

/// Summary of one facet phase execution
#[derive(Debug, Clone, Default)]
pub struct FacetPhaseMetrics {
    pub post_ms: f64,
    pub global_collectors_ms: f64,
    pub build_ms: f64,
    pub total_ms: f64,
    pub facet_count: usize,
    pub global_groups: usize,
    pub global_scans: u64,
}

/// Helper for tracking facet phase stages
pub struct PhaseTelemetry {
    start: Instant,
    last_mark: Instant,
    stages: Vec<(&'static str, f64)>,
}

impl PhaseTelemetry {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_mark: now,
            stages: Vec::new(),
        }
    }

    /// Mark the completion of a stage and record its duration
    pub fn mark_stage(&mut self, stage: &'static str) {
        let now = Instant::now();
        let duration_ms = (now - self.last_mark).as_secs_f64() * 1000.0;
        self.stages.push((stage, duration_ms));
        self.last_mark = now;
    }

    pub fn stage_duration(&self, stage: &str) -> f64 {
        self.stages
            .iter()
            .find(|(name, _)| *name == stage)
            .map(|(_, duration)| *duration)
            .unwrap_or(0.0)
    }

    pub fn finish(
        self,
        facet_count: usize,
        global_groups: usize,
        global_scans: u64,
    ) -> FacetPhaseMetrics {
        let elapsed = self.start.elapsed();
        metrics::histogram!("prism_facet_phase_duration_seconds").record(elapsed.as_secs_f64());

        FacetPhaseMetrics {
            post_ms: self.stage_duration(STAGE_POST),
            global_collectors_ms: self.stage_duration(STAGE_GLOBAL_COLLECTORS),
            build_ms: self.stage_duration(STAGE_BUILD),
            total_ms: elapsed.as_secs_f64() * 1000.0,
            facet_count,
            global_groups,
            global_scans,
        }
    }
}

impl Default for PhaseTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_phase_success(context: &ContextId, metrics: &FacetPhaseMetrics) {
    metrics::counter!("prism_facet_phase_executions_total", "outcome" => "success").increment(1);
    debug!(
        context = %context,
        facets = metrics.facet_count,
        global_groups = metrics.global_groups,
        global_scans = metrics.global_scans,
        post_ms = metrics.post_ms,
        global_collectors_ms = metrics.global_collectors_ms,
        build_ms = metrics.build_ms,
        total_ms = metrics.total_ms,
        "Facet phase executed"
    );
}

pub fn log_phase_failure(context: &ContextId, error: &crate::Error) {
    metrics::counter!("prism_facet_phase_executions_total", "outcome" => "failure").increment(1);
    warn!(
        context = %context,
        error = %error,
        facet = error.facet_name().unwrap_or("-"),
        "Facet phase failed"
    );
}
