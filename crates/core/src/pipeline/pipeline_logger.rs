use std::collections::BTreeMap;
use std::time::Instant;

/// Cross-cutting logger for pipeline stage events.
///
/// Decouples the use case from how progress is reported so the CLI, a
/// surrounding service and the tests can each observe a run differently.
pub trait PipelineLogger: Send {
    /// Report how many regions have finished extraction.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. region count, contour points).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Aggregates stage timings and metrics and reports them through `log`.
///
/// Stages are reported in the order they first ran.
pub struct SummaryPipelineLogger {
    stage_order: Vec<String>,
    timings: BTreeMap<String, Vec<f64>>,
    metrics: BTreeMap<String, f64>,
    start_time: Instant,
    messages: Vec<String>,
}

impl SummaryPipelineLogger {
    pub fn new() -> Self {
        Self {
            stage_order: Vec::new(),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!("Face processing summary ({elapsed_ms:.1}ms total):")];

        for stage in &self.stage_order {
            let total_ms: f64 = self.timings[stage].iter().sum();
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("  {stage:12}: {total_ms:8.1}ms  ({pct:4.1}%)"));
        }

        for (name, value) in &self.metrics {
            lines.push(format!("  {name}: {value}"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metric_value(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl Default for SummaryPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for SummaryPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        if total > 0 && current == total {
            log::info!("Extracted contours for {total} regions");
        } else {
            log::debug!("Region {current}/{total} extracted");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        if !self.timings.contains_key(stage) {
            self.stage_order.push(stage.to_string());
        }
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.insert(name.to_string(), value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 12);
        logger.timing("align", 5.0);
        logger.metric("regions", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = SummaryPipelineLogger::new();
        logger.timing("extract", 20.0);
        logger.timing("extract", 30.0);
        logger.timing("align", 5.0);

        let extract = logger.timings_for("extract").unwrap();
        assert_eq!(extract.len(), 2);
        assert_relative_eq!(extract[1], 30.0);
        assert_eq!(logger.timings_for("align").unwrap().len(), 1);
    }

    #[test]
    fn test_metric_keeps_latest_value() {
        let mut logger = SummaryPipelineLogger::new();
        logger.metric("regions", 3.0);
        logger.metric("regions", 7.0);
        assert_eq!(logger.metric_value("regions"), Some(7.0));
    }

    #[test]
    fn test_summary_lists_stages_in_run_order() {
        let mut logger = SummaryPipelineLogger::new();
        logger.timing("subdivide", 2.0);
        logger.timing("align", 1.0);
        logger.metric("contour_points", 42.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Face processing summary"));
        assert!(summary.find("subdivide").unwrap() < summary.find("align").unwrap());
        assert!(summary.contains("contour_points: 42"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(SummaryPipelineLogger::new().summary_string().is_none());
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = SummaryPipelineLogger::default();
        logger.info("aligned 120x160");
        assert_eq!(logger.messages(), ["aligned 120x160".to_string()]);
    }
}
