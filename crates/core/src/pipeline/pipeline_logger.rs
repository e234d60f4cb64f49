use std::collections::HashMap;
use std::time::Instant;

/// Observer for pipeline progress, per-stage timings and metrics.
///
/// Stages reported by the video pipeline are `decode`, `detect`, `track`,
/// `annotate` and `encode`; metrics are `detections` and `live_tracks`.
pub trait PipelineLogger: Send {
    fn progress(&mut self, current: usize, total: usize);

    /// How long `stage` took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Called once after the last frame. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logs throttled progress through `log::info!` and prints per-stage
/// averages and throughput when the run ends.
pub struct SummaryPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames_seen: usize,
}

impl SummaryPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
        }
    }

    /// Formatted report, or `None` before anything was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames_seen;
        let mut lines = vec![format!(
            "Run summary ({frames} frames, {:.1}s):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, durations) in stages {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }

        let mut metrics: Vec<_> = self.metrics.iter().collect();
        metrics.sort_by(|a, b| a.0.cmp(b.0));
        for (name, values) in metrics {
            let max = values.iter().copied().fold(0.0, f64::max);
            lines.push(format!("  {name}: avg {:.1}  max {max:.0}", mean(values)));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    /// Every `throttle_frames`-th frame and the last frame of a known total.
    fn should_report(&self, current: usize, total: usize) -> bool {
        current % self.throttle_frames == 0 || current == total
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for SummaryPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for SummaryPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = current;
        if !self.should_report(current, total) {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processing: {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Processing: {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("detect", 5.0);
        logger.metric("live_tracks", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values_per_stage() {
        let mut logger = SummaryPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("encode", 5.0);

        assert_eq!(logger.timings_for("detect").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("encode").unwrap(), &[5.0]);
        assert!(logger.timings_for("track").is_none());
    }

    #[test]
    fn test_metric_average() {
        let mut logger = SummaryPipelineLogger::new(10);
        logger.metric("detections", 3.0);
        logger.metric("detections", 4.0);
        assert_relative_eq!(mean(logger.metrics_for("detections").unwrap()), 3.5);
    }

    #[test]
    fn test_summary_lists_stages_metrics_and_throughput() {
        let mut logger = SummaryPipelineLogger::new(10);
        logger.progress(10, 10);
        logger.timing("detect", 20.0);
        logger.timing("annotate", 2.0);
        logger.metric("live_tracks", 1.0);
        logger.metric("live_tracks", 3.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Run summary (10 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("annotate"));
        assert!(summary.contains("live_tracks: avg 2.0  max 3"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(SummaryPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_frames_with_unknown_total() {
        let mut logger = SummaryPipelineLogger::new(10);
        for i in 1..=25 {
            logger.progress(i, 0);
        }
        assert_eq!(logger.frames_seen, 25);
    }

    #[rstest]
    #[case::first_frame(1, 100, false)]
    #[case::on_throttle(30, 100, true)]
    #[case::between(31, 100, false)]
    #[case::last_frame(100, 100, true)]
    #[case::unknown_total(45, 0, false)]
    #[case::unknown_total_on_throttle(60, 0, true)]
    fn test_progress_is_throttled(#[case] current: usize, #[case] total: usize, #[case] expected: bool) {
        assert_eq!(SummaryPipelineLogger::new(30).should_report(current, total), expected);
    }

    #[test]
    fn test_zero_throttle_is_clamped() {
        assert_eq!(SummaryPipelineLogger::new(0).throttle_frames, 1);
    }
}
