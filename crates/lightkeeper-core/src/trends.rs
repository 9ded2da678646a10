//! Read model for the dashboard charts.
//!
//! Runs with a malformed timestamp are dropped here; everything else is a
//! pure function of the stored runs.

use lightkeeper_types::report::{Device, LighthouseScore, ReportRun};
use serde::Serialize;

/// One chart point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Run date, `YYYY-MM-DD`.
    pub date: String,
    pub performance: u32,
    pub accessibility: u32,
    pub best_practices: u32,
    pub seo: u32,
}

/// Keep runs with a well-formed timestamp, newest first.
pub fn chronological(runs: Vec<ReportRun>) -> Vec<ReportRun> {
    let mut timed: Vec<_> = runs
        .into_iter()
        .filter_map(|run| match run.run_time() {
            Some(at) => Some((at, run)),
            None => {
                tracing::debug!(timestamp = %run.timestamp, "dropping run with malformed timestamp");
                None
            }
        })
        .collect();
    timed.sort_by(|a, b| b.0.cmp(&a.0));
    timed.into_iter().map(|(_, run)| run).collect()
}

/// Mean of every mobile and desktop score across all reports of all runs,
/// rounded half up. All zeros when there is nothing to average.
pub fn average_scores(runs: &[ReportRun]) -> LighthouseScore {
    let mut totals = [0u64; 4];
    let mut count = 0u64;
    let scores = runs
        .iter()
        .flat_map(|run| &run.reports)
        .flat_map(|report| [report.scores.mobile, report.scores.desktop])
        .flatten();
    for s in scores {
        totals[0] += u64::from(s.performance);
        totals[1] += u64::from(s.accessibility);
        totals[2] += u64::from(s.best_practices);
        totals[3] += u64::from(s.seo);
        count += 1;
    }
    if count == 0 {
        return LighthouseScore::default();
    }

    let mean = |total: u64| u32::try_from((total * 2 + count) / (count * 2)).unwrap_or(u32::MAX);
    LighthouseScore {
        performance: mean(totals[0]),
        accessibility: mean(totals[1]),
        best_practices: mean(totals[2]),
        seo: mean(totals[3]),
    }
}

/// Chart points for `device` from the newest `limit` runs, oldest first.
///
/// `runs` must be newest first (see [`chronological`]). Each point uses
/// the first report of its run; runs without scores for `device` yield no
/// point.
pub fn trend_data(runs: &[ReportRun], device: Device, limit: usize) -> Vec<TrendPoint> {
    runs.iter()
        .take(limit)
        .rev()
        .filter_map(|run| {
            let at = run.run_time()?;
            let scores = run.reports.first()?.scores.get(device)?;
            Some(TrendPoint {
                date: at.format("%Y-%m-%d").to_string(),
                performance: scores.performance,
                accessibility: scores.accessibility,
                best_practices: scores.best_practices,
                seo: scores.seo,
            })
        })
        .collect()
}
