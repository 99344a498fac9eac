//! Per-stage outcome reporting (§4.3 "Failure model", §7 "Propagation policy").
//!
//! Every stage function processes a batch of independent work items and
//! returns one of these instead of failing the whole run on the first bad
//! record.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub total: usize,
    pub succeeded: usize,
    /// (work item key, error message) pairs, one per failed item.
    pub failed: Vec<(String, String)>,
}

impl StageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.total += 1;
        self.failed.push((key.into(), message.into()));
    }

    pub fn is_fully_successful(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: StageReport) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed.extend(other.failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_successes_and_failures() {
        let mut report = StageReport::new();
        report.record_success();
        report.record_success();
        report.record_failure("hum0014-v3-ja", "parse error");

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_fully_successful());
    }

    #[test]
    fn merge_combines_two_reports() {
        let mut a = StageReport::new();
        a.record_success();
        let mut b = StageReport::new();
        b.record_failure("x", "boom");

        a.merge(b);
        assert_eq!(a.total, 2);
        assert_eq!(a.succeeded, 1);
        assert_eq!(a.failed.len(), 1);
    }
}
