//! Per-row results and the end-of-run summary

use std::{io, time::Duration};

use herald_dispatch::{MetricsSnapshot, Outcome};
use serde::Serialize;

use crate::rows::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowStatus {
    Sent,
    Failed,
}

impl RowStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "Sent",
            Self::Failed => "Failed",
        }
    }
}

/// What happened to one row of the input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowResult {
    pub row: usize,
    pub phone: String,
    pub status: RowStatus,
    /// Delivery attempts made, zero for rows that were never enqueued
    pub attempts: u32,
    /// The API's message id on success, the failure reason otherwise
    pub details: String,
}

impl RowResult {
    /// Result for a row that failed validation and was never enqueued.
    ///
    /// Returns `None` if the row is valid.
    #[must_use]
    pub fn rejected(entry: &Entry) -> Option<Self> {
        let reason = entry.parsed.as_ref().err()?;

        Some(Self {
            row: entry.row,
            phone: entry.phone.clone(),
            status: RowStatus::Failed,
            attempts: 0,
            details: reason.to_string(),
        })
    }

    /// Result for a row whose message went through the dispatcher.
    #[must_use]
    pub fn dispatched(entry: &Entry, outcome: &Outcome) -> Self {
        let (status, attempts, details) = match outcome {
            Ok(delivered) => (
                RowStatus::Sent,
                delivered.attempts,
                delivered
                    .receipt
                    .id
                    .clone()
                    .unwrap_or_else(|| "Delivered".to_string()),
            ),
            Err(err) => (
                RowStatus::Failed,
                err.attempts().unwrap_or_default(),
                err.to_string(),
            ),
        };

        Self {
            row: entry.row,
            phone: entry.phone.clone(),
            status,
            attempts,
            details,
        }
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.status == RowStatus::Sent
    }
}

/// Everything `herald send` prints once the run is over.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub results: Vec<RowResult>,
    pub metrics: MetricsSnapshot,
    pub elapsed_secs: f64,
    /// Rows processed per second of wall-clock time
    pub throughput: f64,
}

impl Summary {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(results: Vec<RowResult>, metrics: MetricsSnapshot, elapsed: Duration) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            results.len() as f64 / elapsed_secs
        } else {
            0.0
        };

        Self {
            results,
            metrics,
            elapsed_secs,
            throughput,
        }
    }

    #[must_use]
    pub fn sent(&self) -> usize {
        self.results.iter().filter(|result| result.is_sent()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.sent()
    }

    /// Render as a table followed by the totals.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn write_text(&self, out: &mut impl io::Write) -> io::Result<()> {
        writeln!(
            out,
            "{:<5} {:<18} {:<8} {:<9} DETAILS",
            "ROW", "PHONE", "STATUS", "ATTEMPTS"
        )?;
        writeln!(out, "{}", "-".repeat(72))?;

        for result in &self.results {
            writeln!(
                out,
                "{:<5} {:<18} {:<8} {:<9} {}",
                result.row,
                result.phone,
                result.status.as_str(),
                result.attempts,
                result.details
            )?;
        }

        let totals = &self.metrics.totals;
        writeln!(out)?;
        writeln!(out, "Sent: {}  Failed: {}", self.sent(), self.failed())?;
        writeln!(
            out,
            "Batches: {}  Retries: {}  Average batch: {:.2}ms",
            totals.total_batches, totals.total_retries, totals.average_batch_duration_ms
        )?;
        writeln!(
            out,
            "Completed in {:.2}s ({:.2} messages per second)",
            self.elapsed_secs, self.throughput
        )
    }

    /// Render as a single JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub fn write_json(&self, out: &mut impl io::Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herald_dispatch::{
        Delivered, DeliveryError, DispatchError, DispatchTotals, Receipt, TemporaryError,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rows;

    fn entries() -> Vec<Entry> {
        rows::read("Mobile,Message\n919876543210,Hi\n1234,Bad\n918765432109,Hey\n".as_bytes())
            .unwrap()
    }

    fn summary() -> Summary {
        let entries = entries();
        let delivered: Outcome = Ok(Delivered {
            receipt: Receipt::new("wamid.1"),
            attempts: 1,
            latency: Duration::from_millis(5),
        });
        let failed: Outcome = Err(DispatchError::Exhausted {
            attempts: 3,
            source: DeliveryError::from(TemporaryError::Timeout("30s".into())),
        });

        let results = vec![
            RowResult::dispatched(&entries[0], &delivered),
            RowResult::rejected(&entries[1]).unwrap(),
            RowResult::dispatched(&entries[2], &failed),
        ];

        let metrics = MetricsSnapshot {
            totals: DispatchTotals {
                total_sent: 1,
                total_failed: 1,
                total_batches: 3,
                total_retries: 2,
                average_batch_duration_ms: 5.0,
            },
            ..MetricsSnapshot::default()
        };

        Summary::new(results, metrics, Duration::from_secs(2))
    }

    #[test]
    fn valid_rows_are_not_rejected() {
        assert_eq!(RowResult::rejected(&entries()[0]), None);
    }

    #[test]
    fn counts_and_throughput() {
        let summary = summary();

        assert_eq!(summary.sent(), 1);
        assert_eq!(summary.failed(), 2);
        assert!((summary.throughput - 1.5).abs() < f64::EPSILON);
        assert_eq!(summary.results[1].details, "Invalid phone number");
        assert_eq!(summary.results[2].attempts, 3);
    }

    #[test]
    fn text_output() {
        let mut out = Vec::new();
        summary().write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("919876543210"));
        assert!(text.contains("wamid.1"));
        assert!(text.contains("Invalid phone number"));
        assert!(text.contains("Sent: 1  Failed: 2"));
        assert!(text.contains("1.50 messages per second"));
    }

    #[test]
    fn json_output() {
        let mut out = Vec::new();
        summary().write_json(&mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["results"][0]["status"], "Sent");
        assert_eq!(value["results"][1]["status"], "Failed");
        assert_eq!(value["metrics"]["total_sent"], 1);
        assert_eq!(value["elapsed_secs"], 2.0);
    }
}
