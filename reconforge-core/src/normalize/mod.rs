//! Normalization of raw tool output into a common findings schema

pub mod parsers;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::exec::{ExecutionResult, ExecutionStatus};
use crate::plan::SkipReason;

pub use parsers::normalize;

/// Kind of a normalized discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Subdomain,
    Url,
    HistoricalUrl,
    HttpService,
    DnsRecord,
    Technology,
    OpenPort,
    Screenshot,
    Directory,
    CrawledUrl,
    Parameter,
    /// Unparsable output carried through rather than dropped
    Raw,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Subdomain => "subdomain",
            FindingKind::Url => "url",
            FindingKind::HistoricalUrl => "historical_url",
            FindingKind::HttpService => "http_service",
            FindingKind::DnsRecord => "dns_record",
            FindingKind::Technology => "technology",
            FindingKind::OpenPort => "open_port",
            FindingKind::Screenshot => "screenshot",
            FindingKind::Directory => "directory",
            FindingKind::CrawledUrl => "crawled_url",
            FindingKind::Parameter => "parameter",
            FindingKind::Raw => "raw",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FindingKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "subdomain" => Ok(FindingKind::Subdomain),
            "url" => Ok(FindingKind::Url),
            "historical_url" => Ok(FindingKind::HistoricalUrl),
            "http_service" => Ok(FindingKind::HttpService),
            "dns_record" => Ok(FindingKind::DnsRecord),
            "technology" => Ok(FindingKind::Technology),
            "open_port" => Ok(FindingKind::OpenPort),
            "screenshot" => Ok(FindingKind::Screenshot),
            "directory" => Ok(FindingKind::Directory),
            "crawled_url" => Ok(FindingKind::CrawledUrl),
            "parameter" => Ok(FindingKind::Parameter),
            "raw" => Ok(FindingKind::Raw),
            _ => Err(format!("Unknown finding kind: {s}")),
        }
    }
}

/// One normalized discovery unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub value: String,
    /// Tool that produced this finding
    pub source: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Finding {
    pub fn new(kind: FindingKind, value: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            source: source.into(),
            confidence: 0.8,
            metadata: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Per-tool slice of the execution summary returned to the caller
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    pub findings_count: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Derived view over a plan's execution results
#[derive(Debug, Clone, Serialize)]
pub struct Aggregated {
    pub findings: Vec<Finding>,
    /// Contains an entry for every planned tool, whatever its outcome
    pub execution_summary: BTreeMap<String, ToolSummary>,
}

impl Aggregated {
    pub fn total_findings(&self) -> usize {
        self.findings.len()
    }
}

/// Normalize and merge per-tool results into the response structure.
///
/// Never mutates the raw results; timed out and failed runs still contribute
/// best-effort findings from whatever output they produced.
pub fn aggregate(target: &str, results: &[ExecutionResult]) -> Aggregated {
    let mut findings = Vec::new();
    let mut seen: HashSet<(FindingKind, String, String)> = HashSet::new();
    let mut execution_summary = BTreeMap::new();

    for result in results {
        let tool_findings = match result.status {
            ExecutionStatus::Skipped(_) => Vec::new(),
            _ => normalize(&result.tool, target, &result.stdout),
        };

        let mut kept = 0;
        for finding in tool_findings {
            let key = (
                finding.kind,
                finding.value.clone(),
                finding.source.clone(),
            );
            if seen.insert(key) {
                kept += 1;
                findings.push(finding);
            }
        }

        execution_summary.insert(
            result.tool.clone(),
            ToolSummary {
                status: result.status,
                skip_reason: result.status.skip_reason(),
                findings_count: kept,
                duration_ms: result.duration.as_millis() as u64,
                error: result.error.clone(),
            },
        );
    }

    Aggregated {
        findings,
        execution_summary,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn completed(tool: &str, stdout: &str) -> ExecutionResult {
        ExecutionResult {
            tool: tool.to_string(),
            status: ExecutionStatus::Completed,
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
            duration: Duration::from_millis(120),
            error: None,
        }
    }

    #[test]
    fn test_same_tool_duplicates_collapse() {
        let results = vec![completed(
            "subfinder",
            "a.example.com\na.example.com\nb.example.com\n",
        )];
        let agg = aggregate("example.com", &results);

        assert_eq!(agg.total_findings(), 2);
        assert_eq!(agg.execution_summary["subfinder"].findings_count, 2);
    }

    #[test]
    fn test_cross_tool_duplicates_survive_with_distinct_sources() {
        let results = vec![
            completed("subfinder", "a.example.com\n"),
            completed("assetfinder", "a.example.com\n"),
        ];
        let agg = aggregate("example.com", &results);

        assert_eq!(agg.total_findings(), 2);
        let sources: Vec<_> = agg.findings.iter().map(|f| f.source.as_str()).collect();
        assert!(sources.contains(&"subfinder"));
        assert!(sources.contains(&"assetfinder"));
    }

    #[test]
    fn test_summary_covers_every_planned_tool() {
        let mut skipped = completed("amass", "");
        skipped.status = ExecutionStatus::Skipped(SkipReason::Unavailable);
        let mut failed = completed("httpx", "");
        failed.status = ExecutionStatus::Failed;
        failed.error = Some("exit status 1".to_string());

        let results = vec![completed("subfinder", "a.example.com\n"), skipped, failed];
        let agg = aggregate("example.com", &results);

        assert_eq!(agg.execution_summary.len(), 3);
        assert_eq!(
            agg.execution_summary["amass"].skip_reason,
            Some(SkipReason::Unavailable)
        );
        assert_eq!(
            agg.execution_summary["httpx"].error.as_deref(),
            Some("exit status 1")
        );
    }

    #[test]
    fn test_timed_out_output_still_normalized() {
        let mut result = completed("subfinder", "partial.example.com\n");
        result.status = ExecutionStatus::TimedOut;
        let agg = aggregate("example.com", &[result]);

        assert_eq!(agg.total_findings(), 1);
        assert_eq!(agg.execution_summary["subfinder"].findings_count, 1);
    }

    #[test]
    fn test_finding_kind_round_trip() {
        for kind in [
            FindingKind::Subdomain,
            FindingKind::OpenPort,
            FindingKind::Raw,
        ] {
            assert_eq!(kind.as_str().parse::<FindingKind>().unwrap(), kind);
        }
        assert!("bogus".parse::<FindingKind>().is_err());
    }
}
