//! Session export serialization
//!
//! Renders a session snapshot to json, csv, or txt without mutating any
//! stored state.

use crate::state::models::SessionRecord;
use crate::state::store::SessionStore;
use crate::{Error, Result};

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Txt,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Txt => "text/plain",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "txt" => Ok(ExportFormat::Txt),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A rendered export ready to hand to the caller
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExportPayload {
    pub filename: String,
    pub format: &'static str,
    pub content: String,
}

/// Export one session in the requested format.
pub fn export_session(
    store: &SessionStore,
    session_id: &str,
    format: ExportFormat,
) -> Result<ExportPayload> {
    let record = store.get(session_id)?;
    let content = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&record)?,
        ExportFormat::Csv => render_csv(&record),
        ExportFormat::Txt => render_txt(&record),
    };
    Ok(ExportPayload {
        filename: format!("session_{}.{}", session_id, format.as_str()),
        format: format.as_str(),
        content,
    })
}

/// Findings table, one row per finding.
fn render_csv(record: &SessionRecord) -> String {
    let mut out = String::from("kind,value,source,confidence\n");
    for finding in &record.findings {
        out.push_str(&format!(
            "{},{},{},{}\n",
            finding.kind,
            csv_escape(&finding.value),
            csv_escape(&finding.source),
            finding.confidence,
        ));
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Human-readable transcript plus findings.
fn render_txt(record: &SessionRecord) -> String {
    let mut lines = vec![
        format!("reconforge session export - {}", record.session_id),
        format!("Start Time: {}", record.started_at.to_rfc3339()),
        format!("Last Activity: {}", record.last_activity.to_rfc3339()),
        "=".repeat(50),
    ];

    for turn in &record.turns {
        lines.push(String::new());
        lines.push(format!(
            "[{}] {}",
            turn.created_at.to_rfc3339(),
            turn.kind.as_str().to_uppercase()
        ));
        lines.push(turn.content.clone());
        if let Some(results) = &turn.results {
            lines.push(format!(
                "Results: {}",
                serde_json::to_string_pretty(results).unwrap_or_default()
            ));
        }
    }

    if !record.findings.is_empty() {
        lines.push(String::new());
        lines.push(format!("Findings ({})", record.findings.len()));
        lines.push("-".repeat(50));
        for finding in &record.findings {
            lines.push(format!(
                "[{}] {} (via {})",
                finding.kind, finding.value, finding.source
            ));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::normalize::{Finding, FindingKind};
    use crate::state::models::TurnKind;

    fn seeded_store() -> (SessionStore, String) {
        let store = SessionStore::in_memory().unwrap();
        let id = store.create().unwrap();
        store
            .append_turn(&id, TurnKind::UserQuery, "scan example.com", None)
            .unwrap();
        store
            .append_findings(
                &id,
                &[
                    Finding::new(FindingKind::Subdomain, "a.example.com", "subfinder"),
                    Finding::new(FindingKind::OpenPort, "example.com:443", "naabu"),
                ],
            )
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_json_export_round_trips() {
        let (store, id) = seeded_store();
        let payload = export_session(&store, &id, ExportFormat::Json).unwrap();

        assert_eq!(payload.filename, format!("session_{id}.json"));
        let value: serde_json::Value = serde_json::from_str(&payload.content).unwrap();
        assert_eq!(value["session_id"], id);
        assert_eq!(value["findings"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_csv_export_lists_findings() {
        let (store, id) = seeded_store();
        let payload = export_session(&store, &id, ExportFormat::Csv).unwrap();

        let lines: Vec<&str> = payload.content.lines().collect();
        assert_eq!(lines[0], "kind,value,source,confidence");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("subdomain,a.example.com,subfinder"));
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_txt_export_contains_transcript() {
        let (store, id) = seeded_store();
        let payload = export_session(&store, &id, ExportFormat::Txt).unwrap();

        assert!(payload.content.contains("USER_QUERY"));
        assert!(payload.content.contains("scan example.com"));
        assert!(payload.content.contains("a.example.com (via subfinder)"));
    }

    #[test]
    fn test_export_unknown_session() {
        let store = SessionStore::in_memory().unwrap();
        assert!(matches!(
            export_session(&store, "ghost", ExportFormat::Json),
            Err(Error::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_export_does_not_mutate() {
        let (store, id) = seeded_store();
        let before = store.get(&id).unwrap().last_activity;
        export_session(&store, &id, ExportFormat::Txt).unwrap();
        let after = store.get(&id).unwrap().last_activity;
        assert_eq!(before, after);
    }
}
