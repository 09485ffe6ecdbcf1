//! Per-tool output parsing strategies
//!
//! Line-oriented tools yield one finding per line; JSONL tools are decoded
//! per line with unparsable lines downgraded to `raw` findings instead of
//! being dropped. Dedup here is per tool; cross-tool merging happens in
//! [`super::aggregate`].

use serde_json::{json, Value};
use std::collections::HashSet;

use super::{Finding, FindingKind};

/// Parse one tool's raw output into findings.
///
/// `target` is the host the tool was pointed at; tools that echo it back
/// (subdomain enumerators) have it filtered out.
pub fn normalize(tool: &str, target: &str, raw_output: &str) -> Vec<Finding> {
    let findings = match tool {
        "subfinder" => parse_subfinder(target, raw_output),
        "assetfinder" => parse_subdomain_lines(tool, target, raw_output, 0.85),
        "amass" => parse_subdomain_lines(tool, target, raw_output, 0.95),
        "dnsx" => parse_dnsx(raw_output),
        "httpx" => parse_httpx(raw_output),
        "nmap" => parse_nmap(target, raw_output),
        "naabu" => parse_naabu(raw_output),
        "gobuster" => parse_gobuster(target, raw_output),
        "ffuf" => parse_ffuf(raw_output),
        "katana" => parse_katana(raw_output),
        "waybackurls" => parse_archive_urls("waybackurls", target, raw_output),
        "waymore" => parse_archive_urls("waymore", target, raw_output),
        "paramspider" => parse_paramspider(target, raw_output),
        "gowitness" | "eyewitness" => parse_screenshots(tool, target, raw_output),
        _ => parse_raw(tool, raw_output),
    };
    dedup(findings)
}

fn dedup(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen: HashSet<(FindingKind, String)> = HashSet::new();
    findings
        .into_iter()
        .filter(|f| seen.insert((f.kind, f.value.clone())))
        .collect()
}

fn lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// subfinder emits plain hostnames, or JSONL with a `host` field when run
/// with json output. Both shapes are accepted.
fn parse_subfinder(target: &str, raw: &str) -> Vec<Finding> {
    lines(raw)
        .filter_map(|line| {
            let (host, source_name) = if line.starts_with('{') {
                match serde_json::from_str::<Value>(line) {
                    Ok(v) => (
                        v.get("host").and_then(Value::as_str).map(str::to_string),
                        v.get("source").and_then(Value::as_str).map(str::to_string),
                    ),
                    Err(_) => (None, None),
                }
            } else {
                (Some(line.to_string()), None)
            };
            let host = host?;
            if host == target {
                return None;
            }
            let mut metadata = json!({"target": target});
            if let Some(source_name) = source_name {
                metadata["source_name"] = Value::String(source_name);
            }
            Some(
                Finding::new(FindingKind::Subdomain, host, "subfinder")
                    .with_confidence(0.9)
                    .with_metadata(metadata),
            )
        })
        .collect()
}

fn parse_subdomain_lines(tool: &str, target: &str, raw: &str, confidence: f64) -> Vec<Finding> {
    lines(raw)
        .filter(|line| *line != target)
        .map(|line| {
            Finding::new(FindingKind::Subdomain, line, tool)
                .with_confidence(confidence)
                .with_metadata(json!({"target": target}))
        })
        .collect()
}

fn parse_dnsx(raw: &str) -> Vec<Finding> {
    jsonl(raw, "dnsx", |value| {
        let host = value.get("host").and_then(Value::as_str)?;
        let records: Vec<&str> = value
            .get("a")
            .and_then(Value::as_array)?
            .iter()
            .filter_map(Value::as_str)
            .collect();
        if records.is_empty() {
            return None;
        }
        Some(
            Finding::new(
                FindingKind::DnsRecord,
                format!("{host} -> {}", records.join(", ")),
                "dnsx",
            )
            .with_confidence(0.95)
            .with_metadata(json!({"host": host, "records": value})),
        )
    })
}

fn parse_httpx(raw: &str) -> Vec<Finding> {
    jsonl(raw, "httpx", |value| {
        let url = value.get("url").and_then(Value::as_str)?;
        Some(
            Finding::new(FindingKind::HttpService, url, "httpx")
                .with_confidence(0.9)
                .with_metadata(json!({
                    "status_code": value.get("status_code"),
                    "content_length": value.get("content_length"),
                    "technology": value.get("tech").cloned().unwrap_or_else(|| json!([])),
                    "title": value.get("title"),
                    "method": value.get("method"),
                })),
        )
    })
}

/// nmap normal output: rows like `22/tcp   open  ssh`
fn parse_nmap(target: &str, raw: &str) -> Vec<Finding> {
    lines(raw)
        .filter_map(|line| {
            if !(line.contains("/tcp") || line.contains("/udp")) || !line.contains("open") {
                return None;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 2 || parts[1] != "open" {
                return None;
            }
            let (port, protocol) = parts[0].split_once('/')?;
            let service = parts.get(2).copied().unwrap_or("unknown");
            Some(
                Finding::new(
                    FindingKind::OpenPort,
                    format!("{target}:{port}/{protocol}"),
                    "nmap",
                )
                .with_confidence(0.95)
                .with_metadata(json!({
                    "host": target,
                    "port": port,
                    "protocol": protocol,
                    "service": service,
                    "state": "open",
                })),
            )
        })
        .collect()
}

fn parse_naabu(raw: &str) -> Vec<Finding> {
    jsonl(raw, "naabu", |value| {
        let host = value.get("host").and_then(Value::as_str)?;
        let port = value.get("port").and_then(Value::as_i64)?;
        Some(
            Finding::new(FindingKind::OpenPort, format!("{host}:{port}"), "naabu")
                .with_confidence(0.9)
                .with_metadata(json!({"host": host, "port": port})),
        )
    })
}

/// gobuster quiet output: `/admin (Status: 301) [Size: 0]` or `path status`
fn parse_gobuster(target: &str, raw: &str) -> Vec<Finding> {
    lines(raw)
        .filter(|line| !line.starts_with('='))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let path = *parts.first()?;
            let status = parts
                .iter()
                .skip(1)
                .find_map(|p| {
                    let trimmed = p.trim_matches(|c| !char::is_ascii_digit(&c));
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                })
                .unwrap_or_else(|| "200".to_string());
            Some(
                Finding::new(FindingKind::Directory, path, "gobuster")
                    .with_confidence(0.8)
                    .with_metadata(json!({"status_code": status, "target": target})),
            )
        })
        .collect()
}

fn parse_ffuf(raw: &str) -> Vec<Finding> {
    jsonl(raw, "ffuf", |value| {
        let url = value.get("url").and_then(Value::as_str)?;
        let status = value.get("status")?;
        Some(
            Finding::new(FindingKind::Directory, url, "ffuf")
                .with_confidence(0.85)
                .with_metadata(json!({
                    "status_code": status,
                    "length": value.get("length").cloned().unwrap_or(json!(0)),
                    "words": value.get("words").cloned().unwrap_or(json!(0)),
                    "lines": value.get("lines").cloned().unwrap_or(json!(0)),
                })),
        )
    })
}

fn parse_katana(raw: &str) -> Vec<Finding> {
    jsonl(raw, "katana", |value| {
        let request = value.get("request")?;
        let url = request.get("url").and_then(Value::as_str)?;
        let response = value.get("response");
        Some(
            Finding::new(FindingKind::CrawledUrl, url, "katana")
                .with_confidence(0.8)
                .with_metadata(json!({
                    "method": request.get("method").cloned().unwrap_or(json!("GET")),
                    "status_code": response.and_then(|r| r.get("status_code")),
                    "content_length": response.and_then(|r| r.get("content_length")),
                })),
        )
    })
}

/// Archive URL lists, one per line, optionally prefixed with a capture date
fn parse_archive_urls(tool: &str, target: &str, raw: &str) -> Vec<Finding> {
    lines(raw)
        .filter_map(|line| {
            let (date, url) = if line.starts_with("http://") || line.starts_with("https://") {
                (None, line)
            } else {
                // `<timestamp> <url>` when date output is enabled
                let (date, rest) = line.split_once(' ')?;
                if !(rest.starts_with("http://") || rest.starts_with("https://")) {
                    return None;
                }
                (Some(date), rest.trim())
            };
            Some(
                Finding::new(FindingKind::HistoricalUrl, url, tool)
                    .with_confidence(0.8)
                    .with_metadata(json!({"target": target, "date": date})),
            )
        })
        .collect()
}

fn parse_paramspider(target: &str, raw: &str) -> Vec<Finding> {
    lines(raw)
        .filter(|line| line.contains('?') || line.contains('&'))
        .map(|line| {
            Finding::new(FindingKind::Parameter, line, "paramspider")
                .with_confidence(0.8)
                .with_metadata(json!({"target": target}))
        })
        .collect()
}

/// Screenshot tools write image files and log their paths; anything ending
/// in .png in the output becomes a screenshot finding. Log noise around it
/// is deliberately not carried as raw findings.
fn parse_screenshots(tool: &str, target: &str, raw: &str) -> Vec<Finding> {
    lines(raw)
        .flat_map(str::split_whitespace)
        .filter(|token| token.ends_with(".png"))
        .map(|path| {
            Finding::new(
                FindingKind::Screenshot,
                format!("Screenshot captured for {target}"),
                tool,
            )
            .with_confidence(0.9)
            .with_metadata(json!({"target": target, "screenshot_path": path}))
        })
        .collect()
}

fn parse_raw(tool: &str, raw: &str) -> Vec<Finding> {
    lines(raw)
        .map(|line| Finding::new(FindingKind::Raw, line, tool).with_confidence(0.5))
        .collect()
}

/// Decode JSONL output, downgrading unparsable lines to raw findings.
fn jsonl<F>(raw: &str, tool: &str, mut map: F) -> Vec<Finding>
where
    F: FnMut(&Value) -> Option<Finding>,
{
    lines(raw)
        .filter_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(value) => map(&value),
            Err(_) => Some(Finding::new(FindingKind::Raw, line, tool).with_confidence(0.5)),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_subfinder_text_output() {
        let out = "a.example.com\nexample.com\nb.example.com\n";
        let findings = normalize("subfinder", "example.com", out);

        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.kind == FindingKind::Subdomain));
        assert!(findings.iter().all(|f| f.value != "example.com"));
    }

    #[test]
    fn test_subfinder_json_output() {
        let out = r#"{"host":"mail.example.com","source":"censys"}
{"host":"dev.example.com","source":"shodan"}"#;
        let findings = normalize("subfinder", "example.com", out);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].value, "mail.example.com");
        assert_eq!(
            findings[0].metadata.as_ref().unwrap()["source_name"],
            "censys"
        );
    }

    #[test]
    fn test_httpx_jsonl() {
        let out = r#"{"url":"https://example.com","status_code":200,"title":"Home","tech":["nginx"]}"#;
        let findings = normalize("httpx", "example.com", out);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::HttpService);
        let meta = findings[0].metadata.as_ref().unwrap();
        assert_eq!(meta["status_code"], 200);
        assert_eq!(meta["technology"][0], "nginx");
    }

    #[test]
    fn test_unparsable_jsonl_degrades_to_raw() {
        let out = "{\"url\":\"https://example.com\",\"status_code\":200}\nnot json at all\n";
        let findings = normalize("httpx", "example.com", out);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[1].kind, FindingKind::Raw);
        assert_eq!(findings[1].value, "not json at all");
    }

    #[test]
    fn test_nmap_open_ports() {
        let out = "\
Starting Nmap 7.94
22/tcp   open  ssh     OpenSSH 9.6
80/tcp   open  http    nginx
443/tcp  closed https
53/udp   open  domain
";
        let findings = normalize("nmap", "10.0.0.5", out);

        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].value, "10.0.0.5:22/tcp");
        assert_eq!(findings[2].value, "10.0.0.5:53/udp");
        assert_eq!(findings[0].metadata.as_ref().unwrap()["service"], "ssh");
    }

    #[test]
    fn test_naabu_jsonl() {
        let out = r#"{"host":"example.com","ip":"93.184.216.34","port":443}"#;
        let findings = normalize("naabu", "example.com", out);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::OpenPort);
        assert_eq!(findings[0].value, "example.com:443");
    }

    #[test]
    fn test_dnsx_jsonl() {
        let out = r#"{"host":"example.com","a":["93.184.216.34","93.184.216.35"]}"#;
        let findings = normalize("dnsx", "example.com", out);

        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].value,
            "example.com -> 93.184.216.34, 93.184.216.35"
        );
    }

    #[test]
    fn test_waybackurls_with_dates() {
        let out = "20230101000000 https://example.com/old\nhttps://example.com/new\n";
        let findings = normalize("waybackurls", "example.com", out);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].value, "https://example.com/old");
        assert_eq!(
            findings[0].metadata.as_ref().unwrap()["date"],
            "20230101000000"
        );
        assert!(findings[1].metadata.as_ref().unwrap()["date"].is_null());
    }

    #[test]
    fn test_katana_jsonl() {
        let out = r#"{"request":{"url":"https://example.com/app.js","method":"GET"},"response":{"status_code":200}}"#;
        let findings = normalize("katana", "example.com", out);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::CrawledUrl);
    }

    #[test]
    fn test_paramspider_filters_parameterless_lines() {
        let out = "https://example.com/search?q=FUZZ\nhttps://example.com/about\n";
        let findings = normalize("paramspider", "example.com", out);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::Parameter);
    }

    #[test]
    fn test_ffuf_jsonl() {
        let out = r#"{"url":"https://example.com/admin","status":301,"length":0,"words":1,"lines":1}"#;
        let findings = normalize("ffuf", "example.com", out);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::Directory);
        assert_eq!(findings[0].metadata.as_ref().unwrap()["status_code"], 301);
    }

    #[test]
    fn test_screenshot_paths() {
        let out = "writing screenshot to /tmp/shots/example.com.png\n";
        let findings = normalize("gowitness", "example.com", out);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::Screenshot);
        assert_eq!(
            findings[0].metadata.as_ref().unwrap()["screenshot_path"],
            "/tmp/shots/example.com.png"
        );
    }

    #[test]
    fn test_unknown_tool_yields_raw_lines() {
        let findings = normalize("whois", "example.com", "registrar: example registrar\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::Raw);
    }

    #[test]
    fn test_per_tool_dedup() {
        let out = "a.example.com\na.example.com\n";
        let findings = normalize("assetfinder", "example.com", out);
        assert_eq!(findings.len(), 1);
    }
}
