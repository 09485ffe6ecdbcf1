//! Command-line rendering for tool invocations
//!
//! Turns a validated [`ToolConfig`] into the argv the supervisor will run.
//! Flag mappings follow each tool's own CLI conventions, so this module is
//! one `match` of per-tool builders rather than anything generic.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::targets::Target;

use super::descriptor::{ToolConfig, ToolDescriptor};

/// A ready-to-spawn subprocess invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Data written to the child's stdin (tools that read targets there)
    pub stdin: Option<String>,
    pub timeout: Duration,
}

/// Host paths an invocation may write artifacts into
#[derive(Debug, Clone, Default)]
pub struct ArtifactPaths {
    pub screenshot_dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(screenshot_dir: impl AsRef<Path>) -> Self {
        Self {
            screenshot_dir: screenshot_dir.as_ref().to_path_buf(),
        }
    }
}

/// Build the subprocess invocation for one planned tool run.
pub fn build_invocation(
    descriptor: &ToolDescriptor,
    target: &Target,
    config: &ToolConfig,
    paths: &ArtifactPaths,
) -> Invocation {
    let mut args: Vec<String> = Vec::new();
    let mut stdin = None;
    let host = target.host();

    match descriptor.name.as_str() {
        "subfinder" => {
            push(&mut args, ["-d", host, "-silent"]);
            if let Some(sources) = config.get_list("sources") {
                push(&mut args, ["-sources", sources.join(",").as_str()]);
            }
            if let Some(excluded) = config.get_list("exclude_sources") {
                push(&mut args, ["-exclude-sources", excluded.join(",").as_str()]);
            }
            if let Some(minutes) = config.get_int("max_time") {
                push(&mut args, ["-timeout", minutes.to_string().as_str()]);
            }
            if let Some(threads) = config.get_int("threads") {
                push(&mut args, ["-t", threads.to_string().as_str()]);
            }
            if config.get_bool("recursive") {
                args.push("-recursive".to_string());
            }
            if let Some(wordlist) = config.get_str("wordlist") {
                push(&mut args, ["-w", wordlist]);
            }
            if config.get_str("output_format") == Some("json") {
                args.push("-json".to_string());
            }
        }
        "assetfinder" => {
            if config.get_bool("subs_only") {
                args.push("--subs-only".to_string());
            }
            args.push(host.to_string());
        }
        "dnsx" => {
            push(&mut args, ["-silent", "-json"]);
            let mut records = Vec::new();
            for record in ["a", "aaaa", "cname", "mx", "ns", "txt", "ptr", "srv"] {
                if config.get_bool(record) {
                    records.push(record);
                }
            }
            if !records.is_empty() {
                args.push(format!("-{}", records.join(",")));
            }
            if let Some(threads) = config.get_int("threads") {
                push(&mut args, ["-t", threads.to_string().as_str()]);
            }
            if let Some(timeout) = config.get_int("timeout") {
                push(&mut args, ["-timeout", timeout.to_string().as_str()]);
            }
            if let Some(retries) = config.get_int("retries").filter(|n| *n > 0) {
                push(&mut args, ["-retry", retries.to_string().as_str()]);
            }
            if let Some(resolver) = config.get_str("resolver") {
                push(&mut args, ["-r", resolver]);
            }
            stdin = Some(host.to_string());
        }
        "httpx" => {
            push(&mut args, ["-u", host, "-silent", "-json"]);
            if let Some(threads) = config.get_int("threads") {
                push(&mut args, ["-threads", threads.to_string().as_str()]);
            }
            if let Some(timeout) = config.get_int("timeout") {
                push(&mut args, ["-timeout", timeout.to_string().as_str()]);
            }
            if let Some(retries) = config.get_int("retries").filter(|n| *n > 0) {
                push(&mut args, ["-retries", retries.to_string().as_str()]);
            }
            for (option, flag) in [
                ("status_code", "-status-code"),
                ("title", "-title"),
                ("content_length", "-content-length"),
                ("tech_detect", "-tech-detect"),
                ("follow_redirects", "-follow-redirects"),
            ] {
                if config.get_bool(option) {
                    args.push(flag.to_string());
                }
            }
            if let Some(method) = config.get_str("method").filter(|m| *m != "GET") {
                push(&mut args, ["-method", method]);
            }
            if let Some(ports) = config.get_list("ports") {
                push(&mut args, ["-ports", ports.join(",").as_str()]);
            }
        }
        "amass" => {
            let mode = config.get_str("mode").unwrap_or("passive");
            if mode == "intel" {
                push(&mut args, ["intel", "-d", host]);
            } else {
                push(&mut args, ["enum", "-d", host]);
                if mode == "passive" {
                    args.push("-passive".to_string());
                }
            }
            if let Some(sources) = config.get_list("sources") {
                push(&mut args, ["-src", sources.join(",").as_str()]);
            }
            if let Some(excluded) = config.get_list("exclude_sources") {
                push(&mut args, ["-exclude", excluded.join(",").as_str()]);
            }
            if let Some(limit) = config.get_int("max_dns_queries") {
                push(&mut args, ["-max-dns-queries", limit.to_string().as_str()]);
            }
            if config.get_bool("brute_force") {
                if let Some(wordlist) = config.get_str("wordlist") {
                    push(&mut args, ["-brute", "-w", wordlist]);
                }
            }
            if config.get_bool("alterations") {
                args.push("-alts".to_string());
            }
            args.push("-silent".to_string());
        }
        "nmap" => {
            args.push(host.to_string());
            let scan_type = config.get_str("scan_type").unwrap_or("syn");
            match scan_type {
                "syn" => args.push("-sS".to_string()),
                "tcp" => args.push("-sT".to_string()),
                "udp" => args.push("-sU".to_string()),
                "ping" => args.push("-sn".to_string()),
                _ => {}
            }
            if let Some(top) = config.get_int("top_ports").filter(|n| *n > 0) {
                push(&mut args, ["--top-ports", top.to_string().as_str()]);
            } else if let Some(ports) = config.get_str("ports") {
                push(&mut args, ["-p", ports]);
            }
            if let Some(timing) = config.get_str("timing") {
                args.push(format!("-T{timing}"));
            }
            if config.get_bool("version_detection") || scan_type != "ping" {
                args.push("-sV".to_string());
            }
            if config.get_bool("os_detection") {
                args.push("-O".to_string());
            }
            if config.get_bool("script_scan") {
                args.push("-sC".to_string());
            }
            if config.get_bool("aggressive") {
                args.push("-A".to_string());
            }
            // Skip host discovery; targets are assumed live
            push(&mut args, ["-Pn", "-v"]);
        }
        "naabu" => {
            push(&mut args, ["-host", host, "-silent", "-json"]);
            match config.get_str("top_ports") {
                Some(top) if top != "full" => push(&mut args, ["-top-ports", top]),
                _ => {
                    if let Some(ports) = config.get_str("ports") {
                        push(&mut args, ["-p", ports]);
                    }
                }
            }
            if let Some(rate) = config.get_int("rate") {
                push(&mut args, ["-rate", rate.to_string().as_str()]);
            }
            if let Some(threads) = config.get_int("threads") {
                push(&mut args, ["-c", threads.to_string().as_str()]);
            }
            if let Some(timeout) = config.get_int("timeout") {
                push(&mut args, ["-timeout", timeout.to_string().as_str()]);
            }
            if let Some(retries) = config.get_int("retries").filter(|n| *n > 0) {
                push(&mut args, ["-retries", retries.to_string().as_str()]);
            }
            if let Some(scan_type) = config.get_str("scan_type") {
                push(&mut args, ["-s", scan_type]);
            }
        }
        "gowitness" => {
            let url = target.as_url();
            push(&mut args, ["single", "--url", url.as_str()]);
            push(
                &mut args,
                [
                    "--screenshot-path",
                    paths.screenshot_dir.display().to_string().as_str(),
                    "--disable-logging",
                ],
            );
            if let Some(timeout) = config.get_int("timeout") {
                push(&mut args, ["--timeout", timeout.to_string().as_str()]);
            }
            if let Some(resolution) = config.get_str("resolution") {
                push(&mut args, ["--resolution", resolution]);
            }
            if config.get_bool("fullpage") {
                args.push("--fullpage".to_string());
            }
            if let Some(delay) = config.get_int("delay").filter(|n| *n > 0) {
                push(&mut args, ["--delay", delay.to_string().as_str()]);
            }
        }
        "eyewitness" => {
            let url = target.as_url();
            push(&mut args, ["--single", url.as_str()]);
            push(
                &mut args,
                ["-d", paths.screenshot_dir.display().to_string().as_str(), "--no-prompt"],
            );
            if let Some(timeout) = config.get_int("timeout") {
                push(&mut args, ["--timeout", timeout.to_string().as_str()]);
            }
            if let Some(threads) = config.get_int("threads") {
                push(&mut args, ["--threads", threads.to_string().as_str()]);
            }
            if let Some(delay) = config.get_int("delay").filter(|n| *n > 0) {
                push(&mut args, ["--delay", delay.to_string().as_str()]);
            }
            if let Some(agent) = config.get_str("user_agent") {
                push(&mut args, ["--user-agent", agent]);
            }
            if let Some(resolution) = config.get_str("resolution") {
                push(&mut args, ["--resolution", resolution]);
            }
        }
        "gobuster" => {
            let mode = config.get_str("mode").unwrap_or("dir");
            push(&mut args, [mode, "-q"]);
            match mode {
                "dns" => push(&mut args, ["-d", host]),
                _ => push(&mut args, ["-u", target.as_url().as_str()]),
            }
            if let Some(wordlist) = config.get_str("wordlist") {
                push(&mut args, ["-w", wordlist]);
            }
            if let Some(threads) = config.get_int("threads") {
                push(&mut args, ["-t", threads.to_string().as_str()]);
            }
            if let Some(timeout) = config.get_int("timeout") {
                push(&mut args, ["--timeout", format!("{timeout}s").as_str()]);
            }
            if mode == "dir" {
                if let Some(extensions) = config.get_list("extensions") {
                    push(&mut args, ["-x", extensions.join(",").as_str()]);
                }
            }
            if let Some(codes) = config.get_list("status_codes") {
                push(&mut args, ["-s", codes.join(",").as_str()]);
            }
            if config.get_bool("follow_redirects") {
                args.push("-r".to_string());
            }
            if config.get_bool("include_length") {
                args.push("-l".to_string());
            }
            if let Some(agent) = config.get_str("user_agent") {
                push(&mut args, ["-a", agent]);
            }
        }
        "ffuf" => {
            let mut url = target.as_url();
            if !url.contains("FUZZ") {
                url = format!("{}/FUZZ", url.trim_end_matches('/'));
            }
            push(&mut args, ["-u", url.as_str(), "-json"]);
            if let Some(wordlist) = config.get_str("wordlist") {
                push(&mut args, ["-w", wordlist]);
            }
            if let Some(threads) = config.get_int("threads") {
                push(&mut args, ["-t", threads.to_string().as_str()]);
            }
            if let Some(delay) = config.get_str("delay").filter(|d| *d != "0") {
                push(&mut args, ["-p", delay]);
            }
            if let Some(timeout) = config.get_int("timeout") {
                push(&mut args, ["-timeout", timeout.to_string().as_str()]);
            }
            if let Some(codes) = config.get_list("match_codes") {
                push(&mut args, ["-mc", codes.join(",").as_str()]);
            }
            if let Some(codes) = config.get_list("filter_codes") {
                push(&mut args, ["-fc", codes.join(",").as_str()]);
            }
            if let Some(sizes) = config.get_list("filter_size") {
                push(&mut args, ["-fs", sizes.join(",").as_str()]);
            }
            if let Some(extensions) = config.get_list("extensions") {
                push(&mut args, ["-e", extensions.join(",").as_str()]);
            }
            if let Some(method) = config.get_str("method").filter(|m| *m != "GET") {
                push(&mut args, ["-X", method]);
            }
            if let Some(data) = config.get_str("data") {
                push(&mut args, ["-d", data]);
            }
            if let Some(headers) = config.get_list("headers") {
                for header in headers {
                    push(&mut args, ["-H", header.as_str()]);
                }
            }
        }
        "katana" => {
            let url = target.as_url();
            push(&mut args, ["-u", url.as_str(), "-silent", "-jsonl"]);
            if let Some(depth) = config.get_int("depth") {
                push(&mut args, ["-d", depth.to_string().as_str()]);
            }
            if config.get_bool("js_crawl") {
                args.push("-js-crawl".to_string());
            }
            if let Some(minutes) = config.get_int("crawl_duration") {
                push(&mut args, ["-crawl-duration", format!("{minutes}m").as_str()]);
            }
            if let Some(concurrency) = config.get_int("concurrency") {
                push(&mut args, ["-c", concurrency.to_string().as_str()]);
            }
            if let Some(delay) = config.get_int("delay").filter(|n| *n > 0) {
                push(&mut args, ["-delay", format!("{delay}s").as_str()]);
            }
            if let Some(timeout) = config.get_int("timeout") {
                push(&mut args, ["-timeout", timeout.to_string().as_str()]);
            }
            if let Some(retries) = config.get_int("retries").filter(|n| *n > 0) {
                push(&mut args, ["-retries", retries.to_string().as_str()]);
            }
            if let Some(scopes) = config.get_list("scope") {
                for scope in scopes {
                    push(&mut args, ["-scope", scope.as_str()]);
                }
            }
            if let Some(excludes) = config.get_list("exclude") {
                for pattern in excludes {
                    push(&mut args, ["-exclude", pattern.as_str()]);
                }
            }
            if let Some(extensions) = config.get_list("extensions") {
                push(&mut args, ["-extension", extensions.join(",").as_str()]);
            }
        }
        "waybackurls" => {
            if config.get_bool("get_versions") {
                args.push("-get-versions".to_string());
            }
            if config.get_bool("no_subs") {
                args.push("-no-subs".to_string());
            }
            if config.get_bool("dates") {
                args.push("-dates".to_string());
            }
            stdin = Some(host.to_string());
        }
        "waymore" => {
            push(&mut args, ["-i", host]);
            if let Some(mode) = config.get_str("mode") {
                push(&mut args, ["-mode", mode]);
            }
            if let Some(limit) = config.get_int("limit") {
                push(&mut args, ["-limit", limit.to_string().as_str()]);
            }
            if let Some(from) = config.get_str("from_date") {
                push(&mut args, ["-from", from]);
            }
            if let Some(to) = config.get_str("to_date") {
                push(&mut args, ["-to", to]);
            }
            if config.get_bool("filter_responses_only") {
                args.push("-filter-responses-only".to_string());
            }
            if let Some(interval) = config.get_int("capture_interval") {
                push(&mut args, ["-ci", interval.to_string().as_str()]);
            }
        }
        "paramspider" => {
            push(&mut args, ["-d", host]);
            if let Some(level) = config.get_str("level") {
                push(&mut args, ["-l", level]);
            }
            if let Some(excluded) = config.get_list("exclude") {
                push(&mut args, ["-e", excluded.join(",").as_str()]);
            }
            if let Some(placeholder) = config.get_str("placeholder") {
                push(&mut args, ["-p", placeholder]);
            }
            if config.get_bool("subs") {
                args.push("--subs".to_string());
            }
        }
        // Tools without a dedicated builder get a bare `<command> <host>` run
        _ => args.push(host.to_string()),
    }

    Invocation {
        program: descriptor.command.clone(),
        args,
        stdin,
        timeout: invocation_timeout(descriptor, config),
    }
}

/// Effective subprocess timeout for a configured invocation. Tools whose
/// schema carries a runtime budget derive the timeout from it; the rest use
/// the descriptor default.
pub fn invocation_timeout(descriptor: &ToolDescriptor, config: &ToolConfig) -> Duration {
    let secs = match descriptor.name.as_str() {
        // minutes-denominated budgets
        "subfinder" => config.get_int("max_time").map(|m| m as u64 * 60),
        "amass" => config.get_int("timeout").map(|m| m as u64 * 60),
        "katana" => config.get_int("crawl_duration").map(|m| m as u64 * 60 + 60),
        // seconds-denominated, padded for process startup and teardown
        "assetfinder" => config.get_int("timeout").map(|s| s as u64),
        "dnsx" | "httpx" => config.get_int("timeout").map(|s| s as u64 * 2),
        "gowitness" => config.get_int("timeout").map(|s| s as u64 + 30),
        "eyewitness" => config.get_int("timeout").map(|s| s as u64 + 60),
        _ => None,
    };
    Duration::from_secs(secs.unwrap_or(descriptor.default_timeout_secs))
}

fn push<'a>(args: &mut Vec<String>, items: impl IntoIterator<Item = &'a str>) {
    args.extend(items.into_iter().map(str::to_string));
}
