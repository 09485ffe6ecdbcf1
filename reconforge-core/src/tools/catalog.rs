//! Built-in tool catalogue
//!
//! One descriptor per supported reconnaissance tool, with the option schema
//! the validator enforces and the defaults applied when a request leaves an
//! option unset.

use super::descriptor::{OptionSpec, ToolCategory, ToolDescriptor};

/// All tools the engine knows how to drive.
pub fn builtin_tools() -> Vec<ToolDescriptor> {
    vec![
        subfinder(),
        assetfinder(),
        dnsx(),
        httpx(),
        amass(),
        nmap(),
        naabu(),
        gowitness(),
        eyewitness(),
        gobuster(),
        ffuf(),
        katana(),
        waybackurls(),
        waymore(),
        paramspider(),
    ]
}

fn subfinder() -> ToolDescriptor {
    ToolDescriptor::new("subfinder", ToolCategory::Recon)
        .with_description("Fast passive subdomain discovery tool with multiple data sources")
        .with_option(
            "sources",
            OptionSpec::list(Vec::<String>::new(), "Specific sources to use for enumeration")
                .with_allowed([
                    "shodan",
                    "censys",
                    "fofa",
                    "spyse",
                    "recon",
                    "dnsdumpster",
                    "hackertarget",
                ]),
        )
        .with_option(
            "exclude_sources",
            OptionSpec::list(Vec::<String>::new(), "Sources to exclude from enumeration"),
        )
        .with_option(
            "max_time",
            OptionSpec::integer(10, "Maximum time in minutes for enumeration").with_range(1, 60),
        )
        .with_option(
            "threads",
            OptionSpec::integer(10, "Number of concurrent threads").with_range(1, 100),
        )
        .with_option(
            "recursive",
            OptionSpec::boolean(false, "Enable recursive subdomain enumeration"),
        )
        .with_option("wordlist", OptionSpec::string("", "Path to custom wordlist file"))
        .with_option(
            "output_format",
            OptionSpec::string("txt", "Output format").with_allowed(["txt", "json"]),
        )
        .with_timeout_secs(600)
}

fn assetfinder() -> ToolDescriptor {
    ToolDescriptor::new("assetfinder", ToolCategory::Recon)
        .with_description("Fast subdomain discovery tool using various techniques")
        .with_option("subs_only", OptionSpec::boolean(true, "Find only subdomains"))
        .with_option(
            "timeout",
            OptionSpec::integer(60, "Timeout in seconds").with_range(10, 300),
        )
        .with_timeout_secs(60)
}

fn dnsx() -> ToolDescriptor {
    ToolDescriptor::new("dnsx", ToolCategory::Recon)
        .with_description("Fast and multi-purpose DNS toolkit for DNS resolution and enumeration")
        .with_option("a", OptionSpec::boolean(true, "Query A records"))
        .with_option("aaaa", OptionSpec::boolean(false, "Query AAAA records"))
        .with_option("cname", OptionSpec::boolean(true, "Query CNAME records"))
        .with_option("mx", OptionSpec::boolean(false, "Query MX records"))
        .with_option("ns", OptionSpec::boolean(false, "Query NS records"))
        .with_option("txt", OptionSpec::boolean(false, "Query TXT records"))
        .with_option("ptr", OptionSpec::boolean(false, "Query PTR records"))
        .with_option("srv", OptionSpec::boolean(false, "Query SRV records"))
        .with_option(
            "threads",
            OptionSpec::integer(25, "Number of threads").with_range(1, 100),
        )
        .with_option(
            "timeout",
            OptionSpec::integer(10, "Timeout in seconds").with_range(1, 60),
        )
        .with_option(
            "retries",
            OptionSpec::integer(2, "Number of retries").with_range(0, 10),
        )
        .with_option("resolver", OptionSpec::string("", "Custom DNS resolver"))
        .with_stdin_target()
        .with_timeout_secs(120)
}

fn httpx() -> ToolDescriptor {
    ToolDescriptor::new("httpx", ToolCategory::Recon)
        .with_description("Fast HTTP probe with technology detection and customizable options")
        .with_option(
            "threads",
            OptionSpec::integer(50, "Number of threads").with_range(1, 300),
        )
        .with_option(
            "timeout",
            OptionSpec::integer(10, "Timeout in seconds").with_range(1, 300),
        )
        .with_option(
            "retries",
            OptionSpec::integer(1, "Number of retries").with_range(0, 10),
        )
        .with_option("status_code", OptionSpec::boolean(true, "Display status code"))
        .with_option("title", OptionSpec::boolean(true, "Display page title"))
        .with_option(
            "content_length",
            OptionSpec::boolean(true, "Display content length"),
        )
        .with_option(
            "tech_detect",
            OptionSpec::boolean(true, "Display technology stack"),
        )
        .with_option(
            "follow_redirects",
            OptionSpec::boolean(true, "Follow HTTP redirects"),
        )
        .with_option(
            "method",
            OptionSpec::string("GET", "HTTP method to use").with_allowed(["GET", "POST", "HEAD"]),
        )
        .with_option(
            "ports",
            OptionSpec::list(["80", "443", "8080", "8443"], "Ports to probe"),
        )
        .with_timeout_secs(120)
}

fn amass() -> ToolDescriptor {
    ToolDescriptor::new("amass", ToolCategory::Recon)
        .with_description("In-depth DNS enumeration and network mapping with multiple modes")
        .with_option(
            "mode",
            OptionSpec::string("passive", "Enumeration mode")
                .with_allowed(["passive", "active", "intel"]),
        )
        .with_option(
            "sources",
            OptionSpec::list(Vec::<String>::new(), "Specific data sources to use"),
        )
        .with_option(
            "exclude_sources",
            OptionSpec::list(Vec::<String>::new(), "Data sources to exclude"),
        )
        .with_option(
            "max_dns_queries",
            OptionSpec::integer(1000, "Maximum DNS queries per minute").with_range(100, 10_000),
        )
        .with_option(
            "timeout",
            OptionSpec::integer(30, "Timeout in minutes").with_range(1, 120),
        )
        .with_option("wordlist", OptionSpec::string("", "Path to custom wordlist"))
        .with_option(
            "brute_force",
            OptionSpec::boolean(false, "Enable brute force enumeration"),
        )
        .with_option(
            "alterations",
            OptionSpec::boolean(false, "Enable subdomain alterations"),
        )
        .with_timeout_secs(1800)
}

fn nmap() -> ToolDescriptor {
    ToolDescriptor::new("nmap", ToolCategory::PortScan)
        .with_description("Network exploration and security auditing tool")
        .with_option(
            "scan_type",
            OptionSpec::string("syn", "Type of scan to perform")
                .with_allowed(["syn", "tcp", "udp", "ping", "version", "os"]),
        )
        .with_option(
            "ports",
            OptionSpec::string(
                "21,22,23,25,53,80,110,111,135,139,143,443,993,995,1723,3306,3389,5432,5900,8080",
                "Ports to scan (e.g., '80,443,1000-2000')",
            ),
        )
        .with_option(
            "top_ports",
            OptionSpec::integer(100, "Scan top N ports").with_range(10, 65_535),
        )
        .with_option(
            "timing",
            OptionSpec::string("3", "Timing template").with_allowed(["0", "1", "2", "3", "4", "5"]),
        )
        .with_option(
            "threads",
            OptionSpec::integer(10, "Parallel host scan groups").with_range(1, 100),
        )
        .with_option(
            "version_detection",
            OptionSpec::boolean(true, "Enable version detection"),
        )
        .with_option("os_detection", OptionSpec::boolean(false, "Enable OS detection"))
        .with_option(
            "script_scan",
            OptionSpec::boolean(false, "Enable default script scan"),
        )
        .with_option("aggressive", OptionSpec::boolean(false, "Enable aggressive scan"))
        .with_timeout_secs(300)
}

fn naabu() -> ToolDescriptor {
    ToolDescriptor::new("naabu", ToolCategory::PortScan)
        .with_description("Fast port scanner with a focus on reliability and simplicity")
        .with_option("ports", OptionSpec::string("1-1000", "Ports to scan"))
        .with_option(
            "top_ports",
            OptionSpec::string("1000", "Top ports to scan").with_allowed(["100", "1000", "full"]),
        )
        .with_option(
            "rate",
            OptionSpec::integer(1000, "Rate of packets per second").with_range(100, 50_000),
        )
        .with_option(
            "threads",
            OptionSpec::integer(25, "Number of threads").with_range(1, 100),
        )
        .with_option(
            "timeout",
            OptionSpec::integer(1000, "Timeout in milliseconds").with_range(100, 10_000),
        )
        .with_option(
            "retries",
            OptionSpec::integer(3, "Number of retries").with_range(0, 10),
        )
        .with_option(
            "scan_type",
            OptionSpec::string("s", "Scan type").with_allowed(["s", "c"]),
        )
        .with_timeout_secs(120)
}

fn gowitness() -> ToolDescriptor {
    ToolDescriptor::new("gowitness", ToolCategory::Screenshot)
        .with_description("Web screenshot utility using Chrome Headless")
        .with_option(
            "timeout",
            OptionSpec::integer(10, "Timeout in seconds").with_range(5, 120),
        )
        .with_option(
            "threads",
            OptionSpec::integer(5, "Number of threads").with_range(1, 50),
        )
        .with_option(
            "resolution",
            OptionSpec::string("1440,900", "Screenshot resolution")
                .with_allowed(["1440,900", "1920,1080", "1366,768"]),
        )
        .with_option("fullpage", OptionSpec::boolean(false, "Take full page screenshot"))
        .with_option(
            "delay",
            OptionSpec::integer(3, "Delay before screenshot in seconds").with_range(0, 30),
        )
        .with_timeout_secs(60)
}

fn eyewitness() -> ToolDescriptor {
    ToolDescriptor::new("eyewitness", ToolCategory::Screenshot)
        .with_description("Web application screenshot tool with report generation")
        .with_option(
            "timeout",
            OptionSpec::integer(7, "Timeout in seconds").with_range(5, 120),
        )
        .with_option(
            "threads",
            OptionSpec::integer(5, "Number of threads").with_range(1, 25),
        )
        .with_option(
            "delay",
            OptionSpec::integer(1, "Delay between requests in seconds").with_range(0, 10),
        )
        .with_option("user_agent", OptionSpec::string("", "Custom user agent"))
        .with_option(
            "resolution",
            OptionSpec::string("1440x900", "Screenshot resolution")
                .with_allowed(["1440x900", "1920x1080", "1366x768"]),
        )
        .with_timeout_secs(90)
}

fn gobuster() -> ToolDescriptor {
    ToolDescriptor::new("gobuster", ToolCategory::ContentDiscovery)
        .with_description("Directory/file and DNS busting tool")
        .with_option(
            "mode",
            OptionSpec::string("dir", "Gobuster mode").with_allowed(["dir", "dns", "vhost"]),
        )
        .with_option(
            "wordlist",
            OptionSpec::string("/usr/share/wordlists/dirb/common.txt", "Path to wordlist file"),
        )
        .with_option(
            "threads",
            OptionSpec::integer(10, "Number of threads").with_range(1, 100),
        )
        .with_option(
            "timeout",
            OptionSpec::integer(10, "Timeout in seconds").with_range(1, 60),
        )
        .with_option(
            "extensions",
            OptionSpec::list(["php", "html", "js", "txt", "xml"], "File extensions to search for"),
        )
        .with_option(
            "status_codes",
            OptionSpec::list(
                ["200", "204", "301", "302", "307", "401", "403"],
                "Status codes to include",
            ),
        )
        .with_option("follow_redirects", OptionSpec::boolean(false, "Follow redirects"))
        .with_option(
            "include_length",
            OptionSpec::boolean(true, "Include response length"),
        )
        .with_option("user_agent", OptionSpec::string("", "Custom user agent"))
        .with_timeout_secs(300)
}

fn ffuf() -> ToolDescriptor {
    ToolDescriptor::new("ffuf", ToolCategory::Fuzzing)
        .with_description("Fast web fuzzer")
        .with_option(
            "wordlist",
            OptionSpec::string("/usr/share/wordlists/dirb/common.txt", "Path to wordlist file"),
        )
        .with_option(
            "threads",
            OptionSpec::integer(40, "Number of threads").with_range(1, 100),
        )
        .with_option(
            "delay",
            OptionSpec::string("0", "Delay between requests (e.g., '0.1s')"),
        )
        .with_option(
            "timeout",
            OptionSpec::integer(10, "Timeout in seconds").with_range(1, 60),
        )
        .with_option(
            "match_codes",
            OptionSpec::list(
                ["200", "204", "301", "302", "307", "401", "403"],
                "Match HTTP status codes",
            ),
        )
        .with_option(
            "filter_codes",
            OptionSpec::list(["404"], "Filter HTTP status codes"),
        )
        .with_option(
            "filter_size",
            OptionSpec::list(Vec::<String>::new(), "Filter response sizes"),
        )
        .with_option(
            "extensions",
            OptionSpec::list(["php", "html", "js", "txt"], "File extensions to fuzz"),
        )
        .with_option(
            "method",
            OptionSpec::string("GET", "HTTP method")
                .with_allowed(["GET", "POST", "PUT", "DELETE", "HEAD"]),
        )
        .with_option("data", OptionSpec::string("", "POST data"))
        .with_option("headers", OptionSpec::list(Vec::<String>::new(), "Custom headers"))
        .with_timeout_secs(300)
}

fn katana() -> ToolDescriptor {
    ToolDescriptor::new("katana", ToolCategory::Fuzzing)
        .with_description("Next-generation crawling and spidering framework")
        .with_option(
            "depth",
            OptionSpec::integer(3, "Maximum crawl depth").with_range(1, 10),
        )
        .with_option("js_crawl", OptionSpec::boolean(true, "Enable JavaScript crawling"))
        .with_option(
            "crawl_duration",
            OptionSpec::integer(10, "Maximum crawl duration in minutes").with_range(1, 60),
        )
        .with_option(
            "concurrency",
            OptionSpec::integer(10, "Number of concurrent crawlers").with_range(1, 50),
        )
        .with_option(
            "delay",
            OptionSpec::integer(0, "Delay between requests in seconds").with_range(0, 10),
        )
        .with_option(
            "timeout",
            OptionSpec::integer(10, "Request timeout in seconds").with_range(1, 60),
        )
        .with_option(
            "retries",
            OptionSpec::integer(1, "Number of retries").with_range(0, 5),
        )
        .with_option(
            "scope",
            OptionSpec::list(Vec::<String>::new(), "Crawling scope patterns"),
        )
        .with_option(
            "exclude",
            OptionSpec::list(Vec::<String>::new(), "Exclude patterns"),
        )
        .with_option(
            "extensions",
            OptionSpec::list(["php", "asp", "aspx", "jsp", "js"], "File extensions to crawl"),
        )
        .with_timeout_secs(660)
}

fn waybackurls() -> ToolDescriptor {
    ToolDescriptor::new("waybackurls", ToolCategory::Fuzzing)
        .with_description("Fetch URLs from Wayback Machine archives with filtering options")
        .with_option("get_versions", OptionSpec::boolean(false, "Get all versions of URLs"))
        .with_option("no_subs", OptionSpec::boolean(false, "Don't include subdomains"))
        .with_option("dates", OptionSpec::boolean(false, "Show dates in output"))
        .with_option(
            "limit",
            OptionSpec::integer(1000, "Limit number of URLs returned").with_range(1, 10_000),
        )
        .with_stdin_target()
        .with_timeout_secs(300)
}

fn waymore() -> ToolDescriptor {
    ToolDescriptor::new("waymore", ToolCategory::Fuzzing)
        .with_description("Tool for downloading archived web pages and extracting URLs")
        .with_option(
            "mode",
            OptionSpec::string("U", "Waymore mode").with_allowed(["U", "R"]),
        )
        .with_option(
            "limit",
            OptionSpec::integer(5000, "Limit number of URLs").with_range(100, 50_000),
        )
        .with_option("from_date", OptionSpec::string("", "From date (YYYYMMDD)"))
        .with_option("to_date", OptionSpec::string("", "To date (YYYYMMDD)"))
        .with_option(
            "filter_responses_only",
            OptionSpec::boolean(false, "Filter responses only"),
        )
        .with_option(
            "capture_interval",
            OptionSpec::integer(30, "Capture interval in days").with_range(1, 365),
        )
        .with_timeout_secs(300)
}

fn paramspider() -> ToolDescriptor {
    ToolDescriptor::new("paramspider", ToolCategory::ParameterDiscovery)
        .with_description("Parameter discovery tool for web applications")
        .with_option(
            "level",
            OptionSpec::string("medium", "Crawling level").with_allowed(["high", "medium", "low"]),
        )
        .with_option(
            "exclude",
            OptionSpec::list(
                ["png", "jpg", "jpeg", "gif", "svg", "css", "ico"],
                "Extensions to exclude",
            ),
        )
        .with_option(
            "output",
            OptionSpec::string("txt", "Output format").with_allowed(["txt", "json"]),
        )
        .with_option(
            "placeholder",
            OptionSpec::string("FUZZ", "Placeholder for parameter values"),
        )
        .with_option("subs", OptionSpec::boolean(true, "Include subdomains"))
        .with_timeout_secs(300)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_is_complete() {
        let tools = builtin_tools();
        assert_eq!(tools.len(), 15);
        for name in [
            "subfinder",
            "assetfinder",
            "dnsx",
            "httpx",
            "amass",
            "nmap",
            "naabu",
            "gowitness",
            "eyewitness",
            "gobuster",
            "ffuf",
            "katana",
            "waybackurls",
            "waymore",
            "paramspider",
        ] {
            assert!(tools.iter().any(|t| t.name == name), "missing {name}");
        }
    }

    #[test]
    fn test_names_unique() {
        let tools = builtin_tools();
        let mut names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn test_stdin_tools() {
        let tools = builtin_tools();
        for tool in &tools {
            let expects_stdin = tool.name == "dnsx" || tool.name == "waybackurls";
            assert_eq!(tool.stdin_target, expects_stdin, "{}", tool.name);
        }
    }

    #[test]
    fn test_defaults_satisfy_own_schema() {
        // Every descriptor's defaults must pass its own validator
        for tool in builtin_tools() {
            let config = tool.default_config();
            let revalidated = crate::tools::validate::validate(&tool, &config.to_raw())
                .unwrap_or_else(|e| panic!("{}: {e}", tool.name));
            assert_eq!(config, revalidated);
        }
    }
}
