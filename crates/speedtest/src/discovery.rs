//! Target discovery against the public speed-test site
//!
//! The site publishes an app script embedding an API token. The token unlocks
//! an endpoint listing download targets; the first target is turned into a
//! small warm-up range and a large main range for the engine.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::meter::MeterConfig;
use crate::meter::core::{DiscoveryStage, HttpClient, MeterError, Result};

pub const DEFAULT_SITE_URL: &str = "https://fast.com";
pub const DEFAULT_API_URL: &str = "https://api.fast.com/netflix/speedtest";

pub const WARMUP_PATH: &str = "/speedtest/range/0-2048";
pub const MAIN_PATH: &str = "/speedtest/range/0-26214400";

static SCRIPT_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<script\b[^>]*\bsrc\s*=\s*["']([^"']+)["']"#).unwrap());

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"token:"([a-zA-Z0-9]+)""#).unwrap());

/// Locate the first `<script src=...>` in the site page, resolved against the site URL
pub fn app_script_url(html: &str, site_url: &Url) -> Result<Url> {
    let src = SCRIPT_SRC
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            MeterError::discovery(DiscoveryStage::FindScript, "no script tag with a src attribute")
        })?;

    site_url.join(src).map_err(|e| {
        MeterError::discovery(
            DiscoveryStage::FindScript,
            format!("bad script src '{}': {}", src, e),
        )
    })
}

/// Pull the API token out of the app script
pub fn extract_token(script: &str) -> Result<String> {
    TOKEN
        .captures(script)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            MeterError::discovery(DiscoveryStage::ExtractToken, "could not find token in script")
        })
}

#[derive(Debug, Deserialize)]
struct Target {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetList {
    Bare(Vec<Target>),
    Wrapped { targets: Vec<Target> },
}

/// Parse the target list returned by the API, keeping server order
pub fn parse_targets(json: &str) -> Result<Vec<String>> {
    let list: TargetList = serde_json::from_str(json)
        .map_err(|e| MeterError::discovery(DiscoveryStage::ParseTargets, e.to_string()))?;
    let targets = match list {
        TargetList::Bare(targets) | TargetList::Wrapped { targets } => targets,
    };
    if targets.is_empty() {
        return Err(MeterError::discovery(DiscoveryStage::ParseTargets, "target list is empty"));
    }
    Ok(targets.into_iter().map(|t| t.url).collect())
}

/// Turn a target into the ordered addresses to measure
///
/// Query parameters of the target are kept, only the path is replaced.
pub fn plan_addresses(target: &str, warmup: bool) -> Result<Vec<String>> {
    let mut url = Url::parse(target).map_err(|e| {
        MeterError::discovery(DiscoveryStage::PlanAddresses, format!("'{}': {}", target, e))
    })?;

    let mut addresses = Vec::with_capacity(2);
    if warmup {
        url.set_path(WARMUP_PATH);
        addresses.push(url.to_string());
    }
    url.set_path(MAIN_PATH);
    addresses.push(url.to_string());
    Ok(addresses)
}

/// Resolves download addresses from the live site
#[derive(Debug, Clone)]
pub struct Discovery {
    client: HttpClient,
    site_url: Url,
    api_url: Url,
}

impl Discovery {
    pub fn new(config: &MeterConfig, site_url: &str, api_url: &str) -> Result<Self> {
        let site_url =
            Url::parse(site_url).map_err(|e| MeterError::invalid_address(site_url, e))?;
        let api_url = Url::parse(api_url).map_err(|e| MeterError::invalid_address(api_url, e))?;
        Ok(Self {
            client: HttpClient::from_config(config)?,
            site_url,
            api_url,
        })
    }

    pub fn with_defaults(config: &MeterConfig) -> Result<Self> {
        Self::new(config, DEFAULT_SITE_URL, DEFAULT_API_URL)
    }

    /// Fetch the API token through the site page and its app script
    pub async fn token(&self) -> Result<String> {
        let html = self
            .client
            .get_text(&self.site_url)
            .await
            .map_err(|e| MeterError::discovery_request(DiscoveryStage::FetchSite, e))?;
        let script_url = app_script_url(&html, &self.site_url)?;
        debug!("App script at {}", script_url);

        let script = self
            .client
            .get_text(&script_url)
            .await
            .map_err(|e| MeterError::discovery_request(DiscoveryStage::FetchScript, e))?;
        extract_token(&script)
    }

    /// Ask the API for download targets
    pub async fn targets(&self, token: &str) -> Result<Vec<String>> {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("https", "true")
            .append_pair("token", token);

        let body = self
            .client
            .get_text(&url)
            .await
            .map_err(|e| MeterError::discovery_request(DiscoveryStage::FetchTargets, e))?;
        parse_targets(&body)
    }

    /// Full discovery: token, targets, then the planned addresses
    pub async fn resolve(&self, warmup: bool) -> Result<Vec<String>> {
        let token = self.token().await?;
        let targets = self.targets(&token).await?;
        info!("Discovered {} targets, measuring against the first", targets.len());
        plan_addresses(&targets[0], warmup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::ErrorKind;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    #[test]
    fn test_app_script_url_resolves_relative_src() {
        let site = Url::parse("https://fast.com").unwrap();
        let html = r#"<html><head><script>inline()</script><script src="/app-ed402d.js"></script>"#;
        let url = app_script_url(html, &site).unwrap();
        assert_eq!(url.as_str(), "https://fast.com/app-ed402d.js");
    }

    #[test]
    fn test_app_script_url_missing() {
        let site = Url::parse("https://fast.com").unwrap();
        let err = app_script_url("<html></html>", &site).unwrap_err();
        assert!(matches!(err, MeterError::Discovery { stage: DiscoveryStage::FindScript, .. }));
        assert_eq!(err.kind(), ErrorKind::Discovery);
    }

    #[test]
    fn test_extract_token() {
        let script = r#"var a={https:!0,token:"YXNkZmFzZGxmbnNkYWZoYXNkZmhrYWxm",urlCount:5}"#;
        assert_eq!(extract_token(script).unwrap(), "YXNkZmFzZGxmbnNkYWZoYXNkZmhrYWxm");
        assert!(extract_token("token: nope").is_err());
    }

    #[test]
    fn test_parse_targets_bare_and_wrapped() {
        let bare = r#"[{"url":"https://a.example/st?c=1"},{"url":"https://b.example/st"}]"#;
        assert_eq!(
            parse_targets(bare).unwrap(),
            vec!["https://a.example/st?c=1", "https://b.example/st"]
        );

        let wrapped = r#"{"client":{},"targets":[{"name":"x","url":"https://c.example/st"}]}"#;
        assert_eq!(parse_targets(wrapped).unwrap(), vec!["https://c.example/st"]);
    }

    #[test]
    fn test_parse_targets_rejects_empty_and_garbage() {
        assert!(parse_targets("[]").is_err());
        let err = parse_targets("<html>").unwrap_err();
        assert!(matches!(err, MeterError::Discovery { stage: DiscoveryStage::ParseTargets, .. }));
    }

    #[test]
    fn test_plan_addresses_replaces_path() {
        let planned =
            plan_addresses("https://ipv4-c001.example.net/speedtest?c=us&e=123", true).unwrap();
        assert_eq!(
            planned,
            vec![
                "https://ipv4-c001.example.net/speedtest/range/0-2048?c=us&e=123",
                "https://ipv4-c001.example.net/speedtest/range/0-26214400?c=us&e=123",
            ]
        );

        let main_only = plan_addresses("https://x.example/speedtest", false).unwrap();
        assert_eq!(main_only, vec!["https://x.example/speedtest/range/0-26214400"]);
    }

    #[tokio::test]
    async fn test_resolve_against_mock_site() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><script src="/app-123.js"></script></html>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/app-123.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"x={token:"abc123"}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("https", "true"))
            .and(query_param("token", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"url":"https://cdn.example/speedtest?x=1"}]"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let discovery = Discovery::new(
            &MeterConfig::default(),
            &format!("{}/", server.uri()),
            &format!("{}/api", server.uri()),
        )
        .unwrap();
        let addresses = discovery.resolve(true).await.unwrap();

        assert_eq!(
            addresses,
            vec![
                "https://cdn.example/speedtest/range/0-2048?x=1",
                "https://cdn.example/speedtest/range/0-26214400?x=1",
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_reports_failing_stage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let discovery =
            Discovery::new(&MeterConfig::default(), &server.uri(), &server.uri()).unwrap();
        let err = discovery.resolve(true).await.unwrap_err();
        assert!(matches!(err, MeterError::Discovery { stage: DiscoveryStage::FetchSite, .. }));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_request_error_as_cause() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app.js"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"<script src="/app.js"></script>"#),
            )
            .mount(&server)
            .await;

        let discovery =
            Discovery::new(&MeterConfig::default(), &server.uri(), &server.uri()).unwrap();
        let err = discovery.token().await.unwrap_err();

        match &err {
            MeterError::Discovery {
                stage: DiscoveryStage::FetchScript,
                source: Some(cause),
                ..
            } => assert!(matches!(**cause, MeterError::Status { .. })),
            other => panic!("unexpected error: {other:?}"),
        }
        let report = err.detailed_report();
        assert!(report.contains("Caused by: Request to"));
        assert!(report.contains("503 Service Unavailable"));
    }
}
