//! Activity manifest loading from a local file or an http(s) URL.

use anyhow::Context;

use fedtail_core::Activity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLocation {
    File(String),
    Url(String),
}

impl ManifestLocation {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw.to_string())
        } else {
            Self::File(raw.to_string())
        }
    }
}

pub async fn load_activity(
    location: &ManifestLocation,
    client: &reqwest::Client,
) -> anyhow::Result<Activity> {
    let raw = match location {
        ManifestLocation::File(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read manifest {path}"))?,
        ManifestLocation::Url(url) => client
            .get(url)
            .send()
            .await
            .with_context(|| format!("cannot fetch manifest {url}"))?
            .error_for_status()
            .with_context(|| format!("manifest request failed: {url}"))?
            .text()
            .await?,
    };
    parse_activity(&raw)
}

pub fn parse_activity(raw: &str) -> anyhow::Result<Activity> {
    serde_json::from_str(raw).context("invalid activity manifest")
}
