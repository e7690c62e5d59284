//! Docker registry label lookup
//!
//! Only the v1 manifest schema carries image labels, so the manifest is
//! requested as `manifest.v1+json` and the labels are read out of the
//! first history entry.

use crate::error::{RemoteError, Result, check_status};
use mlirci_core::LabelSet;
use serde::Deserialize;
use std::collections::HashMap;

const MANIFEST_V1: &str = "application/vnd.docker.distribution.manifest.v1+json";

/// Registry client
pub struct RegistryClient {
    client: reqwest::Client,
    auth_url: String,
    registry_url: String,
    service: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ManifestV1 {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    /// JSON encoded as a string
    #[serde(rename = "v1Compatibility")]
    v1_compatibility: String,
}

#[derive(Debug, Deserialize)]
struct V1Compatibility {
    config: Option<ContainerConfig>,
}

#[derive(Debug, Deserialize)]
struct ContainerConfig {
    #[serde(rename = "Labels")]
    labels: Option<HashMap<String, String>>,
}

impl RegistryClient {
    pub fn new(
        auth_url: impl Into<String>,
        registry_url: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth_url: auth_url.into(),
            registry_url: registry_url.into().trim_end_matches('/').to_string(),
            service: service.into(),
        }
    }

    /// Get an anonymous pull token for a repository
    async fn pull_token(&self, repository: &str) -> Result<String> {
        let scope = format!("repository:{}:pull", repository);
        let response = self
            .client
            .get(&self.auth_url)
            .query(&[("scope", scope.as_str()), ("service", self.service.as_str())])
            .send()
            .await?;

        let token: TokenResponse = check_status(response)?.json().await?;
        Ok(token.token)
    }

    /// Labels of `<repository>:<tag>` as recorded in the registry
    pub async fn labels(&self, repository: &str, tag: &str) -> Result<LabelSet> {
        let token = self.pull_token(repository).await?;

        let url = format!("{}/v2/{}/manifests/{}", self.registry_url, repository, tag);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, MANIFEST_V1)
            .bearer_auth(&token)
            .send()
            .await?;

        let manifest: ManifestV1 = check_status(response)?.json().await?;
        let labels = parse_labels(&url, &manifest)?;

        tracing::info!("remote {}:{} labels: {:?}", repository, tag, labels);
        Ok(labels)
    }
}

fn parse_labels(url: &str, manifest: &ManifestV1) -> Result<LabelSet> {
    let entry = manifest
        .history
        .first()
        .ok_or_else(|| RemoteError::UnexpectedResponse {
            url: url.to_string(),
            message: "manifest has no history".to_string(),
        })?;

    let compat: V1Compatibility = serde_json::from_str(&entry.v1_compatibility)?;
    let labels = compat
        .config
        .and_then(|config| config.labels)
        .unwrap_or_default();

    Ok(LabelSet::from(labels))
}
