//! Execution-context resolution.
//!
//! Determines the project id and region for a call, either from
//! explicit overrides or from the host-metadata service, and validates
//! both against the cloud naming grammar.

use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Metadata endpoint base for workloads running on cloud hosts.
const METADATA_BASE: &str = "http://metadata.google.internal/computeMetadata/v1";

/// Flavor header the metadata service requires on every request.
const METADATA_FLAVOR: (&str, &str) = ("Metadata-Flavor", "Google");

/// Timeout for metadata lookups.
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

fn project_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]([a-z0-9-]{4,28}[a-z0-9])?$").unwrap())
}

fn region_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]+-[a-z]+[0-9]+$").unwrap())
}

/// The `(project, region, user-agent)` triple addressing a regional
/// generative endpoint. Created per execute call and discarded at
/// return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Cloud project identifier
    pub project_id: String,
    /// Regional endpoint location, e.g. `us-central1`
    pub region: String,
    /// Per-surface user-agent string stamped on outgoing requests
    pub user_agent: String,
}

/// Source of host-metadata values.
///
/// Trait seam so generators and tests can run without a metadata
/// server; production uses [`MetadataClient`].
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch a metadata value by path, e.g. `project/project-id`.
    async fn get(&self, path: &str) -> Result<String>;
}

/// HTTP client for the host-metadata service.
pub struct MetadataClient {
    http: reqwest::Client,
    base_url: String,
}

impl MetadataClient {
    /// Create a client against the standard metadata endpoint.
    pub fn new() -> Result<Self> {
        Self::with_base_url(METADATA_BASE)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build metadata client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl MetadataSource for MetadataClient {
    async fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header(METADATA_FLAVOR.0, METADATA_FLAVOR.1)
            .send()
            .await
            .map_err(|e| Error::Configuration(format!("metadata lookup of '{path}' failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Configuration(format!(
                "metadata lookup of '{path}' returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let body = response.text().await.map_err(|e| {
            Error::Configuration(format!("metadata lookup of '{path}' returned bad body: {e}"))
        })?;
        Ok(body.trim().to_string())
    }
}

/// Optional catalog of valid regions for strict validation.
#[async_trait]
pub trait RegionCatalog: Send + Sync {
    /// Enumerate the regions the cloud-compute catalog knows about.
    async fn list_regions(&self) -> Result<Vec<String>>;
}

/// Resolves [`ExecutionContext`] from explicit values or metadata.
pub struct ContextResolver {
    metadata: Arc<dyn MetadataSource>,
    catalog: Option<Arc<dyn RegionCatalog>>,
    // Catalog result is fetched once per process and reused.
    known_regions: Mutex<Option<Vec<String>>>,
}

impl ContextResolver {
    /// Create a resolver over the given metadata source.
    pub fn new(metadata: Arc<dyn MetadataSource>) -> Self {
        Self {
            metadata,
            catalog: None,
            known_regions: Mutex::new(None),
        }
    }

    /// Enable strict region validation against a compute catalog.
    pub fn with_region_catalog(mut self, catalog: Arc<dyn RegionCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Resolve project and region, preferring explicit non-empty
    /// values over metadata discovery.
    pub async fn resolve(
        &self,
        explicit_project: Option<&str>,
        explicit_region: Option<&str>,
        user_agent: &str,
    ) -> Result<ExecutionContext> {
        let project_id = match explicit_project.filter(|p| !p.is_empty()) {
            Some(p) => p.to_string(),
            None => self.metadata.get("project/project-id").await.map_err(|e| {
                Error::Configuration(format!("project id could not be determined: {e}"))
            })?,
        };

        if !project_id_pattern().is_match(&project_id) {
            return Err(Error::Configuration(format!(
                "invalid project id '{project_id}'"
            )));
        }

        let region = match explicit_region.filter(|r| !r.is_empty()) {
            Some(r) => r.to_string(),
            None => {
                let zone = self.metadata.get("instance/zone").await.map_err(|e| {
                    Error::Configuration(format!("region could not be determined: {e}"))
                })?;
                region_from_zone(&zone)?
            }
        };

        if !region_pattern().is_match(&region) {
            return Err(Error::Configuration(format!("invalid region '{region}'")));
        }

        if let Some(catalog) = &self.catalog {
            self.check_region_known(catalog, &region).await?;
        }

        tracing::info!(project = %project_id, region = %region, "resolved execution context");

        Ok(ExecutionContext {
            project_id,
            region,
            user_agent: user_agent.to_string(),
        })
    }

    async fn check_region_known(&self, catalog: &Arc<dyn RegionCatalog>, region: &str) -> Result<()> {
        {
            let cached = self.known_regions.lock();
            if let Some(regions) = cached.as_ref() {
                return check_membership(regions, region);
            }
        }
        let regions = catalog.list_regions().await.map_err(|e| {
            Error::Configuration(format!("region catalog lookup failed: {e}"))
        })?;
        let result = check_membership(&regions, region);
        *self.known_regions.lock() = Some(regions);
        result
    }
}

fn check_membership(regions: &[String], region: &str) -> Result<()> {
    if regions.iter().any(|r| r == region) {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "region '{region}' is not in the compute catalog"
        )))
    }
}

/// Extract the region from a metadata zone string.
///
/// The zone value looks like `projects/123/zones/us-central1-a`; the
/// region is the final segment with the availability-zone suffix
/// removed.
pub fn region_from_zone(zone: &str) -> Result<String> {
    let zone_name = zone.rsplit('/').next().unwrap_or(zone);
    let mut parts: Vec<&str> = zone_name.split('-').collect();
    if parts.len() < 3 {
        return Err(Error::Configuration(format!(
            "cannot parse region from zone '{zone}'"
        )));
    }
    parts.pop();
    Ok(parts.join("-"))
}
