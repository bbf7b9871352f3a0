//! HTTP bindings for the external pipeline services.
//!
//! One client speaks to the crawl, scoring, fingerprint, and extraction
//! endpoints under a single base URL. The reachability probe is the one
//! call that goes to the competitor site itself rather than the service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::clients::sse;
use crate::error::{ServiceError, ServiceResult};
use crate::normalize::NormalizedUrl;
use crate::traits::{
    CompanyDirectory, CrawlService, EventStream, ExtractionService, Fingerprinter, PageScorer,
};
use crate::types::entity::CompanyIdentity;
use crate::types::page::DiscoveredPage;
use crate::types::phases::{DiscoveryOutcome, ExtractionJob, FingerprintOutcome, StopAck};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the pipeline services.
///
/// # Example
///
/// ```rust,ignore
/// use competitor_intel::clients::HttpPipelineClient;
///
/// let client = HttpPipelineClient::new("https://pipeline.internal/api")?
///     .with_api_key(std::env::var("PIPELINE_API_KEY").unwrap());
/// ```
#[derive(Clone)]
pub struct HttpPipelineClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct DiscoverRequest<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    pages: &'a [DiscoveredPage],
    competitor: &'a str,
}

#[derive(Deserialize)]
struct ScoreResponse {
    pages: Vec<DiscoveredPage>,
}

#[derive(Serialize)]
struct FingerprintRequest<'a> {
    crawl_session_id: &'a str,
    competitor: &'a str,
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    fingerprint_session_id: &'a str,
    competitor: &'a str,
    schema_version: &'a str,
}

#[derive(Serialize)]
struct StopRequest<'a> {
    crawl_session_id: &'a str,
}

#[derive(Deserialize)]
struct CompaniesResponse {
    companies: Vec<CompanyIdentity>,
}

impl HttpPipelineClient {
    /// Create a client for the given service base URL.
    pub fn new(base_url: impl Into<String>) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    /// Authenticate requests with a bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {key}")),
            None => request,
        }
    }

    async fn post<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> ServiceResult<R> {
        let request = self.client.post(self.endpoint(path)).json(body);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ServiceError::Http(Box::new(e)))?;
        Self::read_json(response).await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> ServiceResult<R> {
        let request = self.client.get(self.endpoint(path));
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ServiceError::Http(Box::new(e)))?;
        Self::read_json(response).await
    }

    async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> ServiceResult<R> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Rejected {
                message: format!("{status}: {message}"),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Http(Box::new(e)))?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CrawlService for HttpPipelineClient {
    async fn discover(&self, url: &NormalizedUrl) -> ServiceResult<DiscoveryOutcome> {
        tracing::info!(origin = %url.normalized_origin, "requesting discovery crawl");
        self.post(
            "/discover",
            &DiscoverRequest {
                url: &url.normalized_origin,
            },
        )
        .await
    }

    async fn check_reachable(&self, url: &NormalizedUrl) -> ServiceResult<()> {
        // The probe hits the site directly; any HTTP answer (even an
        // error status) proves the host is alive.
        self.client
            .head(&url.normalized_origin)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ServiceError::Unreachable(e.to_string()))
    }

    async fn stop(&self, session_id: &str) -> ServiceResult<StopAck> {
        self.post(
            "/stop",
            &StopRequest {
                crawl_session_id: session_id,
            },
        )
        .await
    }
}

#[async_trait]
impl PageScorer for HttpPipelineClient {
    async fn score(
        &self,
        pages: &[DiscoveredPage],
        competitor: &str,
    ) -> ServiceResult<Vec<DiscoveredPage>> {
        let response: ScoreResponse = self
            .post("/score", &ScoreRequest { pages, competitor })
            .await?;
        Ok(response.pages)
    }
}

#[async_trait]
impl Fingerprinter for HttpPipelineClient {
    async fn fingerprint(
        &self,
        crawl_session_id: &str,
        competitor: &str,
    ) -> ServiceResult<FingerprintOutcome> {
        self.post(
            "/fingerprint",
            &FingerprintRequest {
                crawl_session_id,
                competitor,
            },
        )
        .await
    }
}

#[async_trait]
impl ExtractionService for HttpPipelineClient {
    async fn start_extraction(
        &self,
        fingerprint_session_id: &str,
        competitor: &str,
        schema_version: &str,
    ) -> ServiceResult<ExtractionJob> {
        self.post(
            "/extract",
            &ExtractRequest {
                fingerprint_session_id,
                competitor,
                schema_version,
            },
        )
        .await
    }

    async fn status(&self, extraction_session_id: &str) -> ServiceResult<ExtractionJob> {
        self.get(&format!("/extract/{extraction_session_id}/status"))
            .await
    }

    async fn subscribe(&self, extraction_session_id: &str) -> ServiceResult<EventStream> {
        let request = self
            .client
            .get(self.endpoint(&format!("/extract/{extraction_session_id}/events")))
            .header("Accept", "text/event-stream")
            // The stream stays open for the whole extraction run.
            .timeout(Duration::from_secs(60 * 60));
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ServiceError::Stream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Stream(format!(
                "event stream refused: {status}"
            )));
        }

        Ok(sse::decode(response.bytes_stream()))
    }
}

#[async_trait]
impl CompanyDirectory for HttpPipelineClient {
    async fn companies(&self) -> ServiceResult<Vec<CompanyIdentity>> {
        let response: CompaniesResponse = self.get("/companies").await?;
        Ok(response.companies)
    }
}
