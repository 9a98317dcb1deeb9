//! HTTP client for the map backend.
//!
//! This module provides:
//! - Trip search against the backend trip endpoint
//! - Situation (location) fetching with filter query parameters
//! - Journey planner queries decoded into trip collections
//! - [`SearchController`], which ties requests to a [`MapSession`] so that
//!   only the latest request of each kind updates the map
//!
//! The client timeout bounds every request; a request that times out fails
//! with [`MatchError::Timeout`] and the session keeps its previous state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use geojson::FeatureCollection;
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{MatchError, Result};
use crate::feature::parse_feature_collection;
use crate::filters::{FeatureFilter, FilterOptions};
use crate::session::{MapSession, SearchResolution};
use crate::trip::{journey_request, trip_collection_from_journey, JourneyResponse, TripResponse};

const TRIP_PATH: &str = "/trip/";
const LOCATIONS_PATH: &str = "/api/locations/";
const FILTER_OPTIONS_PATH: &str = "/api/filter-options/";

const DEFAULT_JOURNEY_PLANNER_URL: &str = "https://api.entur.io/journey-planner/v3/graphql";
const CLIENT_NAME: &str = "trip-matcher";
const MAX_RETRIES: u32 = 3;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Journey planner GraphQL endpoint
    pub journey_planner_url: String,
    /// CSRF token sent with form posts, if the backend requires one
    pub csrf_token: Option<String>,
    /// Per-request timeout in milliseconds. Default: 30000
    pub timeout_ms: u64,
    /// Number of trip patterns requested from the journey planner. Default: 1
    pub num_trip_patterns: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            journey_planner_url: DEFAULT_JOURNEY_PLANNER_URL.to_string(),
            csrf_token: None,
            timeout_ms: 30_000,
            num_trip_patterns: 1,
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> MatchError {
    if e.is_timeout() {
        MatchError::Timeout
    } else {
        MatchError::Http(e.to_string())
    }
}

/// Async client for the map backend.
#[derive(Debug, Clone)]
pub struct MapClient {
    client: Client,
    config: ClientConfig,
}

impl MapClient {
    /// Create a client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| MatchError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send a request, retrying connection failures with exponential backoff.
    async fn send(&self, label: &str, build: impl Fn() -> RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let mut retries = 0;

        loop {
            match build().send().await {
                Ok(resp) => {
                    let status = resp.status();
                    debug!("[{}] HTTP {} after {:?}", label, status, start.elapsed());
                    if !status.is_success() {
                        return Err(MatchError::Http(format!("HTTP {}", status)));
                    }
                    return Ok(resp);
                }
                Err(e) if e.is_connect() && retries < MAX_RETRIES => {
                    retries += 1;
                    let wait = Duration::from_millis(200 * (1 << retries));
                    warn!("[{}] Error: {}, retry {} after {:?}", label, e, retries, wait);
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(map_reqwest_error(e)),
            }
        }
    }

    /// Search for a trip between two places via the backend.
    pub async fn search_trip(&self, from: &str, to: &str) -> Result<TripResponse> {
        info!("Submitting trip search: {} -> {}", from, to);
        let url = self.url(TRIP_PATH);

        let resp = self
            .send("trip", || {
                let request = self.client.post(&url).form(&[("from", from), ("to", to)]);
                match &self.config.csrf_token {
                    Some(token) => request.header("X-CSRFToken", token),
                    None => request,
                }
            })
            .await?;

        let bytes = resp.bytes().await.map_err(map_reqwest_error)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetch situations, filtered server-side by the active selections.
    pub async fn fetch_locations(&self, filter: &FeatureFilter) -> Result<FeatureCollection> {
        let url = self.url(LOCATIONS_PATH);
        let query = filter.query_pairs();

        let resp = self
            .send("locations", || self.client.get(&url).query(&query))
            .await?;

        let body = resp.text().await.map_err(map_reqwest_error)?;
        let collection = parse_feature_collection(&body)?;
        info!("Fetched {} situation features", collection.features.len());
        Ok(collection)
    }

    /// Fetch the distinct dropdown values.
    pub async fn fetch_filter_options(&self) -> Result<FilterOptions> {
        let url = self.url(FILTER_OPTIONS_PATH);
        let resp = self.send("filter-options", || self.client.get(&url)).await?;
        let bytes = resp.bytes().await.map_err(map_reqwest_error)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Query the journey planner directly and decode the legs.
    pub async fn plan_journey(&self, from: &str, to: &str) -> Result<FeatureCollection> {
        let body = journey_request(from, to, self.config.num_trip_patterns);
        let url = &self.config.journey_planner_url;

        let resp = self
            .send("journey", || {
                self.client
                    .post(url)
                    .header("ET-Client-Name", CLIENT_NAME)
                    .json(&body)
            })
            .await?;

        let bytes = resp.bytes().await.map_err(map_reqwest_error)?;
        let journey: JourneyResponse = serde_json::from_slice(&bytes)?;
        trip_collection_from_journey(&journey)
    }
}

/// Runs searches and situation loads against a shared [`MapSession`].
///
/// The session lock is never held across a request.
#[derive(Debug, Clone)]
pub struct SearchController {
    client: MapClient,
    session: Arc<Mutex<MapSession>>,
}

impl SearchController {
    pub fn new(client: MapClient, session: MapSession) -> Self {
        Self {
            client,
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub fn session(&self) -> Arc<Mutex<MapSession>> {
        Arc::clone(&self.session)
    }

    /// Search a trip; the response only applies if no newer search was issued.
    ///
    /// Errors from superseded searches are swallowed as
    /// [`SearchResolution::Superseded`].
    pub async fn search(&self, from: &str, to: &str) -> Result<SearchResolution> {
        let ticket = self.session.lock().await.begin_search();

        let response = self.client.search_trip(from, to).await;

        let mut session = self.session.lock().await;
        match response {
            Ok(response) => session.resolve_search(ticket, response),
            Err(e) => {
                if session.fail_search(ticket) {
                    Err(e)
                } else {
                    Ok(SearchResolution::Superseded)
                }
            }
        }
    }

    /// Reload situations with a new filter.
    ///
    /// The filter becomes the session's active filter once the load applies.
    pub async fn reload_situations(&self, filter: FeatureFilter) -> Result<SearchResolution> {
        let ticket = self.session.lock().await.begin_reference_load();

        let response = self.client.fetch_locations(&filter).await;

        let mut session = self.session.lock().await;
        match response {
            Ok(collection) => session.resolve_reference(ticket, filter, collection),
            Err(e) => {
                if session.fail_search(ticket) {
                    Err(e)
                } else {
                    Ok(SearchResolution::Superseded)
                }
            }
        }
    }

    /// Initial page load: dropdown options and unfiltered situations together.
    pub async fn load_initial(&self) -> Result<(FilterOptions, SearchResolution)> {
        futures::try_join!(
            self.client.fetch_filter_options(),
            self.reload_situations(FeatureFilter::default())
        )
    }
}
