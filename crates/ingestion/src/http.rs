//! OPeNDAP subset fetching through an HTTP relay.

use std::time::Duration;

use async_trait::async_trait;
use grid_locator::RequestDescriptor;
use opendap_parser::ContentKind;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::{IngestionError, Result};
use crate::fetcher::{FetchError, FetchedPayload, Fetcher};

/// Header carrying the optional relay token.
pub const RELAY_TOKEN_HEADER: &str = "x-relay-token";

/// Configuration for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Relay base URL, e.g. `https://relay.example.org/opendap/GLDAS_NOAH025_3H.2.1`
    pub base_url: String,
    /// Variables to subset besides the coordinate axes
    pub variables: Vec<String>,
    pub kind: ContentKind,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub relay_token: Option<String>,
}

impl HttpFetcherConfig {
    pub fn new(base_url: impl Into<String>, variables: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            variables,
            kind: ContentKind::Ascii,
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            relay_token: None,
        }
    }
}

/// Fetches one granule subset per request from the relay.
pub struct HttpFetcher {
    client: Client,
    config: HttpFetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpFetcherConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(IngestionError::InvalidConfig(
                "relay base URL is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .map_err(FetchError::from)?;

        Ok(Self { client, config })
    }

    /// DAP2 constraint expression selecting the request window.
    ///
    /// Every variable is subset `[0:0][lat][lon]`; the coordinate axes are
    /// requested alongside so the payload is self-describing.
    pub fn constraint(&self, request: &RequestDescriptor) -> String {
        let w = &request.window;
        let mut parts: Vec<String> = self
            .config
            .variables
            .iter()
            .map(|v| format!("{}[0:0]{}", v, w.hyperslab()))
            .collect();
        parts.push(format!("lat[{}:{}]", w.lat_start, w.lat_end));
        parts.push(format!("lon[{}:{}]", w.lon_start, w.lon_end));
        parts.push("time[0:0]".to_string());
        parts.join(",")
    }

    /// Full URL for one timestep.
    pub fn url_for(&self, request: &RequestDescriptor) -> String {
        format!(
            "{}/{}.{}?{}",
            self.config.base_url.trim_end_matches('/'),
            request.resource_path(),
            self.config.kind.extension(),
            self.constraint(request)
        )
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(granule = %request.granule))]
    async fn fetch(&self, request: &RequestDescriptor) -> std::result::Result<FetchedPayload, FetchError> {
        let url = self.url_for(request);
        debug!(url = %url, "Fetching timestep");

        let mut builder = self.client.get(&url);
        if let Some(token) = &self.config.relay_token {
            builder = builder.header(RELAY_TOKEN_HEADER, token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response.bytes().await?;
        debug!(size = bytes.len(), "Fetched timestep");

        Ok(FetchedPayload::new(bytes, self.config.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use grid_locator::{GeoPoint, RequestPlanner};

    fn request() -> RequestDescriptor {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        RequestPlanner::default()
            .plan(GeoPoint::new(40.1, -88.2), date, date)
            .unwrap()
            .remove(1)
    }

    #[test]
    fn test_url_layout() {
        let fetcher = HttpFetcher::new(HttpFetcherConfig::new(
            "https://relay.test/opendap/",
            vec!["Tair_f_inst".to_string(), "Albedo_inst".to_string()],
        ))
        .unwrap();

        assert_eq!(
            fetcher.url_for(&request()),
            "https://relay.test/opendap/2023/001/GLDAS_NOAH025_3H.A20230101.0300.021.nc4.ascii?\
             Tair_f_inst[0:0][399:401][366:368],Albedo_inst[0:0][399:401][366:368],\
             lat[399:401],lon[366:368],time[0:0]"
        );
    }

    #[test]
    fn test_binary_extension() {
        let mut config = HttpFetcherConfig::new("https://relay.test", vec![]);
        config.kind = ContentKind::Binary;
        let fetcher = HttpFetcher::new(config).unwrap();
        assert!(fetcher
            .url_for(&request())
            .contains(".nc4.dods?lat[399:401],lon[366:368],time[0:0]"));
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let result = HttpFetcher::new(HttpFetcherConfig::new("  ", vec![]));
        assert!(matches!(result, Err(IngestionError::InvalidConfig(_))));
    }
}
