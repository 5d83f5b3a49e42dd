//! Environmental data acquisition
//!
//! Runs every registered source client concurrently and collects one result
//! per client. Nothing here returns an error; a misbehaving client yields a
//! `SourceError` value.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use shared::Location;

use crate::config::SourcesConfig;
use crate::external::{
    AirQualityClient, ClimateClient, FireClient, SourceClient, SourceError, SourceResult,
};

#[derive(Clone)]
pub struct AcquisitionService {
    clients: Vec<Arc<dyn SourceClient>>,
    timeout: Duration,
}

impl AcquisitionService {
    pub fn new(clients: Vec<Arc<dyn SourceClient>>, timeout: Duration) -> Self {
        Self { clients, timeout }
    }

    /// Climate archive, fire feed and air-quality network from configuration
    pub fn from_config(config: &SourcesConfig) -> Self {
        let clients: Vec<Arc<dyn SourceClient>> = vec![
            Arc::new(ClimateClient::new(&config.climate)),
            Arc::new(FireClient::new(&config.fire)),
            Arc::new(AirQualityClient::new(&config.air_quality)),
        ];
        Self::new(clients, config.timeout())
    }

    /// Fetch from every client at once; results keep registration order
    pub async fn acquire(&self, location: &Location) -> Vec<SourceResult> {
        let timeout = self.timeout;

        join_all(self.clients.iter().map(|client| async move {
            let kind = client.kind();
            let result = match tokio::time::timeout(timeout, client.fetch(location, timeout)).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::Timeout(timeout)),
            };

            match &result {
                Ok(_) => tracing::debug!("Source {} responded", kind),
                Err(e) => tracing::warn!("Source {} failed: {}", kind, e),
            }
            result
        }))
        .await
    }

    /// True when no client produced a reading
    pub fn all_failed(results: &[SourceResult]) -> bool {
        results.iter().all(Result::is_err)
    }
}
