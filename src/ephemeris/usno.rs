//! HTTP ephemeris provider backed by the USNO celestial navigation API.

use std::time::Duration;

use super::{payload, EphemerisProvider, LookupError, LookupRequest};
use crate::solar::transform::SolarAngles;

/// Default endpoint.
pub const DEFAULT_URL: &str = "https://aa.usno.navy.mil/api/celnav";

/// Blocking `ureq` client driven from the async dispatcher through
/// `spawn_blocking`.
#[derive(Clone)]
pub struct UsnoProvider {
    agent: ureq::Agent,
    base_url: String,
}

impl UsnoProvider {
    /// `timeout` bounds the whole HTTP exchange at the socket level.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("heliodon/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.into(),
        }
    }

    /// Query parameters for a request, in the order they are sent.
    pub fn query_params(request: &LookupRequest) -> [(&'static str, String); 3] {
        [
            ("date", request.stamp.date_string()),
            ("time", request.stamp.time_string()),
            (
                "coords",
                format!("{},{}", request.observer.latitude, request.observer.longitude),
            ),
        ]
    }

    fn fetch(agent: &ureq::Agent, url: &str, params: &[(&'static str, String)]) -> Result<String, LookupError> {
        let mut req = agent.get(url);
        for (key, value) in params {
            req = req.query(key, value);
        }
        match req.call() {
            Ok(resp) => resp
                .into_string()
                .map_err(|e| LookupError::Transport(format!("reading body: {e}"))),
            Err(ureq::Error::Status(code, _)) => Err(LookupError::Status(code)),
            Err(ureq::Error::Transport(t)) => Err(LookupError::Transport(t.to_string())),
        }
    }
}

impl Default for UsnoProvider {
    fn default() -> Self {
        Self::new(DEFAULT_URL, Duration::from_secs(10))
    }
}

impl EphemerisProvider for UsnoProvider {
    async fn lookup(&self, request: &LookupRequest) -> Result<SolarAngles, LookupError> {
        let agent = self.agent.clone();
        let url = self.base_url.clone();
        let params = Self::query_params(request);
        log::debug!(
            "Ephemeris lookup #{} {} at {:.4},{:.4}",
            request.sequence,
            request.stamp,
            request.observer.latitude,
            request.observer.longitude
        );

        let body = tokio::task::spawn_blocking(move || Self::fetch(&agent, &url, &params))
            .await
            .map_err(|e| LookupError::Transport(format!("lookup task failed: {e}")))??;

        payload::parse_sun_angles(&body)
    }
}
