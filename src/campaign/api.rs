use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::OpsdeskConfig;
use crate::error::RemoteError;
use crate::outcome::clamp_probability;
use crate::state_machine::{Campaign, CampaignStatus, seed_campaigns};

const NETWORK_ERROR: &str = "Network error. Please try again.";

/// Remote side of the campaign list.
///
/// The coordinator only needs `update_status`; `fetch_campaigns` feeds the
/// list pages.
#[allow(async_fn_in_trait)]
pub trait CampaignApi {
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, RemoteError>;

    async fn update_status(&self, ids: &[String], status: CampaignStatus) -> Result<(), RemoteError>;
}

/// Stand-in backend: random latency, random failures, an in-memory copy of
/// the seed campaigns that successful updates are applied to.
pub struct SimulatedCampaignApi {
    server: Mutex<Vec<Campaign>>,
    rng: Mutex<StdRng>,
    failure_rate: f64,
    fetch_failure_rate: f64,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl SimulatedCampaignApi {
    pub fn new(campaigns: Vec<Campaign>) -> Self {
        Self {
            server: Mutex::new(campaigns),
            rng: Mutex::new(StdRng::from_entropy()),
            failure_rate: 0.2,
            fetch_failure_rate: 0.15,
            min_delay_ms: 600,
            max_delay_ms: 1100,
        }
    }

    pub fn from_config(config: &OpsdeskConfig) -> Self {
        Self::new(seed_campaigns())
            .with_failure_rates(config.remote_failure_rate, config.fetch_failure_rate)
            .with_delay(config.remote_min_delay_ms, config.remote_max_delay_ms)
    }

    pub fn with_failure_rates(mut self, update: f64, fetch: f64) -> Self {
        self.failure_rate = clamp_probability(update);
        self.fetch_failure_rate = clamp_probability(fetch);
        self
    }

    pub fn with_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_delay_ms = min_ms;
        self.max_delay_ms = max_ms.max(min_ms);
        self
    }

    #[cfg(test)]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_campaigns(self, campaigns: Vec<Campaign>) -> Self {
        Self {
            server: Mutex::new(campaigns),
            ..self
        }
    }

    /// Current server-side state, for persisting between runs.
    pub fn campaigns(&self) -> Vec<Campaign> {
        self.server().clone()
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn server(&self) -> MutexGuard<'_, Vec<Campaign>> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps a random latency, then decides whether the call fails.
    async fn roundtrip(&self, failure_rate: f64) -> Result<(), RemoteError> {
        let (delay, fails) = {
            let mut rng = self.rng();
            let delay = rng.gen_range(self.min_delay_ms..=self.max_delay_ms.max(self.min_delay_ms));
            (delay, rng.gen_bool(clamp_probability(failure_rate)))
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        if fails {
            debug!(delay_ms = delay, "simulated network failure");
            return Err(RemoteError::Network(NETWORK_ERROR.to_string()));
        }
        Ok(())
    }
}

impl CampaignApi for SimulatedCampaignApi {
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, RemoteError> {
        self.roundtrip(self.fetch_failure_rate).await?;
        Ok(self.server().clone())
    }

    async fn update_status(&self, ids: &[String], status: CampaignStatus) -> Result<(), RemoteError> {
        self.roundtrip(self.failure_rate).await?;
        let mut server = self.server();
        for campaign in server.iter_mut().filter(|c| ids.contains(&c.id)) {
            campaign.status = status;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reliable_api_returns_seed_campaigns() {
        let api = SimulatedCampaignApi::new(seed_campaigns()).with_failure_rates(0.0, 0.0);
        let campaigns = api.fetch_campaigns().await.unwrap();
        assert_eq!(campaigns.len(), 6);
        assert_eq!(campaigns[0].name, "Summer Sale");
    }

    #[tokio::test(start_paused = true)]
    async fn successful_update_is_visible_on_next_fetch() {
        let api = SimulatedCampaignApi::new(seed_campaigns()).with_failure_rates(0.0, 0.0);
        api.update_status(&["1".into(), "4".into()], CampaignStatus::Paused)
            .await
            .unwrap();

        let campaigns = api.fetch_campaigns().await.unwrap();
        let paused: Vec<&str> = campaigns
            .iter()
            .filter(|c| c.status == CampaignStatus::Paused)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(paused, vec!["1", "2", "4", "5"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_update_leaves_server_untouched() {
        let api = SimulatedCampaignApi::new(seed_campaigns()).with_failure_rates(1.0, 0.0);
        let err = api
            .update_status(&["1".into()], CampaignStatus::Paused)
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Network(NETWORK_ERROR.into()));

        let campaigns = api.fetch_campaigns().await.unwrap();
        assert_eq!(campaigns[0].status, CampaignStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn nan_failure_rates_count_as_reliable() {
        let api = SimulatedCampaignApi::new(seed_campaigns()).with_failure_rates(f64::NAN, f64::NAN);
        for _ in 0..20 {
            api.fetch_campaigns().await.unwrap();
        }
        api.update_status(&["1".into()], CampaignStatus::Paused)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn calls_take_the_configured_latency() {
        let api = SimulatedCampaignApi::new(seed_campaigns())
            .with_failure_rates(0.0, 0.0)
            .with_delay(500, 500)
            .with_seed(3);
        let started = tokio::time::Instant::now();
        api.fetch_campaigns().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
