use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery status of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Paused,
    Draft,
}

impl CampaignStatus {
    /// Past-tense verb used in success notifications ("3 campaigns paused").
    pub fn past_tense(self) -> &'static str {
        match self {
            CampaignStatus::Active => "activated",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Draft => "moved to draft",
        }
    }

    /// Name of the action used in failure notifications ("Pause failed.").
    pub fn action_name(self) -> &'static str {
        match self {
            CampaignStatus::Active => "Activation",
            CampaignStatus::Paused => "Pause",
            CampaignStatus::Draft => "Move to draft",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignStatus::Active => f.pad("active"),
            CampaignStatus::Paused => f.pad("paused"),
            CampaignStatus::Draft => f.pad("draft"),
        }
    }
}

/// A creative file attached to a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub progress: u8,
    pub uploading: bool,
}

impl Asset {
    /// An asset that has finished uploading.
    pub fn uploaded(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            progress: 100,
            uploading: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub budget: u64,
    pub impressions: u64,
    pub clicks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<Asset>>,
}

impl Campaign {
    /// Click-through rate as a fraction; zero when nothing was shown yet.
    pub fn ctr(&self) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            self.clicks as f64 / self.impressions as f64
        }
    }
}

pub fn seed_campaigns() -> Vec<Campaign> {
    let campaign = |id: &str,
                    name: &str,
                    status: CampaignStatus,
                    budget: u64,
                    impressions: u64,
                    clicks: u64| Campaign {
        id: id.to_string(),
        name: name.to_string(),
        status,
        budget,
        impressions,
        clicks,
        assets: Some(Vec::new()),
    };

    vec![
        campaign("1", "Summer Sale", CampaignStatus::Active, 5000, 12000, 900),
        campaign("2", "Diwali Promo", CampaignStatus::Paused, 3000, 8000, 500),
        campaign("3", "New Launch", CampaignStatus::Draft, 7000, 15000, 1100),
        campaign("4", "Clearance Sale", CampaignStatus::Active, 7000, 15000, 1100),
        campaign("5", "Holiday Deals", CampaignStatus::Paused, 8000, 5000, 900),
        campaign("6", "Back to School", CampaignStatus::Draft, 900, 8000, 900),
    ]
}
