//! Single-campaign view: overview edits and performance figures.

use rand::Rng;

use crate::error::{FieldError, OpsdeskError};
use crate::state_machine::{Campaign, CampaignStatus};

/// Days shown in the performance trend.
pub const TREND_DAYS: usize = 7;

/// Changes to the overview fields. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignEdit {
    pub name: Option<String>,
    /// Signed so a negative input reaches validation instead of the parser.
    pub budget: Option<i64>,
    pub status: Option<CampaignStatus>,
}

impl CampaignEdit {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.budget.is_none() && self.status.is_none()
    }

    /// Returns the edited campaign, or every field that failed validation.
    /// The name is stored trimmed.
    pub fn apply(&self, campaign: &Campaign) -> Result<Campaign, OpsdeskError> {
        let name = self.name.as_deref().unwrap_or(&campaign.name).trim();
        let budget = match self.budget {
            Some(budget) => u64::try_from(budget).unwrap_or(0),
            None => campaign.budget,
        };

        let mut errors = Vec::new();
        if name.is_empty() {
            errors.push(FieldError::NameRequired);
        }
        if budget == 0 {
            errors.push(FieldError::BudgetNotPositive);
        }
        if !errors.is_empty() {
            return Err(OpsdeskError::InvalidCampaign(errors));
        }

        Ok(Campaign {
            name: name.to_string(),
            budget,
            status: self.status.unwrap_or(campaign.status),
            ..campaign.clone()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Performance {
    pub impressions: u64,
    pub clicks: u64,
    /// Click-through rate in percent.
    pub ctr_percent: f64,
}

/// Headline metrics, or `None` when the campaign has no impressions yet.
pub fn performance(campaign: &Campaign) -> Option<Performance> {
    if campaign.impressions == 0 {
        return None;
    }
    Some(Performance {
        impressions: campaign.impressions,
        clicks: campaign.clicks,
        ctr_percent: campaign.ctr() * 100.0,
    })
}

/// Illustrative daily impressions: each day lands between 60% and 100% of
/// the total.
pub fn trend(impressions: u64, days: usize, rng: &mut impl Rng) -> Vec<u64> {
    (0..days)
        .map(|_| (impressions as f64 * rng.gen_range(0.6..=1.0)).round() as u64)
        .collect()
}
