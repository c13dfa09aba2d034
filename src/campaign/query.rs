use std::cmp::Ordering;

use crate::state_machine::{Campaign, CampaignStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Budget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Search, filter, sort and page settings for the campaign list.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignQuery {
    /// Case-insensitive substring matched against the name.
    pub search: String,
    /// Allowed statuses; empty means all.
    pub statuses: Vec<CampaignStatus>,
    pub sort: Option<(SortKey, SortDirection)>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for CampaignQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            statuses: Vec::new(),
            sort: None,
            page: 1,
            page_size: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignPage {
    pub items: Vec<Campaign>,
    pub page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl CampaignQuery {
    pub fn matches(&self, campaign: &Campaign) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = campaign.name.to_lowercase().contains(&needle);
        let matches_status = self.statuses.is_empty() || self.statuses.contains(&campaign.status);
        matches_search && matches_status
    }

    /// Filters, sorts (stable) and slices `campaigns`. A page past the end
    /// clamps to the last page.
    pub fn run(&self, campaigns: &[Campaign]) -> CampaignPage {
        let mut rows: Vec<Campaign> = campaigns.iter().filter(|c| self.matches(c)).cloned().collect();

        if let Some((key, direction)) = self.sort {
            rows.sort_by(|a, b| {
                let ordering = compare(a, b, key);
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let page_size = self.page_size.max(1);
        let total = rows.len();
        let total_pages = total.div_ceil(page_size);
        let page = self.page.clamp(1, total_pages.max(1));

        let items = rows
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        CampaignPage {
            items,
            page,
            total,
            total_pages,
        }
    }
}

fn compare(a: &Campaign, b: &Campaign, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Budget => a.budget.cmp(&b.budget),
    }
}
