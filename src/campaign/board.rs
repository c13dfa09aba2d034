use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::state_machine::{Campaign, CampaignStatus};

/// The caller's copy of the campaign list plus the UI state the coordinator
/// touches: the bulk selection and the `mutating` flag.
#[derive(Debug, Default, Clone)]
pub struct CampaignBoard {
    pub campaigns: Vec<Campaign>,
    pub selected: BTreeSet<String>,
    pub mutating: bool,
    page: usize,
}

pub type SharedBoard = Arc<Mutex<CampaignBoard>>;

pub fn lock(board: &SharedBoard) -> MutexGuard<'_, CampaignBoard> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CampaignBoard {
    pub fn new(campaigns: Vec<Campaign>) -> Self {
        Self {
            campaigns,
            selected: BTreeSet::new(),
            mutating: false,
            page: 1,
        }
    }

    pub fn shared(self) -> SharedBoard {
        Arc::new(Mutex::new(self))
    }

    pub fn get(&self, id: &str) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }

    /// Moving to another page drops the selection.
    pub fn set_page(&mut self, page: usize) {
        if page != self.page {
            self.page = page;
            self.selected.clear();
        }
    }

    /// Adds `ids` to the selection. Repeated ids select once.
    pub fn select(&mut self, ids: &[String]) {
        for id in ids {
            if !self.selected.contains(id) {
                self.toggle_one(id);
            }
        }
    }

    pub fn toggle_one(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Selects every visible id, or clears the selection when it already
    /// covers as many rows as are visible.
    pub fn toggle_all(&mut self, visible: &[String]) {
        if self.selected.len() == visible.len() {
            self.selected.clear();
        } else {
            self.selected = visible.iter().cloned().collect();
        }
    }

    /// Whether a bulk change to `desired` would touch anything.
    pub fn has_targets(&self, desired: CampaignStatus) -> bool {
        self.campaigns
            .iter()
            .any(|c| self.selected.contains(&c.id) && c.status != desired)
    }
}

/// Snapshot taken before an optimistic change, used to roll it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    /// Target ids in list order.
    pub affected_ids: Vec<String>,
    pub previous_statuses: BTreeMap<String, CampaignStatus>,
}

impl PendingMutation {
    /// Captures the campaigns among `requested` whose status differs from
    /// `desired`. Unknown ids are skipped.
    pub fn capture(campaigns: &[Campaign], requested: &[String], desired: CampaignStatus) -> Self {
        let mut affected_ids = Vec::new();
        let mut previous_statuses = BTreeMap::new();
        for campaign in campaigns {
            if requested.contains(&campaign.id) && campaign.status != desired {
                affected_ids.push(campaign.id.clone());
                previous_statuses.insert(campaign.id.clone(), campaign.status);
            }
        }
        Self {
            affected_ids,
            previous_statuses,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.affected_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.affected_ids.len()
    }

    pub fn apply(&self, campaigns: &mut [Campaign], desired: CampaignStatus) {
        for campaign in campaigns.iter_mut() {
            if self.previous_statuses.contains_key(&campaign.id) {
                campaign.status = desired;
            }
        }
    }

    /// Puts every target back to its captured status, whatever it is now.
    pub fn revert(&self, campaigns: &mut [Campaign]) {
        for campaign in campaigns.iter_mut() {
            if let Some(previous) = self.previous_statuses.get(&campaign.id) {
                campaign.status = *previous;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::seed_campaigns;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn capture_skips_satisfied_and_unknown() {
        let campaigns = seed_campaigns();
        let mutation = PendingMutation::capture(
            &campaigns,
            &ids(&["2", "4", "1", "404"]),
            CampaignStatus::Paused,
        );
        assert_eq!(mutation.affected_ids, ids(&["1", "4"]));
        assert_eq!(mutation.previous_statuses["1"], CampaignStatus::Active);
        assert_eq!(mutation.len(), 2);
    }

    #[test]
    fn apply_then_revert_restores_mixed_statuses() {
        let mut campaigns = seed_campaigns();
        let mutation = PendingMutation::capture(&campaigns, &ids(&["1", "3"]), CampaignStatus::Paused);

        mutation.apply(&mut campaigns, CampaignStatus::Paused);
        assert_eq!(campaigns[0].status, CampaignStatus::Paused);
        assert_eq!(campaigns[2].status, CampaignStatus::Paused);

        mutation.revert(&mut campaigns);
        assert_eq!(campaigns, seed_campaigns());
    }

    #[test]
    fn toggle_one_flips_membership() {
        let mut board = CampaignBoard::new(seed_campaigns());
        board.toggle_one("1");
        assert!(board.selected.contains("1"));
        board.toggle_one("1");
        assert!(board.selected.is_empty());
    }

    #[test]
    fn select_ignores_repeated_ids() {
        let mut board = CampaignBoard::new(seed_campaigns());
        board.select(&ids(&["1", "1", "4"]));
        assert_eq!(board.selected.len(), 2);
        assert!(board.has_targets(CampaignStatus::Paused));

        board.select(&ids(&["1"]));
        assert!(board.selected.contains("1"));
    }

    #[test]
    fn toggle_all_selects_then_clears() {
        let mut board = CampaignBoard::new(seed_campaigns());
        let visible = ids(&["1", "2", "3"]);
        board.toggle_all(&visible);
        assert_eq!(board.selected.len(), 3);
        board.toggle_all(&visible);
        assert!(board.selected.is_empty());
    }

    #[test]
    fn page_change_clears_selection() {
        let mut board = CampaignBoard::new(seed_campaigns());
        board.toggle_one("1");
        board.set_page(1);
        assert_eq!(board.selected.len(), 1);
        board.set_page(2);
        assert!(board.selected.is_empty());
        board.toggle_one("6");
        board.set_page(2);
        assert_eq!(board.selected.len(), 1);
    }

    #[test]
    fn has_targets_ignores_already_paused() {
        let mut board = CampaignBoard::new(seed_campaigns());
        board.toggle_one("2");
        board.toggle_one("5");
        assert!(!board.has_targets(CampaignStatus::Paused));
        board.toggle_one("1");
        assert!(board.has_targets(CampaignStatus::Paused));
    }
}
