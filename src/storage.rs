//! Best-effort local persistence.
//!
//! A [`KeyValueStore`] holds raw JSON strings under fixed keys. On top of it,
//! [`JobRepository`] persists the job list, [`CampaignRepository`] the
//! server-side campaign list and [`AssetRepository`] the map of campaign id
//! to attached assets. Reads never fail: an absent or malformed
//! value is treated as missing and replaced by the documented default.
//! Writes that fail are logged and dropped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::OpsdeskError;
use crate::state_machine::{Asset, Campaign, Job, seed_campaigns, seed_jobs};

pub const JOBS_KEY: &str = "jobs-data";
pub const ASSETS_KEY: &str = "campaign_assets";
pub const CAMPAIGNS_KEY: &str = "campaigns-data";

/// Raw string storage keyed by name.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), OpsdeskError>;
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), OpsdeskError> {
        std::fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a crash never leaves half a file behind.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Decodes `key`, treating a missing or unparsable value as absent.
fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "discarding malformed stored value");
            None
        }
    }
}

fn write_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(OpsdeskError::from)
        .and_then(|raw| store.set(key, &raw));
    match result {
        Ok(()) => debug!(key, "saved"),
        Err(e) => warn!(key, error = %e, "failed to save"),
    }
}

pub struct JobRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> JobRepository<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Loads the job list. Missing or malformed data is replaced by the seed
    /// list, which is written back. Out-of-range progress is normalized.
    pub fn load(&self) -> Vec<Job> {
        match read_json::<Vec<Job>>(self.store, JOBS_KEY) {
            Some(jobs) => jobs.into_iter().map(Job::normalized).collect(),
            None => {
                let jobs = seed_jobs();
                self.save(&jobs);
                jobs
            }
        }
    }

    pub fn save(&self, jobs: &[Job]) {
        write_json(self.store, JOBS_KEY, jobs);
    }

    /// Replaces one job in the stored list by id. Unknown ids are ignored.
    pub fn upsert(&self, job: &Job) {
        let mut jobs = self.load();
        let Some(slot) = jobs.iter_mut().find(|j| j.id == job.id) else {
            return;
        };
        *slot = job.clone();
        self.save(&jobs);
    }
}

/// Server-side copy of the campaign list used by the simulated API.
pub struct CampaignRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> CampaignRepository<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Loads the campaigns, falling back to the seed list.
    pub fn load(&self) -> Vec<Campaign> {
        read_json(self.store, CAMPAIGNS_KEY).unwrap_or_else(seed_campaigns)
    }

    pub fn save(&self, campaigns: &[Campaign]) {
        write_json(self.store, CAMPAIGNS_KEY, campaigns);
    }

    /// Replaces one campaign by id. Returns `false` for an unknown id.
    pub fn update(&self, campaign: &Campaign) -> bool {
        let mut campaigns = self.load();
        let Some(slot) = campaigns.iter_mut().find(|c| c.id == campaign.id) else {
            return false;
        };
        *slot = campaign.clone();
        self.save(&campaigns);
        true
    }
}

pub struct AssetRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> AssetRepository<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// The whole campaign id to assets map; empty when missing or malformed.
    pub fn load_all(&self) -> BTreeMap<String, Vec<Asset>> {
        read_json(self.store, ASSETS_KEY).unwrap_or_default()
    }

    pub fn campaign_assets(&self, campaign_id: &str) -> Vec<Asset> {
        self.load_all().remove(campaign_id).unwrap_or_default()
    }

    pub fn save_campaign_assets(&self, campaign_id: &str, assets: &[Asset]) {
        let mut all = self.load_all();
        all.insert(campaign_id.to_string(), assets.to_vec());
        write_json(self.store, ASSETS_KEY, &all);
    }

    /// Attaches finished uploads named `names` and returns the new list.
    pub fn attach(&self, campaign_id: &str, names: &[String]) -> Vec<Asset> {
        let mut assets = self.campaign_assets(campaign_id);
        assets.extend(names.iter().cloned().map(Asset::uploaded));
        self.save_campaign_assets(campaign_id, &assets);
        assets
    }

    /// Removes assets by id and returns the new list.
    pub fn detach(&self, campaign_id: &str, ids: &[String]) -> Vec<Asset> {
        let mut assets = self.campaign_assets(campaign_id);
        let before = assets.len();
        assets.retain(|a| !ids.contains(&a.id));
        if assets.len() != before {
            self.save_campaign_assets(campaign_id, &assets);
        }
        assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::JobStatus;
    use std::collections::HashMap;
    use std::sync::{Mutex, PoisonError};

    /// In-process store.
    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self::default()
        }
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Option<String> {
            self.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned()
        }

        fn set(&self, key: &str, value: &str) -> Result<(), OpsdeskError> {
            self.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[test]
    fn missing_jobs_load_seed_and_persist_it() {
        let store = MemoryStore::new();
        let jobs = JobRepository::new(&store).load();
        assert_eq!(jobs, seed_jobs());
        assert!(store.get(JOBS_KEY).is_some());
    }

    #[test]
    fn malformed_jobs_load_seed() {
        let store = MemoryStore::new();
        store.set(JOBS_KEY, "this is not json").unwrap();

        let jobs = JobRepository::new(&store).load();
        assert_eq!(jobs, seed_jobs());
        // The bad value was overwritten with the seed.
        let raw = store.get(JOBS_KEY).unwrap();
        assert!(serde_json::from_str::<Vec<Job>>(&raw).is_ok());
    }

    #[test]
    fn save_then_load_returns_same_jobs() {
        let store = MemoryStore::new();
        let repo = JobRepository::new(&store);
        let mut jobs = seed_jobs();
        jobs[0].status = JobStatus::Cancelled;
        jobs.push(Job::new("Export audience".into()));

        repo.save(&jobs);
        assert_eq!(repo.load(), jobs);
    }

    #[test]
    fn out_of_range_progress_is_capped_on_load() {
        let store = MemoryStore::new();
        let mut jobs = seed_jobs();
        jobs[1].progress = 150;
        let raw = serde_json::to_string(&jobs).unwrap();
        store.set(JOBS_KEY, &raw).unwrap();

        let loaded = JobRepository::new(&store).load();
        assert_eq!(loaded[1].status, JobStatus::Processing);
        assert_eq!(loaded[1].progress, 100);
        assert_eq!(loaded[0], seed_jobs()[0]);
    }

    #[test]
    fn upsert_replaces_by_id() {
        let store = MemoryStore::new();
        let repo = JobRepository::new(&store);
        let mut job = repo.load().remove(1);
        job.progress = 80;

        repo.upsert(&job);
        assert_eq!(repo.load()[1].progress, 80);

        repo.upsert(&Job::new("stranger".into()));
        assert_eq!(repo.load().len(), seed_jobs().len());
    }

    #[test]
    fn assets_default_to_empty() {
        let store = MemoryStore::new();
        let repo = AssetRepository::new(&store);
        assert!(repo.campaign_assets("1").is_empty());

        store.set(ASSETS_KEY, "{not json").unwrap();
        assert!(repo.load_all().is_empty());
    }

    #[test]
    fn assets_are_kept_per_campaign() {
        let store = MemoryStore::new();
        let repo = AssetRepository::new(&store);

        let first = repo.attach("1", &["hero.png".into(), "banner.jpg".into()]);
        repo.attach("2", &["promo.mp4".into()]);
        assert_eq!(first.len(), 2);
        assert_eq!(repo.campaign_assets("2").len(), 1);

        let left = repo.detach("1", &[first[0].id.clone()]);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "banner.jpg");
        assert_eq!(repo.campaign_assets("2")[0].name, "promo.mp4");
    }

    #[test]
    fn campaigns_fall_back_to_seed_and_round_trip() {
        let store = MemoryStore::new();
        let repo = CampaignRepository::new(&store);
        let mut campaigns = repo.load();
        assert_eq!(campaigns, seed_campaigns());

        campaigns[0].status = crate::state_machine::CampaignStatus::Paused;
        repo.save(&campaigns);
        assert_eq!(repo.load(), campaigns);

        store.set(CAMPAIGNS_KEY, "[{\"id\": 1}]").unwrap();
        assert_eq!(repo.load(), seed_campaigns());
    }

    #[test]
    fn campaign_update_replaces_by_id() {
        let store = MemoryStore::new();
        let repo = CampaignRepository::new(&store);
        let mut campaign = repo.load().remove(2);
        campaign.name = "New Launch EU".into();
        campaign.budget = 7500;

        assert!(repo.update(&campaign));
        let stored = repo.load();
        assert_eq!(stored[2], campaign);
        assert_eq!(stored.len(), seed_campaigns().len());

        campaign.id = "404".into();
        assert!(!repo.update(&campaign));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert!(store.get(JOBS_KEY).is_none());

        let repo = JobRepository::new(&store);
        let jobs = repo.load();
        assert!(store.dir().join("jobs-data.json").exists());
        assert_eq!(JobRepository::new(&FileStore::new(store.dir())).load(), jobs);
    }
}
