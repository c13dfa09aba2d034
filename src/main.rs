mod campaign;
mod cli;
mod config;
mod error;
mod logging;
mod outcome;
mod simulator;
mod state_machine;
mod storage;
mod ui;

use std::io::IsTerminal;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::oneshot;
use tracing::info;

use campaign::board::lock;
use campaign::detail;
use campaign::{
    CampaignApi, CampaignBoard, CampaignEdit, CampaignQuery, MutationCoordinator, MutationOutcome,
    SimulatedCampaignApi, SortDirection, SortKey, ToastSlot, UndoAction,
};
use cli::{Cli, Command, SelectionArgs};
use config::OpsdeskConfig;
use error::OpsdeskError;
use outcome::RandomOutcomes;
use simulator::{JobSimulator, SimulatorSettings, UpdateFn};
use state_machine::{CampaignStatus, Job};
use storage::{AssetRepository, CampaignRepository, FileStore, JobRepository};
use ui::JobBoardView;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = OpsdeskConfig::load()?;
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    if let Some(rate) = cli.failure_rate {
        config.failure_probability = rate;
    }
    config.normalize()?;

    let store = FileStore::new(config.storage_dir.clone());
    info!(storage_dir = %store.dir().display(), "opsdesk starting");

    match cli.command {
        Command::Jobs => {
            ui::print_jobs(&JobRepository::new(&store).load());
            Ok(())
        }
        Command::Simulate => simulate(&config, &store).await,
        Command::Retry { id } => retry(&config, &store, &id).await,
        Command::Cancel { id } => cancel(&config, &store, &id),
        Command::Campaigns {
            search,
            statuses,
            sort,
            desc,
            page,
        } => {
            let direction = if desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            let query = CampaignQuery {
                search,
                statuses: statuses.into_iter().map(CampaignStatus::from).collect(),
                sort: sort.map(|key| (SortKey::from(key), direction)),
                page,
                page_size: config.page_size,
            };
            list_campaigns(&config, &store, &query).await
        }
        Command::Campaign {
            id,
            name,
            budget,
            status,
        } => {
            let edit = CampaignEdit {
                name,
                budget,
                status: status.map(CampaignStatus::from),
            };
            campaign_detail(&store, &id, &edit)
        }
        Command::Pause(selection) => {
            change_status(&config, &store, &selection, CampaignStatus::Paused).await
        }
        Command::Activate(selection) => {
            change_status(&config, &store, &selection, CampaignStatus::Active).await
        }
        Command::Assets {
            campaign_id,
            add,
            remove,
        } => assets(&store, &campaign_id, &add, &remove),
    }
}

fn new_simulator(config: &OpsdeskConfig) -> JobSimulator {
    JobSimulator::new(SimulatorSettings::from_config(config), RandomOutcomes::new())
}

fn find_job(jobs: &[Job], id: &str) -> Result<Job, OpsdeskError> {
    jobs.iter()
        .find(|j| j.id == id)
        .cloned()
        .ok_or_else(|| OpsdeskError::JobNotFound(id.to_string()))
}

/// Callback that keeps the in-memory list, the progress bars and the store
/// in step with every snapshot the simulator publishes.
fn persisting_update(store: &FileStore, jobs: Vec<Job>, view: Arc<JobBoardView>) -> UpdateFn {
    let store = store.clone();
    let jobs = Mutex::new(jobs);
    Arc::new(move |job: Job| {
        view.update(&job);
        let mut jobs = jobs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = jobs.iter_mut().find(|j| j.id == job.id) {
            *slot = job;
        }
        JobRepository::new(&store).save(&jobs);
    })
}

/// Waits for every timer to finish, or stops them all on Ctrl-C.
async fn drive(simulator: &JobSimulator) {
    tokio::select! {
        _ = simulator.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, stopping simulation");
            simulator.shutdown();
        }
    }
}

async fn simulate(config: &OpsdeskConfig, store: &FileStore) -> Result<()> {
    let jobs = JobRepository::new(store).load();
    let live: Vec<Job> = jobs
        .iter()
        .filter(|j| j.status.is_simulatable())
        .cloned()
        .collect();
    if live.is_empty() {
        println!("Nothing to simulate: every job has finished.");
        return Ok(());
    }

    let simulator = new_simulator(config);
    let view = Arc::new(JobBoardView::new(&jobs));
    let on_update = persisting_update(store, jobs, Arc::clone(&view));
    for job in live {
        simulator.start_shared(job, Arc::clone(&on_update));
    }

    drive(&simulator).await;
    view.finish();
    Ok(())
}

async fn retry(config: &OpsdeskConfig, store: &FileStore, id: &str) -> Result<()> {
    let jobs = JobRepository::new(store).load();
    let job = find_job(&jobs, id)?;

    let simulator = new_simulator(config);
    let view = Arc::new(JobBoardView::new(std::slice::from_ref(&job)));
    let on_update = persisting_update(store, jobs, Arc::clone(&view));
    if simulator.retry_shared(&job, on_update).is_none() {
        view.finish();
        println!("Job {id} is {}; only failed jobs can be retried.", job.status);
        return Ok(());
    }

    drive(&simulator).await;
    view.finish();
    Ok(())
}

fn cancel(config: &OpsdeskConfig, store: &FileStore, id: &str) -> Result<()> {
    let jobs = JobRepository::new(store).load();
    let job = find_job(&jobs, id)?;

    let persist = store.clone();
    let cancelled = new_simulator(config).cancel(&job, move |job| {
        JobRepository::new(&persist).upsert(&job);
    });
    match cancelled {
        Some(job) => println!("Job {} cancelled at {}%.", job.id, job.progress),
        None => println!("Job {id} is {}; nothing to cancel.", job.status),
    }
    Ok(())
}

fn simulated_api(config: &OpsdeskConfig, store: &FileStore) -> SimulatedCampaignApi {
    SimulatedCampaignApi::from_config(config).with_campaigns(CampaignRepository::new(store).load())
}

async fn list_campaigns(
    config: &OpsdeskConfig,
    store: &FileStore,
    query: &CampaignQuery,
) -> Result<()> {
    let campaigns = simulated_api(config, store)
        .fetch_campaigns()
        .await
        .map_err(OpsdeskError::from)?;
    let page = query.run(&campaigns);
    ui::print_campaign_page(&page, &Default::default());
    Ok(())
}

async fn change_status(
    config: &OpsdeskConfig,
    store: &FileStore,
    selection: &SelectionArgs,
    desired: CampaignStatus,
) -> Result<()> {
    let api = simulated_api(config, store);
    let campaigns = api.fetch_campaigns().await.map_err(OpsdeskError::from)?;
    let offer_undo = config.offer_undo || selection.undo;
    let board = CampaignBoard::new(campaigns).shared();
    let coordinator = MutationCoordinator::new(api, ToastSlot::new(), board)
        .with_toast_duration(config.toast_duration())
        .with_undo(offer_undo);

    {
        let mut board = lock(coordinator.board());
        if let Some(missing) = selection.ids.iter().find(|id| board.get(id).is_none()) {
            return Err(OpsdeskError::CampaignNotFound(missing.clone()).into());
        }
        if selection.all {
            let visible: Vec<String> = CampaignQuery {
                page: selection.page,
                page_size: config.page_size,
                ..Default::default()
            }
            .run(&board.campaigns)
            .items
            .into_iter()
            .map(|c| c.id)
            .collect();
            board.set_page(selection.page);
            board.toggle_all(&visible);
        } else if selection.ids.len() > 1 {
            board.select(&selection.ids);
        }
    }

    let bulk = selection.all || selection.ids.len() > 1;
    let outcome = if bulk && !lock(coordinator.board()).has_targets(desired) {
        MutationOutcome::NoOp
    } else {
        match (desired, selection.ids.as_slice()) {
            (CampaignStatus::Paused, [id]) => coordinator.pause_one(id).await,
            (CampaignStatus::Paused, _) => coordinator.pause_selected().await,
            (_, [id]) => coordinator.apply_to_one(id, desired).await,
            _ => coordinator.apply_to_selection(desired).await,
        }
    };

    let mut persist = None;
    match &outcome {
        MutationOutcome::NoOp => println!("Nothing to change: already {desired}."),
        MutationOutcome::Busy => println!("Another change is still in flight."),
        MutationOutcome::Applied { .. } => persist = Some(coordinator.api().campaigns()),
        MutationOutcome::RolledBack { .. } => {}
    }
    if let Some(notification) = coordinator.sink().current() {
        ui::print_notification(&notification);
        if notification.undo.is_some()
            && std::io::stdin().is_terminal()
            && let Some(restored) = prompt_undo(coordinator.sink(), notification.duration).await
        {
            println!("Undone: {restored} campaign(s) restored.");
            persist = Some(lock(coordinator.board()).campaigns.clone());
        }
    }
    if let Some(campaigns) = persist {
        CampaignRepository::new(store).save(&campaigns);
    }

    let board = lock(coordinator.board());
    let everything = CampaignQuery {
        page_size: board.campaigns.len().max(1),
        ..Default::default()
    };
    ui::print_campaign_page(&everything.run(&board.campaigns), &board.selected);
    Ok(())
}

fn campaign_detail(store: &FileStore, id: &str, edit: &CampaignEdit) -> Result<()> {
    let repo = CampaignRepository::new(store);
    let mut campaign = repo
        .load()
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| OpsdeskError::CampaignNotFound(id.to_string()))?;

    if !edit.is_empty() {
        let edited = edit.apply(&campaign)?;
        if edited == campaign {
            println!("No changes to save.");
        } else {
            repo.update(&edited);
            info!(campaign = id, "campaign saved");
            println!("Saved campaign {id}.");
            campaign = edited;
        }
    }

    let performance = detail::performance(&campaign);
    let trend = match &performance {
        Some(p) => detail::trend(p.impressions, detail::TREND_DAYS, &mut rand::thread_rng()),
        None => Vec::new(),
    };
    ui::print_campaign_detail(&campaign, performance.as_ref(), &trend);
    Ok(())
}

/// Offers the toast's undo until it expires. Enter invokes it.
async fn prompt_undo(toast: &ToastSlot, window: Duration) -> Option<usize> {
    println!("  Press Enter within {}s to undo.", window.as_secs());
    let (tx, rx) = oneshot::channel();
    // Plain thread: a blocked stdin read must not hold the runtime open.
    std::thread::spawn(move || {
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_ok() {
            let _ = tx.send(());
        }
    });

    match tokio::time::timeout(window, rx).await {
        Ok(Ok(())) => toast.take_undo().map(UndoAction::invoke),
        _ => {
            toast.dismiss();
            None
        }
    }
}

fn assets(store: &FileStore, campaign_id: &str, add: &[String], remove: &[String]) -> Result<()> {
    let known = CampaignRepository::new(store).load();
    if !known.iter().any(|c| c.id == campaign_id) {
        return Err(OpsdeskError::CampaignNotFound(campaign_id.to_string()).into());
    }

    let repo = AssetRepository::new(store);
    let mut current = repo.campaign_assets(campaign_id);
    if !add.is_empty() {
        current = repo.attach(campaign_id, add);
    }
    if !remove.is_empty() {
        current = repo.detach(campaign_id, remove);
    }
    ui::print_assets(campaign_id, &current);
    Ok(())
}
