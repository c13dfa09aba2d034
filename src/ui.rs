//! Interface de terminal do opsdesk: barras de progresso e saída colorida.
//!
//! Usa as crates `indicatif` para as barras de progresso dos jobs e `console`
//! para estilização com cores. O [`JobBoardView`] acompanha visualmente
//! a simulação de vários jobs ao mesmo tempo.

use std::collections::{BTreeSet, HashMap};

use console::Style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::campaign::{CampaignPage, Notification, NotificationKind, Performance};
use crate::state_machine::{Asset, Campaign, CampaignStatus, Job, JobStatus};

fn job_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Pending => Style::new().dim(),
        JobStatus::Processing => Style::new().cyan(),
        JobStatus::Completed => Style::new().green().bold(),
        JobStatus::Failed => Style::new().red().bold(),
        JobStatus::Cancelled => Style::new().yellow(),
    }
}

fn campaign_style(status: CampaignStatus) -> Style {
    match status {
        CampaignStatus::Active => Style::new().green(),
        CampaignStatus::Paused => Style::new().yellow(),
        CampaignStatus::Draft => Style::new().dim(),
    }
}

/// Uma barra de progresso por job, todas no mesmo painel.
///
/// É `Send + Sync`: pode ser chamada de dentro dos callbacks do simulador.
pub struct JobBoardView {
    // Mantém o painel vivo enquanto as barras existirem.
    _multi: MultiProgress,
    // Barras indexadas pelo id do job.
    bars: HashMap<String, ProgressBar>,
}

impl JobBoardView {
    /// Cria uma barra para cada job, já posicionada no progresso atual.
    pub fn new(jobs: &[Job]) -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template("{prefix:>24} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        let bars = jobs
            .iter()
            .map(|job| {
                let pb = multi.add(ProgressBar::new(100));
                pb.set_style(style.clone());
                pb.set_prefix(job.name.clone());
                (job.id.clone(), pb)
            })
            .collect();

        let view = Self { _multi: multi, bars };
        for job in jobs {
            view.update(job);
        }
        view
    }

    /// Atualiza a barra do job; jobs terminais congelam a barra.
    pub fn update(&self, job: &Job) {
        let Some(pb) = self.bars.get(&job.id) else {
            return;
        };
        let label = job_style(job.status).apply_to(job.status.to_string()).to_string();
        pb.set_position(u64::from(job.display_progress()));
        if job.status.is_terminal() {
            pb.finish_with_message(label);
        } else {
            pb.set_message(label);
        }
    }

    /// Encerra as barras que ainda estiverem ativas.
    pub fn finish(&self) {
        for pb in self.bars.values() {
            if !pb.is_finished() {
                pb.abandon();
            }
        }
    }
}

/// Imprime a lista de jobs como tabela.
pub fn print_jobs(jobs: &[Job]) {
    println!(
        "{:<6} {:<24} {:<18} {:>8}  {}",
        "ID", "NAME", "CREATED", "PROGRESS", "STATUS"
    );
    for job in jobs {
        println!(
            "{:<6} {:<24} {:<18} {:>7}%  {}",
            job.id,
            job.name,
            job.created_at.format("%Y-%m-%d %H:%M"),
            job.display_progress(),
            job_style(job.status).apply_to(job.status)
        );
    }
}

/// Imprime uma página da lista de campanhas, marcando as selecionadas.
pub fn print_campaign_page(page: &CampaignPage, selected: &BTreeSet<String>) {
    println!(
        "  {:<4} {:<18} {:<8} {:>8} {:>12} {:>8} {:>6}",
        "ID", "NAME", "STATUS", "BUDGET", "IMPRESSIONS", "CLICKS", "CTR"
    );
    for campaign in &page.items {
        let mark = if selected.contains(&campaign.id) { "*" } else { " " };
        println!(
            "{mark} {:<4} {:<18} {:<8} {:>8} {:>12} {:>8} {:>5.1}%",
            campaign.id,
            campaign.name,
            campaign_style(campaign.status).apply_to(campaign.status),
            campaign.budget,
            campaign.impressions,
            campaign.clicks,
            campaign.ctr() * 100.0
        );
    }
    let dim = Style::new().dim();
    println!(
        "{}",
        dim.apply_to(format!(
            "page {} of {} ({} campaigns)",
            page.page,
            page.total_pages.max(1),
            page.total
        ))
    );
}

/// Exibe a visão geral de uma campanha, o desempenho e a tendência diária.
pub fn print_campaign_detail(campaign: &Campaign, performance: Option<&Performance>, trend: &[u64]) {
    let label = Style::new().bold();
    println!("{} {}", label.apply_to("Campaign"), campaign.id);
    println!("  name    {}", campaign.name);
    println!("  status  {}", campaign_style(campaign.status).apply_to(campaign.status));
    println!("  budget  {}", campaign.budget);

    let Some(performance) = performance else {
        println!("No performance data available");
        return;
    };
    println!(
        "  impressions {}  clicks {}  CTR {:.2}%",
        performance.impressions, performance.clicks, performance.ctr_percent
    );
    let peak = trend.iter().copied().max().unwrap_or(0).max(1);
    for (day, value) in trend.iter().enumerate() {
        let width = (*value * 30 / peak) as usize;
        println!("  day {} {:<30} {value}", day + 1, "█".repeat(width));
    }
}

/// Exibe uma notificação: verde para sucesso, vermelho para falha.
pub fn print_notification(notification: &Notification) {
    let (icon, style) = match notification.kind {
        NotificationKind::Success => ("✓", Style::new().green().bold()),
        NotificationKind::Failure => ("✗", Style::new().red().bold()),
    };
    let hint = if notification.undo.is_some() { " (undo available)" } else { "" };
    println!("  {} {}{hint}", style.apply_to(icon), notification.message);
}

/// Lista os assets de uma campanha.
pub fn print_assets(campaign_id: &str, assets: &[Asset]) {
    if assets.is_empty() {
        println!("No assets uploaded for campaign {campaign_id}");
        return;
    }
    for asset in assets {
        let state = if asset.uploading {
            format!("uploading {}%", asset.progress)
        } else {
            "ready".to_string()
        };
        println!("{:<38} {:<28} {state}", asset.id, asset.name);
    }
}
