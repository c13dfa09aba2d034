//! Interface de linha de comando do opsdesk baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] para jobs
//! (jobs, simulate, retry, cancel) e campanhas (campaigns, campaign, pause,
//! activate, assets), além das flags globais (--tick-ms, --failure-rate, --verbose).

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::campaign::SortKey;
use crate::state_machine::CampaignStatus;

/// opsdesk: painel de operações para campanhas e jobs em segundo plano.
#[derive(Debug, Parser)]
#[command(name = "opsdesk", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Intervalo entre ticks da simulação, em milissegundos.
    #[arg(long, global = true)]
    pub tick_ms: Option<u64>,

    /// Probabilidade de um job falhar ao chegar em 100%.
    #[arg(long, global = true)]
    pub failure_rate: Option<f64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Status de campanha aceito pela CLI, mapeado para [`CampaignStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Active,
    Paused,
    Draft,
}

impl From<StatusArg> for CampaignStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => CampaignStatus::Active,
            StatusArg::Paused => CampaignStatus::Paused,
            StatusArg::Draft => CampaignStatus::Draft,
        }
    }
}

/// Coluna de ordenação da lista de campanhas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Name,
    Budget,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortKey::Name,
            SortArg::Budget => SortKey::Budget,
        }
    }
}

/// Alvos de uma mudança de status: ids explícitos ou a página inteira.
#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Ids das campanhas.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub ids: Vec<String>,

    /// Seleciona todas as campanhas visíveis na página.
    #[arg(long, default_value_t = false)]
    pub all: bool,

    /// Página usada com --all (começa em 1).
    #[arg(long, default_value_t = 1, requires = "all")]
    pub page: usize,

    /// Oferece desfazer logo após o sucesso.
    #[arg(long, default_value_t = false)]
    pub undo: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lista os jobs salvos.
    Jobs,

    /// Simula todos os jobs pendentes ou em processamento até terminarem.
    Simulate,

    /// Reinicia um job que falhou e acompanha a nova execução.
    Retry {
        /// Id do job.
        id: String,
    },

    /// Cancela um job pendente ou em processamento.
    Cancel {
        /// Id do job.
        id: String,
    },

    /// Lista as campanhas com busca, filtro, ordenação e paginação.
    Campaigns {
        /// Trecho do nome (sem diferenciar maiúsculas).
        #[arg(long, default_value = "")]
        search: String,

        /// Filtra por status; pode ser repetido.
        #[arg(long = "status", value_enum)]
        statuses: Vec<StatusArg>,

        /// Coluna de ordenação.
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Ordena de forma decrescente.
        #[arg(long, default_value_t = false)]
        desc: bool,

        /// Página (começa em 1).
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Mostra uma campanha e, com flags, edita nome, orçamento ou status.
    Campaign {
        /// Id da campanha.
        id: String,

        /// Novo nome (não pode ficar vazio).
        #[arg(long)]
        name: Option<String>,

        /// Novo orçamento (maior que zero).
        #[arg(long, allow_negative_numbers = true)]
        budget: Option<i64>,

        /// Novo status.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },

    /// Pausa as campanhas informadas (atualização otimista).
    Pause(SelectionArgs),

    /// Reativa as campanhas informadas (atualização otimista).
    Activate(SelectionArgs),

    /// Lista ou edita os assets de uma campanha.
    Assets {
        /// Id da campanha.
        campaign_id: String,

        /// Nome de um asset a anexar; pode ser repetido.
        #[arg(long = "add")]
        add: Vec<String>,

        /// Id de um asset a remover; pode ser repetido.
        #[arg(long = "remove")]
        remove: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_retry_subcommand() {
        let cli = Cli::parse_from(["opsdesk", "retry", "4"]);
        match cli.command {
            Command::Retry { id } => assert_eq!(id, "4"),
            _ => panic!("expected Retry command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "opsdesk",
            "--tick-ms",
            "500",
            "--failure-rate",
            "0.5",
            "--verbose",
            "simulate",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.tick_ms, Some(500));
        assert_eq!(cli.failure_rate, Some(0.5));
        assert!(matches!(cli.command, Command::Simulate));
    }

    #[test]
    fn cli_parses_campaign_query() {
        let cli = Cli::parse_from([
            "opsdesk",
            "campaigns",
            "--search",
            "sale",
            "--status",
            "active",
            "--status",
            "draft",
            "--sort",
            "budget",
            "--desc",
            "--page",
            "2",
        ]);
        match cli.command {
            Command::Campaigns {
                search,
                statuses,
                sort,
                desc,
                page,
            } => {
                assert_eq!(search, "sale");
                assert_eq!(statuses, vec![StatusArg::Active, StatusArg::Draft]);
                assert_eq!(sort, Some(SortArg::Budget));
                assert!(desc);
                assert_eq!(page, 2);
            }
            _ => panic!("expected Campaigns command"),
        }
    }

    #[test]
    fn cli_parses_campaign_edit() {
        let cli = Cli::parse_from(["opsdesk", "campaign", "2", "--budget", "-5", "--status", "active"]);
        match cli.command {
            Command::Campaign {
                id,
                name,
                budget,
                status,
            } => {
                assert_eq!(id, "2");
                assert_eq!(name, None);
                assert_eq!(budget, Some(-5));
                assert_eq!(status, Some(StatusArg::Active));
            }
            _ => panic!("expected Campaign command"),
        }
    }

    #[test]
    fn cli_pause_requires_ids_or_all() {
        assert!(Cli::try_parse_from(["opsdesk", "pause"]).is_err());
        assert!(Cli::try_parse_from(["opsdesk", "pause", "1", "--all"]).is_err());

        let cli = Cli::parse_from(["opsdesk", "pause", "1", "4"]);
        match cli.command {
            Command::Pause(selection) => {
                assert_eq!(selection.ids, vec!["1", "4"]);
                assert!(!selection.all);
                assert!(!selection.undo);
            }
            _ => panic!("expected Pause command"),
        }
    }

    #[test]
    fn cli_activate_whole_page_with_undo() {
        let cli = Cli::parse_from(["opsdesk", "activate", "--all", "--page", "2", "--undo"]);
        match cli.command {
            Command::Activate(selection) => {
                assert!(selection.ids.is_empty());
                assert!(selection.all);
                assert_eq!(selection.page, 2);
                assert!(selection.undo);
            }
            _ => panic!("expected Activate command"),
        }
    }

    #[test]
    fn cli_parses_asset_edits() {
        let cli = Cli::parse_from(["opsdesk", "assets", "3", "--add", "hero.png", "--add", "cta.gif"]);
        match cli.command {
            Command::Assets {
                campaign_id,
                add,
                remove,
            } => {
                assert_eq!(campaign_id, "3");
                assert_eq!(add, vec!["hero.png", "cta.gif"]);
                assert!(remove.is_empty());
            }
            _ => panic!("expected Assets command"),
        }
    }

    #[test]
    fn status_arg_maps_to_campaign_status() {
        assert_eq!(CampaignStatus::from(StatusArg::Paused), CampaignStatus::Paused);
        assert_eq!(SortKey::from(SortArg::Name), SortKey::Name);
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
