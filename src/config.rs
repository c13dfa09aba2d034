//! Configuração do opsdesk carregada a partir de `opsdesk.toml`.
//!
//! A struct [`OpsdeskConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `OPSDESK_STORAGE_DIR` tem precedência sobre o arquivo.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::OpsdeskError;

/// Configuração de nível superior carregada de `opsdesk.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct OpsdeskConfig {
    /// Intervalo entre ticks da simulação, em milissegundos.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Probabilidade de um job terminar como `failed` ao atingir 100%.
    #[serde(default = "default_failure_probability")]
    pub failure_probability: f64,

    /// Menor incremento de progresso por tick.
    #[serde(default = "default_min_step")]
    pub min_step: u8,

    /// Maior incremento de progresso por tick.
    #[serde(default = "default_max_step")]
    pub max_step: u8,

    /// Tempo de exibição de uma notificação, em milissegundos.
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,

    /// Taxa de falha simulada para mudanças de status de campanhas.
    #[serde(default = "default_remote_failure_rate")]
    pub remote_failure_rate: f64,

    /// Taxa de falha simulada ao buscar a lista de campanhas.
    #[serde(default = "default_fetch_failure_rate")]
    pub fetch_failure_rate: f64,

    /// Latência mínima da API simulada, em milissegundos.
    #[serde(default = "default_remote_min_delay_ms")]
    pub remote_min_delay_ms: u64,

    /// Latência máxima da API simulada, em milissegundos.
    #[serde(default = "default_remote_max_delay_ms")]
    pub remote_max_delay_ms: u64,

    /// Quantidade de campanhas por página.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Anexa uma ação de desfazer às notificações de sucesso.
    #[serde(default)]
    pub offer_undo: bool,

    /// Diretório onde o armazenamento local grava seus arquivos.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

// Valor padrão do tick: 1200ms.
fn default_tick_interval_ms() -> u64 {
    1200
}

// Valor padrão da probabilidade de falha: 0.2.
fn default_failure_probability() -> f64 {
    0.2
}

fn default_min_step() -> u8 {
    10
}

fn default_max_step() -> u8 {
    30
}

// Valor padrão da notificação: 4000ms.
fn default_toast_duration_ms() -> u64 {
    4000
}

fn default_remote_failure_rate() -> f64 {
    0.2
}

fn default_fetch_failure_rate() -> f64 {
    0.15
}

fn default_remote_min_delay_ms() -> u64 {
    600
}

fn default_remote_max_delay_ms() -> u64 {
    1100
}

fn default_page_size() -> usize {
    5
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".opsdesk")
}

impl Default for OpsdeskConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            failure_probability: default_failure_probability(),
            min_step: default_min_step(),
            max_step: default_max_step(),
            toast_duration_ms: default_toast_duration_ms(),
            remote_failure_rate: default_remote_failure_rate(),
            fetch_failure_rate: default_fetch_failure_rate(),
            remote_min_delay_ms: default_remote_min_delay_ms(),
            remote_max_delay_ms: default_remote_max_delay_ms(),
            page_size: default_page_size(),
            offer_undo: false,
            storage_dir: default_storage_dir(),
        }
    }
}

impl OpsdeskConfig {
    /// Carrega a configuração de `opsdesk.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("opsdesk.toml"))
    }

    /// Carrega a configuração de um caminho explícito.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<OpsdeskConfig>(&contents).map_err(OpsdeskError::from)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo para o diretório de armazenamento.
        if let Ok(dir) = std::env::var("OPSDESK_STORAGE_DIR")
            && !dir.is_empty()
        {
            config.storage_dir = PathBuf::from(dir);
        }

        config.normalize()?;
        Ok(config)
    }

    /// Restringe probabilidades a [0, 1] e rejeita combinações impossíveis.
    pub fn normalize(&mut self) -> Result<(), OpsdeskError> {
        for (name, value) in [
            ("failure_probability", self.failure_probability),
            ("remote_failure_rate", self.remote_failure_rate),
            ("fetch_failure_rate", self.fetch_failure_rate),
        ] {
            if value.is_nan() {
                return Err(OpsdeskError::Config(format!("{name} must be a number, got NaN")));
            }
        }
        self.failure_probability = self.failure_probability.clamp(0.0, 1.0);
        self.remote_failure_rate = self.remote_failure_rate.clamp(0.0, 1.0);
        self.fetch_failure_rate = self.fetch_failure_rate.clamp(0.0, 1.0);
        self.max_step = self.max_step.min(100);

        if self.min_step > self.max_step {
            return Err(OpsdeskError::Config(format!(
                "min_step ({}) is greater than max_step ({})",
                self.min_step, self.max_step
            )));
        }
        if self.min_step == 0 {
            return Err(OpsdeskError::Config("min_step must be at least 1".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(OpsdeskError::Config("tick_interval_ms must be positive".into()));
        }
        if self.remote_min_delay_ms > self.remote_max_delay_ms {
            self.remote_max_delay_ms = self.remote_min_delay_ms;
        }
        if self.page_size == 0 {
            self.page_size = default_page_size();
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }
}
