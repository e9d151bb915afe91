use clap::Args;

use crate::state::{AppConfig, AppState, LOGS_DIR_NAME};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Fee the local registry charges for creating a vault
    #[arg(long)]
    pub creation_fee: Option<u64>,

    /// Registry label bound into encryption policies
    #[arg(long)]
    pub registry: Option<String>,

    /// Default log level
    #[arg(long, default_value = "warn")]
    pub default_log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let fangorn_dir = AppState::fangorn_dir(ctx.config_path.clone())?;
        let mut config = AppConfig {
            log_level: self.default_log_level.clone(),
            log_dir: Some(fangorn_dir.join(LOGS_DIR_NAME)),
            ..Default::default()
        };
        if let Some(fee) = self.creation_fee {
            config.creation_fee = fee;
        }
        if let Some(registry) = &self.registry {
            config.orchestrator.registry = registry.clone();
        }

        let state = AppState::init(Some(fangorn_dir), Some(config))?;

        let output = format!(
            "Initialized fangorn directory at: {}\n\
             - Config: {}\n\
             - Registry: {}\n\
             - Circuit: {}\n\
             - Creation fee: {}\n\
             - Log level: {}",
            state.fangorn_dir.display(),
            state.config_path.display(),
            state.config.orchestrator.registry,
            state.config.orchestrator.circuit_id,
            state.config.creation_fee,
            state.config.log_level,
        );

        Ok(output)
    }
}
