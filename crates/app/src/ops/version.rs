use clap::Args;

use crate::version::build_info;

#[derive(Args, Debug, Clone)]
pub struct Version {
    /// Print build information as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("Version operation failed: {0}")]
    Failed(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Version {
    type Error = VersionError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let build = build_info();
        if self.json {
            Ok(serde_json::to_string_pretty(&build)?)
        } else {
            Ok(build.to_string())
        }
    }
}
