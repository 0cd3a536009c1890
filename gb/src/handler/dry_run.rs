//! DryRunHandler - logs the attempt it would have made

use async_trait::async_trait;
use tracing::info;

use super::{AttemptHandler, AttemptReport, HandlerError};
use crate::pattern::Pattern;

#[derive(Debug, Default)]
pub struct DryRunHandler;

impl DryRunHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AttemptHandler for DryRunHandler {
    async fn attempt(&self, pattern: &Pattern) -> Result<AttemptReport, HandlerError> {
        info!(key = %pattern.key(), length = pattern.len(), "DryRunHandler::attempt: would attempt");
        Ok(AttemptReport::failure().with_detail("dry run"))
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn is_observational(&self) -> bool {
        true
    }
}
