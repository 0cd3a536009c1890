//! SimulatedHandler - a stand-in device with a known secret

use async_trait::async_trait;
use tracing::{debug, info};

use super::{AttemptHandler, AttemptReport, HandlerError};
use crate::pattern::Pattern;

/// Accepts exactly one pattern
pub struct SimulatedHandler {
    secret: Pattern,
}

impl SimulatedHandler {
    pub fn new(secret: Pattern) -> Self {
        debug!(secret = %secret, "SimulatedHandler::new: called");
        Self { secret }
    }
}

#[async_trait]
impl AttemptHandler for SimulatedHandler {
    async fn attempt(&self, pattern: &Pattern) -> Result<AttemptReport, HandlerError> {
        debug!(key = %pattern.key(), "SimulatedHandler::attempt: called");
        if pattern.key() == self.secret.key() {
            info!(key = %pattern.key(), "SimulatedHandler::attempt: secret matched");
            Ok(AttemptReport::success())
        } else {
            Ok(AttemptReport::failure())
        }
    }

    fn name(&self) -> &'static str {
        "test"
    }
}
