//! PrintHandler - shows each pattern on the grid instead of trying it

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{AttemptHandler, AttemptReport, HandlerError};
use crate::grid::GridGraph;
use crate::pattern::Pattern;
use crate::render::render_pattern;

pub struct PrintHandler {
    graph: Arc<GridGraph>,
}

impl PrintHandler {
    pub fn new(graph: Arc<GridGraph>) -> Self {
        Self { graph }
    }

    /// Lines printed for one pattern
    pub fn lines(&self, pattern: &Pattern) -> Vec<String> {
        let mut lines = vec![format!("[PRINT] Current pattern {}", pattern)];
        lines.extend(render_pattern(&self.graph, pattern));
        lines
    }
}

#[async_trait]
impl AttemptHandler for PrintHandler {
    async fn attempt(&self, pattern: &Pattern) -> Result<AttemptReport, HandlerError> {
        debug!(key = %pattern.key(), "PrintHandler::attempt: called");
        for line in self.lines(pattern) {
            println!("{}", line);
        }
        println!();
        Ok(AttemptReport::failure())
    }

    fn name(&self) -> &'static str {
        "print"
    }

    fn is_observational(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patternledger::AttemptOutcome;

    #[tokio::test]
    async fn test_print_never_succeeds() {
        let graph = Arc::new(GridGraph::build(3).unwrap());
        let handler = PrintHandler::new(Arc::clone(&graph));
        let pattern = Pattern::from_labels(&graph, &["1", "2", "3"]).unwrap();

        let lines = handler.lines(&pattern);
        assert_eq!(lines[0], "[PRINT] Current pattern 123");
        assert_eq!(lines[1], "●●●    1 2 3");
        assert_eq!(lines.len(), 4);

        assert_eq!(handler.attempt(&pattern).await.unwrap().outcome, AttemptOutcome::Failure);
        assert!(handler.is_observational());
    }
}
