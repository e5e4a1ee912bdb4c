use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::{PacingArgs, ScorerArgs};
use crate::engine::EngineSettings;
use crate::scoring::{ExternalScorer, ScorerRegistry};
use crate::translate::RetryPolicy;

pub mod aggregate;
pub mod docs;
pub mod probe;
pub mod refresh;
pub mod review;
pub mod run;
pub mod score;
pub mod status;

fn engine_settings(pacing: &PacingArgs) -> EngineSettings {
    let delay = Duration::from_millis(pacing.delay_ms);
    EngineSettings {
        call_delay: delay,
        item_delay: delay,
        retry: RetryPolicy {
            max_attempts: pacing.max_attempts.max(1),
            base_delay: Duration::from_millis(pacing.retry_base_ms),
            max_delay: Duration::from_millis(pacing.retry_max_ms),
        },
    }
}

fn scorer_registry(args: &ScorerArgs) -> Result<ScorerRegistry> {
    match args.scorer_command.as_deref() {
        Some(command_line) if !command_line.trim().is_empty() => {
            let external = ExternalScorer::from_command_line(command_line)?
                .with_reply_timeout(Duration::from_secs(args.scorer_timeout_secs.max(1)));
            info!(command = %command_line, "neural metrics delegated to external scorer");
            Ok(ScorerRegistry::with_external(external))
        }
        _ => {
            warn!("no --scorer-command given; only BLEU and chrF will be computed");
            Ok(ScorerRegistry::native_only())
        }
    }
}
