use crate::config::ObservabilitySettings;
use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured logging.
///
/// `RUST_LOG` overrides the configured level. Logs go to stderr so stdout
/// stays free for analysis output.
pub fn init_telemetry(settings: &ObservabilitySettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if settings.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::debug!("Commitment consistency telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the records of one analysis run
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span carrying the meeting being analyzed
pub fn create_meeting_span(meeting_id: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "meeting_analysis",
        meeting.id = meeting_id,
        correlation.id = correlation_id
    )
}
