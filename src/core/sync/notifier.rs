use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Webhook rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),
}

/// Outbound sink for run summaries.
#[async_trait]
pub trait RunNotifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}
