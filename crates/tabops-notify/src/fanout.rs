//! Delivery of one message to several notifiers

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use tabops_core::{NotificationError, Notifier};

/// Sends to every target; reports the first failure after trying them all
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }

    pub fn push(&mut self, target: Arc<dyn Notifier>) {
        self.targets.push(target);
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, subject: &str, body_html: &str) -> Result<(), NotificationError> {
        let mut first_error = None;
        for target in &self.targets {
            if let Err(e) = target.notify(subject, body_html).await {
                warn!(subject, "Notifier failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabops_core::memory::RecordingNotifier;

    #[tokio::test]
    async fn test_failure_does_not_stop_other_targets() {
        let failing = Arc::new(RecordingNotifier::failing());
        let ok = Arc::new(RecordingNotifier::new());
        let fanout = FanoutNotifier::new(vec![failing.clone() as Arc<dyn Notifier>, ok.clone()]);

        let result = fanout.notify("Tableau Audit Alert - dev", "<p>x</p>").await;

        assert!(result.is_err());
        assert_eq!(ok.subjects(), vec!["Tableau Audit Alert - dev".to_string()]);
        assert_eq!(failing.subjects().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_fanout_succeeds() {
        assert!(FanoutNotifier::default().notify("s", "b").await.is_ok());
    }
}
