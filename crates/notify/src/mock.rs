//! Mock notifier for local runs and tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{InvitationNotice, Notifier, NotifyError};

/// Records every notice instead of delivering it. Tests inspect the log;
/// local runs get a tracing line per notice.
#[derive(Default, Clone)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<InvitationNotice>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<InvitationNotice> {
        self.sent.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|log| log.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_invitation(&self, notice: &InvitationNotice) -> Result<(), NotifyError> {
        tracing::info!(
            team = %notice.team_name,
            channel = ?notice.channel,
            "Mock invitation notice"
        );
        self.sent
            .lock()
            .map_err(|_| NotifyError::Delivery("Mock log poisoned".to_string()))?
            .push(notice.clone());
        Ok(())
    }
}
