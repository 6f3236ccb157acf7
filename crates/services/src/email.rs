//! Mail service trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::ServiceError;

/// Trait for outbound mail.
///
/// Delivery is best-effort by contract: callers log failures and move on.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> Result<(), ServiceError>;
}

/// A recorded outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct InMemoryMailerState {
    sent: Vec<SentMail>,
    fail_on_send: bool,
}

/// In-memory mailer for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMailer {
    state: Arc<RwLock<InMemoryMailerState>>,
}

impl InMemoryMailer {
    /// Creates a new in-memory mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the mailer to fail on the next send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the number of delivered messages.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// The most recently delivered message, if any.
    pub fn last_mail(&self) -> Option<SentMail> {
        self.state.read().unwrap().sent.last().cloned()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_send {
            return Err(ServiceError::Mail("Delivery failed".to_string()));
        }

        state.sent.push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_records_mail() {
        let mailer = InMemoryMailer::new();
        mailer
            .send_mail("jane@example.com", "Hello", "Body")
            .await
            .unwrap();

        assert_eq!(mailer.sent_count(), 1);
        let mail = mailer.last_mail().unwrap();
        assert_eq!(mail.to, "jane@example.com");
        assert_eq!(mail.subject, "Hello");
    }

    #[tokio::test]
    async fn test_fail_on_send() {
        let mailer = InMemoryMailer::new();
        mailer.set_fail_on_send(true);

        let result = mailer.send_mail("jane@example.com", "Hello", "Body").await;
        assert!(matches!(result, Err(ServiceError::Mail(_))));
        assert_eq!(mailer.sent_count(), 0);
    }
}
