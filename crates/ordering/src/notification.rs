//! Post-commit order confirmations.
//!
//! Delivery is best effort: the dispatcher runs on a detached task and every
//! failure ends in a log line and a metric.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Datelike;
use common::UserId;
use domain::Order;
use storage::{StoreError, UserContact, UserDirectory};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Errors raised while delivering a confirmation. Never leave the dispatcher.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("No contact data for user {0}")]
    UnknownUser(UserId),

    #[error("Contact lookup failed: {0}")]
    Lookup(#[from] StoreError),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Sender identity used in confirmations. Built once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub company_name: String,
    pub contact_email: String,
    pub sender: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            company_name: "Test".to_string(),
            contact_email: "noreply@mail.com".to_string(),
            sender: "noreply@mail.com".to_string(),
        }
    }
}

/// A rendered confirmation, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// Renders the invoice sent after an order is stored.
#[derive(Debug, Clone)]
pub struct InvoiceRenderer {
    config: NotificationConfig,
}

impl InvoiceRenderer {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, order: &Order, contact: &UserContact) -> OrderConfirmation {
        let mut body = format!(
            "Hi {},\n\nThank you for your order {}.\n\n",
            contact.full_name, order.id
        );
        for item in &order.items {
            body.push_str(&format!(
                "  {} x{} @ {} = {}\n",
                item.name,
                item.quantity,
                item.unit_price,
                item.line_total()
            ));
        }
        body.push_str(&format!("\nGrand total: {}\n\n", order.grand_total));
        body.push_str(&format!(
            "Questions? Contact us at {}.\n\n(c) {} {}\n",
            self.config.contact_email,
            order.created_at.year(),
            self.config.company_name
        ));

        OrderConfirmation {
            to: contact.email.clone(),
            from: self.config.sender.clone(),
            subject: "Invoice".to_string(),
            body,
        }
    }
}

/// Delivery channel for confirmations.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &OrderConfirmation) -> Result<(), NotificationError>;
}

/// Notifier that writes confirmations to the log instead of a mail server.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &OrderConfirmation) -> Result<(), NotificationError> {
        tracing::info!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            body = %message.body,
            "order confirmation"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<OrderConfirmation>,
    fail_on_send: bool,
}

/// Notifier that records confirmations, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail every send.
    pub async fn set_fail_on_send(&self, fail: bool) {
        self.state.write().await.fail_on_send = fail;
    }

    /// Returns every confirmation delivered so far.
    pub async fn sent(&self) -> Vec<OrderConfirmation> {
        self.state.read().await.sent.clone()
    }

    /// Polls until `count` confirmations were delivered or `timeout` elapses.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.state.read().await.sent.len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, message: &OrderConfirmation) -> Result<(), NotificationError> {
        let mut state = self.state.write().await;
        if state.fail_on_send {
            return Err(NotificationError::Delivery("mail server rejected message".to_string()));
        }
        state.sent.push(message.clone());
        Ok(())
    }
}

/// Looks up the order's creator, renders the invoice and sends it.
#[derive(Clone)]
pub struct NotificationDispatcher<U, N> {
    directory: U,
    notifier: N,
    renderer: InvoiceRenderer,
}

impl<U, N> NotificationDispatcher<U, N>
where
    U: UserDirectory + Clone + 'static,
    N: Notifier + Clone + 'static,
{
    pub fn new(directory: U, notifier: N, config: NotificationConfig) -> Self {
        Self {
            directory,
            notifier,
            renderer: InvoiceRenderer::new(config),
        }
    }

    /// Delivers the confirmation on a detached task.
    ///
    /// The returned handle may be dropped; the task keeps running.
    pub fn dispatch(&self, order: Order) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            match dispatcher.deliver(&order).await {
                Ok(()) => {
                    metrics::counter!("order_notifications_sent_total").increment(1);
                    tracing::debug!(order_id = %order.id, "order confirmation sent");
                }
                Err(e) => {
                    metrics::counter!("order_notifications_failed_total").increment(1);
                    tracing::warn!(order_id = %order.id, error = %e, "order confirmation not sent");
                }
            }
        })
    }

    /// Delivers the confirmation for `order`, reporting any failure.
    pub async fn deliver(&self, order: &Order) -> Result<(), NotificationError> {
        let contact = self
            .directory
            .find_contact(order.created_by)
            .await?
            .ok_or(NotificationError::UnknownUser(order.created_by))?;
        let message = self.renderer.render(order, &contact);
        self.notifier.send(&message).await
    }
}
