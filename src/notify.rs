//! Notification relay
//!
//! Ledger operations emit a [`Notification`] after their writes are committed.
//! Messages go through a bounded queue to a background worker that delivers
//! them through a [`NotificationGateway`] with its own retry policy. Delivery
//! failures are logged and dropped; they never reach the caller that caused
//! the notification.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::{ChannelId, UserId};

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Publish the ad of a bounty to a channel
    PostAd {
        bounty_id: String,
        channel_id: ChannelId,
        ad_text: String,
        ad_link: String,
    },
    /// Tell a channel owner their payout was released
    PayoutReleased {
        user_id: UserId,
        amount: f64,
        bounty_id: String,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::PostAd { .. } => "post_ad",
            Notification::PayoutReleased { .. } => "payout_released",
        }
    }
}

/// Upstream delivery failure
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Carries no request URL, which would embed the bot token
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Telegram API error ({code}): {description}")]
    Api { code: i64, description: String },

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Post ad text with a link button to a channel
    async fn post_ad(
        &self,
        channel_id: ChannelId,
        ad_text: &str,
        ad_link: &str,
    ) -> Result<(), NotifyError>;

    /// Send a plain text message to a user
    async fn notify_user(&self, user_id: UserId, text: &str) -> Result<(), NotifyError>;
}

pub fn payout_message(amount: f64, bounty_id: &str) -> String {
    format!(
        "✅ Payout Released!\n\n💰 Amount: {} TON\n📊 Bounty ID: {}\n\n\
         Your earnings have been transferred to your wallet.",
        amount, bounty_id
    )
}

async fn deliver(gateway: &dyn NotificationGateway, msg: &Notification) -> Result<(), NotifyError> {
    match msg {
        Notification::PostAd {
            channel_id,
            ad_text,
            ad_link,
            ..
        } => gateway.post_ad(*channel_id, ad_text, ad_link).await,
        Notification::PayoutReleased {
            user_id,
            amount,
            bounty_id,
        } => {
            gateway
                .notify_user(*user_id, &payout_message(*amount, bounty_id))
                .await
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before retry `n` is `n * base_delay` plus up to `base_delay / 2` jitter
    pub base_delay: Duration,
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay * attempt;
        let jitter_ms = (self.base_delay.as_millis() / 2) as u64;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Producer side of the relay queue
#[derive(Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Notification>,
}

impl NotificationSender {
    /// Enqueue without waiting; a full or closed queue drops the message
    pub fn send(&self, msg: Notification) {
        let kind = msg.kind();
        match self.tx.try_send(msg) {
            Ok(()) => debug!("Queued {} notification", kind),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Notification queue full, dropping {} notification", kind)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Notification relay stopped, dropping {} notification", kind)
            }
        }
    }
}

pub struct NotificationRelay {
    gateway: Arc<dyn NotificationGateway>,
    policy: RetryPolicy,
    rx: mpsc::Receiver<Notification>,
}

impl NotificationRelay {
    /// Start the worker. It stops once every sender has been dropped and the
    /// queue is drained.
    pub fn spawn(
        gateway: Arc<dyn NotificationGateway>,
        policy: RetryPolicy,
        capacity: usize,
    ) -> (NotificationSender, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let relay = Self {
            gateway,
            policy,
            rx,
        };
        let handle = tokio::spawn(relay.run());
        (NotificationSender { tx }, handle)
    }

    async fn run(mut self) {
        info!(
            "Notification relay started (max_attempts: {})",
            self.policy.max_attempts
        );
        while let Some(msg) = self.rx.recv().await {
            self.deliver_with_retry(&msg).await;
        }
        info!("Notification relay stopped");
    }

    async fn deliver_with_retry(&self, msg: &Notification) {
        let attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            match deliver(self.gateway.as_ref(), msg).await {
                Ok(()) => {
                    debug!("Delivered {} notification", msg.kind());
                    return;
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "Delivering {} notification failed (attempt {}/{}): {}",
                        msg.kind(),
                        attempt,
                        attempts,
                        e
                    );
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                }
                Err(e) => {
                    error!(
                        "Giving up on {} notification after {} attempts: {}",
                        msg.kind(),
                        attempts,
                        e
                    );
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records deliveries; fails the first `fail_first` calls
    #[derive(Default)]
    pub(crate) struct RecordingGateway {
        pub fail_first: u32,
        pub calls: Mutex<u32>,
        pub delivered: Mutex<Vec<String>>,
    }

    impl RecordingGateway {
        fn attempt(&self, what: String) -> Result<(), NotifyError> {
            let mut calls = self.calls.lock();
            *calls += 1;
            if *calls <= self.fail_first {
                return Err(NotifyError::Other("telegram unavailable".to_string()));
            }
            self.delivered.lock().push(what);
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationGateway for RecordingGateway {
        async fn post_ad(
            &self,
            channel_id: ChannelId,
            ad_text: &str,
            _ad_link: &str,
        ) -> Result<(), NotifyError> {
            self.attempt(format!("ad:{}:{}", channel_id, ad_text))
        }

        async fn notify_user(&self, user_id: UserId, text: &str) -> Result<(), NotifyError> {
            self.attempt(format!("user:{}:{}", user_id, text))
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    fn payout() -> Notification {
        Notification::PayoutReleased {
            user_id: 2,
            amount: 10.5,
            bounty_id: "bounty_1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_relay_delivers_in_order() {
        let gateway = Arc::new(RecordingGateway::default());
        let (sender, handle) = NotificationRelay::spawn(gateway.clone(), fast_policy(3), 8);

        sender.send(Notification::PostAd {
            bounty_id: "bounty_1".to_string(),
            channel_id: -100,
            ad_text: "Test ad".to_string(),
            ad_link: "https://test.com".to_string(),
        });
        sender.send(payout());
        drop(sender);
        tokio_test::assert_ok!(handle.await);

        let delivered = gateway.delivered.lock();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0], "ad:-100:Test ad");
        assert!(delivered[1].starts_with("user:2:"));
        assert!(delivered[1].contains("10.5 TON"));
        assert!(delivered[1].contains("bounty_1"));
    }

    #[tokio::test]
    async fn test_relay_retries_transient_failures() {
        let gateway = Arc::new(RecordingGateway {
            fail_first: 2,
            ..Default::default()
        });
        let (sender, handle) = NotificationRelay::spawn(gateway.clone(), fast_policy(3), 8);
        sender.send(payout());
        drop(sender);
        handle.await.unwrap();

        assert_eq!(*gateway.calls.lock(), 3);
        assert_eq!(gateway.delivered.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_relay_gives_up_and_continues() {
        let gateway = Arc::new(RecordingGateway {
            fail_first: 2,
            ..Default::default()
        });
        let (sender, handle) = NotificationRelay::spawn(gateway.clone(), fast_policy(2), 8);
        sender.send(payout());
        sender.send(payout());
        drop(sender);
        handle.await.unwrap();

        // first message exhausts both attempts, second succeeds
        assert_eq!(*gateway.calls.lock(), 3);
        assert_eq!(gateway.delivered.lock().len(), 1);
    }

    #[test]
    fn test_retry_delay_grows() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        let first = policy.delay_for(1);
        let second = policy.delay_for(2);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(150));
        assert!(second >= Duration::from_millis(200) && second <= Duration::from_millis(250));
    }
}
