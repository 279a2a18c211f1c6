//! Transient user notifications shared by the services

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::state::{Subject, Subscription};

/// How long a message stays up
pub const DISMISS_AFTER: Duration = Duration::from_secs(3);

/// Displayed message with the count of its showings
///
/// The count tells a dismiss timer whether its showing is still the latest one.
#[derive(Clone, Default)]
struct Channel {
    message: Subject<String>,
    shown: Arc<AtomicU64>,
}

impl Channel {
    async fn show(&self, message: String) {
        let showing = self.shown.fetch_add(1, Ordering::SeqCst) + 1;
        self.message.set(message.clone()).await;

        let channel = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DISMISS_AFTER).await;
            // Later showings have their own timer, even of the same message
            let dismissed = channel
                .message
                .replace_if(|current| {
                    let latest = channel.shown.load(Ordering::SeqCst) == showing;
                    (latest && !current.is_empty()).then(String::new)
                })
                .await;
            if dismissed {
                debug!(message, "Notification dismissed");
            }
        });
    }

    async fn clear(&self) {
        self.message
            .replace_if(|current| (!current.is_empty()).then(String::new))
            .await;
    }
}

/// Error and success messages, plus the loading flag
///
/// An empty message means there is nothing to show.
#[derive(Clone, Default)]
pub struct Notifications {
    error: Channel,
    success: Channel,
    loading: Subject<bool>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows the error, dismissing it after `DISMISS_AFTER`
    pub async fn error(&self, message: impl Into<String>) {
        self.error.show(message.into()).await
    }

    /// Shows the success message, dismissing it after `DISMISS_AFTER`
    pub async fn success(&self, message: impl Into<String>) {
        self.success.show(message.into()).await
    }

    /// Clears both messages
    pub async fn clear(&self) {
        self.error.clear().await;
        self.success.clear().await;
    }

    pub async fn set_loading(&self, loading: bool) {
        self.loading.replace_if(|current| (*current != loading).then_some(loading)).await;
    }

    pub async fn errors(&self) -> Subscription<String> {
        self.error.message.subscribe().await
    }

    pub async fn successes(&self) -> Subscription<String> {
        self.success.message.subscribe().await
    }

    pub async fn loading(&self) -> Subscription<bool> {
        self.loading.subscribe().await
    }

    /// Currently displayed error
    pub async fn current_error(&self) -> String {
        self.error.message.get().await
    }

    /// Currently displayed success message
    pub async fn current_success(&self) -> String {
        self.success.message.get().await
    }

    pub async fn is_loading(&self) -> bool {
        self.loading.get().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn messages_dismissed() {
        let notifications = Notifications::new();
        notifications.error("Intern not found").await;
        notifications.success("Saved").await;
        assert_eq!(notifications.current_error().await, "Intern not found");

        tokio::time::sleep(DISMISS_AFTER + Duration::from_millis(10)).await;
        settle().await;

        assert_eq!(notifications.current_error().await, "");
        assert_eq!(notifications.current_success().await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn newer_message_outlives_older_timer() {
        let notifications = Notifications::new();
        notifications.error("First").await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        notifications.error("Second").await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        settle().await;
        assert_eq!(notifications.current_error().await, "Second");

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(notifications.current_error().await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_message_gets_full_time() {
        let notifications = Notifications::new();
        notifications.success("Saved").await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        notifications.success("Saved").await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        settle().await;
        assert_eq!(notifications.current_success().await, "Saved");

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(notifications.current_success().await, "");
    }

    #[tokio::test]
    async fn clear_and_loading() {
        let notifications = Notifications::new();
        let mut loading = notifications.loading().await;
        assert_eq!(loading.next().await, Some(false));

        notifications.set_loading(true).await;
        notifications.set_loading(true).await;
        notifications.set_loading(false).await;
        assert_eq!(loading.try_next(), Some(true));
        assert_eq!(loading.try_next(), Some(false));
        assert_eq!(loading.try_next(), None);

        notifications.error("Boom").await;
        notifications.clear().await;
        assert_eq!(notifications.current_error().await, "");
    }
}
