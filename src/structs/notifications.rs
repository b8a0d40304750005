use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use super::client::Client;
use crate::errors::FishlogError;

pub trait NotificationSource {
    fn unread_count(&self) -> impl Future<Output = Result<u32, FishlogError>> + Send;
}

impl NotificationSource for Client {
    async fn unread_count(&self) -> Result<u32, FishlogError> {
        self.unread_notification_count().await
    }
}

#[derive(Debug, Default)]
struct UnreadState {
    count: u32,
    loading: bool,
}

/// Unread notification badge. Refetched whenever the feed regains focus.
#[derive(Debug)]
pub struct UnreadNotifications<N> {
    source: N,
    state: Mutex<UnreadState>,
}

impl<N: NotificationSource> UnreadNotifications<N> {
    pub fn new(source: N) -> Self {
        Self {
            source,
            state: Mutex::new(UnreadState::default()),
        }
    }

    pub fn unread_count(&self) -> u32 {
        self.state().count
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Re-reads the unread count. Failures are logged and keep the previous count.
    pub async fn refetch(&self) {
        self.state().loading = true;

        let result = self.source.unread_count().await;

        let mut state = self.state();
        state.loading = false;
        match result {
            Ok(count) => state.count = count,
            Err(err) => warn!(%err, "Failed to fetch unread notification count"),
        }
    }

    fn state(&self) -> MutexGuard<'_, UnreadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::{NotificationSource, UnreadNotifications};
    use crate::errors::FishlogError;

    struct Replies(Mutex<VecDeque<Result<u32, FishlogError>>>);

    impl NotificationSource for Replies {
        async fn unread_count(&self) -> Result<u32, FishlogError> {
            self.0.lock().unwrap().pop_front().unwrap()
        }
    }

    #[tokio::test]
    async fn keeps_count_on_failure() {
        let unread = UnreadNotifications::new(Replies(Mutex::new(VecDeque::from(vec![
            Ok(4),
            Err(FishlogError::RequestFailed),
            Ok(0),
        ]))));
        assert_eq!(unread.unread_count(), 0);

        unread.refetch().await;
        assert_eq!(unread.unread_count(), 4);
        assert!(!unread.is_loading());

        unread.refetch().await;
        assert_eq!(unread.unread_count(), 4);
        assert!(!unread.is_loading());

        unread.refetch().await;
        assert_eq!(unread.unread_count(), 0);
    }
}
