use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::client::Client;
use super::user::UserProgress;
use crate::errors::FishlogError;

/// Anything that can report the current user's leveling state.
pub trait ProgressSource {
    fn fetch_progress(&self) -> impl Future<Output = Result<UserProgress, FishlogError>> + Send;
}

impl ProgressSource for Client {
    async fn fetch_progress(&self) -> Result<UserProgress, FishlogError> {
        let profile = self.fetch_profile(self.user_id).await?;
        Ok(UserProgress::from(&profile))
    }
}

/// A strict level increase between two consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTransition {
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Default)]
struct ProgressState {
    progress: UserProgress,
    /// `None` until the first snapshot is observed. The default progress is not an observation.
    observed_level: Option<u32>,
    just_leveled_up: bool,
    last_transition: Option<LevelTransition>,
    last_applied_write: u64,
    stale: bool,
}

/// Holds the leveling state of the signed-in user and detects level-ups.
///
/// Every write gets a sequence number when it is issued. A write is applied only
/// if nothing issued after it has been applied already, so a slow refresh can
/// never overwrite a newer snapshot.
#[derive(Debug)]
pub struct ProgressStore<S> {
    source: S,
    state: Mutex<ProgressState>,
    write_seq: AtomicU64,
}

impl<S: ProgressSource> ProgressStore<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: Mutex::new(ProgressState::default()),
            write_seq: AtomicU64::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Re-reads the user's progress and replaces the stored snapshot.
    ///
    /// Failures are logged and mark the store stale. The previous snapshot is kept.
    pub async fn refresh_progress(&self) {
        let write = self.next_write();

        match self.source.fetch_progress().await {
            Ok(progress) => self.apply(write, progress),
            Err(err) => {
                let mut state = self.state();
                if write > state.last_applied_write {
                    state.stale = true;
                }
                warn!(%err, write, "Failed to refresh user progress, keeping previous snapshot");
            }
        }
    }

    /// Replaces the stored snapshot wholesale.
    pub fn set_progress(&self, progress: UserProgress) {
        let write = self.next_write();
        self.apply(write, progress);
    }

    pub fn set_just_leveled_up(&self, value: bool) {
        self.state().just_leveled_up = value;
    }

    pub fn progress(&self) -> UserProgress {
        self.state().progress
    }

    pub fn progress_fraction(&self) -> f64 {
        self.state().progress.progress_fraction()
    }

    pub fn just_leveled_up(&self) -> bool {
        self.state().just_leveled_up
    }

    /// The most recent level-up, kept after the flag is acknowledged.
    pub fn last_transition(&self) -> Option<LevelTransition> {
        self.state().last_transition
    }

    /// True when the latest refresh failed and the snapshot may be out of date.
    pub fn is_stale(&self) -> bool {
        self.state().stale
    }

    fn next_write(&self) -> u64 {
        self.write_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply(&self, write: u64, progress: UserProgress) {
        let mut state = self.state();

        if write <= state.last_applied_write {
            debug!(
                write,
                last_applied = state.last_applied_write,
                "Discarding out-of-order progress snapshot"
            );
            return;
        }

        if let Some(previous) = state.observed_level {
            if progress.level > previous {
                info!(from = previous, to = progress.level, "Level up");
                state.just_leveled_up = true;
                state.last_transition = Some(LevelTransition {
                    from: previous,
                    to: progress.level,
                });
            }
        }

        state.observed_level = Some(progress.level);
        state.progress = progress;
        state.last_applied_write = write;
        state.stale = false;
    }

    fn state(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::sync::oneshot;

    use super::{LevelTransition, ProgressSource, ProgressStore};
    use crate::errors::FishlogError;
    use crate::structs::user::UserProgress;

    /// Replies with queued results, in call order.
    #[derive(Default)]
    struct QueuedSource {
        replies: Mutex<VecDeque<Result<UserProgress, FishlogError>>>,
    }

    impl QueuedSource {
        fn with(replies: Vec<Result<UserProgress, FishlogError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    impl ProgressSource for QueuedSource {
        async fn fetch_progress(&self) -> Result<UserProgress, FishlogError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FishlogError::RequestFailed))
        }
    }

    /// Replies only when the test sends on the matching channel.
    struct GatedSource {
        gates: Mutex<VecDeque<oneshot::Receiver<UserProgress>>>,
    }

    impl ProgressSource for GatedSource {
        async fn fetch_progress(&self) -> Result<UserProgress, FishlogError> {
            let gate = self.gates.lock().unwrap().pop_front().unwrap();
            gate.await.map_err(|_| FishlogError::RequestFailed)
        }
    }

    fn level(level: u32) -> UserProgress {
        UserProgress {
            level,
            prestige: 0,
            posts_toward_next_level: 1,
            posts_required_for_next_level: 2,
        }
    }

    #[tokio::test]
    async fn first_load_is_not_a_level_up() {
        let store = ProgressStore::new(QueuedSource::with(vec![Ok(level(5))]));
        assert_eq!(store.progress(), UserProgress::default());

        store.refresh_progress().await;

        assert_eq!(store.progress(), level(5));
        assert!(!store.just_leveled_up());
        assert_eq!(store.last_transition(), None);
    }

    #[tokio::test]
    async fn detects_strict_increase_only() {
        let store = ProgressStore::new(QueuedSource::with(vec![
            Ok(level(3)),
            Ok(level(3)),
            Ok(level(2)),
            Ok(level(4)),
        ]));

        store.refresh_progress().await;
        store.refresh_progress().await;
        assert!(!store.just_leveled_up());

        store.refresh_progress().await;
        assert!(!store.just_leveled_up());
        assert_eq!(store.progress().level, 2);

        store.refresh_progress().await;
        assert!(store.just_leveled_up());
        assert_eq!(
            store.last_transition(),
            Some(LevelTransition { from: 2, to: 4 })
        );
    }

    #[tokio::test]
    async fn acknowledgement_clears_until_next_increase() {
        let store = ProgressStore::new(QueuedSource::with(vec![
            Ok(level(3)),
            Ok(level(4)),
            Ok(level(4)),
            Ok(level(5)),
        ]));

        store.refresh_progress().await;
        store.refresh_progress().await;
        assert!(store.just_leveled_up());

        store.set_just_leveled_up(false);
        store.refresh_progress().await;
        assert!(!store.just_leveled_up());

        store.refresh_progress().await;
        assert!(store.just_leveled_up());
    }

    #[tokio::test]
    async fn second_level_up_overwrites_unacknowledged_one() {
        let store = ProgressStore::new(QueuedSource::with(vec![
            Ok(level(1)),
            Ok(level(2)),
            Ok(level(3)),
        ]));

        store.refresh_progress().await;
        store.refresh_progress().await;
        store.refresh_progress().await;

        assert!(store.just_leveled_up());
        assert_eq!(
            store.last_transition(),
            Some(LevelTransition { from: 2, to: 3 })
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_snapshot_and_marks_stale() {
        let store = ProgressStore::new(QueuedSource::with(vec![
            Ok(level(3)),
            Err(FishlogError::ServerError(500)),
            Ok(level(3)),
        ]));

        store.refresh_progress().await;
        assert!(!store.is_stale());

        store.refresh_progress().await;
        assert_eq!(store.progress(), level(3));
        assert!(store.is_stale());

        store.refresh_progress().await;
        assert!(!store.is_stale());
    }

    #[tokio::test]
    async fn set_progress_participates_in_detection() {
        let store = ProgressStore::new(QueuedSource::default());

        store.set_progress(level(6));
        assert!(!store.just_leveled_up());

        store.set_progress(level(7));
        assert!(store.just_leveled_up());
        assert_eq!(store.progress_fraction(), 0.5);
    }

    #[tokio::test]
    async fn slower_older_refresh_does_not_overwrite_newer() {
        let (older_tx, older_rx) = oneshot::channel();
        let (newer_tx, newer_rx) = oneshot::channel();
        let store = ProgressStore::new(GatedSource {
            gates: Mutex::new(VecDeque::from(vec![older_rx, newer_rx])),
        });

        tokio::join!(store.refresh_progress(), store.refresh_progress(), async {
            newer_tx.send(level(8)).unwrap();
            tokio::task::yield_now().await;
            older_tx.send(level(9)).unwrap();
        });

        assert_eq!(store.progress(), level(8));
        assert!(!store.just_leveled_up());
    }
}
