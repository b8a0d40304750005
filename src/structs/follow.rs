use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::feed::SocialApi;
use crate::errors::FishlogError;

#[derive(Debug, Default)]
struct FollowInner {
    following: bool,
    revision: u64,
    in_flight: u32,
    /// Last state the server accepted, and the toggle revision that set it.
    confirmed: bool,
    confirmed_revision: u64,
    last_error: Option<FishlogError>,
}

/// Whether the signed-in user follows one other user, toggled optimistically.
#[derive(Debug)]
pub struct FollowState<A> {
    api: Arc<A>,
    user_id: u64,
    inner: Arc<Mutex<FollowInner>>,
}

impl<A> Clone for FollowState<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            user_id: self.user_id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> FollowState<A>
where
    A: SocialApi + Send + Sync + 'static,
{
    pub fn new(api: Arc<A>, user_id: u64, following: bool) -> Self {
        Self {
            api,
            user_id,
            inner: Arc::new(Mutex::new(FollowInner {
                following,
                confirmed: following,
                ..Default::default()
            })),
        }
    }

    /// Builds the state from the user's profile as seen by the signed-in user.
    pub async fn load(api: Arc<A>, user_id: u64) -> Result<Self, FishlogError> {
        let following = api.fetch_is_following(user_id).await?;
        Ok(Self::new(api, user_id, following))
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn is_following(&self) -> bool {
        self.inner().following
    }

    pub fn take_error(&self) -> Option<FishlogError> {
        self.inner().last_error.take()
    }

    /// True while a follow or unfollow is awaiting the server.
    pub fn is_syncing(&self) -> bool {
        self.inner().in_flight > 0
    }

    /// Flips the follow state right away and sends `/follow` or `/unfollow`.
    /// Once no toggle is in flight, the state shows the last one the server accepted.
    pub fn toggle(&self) -> JoinHandle<()> {
        let (follow, revision) = {
            let mut inner = self.inner();
            inner.following = !inner.following;
            inner.revision += 1;
            inner.in_flight += 1;
            (inner.following, inner.revision)
        };

        debug!(user_id = self.user_id, follow, "Applied follow toggle locally");

        let state = self.clone();
        tokio::spawn(async move {
            let result = if follow {
                state.api.follow_user(state.user_id).await
            } else {
                state.api.unfollow_user(state.user_id).await
            };

            let mut inner = state.inner();
            if result.is_ok() && revision > inner.confirmed_revision {
                inner.confirmed = follow;
                inner.confirmed_revision = revision;
            }

            inner.in_flight = inner.in_flight.saturating_sub(1);
            let reverted = inner.in_flight == 0 && inner.following != inner.confirmed;
            if inner.in_flight == 0 {
                inner.following = inner.confirmed;
            }

            if let Err(err) = result {
                warn!(user_id = state.user_id, follow, %err, reverted, "Follow toggle failed");
                inner.last_error = Some(err);
            }
        })
    }

    fn inner(&self) -> MutexGuard<'_, FollowInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::FollowState;
    use crate::errors::FishlogError;
    use crate::structs::feed::tests::{Call, RecordingApi};

    #[tokio::test]
    async fn loads_initial_state_from_profile() {
        let api = Arc::new(RecordingApi {
            following: true,
            ..Default::default()
        });

        let state = FollowState::load(api, 9).await.unwrap();
        assert!(state.is_following());
        assert_eq!(state.user_id(), 9);
    }

    #[tokio::test]
    async fn toggles_follow_then_unfollow() {
        let api = Arc::new(RecordingApi::default());
        let state = FollowState::new(Arc::clone(&api), 9, false);

        let first = state.toggle();
        assert!(state.is_following());
        let second = state.toggle();
        assert!(!state.is_following());
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(api.calls(), vec![Call::Follow(9), Call::Unfollow(9)]);
        assert!(state.take_error().is_none());
    }

    #[tokio::test]
    async fn failed_follow_is_reverted() {
        let api = Arc::new(RecordingApi::default());
        api.fail(Call::Follow(9));
        let state = FollowState::new(Arc::clone(&api), 9, false);

        state.toggle().await.unwrap();

        assert!(!state.is_following());
        assert!(!state.is_syncing());
        assert_eq!(state.take_error(), Some(FishlogError::ServerError(500)));
    }

    #[tokio::test]
    async fn later_accepted_toggle_wins_over_earlier_failures() {
        let api = Arc::new(RecordingApi::default());
        api.fail(Call::Follow(9));
        api.fail(Call::Unfollow(9));
        let state = FollowState::new(Arc::clone(&api), 9, true);

        let first = state.toggle();
        let second = state.toggle();
        let third = state.toggle();
        assert!(!state.is_following());
        first.await.unwrap();
        second.await.unwrap();
        third.await.unwrap();

        assert_eq!(
            api.calls(),
            vec![Call::Unfollow(9), Call::Follow(9), Call::Unfollow(9)]
        );
        assert!(!state.is_following());
    }

    #[tokio::test]
    async fn superseded_failure_does_not_undo_newer_toggle() {
        let api = Arc::new(RecordingApi::default());
        api.fail(Call::Follow(9));
        let state = FollowState::new(Arc::clone(&api), 9, false);

        let first = state.toggle();
        let second = state.toggle();
        let third = state.toggle();
        first.await.unwrap();
        second.await.unwrap();
        third.await.unwrap();

        assert_eq!(
            api.calls(),
            vec![Call::Follow(9), Call::Unfollow(9), Call::Follow(9)]
        );
        assert!(state.is_following());
        assert!(state.take_error().is_some());
    }

    #[tokio::test]
    async fn two_failed_toggles_keep_server_state() {
        let api = Arc::new(RecordingApi::default());
        api.fail(Call::Follow(9));
        api.fail(Call::Unfollow(9));
        let state = FollowState::new(Arc::clone(&api), 9, false);

        let first = state.toggle();
        let second = state.toggle();
        first.await.unwrap();
        second.await.unwrap();

        assert!(!state.is_following());
    }
}
