use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::client::Client;
use crate::errors::FishlogError;
use crate::structs::PublicCatch;

/// The social endpoints the optimistic mutations talk to.
pub trait SocialApi {
    fn fetch_public_catches(
        &self,
    ) -> impl Future<Output = Result<Vec<PublicCatch>, FishlogError>> + Send;
    fn like_catch(&self, catch_id: u64) -> impl Future<Output = Result<(), FishlogError>> + Send;
    fn unlike_catch(&self, catch_id: u64)
        -> impl Future<Output = Result<(), FishlogError>> + Send;
    fn fetch_is_following(
        &self,
        user_id: u64,
    ) -> impl Future<Output = Result<bool, FishlogError>> + Send;
    fn follow_user(&self, user_id: u64) -> impl Future<Output = Result<(), FishlogError>> + Send;
    fn unfollow_user(&self, user_id: u64)
        -> impl Future<Output = Result<(), FishlogError>> + Send;
}

impl SocialApi for Client {
    async fn fetch_public_catches(&self) -> Result<Vec<PublicCatch>, FishlogError> {
        Client::fetch_public_catches(self).await
    }

    async fn like_catch(&self, catch_id: u64) -> Result<(), FishlogError> {
        Client::like_catch(self, catch_id).await
    }

    async fn unlike_catch(&self, catch_id: u64) -> Result<(), FishlogError> {
        Client::unlike_catch(self, catch_id).await
    }

    async fn fetch_is_following(&self, user_id: u64) -> Result<bool, FishlogError> {
        let profile = self.fetch_profile_as_viewer(user_id).await?;
        Ok(profile.is_following.unwrap_or(false))
    }

    async fn follow_user(&self, user_id: u64) -> Result<(), FishlogError> {
        Client::follow_user(self, user_id).await
    }

    async fn unfollow_user(&self, user_id: u64) -> Result<(), FishlogError> {
        Client::unfollow_user(self, user_id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Unlike,
}

/// A like toggle that has been applied locally and not yet confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeCommand {
    pub catch_id: u64,
    pub action: LikeAction,
    /// Count displayed right after the toggle.
    pub like_count: u32,
    revision: u64,
}

impl LikeCommand {
    fn liked(&self) -> bool {
        self.action == LikeAction::Like
    }
}

/// A like toggle the server rejected. Once no other toggle of the same post is
/// in flight, the post shows the last state the server accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleFailure {
    pub catch_id: u64,
    pub action: LikeAction,
    pub error: FishlogError,
}

/// Server-side view of a post's like state, as far as the client knows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Confirmed {
    liked: bool,
    like_count: u32,
    /// Revision of the newest toggle the server accepted, or the load revision.
    revision: u64,
}

/// A catch in the feed with its locally tracked like state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPost {
    pub id: u64,
    pub species: String,
    pub image_url: String,
    pub user_name: Option<String>,
    pub location: Option<String>,
    pub user_avatar: Option<String>,
    pub comment_count: u32,
    pub like_count: u32,
    pub liked: bool,
    /// Toggles issued at or before this revision belong to an earlier load.
    loaded_at: u64,
    in_flight: u32,
    confirmed: Confirmed,
}

impl FeedPost {
    fn from_catch(catch: PublicCatch, loaded_at: u64) -> Self {
        let liked = catch.liked.unwrap_or(false);
        let like_count = catch.like_count.unwrap_or(0);
        Self {
            id: catch.id,
            species: catch.species,
            image_url: catch.image_url,
            user_name: catch.user_name,
            location: catch.location,
            user_avatar: catch.user_avatar,
            comment_count: catch.comment_count.unwrap_or(0),
            like_count,
            liked,
            loaded_at,
            in_flight: 0,
            confirmed: Confirmed {
                liked,
                like_count,
                revision: loaded_at,
            },
        }
    }

    /// True while a like or unlike for this post is awaiting the server.
    pub fn is_syncing(&self) -> bool {
        self.in_flight > 0
    }

    fn apply_toggle(&mut self, revision: u64) -> LikeCommand {
        let action = if self.liked {
            LikeAction::Unlike
        } else {
            LikeAction::Like
        };

        match action {
            LikeAction::Like => self.like_count = self.like_count.saturating_add(1),
            LikeAction::Unlike => self.like_count = self.like_count.saturating_sub(1),
        }
        self.liked = !self.liked;
        self.in_flight += 1;

        LikeCommand {
            catch_id: self.id,
            action,
            like_count: self.like_count,
            revision,
        }
    }

    /// Records the server's answer to `command`.
    ///
    /// Once nothing is in flight the post shows the newest accepted state, so a
    /// chain of failed toggles never leaves behind an effect the server did not see.
    /// Returns true if the displayed state changed.
    fn settle(&mut self, command: &LikeCommand, accepted: bool) -> bool {
        if command.revision <= self.loaded_at {
            return false;
        }

        if accepted && command.revision > self.confirmed.revision {
            self.confirmed = Confirmed {
                liked: command.liked(),
                like_count: command.like_count,
                revision: command.revision,
            };
        }

        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight > 0 {
            return false;
        }

        let changed =
            self.liked != self.confirmed.liked || self.like_count != self.confirmed.like_count;
        self.liked = self.confirmed.liked;
        self.like_count = self.confirmed.like_count;
        changed
    }
}

#[derive(Debug, Default)]
struct FeedState {
    posts: Vec<FeedPost>,
    revisions: u64,
    last_error: Option<ToggleFailure>,
}

/// The public catch feed with optimistic like toggling.
///
/// Must be used from within a Tokio runtime; toggles are sent on spawned tasks.
#[derive(Debug)]
pub struct Feed<A> {
    api: Arc<A>,
    state: Arc<Mutex<FeedState>>,
}

impl<A> Clone for Feed<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            state: Arc::clone(&self.state),
        }
    }
}

impl<A> Feed<A>
where
    A: SocialApi + Send + Sync + 'static,
{
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(FeedState::default())),
        }
    }

    /// Fetches the public catches and replaces the feed. On failure the current posts are kept.
    pub async fn load(&self) -> Result<(), FishlogError> {
        match self.api.fetch_public_catches().await {
            Ok(catches) => {
                debug!(count = catches.len(), "Loaded public catches");
                self.replace(catches);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "Failed to fetch public catches");
                Err(err)
            }
        }
    }

    /// Replaces every post. Like state comes from the server when it reports one.
    pub fn replace(&self, catches: Vec<PublicCatch>) {
        let mut state = self.state();
        let loaded_at = state.revisions;
        state.posts = catches
            .into_iter()
            .map(|catch| FeedPost::from_catch(catch, loaded_at))
            .collect();
    }

    pub fn posts(&self) -> Vec<FeedPost> {
        self.state().posts.clone()
    }

    pub fn post(&self, catch_id: u64) -> Option<FeedPost> {
        self.state()
            .posts
            .iter()
            .find(|post| post.id == catch_id)
            .cloned()
    }

    /// Takes the most recent failed toggle, if any.
    pub fn take_error(&self) -> Option<ToggleFailure> {
        self.state().last_error.take()
    }

    /// Flips the like state of `catch_id` right away and sends the matching request.
    ///
    /// The direction is decided from the post's state at call time. Returns `None`
    /// if the post is not in the feed, otherwise the handle of the background send.
    pub fn toggle_like(&self, catch_id: u64) -> Option<JoinHandle<()>> {
        let command = {
            let mut state = self.state();
            state.revisions += 1;
            let revision = state.revisions;
            let post = state.posts.iter_mut().find(|post| post.id == catch_id)?;
            post.apply_toggle(revision)
        };

        debug!(catch_id, action = ?command.action, "Applied like toggle locally");

        let feed = self.clone();
        Some(tokio::spawn(async move { feed.dispatch(command).await }))
    }

    async fn dispatch(&self, command: LikeCommand) {
        let result = match command.action {
            LikeAction::Like => self.api.like_catch(command.catch_id).await,
            LikeAction::Unlike => self.api.unlike_catch(command.catch_id).await,
        };

        let mut state = self.state();
        let reverted = state
            .posts
            .iter_mut()
            .find(|post| post.id == command.catch_id)
            .map(|post| post.settle(&command, result.is_ok()))
            .unwrap_or(false);

        if let Err(error) = result {
            warn!(
                catch_id = command.catch_id,
                action = ?command.action,
                %error,
                reverted,
                "Like toggle failed"
            );

            state.last_error = Some(ToggleFailure {
                catch_id: command.catch_id,
                action: command.action,
                error,
            });
        }
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
