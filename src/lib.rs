//! Rust SDK for the Fishlog social fishing-log API.
//!
//! Wraps the endpoints a client needs around the user's leveling progress,
//! the public catch feed and the social graph, and keeps the local state
//! the UI renders: the [`ProgressStore`], the optimistic [`Feed`] and
//! [`FollowState`], the [`UnreadNotifications`] badge and the [`Typewriter`]
//! used to reveal replies in the AI [`ChatSession`].

mod errors;
mod structs;

pub use errors::FishlogError;
pub use structs::chat::{
    reply_or_fallback, ChatMessage, ChatSender, ChatSession, ChatSource, ERROR_REPLY,
    NO_RESPONSE_REPLY,
};
pub use structs::client::{Client, ClientOptions, DEFAULT_API_BASE};
pub use structs::feed::{Feed, FeedPost, LikeAction, LikeCommand, SocialApi, ToggleFailure};
pub use structs::follow::FollowState;
pub use structs::notifications::{NotificationSource, UnreadNotifications};
pub use structs::progress::{LevelTransition, ProgressSource, ProgressStore};
pub use structs::typewriter::Typewriter;
pub use structs::user::{posts_required_for_level, UserProgress, MAX_LEVEL};
pub use structs::{
    ChatBody, ChatReply, FollowBody, LikeBody, ProfileData, PublicCatch, UnreadCountData,
};
