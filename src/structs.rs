pub mod chat;
pub mod client;
pub mod feed;
pub mod follow;
pub mod notifications;
pub mod progress;
pub mod typewriter;
pub mod user;

use serde::{Deserialize, Serialize};

/// Data returned by the server from `GET /users/{id}/profile`.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct ProfileData {
    pub id: u64,
    pub level: u32,
    pub prestige: u32,
    pub posts_toward_next_level: u32,
    pub posts_required_for_next_level: u32,
    /// Only present when the profile was requested with a `viewer_id`.
    #[serde(default)]
    pub is_following: Option<bool>,
}

/// A public catch as returned by `GET /public-catches`.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct PublicCatch {
    pub id: u64,
    pub species: String,
    pub image_url: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_avatar: Option<String>,
    #[serde(default)]
    pub like_count: Option<u32>,
    #[serde(default)]
    pub comment_count: Option<u32>,
    /// Whether the requesting user already liked this catch, when the server reports it.
    #[serde(default)]
    pub liked: Option<bool>,
}

/// Data returned by `GET /notifications/unread-count`.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountData {
    #[serde(default)]
    pub count: u32,
}

/// Body sent to the like and unlike endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeBody {
    pub user_id: u64,
}

/// Body sent to the follow and unfollow endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowBody {
    pub follower_id: u64,
    pub following_id: u64,
}

/// Body sent to `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBody {
    pub message: String,
}

/// Data returned by `POST /chat`.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: Option<String>,
}
