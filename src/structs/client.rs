use std::env;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::FishlogError;
use crate::structs::{
    ChatBody, ChatReply, FollowBody, LikeBody, ProfileData, PublicCatch, UnreadCountData,
};

/// Base URL used when `FISHLOG_API_BASE` is not set.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";

/// Fishlog Client. Used to interact with the Fishlog API on behalf of one user.
#[derive(Debug, Clone)]
pub struct Client {
    /// Base URL of the Fishlog API, without a trailing slash.
    pub api_base: String,
    /// The user every request is made for.
    pub user_id: u64,
    http: reqwest::Client,
}

/// Fishlog Client options. Pass this into the `new()` function of the Fishlog Client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the Fishlog API. Must be an absolute http(s) URL.
    pub api_base: String,
    /// ID of the signed-in user. Must be greater than zero.
    pub user_id: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_id: 1,
        }
    }
}

impl ClientOptions {
    /// Reads `FISHLOG_API_BASE` and `FISHLOG_USER_ID`, loading a `.env` file first if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_base = env::var("FISHLOG_API_BASE")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_owned());

        let user_id = match env::var("FISHLOG_USER_ID") {
            Ok(raw) => raw.trim().parse::<u64>().unwrap_or_else(|err| {
                warn!(value = %raw, %err, "Invalid FISHLOG_USER_ID, using default");
                1
            }),
            Err(_) => 1,
        };

        Self { api_base, user_id }
    }
}

impl Client {
    /// Creates a new Fishlog client.
    pub fn new(options: ClientOptions) -> Result<Self, FishlogError> {
        // Verify that all options passed are in the right format
        let url = Url::parse(options.api_base.trim()).or(Err(FishlogError::InvalidApiBase))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(FishlogError::InvalidApiBase);
        }

        if options.user_id == 0 {
            return Err(FishlogError::InvalidUserId);
        }

        let http = reqwest::Client::builder()
            .build()
            .or(Err(FishlogError::RequestFailed))?;

        Ok(Self {
            api_base: options.api_base.trim().trim_end_matches('/').to_string(),
            user_id: options.user_id,
            http,
        })
    }

    /// Full URL for `path`, which may or may not start with a `/`.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_base, path)
        } else {
            format!("{}/{}", self.api_base, path)
        }
    }

    /// Fetches the leveling profile of `user_id`.
    pub async fn fetch_profile(&self, user_id: u64) -> Result<ProfileData, FishlogError> {
        self.get_json(&format!("/users/{}/profile", user_id), &[])
            .await
    }

    /// Fetches `user_id`'s profile as seen by the signed-in user, including `is_following`.
    pub async fn fetch_profile_as_viewer(&self, user_id: u64) -> Result<ProfileData, FishlogError> {
        let viewer = self.user_id.to_string();
        self.get_json(
            &format!("/users/{}/profile", user_id),
            &[("viewer_id", viewer.as_str())],
        )
        .await
    }

    pub async fn fetch_public_catches(&self) -> Result<Vec<PublicCatch>, FishlogError> {
        self.get_json("/public-catches", &[]).await
    }

    pub async fn like_catch(&self, catch_id: u64) -> Result<(), FishlogError> {
        let body = LikeBody {
            user_id: self.user_id,
        };
        self.send(Method::POST, &format!("/catches/{}/like", catch_id), &body)
            .await
    }

    pub async fn unlike_catch(&self, catch_id: u64) -> Result<(), FishlogError> {
        let body = LikeBody {
            user_id: self.user_id,
        };
        self.send(Method::DELETE, &format!("/catches/{}/unlike", catch_id), &body)
            .await
    }

    pub async fn follow_user(&self, user_id: u64) -> Result<(), FishlogError> {
        let body = FollowBody {
            follower_id: self.user_id,
            following_id: user_id,
        };
        self.send(Method::POST, "/follow", &body).await
    }

    pub async fn unfollow_user(&self, user_id: u64) -> Result<(), FishlogError> {
        let body = FollowBody {
            follower_id: self.user_id,
            following_id: user_id,
        };
        self.send(Method::POST, "/unfollow", &body).await
    }

    pub async fn unread_notification_count(&self) -> Result<u32, FishlogError> {
        let user = self.user_id.to_string();
        let data: UnreadCountData = self
            .get_json("/notifications/unread-count", &[("user_id", user.as_str())])
            .await?;
        Ok(data.count)
    }

    /// Asks the fishing assistant. Returns an empty string when the server sends no reply.
    pub async fn chat(&self, message: &str) -> Result<String, FishlogError> {
        let body = ChatBody {
            message: message.to_string(),
        };
        let data: ChatReply = self.post_json("/chat", &body).await?;
        Ok(data.reply.unwrap_or_default())
    }

    /// Query a JSON endpoint from the Fishlog API.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        // The request's query parameters
        params: &[(&str, &str)],
    ) -> Result<T, FishlogError> {
        let url = Url::parse_with_params(&self.endpoint(path), params)
            .or(Err(FishlogError::RequestFailed))?;

        debug!(%url, "GET");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .or(Err(FishlogError::RequestFailed))?;

        if !response.status().is_success() {
            return Err(FishlogError::from_status(response.status()));
        }

        response
            .json::<T>()
            .await
            .or(Err(FishlogError::FailedToDecode))
    }

    /// Send a JSON body to the Fishlog API. The response body is ignored.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), FishlogError> {
        let url = self.endpoint(path);

        debug!(%method, %url, "sending");

        let response = self
            .http
            .request(method, url)
            .json(body)
            .send()
            .await
            .or(Err(FishlogError::RequestFailed))?;

        if !response.status().is_success() {
            return Err(FishlogError::from_status(response.status()));
        }

        Ok(())
    }

    /// POST a JSON body to the Fishlog API and decode the JSON response.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, FishlogError> {
        let url = self.endpoint(path);

        debug!(%url, "POST");

        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .or(Err(FishlogError::RequestFailed))?;

        if !response.status().is_success() {
            return Err(FishlogError::from_status(response.status()));
        }

        response
            .json::<T>()
            .await
            .or(Err(FishlogError::FailedToDecode))
    }
}

#[cfg(test)]
mod tests {
    use super::{Client, ClientOptions};
    use crate::errors::FishlogError;

    fn options(api_base: &str, user_id: u64) -> ClientOptions {
        ClientOptions {
            api_base: api_base.to_string(),
            user_id,
        }
    }

    #[test]
    fn rejects_bad_options() {
        assert_eq!(
            Client::new(options("not a url", 1)).unwrap_err(),
            FishlogError::InvalidApiBase
        );
        assert_eq!(
            Client::new(options("ftp://example.com", 1)).unwrap_err(),
            FishlogError::InvalidApiBase
        );
        assert_eq!(
            Client::new(options("http://example.com", 0)).unwrap_err(),
            FishlogError::InvalidUserId
        );
    }

    #[test]
    fn builds_endpoints() {
        let client = Client::new(options("http://example.com:5000/", 7)).unwrap();
        assert_eq!(client.api_base, "http://example.com:5000");
        assert_eq!(
            client.endpoint("/users/7/profile"),
            "http://example.com:5000/users/7/profile"
        );
        assert_eq!(
            client.endpoint("public-catches"),
            "http://example.com:5000/public-catches"
        );
    }
}
