//! HTTP implementation of the gateway against the Tastepedia REST API.
//!
//! Session auth rides on a cookie, so the client is built with a cookie
//! store. 401/403 map to [`GatewayError::AuthRequired`]; every other
//! non-success status is a rejection carrying the server's message.

use serde_json::Value;

use crate::gateway::{Gateway, GatewayError, GatewayFuture, LikeAck, PollTally};
use crate::models::{NewPost, PollState, PostRecord, RecipeSummary, SearchQuery};

pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch the community feed; used to seed observed like/poll state
    /// before the first interaction.
    pub async fn fetch_posts(&self) -> Result<Vec<PostRecord>, GatewayError> {
        let response = self
            .client
            .get(self.url("/api/community/posts"))
            .send()
            .await
            .map_err(transport)?;
        parse_json(check_status(response).await?).await
    }

    /// Ask the server whether `recipe_id` is currently favorited.
    pub async fn check_favorite(&self, recipe_id: &str) -> Result<bool, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/api/favorites/check/{recipe_id}")))
            .send()
            .await
            .map_err(transport)?;
        parse_json(check_status(response).await?).await
    }
}

impl Gateway for HttpGateway {
    fn set_favorite(&self, recipe_id: &str, desired: bool) -> GatewayFuture<'_, ()> {
        let url = self.url(&format!("/api/favorites/{recipe_id}"));
        Box::pin(async move {
            // Favoriting is add/remove on the server, not a toggle.
            let request = if desired {
                self.client.post(&url)
            } else {
                self.client.delete(&url)
            };
            let response = request.send().await.map_err(transport)?;
            check_status(response).await?;
            Ok(())
        })
    }

    fn toggle_like(&self, post_id: &str, actor_id: &str) -> GatewayFuture<'_, LikeAck> {
        let url = self.url(&format!("/api/community/{post_id}/like"));
        let actor_id = actor_id.to_string();
        Box::pin(async move {
            let response = self.client.put(&url).send().await.map_err(transport)?;
            let post: PostRecord = parse_json(check_status(response).await?).await?;
            let state = post.like_state(&actor_id);
            Ok(LikeAck {
                liked: state.liked,
                likes: state.likes,
            })
        })
    }

    fn vote_poll(
        &self,
        post_id: &str,
        actor_id: &str,
        option_id: u32,
    ) -> GatewayFuture<'_, PollTally> {
        let url = self.url(&format!("/api/community/{post_id}/vote"));
        let actor_id = actor_id.to_string();
        Box::pin(async move {
            let response = self
                .client
                .post(&url)
                .query(&[("optionId", option_id)])
                .send()
                .await
                .map_err(transport)?;
            let post: PostRecord = parse_json(check_status(response).await?).await?;
            let state: PollState = post
                .poll_state(&actor_id)
                .ok_or_else(|| GatewayError::Rejected("post carries no poll".to_string()))?;
            Ok(PollTally { state })
        })
    }

    fn submit_search(&self, query: SearchQuery) -> GatewayFuture<'_, Vec<RecipeSummary>> {
        let url = self.url("/api/recipes/search");
        Box::pin(async move {
            let response = self
                .client
                .get(&url)
                .query(&query.to_query_params())
                .send()
                .await
                .map_err(transport)?;
            parse_json(check_status(response).await?).await
        })
    }

    fn create_post(&self, post: NewPost) -> GatewayFuture<'_, PostRecord> {
        let url = self.url("/api/community/create");
        Box::pin(async move {
            let response = self
                .client
                .post(&url)
                .json(&post)
                .send()
                .await
                .map_err(transport)?;
            parse_json(check_status(response).await?).await
        })
    }
}

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

/// Map the status line into the error taxonomy, passing successes through.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(GatewayError::AuthRequired);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Rejected(format!("{status}: {body}")))
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let body: Value = response
        .json()
        .await
        .map_err(|e| GatewayError::Rejected(format!("undecodable response: {e}")))?;
    serde_json::from_value(body)
        .map_err(|e| GatewayError::Rejected(format!("unexpected response shape: {e}")))
}
