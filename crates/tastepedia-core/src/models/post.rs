//! Community post submission payloads and records.
//!
//! The create endpoint accepts one structured shape for all post kinds; a
//! poll is a general post with the `poll` block attached.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::entity::{PollOption, PollState};

/// Structured payload for creating a post, question, tip, or poll.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    /// "post", "question", "tip", or "poll".
    #[serde(rename = "type")]
    pub post_type: String,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<NewPoll>,
    /// Client-generated reference so a retried submission can be matched to
    /// the attempt that produced it.
    pub client_ref: Uuid,
}

impl NewPost {
    pub fn text(post_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            post_type: post_type.into(),
            content: content.into(),
            tags: Vec::new(),
            image_url: None,
            poll: None,
            client_ref: Uuid::new_v4(),
        }
    }

    pub fn poll(question: impl Into<String>, options: Vec<String>) -> Self {
        let question = question.into();
        let mut post = Self::text("poll", question.clone());
        post.poll = Some(NewPoll { question, options });
        post
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
}

/// A community post as returned by the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub post_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub liked_user_ids: Vec<String>,
    #[serde(default)]
    // Serialized without an offset, so a naive timestamp.
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub poll: Option<PollRecord>,
}

impl PostRecord {
    /// Current like state as seen by `actor_id`.
    pub fn like_state(&self, actor_id: &str) -> crate::models::LikeState {
        crate::models::LikeState {
            liked: self.liked_user_ids.iter().any(|id| id == actor_id),
            likes: self.likes,
        }
    }

    /// Poll tally as a displayable state, if this post carries a poll.
    pub fn poll_state(&self, actor_id: &str) -> Option<PollState> {
        let poll = self.poll.as_ref()?;
        let voted = poll.user_votes.get(actor_id).copied();
        Some(PollState::new(
            poll.options.clone(),
            poll.total_votes,
            voted,
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRecord {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default)]
    pub user_votes: std::collections::HashMap<String, u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_record_parses_server_json() {
        let json = serde_json::json!({
            "id": "p1",
            "type": "poll",
            "content": "Best noodle?",
            "authorName": "Chef Minh",
            "likes": 3,
            "likedUserIds": ["u1", "u2", "u3"],
            "poll": {
                "question": "Best noodle?",
                "options": [
                    {"id": 1, "text": "Pho", "votes": 5},
                    {"id": 2, "text": "Bun cha", "votes": 2}
                ],
                "totalVotes": 7,
                "userVotes": {"u2": 1}
            }
        });
        let post: PostRecord = serde_json::from_value(json).unwrap();

        let like = post.like_state("u2");
        assert!(like.liked);
        assert_eq!(like.likes, 3);
        assert!(!post.like_state("stranger").liked);

        let poll = post.poll_state("u2").unwrap();
        assert_eq!(poll.voted_option, Some(1));
        assert_eq!(poll.total_votes, 7);
        assert!(!poll.provisional);
        assert_eq!(post.poll_state("stranger").unwrap().voted_option, None);
    }
}
