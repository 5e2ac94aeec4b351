use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a remote-backed mutable object (recipe, post, poll).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Whether a recipe is in the user's favorites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteState {
    pub favorited: bool,
}

/// Like flag and count for a community post, as currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes: i64,
}

impl LikeState {
    /// Flip the liked flag and move the count by exactly one.
    pub fn toggled(self) -> Self {
        let liked = !self.liked;
        Self {
            liked,
            likes: if liked { self.likes + 1 } else { self.likes - 1 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: u32,
    pub text: String,
    pub votes: u64,
}

/// Poll tally as displayed. Percentages are derived, never stored.
///
/// `provisional` is true while the tally includes a local increment the
/// server has not yet confirmed; the controller replaces the whole state
/// with the server's version on confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollState {
    pub voted_option: Option<u32>,
    pub options: Vec<PollOption>,
    pub total_votes: u64,
    pub provisional: bool,
}

impl PollState {
    pub fn new(options: Vec<PollOption>, total_votes: u64, voted_option: Option<u32>) -> Self {
        Self {
            voted_option,
            options,
            total_votes,
            provisional: false,
        }
    }

    /// Locally cast a vote for `option_id`.
    ///
    /// A first vote increments the total; a changed vote moves one count from
    /// the old option to the new one (the server switches votes rather than
    /// stacking them). Voting for the already-chosen option is a no-op.
    /// The result is provisional until the server tally arrives.
    pub fn cast_vote(&self, option_id: u32) -> Self {
        let mut next = self.clone();
        match self.voted_option {
            Some(prev) if prev == option_id => return next,
            Some(prev) => {
                if let Some(opt) = next.options.iter_mut().find(|o| o.id == prev) {
                    opt.votes = opt.votes.saturating_sub(1);
                }
            }
            None => next.total_votes += 1,
        }
        if let Some(opt) = next.options.iter_mut().find(|o| o.id == option_id) {
            opt.votes += 1;
        }
        next.voted_option = Some(option_id);
        next.provisional = true;
        next
    }

    /// Percentage of total votes held by `option_id`, rounded to the nearest
    /// whole percent. Zero when the poll has no votes.
    pub fn percentage(&self, option_id: u32) -> u32 {
        if self.total_votes == 0 {
            return 0;
        }
        let votes = self
            .options
            .iter()
            .find(|o| o.id == option_id)
            .map(|o| o.votes)
            .unwrap_or(0);
        ((votes * 100 + self.total_votes / 2) / self.total_votes) as u32
    }
}

/// One tagged value per entity kind, validated once at the gateway boundary
/// so the controllers never branch on loosely-typed payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityValue {
    Favorite(FavoriteState),
    Like(LikeState),
    Poll(PollState),
}

impl EntityValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Favorite(_) => "favorite",
            Self::Like(_) => "like",
            Self::Poll(_) => "poll",
        }
    }

    pub fn as_favorite(&self) -> Option<FavoriteState> {
        match self {
            Self::Favorite(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_like(&self) -> Option<LikeState> {
        match self {
            Self::Like(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_poll(&self) -> Option<&PollState> {
        match self {
            Self::Poll(s) => Some(s),
            _ => None,
        }
    }
}
