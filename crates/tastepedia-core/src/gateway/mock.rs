//! In-process gateway double with scripted latency and outcomes.
//!
//! Each operation pops the next [`PlannedCall`] from its queue, sleeps for
//! the scripted delay (virtual time under a paused tokio clock), then
//! returns the scripted outcome. Unplanned calls fail loudly so a test
//! never silently exercises a path it did not script.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::gateway::{Gateway, GatewayError, GatewayFuture, LikeAck, PollTally};
use crate::models::{NewPost, PostRecord, RecipeSummary, SearchQuery};

pub struct PlannedCall<T> {
    pub delay: Duration,
    pub outcome: Result<T, GatewayError>,
}

impl<T> PlannedCall<T> {
    pub fn new(delay_ms: u64, outcome: Result<T, GatewayError>) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            outcome,
        }
    }
}

#[derive(Default)]
pub struct MockGateway {
    favorite_plan: Mutex<VecDeque<PlannedCall<()>>>,
    like_plan: Mutex<VecDeque<PlannedCall<LikeAck>>>,
    vote_plan: Mutex<VecDeque<PlannedCall<PollTally>>>,
    search_plan: Mutex<VecDeque<PlannedCall<Vec<RecipeSummary>>>>,
    post_plan: Mutex<VecDeque<PlannedCall<PostRecord>>>,

    favorite_calls: Mutex<Vec<(String, bool)>>,
    like_calls: Mutex<Vec<String>>,
    vote_calls: Mutex<Vec<(String, u32)>>,
    search_calls: Mutex<Vec<SearchQuery>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan_favorite(&self, delay_ms: u64, outcome: Result<(), GatewayError>) {
        self.favorite_plan
            .lock()
            .push_back(PlannedCall::new(delay_ms, outcome));
    }

    pub fn plan_like(&self, delay_ms: u64, outcome: Result<LikeAck, GatewayError>) {
        self.like_plan
            .lock()
            .push_back(PlannedCall::new(delay_ms, outcome));
    }

    pub fn plan_vote(&self, delay_ms: u64, outcome: Result<PollTally, GatewayError>) {
        self.vote_plan
            .lock()
            .push_back(PlannedCall::new(delay_ms, outcome));
    }

    pub fn plan_search(&self, delay_ms: u64, outcome: Result<Vec<RecipeSummary>, GatewayError>) {
        self.search_plan
            .lock()
            .push_back(PlannedCall::new(delay_ms, outcome));
    }

    pub fn plan_create_post(&self, delay_ms: u64, outcome: Result<PostRecord, GatewayError>) {
        self.post_plan
            .lock()
            .push_back(PlannedCall::new(delay_ms, outcome));
    }

    pub fn favorite_calls(&self) -> Vec<(String, bool)> {
        self.favorite_calls.lock().clone()
    }

    pub fn like_call_count(&self) -> usize {
        self.like_calls.lock().len()
    }

    pub fn vote_calls(&self) -> Vec<(String, u32)> {
        self.vote_calls.lock().clone()
    }

    pub fn search_calls(&self) -> Vec<SearchQuery> {
        self.search_calls.lock().clone()
    }
}

fn unplanned<T>(op: &str) -> Result<T, GatewayError> {
    Err(GatewayError::Transport(format!(
        "mock gateway: no scripted response for {op}"
    )))
}

async fn run<T>(planned: Option<PlannedCall<T>>, op: &str) -> Result<T, GatewayError> {
    match planned {
        Some(call) => {
            tokio::time::sleep(call.delay).await;
            call.outcome
        }
        None => unplanned(op),
    }
}

impl Gateway for MockGateway {
    fn set_favorite(&self, recipe_id: &str, desired: bool) -> GatewayFuture<'_, ()> {
        self.favorite_calls
            .lock()
            .push((recipe_id.to_string(), desired));
        let planned = self.favorite_plan.lock().pop_front();
        Box::pin(run(planned, "set_favorite"))
    }

    fn toggle_like(&self, post_id: &str, _actor_id: &str) -> GatewayFuture<'_, LikeAck> {
        self.like_calls.lock().push(post_id.to_string());
        let planned = self.like_plan.lock().pop_front();
        Box::pin(run(planned, "toggle_like"))
    }

    fn vote_poll(
        &self,
        post_id: &str,
        _actor_id: &str,
        option_id: u32,
    ) -> GatewayFuture<'_, PollTally> {
        self.vote_calls.lock().push((post_id.to_string(), option_id));
        let planned = self.vote_plan.lock().pop_front();
        Box::pin(run(planned, "vote_poll"))
    }

    fn submit_search(&self, query: SearchQuery) -> GatewayFuture<'_, Vec<RecipeSummary>> {
        self.search_calls.lock().push(query);
        let planned = self.search_plan.lock().pop_front();
        Box::pin(run(planned, "submit_search"))
    }

    fn create_post(&self, _post: NewPost) -> GatewayFuture<'_, PostRecord> {
        let planned = self.post_plan.lock().pop_front();
        Box::pin(run(planned, "create_post"))
    }
}
