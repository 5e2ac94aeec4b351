//! Optimistic Mutation Controller.
//!
//! Every toggle/vote-style interaction goes through the same discipline:
//! apply the new value to the entry's pending state and publish it to the
//! UI synchronously, then reconcile with the server from a spawned task.
//! The generation captured at initiation decides whether a completion may
//! act: a newer mutation on the same key always invalidates an older one,
//! so the displayed state converges to the last user intent regardless of
//! network response order.
//!
//! In-flight requests are never cancelled at the transport level; ignoring
//! a stale completion under the store lock is equivalent and simpler.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::error::CoreError;
use crate::events::CoreEvent;
use crate::gateway::{Gateway, GatewayError};
use crate::models::{EntityKey, EntityValue, FavoriteState};
use crate::store::EntityStateStore;

/// What a completed mutation attempt amounted to. Callers never see raw
/// transport errors, only this classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server confirmed; the optimistic value (or the server's
    /// correction of it) is now committed.
    Applied,
    /// The remote call failed and the entry snapped back.
    RolledBack(RollbackReason),
    /// A newer mutation superseded this one; its result was discarded
    /// without touching anything.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackReason {
    /// Rejected or unreachable; the entity stays interactive for a retry.
    Transient(String),
    /// The session is missing or expired.
    AuthRequired,
    /// The call outlived the configured mutation timeout.
    Timeout,
}

pub struct MutationController {
    store: Arc<Mutex<EntityStateStore>>,
    gateway: Arc<dyn Gateway>,
    events: UnboundedSender<CoreEvent>,
    /// Identity the server attributes likes/votes to.
    actor_id: String,
    timeout: Duration,
}

impl MutationController {
    pub fn new(
        store: Arc<Mutex<EntityStateStore>>,
        gateway: Arc<dyn Gateway>,
        events: UnboundedSender<CoreEvent>,
        actor_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            events,
            actor_id: actor_id.into(),
            timeout,
        }
    }

    /// Seed an entry with server-observed state (page load, refetch).
    pub fn observe(&self, key: EntityKey, value: EntityValue) {
        self.store.lock().observe(key, value);
    }

    /// The single value currently visible for `key`.
    pub fn visible(&self, key: &EntityKey) -> Option<EntityValue> {
        self.store.lock().visible(key)
    }

    /// Favorite or unfavorite a recipe.
    ///
    /// The only operation allowed on a never-observed key: a recipe the
    /// favorites check has not answered for yet is assumed unfavorited,
    /// as the detail page does.
    pub fn set_favorite(
        &self,
        recipe_id: &str,
        desired: bool,
    ) -> Result<JoinHandle<MutationOutcome>, CoreError> {
        self.start_favorite(recipe_id, Some(desired))
    }

    /// Flip the favorite flag relative to the currently visible value.
    pub fn toggle_favorite(&self, recipe_id: &str) -> Result<JoinHandle<MutationOutcome>, CoreError> {
        self.start_favorite(recipe_id, None)
    }

    // `desired: None` means flip whatever is pending. The read and the
    // begin happen under the same lock so a concurrent toggle cannot
    // interleave between them.
    fn start_favorite(
        &self,
        recipe_id: &str,
        desired: Option<bool>,
    ) -> Result<JoinHandle<MutationOutcome>, CoreError> {
        let key = EntityKey::new(recipe_id);
        let seed = EntityValue::Favorite(FavoriteState { favorited: false });
        let (generation, new_value, target) = {
            let mut store = self.store.lock();
            let pending = store.pending_or_seed(&key, seed);
            let current = pending
                .as_favorite()
                .ok_or_else(|| CoreError::WrongValueKind {
                    key: key.clone(),
                    expected: "favorite",
                    actual: pending.kind(),
                })?
                .favorited;
            let target = desired.unwrap_or(!current);
            let new_value = EntityValue::Favorite(FavoriteState { favorited: target });
            let generation = store.begin(&key, new_value.clone());
            (generation, new_value, target)
        };
        self.publish_changed(&key, &new_value);

        let recipe_id = recipe_id.to_string();
        Ok(self.reconcile(key, generation, new_value, move |gateway, _value| async move {
            gateway.set_favorite(&recipe_id, target).await?;
            Ok(None)
        }))
    }

    /// Toggle the actor's like on a post. The entry must have been observed.
    pub fn toggle_like(&self, post_id: &str) -> Result<JoinHandle<MutationOutcome>, CoreError> {
        let key = EntityKey::new(post_id);
        let (generation, new_value) = {
            let mut store = self.store.lock();
            let pending = store
                .visible(&key)
                .ok_or_else(|| CoreError::UnknownEntity(key.clone()))?;
            let like = pending.as_like().ok_or_else(|| CoreError::WrongValueKind {
                key: key.clone(),
                expected: "like",
                actual: pending.kind(),
            })?;
            let new_value = EntityValue::Like(like.toggled());
            let generation = store.begin(&key, new_value.clone());
            (generation, new_value)
        };
        self.publish_changed(&key, &new_value);

        let post_id = post_id.to_string();
        let actor_id = self.actor_id.clone();
        Ok(self.reconcile(key, generation, new_value, move |gateway, _value| async move {
            let ack = gateway.toggle_like(&post_id, &actor_id).await?;
            // The server's count is authoritative; someone else may have
            // liked meanwhile.
            Ok(Some(EntityValue::Like(crate::models::LikeState {
                liked: ack.liked,
                likes: ack.likes,
            })))
        }))
    }

    /// Cast (or switch) the actor's vote on a poll post.
    ///
    /// The locally recomputed tally is provisional; on confirmation the
    /// entry is replaced wholesale with the server's tally.
    pub fn vote_poll(
        &self,
        post_id: &str,
        option_id: u32,
    ) -> Result<JoinHandle<MutationOutcome>, CoreError> {
        let key = EntityKey::new(post_id);
        let (generation, new_value) = {
            let mut store = self.store.lock();
            let pending = store
                .visible(&key)
                .ok_or_else(|| CoreError::UnknownEntity(key.clone()))?;
            let poll = pending.as_poll().ok_or_else(|| CoreError::WrongValueKind {
                key: key.clone(),
                expected: "poll",
                actual: pending.kind(),
            })?;
            let new_value = EntityValue::Poll(poll.cast_vote(option_id));
            let generation = store.begin(&key, new_value.clone());
            (generation, new_value)
        };
        self.publish_changed(&key, &new_value);

        let post_id = post_id.to_string();
        let actor_id = self.actor_id.clone();
        Ok(self.reconcile(key, generation, new_value, move |gateway, _value| async move {
            let tally = gateway.vote_poll(&post_id, &actor_id, option_id).await?;
            Ok(Some(EntityValue::Poll(tally.state)))
        }))
    }

    fn publish_changed(&self, key: &EntityKey, value: &EntityValue) {
        let _ = self.events.send(CoreEvent::EntityChanged {
            key: key.clone(),
            value: value.clone(),
        });
    }

    /// Spawn the remote call and apply its result under the generation
    /// guard. `call` receives the gateway and the optimistic value and may
    /// return a server-authoritative replacement for it.
    fn reconcile<F, Fut>(
        &self,
        key: EntityKey,
        generation: u64,
        new_value: EntityValue,
        call: F,
    ) -> JoinHandle<MutationOutcome>
    where
        F: FnOnce(Arc<dyn Gateway>, EntityValue) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Option<EntityValue>, GatewayError>>
            + Send
            + 'static,
    {
        let store = Arc::clone(&self.store);
        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, call(gateway, new_value.clone())).await
            {
                Ok(Ok(server_value)) => Ok(server_value),
                Ok(Err(GatewayError::AuthRequired)) => Err(RollbackReason::AuthRequired),
                Ok(Err(err)) => Err(RollbackReason::Transient(err.to_string())),
                Err(_) => Err(RollbackReason::Timeout),
            };

            // Check-then-apply happens inside one lock acquisition; nothing
            // can slip between the generation test and the write.
            match result {
                Ok(server_value) => {
                    let committed = server_value.unwrap_or_else(|| new_value.clone());
                    let applied = store
                        .lock()
                        .commit_if_current(&key, generation, committed.clone());
                    if !applied {
                        tracing::debug!(key = %key, generation, "stale success discarded");
                        return MutationOutcome::Stale;
                    }
                    if committed != new_value {
                        // Server corrected the optimistic value (e.g. a poll
                        // tally that moved underneath us).
                        let _ = events.send(CoreEvent::EntityChanged {
                            key: key.clone(),
                            value: committed,
                        });
                    }
                    MutationOutcome::Applied
                }
                Err(reason) => {
                    let reverted = store.lock().rollback_if_current(&key, generation);
                    match reverted {
                        Some(value) => {
                            tracing::info!(key = %key, ?reason, "mutation rolled back");
                            if reason == RollbackReason::AuthRequired {
                                let _ = events.send(CoreEvent::AuthRequired);
                            }
                            let _ = events.send(CoreEvent::MutationRolledBack {
                                key,
                                value,
                                reason: reason.clone(),
                            });
                            MutationOutcome::RolledBack(reason)
                        }
                        None => {
                            tracing::debug!(key = %key, generation, "stale failure discarded");
                            MutationOutcome::Stale
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{LikeAck, MockGateway, PollTally};
    use crate::models::{LikeState, PollOption, PollState};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Harness {
        controller: MutationController,
        gateway: Arc<MockGateway>,
        rx: UnboundedReceiver<CoreEvent>,
    }

    fn harness() -> Harness {
        let store = Arc::new(Mutex::new(EntityStateStore::new()));
        let gateway = Arc::new(MockGateway::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = MutationController::new(
            store,
            gateway.clone() as Arc<dyn Gateway>,
            tx,
            "u1",
            Duration::from_secs(10),
        );
        Harness {
            controller,
            gateway,
            rx,
        }
    }

    fn like(liked: bool, likes: i64) -> EntityValue {
        EntityValue::Like(LikeState { liked, likes })
    }

    fn drain(rx: &mut UnboundedReceiver<CoreEvent>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_idempotent_favorite_round_trip() {
        let h = harness();
        h.gateway.plan_favorite(5, Ok(()));
        h.gateway.plan_favorite(5, Ok(()));

        let first = h.controller.toggle_favorite("r1").unwrap();
        assert_eq!(first.await.unwrap(), MutationOutcome::Applied);
        let second = h.controller.toggle_favorite("r1").unwrap();
        assert_eq!(second.await.unwrap(), MutationOutcome::Applied);

        let visible = h.controller.visible(&EntityKey::new("r1")).unwrap();
        assert!(!visible.as_favorite().unwrap().favorited);
        assert_eq!(
            h.gateway.favorite_calls(),
            vec![("r1".to_string(), true), ("r1".to_string(), false)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_toggle_converges_when_late_response_lags() {
        let h = harness();
        let key = EntityKey::new("p1");
        h.controller.observe(key.clone(), like(false, 10));
        // First request is slow, second fast: the unlike's response lands
        // first, the like's response must then be discarded as stale.
        h.gateway.plan_like(50, Ok(LikeAck { liked: true, likes: 11 }));
        h.gateway.plan_like(5, Ok(LikeAck { liked: false, likes: 10 }));

        let first = h.controller.toggle_like("p1").unwrap();
        let second = h.controller.toggle_like("p1").unwrap();

        assert_eq!(first.await.unwrap(), MutationOutcome::Stale);
        assert_eq!(second.await.unwrap(), MutationOutcome::Applied);
        assert_eq!(h.controller.visible(&key), Some(like(false, 10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_toggle_converges_when_early_response_leads() {
        let h = harness();
        let key = EntityKey::new("p1");
        h.controller.observe(key.clone(), like(false, 10));
        // First request completes first, but was superseded at initiation
        // time already.
        h.gateway.plan_like(5, Ok(LikeAck { liked: true, likes: 11 }));
        h.gateway.plan_like(50, Ok(LikeAck { liked: false, likes: 10 }));

        let first = h.controller.toggle_like("p1").unwrap();
        let second = h.controller.toggle_like("p1").unwrap();

        assert_eq!(first.await.unwrap(), MutationOutcome::Stale);
        assert_eq!(second.await.unwrap(), MutationOutcome::Applied);
        assert_eq!(h.controller.visible(&key), Some(like(false, 10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollback_restores_exact_prior_state() {
        let mut h = harness();
        let key = EntityKey::new("p1");
        h.controller.observe(key.clone(), like(false, 10));
        h.gateway
            .plan_like(10, Err(GatewayError::Rejected("500".to_string())));

        let handle = h.controller.toggle_like("p1").unwrap();
        // Optimistic value is visible before the response arrives.
        assert_eq!(h.controller.visible(&key), Some(like(true, 11)));

        let outcome = handle.await.unwrap();
        assert!(matches!(
            outcome,
            MutationOutcome::RolledBack(RollbackReason::Transient(_))
        ));
        assert_eq!(h.controller.visible(&key), Some(like(false, 10)));

        let events = drain(&mut h.rx);
        assert!(events.iter().any(|e| matches!(
            e,
            CoreEvent::MutationRolledBack { value, .. }
                if value.as_like() == Some(LikeState { liked: false, likes: 10 })
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_request_times_out_and_rolls_back() {
        let h = harness();
        let key = EntityKey::new("p1");
        h.controller.observe(key.clone(), like(false, 10));
        h.gateway
            .plan_like(60_000, Ok(LikeAck { liked: true, likes: 11 }));

        let handle = h.controller.toggle_like("p1").unwrap();
        assert_eq!(
            handle.await.unwrap(),
            MutationOutcome::RolledBack(RollbackReason::Timeout)
        );
        assert_eq!(h.controller.visible(&key), Some(like(false, 10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_rejection_publishes_auth_event() {
        let mut h = harness();
        h.gateway.plan_favorite(5, Err(GatewayError::AuthRequired));

        let handle = h.controller.set_favorite("r1", true).unwrap();
        assert_eq!(
            handle.await.unwrap(),
            MutationOutcome::RolledBack(RollbackReason::AuthRequired)
        );

        let events = drain(&mut h.rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, CoreEvent::AuthRequired)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_commit_uses_server_tally() {
        let mut h = harness();
        let key = EntityKey::new("poll1");
        let observed = PollState::new(
            vec![
                PollOption { id: 1, text: "Pho".into(), votes: 3 },
                PollOption { id: 2, text: "Bun cha".into(), votes: 1 },
            ],
            4,
            None,
        );
        h.controller
            .observe(key.clone(), EntityValue::Poll(observed));

        // Someone else voted meanwhile; the server's totals differ from the
        // local provisional tally.
        let server = PollState::new(
            vec![
                PollOption { id: 1, text: "Pho".into(), votes: 5 },
                PollOption { id: 2, text: "Bun cha".into(), votes: 1 },
            ],
            6,
            Some(1),
        );
        h.gateway
            .plan_vote(10, Ok(PollTally { state: server.clone() }));

        let handle = h.controller.vote_poll("poll1", 1).unwrap();

        // Provisional tally is visible immediately.
        let provisional = h.controller.visible(&key).unwrap();
        let provisional = provisional.as_poll().unwrap();
        assert!(provisional.provisional);
        assert_eq!(provisional.total_votes, 5);
        assert_eq!(provisional.percentage(1), 80);

        assert_eq!(handle.await.unwrap(), MutationOutcome::Applied);
        let confirmed = h.controller.visible(&key).unwrap();
        assert_eq!(confirmed.as_poll().unwrap(), &server);

        // The correction was published after the optimistic value.
        let events = drain(&mut h.rx);
        let changes: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, CoreEvent::EntityChanged { .. }))
            .collect();
        assert_eq!(changes.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_like_on_unobserved_entity_is_rejected() {
        let h = harness();
        let result = h.controller.toggle_like("never-seen");
        assert!(matches!(result, Err(CoreError::UnknownEntity(_))));
        assert_eq!(h.gateway.like_call_count(), 0);
    }
}
