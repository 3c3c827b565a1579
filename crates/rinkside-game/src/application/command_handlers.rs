//! Write-path orchestration for inbound scoring actions.
//!
//! The pipeline: validate the payload, append to the event log
//! (idempotency is a conditional insert), project onto the row-locked
//! aggregate, back-reference reversals, and recompute standings when the
//! game was finalized. Snapshot generation and broadcast happen above this
//! layer so their failures cannot affect the write.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use rinkside_core::clock::Clock;
use rinkside_core::error::{CoreError, codes};
use rinkside_core::event::{
    AppendOutcome, EVENT_TTL_DAYS, EventLog, EventMetadata, EventRecord, sort_key,
};
use rinkside_core::metrics::Metrics;
use rinkside_core::tenant::TenantId;
use rinkside_standings::StandingsEngine;

use crate::application::validator;
use crate::domain::aggregates::{Game, GameStatus};
use crate::domain::commands::RecordGameAction;
use crate::domain::events::{EventType, GameAction};
use crate::domain::projector;
use crate::store::GameStore;

/// Everything the write path needs, injected once at startup.
pub struct ScoringDeps {
    /// Server clock.
    pub clock: Arc<dyn Clock>,
    /// The append-only event log.
    pub event_log: Arc<dyn EventLog>,
    /// Transactional access to game rows.
    pub games: Arc<dyn GameStore>,
    /// Standings recalculation, triggered on finalization.
    pub standings: Arc<StandingsEngine>,
    /// Telemetry sink.
    pub metrics: Arc<dyn Metrics>,
}

/// Result of a successfully handled scoring action.
#[derive(Debug)]
pub struct RecordOutcome {
    /// The stored event — the original one when the submission was a
    /// duplicate.
    pub event: EventRecord,
    /// The aggregate after projection (current state for duplicates).
    pub game: Game,
    /// Whether the idempotency key matched a prior submission.
    pub duplicate: bool,
    /// Whether this action finalized the game.
    pub finalized: bool,
}

/// Handles one inbound scoring action end to end.
///
/// Duplicate submissions (same per-tenant idempotency key) are not an
/// error: the original event and current state come back with success, so
/// unreliable clients can retry blindly.
///
/// # Errors
///
/// Validation, not-found, conflict, and store errors per the error
/// taxonomy; all deterministic failures leave the aggregate untouched.
pub async fn handle_record_game_action(
    command: &RecordGameAction,
    deps: &ScoringDeps,
) -> Result<RecordOutcome, CoreError> {
    let tenant = TenantId::parse(&command.tenant_id)?;
    let action = validator::validate_action(&command.event_type, &command.payload)?;
    validator::validate_coordinates(command.coordinates.as_ref())?;

    let now = deps.clock.now();
    let occurred_at = command.occurred_at.unwrap_or(now);
    validator::validate_occurred_at(occurred_at, now)?;

    let event_id = Uuid::new_v4();
    let record = EventRecord {
        event_id,
        game_id: command.game_id,
        tenant_id: tenant.as_uuid(),
        event_type: action.event_type().as_str().to_owned(),
        occurred_at,
        sort_key: sort_key(occurred_at, event_id),
        payload: command.payload.clone(),
        metadata: EventMetadata {
            user_id: command.user_id,
            source: command.source.clone(),
            ip_address: command.ip_address.clone(),
        },
        recorded_at: now,
        expires_at: now + Duration::days(EVENT_TTL_DAYS),
        idempotency_key: command.idempotency_key.clone(),
        reversed_by: None,
        coordinates: command.coordinates.clone(),
    };

    let record = match deps.event_log.append(record).await? {
        AppendOutcome::Duplicate(original) => {
            let game = deps.games.load(tenant, command.game_id).await?;
            tracing::info!(
                game_id = %command.game_id,
                event_id = %original.event_id,
                "duplicate submission resolved to original event"
            );
            return Ok(RecordOutcome {
                event: original,
                game,
                duplicate: true,
                finalized: false,
            });
        }
        AppendOutcome::Appended(record) => record,
    };

    let tx = deps.games.begin_update(tenant, command.game_id).await?;
    let current = tx.game().clone();

    // Finalization locks the game for every event type, the reversal
    // path included (post-finalization reversal is unsupported).
    if current.status == GameStatus::Final {
        let _ = tx.abort().await;
        return Err(CoreError::conflict(
            codes::GAME_ALREADY_FINALIZED,
            format!("game {} is already finalized", current.id),
        ));
    }

    let projected = project_action(&current, &action, tenant, deps, now).await;
    let (updated, reversed_target) = match projected {
        Ok(result) => result,
        Err(err) => {
            let _ = tx.abort().await;
            return Err(err);
        }
    };

    tx.commit(updated.clone()).await?;

    if let Some(target_id) = reversed_target {
        deps.event_log
            .mark_reversed(tenant.as_uuid(), command.game_id, target_id, record.event_id)
            .await?;
    }

    deps.metrics.increment(
        "events.appended",
        &[("event_type", record.event_type.clone())],
    );

    let finalized = matches!(action, GameAction::GameFinalized(_));
    if finalized {
        deps.standings.recalculate(tenant, updated.season_id).await?;
    }

    tracing::info!(
        game_id = %command.game_id,
        event_id = %record.event_id,
        event_type = %record.event_type,
        home_score = updated.home_score,
        away_score = updated.away_score,
        "scoring action applied"
    );

    Ok(RecordOutcome {
        event: record,
        game: updated,
        duplicate: false,
        finalized,
    })
}

/// Projects the action, resolving and precondition-checking the reversal
/// target when needed. Returns the next aggregate and, for reversals, the
/// id of the event to back-reference.
async fn project_action(
    current: &Game,
    action: &GameAction,
    tenant: TenantId,
    deps: &ScoringDeps,
    now: DateTime<Utc>,
) -> Result<(Game, Option<Uuid>), CoreError> {
    let GameAction::EventReversal(reversal) = action else {
        return Ok((projector::apply(current, action, now)?, None));
    };

    let target = deps
        .event_log
        .find(tenant.as_uuid(), current.id, reversal.reversed_event_id)
        .await?
        .ok_or(CoreError::NotFound {
            resource: "event",
            id: reversal.reversed_event_id,
        })?;

    if let Some(existing) = target.reversed_by {
        return Err(CoreError::conflict(
            codes::EVENT_ALREADY_REVERSED,
            format!("event {} already reversed by {existing}", target.event_id),
        ));
    }

    let target_type = EventType::parse(&target.event_type).map_err(|_| {
        CoreError::Internal(format!(
            "stored event {} has unknown type {}",
            target.event_id, target.event_type
        ))
    })?;
    let target_action = GameAction::from_stored(target_type, &target.payload)?;

    let updated = projector::apply_reversal(current, target_type, &target_action, now)?;
    Ok((updated, Some(target.event_id)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use rinkside_standings::{FinalizedGame, StandingsStore, TeamStanding};
    use rinkside_test_support::{FailingEventLog, FixedClock, InMemoryEventLog, RecordingMetrics};
    use serde_json::json;

    use crate::store::GameUpdateTx;

    use super::*;

    const TENANT: &str = "5c3f8a1b-94d2-4e07-9e65-1f2a3b4c5d6e";

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 7, 19, 0, 0).unwrap()
    }

    fn live_game() -> Game {
        let scheduled = Utc.with_ymd_and_hms(2026, 3, 7, 18, 30, 0).unwrap();
        Game {
            id: Uuid::new_v4(),
            season_id: Uuid::new_v4(),
            home_team_id: Uuid::new_v4(),
            away_team_id: Uuid::new_v4(),
            scheduled_at: scheduled,
            status: GameStatus::Live,
            home_score: 0,
            away_score: 0,
            created_at: scheduled,
            updated_at: scheduled,
        }
    }

    #[derive(Default)]
    struct FakeGameStore {
        games: Arc<Mutex<HashMap<Uuid, Game>>>,
    }

    impl FakeGameStore {
        fn with_game(game: Game) -> Arc<Self> {
            let store = Self::default();
            store.games.lock().unwrap().insert(game.id, game);
            Arc::new(store)
        }

        fn current(&self, game_id: Uuid) -> Game {
            self.games.lock().unwrap().get(&game_id).unwrap().clone()
        }
    }

    #[async_trait]
    impl GameStore for FakeGameStore {
        async fn load(&self, _tenant: TenantId, game_id: Uuid) -> Result<Game, CoreError> {
            self.games
                .lock()
                .unwrap()
                .get(&game_id)
                .cloned()
                .ok_or(CoreError::NotFound {
                    resource: "game",
                    id: game_id,
                })
        }

        async fn begin_update(
            &self,
            tenant: TenantId,
            game_id: Uuid,
        ) -> Result<Box<dyn GameUpdateTx>, CoreError> {
            let game = self.load(tenant, game_id).await?;
            Ok(Box::new(FakeTx {
                games: Arc::clone(&self.games),
                game,
            }))
        }
    }

    struct FakeTx {
        games: Arc<Mutex<HashMap<Uuid, Game>>>,
        game: Game,
    }

    #[async_trait]
    impl GameUpdateTx for FakeTx {
        fn game(&self) -> &Game {
            &self.game
        }

        async fn commit(self: Box<Self>, updated: Game) -> Result<(), CoreError> {
            self.games.lock().unwrap().insert(updated.id, updated);
            Ok(())
        }

        async fn abort(self: Box<Self>) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingStandingsStore {
        replaced: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl StandingsStore for RecordingStandingsStore {
        async fn season_league(
            &self,
            _tenant: TenantId,
            _season_id: Uuid,
        ) -> Result<Uuid, CoreError> {
            Ok(Uuid::new_v4())
        }

        async fn league_team_ids(
            &self,
            _tenant: TenantId,
            _league_id: Uuid,
        ) -> Result<Vec<Uuid>, CoreError> {
            Ok(Vec::new())
        }

        async fn finalized_games(
            &self,
            _tenant: TenantId,
            _season_id: Uuid,
        ) -> Result<Vec<FinalizedGame>, CoreError> {
            Ok(Vec::new())
        }

        async fn replace_standings(
            &self,
            _tenant: TenantId,
            season_id: Uuid,
            _rows: &[TeamStanding],
        ) -> Result<(), CoreError> {
            self.replaced.lock().unwrap().push(season_id);
            Ok(())
        }

        async fn season_table(
            &self,
            _tenant: TenantId,
            _season_id: Uuid,
        ) -> Result<Vec<TeamStanding>, CoreError> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        deps: ScoringDeps,
        games: Arc<FakeGameStore>,
        log: Arc<InMemoryEventLog>,
        standings_store: Arc<RecordingStandingsStore>,
        metrics: Arc<RecordingMetrics>,
    }

    fn harness(game: Game) -> Harness {
        let games = FakeGameStore::with_game(game);
        let log = Arc::new(InMemoryEventLog::new());
        let standings_store = Arc::new(RecordingStandingsStore::default());
        let metrics = Arc::new(RecordingMetrics::default());
        let deps = ScoringDeps {
            clock: Arc::new(FixedClock(fixed_now())),
            event_log: log.clone(),
            games: games.clone(),
            standings: Arc::new(StandingsEngine::new(
                standings_store.clone(),
                metrics.clone(),
            )),
            metrics: metrics.clone(),
        };
        Harness {
            deps,
            games,
            log,
            standings_store,
            metrics,
        }
    }

    fn command(game_id: Uuid, event_type: &str, payload: serde_json::Value) -> RecordGameAction {
        RecordGameAction {
            tenant_id: TENANT.to_owned(),
            game_id,
            event_type: event_type.to_owned(),
            payload,
            occurred_at: None,
            idempotency_key: None,
            coordinates: None,
            user_id: Uuid::new_v4(),
            source: "scorekeeper-app".to_owned(),
            ip_address: None,
        }
    }

    fn goal_payload(team_id: Uuid) -> serde_json::Value {
        json!({
            "team_id": team_id,
            "player_id": Uuid::new_v4(),
            "period": 1,
            "time_remaining": "10:00",
        })
    }

    #[tokio::test]
    async fn test_goal_scored_appends_and_increments_home_score() {
        // Arrange
        let game = live_game();
        let h = harness(game.clone());
        let cmd = command(game.id, "GOAL_SCORED", goal_payload(game.home_team_id));

        // Act
        let outcome = handle_record_game_action(&cmd, &h.deps).await.unwrap();

        // Assert
        assert!(!outcome.duplicate);
        assert_eq!(outcome.game.home_score, 1);
        assert_eq!(outcome.game.away_score, 0);
        assert_eq!(h.games.current(game.id).home_score, 1);
        assert_eq!(h.log.records().len(), 1);
        assert_eq!(h.log.records()[0].event_type, "GOAL_SCORED");
        assert_eq!(h.metrics.counter("events.appended"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_idempotency_key_stores_one_event_and_skips_mutation() {
        // Arrange
        let game = live_game();
        let h = harness(game.clone());
        let mut cmd = command(game.id, "GOAL_SCORED", goal_payload(game.home_team_id));
        cmd.idempotency_key = Some("retry-123".to_owned());

        // Act
        let first = handle_record_game_action(&cmd, &h.deps).await.unwrap();
        let second = handle_record_game_action(&cmd, &h.deps).await.unwrap();

        // Assert
        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert_eq!(second.event.event_id, first.event.event_id);
        assert_eq!(h.log.appended_count(), 1);
        // The second submission did not re-apply the goal.
        assert_eq!(h.games.current(game.id).home_score, 1);
    }

    #[tokio::test]
    async fn test_finalization_sets_final_and_recalculates_standings_once() {
        // Arrange
        let game = live_game();
        let h = harness(game.clone());
        let cmd = command(
            game.id,
            "GAME_FINALIZED",
            json!({"final_home_score": 1, "final_away_score": 0}),
        );

        // Act
        let outcome = handle_record_game_action(&cmd, &h.deps).await.unwrap();

        // Assert
        assert!(outcome.finalized);
        assert_eq!(outcome.game.status, GameStatus::Final);
        let replaced = h.standings_store.replaced.lock().unwrap().clone();
        assert_eq!(replaced, vec![game.season_id]);
    }

    #[tokio::test]
    async fn test_events_after_finalization_are_rejected() {
        let game = live_game();
        let h = harness(game.clone());
        let finalize = command(
            game.id,
            "GAME_FINALIZED",
            json!({"final_home_score": 0, "final_away_score": 0}),
        );
        handle_record_game_action(&finalize, &h.deps).await.unwrap();

        let late_goal = command(game.id, "GOAL_SCORED", goal_payload(game.home_team_id));
        let err = handle_record_game_action(&late_goal, &h.deps)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "GAME_ALREADY_FINALIZED");
        assert_eq!(h.games.current(game.id).status, GameStatus::Final);
    }

    #[tokio::test]
    async fn test_reversal_decrements_score_and_back_references_the_goal() {
        // Arrange
        let game = live_game();
        let h = harness(game.clone());
        let goal = command(game.id, "GOAL_SCORED", goal_payload(game.home_team_id));
        let goal_outcome = handle_record_game_action(&goal, &h.deps).await.unwrap();

        let reversal = command(
            game.id,
            "EVENT_REVERSAL",
            json!({"reversed_event_id": goal_outcome.event.event_id, "reason": "scored off a high stick"}),
        );

        // Act
        let outcome = handle_record_game_action(&reversal, &h.deps).await.unwrap();

        // Assert
        assert_eq!(outcome.game.home_score, 0);
        let stored_goal = h
            .log
            .find(
                Uuid::parse_str(TENANT).unwrap(),
                game.id,
                goal_outcome.event.event_id,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored_goal.reversed_by, Some(outcome.event.event_id));
        // The reversal itself is a durable, distinct event.
        assert_eq!(h.log.appended_count(), 2);
    }

    #[tokio::test]
    async fn test_reversing_twice_fails_with_already_reversed() {
        let game = live_game();
        let h = harness(game.clone());
        let goal = command(game.id, "GOAL_SCORED", goal_payload(game.home_team_id));
        let goal_outcome = handle_record_game_action(&goal, &h.deps).await.unwrap();

        let reversal = command(
            game.id,
            "EVENT_REVERSAL",
            json!({"reversed_event_id": goal_outcome.event.event_id}),
        );
        handle_record_game_action(&reversal, &h.deps).await.unwrap();
        let err = handle_record_game_action(&reversal, &h.deps)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "EVENT_ALREADY_REVERSED");
        assert_eq!(h.games.current(game.id).home_score, 0);
    }

    #[tokio::test]
    async fn test_reversing_a_non_reversible_event_fails() {
        let game = live_game();
        let h = harness(game.clone());
        let period_end = command(game.id, "PERIOD_ENDED", json!({"period": 1}));
        let period_outcome = handle_record_game_action(&period_end, &h.deps)
            .await
            .unwrap();

        let reversal = command(
            game.id,
            "EVENT_REVERSAL",
            json!({"reversed_event_id": period_outcome.event.event_id}),
        );
        let err = handle_record_game_action(&reversal, &h.deps)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "EVENT_NOT_REVERSIBLE");
    }

    #[tokio::test]
    async fn test_reversing_a_missing_event_fails_with_not_found() {
        let game = live_game();
        let h = harness(game.clone());
        let reversal = command(
            game.id,
            "EVENT_REVERSAL",
            json!({"reversed_event_id": Uuid::new_v4()}),
        );

        let err = handle_record_game_action(&reversal, &h.deps)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound { resource: "event", .. }));
    }

    #[tokio::test]
    async fn test_goal_reversal_at_zero_score_leaves_state_unchanged() {
        // Seed a goal, correct the score back down to zero, then try to
        // reverse the goal: the floor must hold.
        let game = live_game();
        let h = harness(game.clone());
        let goal = command(game.id, "GOAL_SCORED", goal_payload(game.home_team_id));
        let goal_outcome = handle_record_game_action(&goal, &h.deps).await.unwrap();
        let correction = command(
            game.id,
            "SCORE_CORRECTED",
            json!({
                "previous_home_score": 1,
                "previous_away_score": 0,
                "new_home_score": 0,
                "new_away_score": 0,
                "reason": "goal entered twice",
            }),
        );
        handle_record_game_action(&correction, &h.deps)
            .await
            .unwrap();

        let reversal = command(
            game.id,
            "EVENT_REVERSAL",
            json!({"reversed_event_id": goal_outcome.event.event_id}),
        );
        let err = handle_record_game_action(&reversal, &h.deps)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "SCORE_WOULD_GO_NEGATIVE");
        let current = h.games.current(game.id);
        assert_eq!((current.home_score, current.away_score), (0, 0));
    }

    #[tokio::test]
    async fn test_future_occurred_at_is_rejected_before_any_store_call() {
        let game = live_game();
        let h = harness(game.clone());
        let mut cmd = command(game.id, "GOAL_SCORED", goal_payload(game.home_team_id));
        cmd.occurred_at = Some(fixed_now() + Duration::hours(1));

        let err = handle_record_game_action(&cmd, &h.deps).await.unwrap_err();

        assert_eq!(err.code(), "INVALID_TIMESTAMP");
        assert!(h.log.records().is_empty());
    }

    #[tokio::test]
    async fn test_offline_capture_two_hours_late_is_accepted() {
        let game = live_game();
        let h = harness(game.clone());
        let mut cmd = command(game.id, "GOAL_SCORED", goal_payload(game.home_team_id));
        cmd.occurred_at = Some(fixed_now() - Duration::hours(2));

        let outcome = handle_record_game_action(&cmd, &h.deps).await.unwrap();

        assert_eq!(outcome.event.occurred_at, fixed_now() - Duration::hours(2));
    }

    #[tokio::test]
    async fn test_malformed_tenant_is_rejected_up_front() {
        let game = live_game();
        let h = harness(game.clone());
        let mut cmd = command(game.id, "GOAL_SCORED", goal_payload(game.home_team_id));
        cmd.tenant_id = "not-a-tenant".to_owned();

        let err = handle_record_game_action(&cmd, &h.deps).await.unwrap_err();

        assert_eq!(err.code(), "INVALID_TENANT_ID");
    }

    #[tokio::test]
    async fn test_unavailable_event_log_surfaces_as_service_unavailable() {
        let game = live_game();
        let h = harness(game.clone());
        let mut deps = h.deps;
        deps.event_log = Arc::new(FailingEventLog);
        let cmd = command(game.id, "GOAL_SCORED", goal_payload(game.home_team_id));

        let err = handle_record_game_action(&cmd, &deps).await.unwrap_err();

        assert!(matches!(err, CoreError::ServiceUnavailable(_)));
    }
}
