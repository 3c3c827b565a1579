//! Payload validation for inbound scoring actions.
//!
//! Purely functional and total: every well-formed input is either accepted
//! into a typed [`GameAction`] or rejected with field-level detail. No I/O
//! happens here; the timestamp check takes the server receipt time as an
//! argument.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use rinkside_core::error::{CoreError, FieldViolation, codes};
use rinkside_core::event::SpatialCoordinates;

use crate::domain::events::{EventType, GameAction};

/// Client-supplied `occurred_at` may lag server receipt by at most this.
pub const LATE_EVENT_WINDOW_HOURS: i64 = 24;

type Obj = serde_json::Map<String, Value>;

/// Validates an inbound payload against the schema implied by its event
/// type and returns the typed action.
///
/// # Errors
///
/// `UNKNOWN_EVENT_TYPE` for a type outside the closed set;
/// `INVALID_PAYLOAD` with per-field violations otherwise.
pub fn validate_action(event_type_raw: &str, payload: &Value) -> Result<GameAction, CoreError> {
    let event_type = EventType::parse(event_type_raw)?;
    let obj = as_object(payload)?;

    let mut violations = Vec::new();
    match event_type {
        EventType::GameStarted => {}
        EventType::GoalScored => {
            require_uuid(obj, "team_id", &mut violations);
            require_uuid(obj, "player_id", &mut violations);
            require_int_min(obj, "period", 1, &mut violations);
            require_clock(obj, "time_remaining", &mut violations);
            optional_uuid(obj, "assist_player_id", &mut violations);
        }
        EventType::PenaltyAssessed => {
            require_uuid(obj, "team_id", &mut violations);
            require_uuid(obj, "player_id", &mut violations);
            require_int_min(obj, "period", 1, &mut violations);
            require_clock(obj, "time_remaining", &mut violations);
            require_non_empty_str(obj, "infraction", &mut violations);
            require_int_min(obj, "minutes", 1, &mut violations);
        }
        EventType::ShotOnGoal => {
            require_uuid(obj, "team_id", &mut violations);
            require_uuid(obj, "player_id", &mut violations);
            require_int_min(obj, "period", 1, &mut violations);
        }
        EventType::PeriodEnded => {
            require_int_min(obj, "period", 1, &mut violations);
        }
        EventType::GameFinalized => {
            require_int_min(obj, "final_home_score", 0, &mut violations);
            require_int_min(obj, "final_away_score", 0, &mut violations);
            reject_additional_fields(
                obj,
                &["final_home_score", "final_away_score"],
                &mut violations,
            );
        }
        EventType::GameCancelled => {
            optional_str(obj, "reason", &mut violations);
        }
        EventType::ScoreCorrected => {
            require_int_min(obj, "previous_home_score", 0, &mut violations);
            require_int_min(obj, "previous_away_score", 0, &mut violations);
            require_int_min(obj, "new_home_score", 0, &mut violations);
            require_int_min(obj, "new_away_score", 0, &mut violations);
            require_non_empty_str(obj, "reason", &mut violations);
        }
        EventType::EventReversal => {
            require_uuid(obj, "reversed_event_id", &mut violations);
            optional_str(obj, "reason", &mut violations);
        }
    }

    if !violations.is_empty() {
        return Err(CoreError::validation_fields(
            codes::INVALID_PAYLOAD,
            format!("invalid {event_type} payload"),
            violations,
        ));
    }

    GameAction::from_stored(event_type, payload)
}

/// Validates optional playing-surface coordinates.
///
/// # Errors
///
/// `INVALID_PAYLOAD` when `x` or `y` falls outside `[0.0, 1.0]` or the
/// zone is empty.
pub fn validate_coordinates(coordinates: Option<&SpatialCoordinates>) -> Result<(), CoreError> {
    let Some(coords) = coordinates else {
        return Ok(());
    };
    let mut violations = Vec::new();
    for (field, value) in [("coordinates.x", coords.x), ("coordinates.y", coords.y)] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            violations.push(FieldViolation::new(
                field,
                format!("must be within [0.0, 1.0], got {value}"),
            ));
        }
    }
    if let Some(zone) = &coords.zone
        && zone.trim().is_empty()
    {
        violations.push(FieldViolation::new("coordinates.zone", "must not be empty"));
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(CoreError::validation_fields(
            codes::INVALID_PAYLOAD,
            "invalid spatial coordinates",
            violations,
        ))
    }
}

/// Validates a client-supplied occurrence time against server receipt
/// time: not in the future, and at most [`LATE_EVENT_WINDOW_HOURS`] old.
///
/// # Errors
///
/// `INVALID_TIMESTAMP`, with the offending timestamp and a message
/// distinguishing "future" from "too old".
pub fn validate_occurred_at(
    occurred_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    if occurred_at > now {
        return Err(CoreError::validation_fields(
            codes::INVALID_TIMESTAMP,
            format!("occurred_at {occurred_at} is in the future (server time {now})"),
            vec![FieldViolation::new("occurred_at", "in the future")],
        ));
    }
    if now - occurred_at > Duration::hours(LATE_EVENT_WINDOW_HOURS) {
        return Err(CoreError::validation_fields(
            codes::INVALID_TIMESTAMP,
            format!(
                "occurred_at {occurred_at} is too old: more than {LATE_EVENT_WINDOW_HOURS}h \
                 before server time {now}"
            ),
            vec![FieldViolation::new("occurred_at", "too old")],
        ));
    }
    Ok(())
}

fn as_object(payload: &Value) -> Result<&Obj, CoreError> {
    payload.as_object().ok_or_else(|| {
        CoreError::validation_fields(
            codes::INVALID_PAYLOAD,
            "payload must be a JSON object",
            vec![FieldViolation::new("payload", "expected an object")],
        )
    })
}

fn require_uuid(obj: &Obj, field: &str, violations: &mut Vec<FieldViolation>) {
    match obj.get(field) {
        None | Some(Value::Null) => {
            violations.push(FieldViolation::new(field, "is required"));
        }
        Some(value) => {
            if !value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok()) {
                violations.push(FieldViolation::new(field, "must be a UUID"));
            }
        }
    }
}

fn optional_uuid(obj: &Obj, field: &str, violations: &mut Vec<FieldViolation>) {
    match obj.get(field) {
        None | Some(Value::Null) => {}
        Some(value) => {
            if !value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok()) {
                violations.push(FieldViolation::new(field, "must be a UUID"));
            }
        }
    }
}

fn require_int_min(obj: &Obj, field: &str, min: i64, violations: &mut Vec<FieldViolation>) {
    match obj.get(field).and_then(Value::as_i64) {
        None => violations.push(FieldViolation::new(
            field,
            format!("must be an integer >= {min}"),
        )),
        Some(value) if value < min || value > i64::from(u32::MAX) => {
            violations.push(FieldViolation::new(
                field,
                format!("must be an integer >= {min}, got {value}"),
            ));
        }
        Some(_) => {}
    }
}

fn require_clock(obj: &Obj, field: &str, violations: &mut Vec<FieldViolation>) {
    let ok = obj
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(is_zero_padded_clock);
    if !ok {
        violations.push(FieldViolation::new(
            field,
            "must be a zero-padded MM:SS clock value",
        ));
    }
}

/// `MM:SS`, both components zero-padded to two digits, seconds under 60.
fn is_zero_padded_clock(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    if ![0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit()) {
        return false;
    }
    let seconds = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
    seconds < 60
}

fn require_non_empty_str(obj: &Obj, field: &str, violations: &mut Vec<FieldViolation>) {
    let ok = obj
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !ok {
        violations.push(FieldViolation::new(field, "must be a non-empty string"));
    }
}

fn optional_str(obj: &Obj, field: &str, violations: &mut Vec<FieldViolation>) {
    match obj.get(field) {
        None | Some(Value::Null) => {}
        Some(value) if value.is_string() => {}
        Some(_) => violations.push(FieldViolation::new(field, "must be a string")),
    }
}

fn reject_additional_fields(obj: &Obj, allowed: &[&str], violations: &mut Vec<FieldViolation>) {
    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            violations.push(FieldViolation::new(
                key.clone(),
                "unexpected field for this event type",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn violations(err: &CoreError) -> Vec<String> {
        match err {
            CoreError::Validation { fields, .. } => {
                fields.iter().map(|f| f.field.clone()).collect()
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_goal_scored_accepts_a_complete_payload() {
        let payload = json!({
            "team_id": Uuid::new_v4(),
            "player_id": Uuid::new_v4(),
            "period": 3,
            "time_remaining": "00:42",
            "assist_player_id": Uuid::new_v4(),
        });

        let action = validate_action("GOAL_SCORED", &payload).unwrap();

        assert!(matches!(action, GameAction::GoalScored(_)));
    }

    #[test]
    fn test_goal_scored_reports_each_bad_field() {
        let payload = json!({
            "team_id": "not-a-uuid",
            "period": 0,
            "time_remaining": "7:43",
        });

        let err = validate_action("GOAL_SCORED", &payload).unwrap_err();

        assert_eq!(err.code(), "INVALID_PAYLOAD");
        let fields = violations(&err);
        assert!(fields.contains(&"team_id".to_owned()));
        assert!(fields.contains(&"player_id".to_owned()));
        assert!(fields.contains(&"period".to_owned()));
        assert!(fields.contains(&"time_remaining".to_owned()));
    }

    #[test]
    fn test_clock_values_must_be_zero_padded_mm_ss() {
        assert!(is_zero_padded_clock("12:30"));
        assert!(is_zero_padded_clock("00:00"));
        assert!(!is_zero_padded_clock("7:43"));
        assert!(!is_zero_padded_clock("12:61"));
        assert!(!is_zero_padded_clock("12-30"));
        assert!(!is_zero_padded_clock("12:3"));
        assert!(!is_zero_padded_clock("112:30"));
    }

    #[test]
    fn test_game_finalized_rejects_additional_properties() {
        let payload = json!({
            "final_home_score": 1,
            "final_away_score": 0,
            "overtime": true,
        });

        let err = validate_action("GAME_FINALIZED", &payload).unwrap_err();

        assert_eq!(err.code(), "INVALID_PAYLOAD");
        assert_eq!(violations(&err), vec!["overtime".to_owned()]);
    }

    #[test]
    fn test_game_finalized_rejects_negative_scores() {
        let payload = json!({
            "final_home_score": -1,
            "final_away_score": 0,
        });

        let err = validate_action("GAME_FINALIZED", &payload).unwrap_err();

        assert_eq!(violations(&err), vec!["final_home_score".to_owned()]);
    }

    #[test]
    fn test_score_corrected_requires_non_empty_reason() {
        let payload = json!({
            "previous_home_score": 2,
            "previous_away_score": 1,
            "new_home_score": 1,
            "new_away_score": 1,
            "reason": "   ",
        });

        let err = validate_action("SCORE_CORRECTED", &payload).unwrap_err();

        assert_eq!(violations(&err), vec!["reason".to_owned()]);
    }

    #[test]
    fn test_unknown_event_type_is_distinct_from_payload_failure() {
        let err = validate_action("POWER_PLAY_STARTED", &json!({})).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_EVENT_TYPE");
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let err = validate_action("GAME_STARTED", &json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.code(), "INVALID_PAYLOAD");
    }

    #[test]
    fn test_coordinates_outside_unit_square_are_rejected() {
        let coords = SpatialCoordinates {
            x: 1.2,
            y: 0.5,
            zone: None,
        };

        let err = validate_coordinates(Some(&coords)).unwrap_err();

        assert_eq!(err.code(), "INVALID_PAYLOAD");
        assert_eq!(violations(&err), vec!["coordinates.x".to_owned()]);
    }

    #[test]
    fn test_coordinates_on_the_boundary_are_accepted() {
        let coords = SpatialCoordinates {
            x: 0.0,
            y: 1.0,
            zone: Some("slot".into()),
        };
        validate_coordinates(Some(&coords)).unwrap();
    }

    #[test]
    fn test_occurred_at_one_hour_in_the_future_is_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();

        let err = validate_occurred_at(now + Duration::hours(1), now).unwrap_err();

        assert_eq!(err.code(), "INVALID_TIMESTAMP");
        assert!(err.to_string().contains("future"));
    }

    #[test]
    fn test_occurred_at_twenty_five_hours_old_is_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();

        let err = validate_occurred_at(now - Duration::hours(25), now).unwrap_err();

        assert_eq!(err.code(), "INVALID_TIMESTAMP");
        assert!(err.to_string().contains("too old"));
    }

    #[test]
    fn test_occurred_at_two_hours_old_is_accepted() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        validate_occurred_at(now - Duration::hours(2), now).unwrap();
    }
}
