//! Event store database schema.

/// SQL to create the game events table.
pub const CREATE_GAME_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS game_events (
    event_id        UUID PRIMARY KEY,
    tenant_id       UUID NOT NULL,
    game_id         UUID NOT NULL,
    event_type      VARCHAR(64) NOT NULL,
    occurred_at     TIMESTAMPTZ NOT NULL,
    sort_key        TEXT NOT NULL,
    payload         JSONB NOT NULL,
    user_id         UUID NOT NULL,
    source          TEXT NOT NULL,
    ip_address      TEXT,
    recorded_at     TIMESTAMPTZ NOT NULL,
    expires_at      TIMESTAMPTZ NOT NULL,
    idempotency_key TEXT,
    reversed_by     UUID,
    coordinates     JSONB
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_game_events_idempotency
    ON game_events (tenant_id, idempotency_key)
    WHERE idempotency_key IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_game_events_game
    ON game_events (tenant_id, game_id, occurred_at, event_id);
";
