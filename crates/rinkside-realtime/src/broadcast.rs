//! Best-effort snapshot fan-out.

use std::sync::Arc;

use uuid::Uuid;

use rinkside_core::metrics::Metrics;
use rinkside_core::tenant::TenantId;

use crate::registry::{ConnectionRegistry, OutboundMessage};
use crate::snapshot::GameSnapshot;

/// Counter incremented per connection that could not be delivered to.
const DELIVERY_FAILURES: &str = "broadcast.delivery_failures";

/// Delivers snapshots to every live subscriber of a game.
pub struct BroadcastDispatcher {
    registry: Arc<dyn ConnectionRegistry>,
    metrics: Arc<dyn Metrics>,
}

impl BroadcastDispatcher {
    /// Creates a dispatcher over the given registry.
    #[must_use]
    pub fn new(registry: Arc<dyn ConnectionRegistry>, metrics: Arc<dyn Metrics>) -> Self {
        Self { registry, metrics }
    }

    /// Fans the snapshot out to all live connections for `(game, tenant)`.
    ///
    /// Infallible by contract: a failed delivery is logged and counted,
    /// never propagated, and never aborts delivery to the remaining
    /// subscribers. Returns the number of successful deliveries.
    pub async fn broadcast(
        &self,
        tenant: TenantId,
        game_id: Uuid,
        snapshot: &GameSnapshot,
        message_type: &str,
    ) -> usize {
        let connections = match self
            .registry
            .connections_for_game(tenant.as_uuid(), game_id)
            .await
        {
            Ok(connections) => connections,
            Err(err) => {
                tracing::warn!(game_id = %game_id, error = %err, "subscriber lookup failed");
                self.metrics.increment(DELIVERY_FAILURES, &[]);
                return 0;
            }
        };

        let message = OutboundMessage {
            message_type: message_type.to_owned(),
            snapshot: snapshot.clone(),
        };

        let mut delivered = 0;
        for connection in connections {
            match self
                .registry
                .send(connection.connection_id, &message)
                .await
            {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(
                        connection_id = %connection.connection_id,
                        game_id = %game_id,
                        error = %err,
                        "snapshot delivery failed"
                    );
                    self.metrics.increment(DELIVERY_FAILURES, &[]);
                }
            }
        }
        tracing::debug!(game_id = %game_id, delivered, message_type, "broadcast complete");
        delivered
    }
}
