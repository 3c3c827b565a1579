//! Live subscription records and the transport registry seam.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use rinkside_core::clock::Clock;
use rinkside_core::error::CoreError;
use rinkside_core::tenant::TenantId;

use crate::snapshot::GameSnapshot;

/// Subscriptions expire this many hours after connect.
pub const CONNECTION_TTL_HOURS: i64 = 24;

/// Outbound buffer depth per connection before sends start failing.
const SEND_BUFFER: usize = 32;

/// An ephemeral subscription of one client to one game's snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    /// Connection identifier.
    pub connection_id: Uuid,
    /// The game being watched.
    pub game_id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Subscribing user.
    pub user_id: Uuid,
    /// When the subscription was created.
    pub connected_at: DateTime<Utc>,
    /// TTL expiry, [`CONNECTION_TTL_HOURS`] after connect.
    pub expires_at: DateTime<Utc>,
}

/// A snapshot wrapped for delivery to a subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    /// What triggered this message, e.g. `"score_update"`.
    pub message_type: String,
    /// The snapshot body.
    pub snapshot: GameSnapshot,
}

/// The transport collaborator: list live subscribers and deliver to one.
/// Dead-connection cleanup belongs to the transport's own lifecycle, not
/// to callers of this trait.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Live, unexpired connections for `(game, tenant)`.
    async fn connections_for_game(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
    ) -> Result<Vec<Connection>, CoreError>;

    /// Delivers one message to one connection.
    async fn send(&self, connection_id: Uuid, message: &OutboundMessage)
    -> Result<(), CoreError>;
}

struct Subscriber {
    connection: Connection,
    sender: mpsc::Sender<OutboundMessage>,
    /// Held until the duplex transport claims it; messages buffer in the
    /// channel meanwhile.
    pending_receiver: Option<mpsc::Receiver<OutboundMessage>>,
}

/// In-process registry over bounded tokio channels. A subscription buffers
/// outbound messages until the transport adapter claims its receiver.
pub struct ChannelRegistry {
    clock: Arc<dyn Clock>,
    subscribers: Mutex<HashMap<Uuid, Subscriber>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a subscription and returns its connection record.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn subscribe(&self, tenant: TenantId, game_id: Uuid, user_id: Uuid) -> Connection {
        let connected_at = self.clock.now();
        let connection = Connection {
            connection_id: Uuid::new_v4(),
            game_id,
            tenant_id: tenant.as_uuid(),
            user_id,
            connected_at,
            expires_at: connected_at + Duration::hours(CONNECTION_TTL_HOURS),
        };
        let (sender, receiver) = mpsc::channel(SEND_BUFFER);
        self.subscribers.lock().unwrap().insert(
            connection.connection_id,
            Subscriber {
                connection: connection.clone(),
                sender,
                pending_receiver: Some(receiver),
            },
        );
        tracing::debug!(
            connection_id = %connection.connection_id,
            game_id = %game_id,
            "subscriber registered"
        );
        connection
    }

    /// Hands the receiving half of a connection's channel to the transport
    /// adapter. Returns `None` when the connection is unknown or already
    /// claimed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn claim_receiver(
        &self,
        tenant: TenantId,
        connection_id: Uuid,
    ) -> Option<mpsc::Receiver<OutboundMessage>> {
        let mut subscribers = self.subscribers.lock().unwrap();
        let subscriber = subscribers.get_mut(&connection_id)?;
        if subscriber.connection.tenant_id != tenant.as_uuid() {
            return None;
        }
        subscriber.pending_receiver.take()
    }

    /// Drops a subscription. Unknown ids are a no-op (the TTL sweep or the
    /// transport may have beaten the caller to it).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn disconnect(&self, tenant: TenantId, connection_id: Uuid) {
        let mut subscribers = self.subscribers.lock().unwrap();
        let owned = subscribers
            .get(&connection_id)
            .is_some_and(|s| s.connection.tenant_id == tenant.as_uuid());
        if owned {
            subscribers.remove(&connection_id);
        }
    }

    fn prune_expired(&self, subscribers: &mut HashMap<Uuid, Subscriber>) {
        let now = self.clock.now();
        subscribers.retain(|_, s| s.connection.expires_at > now);
    }
}

#[async_trait]
impl ConnectionRegistry for ChannelRegistry {
    async fn connections_for_game(
        &self,
        tenant_id: Uuid,
        game_id: Uuid,
    ) -> Result<Vec<Connection>, CoreError> {
        let mut subscribers = self.subscribers.lock().unwrap();
        self.prune_expired(&mut subscribers);
        Ok(subscribers
            .values()
            .filter(|s| s.connection.tenant_id == tenant_id && s.connection.game_id == game_id)
            .map(|s| s.connection.clone())
            .collect())
    }

    async fn send(
        &self,
        connection_id: Uuid,
        message: &OutboundMessage,
    ) -> Result<(), CoreError> {
        let sender = {
            let subscribers = self.subscribers.lock().unwrap();
            subscribers
                .get(&connection_id)
                .map(|s| s.sender.clone())
                .ok_or(CoreError::NotFound {
                    resource: "connection",
                    id: connection_id,
                })?
        };
        sender.try_send(message.clone()).map_err(|e| {
            CoreError::ServiceUnavailable(format!("connection {connection_id} not accepting: {e}"))
        })
    }
}
