//! Storage seam for the Game aggregate.
//!
//! The projector is pure; this trait carries the transactional
//! read-modify-write. `begin_update` must serialize conflicting writers on
//! the same game row (row lock or equivalent) so two concurrent applies
//! cannot race past each other undetected.

use async_trait::async_trait;
use rinkside_core::error::CoreError;
use rinkside_core::tenant::TenantId;
use uuid::Uuid;

use crate::domain::aggregates::Game;

/// Tenant-scoped access to game rows.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Loads a game read-only.
    ///
    /// Absent and out-of-tenant-scope are the same `NotFound` by design.
    async fn load(&self, tenant: TenantId, game_id: Uuid) -> Result<Game, CoreError>;

    /// Opens a transaction holding a write lock on the game row and
    /// returns the current aggregate inside it.
    async fn begin_update(
        &self,
        tenant: TenantId,
        game_id: Uuid,
    ) -> Result<Box<dyn GameUpdateTx>, CoreError>;
}

/// An open, row-locked update on one game.
#[async_trait]
pub trait GameUpdateTx: Send {
    /// The aggregate as read under the lock.
    fn game(&self) -> &Game;

    /// Writes the updated aggregate and commits.
    async fn commit(self: Box<Self>, updated: Game) -> Result<(), CoreError>;

    /// Abandons the update.
    async fn abort(self: Box<Self>) -> Result<(), CoreError>;
}
