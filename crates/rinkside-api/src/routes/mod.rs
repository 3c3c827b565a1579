//! Route modules.

pub mod games;
pub mod health;
pub mod standings;
pub mod subscriptions;
