//! Rinkside Tenant — isolation enforcement at the data-access boundary.
//!
//! Every relational read and write in the scoring pipeline is routed
//! through [`TenantGuard`]. The guard validates the tenant identifier,
//! lints the query shape for a tenant condition, binds the tenant as the
//! first parameter, and cross-checks returned rows against the requesting
//! tenant.

mod guard;

pub use guard::{GuardedTransaction, TenantGuard};
