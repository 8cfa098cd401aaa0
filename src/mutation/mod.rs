//! Mutation layer - optimistic writes against the query cache.

mod coordinator;
mod error;
mod pending;

pub use coordinator::{CreateReconcile, MutationCoordinator};
pub use error::MutationError;
pub use pending::{MutationKind, OptimisticOp, PendingMutation};
