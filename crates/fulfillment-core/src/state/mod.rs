//! Typed access to persisted orders.
//!
//! Every write goes through a field-level update, so independent writers (the
//! launcher, the checkpoint recorder, the status updater) never overwrite each
//! other's fields.

pub mod order;

pub use order::{OrderStateError, OrderStore};
