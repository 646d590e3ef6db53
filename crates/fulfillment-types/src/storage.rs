//! Storage-related types for the fulfillment coordinator.

/// Storage namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Order records, keyed by order id
	Orders,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
		}
	}
}

/// Top-level field names of a stored order document.
///
/// Field-level store operations take these instead of string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderField {
	OrderId,
	TenantId,
	CustomerId,
	Total,
	Status,
	History,
	ExecutionHandle,
	PendingCheckpoint,
	UpdatedAt,
}

impl OrderField {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderField::OrderId => "order_id",
			OrderField::TenantId => "tenant_id",
			OrderField::CustomerId => "customer_id",
			OrderField::Total => "total",
			OrderField::Status => "status",
			OrderField::History => "history",
			OrderField::ExecutionHandle => "execution_handle",
			OrderField::PendingCheckpoint => "pending_checkpoint",
			OrderField::UpdatedAt => "updated_at",
		}
	}
}
