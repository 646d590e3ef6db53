//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every collaborator implementation (storage backend, workflow engine client,
/// event sink) exposes a `Registry` type declaring the name it is configured
/// under and the factory that builds it.
pub trait ImplementationRegistry {
	/// Name used in configuration files, e.g. `memory` for
	/// `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// Factory function type for this kind of collaborator.
	type Factory;

	/// Returns the factory that builds this implementation from its config.
	fn factory() -> Self::Factory;
}
