//! Field-level updates applied to JSON documents.

use crate::StorageError;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
enum FieldOp {
	Set(String, Value),
	AddToSet(String, Value),
	Remove(String),
}

/// A set of field operations applied to one document as a unit.
///
/// Conditions are checked against the document as read; if any fails, no
/// operation is applied. Paths in conditions may be dotted
/// (`pending_checkpoint.token`), field operations act on top-level fields.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
	ops: Vec<FieldOp>,
	conditions: Vec<(String, Value)>,
	must_exist: bool,
}

impl DocumentUpdate {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets a top-level field, replacing any previous value.
	pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
		self.ops.push(FieldOp::Set(field.into(), value));
		self
	}

	/// Appends to the array under `field` unless an equal element exists.
	pub fn add_to_set(mut self, field: impl Into<String>, value: Value) -> Self {
		self.ops.push(FieldOp::AddToSet(field.into(), value));
		self
	}

	/// Removes a top-level field. Removing an absent field is a no-op.
	pub fn remove(mut self, field: impl Into<String>) -> Self {
		self.ops.push(FieldOp::Remove(field.into()));
		self
	}

	/// Only applies when the value at `path` equals `expected`.
	pub fn when_equals(mut self, path: impl Into<String>, expected: Value) -> Self {
		self.conditions.push((path.into(), expected));
		self.must_exist = true;
		self
	}

	/// Fails with [`StorageError::NotFound`] instead of creating the document.
	pub fn require_existing(mut self) -> Self {
		self.must_exist = true;
		self
	}

	/// Applies the update to the current document, or to an empty one when
	/// the record does not exist yet.
	pub(crate) fn apply_to(
		&self,
		current: Option<Map<String, Value>>,
	) -> Result<Map<String, Value>, StorageError> {
		let mut document = match current {
			Some(document) => document,
			None if self.must_exist => return Err(StorageError::NotFound),
			None => Map::new(),
		};

		for (path, expected) in &self.conditions {
			let actual = lookup(&document, path);
			if actual != Some(expected) {
				return Err(StorageError::ConditionFailed(format!(
					"'{}' is {}, expected {}",
					path,
					actual.map_or_else(|| "absent".to_string(), Value::to_string),
					expected
				)));
			}
		}

		for op in &self.ops {
			match op {
				FieldOp::Set(field, value) => {
					document.insert(field.clone(), value.clone());
				},
				FieldOp::AddToSet(field, value) => {
					let entry = document
						.entry(field.clone())
						.or_insert_with(|| Value::Array(Vec::new()));
					match entry {
						Value::Array(items) => {
							if !items.contains(value) {
								items.push(value.clone());
							}
						},
						Value::Null => *entry = Value::Array(vec![value.clone()]),
						other => {
							return Err(StorageError::Serialization(format!(
								"Field '{}' holds {} and cannot be used as a set",
								field, other
							)))
						},
					}
				},
				FieldOp::Remove(field) => {
					document.remove(field);
				},
			}
		}

		Ok(document)
	}
}

fn lookup<'a>(document: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
	let mut segments = path.split('.');
	let mut current = document.get(segments.next()?)?;
	for segment in segments {
		current = current.as_object()?.get(segment)?;
	}
	Some(current)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn doc(value: Value) -> Option<Map<String, Value>> {
		match value {
			Value::Object(map) => Some(map),
			_ => None,
		}
	}

	#[test]
	fn test_conditions_on_nested_paths() {
		let current = doc(json!({
			"order_id": "O1",
			"pending_checkpoint": { "token": "tok-1", "step_name": "ASSIGN_COOK" }
		}));

		let update = DocumentUpdate::new()
			.when_equals("pending_checkpoint.token", json!("tok-1"))
			.remove("pending_checkpoint");
		let result = update.apply_to(current.clone()).unwrap();
		assert!(!result.contains_key("pending_checkpoint"));

		let stale = DocumentUpdate::new()
			.when_equals("pending_checkpoint.token", json!("tok-0"))
			.remove("pending_checkpoint");
		assert!(matches!(
			stale.apply_to(current),
			Err(StorageError::ConditionFailed(_))
		));
	}

	#[test]
	fn test_condition_on_absent_field_fails() {
		let update = DocumentUpdate::new().when_equals("pending_checkpoint.token", json!("tok-1"));
		let err = update.apply_to(doc(json!({ "order_id": "O1" }))).unwrap_err();
		assert!(err.to_string().contains("absent"));
	}

	#[test]
	fn test_missing_document() {
		assert!(matches!(
			DocumentUpdate::new().require_existing().apply_to(None),
			Err(StorageError::NotFound)
		));

		let created = DocumentUpdate::new()
			.set("order_id", json!("O1"))
			.add_to_set("history", json!("INIT"))
			.apply_to(None)
			.unwrap();
		assert_eq!(Value::Object(created), json!({ "order_id": "O1", "history": ["INIT"] }));
	}

	#[test]
	fn test_add_to_set_rejects_scalar_field() {
		let update = DocumentUpdate::new().add_to_set("history", json!("INIT"));
		assert!(update.apply_to(doc(json!({ "history": 3 }))).is_err());
	}
}
