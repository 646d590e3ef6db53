//! Human checkpoint kinds.
//!
//! The resolution algorithm is the same for every kind; a kind only fixes the
//! step name the order must be waiting at and the wording of responses.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckpointKind {
	/// A cook takes the order.
	AssignCook,
	/// A courier confirms the order was handed over.
	MarkDelivered,
}

impl CheckpointKind {
	/// Step name the process graph declares for this checkpoint.
	pub fn step_name(&self) -> &'static str {
		match self {
			CheckpointKind::AssignCook => "ASSIGN_COOK",
			CheckpointKind::MarkDelivered => "MARK_DELIVERED",
		}
	}

	/// Message returned to the actor after a successful resolution.
	pub fn completed_message(&self) -> &'static str {
		match self {
			CheckpointKind::AssignCook => "Cook assigned and workflow resumed",
			CheckpointKind::MarkDelivered => "Order marked as delivered, workflow resumed",
		}
	}

	/// Message used when the order is not waiting at this checkpoint.
	pub fn not_waiting_message(&self) -> &'static str {
		match self {
			CheckpointKind::AssignCook => "Order not waiting for cook assignment",
			CheckpointKind::MarkDelivered => "Order not waiting for delivery confirmation",
		}
	}

	pub fn from_step(step: &str) -> Option<Self> {
		match step {
			"ASSIGN_COOK" => Some(Self::AssignCook),
			"MARK_DELIVERED" => Some(Self::MarkDelivered),
			_ => None,
		}
	}
}

impl fmt::Display for CheckpointKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.step_name())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_step_names_round_trip() {
		for kind in [CheckpointKind::AssignCook, CheckpointKind::MarkDelivered] {
			assert_eq!(CheckpointKind::from_step(kind.step_name()), Some(kind));
		}
		assert_eq!(CheckpointKind::from_step("PACK"), None);
	}
}
