//! Fulfillment actions invoked by the workflow engine.
//!
//! Each action maps to exactly one status and one event type. The mapping is
//! closed: any other action name is rejected with [`UnknownActionError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::OrderStatus;

/// Error returned when an action name is outside the fixed mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown action: {0}")]
pub struct UnknownActionError(pub String);

/// Lifecycle points at which the process graph reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentAction {
	Init,
	Cooking,
	Packing,
	OnDelivery,
	Delivered,
}

impl FulfillmentAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			FulfillmentAction::Init => "INIT",
			FulfillmentAction::Cooking => "COOKING",
			FulfillmentAction::Packing => "PACKING",
			FulfillmentAction::OnDelivery => "ON_DELIVERY",
			FulfillmentAction::Delivered => "DELIVERED",
		}
	}

	/// Status the order takes when this action is applied.
	pub fn status(&self) -> OrderStatus {
		match self {
			FulfillmentAction::Init => OrderStatus::Pending,
			FulfillmentAction::Cooking => OrderStatus::Cooking,
			FulfillmentAction::Packing => OrderStatus::Packing,
			FulfillmentAction::OnDelivery => OrderStatus::OnDelivery,
			FulfillmentAction::Delivered => OrderStatus::Delivered,
		}
	}

	/// Detail type of the domain event published for this action.
	pub fn event_type(&self) -> &'static str {
		match self {
			FulfillmentAction::Init => "PedidoInicializado",
			FulfillmentAction::Cooking => "CocinaIniciada",
			FulfillmentAction::Packing => "EmpaqueIniciado",
			FulfillmentAction::OnDelivery => "RepartoIniciado",
			FulfillmentAction::Delivered => "PedidoEntregado",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Init,
			Self::Cooking,
			Self::Packing,
			Self::OnDelivery,
			Self::Delivered,
		]
		.into_iter()
	}
}

impl FromStr for FulfillmentAction {
	type Err = UnknownActionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"INIT" => Ok(Self::Init),
			"COOKING" => Ok(Self::Cooking),
			"PACKING" => Ok(Self::Packing),
			"ON_DELIVERY" => Ok(Self::OnDelivery),
			"DELIVERED" => Ok(Self::Delivered),
			other => Err(UnknownActionError(other.to_string())),
		}
	}
}

impl fmt::Display for FulfillmentAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
