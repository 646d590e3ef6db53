//! String formatting utilities.

/// Shortens an id for log output.
///
/// Shows only the first 8 characters followed by ".." for longer ids. Cuts on
/// a character boundary so non-ASCII ids never panic.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("O1"), "O1");
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(truncate_id("order-abc-123"), "order-ab..");
		assert_eq!(truncate_id("pedidoñañaña"), "pedidoña..");
	}
}
