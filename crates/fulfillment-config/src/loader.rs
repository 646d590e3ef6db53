//! Loader for modular configuration files.
//!
//! A file may pull in other files with `include`, given as one path or a list.
//! Included files may include further files. Every top-level section must come
//! from exactly one file so that merging never silently overrides.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Configuration loader that handles multi-file configurations with includes.
pub struct ConfigLoader {
	/// Directory relative includes are resolved against
	base_path: PathBuf,
	/// Canonical paths already read
	visited: HashSet<PathBuf>,
	/// File each top-level section was taken from
	origins: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			visited: HashSet::new(),
			origins: HashMap::new(),
		}
	}

	/// Loads a configuration file and all its includes, then validates the result.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let config_path = self.locate(config_path.as_ref())?;

		let mut merged = toml::Table::new();
		self.merge_file(&config_path, &mut merged).await?;

		toml::to_string(&merged)
			.map_err(|e| ConfigError::Parse(format!("Failed to render merged config: {}", e)))?
			.parse()
	}

	/// Merges the sections of `path` into `merged`, then its includes depth first.
	async fn merge_file(
		&mut self,
		path: &Path,
		merged: &mut toml::Table,
	) -> Result<(), ConfigError> {
		let mut table = self.read_table(path).await?;
		let includes = match table.remove("include") {
			Some(value) => include_paths(value)?,
			None => Vec::new(),
		};

		for (section, value) in table {
			if let Some(first) = self.origins.get(&section) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}",
					section,
					first.display(),
					path.display()
				)));
			}
			self.origins.insert(section.clone(), path.to_path_buf());
			merged.insert(section, value);
		}

		for include in includes {
			let include = self.locate(&include)?;
			Box::pin(self.merge_file(&include, merged)).await?;
		}

		Ok(())
	}

	/// Reads a file once, substitutes environment variables and parses it.
	async fn read_table(&mut self, path: &Path) -> Result<toml::Table, ConfigError> {
		let canonical = path.canonicalize()?;
		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include: {} was already loaded",
				canonical.display()
			)));
		}

		let raw = tokio::fs::read_to_string(&canonical).await?;
		Ok(toml::from_str(&resolve_env_vars(&raw)?)?)
	}

	fn locate(&self, path: &Path) -> Result<PathBuf, ConfigError> {
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if resolved.is_file() {
			Ok(resolved)
		} else {
			Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)))
		}
	}
}

/// Reads `include` as a single path or an array of paths.
fn include_paths(value: toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match value {
		toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
		toml::Value::Array(items) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(ConfigError::Validation(
					"Include array must contain only strings".into(),
				)),
			})
			.collect(),
		_ => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}
