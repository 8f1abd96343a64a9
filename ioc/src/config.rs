//! Container-wide settings.

#[cfg(feature = "serde")]
use serde::Deserialize;

/// What `register` does when the token is already bound locally to a recipe.
///
/// Overwriting a live instance is always rejected regardless of this policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OverwritePolicy {
  /// Replace the recipe silently.
  Allow,
  /// Replace the recipe and emit a `tracing` warning.
  #[default]
  Warn,
  /// Fail with `Error::DuplicateRegistration`.
  Reject,
}

/// Settings shared by a root container and every scope derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ContainerConfig {
  pub recipe_overwrite: OverwritePolicy,
  /// Constructors running longer than this are reported at `warn` level.
  pub slow_construction_ms: Option<u64>,
}

impl ContainerConfig {
  pub fn recipe_overwrite(mut self, policy: OverwritePolicy) -> Self {
    self.recipe_overwrite = policy;
    self
  }

  pub fn slow_construction_ms(mut self, millis: u64) -> Self {
    self.slow_construction_ms = Some(millis);
    self
  }

  /// Parses a YAML configuration document. Missing fields keep their
  /// defaults; unknown fields are rejected.
  #[cfg(feature = "serde")]
  pub fn from_yaml_str(source: &str) -> crate::Result<Self> {
    serde_yaml::from_str(source).map_err(|e| crate::Error::Config(e.to_string()))
  }
}
