use thiserror::Error;

/// The error type for every fallible container operation.
///
/// All failures are programming or composition mistakes; none are retried.
#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown service: `{service}` is not bound in this scope or any ancestor")]
  UnknownService { service: &'static str },

  #[error("service not found: `{service}` has not been instantiated")]
  ServiceNotFound { service: &'static str },

  #[error("`{constructor}` depends on `{dependency}`, which is not bound")]
  MissingRequiredDependency {
    constructor: &'static str,
    dependency: &'static str,
  },

  #[error("cyclic dependency between services: {path}")]
  CyclicDependency { path: String },

  #[error("recursive instantiation of service `{service}`")]
  RecursiveInstantiation { service: &'static str },

  #[error("service `{service}` is already bound to a live instance in this scope")]
  DuplicateRegistration { service: &'static str },

  #[error("cannot promote `{service}`: its recipe was replaced or already built")]
  IllegalPromotion { service: &'static str },

  #[error("`{constructor}` did not declare a dependency on `{dependency}`")]
  UndeclaredDependency {
    constructor: &'static str,
    dependency: &'static str,
  },

  #[error("invalid argument {position} for `{constructor}`: {reason}")]
  InvalidArgument {
    constructor: &'static str,
    position: usize,
    reason: String,
  },

  #[error("service `{service}` is not of type `{expected}`")]
  TypeMismatch {
    service: &'static str,
    expected: &'static str,
  },

  #[error("the scope that owns deferred service `{service}` has been dropped")]
  ScopeDropped { service: &'static str },

  #[error("constructor `{constructor}` failed: {source}")]
  Construction {
    constructor: &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("failed to parse container configuration: {0}")]
  Config(String),
}

impl Error {
  /// Wraps an error raised inside a constructor body.
  pub fn construction<E>(constructor: &'static str, source: E) -> Self
  where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
  {
    Error::Construction {
      constructor,
      source: source.into(),
    }
  }
}

/// A specialized `Result` type for `weft_ioc` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
