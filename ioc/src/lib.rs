//! # Weft IoC
//!
//! A service-composition container: it wires the subsystems of an
//! application together at startup and on demand.
//!
//! Services are bound to [`Token`]s, either as live instances or as
//! [`Recipe`]s. Asking for a token builds everything it depends on, in
//! dependency order, exactly once per owning scope. Declared dependency
//! cycles are reported as [`Error::CyclicDependency`] and a constructor that
//! re-requests its own token fails with [`Error::RecursiveInstantiation`],
//! rather than overflowing the stack.
//!
//! ## Core Concepts
//!
//! - **Token**: the identity of a capability, with a diagnostic label.
//! - **Constructor**: a build function plus its declared dependencies. Types
//!   implement [`Injectable`]; closures use [`Constructor::from_fn`].
//! - **Recipe**: a constructor with fixed arguments, optionally delayed.
//! - **Container**: one scope of bindings. [`Container::child_scope`] creates
//!   a narrower scope that shares its parent's instances and may shadow
//!   individual tokens.
//! - **Deferred**: the stand-in handed out for delayed recipes.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use weft_ioc::{token, Args, Constructor, Container, Declarations, Injectable, Recipe, Result};
//!
//! struct Logger;
//!
//! struct Config {
//!   logger: Arc<Logger>,
//! }
//!
//! token! {
//!   static LOGGER: Logger = "Logger";
//!   static CONFIG: Config = "Config";
//! }
//!
//! impl Injectable for Logger {
//!   fn construct(_: &Args<'_>) -> Result<Self> {
//!     Ok(Logger)
//!   }
//! }
//!
//! impl Injectable for Config {
//!   fn declare(deps: &mut Declarations) {
//!     deps.require(&LOGGER);
//!   }
//!
//!   fn construct(args: &Args<'_>) -> Result<Self> {
//!     Ok(Config { logger: args.get(&LOGGER)? })
//!   }
//! }
//!
//! let container = Container::builder()
//!   .service(&LOGGER, Recipe::new(Constructor::<Logger>::of()))
//!   .service(&CONFIG, Recipe::new(Constructor::<Config>::of()))
//!   .build();
//!
//! let config = container.get_or_construct(&CONFIG)?;
//! let logger = container.get_existing(&LOGGER)?;
//! assert!(Arc::ptr_eq(&config.logger, &logger));
//! # Ok::<(), weft_ioc::Error>(())
//! ```

mod config;
mod constructor;
mod container;
mod core;
mod deferred;
mod error;
mod graph;
pub mod lookup;
mod macros;
mod recipe;
mod registry;
mod token;

pub use config::{ContainerConfig, OverwritePolicy};
pub use constructor::{Arg, Args, Constructor, CtorId, Declarations, Dependency, Injectable};
pub use container::{Container, ContainerBuilder, ServiceAccessor};
pub use deferred::Deferred;
pub use error::{Error, Result};
pub use recipe::{Binding, Recipe, ServiceCollection};
pub use token::{Key, Token};

#[doc(hidden)]
pub mod __private {
  pub use once_cell::sync::Lazy;
}
