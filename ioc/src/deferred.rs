//! Handles for services whose construction is delayed until first use.

use crate::constructor::{Arg, RawConstructor};
use crate::container::WeakScope;
use crate::core::{downcast, ActiveConstruction};
use crate::error::{Error, Result};
use crate::token::Key;
use once_cell::sync::OnceCell;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// Everything a stand-in needs to build the real service later.
pub(crate) struct DeferredSeed {
  pub(crate) key: Key,
  pub(crate) scope: WeakScope,
  pub(crate) ctor: Arc<RawConstructor>,
  pub(crate) fixed: Arc<[Arg]>,
}

struct DeferredInner<C: ?Sized> {
  seed: DeferredSeed,
  cell: OnceCell<Arc<C>>,
}

/// A stand-in for a delayed service.
///
/// The real service is built on first access, through the scope that owns
/// the stand-in, and cached. Every later access, from any clone of the handle,
/// reaches the same instance. Concurrent first accesses build it once.
///
/// The handle holds its scope weakly; once the scope is dropped, an
/// unconstructed handle fails with [`Error::ScopeDropped`].
pub struct Deferred<C: ?Sized> {
  inner: Arc<DeferredInner<C>>,
}

impl<C: ?Sized + Send + Sync + 'static> Deferred<C> {
  pub(crate) fn new(seed: DeferredSeed) -> Self {
    Self {
      inner: Arc::new(DeferredInner {
        seed,
        cell: OnceCell::new(),
      }),
    }
  }

  pub fn service(&self) -> &'static str {
    self.inner.seed.key.label()
  }

  pub fn is_constructed(&self) -> bool {
    self.inner.cell.get().is_some()
  }

  /// Builds the service if needed and returns it.
  pub fn try_get(&self) -> Result<&Arc<C>> {
    if let Some(service) = self.inner.cell.get() {
      return Ok(service);
    }

    let seed = &self.inner.seed;
    let scope = seed.scope.upgrade().ok_or(Error::ScopeDropped {
      service: seed.key.label(),
    })?;
    // Construction lock before the cell, same order as the container.
    let _lock = scope.lock_construction();
    let _active = ActiveConstruction::enter(seed.scope.registry_id(), seed.key)?;

    self.inner.cell.get_or_try_init(|| {
      debug!(service = seed.key.label(), "constructing deferred service on first use");
      let instance = scope.instantiate(&seed.ctor, &seed.fixed)?;
      downcast::<C>(&instance, seed.key.label())
    })
  }

  /// Like [`try_get`](Self::try_get), returning an owned `Arc`.
  pub fn instance(&self) -> Result<Arc<C>> {
    self.try_get().map(Arc::clone)
  }
}

impl<C: ?Sized + Send + Sync + 'static> Deref for Deferred<C> {
  type Target = C;

  /// # Panics
  ///
  /// Panics if the delayed construction fails. Use [`Deferred::try_get`] to
  /// handle the error instead.
  fn deref(&self) -> &C {
    match self.try_get() {
      Ok(service) => &**service,
      Err(err) => panic!(
        "Failed to construct deferred service `{}`: {}",
        self.service(),
        err
      ),
    }
  }
}

impl<C: ?Sized> Clone for Deferred<C> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<C: ?Sized> fmt::Debug for Deferred<C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Deferred")
      .field("service", &self.inner.seed.key.label())
      .field("constructed", &self.inner.cell.get().is_some())
      .finish()
  }
}
