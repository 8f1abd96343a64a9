//! Core, non-public plumbing shared by the container and its handles.

use crate::error::{Error, Result};
use crate::token::Key;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

/// A live service, type-erased. The payload is always an `Arc<T>`.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Instance {
  Arc::new(value)
}

pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(
  instance: &Instance,
  service: &'static str,
) -> Result<Arc<T>> {
  instance
    .downcast_ref::<Arc<T>>()
    .cloned()
    .ok_or(Error::TypeMismatch {
      service,
      expected: std::any::type_name::<T>(),
    })
}

thread_local! {
  // Slots (owning registry, token) whose constructor is running on this
  // thread. One thread is one logical call chain.
  static ACTIVE: RefCell<HashSet<(u64, Key)>> = RefCell::new(HashSet::new());
}

/// Marks a slot as under construction for as long as it lives.
pub(crate) struct ActiveConstruction {
  slot: (u64, Key),
}

impl ActiveConstruction {
  pub(crate) fn enter(registry: u64, key: Key) -> Result<Self> {
    let slot = (registry, key);
    let inserted = ACTIVE.with(|active| active.borrow_mut().insert(slot));
    if !inserted {
      return Err(Error::RecursiveInstantiation {
        service: key.label(),
      });
    }
    Ok(Self { slot })
  }

  pub(crate) fn ensure_inactive(registry: u64, key: Key) -> Result<()> {
    let active = ACTIVE.with(|active| active.borrow().contains(&(registry, key)));
    if active {
      return Err(Error::RecursiveInstantiation {
        service: key.label(),
      });
    }
    Ok(())
  }
}

impl Drop for ActiveConstruction {
  fn drop(&mut self) {
    ACTIVE.with(|active| {
      active.borrow_mut().remove(&self.slot);
    });
  }
}
