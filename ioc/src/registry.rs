//! Per-scope storage of bindings, chained to an optional parent.

use crate::core::Instance;
use crate::error::{Error, Result};
use crate::recipe::RawRecipe;
use crate::token::Key;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub(crate) enum Entry {
  Instance(Instance),
  Recipe(RawRecipe),
}

impl Entry {
  pub(crate) fn kind(&self) -> &'static str {
    match self {
      Entry::Instance(_) => "instance",
      Entry::Recipe(recipe) if recipe.is_delayed() => "delayed recipe",
      Entry::Recipe(_) => "recipe",
    }
  }
}

/// One level of the scope chain. Lookups that miss locally continue in the
/// parent; writes only ever touch the local map.
pub(crate) struct Registry {
  id: u64,
  entries: DashMap<Key, Entry>,
  parent: Option<Arc<Registry>>,
}

impl Registry {
  pub(crate) fn new(parent: Option<Arc<Registry>>) -> Self {
    Self {
      id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
      entries: DashMap::new(),
      parent,
    }
  }

  pub(crate) fn id(&self) -> u64 {
    self.id
  }

  pub(crate) fn parent(&self) -> Option<&Arc<Registry>> {
    self.parent.as_ref()
  }

  /// Local lookup only.
  pub(crate) fn get(&self, key: Key) -> Option<Entry> {
    self.entries.get(&key).map(|entry| entry.value().clone())
  }

  /// Walks the chain upward and returns the entry with the level that owns it.
  pub(crate) fn get_or_delegate(self: &Arc<Self>, key: Key) -> Option<(Entry, Arc<Registry>)> {
    let mut level = Arc::clone(self);
    loop {
      if let Some(entry) = level.get(key) {
        return Some((entry, level));
      }
      level = level.parent.clone()?;
    }
  }

  pub(crate) fn is_bound(&self, key: Key) -> bool {
    let mut level = self;
    loop {
      if level.entries.contains_key(&key) {
        return true;
      }
      match &level.parent {
        Some(parent) => level = parent,
        None => return false,
      }
    }
  }

  /// Unconditional local write.
  pub(crate) fn set(&self, key: Key, entry: Entry) -> Option<Entry> {
    self.entries.insert(key, entry)
  }

  /// Local write that refuses to replace a live instance. `on_recipe` runs
  /// when a recipe is about to be replaced and may veto it.
  pub(crate) fn bind(
    &self,
    key: Key,
    entry: Entry,
    on_recipe: impl FnOnce() -> Result<()>,
  ) -> Result<()> {
    match self.entries.entry(key) {
      MapEntry::Occupied(mut occupied) => {
        if matches!(occupied.get(), Entry::Instance(_)) {
          return Err(Error::DuplicateRegistration {
            service: key.label(),
          });
        }
        on_recipe()?;
        occupied.insert(entry);
        Ok(())
      }
      MapEntry::Vacant(vacant) => {
        vacant.insert(entry);
        Ok(())
      }
    }
  }

  /// Replaces the recipe for `key` with the instance built from it.
  ///
  /// The slot must still hold `built_from`. If it was promoted meanwhile, or
  /// rebound to another recipe while `built_from` ran, the write is rejected
  /// and the current binding stays.
  pub(crate) fn promote(
    &self,
    key: Key,
    built_from: &RawRecipe,
    instance: Instance,
  ) -> Result<()> {
    if let Some(mut slot) = self.entries.get_mut(&key) {
      if let Entry::Recipe(current) = slot.value() {
        if current.same_as(built_from) {
          *slot.value_mut() = Entry::Instance(instance);
          return Ok(());
        }
      }
    }
    Err(Error::IllegalPromotion {
      service: key.label(),
    })
  }

  pub(crate) fn len(&self) -> usize {
    self.entries.len()
  }
}
