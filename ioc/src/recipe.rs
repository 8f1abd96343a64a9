//! Deferred construction records and the bindings a scope can hold.

use crate::constructor::{Arg, Constructor, RawConstructor};
use crate::core::{erase, Instance};
use crate::deferred::{Deferred, DeferredSeed};
use crate::registry::Entry;
use crate::token::{Key, Token};
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub(crate) type StandInFn = dyn Fn(DeferredSeed) -> Instance + Send + Sync;

/// The untyped form stored in a registry.
#[derive(Clone)]
pub(crate) struct RawRecipe {
  pub(crate) ctor: Arc<RawConstructor>,
  pub(crate) fixed: Arc<[Arg]>,
  pub(crate) stand_in: Option<Arc<StandInFn>>,
}

impl RawRecipe {
  pub(crate) fn is_delayed(&self) -> bool {
    self.stand_in.is_some()
  }

  /// Identity, not structure: two registrations of one constructor differ.
  pub(crate) fn same_as(&self, other: &RawRecipe) -> bool {
    Arc::ptr_eq(&self.ctor, &other.ctor) && Arc::ptr_eq(&self.fixed, &other.fixed)
  }
}

/// How to build the service behind a token: a constructor, fixed leading
/// arguments, and whether construction may be delayed until first use.
pub struct Recipe<T: ?Sized> {
  ctor: Arc<RawConstructor>,
  fixed: Vec<Arg>,
  stand_in: Option<Arc<StandInFn>>,
  _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Recipe<T> {
  pub fn new(ctor: Constructor<T>) -> Self {
    Self {
      ctor: ctor.raw,
      fixed: Vec::new(),
      stand_in: None,
      _marker: PhantomData,
    }
  }

  /// A delayed recipe whose stand-in is exposed through `facade`.
  ///
  /// The facade receives the [`Deferred`] handle for the real service and
  /// returns the shape callers of the token expect; typically the caller
  /// implements its interface for `Deferred<C>` by delegation.
  pub fn delayed<C, F>(ctor: Constructor<C>, facade: F) -> Self
  where
    C: ?Sized + Send + Sync + 'static,
    F: Fn(Deferred<C>) -> Arc<T> + Send + Sync + 'static,
  {
    Self {
      ctor: ctor.raw,
      fixed: Vec::new(),
      stand_in: Some(Arc::new(move |seed| erase(facade(Deferred::new(seed))))),
      _marker: PhantomData,
    }
  }

  /// Appends a fixed argument, passed ahead of the dependencies.
  pub fn with_arg<V: Any + Send + Sync>(mut self, value: V) -> Self {
    self.fixed.push(Arg::new(value));
    self
  }

  pub fn is_delayed(&self) -> bool {
    self.stand_in.is_some()
  }

  pub fn constructor_name(&self) -> &'static str {
    self.ctor.name
  }

  pub(crate) fn into_raw(self) -> RawRecipe {
    RawRecipe {
      ctor: self.ctor,
      fixed: self.fixed.into(),
      stand_in: self.stand_in,
    }
  }
}

impl<C: ?Sized + Send + Sync + 'static> Recipe<Deferred<C>> {
  /// A delayed recipe whose token hands out the [`Deferred`] handle itself.
  pub fn deferred(ctor: Constructor<C>) -> Self {
    Recipe::delayed(ctor, Arc::new)
  }
}

impl<T: ?Sized + Send + Sync + 'static> From<Constructor<T>> for Recipe<T> {
  fn from(ctor: Constructor<T>) -> Self {
    Recipe::new(ctor)
  }
}

impl<T: ?Sized> fmt::Debug for Recipe<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Recipe")
      .field("constructor", &self.ctor.name)
      .field("fixed_args", &self.fixed.len())
      .field("delayed", &self.stand_in.is_some())
      .finish()
  }
}

/// What a token can be bound to.
pub enum Binding<T: ?Sized> {
  Instance(Arc<T>),
  Recipe(Recipe<T>),
}

impl<T: ?Sized + Send + Sync + 'static> Binding<T> {
  pub(crate) fn into_entry(self) -> Entry {
    match self {
      Binding::Instance(instance) => Entry::Instance(erase(instance)),
      Binding::Recipe(recipe) => Entry::Recipe(recipe.into_raw()),
    }
  }
}

impl<T: ?Sized> From<Arc<T>> for Binding<T> {
  fn from(instance: Arc<T>) -> Self {
    Binding::Instance(instance)
  }
}

impl<T: ?Sized> From<Recipe<T>> for Binding<T> {
  fn from(recipe: Recipe<T>) -> Self {
    Binding::Recipe(recipe)
  }
}

impl<T: ?Sized + Send + Sync + 'static> From<Constructor<T>> for Binding<T> {
  fn from(ctor: Constructor<T>) -> Self {
    Binding::Recipe(Recipe::new(ctor))
  }
}

/// An ordered set of bindings, used to seed a root container or to override
/// tokens in a child scope.
///
/// Adding a token twice keeps the later binding.
#[derive(Default)]
pub struct ServiceCollection {
  entries: IndexMap<Key, Entry>,
}

impl ServiceCollection {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add<T>(&mut self, token: &Token<T>, binding: impl Into<Binding<T>>) -> &mut Self
  where
    T: ?Sized + Send + Sync + 'static,
  {
    self.entries.insert(token.key(), binding.into().into_entry());
    self
  }

  pub fn with<T>(mut self, token: &Token<T>, binding: impl Into<Binding<T>>) -> Self
  where
    T: ?Sized + Send + Sync + 'static,
  {
    self.add(token, binding);
    self
  }

  pub fn contains<T: ?Sized>(&self, token: &Token<T>) -> bool {
    self.entries.contains_key(&token.key())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub(crate) fn extend(&mut self, other: ServiceCollection) {
    self.entries.extend(other.entries);
  }

  pub(crate) fn into_entries(self) -> impl Iterator<Item = (Key, Entry)> {
    self.entries.into_iter()
  }
}

impl fmt::Debug for ServiceCollection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list()
      .entries(self.entries.iter().map(|(key, entry)| (key.label(), entry.kind())))
      .finish()
  }
}
