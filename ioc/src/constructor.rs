//! Constructors, their declared dependencies, and the arguments they receive.

use crate::core::{downcast, erase, Instance};
use crate::error::{Error, Result};
use crate::token::{Key, Token};
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_FN_CTOR_ID: AtomicU64 = AtomicU64::new(1);

/// The identity under which a constructor's dependency declarations are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtorId {
  /// An [`Injectable`] type.
  Type(TypeId),
  /// A closure constructor created with [`Constructor::from_fn`].
  Fn(u64),
}

/// One declared dependency of a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
  key: Key,
  position: usize,
  optional: bool,
}

impl Dependency {
  pub fn key(&self) -> Key {
    self.key
  }

  /// Zero-based declaration order.
  pub fn position(&self) -> usize {
    self.position
  }

  pub fn is_optional(&self) -> bool {
    self.optional
  }
}

/// Collects the dependencies of a constructor, in order.
#[derive(Debug, Default)]
pub struct Declarations {
  deps: Vec<Dependency>,
}

impl Declarations {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Declares a dependency that must be bound somewhere in the scope chain.
  pub fn require<T: ?Sized>(&mut self, token: &Token<T>) -> &mut Self {
    self.push(token.key(), false)
  }

  /// Declares a dependency that resolves to `None` when unbound.
  pub fn optional<T: ?Sized>(&mut self, token: &Token<T>) -> &mut Self {
    self.push(token.key(), true)
  }

  fn push(&mut self, key: Key, optional: bool) -> &mut Self {
    // Declaring the same token twice keeps the first declaration.
    if !self.deps.iter().any(|d| d.key == key) {
      let position = self.deps.len();
      self.deps.push(Dependency {
        key,
        position,
        optional,
      });
    }
    self
  }

  pub(crate) fn into_inner(self) -> Vec<Dependency> {
    self.deps
  }
}

/// A type the container knows how to build.
///
/// `declare` is read once per type and cached by the dependency lookup.
///
/// ```
/// use std::sync::Arc;
/// use weft_ioc::{token, Args, Container, Constructor, Declarations, Injectable, Recipe, Result};
///
/// struct Settings { verbose: bool }
/// struct Printer { settings: Arc<Settings> }
///
/// token! {
///   static SETTINGS: Settings = "Settings";
///   static PRINTER: Printer = "Printer";
/// }
///
/// impl Injectable for Printer {
///   fn declare(deps: &mut Declarations) {
///     deps.require(&SETTINGS);
///   }
///
///   fn construct(args: &Args<'_>) -> Result<Self> {
///     Ok(Printer { settings: args.get(&SETTINGS)? })
///   }
/// }
///
/// let container = Container::new();
/// container.register(&SETTINGS, Arc::new(Settings { verbose: true })).unwrap();
/// container.register(&PRINTER, Recipe::new(Constructor::<Printer>::of())).unwrap();
///
/// assert!(container.get_or_construct(&PRINTER).unwrap().settings.verbose);
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
  /// The name reported in errors and logs.
  fn name() -> &'static str {
    std::any::type_name::<Self>()
  }

  fn declare(deps: &mut Declarations) {
    let _ = deps;
  }

  fn construct(args: &Args<'_>) -> Result<Self>;
}

pub(crate) type BuildFn = dyn Fn(&Args<'_>) -> Result<Instance> + Send + Sync;

fn boxed<F>(build: F) -> Box<BuildFn>
where
  F: Fn(&Args<'_>) -> Result<Instance> + Send + Sync + 'static,
{
  Box::new(build)
}

/// Where a constructor's dependencies come from.
pub(crate) enum Declared {
  /// An injectable type; read once and cached in the lookup table.
  Lazily(fn(&mut Declarations)),
  /// A closure constructor; declared at creation and owned by it.
  Attached(Arc<[Dependency]>),
}

pub(crate) struct RawConstructor {
  pub(crate) id: CtorId,
  pub(crate) name: &'static str,
  pub(crate) declared: Declared,
  pub(crate) build: Box<BuildFn>,
}

/// A named build function producing `Arc<T>`.
pub struct Constructor<T: ?Sized> {
  pub(crate) raw: Arc<RawConstructor>,
  _marker: PhantomData<fn() -> Arc<T>>,
}

impl<C: Injectable> Constructor<C> {
  /// The constructor of an injectable type.
  pub fn of() -> Self {
    Self::from_raw(RawConstructor {
      id: CtorId::Type(TypeId::of::<C>()),
      name: C::name(),
      declared: Declared::Lazily(C::declare),
      build: boxed(|args| Ok(erase(Arc::new(C::construct(args)?)))),
    })
  }
}

impl<T: ?Sized + Send + Sync + 'static> Constructor<T> {
  /// A closure constructor. `declare` runs once, here, and the result lives
  /// as long as the constructor.
  pub fn from_fn<D, F>(name: &'static str, declare: D, build: F) -> Self
  where
    D: FnOnce(&mut Declarations),
    F: Fn(&Args<'_>) -> Result<Arc<T>> + Send + Sync + 'static,
  {
    let id = CtorId::Fn(NEXT_FN_CTOR_ID.fetch_add(1, Ordering::Relaxed));
    let mut decl = Declarations::new();
    declare(&mut decl);
    Self::from_raw(RawConstructor {
      id,
      name,
      declared: Declared::Attached(decl.into_inner().into()),
      build: boxed(move |args| Ok(erase(build(args)?))),
    })
  }

  /// Exposes an injectable type through another shape, usually a trait object.
  ///
  /// The dependencies are those declared by `C`.
  pub fn bind<C, F>(coerce: F) -> Self
  where
    C: Injectable,
    F: Fn(Arc<C>) -> Arc<T> + Send + Sync + 'static,
  {
    Self::from_raw(RawConstructor {
      id: CtorId::Type(TypeId::of::<C>()),
      name: C::name(),
      declared: Declared::Lazily(C::declare),
      build: boxed(move |args| Ok(erase(coerce(Arc::new(C::construct(args)?))))),
    })
  }
}

impl<T: ?Sized> Constructor<T> {
  fn from_raw(raw: RawConstructor) -> Self {
    Self {
      raw: Arc::new(raw),
      _marker: PhantomData,
    }
  }

  pub fn id(&self) -> CtorId {
    self.raw.id
  }

  pub fn name(&self) -> &'static str {
    self.raw.name
  }
}

impl<T: ?Sized> Clone for Constructor<T> {
  fn clone(&self) -> Self {
    Self {
      raw: Arc::clone(&self.raw),
      _marker: PhantomData,
    }
  }
}

impl<T: ?Sized> fmt::Debug for Constructor<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Constructor")
      .field("name", &self.raw.name)
      .field("id", &self.raw.id)
      .finish_non_exhaustive()
  }
}

/// A fixed, non-service argument carried by a recipe.
#[derive(Clone)]
pub struct Arg(Arc<dyn Any + Send + Sync>);

impl Arg {
  pub fn new<V: Any + Send + Sync>(value: V) -> Self {
    Arg(Arc::new(value))
  }
}

impl fmt::Debug for Arg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Arg(..)")
  }
}

/// What a constructor receives: the fixed arguments followed by its resolved
/// dependencies.
pub struct Args<'a> {
  constructor: &'static str,
  fixed: &'a [Arg],
  deps: &'a [Dependency],
  resolved: &'a [Option<Instance>],
}

impl<'a> Args<'a> {
  pub(crate) fn new(
    constructor: &'static str,
    fixed: &'a [Arg],
    deps: &'a [Dependency],
    resolved: &'a [Option<Instance>],
  ) -> Self {
    Self {
      constructor,
      fixed,
      deps,
      resolved,
    }
  }

  pub fn constructor(&self) -> &'static str {
    self.constructor
  }

  pub fn fixed_len(&self) -> usize {
    self.fixed.len()
  }

  /// Borrows the fixed argument at `position`.
  pub fn fixed<V: Any>(&self, position: usize) -> Result<&'a V> {
    let arg = self.fixed.get(position).ok_or_else(|| Error::InvalidArgument {
      constructor: self.constructor,
      position,
      reason: format!("only {} fixed arguments were supplied", self.fixed.len()),
    })?;
    arg.0.downcast_ref::<V>().ok_or_else(|| Error::InvalidArgument {
      constructor: self.constructor,
      position,
      reason: format!("expected a `{}`", std::any::type_name::<V>()),
    })
  }

  /// A required dependency.
  pub fn get<T>(&self, token: &Token<T>) -> Result<Arc<T>>
  where
    T: ?Sized + Send + Sync + 'static,
  {
    self
      .optional(token)?
      .ok_or(Error::MissingRequiredDependency {
        constructor: self.constructor,
        dependency: token.label(),
      })
  }

  /// A dependency that may be absent.
  pub fn optional<T>(&self, token: &Token<T>) -> Result<Option<Arc<T>>>
  where
    T: ?Sized + Send + Sync + 'static,
  {
    let index = self
      .deps
      .iter()
      .position(|d| d.key == token.key())
      .ok_or(Error::UndeclaredDependency {
        constructor: self.constructor,
        dependency: token.label(),
      })?;
    match self.resolved.get(index) {
      Some(Some(instance)) => downcast::<T>(instance, token.label()).map(Some),
      _ => Ok(None),
    }
  }
}
