//! The main `Container` struct and its associated methods.

use crate::config::{ContainerConfig, OverwritePolicy};
use crate::constructor::{Arg, Args, RawConstructor};
use crate::core::{downcast, ActiveConstruction, Instance};
use crate::deferred::DeferredSeed;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::lookup;
use crate::recipe::{Binding, RawRecipe, Recipe, ServiceCollection};
use crate::registry::{Entry, Registry};
use crate::token::{Key, Token};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, trace, warn};

/// State shared by a root container and every scope derived from it.
struct Shared {
  config: ContainerConfig,
  // Serializes the recipe -> instance path for the whole scope tree. It is
  // re-entrant because constructors may call back into the container.
  construction: ReentrantMutex<()>,
}

/// A node of the per-request graph: one unresolved binding at its owning level.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct Slot {
  registry: u64,
  key: Key,
}

struct PendingNode {
  owner: Arc<Registry>,
  recipe: RawRecipe,
}

/// The service-composition container.
///
/// A `Container` is a cheap handle onto one scope. Cloning it yields another
/// handle to the same scope; [`child_scope`](Container::child_scope) creates a
/// narrower one that delegates to this scope for everything it does not
/// override.
///
/// All operations are thread-safe. Building a recipe is serialized per scope
/// tree: a thread that loses a race for the same token receives the winner's
/// instance.
#[derive(Clone)]
pub struct Container {
  registry: Arc<Registry>,
  shared: Arc<Shared>,
}

impl Default for Container {
  fn default() -> Self {
    Self::new()
  }
}

impl Container {
  /// Creates an empty root container with the default configuration.
  pub fn new() -> Self {
    ContainerBuilder::new().build()
  }

  pub fn builder() -> ContainerBuilder {
    ContainerBuilder::new()
  }

  pub fn config(&self) -> &ContainerConfig {
    &self.shared.config
  }

  pub fn is_root(&self) -> bool {
    self.registry.parent().is_none()
  }

  // --- Registration ---

  /// Binds `token` in this scope.
  ///
  /// Fails with [`Error::DuplicateRegistration`] if this scope already holds
  /// a live instance for the token. Replacing a recipe follows
  /// [`ContainerConfig::recipe_overwrite`]. Ancestors are never touched.
  pub fn register<T>(&self, token: &Token<T>, binding: impl Into<Binding<T>>) -> Result<()>
  where
    T: ?Sized + Send + Sync + 'static,
  {
    let key = token.key();
    let entry = binding.into().into_entry();
    let kind = entry.kind();
    let policy = self.shared.config.recipe_overwrite;

    self.registry.bind(key, entry, || match policy {
      OverwritePolicy::Allow => Ok(()),
      OverwritePolicy::Warn => {
        warn!(service = key.label(), replacement = kind, "replacing an existing recipe");
        Ok(())
      }
      OverwritePolicy::Reject => Err(Error::DuplicateRegistration {
        service: key.label(),
      }),
    })?;

    debug!(service = key.label(), kind, scope = self.registry.id(), "registered service");
    Ok(())
  }

  /// Whether `token` is bound in this scope or any ancestor.
  pub fn is_bound<T: ?Sized>(&self, token: &Token<T>) -> bool {
    self.registry.is_bound(token.key())
  }

  // --- Resolution ---

  /// Returns the instance for `token` if one already exists in the chain.
  /// Never constructs.
  pub fn get_existing<T>(&self, token: &Token<T>) -> Result<Arc<T>>
  where
    T: ?Sized + Send + Sync + 'static,
  {
    match self.registry.get_or_delegate(token.key()) {
      Some((Entry::Instance(instance), _)) => downcast::<T>(&instance, token.label()),
      _ => Err(Error::ServiceNotFound {
        service: token.label(),
      }),
    }
  }

  /// Returns the instance for `token`, building it and everything it needs
  /// that is not built yet.
  pub fn get_or_construct<T>(&self, token: &Token<T>) -> Result<Arc<T>>
  where
    T: ?Sized + Send + Sync + 'static,
  {
    let instance = self.get_or_construct_key(token.key())?;
    downcast::<T>(&instance, token.label())
  }

  /// Builds a fresh, uncached object, resolving its dependencies through
  /// this scope.
  pub fn construct<T>(&self, recipe: impl Into<Recipe<T>>) -> Result<Arc<T>>
  where
    T: ?Sized + Send + Sync + 'static,
  {
    self.construct_with(recipe, Vec::new())
  }

  /// Like [`construct`](Container::construct), with `extra` appended after
  /// the recipe's own fixed arguments.
  pub fn construct_with<T>(
    &self,
    recipe: impl Into<Recipe<T>>,
    extra: impl IntoIterator<Item = Arg>,
  ) -> Result<Arc<T>>
  where
    T: ?Sized + Send + Sync + 'static,
  {
    let recipe = recipe.into().into_raw();
    let name = recipe.ctor.name;
    let mut fixed: Vec<Arg> = recipe.fixed.to_vec();
    fixed.extend(extra);

    let instance = match &recipe.stand_in {
      // A one-off delayed object gets its own identity.
      Some(stand_in) => stand_in(DeferredSeed {
        key: Token::<()>::new(name).key(),
        scope: self.downgrade(),
        ctor: Arc::clone(&recipe.ctor),
        fixed: fixed.into(),
      }),
      None => self.instantiate(&recipe.ctor, &fixed)?,
    };
    downcast::<T>(&instance, name)
  }

  /// Runs `f` with an accessor onto this scope. The accessor cannot outlive
  /// the call.
  pub fn invoke<R>(&self, f: impl FnOnce(&ServiceAccessor<'_>) -> R) -> R {
    let accessor = ServiceAccessor { container: self };
    f(&accessor)
  }

  // --- Scoping ---

  /// Creates a scope parented to this one. `overrides` seed the child and
  /// shadow this scope for those tokens only.
  pub fn child_scope(&self, overrides: ServiceCollection) -> Container {
    let registry = Arc::new(Registry::new(Some(Arc::clone(&self.registry))));
    let count = overrides.len();
    for (key, entry) in overrides.into_entries() {
      registry.set(key, entry);
    }
    debug!(
      parent = self.registry.id(),
      scope = registry.id(),
      overrides = count,
      "created child scope"
    );
    Container {
      registry,
      shared: Arc::clone(&self.shared),
    }
  }

  // --- PRIVATE HELPERS ---

  fn at(&self, registry: &Arc<Registry>) -> Container {
    Container {
      registry: Arc::clone(registry),
      shared: Arc::clone(&self.shared),
    }
  }

  pub(crate) fn downgrade(&self) -> WeakScope {
    WeakScope {
      registry: Arc::downgrade(&self.registry),
      registry_id: self.registry.id(),
      shared: Arc::clone(&self.shared),
    }
  }

  pub(crate) fn lock_construction(&self) -> ReentrantMutexGuard<'_, ()> {
    self.shared.construction.lock()
  }

  fn get_or_construct_key(&self, key: Key) -> Result<Instance> {
    match self.registry.get_or_delegate(key) {
      Some((Entry::Instance(instance), _)) => Ok(instance),
      Some((Entry::Recipe(_), _)) => self.construct_and_cache(key),
      None => Err(Error::UnknownService {
        service: key.label(),
      }),
    }
  }

  fn construct_and_cache(&self, key: Key) -> Result<Instance> {
    let _lock = self.lock_construction();

    // Another thread may have finished while we waited for the lock.
    let (recipe, owner) = match self.registry.get_or_delegate(key) {
      Some((Entry::Instance(instance), _)) => return Ok(instance),
      Some((Entry::Recipe(recipe), owner)) => (recipe, owner),
      None => {
        return Err(Error::UnknownService {
          service: key.label(),
        })
      }
    };
    ActiveConstruction::ensure_inactive(owner.id(), key)?;

    self.resolve_graph(key, recipe, owner)?;

    match self.registry.get_or_delegate(key) {
      Some((Entry::Instance(instance), _)) => Ok(instance),
      _ => Err(Error::IllegalPromotion {
        service: key.label(),
      }),
    }
  }

  /// Builds `key` and every dependency of it that is still a recipe,
  /// dependencies first.
  fn resolve_graph(&self, key: Key, recipe: RawRecipe, owner: Arc<Registry>) -> Result<()> {
    let start = Slot {
      registry: owner.id(),
      key,
    };
    let mut graph: Graph<Slot, PendingNode> = Graph::new();
    graph.insert_node(start, PendingNode { owner, recipe });

    let mut stack = vec![start];
    while let Some(current) = stack.pop() {
      let Some(node) = graph.get(&current) else {
        continue;
      };
      // A stand-in needs nothing up front; its dependencies are resolved on
      // first use.
      if node.recipe.is_delayed() {
        continue;
      }
      let owner = Arc::clone(&node.owner);
      let constructor = node.recipe.ctor.name;
      let deps = lookup::lookup(&node.recipe.ctor);

      for dep in deps.iter() {
        match owner.get_or_delegate(dep.key()) {
          Some((Entry::Recipe(recipe), dep_owner)) => {
            let slot = Slot {
              registry: dep_owner.id(),
              key: dep.key(),
            };
            let pending = PendingNode {
              owner: dep_owner,
              recipe,
            };
            if graph.insert_node(slot, pending) {
              stack.push(slot);
            }
            graph.insert_edge(current, slot);
          }
          Some((Entry::Instance(_), _)) => {}
          None if dep.is_optional() => {}
          None => {
            return Err(Error::MissingRequiredDependency {
              constructor,
              dependency: dep.key().label(),
            })
          }
        }
      }
    }

    loop {
      let roots = graph.roots();
      if roots.is_empty() {
        if graph.is_empty() {
          return Ok(());
        }
        return Err(Error::CyclicDependency {
          path: describe_cycle(&graph),
        });
      }
      trace!(roots = roots.len(), pending = graph.len(), "resolving graph roots");

      for slot in roots {
        let Some(node) = graph.remove_node(&slot) else {
          continue;
        };
        // A sibling's constructor may already have built it.
        if let Some(Entry::Recipe(recipe)) = node.owner.get(slot.key) {
          self.build_node(slot.key, &node.owner, &recipe)?;
        }
      }
    }
  }

  /// Builds one binding and writes the result at its owning level.
  fn build_node(&self, key: Key, owner: &Arc<Registry>, recipe: &RawRecipe) -> Result<()> {
    let scope = self.at(owner);
    let instance = match &recipe.stand_in {
      Some(stand_in) => {
        debug!(service = key.label(), "deferring construction until first use");
        stand_in(DeferredSeed {
          key,
          scope: scope.downgrade(),
          ctor: Arc::clone(&recipe.ctor),
          fixed: Arc::clone(&recipe.fixed),
        })
      }
      None => {
        let _active = ActiveConstruction::enter(owner.id(), key)?;
        scope.instantiate(&recipe.ctor, &recipe.fixed)?
      }
    };
    owner.promote(key, recipe, instance)
  }

  /// Resolves the declared dependencies of `ctor` through this scope and
  /// invokes it with `[...fixed, ...dependencies]`.
  pub(crate) fn instantiate(&self, ctor: &RawConstructor, fixed: &[Arg]) -> Result<Instance> {
    let deps = lookup::lookup(ctor);
    let mut resolved = Vec::with_capacity(deps.len());
    for dep in deps.iter() {
      if self.registry.is_bound(dep.key()) {
        resolved.push(Some(self.get_or_construct_key(dep.key())?));
      } else if dep.is_optional() {
        resolved.push(None);
      } else {
        return Err(Error::MissingRequiredDependency {
          constructor: ctor.name,
          dependency: dep.key().label(),
        });
      }
    }

    let span = debug_span!("construct", service = ctor.name);
    let _enter = span.enter();
    let started = Instant::now();

    let instance = (ctor.build)(&Args::new(ctor.name, fixed, &deps, &resolved))?;

    let elapsed = started.elapsed();
    debug!(elapsed_us = elapsed.as_micros() as u64, "constructed service");
    if let Some(threshold) = self.shared.config.slow_construction_ms {
      if elapsed >= Duration::from_millis(threshold) {
        warn!(
          service = ctor.name,
          elapsed_ms = elapsed.as_millis() as u64,
          "slow service construction"
        );
      }
    }
    Ok(instance)
  }
}

fn describe_cycle(graph: &Graph<Slot, PendingNode>) -> String {
  match graph.find_cycle() {
    Some(cycle) => cycle
      .iter()
      .map(|slot| slot.key.label())
      .collect::<Vec<_>>()
      .join(" -> "),
    None => String::from("<unknown>"),
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("scope", &self.registry.id())
      .field("root", &self.is_root())
      .field("local_bindings", &self.registry.len())
      .finish_non_exhaustive()
  }
}

/// A scope held weakly, as deferred handles hold the scope that owns them.
#[derive(Clone)]
pub(crate) struct WeakScope {
  registry: Weak<Registry>,
  registry_id: u64,
  shared: Arc<Shared>,
}

impl WeakScope {
  pub(crate) fn upgrade(&self) -> Option<Container> {
    Some(Container {
      registry: self.registry.upgrade()?,
      shared: Arc::clone(&self.shared),
    })
  }

  pub(crate) fn registry_id(&self) -> u64 {
    self.registry_id
  }
}

/// Access to services for the duration of [`Container::invoke`].
pub struct ServiceAccessor<'a> {
  container: &'a Container,
}

impl ServiceAccessor<'_> {
  /// Same as [`Container::get_or_construct`].
  pub fn get<T>(&self, token: &Token<T>) -> Result<Arc<T>>
  where
    T: ?Sized + Send + Sync + 'static,
  {
    self.container.get_or_construct(token)
  }
}

/// Assembles a root container from a configuration and a service collection.
#[derive(Default)]
pub struct ContainerBuilder {
  config: ContainerConfig,
  services: ServiceCollection,
}

impl ContainerBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn config(mut self, config: ContainerConfig) -> Self {
    self.config = config;
    self
  }

  /// Adds every binding of `services`; later bindings replace earlier ones.
  pub fn services(mut self, services: ServiceCollection) -> Self {
    self.services.extend(services);
    self
  }

  pub fn service<T>(mut self, token: &Token<T>, binding: impl Into<Binding<T>>) -> Self
  where
    T: ?Sized + Send + Sync + 'static,
  {
    self.services.add(token, binding);
    self
  }

  pub fn build(self) -> Container {
    let registry = Arc::new(Registry::new(None));
    let count = self.services.len();
    for (key, entry) in self.services.into_entries() {
      registry.set(key, entry);
    }
    debug!(scope = registry.id(), services = count, "built root container");
    Container {
      registry,
      shared: Arc::new(Shared {
        config: self.config,
        construction: ReentrantMutex::new(()),
      }),
    }
  }
}
