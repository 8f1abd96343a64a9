//! Dependency lookup.
//!
//! Injectable types are declared lazily on first lookup and cached in one
//! process-wide table keyed by type. Closure constructors carry their own
//! declarations and never enter the table.

use crate::constructor::{Constructor, CtorId, Declarations, Declared, Dependency, RawConstructor};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

static DECLARATIONS: Lazy<DashMap<CtorId, Arc<[Dependency]>>> = Lazy::new(DashMap::new);

/// The ordered dependencies of `ctor`.
pub fn dependencies_of<T: ?Sized>(ctor: &Constructor<T>) -> Arc<[Dependency]> {
  lookup(&ctor.raw)
}

pub(crate) fn lookup(ctor: &RawConstructor) -> Arc<[Dependency]> {
  let declare = match &ctor.declared {
    Declared::Attached(deps) => return Arc::clone(deps),
    Declared::Lazily(declare) => *declare,
  };
  if let Some(deps) = DECLARATIONS.get(&ctor.id) {
    return Arc::clone(deps.value());
  }
  // `entry` holds the shard lock, so concurrent first lookups declare once.
  let entry = DECLARATIONS.entry(ctor.id).or_insert_with(|| {
    let mut decl = Declarations::new();
    declare(&mut decl);
    decl.into_inner().into()
  });
  Arc::clone(entry.value())
}
