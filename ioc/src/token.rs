//! Capability identities.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// The untyped identity of a [`Token`].
///
/// Two keys are equal only if they were produced by the same `Token::new`
/// call. The label is carried for diagnostics and never compared.
#[derive(Clone, Copy)]
pub struct Key {
  id: u64,
  label: &'static str,
}

impl Key {
  /// The diagnostic label given when the token was created.
  pub fn label(&self) -> &'static str {
    self.label
  }
}

impl PartialEq for Key {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for Key {}

impl Hash for Key {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Key({}#{})", self.label, self.id)
  }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label)
  }
}

/// A typed, globally unique identity for a capability.
///
/// The type parameter is the shape callers receive (`Arc<T>`); it may be a
/// trait object. Tokens are normally created once per capability and kept in
/// a static, see the [`token!`](crate::token) macro.
///
/// ```
/// use weft_ioc::Token;
///
/// trait Clock: Send + Sync {}
///
/// let a: Token<dyn Clock> = Token::new("Clock");
/// let b: Token<dyn Clock> = Token::new("Clock");
/// // Same label, different capabilities.
/// assert_ne!(a.key(), b.key());
/// ```
pub struct Token<T: ?Sized> {
  key: Key,
  _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized> Token<T> {
  /// Creates a fresh token. Every call yields a distinct identity.
  pub fn new(label: &'static str) -> Self {
    let id = NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed);
    Self {
      key: Key { id, label },
      _marker: PhantomData,
    }
  }

  pub fn key(&self) -> Key {
    self.key
  }

  pub fn label(&self) -> &'static str {
    self.key.label
  }
}

impl<T: ?Sized> Clone for Token<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T: ?Sized> Copy for Token<T> {}

impl<T: ?Sized> PartialEq for Token<T> {
  fn eq(&self, other: &Self) -> bool {
    self.key == other.key
  }
}

impl<T: ?Sized> Eq for Token<T> {}

impl<T: ?Sized> fmt::Debug for Token<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Token")
      .field("label", &self.key.label)
      .field("type", &std::any::type_name::<T>())
      .finish()
  }
}
