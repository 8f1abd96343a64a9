//! Public macros for declaring tokens and resolving services.

/// Declares lazily-initialised static tokens.
///
/// Each token is created on first access and keeps its identity for the life
/// of the process.
///
/// ```
/// use weft_ioc::token;
///
/// pub trait Clock: Send + Sync {}
///
/// token! {
///   /// The wall clock.
///   pub static CLOCK: dyn Clock = "Clock";
///   static RETRIES: u32 = "Retries";
/// }
///
/// assert_eq!(CLOCK.label(), "Clock");
/// assert_ne!(CLOCK.key(), RETRIES.key());
/// ```
#[macro_export]
macro_rules! token {
  ($($(#[$attr:meta])* $vis:vis static $name:ident : $ty:ty = $label:expr;)+) => {
    $(
      $(#[$attr])*
      $vis static $name: $crate::__private::Lazy<$crate::Token<$ty>> =
        $crate::__private::Lazy::new(|| $crate::Token::new($label));
    )+
  };
}

/// Resolves a service, constructing it if needed.
///
/// # Panics
///
/// Panics with the resolution error if the service cannot be provided. For
/// a non-panicking version, use `Container::get_or_construct` directly.
///
/// ```
/// use std::sync::Arc;
/// use weft_ioc::{resolve, token, Container};
///
/// token! { static GREETING: String = "Greeting"; }
///
/// let container = Container::new();
/// container.register(&GREETING, Arc::new(String::from("hello"))).unwrap();
///
/// let greeting = resolve!(container, GREETING);
/// assert_eq!(*greeting, "hello");
/// ```
#[macro_export]
macro_rules! resolve {
  ($container:expr, $token:expr) => {
    match $container.get_or_construct(&$token) {
      ::std::result::Result::Ok(service) => service,
      ::std::result::Result::Err(err) => {
        panic!("Failed to resolve required service: {}", err)
      }
    }
  };
}

/// Returns the already-built service as an `Option`, never constructing.
#[macro_export]
macro_rules! try_resolve {
  ($container:expr, $token:expr) => {
    $container.get_existing(&$token).ok()
  };
}
