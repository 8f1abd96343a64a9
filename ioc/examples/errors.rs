use std::panic;
use std::sync::Arc;
use weft_ioc::{resolve, token, Constructor, Container, Error, Token};

struct Unregistered;

token! {
  static MISSING: Unregistered = "Unregistered";
}

fn main() {
  let container = Container::new();

  // --- The panicking `resolve!` macro ---
  let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
    let _service = resolve!(container, MISSING);
  }));
  assert!(result.is_err(), "resolve! should have panicked.");
  println!("Caught the expected panic from resolve!.");

  // --- The fallible methods ---
  match container.get_or_construct(&MISSING) {
    Err(err @ Error::UnknownService { .. }) => println!("get_or_construct: {}", err),
    _ => panic!("Should not have found the service!"),
  }

  // --- A dependency cycle ---
  let ping: Token<u8> = Token::new("Ping");
  let pong: Token<u8> = Token::new("Pong");
  let cyclic = |name: &'static str, other: Token<u8>| {
    Constructor::<u8>::from_fn(
      name,
      move |decl| {
        decl.require(&other);
      },
      |_| Ok(Arc::new(0)),
    )
  };
  container.register(&ping, cyclic("Ping", pong)).unwrap();
  container.register(&pong, cyclic("Pong", ping)).unwrap();

  match container.get_or_construct(&ping) {
    Err(err @ Error::CyclicDependency { .. }) => println!("get_or_construct: {}", err),
    _ => panic!("Expected a cycle"),
  }
}
