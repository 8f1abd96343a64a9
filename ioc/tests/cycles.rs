mod common;

use common::{node, with_journal, Node, JOURNAL};
use std::sync::{Arc, Mutex};
use weft_ioc::{Constructor, Container, Error, Recipe, Token};

#[test]
fn test_two_node_cycle_is_detected() {
  // Arrange: A -> B -> A
  let (container, journal) = with_journal();
  let a: Token<Node> = Token::new("A");
  let b: Token<Node> = Token::new("B");
  container.register(&a, node("A", &[b])).unwrap();
  container.register(&b, node("B", &[a])).unwrap();

  // Act
  let err = container.get_or_construct(&a).err().unwrap();

  // Assert
  match err {
    Error::CyclicDependency { path } => assert_eq!(path, "A -> B -> A"),
    other => panic!("unexpected error: {other}"),
  }
  assert!(journal.entries().is_empty());
}

#[test]
fn test_cycle_below_an_acyclic_root_reports_only_the_cycle() {
  // Arrange: Root -> X -> Y -> Z -> X, and Root -> Leaf
  let (container, journal) = with_journal();
  let root: Token<Node> = Token::new("Root");
  let leaf: Token<Node> = Token::new("Leaf");
  let x: Token<Node> = Token::new("X");
  let y: Token<Node> = Token::new("Y");
  let z: Token<Node> = Token::new("Z");
  container.register(&root, node("Root", &[leaf, x])).unwrap();
  container.register(&leaf, node("Leaf", &[])).unwrap();
  container.register(&x, node("X", &[y])).unwrap();
  container.register(&y, node("Y", &[z])).unwrap();
  container.register(&z, node("Z", &[x])).unwrap();

  // Act
  let err = container.get_or_construct(&root).err().unwrap();

  // Assert: the roots that could be built were built before the cycle
  // stalled the graph.
  match err {
    Error::CyclicDependency { path } => assert_eq!(path, "X -> Y -> Z -> X"),
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(journal.entries(), vec!["Leaf"]);
  assert!(container.get_existing(&leaf).is_ok());
}

#[test]
fn test_self_dependency_is_a_cycle() {
  let (container, _journal) = with_journal();
  let selfish: Token<Node> = Token::new("Selfish");
  container.register(&selfish, node("Selfish", &[selfish])).unwrap();

  let err = container.get_or_construct(&selfish).err().unwrap();

  assert!(matches!(err, Error::CyclicDependency { .. }));
  assert!(err.to_string().contains("Selfish -> Selfish"));
}

#[test]
fn test_constructor_requesting_its_own_token_is_recursive_instantiation() {
  // Arrange: the constructor reaches back into the container for its own
  // token without declaring it.
  let container = Container::new();
  let echo: Token<u32> = Token::new("Echo");
  let handle = container.clone();
  container
    .register(
      &echo,
      Constructor::<u32>::from_fn("Echo", |_| {}, move |_| {
        handle.get_or_construct(&echo)?;
        Ok(Arc::new(1))
      }),
    )
    .unwrap();

  // Act
  let err = container.get_or_construct(&echo).err().unwrap();

  // Assert
  assert!(matches!(err, Error::RecursiveInstantiation { service: "Echo" }));
  // The guard was released: the failure is repeatable, not sticky.
  let again = container.get_or_construct(&echo).err().unwrap();
  assert!(matches!(again, Error::RecursiveInstantiation { .. }));
}

#[test]
fn test_hidden_two_hop_recursion_is_caught() {
  // A's constructor asks for B, B's constructor asks for A; neither declares it.
  let container = Container::new();
  let a: Token<u32> = Token::new("HiddenA");
  let b: Token<u32> = Token::new("HiddenB");

  let via_a = container.clone();
  container
    .register(
      &a,
      Constructor::<u32>::from_fn("HiddenA", |_| {}, move |_| {
        via_a.get_or_construct(&b)?;
        Ok(Arc::new(1))
      }),
    )
    .unwrap();
  let via_b = container.clone();
  container
    .register(
      &b,
      Constructor::<u32>::from_fn("HiddenB", |_| {}, move |_| {
        via_b.get_or_construct(&a)?;
        Ok(Arc::new(2))
      }),
    )
    .unwrap();

  let err = container.get_or_construct(&a).err().unwrap();

  assert!(matches!(err, Error::RecursiveInstantiation { service: "HiddenA" }));
}

#[test]
fn test_deep_chain_resolves_without_recursion() {
  // Arrange: N0 -> N1 -> ... -> N1999
  let (container, journal) = with_journal();
  let tokens: Vec<Token<Node>> = (0..2000).map(|_| Token::new("Link")).collect();
  for (i, token) in tokens.iter().enumerate() {
    let deps: Vec<Token<Node>> = tokens.get(i + 1).copied().into_iter().collect();
    container.register(token, node("Link", &deps)).unwrap();
  }

  // Act
  let head = container.get_or_construct(&tokens[0]).unwrap();

  // Assert
  assert_eq!(journal.count("Link"), 2000);
  assert_eq!(head.deps.len(), 1);
  assert!(container.get_existing(&tokens[1999]).is_ok());
}

#[test]
fn test_delayed_node_does_not_close_a_cycle_up_front() {
  // A -> B (delayed), B -> A. B's stand-in needs nothing to exist, so A is
  // built; the cycle only matters if B is ever used.
  let (container, _journal) = with_journal();
  let a: Token<Node> = Token::new("A");
  let b: Token<weft_ioc::Deferred<Node>> = Token::new("B");

  let needs_b = Constructor::<Node>::from_fn(
    "A",
    |decl| {
      decl.require(&*JOURNAL).require(&b);
    },
    move |args| {
      let _stand_in = args.get(&b)?;
      Ok(Arc::new(Node {
        name: "A",
        deps: Vec::new(),
      }))
    },
  );
  container.register(&a, needs_b).unwrap();
  container
    .register(&b, Recipe::deferred(node("B", &[a])))
    .unwrap();

  let built = container.get_or_construct(&a).unwrap();
  let stand_in = container.get_existing(&b).unwrap();

  assert_eq!(built.name, "A");
  assert!(!stand_in.is_constructed());
  // Using B now builds it against the cached A.
  assert_eq!(stand_in.deps[0].name, "A");
}

// --- Rebinding mid-construction ---

#[test]
fn test_rebinding_during_construction_keeps_the_new_recipe() {
  // Arrange: the old recipe's constructor rebinds its own token.
  let container = Container::new();
  let answer: Token<u32> = Token::new("Answer");
  let rebind = Mutex::new(Some(container.clone()));
  let old = Constructor::<u32>::from_fn(
    "Old",
    |_| {},
    move |_| {
      if let Some(scope) = rebind.lock().unwrap().take() {
        scope.register(
          &answer,
          Constructor::<u32>::from_fn("New", |_| {}, |_| Ok(Arc::new(2))),
        )?;
      }
      Ok(Arc::new(1))
    },
  );
  container.register(&answer, old).unwrap();

  // Act
  let first = container.get_or_construct(&answer);

  // Assert: the stale result is refused and the new binding survives.
  assert!(matches!(
    first,
    Err(Error::IllegalPromotion { service: "Answer" })
  ));
  assert!(container.get_existing(&answer).is_err());
  assert_eq!(*container.get_or_construct(&answer).unwrap(), 2);
}

#[test]
fn test_rebinding_from_another_thread_mid_construction_keeps_the_new_recipe() {
  use std::sync::mpsc;
  use std::thread;

  // Arrange: "Slow" parks until another thread has rebound the token.
  let container = Container::new();
  let answer: Token<u32> = Token::new("Answer");
  let (started_tx, started_rx) = mpsc::channel::<()>();
  let (rebound_tx, rebound_rx) = mpsc::channel::<()>();
  let started_tx = Mutex::new(started_tx);
  let rebound_rx = Mutex::new(rebound_rx);
  let slow = Constructor::<u32>::from_fn(
    "Slow",
    |_| {},
    move |_| {
      started_tx.lock().unwrap().send(()).unwrap();
      rebound_rx.lock().unwrap().recv().unwrap();
      Ok(Arc::new(1))
    },
  );
  container.register(&answer, slow).unwrap();

  // Act
  let builder = {
    let container = container.clone();
    thread::spawn(move || container.get_or_construct(&answer).map(|v| *v))
  };
  started_rx.recv().unwrap();
  container
    .register(
      &answer,
      Constructor::<u32>::from_fn("Fast", |_| {}, |_| Ok(Arc::new(2))),
    )
    .unwrap();
  rebound_tx.send(()).unwrap();
  let first = builder.join().unwrap();

  // Assert
  assert!(matches!(first, Err(Error::IllegalPromotion { .. })));
  assert_eq!(*container.get_or_construct(&answer).unwrap(), 2);
}
