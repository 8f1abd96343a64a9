#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use weft_ioc::{
  token, Args, Constructor, Container, Declarations, Injectable, Recipe, Result, Token,
};

// --- Construction journal ---

/// Records constructor runs, in order, for one test's container.
#[derive(Default)]
pub struct Journal {
  entries: Mutex<Vec<&'static str>>,
}

impl Journal {
  pub fn record(&self, name: &'static str) {
    self.entries.lock().unwrap().push(name);
  }

  pub fn entries(&self) -> Vec<&'static str> {
    self.entries.lock().unwrap().clone()
  }

  pub fn count(&self, name: &str) -> usize {
    self.entries.lock().unwrap().iter().filter(|e| **e == name).count()
  }
}

token! {
  pub static JOURNAL: Journal = "Journal";
  pub static LOGGER: Logger = "Logger";
  pub static CONFIG: Config = "Config";
  pub static CACHE: Cache = "Cache";
}

// --- Fixtures: Logger <- Config <- Cache ---

pub struct Logger;

pub struct Config {
  pub logger: Arc<Logger>,
}

pub struct Cache {
  pub config: Arc<Config>,
  pub logger: Arc<Logger>,
}

impl Injectable for Logger {
  fn name() -> &'static str {
    "Logger"
  }

  fn declare(deps: &mut Declarations) {
    deps.require(&JOURNAL);
  }

  fn construct(args: &Args<'_>) -> Result<Self> {
    args.get(&JOURNAL)?.record("Logger");
    Ok(Logger)
  }
}

impl Injectable for Config {
  fn name() -> &'static str {
    "Config"
  }

  fn declare(deps: &mut Declarations) {
    deps.require(&JOURNAL).require(&LOGGER);
  }

  fn construct(args: &Args<'_>) -> Result<Self> {
    args.get(&JOURNAL)?.record("Config");
    Ok(Config {
      logger: args.get(&LOGGER)?,
    })
  }
}

impl Injectable for Cache {
  fn name() -> &'static str {
    "Cache"
  }

  fn declare(deps: &mut Declarations) {
    deps.require(&JOURNAL).require(&CONFIG).require(&LOGGER);
  }

  fn construct(args: &Args<'_>) -> Result<Self> {
    args.get(&JOURNAL)?.record("Cache");
    Ok(Cache {
      config: args.get(&CONFIG)?,
      logger: args.get(&LOGGER)?,
    })
  }
}

/// A root container with the journal bound as an instance and the three
/// fixtures bound as recipes.
pub fn journaled() -> (Container, Arc<Journal>) {
  let journal = Arc::new(Journal::default());
  let container = Container::builder()
    .service(&JOURNAL, Arc::clone(&journal))
    .service(&LOGGER, Recipe::new(Constructor::<Logger>::of()))
    .service(&CONFIG, Recipe::new(Constructor::<Config>::of()))
    .service(&CACHE, Recipe::new(Constructor::<Cache>::of()))
    .build();
  (container, journal)
}

/// A root container holding only a fresh journal.
pub fn with_journal() -> (Container, Arc<Journal>) {
  let journal = Arc::new(Journal::default());
  let container = Container::builder()
    .service(&JOURNAL, Arc::clone(&journal))
    .build();
  (container, journal)
}

// --- Generic graph nodes ---

/// A service that only knows its name and the nodes it was built from.
pub struct Node {
  pub name: &'static str,
  pub deps: Vec<Arc<Node>>,
}

/// A closure constructor for a `Node` that records its name in the journal
/// and requires every token in `deps`.
pub fn node(name: &'static str, deps: &[Token<Node>]) -> Constructor<Node> {
  let deps = deps.to_vec();
  let declared = deps.clone();
  Constructor::from_fn(
    name,
    move |decl| {
      decl.require(&*JOURNAL);
      for dep in &declared {
        decl.require(dep);
      }
    },
    move |args| {
      args.get(&JOURNAL)?.record(name);
      let deps = deps.iter().map(|dep| args.get(dep)).collect::<Result<Vec<_>>>()?;
      Ok(Arc::new(Node { name, deps }))
    },
  )
}
