use std::sync::Arc;
use weft_ioc::{
  token, Args, Constructor, Container, Declarations, Injectable, Recipe, ServiceCollection,
};

// A small application graph: Logger <- Settings <- Storage.
struct Logger {
  prefix: String,
}

impl Logger {
  fn log(&self, message: &str) {
    println!("[{}] {}", self.prefix, message);
  }
}

struct Settings {
  data_dir: String,
}

struct Storage {
  settings: Arc<Settings>,
  logger: Arc<Logger>,
}

token! {
  static LOGGER: Logger = "Logger";
  static SETTINGS: Settings = "Settings";
  static STORAGE: Storage = "Storage";
}

impl Injectable for Logger {
  fn name() -> &'static str {
    "Logger"
  }

  fn construct(args: &Args<'_>) -> weft_ioc::Result<Self> {
    Ok(Logger {
      prefix: args.fixed::<&'static str>(0)?.to_string(),
    })
  }
}

impl Injectable for Settings {
  fn name() -> &'static str {
    "Settings"
  }

  fn declare(deps: &mut Declarations) {
    deps.require(&LOGGER);
  }

  fn construct(args: &Args<'_>) -> weft_ioc::Result<Self> {
    args.get(&LOGGER)?.log("loading settings");
    Ok(Settings {
      data_dir: String::from("/var/lib/app"),
    })
  }
}

impl Injectable for Storage {
  fn name() -> &'static str {
    "Storage"
  }

  fn declare(deps: &mut Declarations) {
    deps.require(&SETTINGS).require(&LOGGER);
  }

  fn construct(args: &Args<'_>) -> weft_ioc::Result<Self> {
    Ok(Storage {
      settings: args.get(&SETTINGS)?,
      logger: args.get(&LOGGER)?,
    })
  }
}

fn main() -> weft_ioc::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter("weft_ioc=debug")
    .init();

  // --- Composition root ---
  // Every binding is listed here, explicitly, and handed to the root.
  let services = ServiceCollection::new()
    .with(&LOGGER, Recipe::new(Constructor::<Logger>::of()).with_arg("app"))
    .with(&SETTINGS, Constructor::<Settings>::of())
    .with(&STORAGE, Constructor::<Storage>::of());
  let root = Container::builder().services(services).build();

  // --- Resolution ---
  // Storage pulls in Settings and Logger, each built once.
  let storage = root.get_or_construct(&STORAGE)?;
  storage
    .logger
    .log(&format!("storage ready in {}", storage.settings.data_dir));

  // --- Child scope ---
  // A secondary window gets its own logger; everything else is shared.
  let window = root.child_scope(ServiceCollection::new().with(
    &LOGGER,
    Recipe::new(Constructor::<Logger>::of()).with_arg("window"),
  ));
  let window_storage = window.construct(Constructor::<Storage>::of())?;
  window_storage.logger.log("opened");
  assert!(Arc::ptr_eq(&window_storage.settings, &storage.settings));
  assert!(!Arc::ptr_eq(&window_storage.logger, &storage.logger));

  Ok(())
}
