use std::sync::Arc;
use std::time::Duration;
use weft_ioc::{token, Constructor, Container, ContainerConfig, Deferred, Recipe};

// The interface callers depend on.
trait Highlighter: Send + Sync {
  fn highlight(&self, source: &str) -> String;
}

struct GrammarHighlighter;

impl Highlighter for GrammarHighlighter {
  fn highlight(&self, source: &str) -> String {
    format!("<b>{}</b>", source)
  }
}

// The stand-in implements the same interface by delegation.
impl Highlighter for Deferred<GrammarHighlighter> {
  fn highlight(&self, source: &str) -> String {
    (**self).highlight(source)
  }
}

token! {
  static HIGHLIGHTER: dyn Highlighter = "Highlighter";
}

fn main() -> weft_ioc::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter("weft_ioc=debug")
    .init();

  let container = Container::builder()
    .config(ContainerConfig::default().slow_construction_ms(100))
    .build();

  // Loading grammars is expensive; delay it until someone highlights.
  let grammars = Constructor::<GrammarHighlighter>::from_fn("GrammarHighlighter", |_| {}, |_| {
    println!("Loading grammars...");
    std::thread::sleep(Duration::from_millis(150));
    Ok(Arc::new(GrammarHighlighter))
  });
  container.register(
    &HIGHLIGHTER,
    Recipe::delayed(grammars, |handle| Arc::new(handle) as Arc<dyn Highlighter>),
  )?;

  let highlighter = container.get_or_construct(&HIGHLIGHTER)?;
  println!("Got a highlighter; nothing loaded yet.");

  println!("{}", highlighter.highlight("fn main() {}"));
  println!("{}", highlighter.highlight("let x = 1;"));

  Ok(())
}
