//! Example: type-ahead city search
//!
//! Keystrokes land in a `CurrentValueSubject`. The pipeline skips the initial
//! empty query, waits for typing to pause, drops repeats, runs one lookup at a
//! time and hands results to a "main" queue for display.
//!
//! Run with `RUST_LOG=debug cargo run --example city_search` to see the
//! lifecycle events logged by `print`.

use std::{sync::mpsc::channel, thread, time::Duration};

use rxcombine::prelude::*;

#[derive(Clone, Debug)]
struct Forecast {
  city: String,
  summary: &'static str,
  temperature: i32,
}

#[derive(Clone, Debug, thiserror::Error)]
enum FetchError {
  /// The query cannot be turned into a lookup.
  #[error("cannot build a request for {0:?}")]
  BadRequest(String),
  #[error("no forecast for {0:?}")]
  NotFound(String),
}

/// In-memory stand-in for a weather service: a search key in, a publisher of
/// one forecast or a failure out. A malformed key fails through the returned
/// publisher instead of at the call site.
fn fetch_forecast(city: String) -> BoxedPublisher<Forecast, FetchError> {
  if !city.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '-') {
    return fail(FetchError::BadRequest(city)).box_it();
  }
  let found = match city.as_str() {
    "lisbon" => Some(("sunny", 24)),
    "oslo" => Some(("snow", -3)),
    "paris" => Some(("cloudy", 15)),
    "rome" => Some(("clear", 21)),
    _ => None,
  };
  match found {
    Some((summary, temperature)) => just(Forecast { city, summary, temperature })
      .set_failure_type()
      .box_it(),
    None => fail(FetchError::NotFound(city)).box_it(),
  }
}

fn main() -> Result<(), RxError> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let search_queue = SerialScheduler::new("search")?;
  let main_queue = SerialScheduler::new("main")?;
  let query = CurrentValueSubject::new(String::new());
  let (done_tx, done_rx) = channel();
  let mut bag = CancelBag::new();

  query
    .clone()
    .drop_first(1)
    .debounce(Duration::from_millis(300), search_queue)
    .map(|q| q.trim().to_lowercase())
    .deduplicate()
    .set_failure_type::<FetchError>()
    .flat_map_bounded_with(Demand::max(1), FlatMapPolicy::IgnoreInnerFailure, fetch_forecast)
    .print("forecast")
    .receive_on(main_queue)
    .sink(
      |f| println!("{:>8}: {} {}°C", f.city, f.summary, f.temperature),
      move |c| {
        println!("search closed: {c:?}");
        let _ = done_tx.send(());
      },
    )
    .store(&mut bag);

  let typing = [
    ("L", 80),
    ("Li", 80),
    ("Lis", 80),
    ("Lisbon", 500),
    ("Lisbon ", 500),
    ("Atlantis", 500),
    ("0slo", 500),
    ("Oslo", 500),
  ];
  for (text, pause) in typing {
    query.set_value(text.to_owned());
    thread::sleep(Duration::from_millis(pause));
  }
  query.send_completion(Completion::Finished);

  let _ = done_rx.recv_timeout(Duration::from_secs(2));
  Ok(())
}
