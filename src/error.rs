use thiserror::Error;

/// Errors raised by the crate's own fallible constructors.
///
/// Stream failures never use this type: they travel as the publisher's own
/// `Err` inside [`Completion::Failed`](crate::subscriber::Completion).
#[derive(Debug, Error)]
pub enum RxError {
  #[error("demand must not be negative, got {0}")]
  NegativeDemand(i64),

  #[error("failed to start scheduler worker: {0}")]
  Spawn(#[from] std::io::Error),
}
