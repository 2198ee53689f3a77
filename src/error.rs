use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything the library can fail with. The transport layer maps these onto
/// its own status codes (404 / 400 / 500 for an HTTP front, exit codes for
/// the bundled CLI).
#[derive(Debug, Error)]
pub enum Error {
  /// No task matches the given id.
  #[error("Task with ID {0} not found")]
  NotFound(uuid::Uuid),

  /// The caller asked for something the collection cannot answer, e.g. a
  /// page past the end of the data. Recoverable by fixing the request.
  #[error("{0}")]
  InvalidRequest(String),

  /// The document file could not be read, parsed or written. Not
  /// recoverable by retrying with different input.
  #[error("{0}")]
  Storage(String),
}

impl Error {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::NotFound(_))
  }
}
