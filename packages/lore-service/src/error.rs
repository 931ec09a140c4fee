pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Forbidden: {message}")]
	Forbidden { message: String },
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Dependency unavailable: {message}")]
	DependencyUnavailable { message: String },
	#[error("Configuration error: {message}")]
	Config { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<lore_storage::Error> for Error {
	fn from(err: lore_storage::Error) -> Self {
		match err {
			lore_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			lore_storage::Error::InvalidArgument(message) => Self::Validation { message },
			lore_storage::Error::NotFound(message) => Self::NotFound { message },
			// Unique-constraint races surface as validation problems ("already a member"), never
			// as a crash.
			lore_storage::Error::Conflict(message) => Self::Validation { message },
			lore_storage::Error::Qdrant(inner) =>
				Self::DependencyUnavailable { message: inner.to_string() },
		}
	}
}

impl From<lore_providers::Error> for Error {
	fn from(err: lore_providers::Error) -> Self {
		Self::DependencyUnavailable { message: err.to_string() }
	}
}
