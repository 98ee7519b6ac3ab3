pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Access denied to knowledge spaces: {space_ids:?}.")]
	AccessDenied { space_ids: Vec<String> },
	#[error("No writable knowledge space available.")]
	NoWritableSpace,
	#[error("Unknown knowledge space: {space_id:?}.")]
	UnknownSpace { space_id: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<strata_storage::Error> for Error {
	fn from(err: strata_storage::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
