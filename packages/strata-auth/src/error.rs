pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Malformed bearer token: {message}.")]
	MalformedToken { message: String },
	#[error("Unsupported signature algorithm {algorithm:?}.")]
	UnsupportedAlgorithm { algorithm: String },
	#[error("Token issuer {issuer:?} is not trusted.")]
	UntrustedIssuer { issuer: String },
	#[error("Key {kid:?} not found in key set from {key_source}; available kids: {available:?}.")]
	KeyNotFound { key_source: String, kid: String, available: Vec<String> },
	#[error("No suitable verification key in key set from {key_source}; available kids: {available:?}.")]
	NoSuitableKey { key_source: String, available: Vec<String> },
	#[error("Failed to fetch key material from {url}: {message}.")]
	KeyFetch { url: String, message: String },
	#[error("Token signature does not match the verification key.")]
	SignatureMismatch,
	#[error("Token verification failed: {message}.")]
	VerificationFailed { message: String },
}
