/// A list of possible errors produced while streaming orientation samples.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
	/// An orientation message was not exactly three doubles.
	#[error("wrong message size: {0} bytes")]
	WrongSize(usize),

	/// A buffer could not be split into 8-byte doubles.
	#[error("decode error: {0} trailing bytes")]
	Decode(usize),

	#[error("protocol violation: {0}")]
	ProtocolViolation(&'static str),

	#[error("not connected")]
	NotConnected,

	// The dispatcher task is gone.
	#[error("closed")]
	Closed,
}

/// A convenient wrapper for [std::result::Result] with the [Error] type.
pub type Result<T> = std::result::Result<T, Error>;
