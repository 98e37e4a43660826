use thiserror::Error;

/// Errors surfaced by the driver and the crypto engine.
///
/// Data-path errors stay local to the frame that caused them; control-path
/// errors propagate to the caller while the device stays operational.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
	#[error("invalid argument")]
	InvalidArgument,
	#[error("output buffer too small")]
	BufferTooSmall,
	#[error("operation not supported")]
	NotSupported,
	#[error("signature or tag verification failed")]
	InvalidSignature,
	#[error("operation issued in the wrong state")]
	BadState,
	#[error("completion did not arrive in time")]
	Timeout,
	#[error("bus or accelerator failure")]
	HardwareFailure,
	#[error("entry already exists")]
	AlreadyExists,
	#[error("entry does not exist")]
	DoesNotExist,
	#[error("out of memory")]
	InsufficientMemory,
}
