use derive_more::Display;
use std::error;

/// Failure kinds surfaced by the codec.
///
/// Codec functions return [`anyhow::Result`]; the kind rides inside the [`anyhow::Error`]
/// and is recoverable with `err.downcast_ref::<PlistError>()`.
#[derive(Display, PartialEq, Eq, Clone, Debug)]
pub enum PlistError {
    #[display(fmt = "Invalid binary plist file.")]
    InvalidFile,
    #[display(fmt = "Unsupported type: {}", _0)]
    Type(String),
    #[display(fmt = "Value out of range: {}", _0)]
    Overflow(String),
}
impl error::Error for PlistError {}

impl PlistError {
    pub fn of(err: &anyhow::Error) -> Option<&PlistError> {
        err.downcast_ref::<PlistError>()
    }
}
