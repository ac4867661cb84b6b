/// Encoder settings.
#[derive(Clone, Debug)]
pub struct EncodeOptions {
    /// Write dict entries sorted by key. Otherwise, in insertion order.
    pub sort_keys: bool,
    /// Drop dict entries whose key is not a string. Otherwise, such a key fails the encode.
    pub skip_keys: bool,
}
impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            sort_keys: true,
            skip_keys: false,
        }
    }
}

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Decoder settings.
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    /// The deepest container nesting the decoder will build.
    pub max_depth: usize,
    /// Fail on a container that refers to one of its own ancestors.
    /// Otherwise the cycle is rebuilt, and its `Rc`s keep each other alive until the caller
    /// breaks it.
    pub reject_cycles: bool,
}
impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            reject_cycles: false,
        }
    }
}
