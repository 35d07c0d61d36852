//! Ingestion settings.

/// Default in-memory threshold for multipart file parts (32 KiB).
pub const DEFAULT_MAX_MEMORY_SIZE: usize = 32 * 1024;

/// Default upper bound on a collected request body (32 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 32 * 1024 * 1024;

/// Limits applied while building the parameter store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    /// File parts larger than this are spilled to a temporary file.
    pub max_memory_size: usize,
    /// Bodies larger than this are rejected before decoding.
    pub max_body_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_memory_size: DEFAULT_MAX_MEMORY_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// What happens to a JSON body once it has been merged into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// The JSON body is consumed by ingestion.
    #[default]
    Plug,
    /// The JSON body stays readable for [`decode_struct`] and [`take_body`].
    ///
    /// [`decode_struct`]: crate::RequestContext::decode_struct
    /// [`take_body`]: crate::RequestContext::take_body
    Touch,
}
