//! # Render Error Types
//!
//! Configuration errors abort startup. Resource errors abort the frame before
//! any buffer is locked, so nothing is submitted.

use thiserror::Error;

/// Errors raised by the batched renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A single instance does not fit in one bounded window.
    #[error("zero instances per window: {bytes_per_instance} bytes per instance, window holds {window_bytes} bytes")]
    ZeroInstancesPerWindow {
        /// Bytes one instance occupies.
        bytes_per_instance: usize,
        /// Usable bytes per window.
        window_bytes: usize,
    },

    /// Layout inputs are zero or overflow.
    #[error("invalid layout: {bytes_per_instance} bytes per instance x {max_instances} instances")]
    InvalidLayout {
        /// Bytes one instance occupies.
        bytes_per_instance: usize,
        /// Requested capacity.
        max_instances: usize,
    },

    /// The metadata table names more attributes than the backend supports.
    #[error("too many instance attributes: {requested} requested, backend limit {limit}")]
    TooManyAttributes {
        /// Attribute count of the batch kind.
        requested: usize,
        /// Backend limit.
        limit: usize,
    },

    /// A batch received more instances than it was built for.
    #[error("batch '{batch}' capacity exceeded: {requested} instances, capacity {capacity}")]
    CapacityExceeded {
        /// Batch label.
        batch: String,
        /// Instances requested this frame.
        requested: usize,
        /// Configured maximum.
        capacity: usize,
    },

    /// Emission wrote past the arrays sized during planning.
    #[error("draw plan overflow: {what} needs {needed}, planned {planned}")]
    DrawPlanOverflow {
        /// Which output array overflowed.
        what: &'static str,
        /// Slots required.
        needed: usize,
        /// Slots allocated.
        planned: usize,
    },

    /// An animation table has no frames.
    #[error("animation table '{0}' is empty")]
    EmptyAnimationTable(String),

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file failed to parse.
    #[error("failed to parse render config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("failed to read render config '{path}': {source}")]
    ConfigIo {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backend rejected a buffer operation.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RenderError::CapacityExceeded {
            batch: "health_bar".into(),
            requested: 12,
            capacity: 10,
        };
        assert_eq!(
            err.to_string(),
            "batch 'health_bar' capacity exceeded: 12 instances, capacity 10"
        );

        let err = RenderError::ZeroInstancesPerWindow {
            bytes_per_instance: 136,
            window_bytes: 100,
        };
        assert!(err.to_string().contains("136 bytes per instance"));
    }
}
