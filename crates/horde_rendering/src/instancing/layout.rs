//! Instance buffer layout.
//!
//! Decides how many instances fit in one window and how many windows a
//! batch needs for its capacity.

use crate::error::{RenderError, RenderResult};

/// Size of one buffer word in bytes.
pub const WORD_BYTES: usize = 4;

/// Slack appended to single-buffer windows: two 4x4 float matrices.
pub const EXTRA_BYTES: usize = 128;

/// Rounds a byte count up to a whole number of words.
#[inline]
#[must_use]
pub const fn round_up_to_word(bytes: usize) -> usize {
    (bytes + WORD_BYTES - 1) / WORD_BYTES * WORD_BYTES
}

/// Word count of a raw buffer holding `count` instances plus `extra_bytes`.
///
/// Both the per-instance size and the extra bytes are rounded up to words.
#[inline]
#[must_use]
pub const fn buffer_words_for_instances(
    bytes_per_instance: usize,
    count: usize,
    extra_bytes: usize,
) -> usize {
    (round_up_to_word(bytes_per_instance) * count + round_up_to_word(extra_bytes)) / WORD_BYTES
}

/// How a batch addresses its buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferMode {
    /// One window spanning the whole capacity.
    SingleBuffer,
    /// Fixed-size windows; one draw command per window in use.
    BoundedWindow,
}

/// Result of [`compute_layout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceLayout {
    /// Bytes per window.
    pub window_size_bytes: usize,
    /// Instances one window holds.
    pub instances_per_window: usize,
    /// Windows needed for the full capacity.
    pub window_count: usize,
    /// Addressing mode the layout was computed for.
    pub mode: BufferMode,
}

impl InstanceLayout {
    /// Windows (and therefore draw commands) needed for `count` instances.
    ///
    /// Bounded mode grows with the count; single-buffer mode always needs one.
    #[inline]
    #[must_use]
    pub const fn windows_for(&self, count: usize) -> usize {
        match self.mode {
            BufferMode::SingleBuffer => 1,
            BufferMode::BoundedWindow => count.div_ceil(self.instances_per_window),
        }
    }
}

/// Computes the window layout for a batch.
///
/// Without a bound the whole capacity lives in one window sized
/// `round_up_to_word(bytes_per_instance * max_instances) + EXTRA_BYTES`.
/// With a bound each window holds `bound / bytes_per_instance` instances.
///
/// # Errors
///
/// - [`RenderError::InvalidLayout`] for zero inputs or size overflow
/// - [`RenderError::ZeroInstancesPerWindow`] when one instance exceeds the bound
pub fn compute_layout(
    bytes_per_instance: usize,
    max_instances: usize,
    bounded_window_max_bytes: Option<usize>,
) -> RenderResult<InstanceLayout> {
    let invalid = || RenderError::InvalidLayout {
        bytes_per_instance,
        max_instances,
    };
    if bytes_per_instance == 0 || max_instances == 0 {
        return Err(invalid());
    }

    match bounded_window_max_bytes {
        None => {
            let bytes = bytes_per_instance
                .checked_mul(max_instances)
                .and_then(|b| b.checked_add(WORD_BYTES - 1))
                .ok_or_else(invalid)?;
            Ok(InstanceLayout {
                window_size_bytes: bytes / WORD_BYTES * WORD_BYTES + EXTRA_BYTES,
                instances_per_window: max_instances,
                window_count: 1,
                mode: BufferMode::SingleBuffer,
            })
        }
        Some(bound) => {
            let instances_per_window = bound / bytes_per_instance;
            if instances_per_window == 0 {
                return Err(RenderError::ZeroInstancesPerWindow {
                    bytes_per_instance,
                    window_bytes: bound,
                });
            }
            Ok(InstanceLayout {
                window_size_bytes: bound,
                instances_per_window,
                window_count: max_instances.div_ceil(instances_per_window),
                mode: BufferMode::BoundedWindow,
            })
        }
    }
}
