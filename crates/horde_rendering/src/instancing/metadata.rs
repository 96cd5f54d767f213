//! Per-batch attribute metadata.
//!
//! Every window starts with [`HEADER_BYTES`] of zeros, followed by one
//! region per attribute. A region holds that attribute for every instance of
//! the window, so attribute `a` of window-local instance `i` lives at
//! `offset(a) + i * size(a)`.

use crate::error::{RenderError, RenderResult};

/// Zeroed header at the start of every window: two packed 4x3 matrices.
pub const HEADER_BYTES: usize = 96;

/// Metadata flag marking an attribute as per-instance.
pub const PER_INSTANCE_FLAG: u32 = 0x8000_0000;

/// Named per-instance attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Packed 4x3 object-to-world matrix.
    ObjectToWorld,
    /// Packed 4x3 world-to-object matrix.
    WorldToObject,
    /// RGBA tint.
    Color,
    /// Atlas rectangle (`x, y, w, h`).
    UvRect,
    /// Damage flash timer.
    Blink,
    /// Outline toggle (0.0 / 1.0).
    Outline,
    /// Health fraction.
    Health,
}

impl AttributeKind {
    /// Size in bytes.
    #[inline]
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::ObjectToWorld | Self::WorldToObject => 48,
            Self::Color | Self::UvRect => 16,
            Self::Blink | Self::Outline | Self::Health => 4,
        }
    }

    /// Size in 32-bit words.
    #[inline]
    #[must_use]
    pub const fn size_words(self) -> usize {
        self.size_bytes() / 4
    }

    /// Shader-side property name.
    #[must_use]
    pub const fn shader_name(self) -> &'static str {
        match self {
            Self::ObjectToWorld => "unity_ObjectToWorld",
            Self::WorldToObject => "unity_WorldToObject",
            Self::Color => "_Color",
            Self::UvRect => "_UvRect",
            Self::Blink => "_Blink",
            Self::Outline => "_Outline",
            Self::Health => "_Health",
        }
    }

    /// Dense index, used for offset lookup tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Number of attribute kinds.
    pub const COUNT: usize = 7;
}

/// One metadata entry handed to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetadataValue {
    /// Attribute name.
    pub attribute: AttributeKind,
    /// `PER_INSTANCE_FLAG | byte offset within the window`.
    pub value: u32,
}

/// Attribute offsets of one batch, fixed at construction.
#[derive(Clone, Debug)]
pub struct MetadataTable {
    attributes: Vec<AttributeKind>,
    offsets: [Option<usize>; AttributeKind::COUNT],
    bytes_per_instance: usize,
    instances_per_window: usize,
}

impl MetadataTable {
    /// Sum of attribute sizes.
    #[must_use]
    pub fn bytes_per_instance(attributes: &[AttributeKind]) -> usize {
        attributes.iter().map(|a| a.size_bytes()).sum()
    }

    /// Lays attributes out after the header in declaration order.
    ///
    /// # Errors
    ///
    /// [`RenderError::TooManyAttributes`] if `attributes.len()` exceeds `limit`.
    pub fn build(
        attributes: &[AttributeKind],
        instances_per_window: usize,
        limit: usize,
    ) -> RenderResult<Self> {
        if attributes.len() > limit {
            return Err(RenderError::TooManyAttributes {
                requested: attributes.len(),
                limit,
            });
        }

        let mut offsets = [None; AttributeKind::COUNT];
        let mut cursor = HEADER_BYTES;
        for attribute in attributes {
            offsets[attribute.index()] = Some(cursor);
            cursor += attribute.size_bytes() * instances_per_window;
        }

        Ok(Self {
            attributes: attributes.to_vec(),
            offsets,
            bytes_per_instance: Self::bytes_per_instance(attributes),
            instances_per_window,
        })
    }

    /// Byte offset of an attribute region within a window.
    #[inline]
    #[must_use]
    pub fn offset_of(&self, attribute: AttributeKind) -> Option<usize> {
        self.offsets[attribute.index()]
    }

    /// Bytes one instance occupies across all regions.
    #[inline]
    #[must_use]
    pub const fn instance_bytes(&self) -> usize {
        self.bytes_per_instance
    }

    /// First byte after the last attribute region.
    #[inline]
    #[must_use]
    pub const fn end_bytes(&self) -> usize {
        HEADER_BYTES + self.bytes_per_instance * self.instances_per_window
    }

    /// Attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeKind] {
        &self.attributes
    }

    /// Entries for [`RenderBackend::add_batch`](crate::backend::RenderBackend::add_batch).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn values(&self) -> Vec<MetadataValue> {
        self.attributes
            .iter()
            .filter_map(|&attribute| {
                self.offset_of(attribute).map(|offset| MetadataValue {
                    attribute,
                    value: PER_INSTANCE_FLAG | offset as u32,
                })
            })
            .collect()
    }
}
