//! Typed write access to a locked instance buffer.
//!
//! Attributes are stored region by region, so the words of one instance are
//! scattered across its window and two instance ranges cannot be carved out
//! of the staging slice with `split_at_mut`. An [`InstanceWriter`] instead owns
//! a half-open *instance* range and may only touch words that belong to
//! instances inside it. Splitting a writer hands out non-overlapping ranges,
//! which is what lets fill jobs run in parallel on one buffer.

use std::marker::PhantomData;
use std::ops::Range;

use super::metadata::{AttributeKind, MetadataTable};

/// Maps `(attribute, instance)` to a word index in the staging buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowAddressing {
    instances_per_window: usize,
    window_words: usize,
    offsets_words: [Option<usize>; AttributeKind::COUNT],
}

impl WindowAddressing {
    /// Builds addressing from a metadata table and the byte stride between
    /// consecutive windows.
    ///
    /// # Panics
    ///
    /// Panics if the attribute regions do not fit within the window stride.
    #[must_use]
    pub fn new(metadata: &MetadataTable, instances_per_window: usize, window_stride_bytes: usize) -> Self {
        assert!(
            metadata.end_bytes() <= window_stride_bytes,
            "attribute regions ({} bytes) exceed window stride ({window_stride_bytes} bytes)",
            metadata.end_bytes()
        );
        let mut offsets_words = [None; AttributeKind::COUNT];
        for attribute in metadata.attributes() {
            offsets_words[attribute.index()] = metadata.offset_of(*attribute).map(|b| b / 4);
        }
        Self {
            instances_per_window,
            window_words: window_stride_bytes / 4,
            offsets_words,
        }
    }

    /// Words between the starts of consecutive windows.
    #[inline]
    #[must_use]
    pub const fn window_words(&self) -> usize {
        self.window_words
    }

    /// Instances per window.
    #[inline]
    #[must_use]
    pub const fn instances_per_window(&self) -> usize {
        self.instances_per_window
    }

    /// First word of `attribute` for `index`, or `None` if the batch does not
    /// carry the attribute.
    #[inline]
    #[must_use]
    pub fn word_of(&self, attribute: AttributeKind, index: usize) -> Option<usize> {
        let offset = self.offsets_words[attribute.index()]?;
        let window = index / self.instances_per_window;
        let local = index % self.instances_per_window;
        Some(window * self.window_words + offset + local * attribute.size_words())
    }
}

/// Writes per-instance attributes for one instance range of a locked buffer.
pub struct InstanceWriter<'a> {
    words: *mut f32,
    len: usize,
    addressing: WindowAddressing,
    range: Range<usize>,
    mask: Option<&'a mut [bool]>,
    _staging: PhantomData<&'a mut [f32]>,
}

// SAFETY: a writer only dereferences words derived from instances inside its
// own range; ranges handed out by `split_at` never overlap, so writers on
// different threads never alias a word. The mask is an ordinary `&mut` slice.
unsafe impl Send for InstanceWriter<'_> {}

impl<'a> InstanceWriter<'a> {
    /// Creates a writer over instances `0..count`.
    ///
    /// # Panics
    ///
    /// Panics if `count` instances do not fit in `staging`, or if the mask
    /// length differs from `count`.
    pub(crate) fn new(
        staging: &'a mut [f32],
        addressing: WindowAddressing,
        count: usize,
        mask: Option<&'a mut [bool]>,
    ) -> Self {
        let windows = count.div_ceil(addressing.instances_per_window);
        assert!(
            windows * addressing.window_words <= staging.len(),
            "{count} instances overrun staging buffer of {} words",
            staging.len()
        );
        if let Some(mask) = &mask {
            assert_eq!(mask.len(), count, "visibility mask length mismatch");
        }
        Self {
            words: staging.as_mut_ptr(),
            len: staging.len(),
            addressing,
            range: 0..count,
            mask,
            _staging: PhantomData,
        }
    }

    /// Instance range this writer owns.
    #[inline]
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Number of instances in range.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Returns `true` if the range is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Splits into `[start, mid)` and `[mid, end)`.
    ///
    /// # Panics
    ///
    /// Panics if `mid` lies outside the writer's range.
    #[must_use]
    pub fn split_at(self, mid: usize) -> (Self, Self) {
        assert!(
            self.range.start <= mid && mid <= self.range.end,
            "split point {mid} outside {:?}",
            self.range
        );
        let (left_mask, right_mask) = match self.mask {
            Some(mask) => {
                let (l, r) = mask.split_at_mut(mid - self.range.start);
                (Some(l), Some(r))
            }
            None => (None, None),
        };
        let left = Self {
            words: self.words,
            len: self.len,
            addressing: self.addressing,
            range: self.range.start..mid,
            mask: left_mask,
            _staging: PhantomData,
        };
        let right = Self {
            words: self.words,
            len: self.len,
            addressing: self.addressing,
            range: mid..self.range.end,
            mask: right_mask,
            _staging: PhantomData,
        };
        (left, right)
    }

    /// Splits into consecutive writers of at most `size` instances.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub fn chunks(self, size: usize) -> Vec<Self> {
        assert!(size > 0, "chunk size must be non-zero");
        let mut out = Vec::with_capacity(self.len().div_ceil(size));
        let mut rest = self;
        while rest.len() > size {
            let mid = rest.range.start + size;
            let (head, tail) = rest.split_at(mid);
            out.push(head);
            rest = tail;
        }
        if !rest.is_empty() {
            out.push(rest);
        }
        out
    }

    /// Sets the visibility bit of `index`. No-op for writers without a mask.
    #[inline]
    pub fn set_visible(&mut self, index: usize, visible: bool) {
        let start = self.range.start;
        if let Some(mask) = self.mask.as_deref_mut() {
            mask[index - start] = visible;
        }
    }

    /// Writes the words of `attribute` for `index`.
    ///
    /// Writes to attributes the batch does not carry are dropped.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the writer's range.
    #[inline]
    pub fn write(&mut self, attribute: AttributeKind, index: usize, values: &[f32]) {
        assert!(
            self.range.contains(&index),
            "instance {index} outside writer range {:?}",
            self.range
        );
        debug_assert_eq!(values.len(), attribute.size_words());
        let Some(word) = self.addressing.word_of(attribute, index) else {
            debug_assert!(false, "{attribute:?} is not part of this batch");
            return;
        };
        let count = values.len().min(attribute.size_words());
        assert!(word + count <= self.len, "attribute write past staging end");

        // SAFETY: `word + count <= len` keeps the copy inside the staging
        // slice borrowed for `'a`, and `index` is inside this writer's range,
        // so no other live writer addresses these words.
        unsafe {
            std::ptr::copy_nonoverlapping(values.as_ptr(), self.words.add(word), count);
        }
    }

    /// Writes a packed 4x3 matrix attribute.
    #[inline]
    pub fn write_matrix(&mut self, attribute: AttributeKind, index: usize, matrix: &[f32; 12]) {
        self.write(attribute, index, matrix);
    }

    /// Writes a four-component attribute.
    #[inline]
    pub fn write_vec4(&mut self, attribute: AttributeKind, index: usize, value: [f32; 4]) {
        self.write(attribute, index, &value);
    }

    /// Writes a scalar attribute.
    #[inline]
    pub fn write_scalar(&mut self, attribute: AttributeKind, index: usize, value: f32) {
        self.write(attribute, index, &[value]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instancing::metadata::HEADER_BYTES;

    const ATTRS: [AttributeKind; 3] = [
        AttributeKind::ObjectToWorld,
        AttributeKind::WorldToObject,
        AttributeKind::Health,
    ];

    fn addressing(ipw: usize) -> (WindowAddressing, usize) {
        let table = MetadataTable::build(&ATTRS, ipw, 16).unwrap();
        let stride = table.end_bytes();
        (WindowAddressing::new(&table, ipw, stride), stride / 4)
    }

    #[test]
    fn test_word_addressing_across_windows() {
        let (addr, window_words) = addressing(4);
        let header = HEADER_BYTES / 4;
        assert_eq!(addr.word_of(AttributeKind::ObjectToWorld, 0), Some(header));
        assert_eq!(addr.word_of(AttributeKind::ObjectToWorld, 3), Some(header + 36));
        assert_eq!(
            addr.word_of(AttributeKind::ObjectToWorld, 5),
            Some(window_words + header + 12)
        );
        assert_eq!(
            addr.word_of(AttributeKind::Health, 6),
            Some(window_words + header + 2 * 48 + 2)
        );
        assert_eq!(addr.word_of(AttributeKind::Color, 0), None);
    }

    #[test]
    fn test_split_writers_touch_own_instances() {
        let (addr, window_words) = addressing(4);
        let mut staging = vec![0.0f32; window_words * 2];
        let mut mask = vec![false; 6];
        {
            let writer = InstanceWriter::new(&mut staging, addr, 6, Some(mask.as_mut_slice()));
            let (mut left, mut right) = writer.split_at(2);
            left.write_scalar(AttributeKind::Health, 1, 0.25);
            left.set_visible(1, true);
            right.write_scalar(AttributeKind::Health, 5, 0.75);
            right.set_visible(5, true);
        }
        let w1 = addr.word_of(AttributeKind::Health, 1).unwrap();
        let w5 = addr.word_of(AttributeKind::Health, 5).unwrap();
        assert_eq!(staging[w1], 0.25);
        assert_eq!(staging[w5], 0.75);
        assert_eq!(mask, vec![false, true, false, false, false, true]);
        assert_eq!(staging.iter().filter(|v| **v != 0.0).count(), 2);
    }

    #[test]
    fn test_chunks_cover_range() {
        let (addr, window_words) = addressing(4);
        let mut staging = vec![0.0f32; window_words * 3];
        let writer = InstanceWriter::new(&mut staging, addr, 10, None);
        let ranges: Vec<_> = writer.chunks(4).iter().map(InstanceWriter::range).collect();
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
    }

    #[test]
    #[should_panic(expected = "outside writer range")]
    fn test_write_outside_range_panics() {
        let (addr, window_words) = addressing(4);
        let mut staging = vec![0.0f32; window_words];
        let writer = InstanceWriter::new(&mut staging, addr, 4, None);
        let (mut left, _right) = writer.split_at(2);
        left.write_scalar(AttributeKind::Health, 3, 1.0);
    }
}
