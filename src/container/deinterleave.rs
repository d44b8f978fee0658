//! Strided selections over interleaved sample buffers
//!
//! The session stores samples sample-major (`ch0, ch1, ch2, counter, ch0, ...`)
//! while the container stores them channel-major, one column per channel. A
//! [`StridedSelection`] picks one channel out of the interleaved buffer and is
//! paired with a whole destination column of the same length.

use crate::packet::format::VALUES_PER_SAMPLE;
use crate::{ConvertError, Result};

/// A regularly spaced one-dimensional selection: `count` elements starting at
/// `offset`, `stride` elements apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StridedSelection {
    pub offset: usize,
    pub stride: usize,
    pub count: usize,
}

impl StridedSelection {
    pub fn new(offset: usize, stride: usize, count: usize) -> Self {
        Self { offset, stride, count }
    }

    /// Every value of interleaved field `channel` across `samples` samples.
    pub fn channel(channel: usize, samples: usize) -> Self {
        Self::new(channel, VALUES_PER_SAMPLE, samples)
    }

    /// Minimum source length this selection needs.
    pub fn required_len(&self) -> usize {
        match self.count {
            0 => 0,
            n => self.offset + self.stride * (n - 1) + 1,
        }
    }

    /// Check the selection fits a source of `len` elements.
    pub fn validate(&self, len: usize) -> Result<()> {
        if self.stride == 0 && self.count > 1 {
            return Err(ConvertError::container_write(
                "strided selection",
                "stride must be non-zero",
            ));
        }
        if self.required_len() > len {
            return Err(ConvertError::container_write(
                "strided selection",
                format!(
                    "offset {} stride {} count {} needs {} elements, source has {}",
                    self.offset,
                    self.stride,
                    self.count,
                    self.required_len(),
                    len
                ),
            ));
        }
        Ok(())
    }

    /// Iterate the selected elements of `source`.
    pub fn iter<'a, T: Copy>(&self, source: &'a [T]) -> Result<impl Iterator<Item = T> + 'a> {
        self.validate(source.len())?;
        let stride = self.stride.max(1);
        Ok(source[self.offset.min(source.len())..].iter().step_by(stride).take(self.count).copied())
    }

    /// Copy the selected elements of `source` into a contiguous column.
    pub fn gather<T: Copy>(&self, source: &[T]) -> Result<Vec<T>> {
        Ok(self.iter(source)?.collect())
    }

    /// Copy the selected elements of `source` into `column` row by row.
    pub fn copy_into<T: Copy>(&self, source: &[T], column: &mut [T]) -> Result<()> {
        if column.len() != self.count {
            return Err(ConvertError::container_write(
                "strided selection",
                format!("destination holds {} rows, selection has {}", column.len(), self.count),
            ));
        }
        for (slot, value) in column.iter_mut().zip(self.iter(source)?) {
            *slot = value;
        }
        Ok(())
    }
}
