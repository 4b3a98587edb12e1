//! Host-visible upload buffers.
//!
//! This module provides the per-frame writable regions the CPU fills with
//! constant and dynamic vertex data before a submission reads them.
//!
//! # Overview
//!
//! - [`BufferUsage`] selects element alignment (constant vs vertex)
//! - [`UploadBuffer`] is a fixed-capacity array of `T` addressable by index
//! - [`GpuAddress`] / [`BufferView`] are what command buffers record
//!
//! Capacity is fixed at creation. Writing past it is a setup error and is
//! reported as [`RhiError::CapacityExceeded`], never truncated.
//!
//! # Example
//!
//! ```
//! use frameflight_rhi::buffer::{BufferUsage, UploadBuffer};
//!
//! # fn example() -> Result<(), frameflight_rhi::RhiError> {
//! let mut buffer = UploadBuffer::<[f32; 4]>::new("tint", BufferUsage::Constant, 2)?;
//! buffer.copy_data(1, &[1.0, 0.0, 0.0, 1.0])?;
//! assert_eq!(buffer.read(1)?, [1.0, 0.0, 0.0, 1.0]);
//! assert_eq!(buffer.element_stride(), 256);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;
use tracing::debug;

use crate::error::{RhiError, RhiResult};

/// Required alignment of each element in a constant buffer region.
pub const CONSTANT_BUFFER_ALIGNMENT: usize = 256;

/// Rounds `byte_size` up to a multiple of [`CONSTANT_BUFFER_ALIGNMENT`].
#[inline]
pub const fn constant_buffer_byte_size(byte_size: usize) -> usize {
    (byte_size + CONSTANT_BUFFER_ALIGNMENT - 1) & !(CONSTANT_BUFFER_ALIGNMENT - 1)
}

/// Process-unique identity of a GPU buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

impl BufferId {
    /// Allocates a fresh id.
    pub fn allocate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Byte address inside a GPU buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuAddress {
    /// Buffer the address points into.
    pub buffer: BufferId,
    /// Byte offset from the start of the buffer.
    pub offset: u64,
}

/// A vertex or index buffer binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferView {
    /// Start of the bound range.
    pub address: GpuAddress,
    /// Length of the bound range in bytes.
    pub size_in_bytes: u64,
    /// Distance between consecutive elements.
    pub stride: u32,
}

/// Buffer usage type.
///
/// Constant regions pad each element to [`CONSTANT_BUFFER_ALIGNMENT`]; vertex
/// regions are tightly packed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Shader constant data, one padded element per entity
    Constant,
    /// Vertex data
    Vertex,
    /// Index data
    Index,
}

impl BufferUsage {
    /// Returns a human-readable name for the buffer type.
    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Constant => "constant",
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
        }
    }

    fn element_stride(self, element_size: usize) -> usize {
        match self {
            BufferUsage::Constant => constant_buffer_byte_size(element_size),
            BufferUsage::Vertex | BufferUsage::Index => element_size,
        }
    }
}

/// Fixed-capacity, host-visible array of `T`.
///
/// Every successful [`copy_data`](Self::copy_data) increments a write
/// counter, which lets callers verify that redundant uploads were skipped.
///
/// # Thread Safety
///
/// The buffer is plain owned memory; the frame ring hands out `&mut` access
/// only while the GPU is not reading it.
pub struct UploadBuffer<T: Pod> {
    id: BufferId,
    label: String,
    usage: BufferUsage,
    element_count: usize,
    element_stride: usize,
    data: Vec<u8>,
    writes: u64,
    _marker: PhantomData<T>,
}

impl<T: Pod> UploadBuffer<T> {
    /// Creates a zero-filled buffer holding `element_count` elements.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::InvalidState`] if `element_count` is zero.
    pub fn new(label: impl Into<String>, usage: BufferUsage, element_count: usize) -> RhiResult<Self> {
        let label = label.into();
        if element_count == 0 {
            return Err(RhiError::InvalidState(format!(
                "buffer '{}' must hold at least one element",
                label
            )));
        }

        let element_stride = usage.element_stride(std::mem::size_of::<T>());
        let data = vec![0u8; element_stride * element_count];

        debug!(
            "Created {} buffer '{}' ({} x {} bytes)",
            usage.name(),
            label,
            element_count,
            element_stride
        );

        Ok(Self {
            id: BufferId::allocate(),
            label,
            usage,
            element_count,
            element_stride,
            data,
            writes: 0,
            _marker: PhantomData,
        })
    }

    fn check_index(&self, index: usize) -> RhiResult<usize> {
        if index >= self.element_count {
            return Err(RhiError::CapacityExceeded {
                region: self.label.clone(),
                index,
                capacity: self.element_count,
            });
        }
        Ok(index * self.element_stride)
    }

    /// Writes `value` into element `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::CapacityExceeded`] if `index` is out of range.
    pub fn copy_data(&mut self, index: usize, value: &T) -> RhiResult<()> {
        let offset = self.check_index(index)?;
        let bytes = bytemuck::bytes_of(value);
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }

    /// Reads element `index` back.
    pub fn read(&self, index: usize) -> RhiResult<T> {
        let offset = self.check_index(index)?;
        let size = std::mem::size_of::<T>();
        Ok(bytemuck::pod_read_unaligned(
            &self.data[offset..offset + size],
        ))
    }

    /// Returns the GPU address of element `index`.
    pub fn address(&self, index: usize) -> RhiResult<GpuAddress> {
        let offset = self.check_index(index)?;
        Ok(GpuAddress {
            buffer: self.id,
            offset: offset as u64,
        })
    }

    /// Returns a view covering the whole buffer.
    pub fn view(&self) -> BufferView {
        BufferView {
            address: GpuAddress {
                buffer: self.id,
                offset: 0,
            },
            size_in_bytes: self.data.len() as u64,
            stride: self.element_stride as u32,
        }
    }

    /// Returns the buffer identity.
    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Returns the label given at creation.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the usage the buffer was created with.
    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Number of elements the buffer holds.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Bytes between consecutive elements.
    #[inline]
    pub fn element_stride(&self) -> usize {
        self.element_stride
    }

    /// Number of successful element writes since creation.
    #[inline]
    pub fn write_count(&self) -> u64 {
        self.writes
    }
}

impl<T: Pod> fmt::Debug for UploadBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadBuffer")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("usage", &self.usage)
            .field("element_count", &self.element_count)
            .field("element_stride", &self.element_stride)
            .field("writes", &self.writes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_buffer_byte_size() {
        assert_eq!(constant_buffer_byte_size(1), 256);
        assert_eq!(constant_buffer_byte_size(256), 256);
        assert_eq!(constant_buffer_byte_size(257), 512);
        assert_eq!(constant_buffer_byte_size(0), 0);
    }

    #[test]
    fn test_vertex_buffer_is_tightly_packed() {
        let buffer = UploadBuffer::<[f32; 3]>::new("positions", BufferUsage::Vertex, 4).unwrap();
        assert_eq!(buffer.element_stride(), 12);
        assert_eq!(buffer.view().size_in_bytes, 48);
    }

    #[test]
    fn test_out_of_range_write_is_capacity_error() {
        let mut buffer = UploadBuffer::<u32>::new("objects", BufferUsage::Constant, 2).unwrap();
        let err = buffer.copy_data(2, &7).unwrap_err();
        match err {
            RhiError::CapacityExceeded {
                region,
                index,
                capacity,
            } => {
                assert_eq!(region, "objects");
                assert_eq!(index, 2);
                assert_eq!(capacity, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(buffer.write_count(), 0);
    }

    #[test]
    fn test_write_count_tracks_successful_writes() {
        let mut buffer = UploadBuffer::<u32>::new("materials", BufferUsage::Constant, 3).unwrap();
        buffer.copy_data(0, &1).unwrap();
        buffer.copy_data(2, &3).unwrap();
        assert_eq!(buffer.write_count(), 2);
        assert_eq!(buffer.read(2).unwrap(), 3);
        assert_eq!(buffer.read(1).unwrap(), 0);
    }

    #[test]
    fn test_addresses_follow_stride() {
        let buffer = UploadBuffer::<u32>::new("pass", BufferUsage::Constant, 3).unwrap();
        let a0 = buffer.address(0).unwrap();
        let a2 = buffer.address(2).unwrap();
        assert_eq!(a0.buffer, a2.buffer);
        assert_eq!(a2.offset - a0.offset, 512);
        assert!(buffer.address(3).is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(UploadBuffer::<u32>::new("empty", BufferUsage::Vertex, 0).is_err());
    }

    #[test]
    fn test_buffer_ids_are_unique() {
        assert_ne!(BufferId::allocate(), BufferId::allocate());
    }
}
