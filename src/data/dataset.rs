//! N-dimensional dataset handle.
//!
//! [`Dataset`] is a strided view over a shared `f64` buffer plus a metadata
//! collection keyed by [`MetadataKind`]. Views produced by slicing,
//! squeezing, and reshaping share the buffer where possible; none of them
//! mutate the source. Reshaping deliberately returns a new view instead of
//! mutating in place, so the transform engine always works on owned values.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::data::metadata::{AxesMetadata, Metadata, MetadataKind, OriginMetadata};
use crate::data::shape;
use crate::data::Slice;

/// Dataset construction/view errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatasetError {
    #[error("shape {shape:?} implies {expected} elements, buffer holds {got}")]
    BufferSizeMismatch {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    #[error("cannot reshape {from:?} ({from_len} elements) into {to:?} ({to_len} elements)")]
    ReshapeMismatch {
        from: Vec<usize>,
        from_len: usize,
        to: Vec<usize>,
        to_len: usize,
    },

    #[error("got {got} slices for a rank-{rank} dataset")]
    SliceCountMismatch { got: usize, rank: usize },

    #[error("slice {slice} out of bounds for dimension {dim} of size {size}")]
    SliceOutOfBounds {
        slice: Slice,
        dim: usize,
        size: usize,
    },

    #[error("slice step must be positive, got {step} for dimension {dim}")]
    InvalidStep { step: usize, dim: usize },

    #[error("data dimensions {dims:?} must be strictly ascending and within rank {rank}")]
    InvalidDataDimensions { dims: Vec<usize>, rank: usize },
}

/// An n-dimensional array handle with attached metadata.
///
/// Invariant: `shape.len() == rank` at all times, and no view operation ever
/// changes the total element count its shape implies.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    buffer: Arc<Vec<f64>>,
    offset: usize,
    shape: Vec<usize>,
    strides: Vec<usize>,
    name: Option<String>,
    metadata: BTreeMap<MetadataKind, Vec<Metadata>>,
}

impl Dataset {
    /// Build a dataset owning the given buffer.
    ///
    /// Fails if the buffer length does not match the shape's element count.
    pub fn from_vec(data: Vec<f64>, shape: &[usize]) -> Result<Self, DatasetError> {
        let expected = shape::element_count(shape);
        if data.len() != expected {
            return Err(DatasetError::BufferSizeMismatch {
                shape: shape.to_vec(),
                expected,
                got: data.len(),
            });
        }
        Ok(Dataset {
            buffer: Arc::new(data),
            offset: 0,
            strides: shape::row_major_strides(shape),
            shape: shape.to_vec(),
            name: None,
            metadata: BTreeMap::new(),
        })
    }

    /// A rank-0 dataset holding a single value.
    pub fn scalar(value: f64) -> Self {
        Dataset {
            buffer: Arc::new(vec![value]),
            offset: 0,
            shape: Vec::new(),
            strides: Vec::new(),
            name: None,
            metadata: BTreeMap::new(),
        }
    }

    /// An all-zero dataset of the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        Dataset {
            buffer: Arc::new(vec![0.0; shape::element_count(shape)]),
            offset: 0,
            strides: shape::row_major_strides(shape),
            shape: shape.to_vec(),
            name: None,
            metadata: BTreeMap::new(),
        }
    }

    /// A 1-D dataset of `0.0, 1.0, ..., len-1`, the default integer index.
    pub fn indices(len: usize) -> Self {
        Dataset {
            buffer: Arc::new((0..len).map(|i| i as f64).collect()),
            offset: 0,
            shape: vec![len],
            strides: vec![1],
            name: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a name (used for auxiliary outputs and logging).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements (1 for rank 0).
    #[inline]
    pub fn len(&self) -> usize {
        shape::element_count(&self.shape)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at a multi-dimensional index, or None when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.rank() {
            return None;
        }
        let mut pos = self.offset;
        for (d, &i) in index.iter().enumerate() {
            if i >= self.shape[d] {
                return None;
            }
            pos += i * self.strides[d];
        }
        self.buffer.get(pos).copied()
    }

    /// All elements in logical row-major order.
    pub fn values(&self) -> Vec<f64> {
        let n = self.len();
        let mut out = Vec::with_capacity(n);
        if n == 0 {
            return out;
        }
        let mut index = vec![0usize; self.rank()];
        loop {
            let pos: usize = self.offset
                + index
                    .iter()
                    .zip(&self.strides)
                    .map(|(&i, &s)| i * s)
                    .sum::<usize>();
            out.push(self.buffer[pos]);
            // advance last-dimension-fastest
            let mut d = self.rank();
            loop {
                if d == 0 {
                    return out;
                }
                d -= 1;
                index[d] += 1;
                if index[d] < self.shape[d] {
                    break;
                }
                index[d] = 0;
            }
        }
    }

    fn is_contiguous(&self) -> bool {
        self.strides == shape::row_major_strides(&self.shape)
    }

    /// View with every size-1 dimension removed.
    ///
    /// Shares the buffer; metadata is carried over. An all-ones shape
    /// squeezes to rank 0.
    pub fn squeezed(&self) -> Dataset {
        let mut new_shape = Vec::new();
        let mut new_strides = Vec::new();
        for (d, &s) in self.shape.iter().enumerate() {
            if s != 1 {
                new_shape.push(s);
                new_strides.push(self.strides[d]);
            }
        }
        Dataset {
            buffer: Arc::clone(&self.buffer),
            offset: self.offset,
            shape: new_shape,
            strides: new_strides,
            name: self.name.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// View with a new shape covering the same elements.
    ///
    /// Shares the buffer when the view is contiguous, otherwise copies.
    /// Fails if the element counts differ. Metadata is carried over.
    pub fn reshaped(&self, new_shape: &[usize]) -> Result<Dataset, DatasetError> {
        let from_len = self.len();
        let to_len = shape::element_count(new_shape);
        if from_len != to_len {
            return Err(DatasetError::ReshapeMismatch {
                from: self.shape.clone(),
                from_len,
                to: new_shape.to_vec(),
                to_len,
            });
        }
        let (buffer, offset) = if self.is_contiguous() {
            (Arc::clone(&self.buffer), self.offset)
        } else {
            (Arc::new(self.values()), 0)
        };
        Ok(Dataset {
            buffer,
            offset,
            strides: shape::row_major_strides(new_shape),
            shape: new_shape.to_vec(),
            name: self.name.clone(),
            metadata: self.metadata.clone(),
        })
    }

    fn check_slices(&self, slices: &[Slice]) -> Result<(), DatasetError> {
        if slices.len() != self.rank() {
            return Err(DatasetError::SliceCountMismatch {
                got: slices.len(),
                rank: self.rank(),
            });
        }
        for (d, s) in slices.iter().enumerate() {
            if s.step == 0 {
                return Err(DatasetError::InvalidStep { step: s.step, dim: d });
            }
            if s.start > s.stop || s.stop > self.shape[d] {
                return Err(DatasetError::SliceOutOfBounds {
                    slice: *s,
                    dim: d,
                    size: self.shape[d],
                });
            }
        }
        Ok(())
    }

    /// Strided view of a sub-region, sharing the buffer.
    ///
    /// Metadata is carried over; one slice per dimension is required.
    pub fn slice_view(&self, slices: &[Slice]) -> Result<Dataset, DatasetError> {
        self.check_slices(slices)?;
        let offset = self.offset
            + slices
                .iter()
                .zip(&self.strides)
                .map(|(s, &st)| s.start * st)
                .sum::<usize>();
        let shape: Vec<usize> = slices.iter().map(Slice::len).collect();
        let strides: Vec<usize> = slices
            .iter()
            .zip(&self.strides)
            .map(|(s, &st)| st * s.step)
            .collect();
        Ok(Dataset {
            buffer: Arc::clone(&self.buffer),
            offset,
            shape,
            strides,
            name: self.name.clone(),
            metadata: self.metadata.clone(),
        })
    }

    /// Contiguous copy of a sub-region, with metadata carried over.
    pub fn slice(&self, slices: &[Slice]) -> Result<Dataset, DatasetError> {
        let view = self.slice_view(slices)?;
        let shape = view.shape.clone();
        Ok(Dataset {
            buffer: Arc::new(view.values()),
            offset: 0,
            strides: shape::row_major_strides(&shape),
            shape,
            name: self.name.clone(),
            metadata: self.metadata.clone(),
        })
    }

    // -------------------------------------------------------------------
    // Metadata collection
    // -------------------------------------------------------------------

    /// All metadata entries of a kind, in insertion order.
    ///
    /// An unknown/absent kind yields an empty list, never an error.
    pub fn metadata(&self, kind: MetadataKind) -> &[Metadata] {
        self.metadata.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First metadata entry of a kind, if any.
    pub fn first_metadata(&self, kind: MetadataKind) -> Option<&Metadata> {
        self.metadata(kind).first()
    }

    /// Append a metadata entry under its own kind.
    pub fn add_metadata(&mut self, metadata: Metadata) {
        self.metadata
            .entry(metadata.kind())
            .or_default()
            .push(metadata);
    }

    /// Drop every entry of a kind.
    pub fn clear_metadata(&mut self, kind: MetadataKind) {
        self.metadata.remove(&kind);
    }

    /// Replace every entry of the metadata's kind with this one.
    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata.insert(metadata.kind(), vec![metadata]);
    }

    /// Copy every metadata entry of `self` onto `target`.
    pub fn copy_metadata_to(&self, target: &mut Dataset) {
        for entries in self.metadata.values() {
            for m in entries {
                target.add_metadata(m.clone());
            }
        }
    }

    /// First axes metadata entry, if any.
    pub fn first_axes_metadata(&self) -> Option<&AxesMetadata> {
        match self.first_metadata(MetadataKind::Axes) {
            Some(Metadata::Axes(axes)) => Some(axes),
            _ => None,
        }
    }

    /// Origin metadata, if this dataset is a tagged slice view.
    pub fn origin_metadata(&self) -> Option<&OriginMetadata> {
        match self.first_metadata(MetadataKind::Origin) {
            Some(Metadata::Origin(origin)) => Some(origin),
            _ => None,
        }
    }

    /// First mask dataset, if any mask metadata is attached.
    pub fn first_mask(&self) -> Option<&Dataset> {
        match self.first_metadata(MetadataKind::Mask) {
            Some(Metadata::Mask(mask)) => Some(mask.mask()),
            _ => None,
        }
    }

    /// First error dataset, if any error metadata is attached.
    pub fn first_error(&self) -> Option<&Dataset> {
        match self.first_metadata(MetadataKind::Error) {
            Some(Metadata::Error(err)) => Some(err.errors()),
            _ => None,
        }
    }
}
