//! Dataset metadata model.
//!
//! Metadata entries are keyed by a closed [`MetadataKind`] enum; looking up
//! a kind that is not attached yields an empty list rather than an error.
//! Four kinds are carried through the pipeline: per-dimension axis
//! calibration, slice provenance, masks, and per-element errors.

use crate::data::dataset::{Dataset, DatasetError};
use crate::data::Slice;

/// Closed set of metadata kinds a dataset can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKind {
    /// Per-dimension axis calibration datasets.
    Axes,
    /// Provenance of a slice view within its parent dataset.
    Origin,
    /// Boolean mask marking valid elements.
    Mask,
    /// Per-element error estimates.
    Error,
}

/// A metadata entry; the variant determines the kind it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Axes(AxesMetadata),
    Origin(OriginMetadata),
    Mask(MaskMetadata),
    Error(ErrorMetadata),
}

impl Metadata {
    pub fn kind(&self) -> MetadataKind {
        match self {
            Metadata::Axes(_) => MetadataKind::Axes,
            Metadata::Origin(_) => MetadataKind::Origin,
            Metadata::Mask(_) => MetadataKind::Mask,
            Metadata::Error(_) => MetadataKind::Error,
        }
    }
}

/// Per-dimension axis calibration.
///
/// Each dimension holds an ordered list of axis datasets, in inverse order
/// of importance. An empty list means "use the default integer index".
/// Cloning copies the per-dimension lists, so mutating a clone never
/// touches the original.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxesMetadata {
    axes: Vec<Vec<Dataset>>,
}

impl AxesMetadata {
    /// Fresh instance of the given rank with every dimension slot empty.
    pub fn with_rank(rank: usize) -> Self {
        AxesMetadata {
            axes: vec![Vec::new(); rank],
        }
    }

    /// Number of dimension slots.
    pub fn rank(&self) -> usize {
        self.axes.len()
    }

    /// Axis datasets for a dimension, in inverse order of importance.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= rank()`.
    pub fn axis(&self, dim: usize) -> &[Dataset] {
        assert!(dim < self.axes.len(), "axis dimension {dim} out of range");
        &self.axes[dim]
    }

    /// Replace the axis list for a dimension.
    ///
    /// An empty list resets the dimension to the default integer index.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= rank()`.
    pub fn set_axis(&mut self, dim: usize, axes: Vec<Dataset>) {
        assert!(dim < self.axes.len(), "axis dimension {dim} out of range");
        self.axes[dim] = axes;
    }

    /// The main (first) axis of every dimension; None means default index.
    pub fn axes(&self) -> Vec<Option<&Dataset>> {
        self.axes.iter().map(|list| list.first()).collect()
    }
}

/// Provenance of a slice view carved from a parent dataset.
///
/// Records which parent dimensions ("data dimensions") the view's own
/// dimensions occupy, the parent's full shape, and the slice descriptors
/// the view was taken with. Created once per slice, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginMetadata {
    parent_shape: Vec<usize>,
    data_dimensions: Vec<usize>,
    slices: Vec<Slice>,
}

impl OriginMetadata {
    /// Fails unless `data_dimensions` is strictly ascending and every index
    /// is within the parent's rank.
    pub fn new(
        parent_shape: Vec<usize>,
        data_dimensions: Vec<usize>,
        slices: Vec<Slice>,
    ) -> Result<Self, DatasetError> {
        let rank = parent_shape.len();
        let ascending = data_dimensions.windows(2).all(|w| w[0] < w[1]);
        if !ascending || data_dimensions.iter().any(|&d| d >= rank) {
            return Err(DatasetError::InvalidDataDimensions {
                dims: data_dimensions,
                rank,
            });
        }
        Ok(OriginMetadata {
            parent_shape,
            data_dimensions,
            slices,
        })
    }

    /// Parent dimension indices the view's dimensions correspond to,
    /// ascending.
    pub fn data_dimensions(&self) -> &[usize] {
        &self.data_dimensions
    }

    /// Full shape of the parent dataset.
    pub fn parent_shape(&self) -> &[usize] {
        &self.parent_shape
    }

    /// Slice descriptors the view was carved with.
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }
}

/// Mask associated with a dataset (non-zero marks a valid element).
#[derive(Debug, Clone, PartialEq)]
pub struct MaskMetadata {
    mask: Dataset,
}

impl MaskMetadata {
    pub fn new(mask: Dataset) -> Self {
        MaskMetadata { mask }
    }

    pub fn mask(&self) -> &Dataset {
        &self.mask
    }
}

/// Per-element error estimates associated with a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorMetadata {
    errors: Dataset,
}

impl ErrorMetadata {
    pub fn new(errors: Dataset) -> Self {
        ErrorMetadata { errors }
    }

    pub fn errors(&self) -> &Dataset {
        &self.errors
    }
}
