//! Datasets, slicing, and the metadata model.
//!
//! The core abstraction is [`Dataset`], an n-dimensional view over a shared
//! buffer with a kind-keyed metadata collection. [`Slice`]/[`SliceIter`]
//! describe how views are carved from a parent dataset, and the metadata
//! types record axis calibration, provenance, masks, and errors so the
//! transform engine can propagate them through rank changes.

mod dataset;
mod metadata;
pub mod shape;
mod slicing;

pub use dataset::{Dataset, DatasetError};
pub use metadata::{
    AxesMetadata, ErrorMetadata, MaskMetadata, Metadata, MetadataKind, OriginMetadata,
};
pub use slicing::{slice_count, Slice, SliceIter};
