//! ndpipe: slice-by-slice processing pipelines for n-dimensional
//! scientific datasets.
//!
//! This crate provides the rank-transformation core of a processing
//! pipeline: operations declare the rank they consume and produce, and a
//! uniform wrapper embeds each raw result back into the full-rank
//! coordinate space of the slice it came from, propagating axis
//! calibration, masks, and provenance metadata through every rank change.
//! A visitor protocol lets external sinks observe and persist each step.

pub mod data;
pub mod error;
pub mod monitor;
pub mod ops;
pub mod pipeline;
