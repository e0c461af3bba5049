//! Sequential and parallel series drivers.
//!
//! [`OperationSeries`] owns an ordered chain of operations and walks a
//! full dataset slice by slice: each view is tagged with origin metadata,
//! threaded through the chain via [`execute`](crate::ops::execute), and
//! reported to the execution visitor. All collaborators are injected; the
//! runner holds no global state.

use std::sync::Mutex;

use log::{debug, trace, warn};
use rayon::prelude::*;

use crate::data::{slice_count, Dataset, DatasetError, Metadata, OriginMetadata, Slice, SliceIter};
use crate::error::PipelineError;
use crate::monitor::Monitor;
use crate::ops::{execute, Operation};
use crate::pipeline::ExecutionVisitor;

/// An ordered chain of operations applied to every slice of a dataset.
pub struct OperationSeries {
    ops: Vec<Box<dyn Operation + Send + Sync>>,
}

impl OperationSeries {
    /// Fails on an empty chain.
    pub fn new(ops: Vec<Box<dyn Operation + Send + Sync>>) -> Result<Self, PipelineError> {
        if ops.is_empty() {
            return Err(PipelineError::EmptySeries);
        }
        Ok(OperationSeries { ops })
    }

    /// Number of operations in the chain.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn op_refs(&self) -> Vec<&dyn Operation> {
        self.ops.iter().map(|op| op.as_ref() as &dyn Operation).collect()
    }

    /// Process every slice sequentially.
    ///
    /// `data_dims` names the parent dimensions each slice occupies whole;
    /// every combination of indices along the other dimensions yields one
    /// slice, processed in ascending odometer order. The visitor is
    /// initialised before the first slice and closed when the run ends,
    /// including on abort. The monitor is checked between slices; a
    /// cancelled run ends with [`PipelineError::Cancelled`].
    pub fn run(
        &self,
        data: &Dataset,
        data_dims: &[usize],
        visitor: &mut dyn ExecutionVisitor,
        monitor: &dyn Monitor,
    ) -> Result<(), PipelineError> {
        let outcome = self.run_inner(data, data_dims, visitor, monitor);
        finish(visitor, outcome)
    }

    fn run_inner(
        &self,
        data: &Dataset,
        data_dims: &[usize],
        visitor: &mut dyn ExecutionVisitor,
        monitor: &dyn Monitor,
    ) -> Result<(), PipelineError> {
        let origin = top_origin(data, data_dims)?;
        visitor
            .init(&self.op_refs(), &origin)
            .map_err(PipelineError::Visitor)?;

        let total = slice_count(data.shape(), data_dims);
        debug!(
            "running {} operations over {total} slices of shape {:?}",
            self.ops.len(),
            data.shape()
        );

        for (index, slices) in SliceIter::new(data.shape(), data_dims).enumerate() {
            if monitor.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            trace!("slice {}/{total}: {:?}", index + 1, slices);
            self.run_slice(data, data_dims, &slices, &mut |event| match event {
                SliceEvent::Intermediate(op, result) => {
                    visitor.notify(op, result, &slices, data.shape(), data_dims);
                    Ok(())
                }
                SliceEvent::Final(result) => visitor
                    .executed(result, monitor, &slices, data.shape(), data_dims)
                    .map_err(PipelineError::Visitor),
            }, monitor)?;
            monitor.worked(1);
        }
        Ok(())
    }

    /// Process independent slices on rayon's thread pool.
    ///
    /// Visitor calls are serialised behind a mutex, but `executed` arrives
    /// in nondeterministic slice order; sinks that care about order should
    /// key off the slice descriptors.
    pub fn run_parallel<V>(
        &self,
        data: &Dataset,
        data_dims: &[usize],
        visitor: &mut V,
        monitor: &(dyn Monitor + Sync),
    ) -> Result<(), PipelineError>
    where
        V: ExecutionVisitor + Send,
    {
        let outcome = self.run_parallel_inner(data, data_dims, visitor, monitor);
        finish(visitor, outcome)
    }

    fn run_parallel_inner<V>(
        &self,
        data: &Dataset,
        data_dims: &[usize],
        visitor: &mut V,
        monitor: &(dyn Monitor + Sync),
    ) -> Result<(), PipelineError>
    where
        V: ExecutionVisitor + Send,
    {
        let origin = top_origin(data, data_dims)?;
        visitor
            .init(&self.op_refs(), &origin)
            .map_err(PipelineError::Visitor)?;

        let all_slices: Vec<Vec<Slice>> = SliceIter::new(data.shape(), data_dims).collect();
        debug!(
            "running {} operations over {} slices in parallel",
            self.ops.len(),
            all_slices.len()
        );

        let shared = Mutex::new(visitor);
        all_slices.par_iter().try_for_each(|slices| {
            if monitor.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            self.run_slice(data, data_dims, slices, &mut |event| {
                let mut visitor = shared
                    .lock()
                    .map_err(|_| PipelineError::Visitor("visitor mutex poisoned".into()))?;
                match event {
                    SliceEvent::Intermediate(op, result) => {
                        visitor.notify(op, result, slices, data.shape(), data_dims);
                        Ok(())
                    }
                    SliceEvent::Final(result) => visitor
                        .executed(result, monitor, slices, data.shape(), data_dims)
                        .map_err(PipelineError::Visitor),
                }
            }, monitor)?;
            monitor.worked(1);
            Ok(())
        })
    }

    fn run_slice(
        &self,
        data: &Dataset,
        data_dims: &[usize],
        slices: &[Slice],
        observe: &mut dyn FnMut(SliceEvent<'_>) -> Result<(), PipelineError>,
        monitor: &dyn Monitor,
    ) -> Result<(), PipelineError> {
        let mut current = data.slice_view(slices)?;
        current.set_metadata(Metadata::Origin(OriginMetadata::new(
            data.shape().to_vec(),
            data_dims.to_vec(),
            slices.to_vec(),
        )?));

        let last = self.ops.len() - 1;
        for (i, op) in self.ops.iter().enumerate() {
            monitor.subtask(op.name());
            let result = execute(op.as_ref(), &current, monitor)?;
            if i == last {
                observe(SliceEvent::Final(&result))?;
            } else {
                observe(SliceEvent::Intermediate(op.as_ref(), &result))?;
                current = result.data;
            }
        }
        Ok(())
    }
}

enum SliceEvent<'a> {
    Intermediate(&'a dyn Operation, &'a crate::ops::OperationData),
    Final(&'a crate::ops::OperationData),
}

/// Origin metadata describing the top-level dataset itself.
fn top_origin(data: &Dataset, data_dims: &[usize]) -> Result<OriginMetadata, PipelineError> {
    if data_dims.is_empty() {
        return Err(PipelineError::Dataset(DatasetError::InvalidDataDimensions {
            dims: Vec::new(),
            rank: data.rank(),
        }));
    }
    let full: Vec<Slice> = data.shape().iter().map(|&s| Slice::all(s)).collect();
    Ok(OriginMetadata::new(
        data.shape().to_vec(),
        data_dims.to_vec(),
        full,
    )?)
}

/// Close the visitor once the run is over, preserving the run's own error.
fn finish(
    visitor: &mut dyn ExecutionVisitor,
    outcome: Result<(), PipelineError>,
) -> Result<(), PipelineError> {
    let closed = visitor.close();
    match outcome {
        Ok(()) => closed.map_err(PipelineError::Visitor),
        Err(e) => {
            if let Err(close_err) = closed {
                warn!("visitor close failed after aborted run: {close_err}");
            }
            Err(e)
        }
    }
}
