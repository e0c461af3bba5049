//! Pipeline notification protocol.
//!
//! An [`ExecutionVisitor`] observes a series run: it is initialised once
//! before the first slice, told about every intermediate result, handed
//! each slice's final result, and closed when the run ends. Sinks use it
//! to persist or plot results without the engine knowing about storage.

use crate::data::{Dataset, OriginMetadata, Slice};
use crate::error::BoxError;
use crate::monitor::Monitor;
use crate::ops::{Operation, OperationData};

/// Observer of a pipeline run.
///
/// The runner guarantees: `init` exactly once before any slice, `notify`
/// after every intermediate operation of every slice, `executed` once per
/// slice after the final operation, and `close` exactly once at the end,
/// also when the run aborts. `close` must be safe to call even if `init`
/// never ran.
pub trait ExecutionVisitor {
    /// Called once with the operations that will run and the origin
    /// metadata of the top-level dataset. Failure aborts the whole run.
    fn init(&mut self, series: &[&dyn Operation], origin: &OriginMetadata) -> Result<(), BoxError>;

    /// Called after every intermediate (non-final) operation for every
    /// slice. Side effect only; cannot influence control flow.
    fn notify(
        &mut self,
        operation: &dyn Operation,
        data: &OperationData,
        slices: &[Slice],
        shape: &[usize],
        data_dims: &[usize],
    );

    /// Called once per slice with the final reconciled result. Failure
    /// aborts further slice processing.
    fn executed(
        &mut self,
        result: &OperationData,
        monitor: &dyn Monitor,
        slices: &[Slice],
        shape: &[usize],
        data_dims: &[usize],
    ) -> Result<(), BoxError>;

    /// Release resources acquired in `init`.
    fn close(&mut self) -> Result<(), BoxError>;
}

/// Visitor that observes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVisitor;

impl ExecutionVisitor for NoopVisitor {
    fn init(&mut self, _series: &[&dyn Operation], _origin: &OriginMetadata) -> Result<(), BoxError> {
        Ok(())
    }

    fn notify(
        &mut self,
        _operation: &dyn Operation,
        _data: &OperationData,
        _slices: &[Slice],
        _shape: &[usize],
        _data_dims: &[usize],
    ) {
    }

    fn executed(
        &mut self,
        _result: &OperationData,
        _monitor: &dyn Monitor,
        _slices: &[Slice],
        _shape: &[usize],
        _data_dims: &[usize],
    ) -> Result<(), BoxError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Keep a dataset's final values in memory, one entry per slice.
///
/// Small convenience sink for tests and interactive use; real pipelines
/// stream results to storage instead.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    results: Vec<Dataset>,
    closed: bool,
}

impl CollectingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Final datasets in slice order.
    pub fn results(&self) -> &[Dataset] {
        &self.results
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ExecutionVisitor for CollectingVisitor {
    fn init(&mut self, _series: &[&dyn Operation], _origin: &OriginMetadata) -> Result<(), BoxError> {
        self.results.clear();
        self.closed = false;
        Ok(())
    }

    fn notify(
        &mut self,
        _operation: &dyn Operation,
        _data: &OperationData,
        _slices: &[Slice],
        _shape: &[usize],
        _data_dims: &[usize],
    ) {
    }

    fn executed(
        &mut self,
        result: &OperationData,
        _monitor: &dyn Monitor,
        _slices: &[Slice],
        _shape: &[usize],
        _data_dims: &[usize],
    ) -> Result<(), BoxError> {
        self.results.push(result.data.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.closed = true;
        Ok(())
    }
}
