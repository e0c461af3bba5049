//! The operation contract consumed by the transform engine.

use crate::data::Dataset;
use crate::error::BoxError;
use crate::monitor::Monitor;
use crate::ops::OperationRank;

/// Result of one operation step: a primary dataset plus zero or more
/// auxiliary side-products (fit parameters and the like), each reshaped
/// and annotated independently by the engine.
#[derive(Debug, Clone)]
pub struct OperationData {
    pub data: Dataset,
    pub aux: Vec<Dataset>,
}

impl OperationData {
    /// A result with no auxiliary data.
    pub fn new(data: Dataset) -> Self {
        OperationData {
            data,
            aux: Vec::new(),
        }
    }

    /// A result carrying auxiliary side-products.
    pub fn with_aux(data: Dataset, aux: Vec<Dataset>) -> Self {
        OperationData { data, aux }
    }
}

/// A single transformation in a pipeline.
///
/// Implementations perform the numeric work in [`process`](Self::process)
/// on the squeezed slice view they are handed, and must not attempt
/// full-rank reconciliation themselves: embedding the raw output back into
/// the original coordinate space is the engine's job
/// ([`execute`](crate::ops::execute)).
pub trait Operation {
    /// Identifying name, used to scope errors and log lines.
    fn name(&self) -> &str;

    /// Rank this operation expects its input dataset to have.
    fn input_rank(&self) -> OperationRank;

    /// Rank of the dataset this operation produces.
    fn output_rank(&self) -> OperationRank;

    /// Perform the transformation on a squeezed slice view.
    ///
    /// Long-running implementations should poll the monitor and bail out
    /// early when cancelled. Errors are wrapped with the operation's name
    /// by the engine before they propagate.
    fn process(&self, input: &Dataset, monitor: &dyn Monitor) -> Result<OperationData, BoxError>;
}
