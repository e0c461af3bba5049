//! Series drivers and the execution-visitor protocol.

mod runner;
mod visitor;

pub use runner::OperationSeries;
pub use visitor::{CollectingVisitor, ExecutionVisitor, NoopVisitor};
