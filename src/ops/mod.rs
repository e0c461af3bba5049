//! Operations and the rank-transform engine.
//!
//! An [`Operation`] declares the rank it consumes and produces and does
//! its numeric work on a squeezed slice view; [`execute`] wraps every
//! operation uniformly, embedding the raw result back into the slice's
//! full-rank coordinate space with reconciled axes metadata and auxiliary
//! data.

mod operation;
mod rank;
mod transform;

pub use operation::{Operation, OperationData};
pub use rank::OperationRank;
pub use transform::execute;
