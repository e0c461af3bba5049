//! Integration tests for the rank-transform engine.
//!
//! These exercise the full-rank reconciliation contract: shape embedding,
//! rank arithmetic, axes propagation, and auxiliary-data handling.

use approx::assert_relative_eq;

use ndpipe::data::{AxesMetadata, Dataset, Metadata, OriginMetadata, Slice};
use ndpipe::error::{BoxError, OperationError};
use ndpipe::monitor::{Monitor, NullMonitor};
use ndpipe::ops::{execute, Operation, OperationData, OperationRank};

// =============================================================================
// Fixtures
// =============================================================================

/// A dataset tagged as a slice of itself occupying the given parent dims.
fn tagged(data: Dataset, data_dims: &[usize]) -> Dataset {
    let shape = data.shape().to_vec();
    let slices: Vec<Slice> = shape.iter().map(|&s| Slice::all(s)).collect();
    let origin = OriginMetadata::new(shape, data_dims.to_vec(), slices).unwrap();
    let mut data = data;
    data.set_metadata(Metadata::Origin(origin));
    data
}

/// Operation returning a fixed result regardless of input.
struct Fixture {
    name: &'static str,
    input_rank: OperationRank,
    output_rank: OperationRank,
    result: OperationData,
}

impl Operation for Fixture {
    fn name(&self) -> &str {
        self.name
    }

    fn input_rank(&self) -> OperationRank {
        self.input_rank
    }

    fn output_rank(&self) -> OperationRank {
        self.output_rank
    }

    fn process(&self, _input: &Dataset, _monitor: &dyn Monitor) -> Result<OperationData, BoxError> {
        Ok(self.result.clone())
    }
}

/// Rank-preserving operation that scales the squeezed view in place.
struct Scale(f64);

impl Operation for Scale {
    fn name(&self) -> &str {
        "scale"
    }

    fn input_rank(&self) -> OperationRank {
        OperationRank::Same
    }

    fn output_rank(&self) -> OperationRank {
        OperationRank::Same
    }

    fn process(&self, input: &Dataset, _monitor: &dyn Monitor) -> Result<OperationData, BoxError> {
        let values = input.values().iter().map(|v| v * self.0).collect();
        Ok(OperationData::new(Dataset::from_vec(values, input.shape())?))
    }
}

// =============================================================================
// Shape embedding
// =============================================================================

#[test]
fn same_rank_output_embeds_at_active_dims() {
    // input [3,1,5], active dims [0,2], operation output [3,5]
    let slice = tagged(Dataset::zeros(&[3, 1, 5]), &[0, 2]);
    let op = Fixture {
        name: "identity",
        input_rank: OperationRank::Same,
        output_rank: OperationRank::Same,
        result: OperationData::new(Dataset::zeros(&[3, 5])),
    };

    let out = execute(&op, &slice, &NullMonitor).unwrap();
    assert_eq!(out.data.shape(), &[3, 1, 5]);
}

#[test]
fn smoothing_slice_along_second_dim() {
    // input [1,20] carved from a parent along dimension 1
    let row: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let slice = tagged(Dataset::from_vec(row.clone(), &[1, 20]).unwrap(), &[1]);
    let op = Fixture {
        name: "smooth",
        input_rank: OperationRank::Fixed(1),
        output_rank: OperationRank::Fixed(1),
        result: OperationData::new(Dataset::from_vec(row.clone(), &[20]).unwrap()),
    };

    let out = execute(&op, &slice, &NullMonitor).unwrap();
    assert_eq!(out.data.shape(), &[1, 20]);
    assert_eq!(out.data.values(), row);
}

#[test]
fn reduction_rank_is_input_minus_delta() {
    // SAME(3) -> 1 on a rank-3 input, all dims active: 3 - (3-1) = 1
    let slice = tagged(Dataset::zeros(&[4, 5, 6]), &[0, 1, 2]);
    // SAME input resolves to the actual rank 3, so the delta is 3 - 1 = 2
    let op = Fixture {
        name: "collapse",
        input_rank: OperationRank::Same,
        output_rank: OperationRank::Fixed(1),
        result: OperationData::new(Dataset::zeros(&[6])),
    };
    let out = execute(&op, &slice, &NullMonitor).unwrap();
    assert_eq!(out.data.rank(), 1);
    assert_eq!(out.data.shape(), &[6]);
}

#[test]
fn projection_reconciles_to_reduced_rank() {
    // input [10,20,30], active dims [0,1,2], SAME(3) -> 2 projection
    let slice = tagged(Dataset::zeros(&[10, 20, 30]), &[0, 1, 2]);
    let op = Fixture {
        name: "project",
        input_rank: OperationRank::Same,
        output_rank: OperationRank::Fixed(2),
        result: OperationData::new(Dataset::zeros(&[20, 30])),
    };

    let out = execute(&op, &slice, &NullMonitor).unwrap();
    assert_eq!(out.data.rank(), 2);
    assert_eq!(out.data.shape(), &[20, 30]);
}

#[test]
fn full_rank_output_is_returned_unchanged() {
    let slice = tagged(Dataset::zeros(&[3, 1, 5]), &[0, 2]);
    let op = Scale(2.0);

    let first = execute(&op, &slice, &NullMonitor).unwrap();
    assert_eq!(first.data.shape(), &[3, 1, 5]);

    // idempotence: running the engine again does not double-embed
    let second = execute(&op, &first.data, &NullMonitor).unwrap();
    assert_eq!(second.data.shape(), &[3, 1, 5]);
}

#[test]
fn values_survive_reconciliation() {
    let values: Vec<f64> = (0..15).map(|i| i as f64).collect();
    let slice = tagged(Dataset::from_vec(values.clone(), &[3, 1, 5]).unwrap(), &[0, 2]);

    let out = execute(&Scale(2.0), &slice, &NullMonitor).unwrap();
    assert_eq!(out.data.shape(), &[3, 1, 5]);
    for (got, want) in out.data.values().iter().zip(&values) {
        assert_relative_eq!(*got, want * 2.0);
    }
}

// =============================================================================
// Axes metadata propagation
// =============================================================================

fn axes_rank3_for_slice() -> AxesMetadata {
    // axes for a [1,20,30] slice: point axis on dim 0, calibration on 1, 2
    let mut axes = AxesMetadata::with_rank(3);
    axes.set_axis(0, vec![Dataset::from_vec(vec![7.0], &[1]).unwrap()]);
    axes.set_axis(1, vec![Dataset::indices(20)]);
    axes.set_axis(2, vec![Dataset::indices(30)]);
    axes
}

#[test]
fn no_input_axes_means_no_output_axes() {
    let slice = tagged(Dataset::zeros(&[3, 1, 5]), &[0, 2]);
    let op = Fixture {
        name: "identity",
        input_rank: OperationRank::Same,
        output_rank: OperationRank::Same,
        result: OperationData::new(Dataset::zeros(&[3, 5])),
    };

    let out = execute(&op, &slice, &NullMonitor).unwrap();
    assert!(out.data.first_axes_metadata().is_none());
}

#[test]
fn same_rank_remap_installs_operation_axes() {
    let mut input = Dataset::zeros(&[3, 1, 5]);
    let mut in_axes = AxesMetadata::with_rank(3);
    in_axes.set_axis(0, vec![Dataset::indices(3)]);
    in_axes.set_axis(1, vec![Dataset::from_vec(vec![9.0], &[1]).unwrap()]);
    in_axes.set_axis(2, vec![Dataset::indices(5)]);
    input.set_metadata(Metadata::Axes(in_axes));
    let slice = tagged(input, &[0, 2]);

    // operation returns its own calibrated axes for the two active dims
    let mut out_data = Dataset::zeros(&[3, 5]);
    let mut op_axes = AxesMetadata::with_rank(2);
    op_axes.set_axis(0, vec![Dataset::from_vec(vec![0.1, 0.2, 0.3], &[3]).unwrap()]);
    op_axes.set_axis(1, vec![Dataset::indices(5)]);
    out_data.set_metadata(Metadata::Axes(op_axes));

    let op = Fixture {
        name: "recalibrate",
        input_rank: OperationRank::Same,
        output_rank: OperationRank::Same,
        result: OperationData::new(out_data),
    };

    let out = execute(&op, &slice, &NullMonitor).unwrap();
    let axes = out.data.first_axes_metadata().unwrap();
    assert_eq!(axes.rank(), 3);
    // active dim 0 takes the operation's first axis, embedded at rank 3
    assert_eq!(axes.axis(0)[0].shape(), &[3, 1, 1]);
    assert_eq!(axes.axis(0)[0].values(), vec![0.1, 0.2, 0.3]);
    // active dim 2 takes the operation's second axis
    assert_eq!(axes.axis(2)[0].shape(), &[1, 1, 5]);
    // non-active dim 1 keeps the input's own axis
    assert_eq!(axes.axis(1)[0].values(), vec![9.0]);
}

#[test]
fn same_rank_remap_without_operation_axes_installs_placeholders() {
    let mut input = Dataset::zeros(&[3, 1, 5]);
    let mut in_axes = AxesMetadata::with_rank(3);
    in_axes.set_axis(0, vec![Dataset::indices(3)]);
    in_axes.set_axis(1, vec![Dataset::from_vec(vec![9.0], &[1]).unwrap()]);
    in_axes.set_axis(2, vec![Dataset::indices(5)]);
    input.set_metadata(Metadata::Axes(in_axes));
    let slice = tagged(input, &[0, 2]);

    let op = Fixture {
        name: "identity",
        input_rank: OperationRank::Same,
        output_rank: OperationRank::Same,
        result: OperationData::new(Dataset::zeros(&[3, 5])),
    };

    let out = execute(&op, &slice, &NullMonitor).unwrap();
    let axes = out.data.first_axes_metadata().unwrap();
    // active dims get empty placeholders, not blind inheritance
    assert!(axes.axis(0).is_empty());
    assert!(axes.axis(2).is_empty());
    // the non-active dim still carries the input's axis
    assert_eq!(axes.axis(1)[0].values(), vec![9.0]);
}

#[test]
fn reduction_carries_input_axes_for_non_active_dims() {
    // [1,20,30] slice, active dims [1,2], 2 -> 1 integration
    let mut input = Dataset::zeros(&[1, 20, 30]);
    input.set_metadata(Metadata::Axes(axes_rank3_for_slice()));
    let slice = tagged(input, &[1, 2]);

    let mut out_data = Dataset::zeros(&[20]);
    let mut op_axes = AxesMetadata::with_rank(1);
    op_axes.set_axis(0, vec![Dataset::indices(20)]);
    out_data.set_metadata(Metadata::Axes(op_axes));

    let op = Fixture {
        name: "integrate",
        input_rank: OperationRank::Fixed(2),
        output_rank: OperationRank::Fixed(1),
        result: OperationData::new(out_data),
    };

    let out = execute(&op, &slice, &NullMonitor).unwrap();
    assert_eq!(out.data.shape(), &[1, 20]);

    let axes = out.data.first_axes_metadata().unwrap();
    assert_eq!(axes.rank(), 2);
    // dim 0 compacts down the input's own point axis
    assert_eq!(axes.axis(0)[0].values(), vec![7.0]);
    assert_eq!(axes.axis(0)[0].shape(), &[1, 1]);
    // dim 1 takes the operation's output axis
    assert_eq!(axes.axis(1)[0].shape(), &[1, 20]);
}

// =============================================================================
// Auxiliary data
// =============================================================================

#[test]
fn scalar_aux_is_reshaped_to_non_active_rank() {
    // [1,1,6] slice, active dim [2]: aux rank must become 3 - 1 = 2
    let mut input = Dataset::zeros(&[1, 1, 6]);
    let mut in_axes = AxesMetadata::with_rank(3);
    in_axes.set_axis(0, vec![Dataset::from_vec(vec![2.0], &[1]).unwrap()]);
    in_axes.set_axis(1, vec![Dataset::from_vec(vec![9.0], &[1]).unwrap()]);
    in_axes.set_axis(2, vec![Dataset::indices(6)]);
    input.set_metadata(Metadata::Axes(in_axes));
    let slice = tagged(input, &[2]);

    let op = Fixture {
        name: "fit",
        input_rank: OperationRank::Fixed(1),
        output_rank: OperationRank::Fixed(1),
        result: OperationData::with_aux(
            Dataset::zeros(&[6]),
            vec![Dataset::scalar(3.25).with_name("amplitude")],
        ),
    };

    let out = execute(&op, &slice, &NullMonitor).unwrap();
    assert_eq!(out.aux.len(), 1);
    let aux = &out.aux[0];
    assert_eq!(aux.shape(), &[1, 1]);
    assert_eq!(aux.values(), vec![3.25]);
    assert_eq!(aux.name(), Some("amplitude"));

    // aux axes enumerate exactly the non-active input dims, ascending
    let axes = aux.first_axes_metadata().unwrap();
    assert_eq!(axes.rank(), 2);
    assert_eq!(axes.axis(0)[0].values(), vec![2.0]);
    assert_eq!(axes.axis(1)[0].values(), vec![9.0]);
}

#[test]
fn non_scalar_aux_is_left_alone() {
    let slice = tagged(Dataset::zeros(&[1, 6]), &[1]);
    let op = Fixture {
        name: "fit",
        input_rank: OperationRank::Fixed(1),
        output_rank: OperationRank::Fixed(1),
        result: OperationData::with_aux(
            Dataset::zeros(&[6]),
            vec![Dataset::indices(4)],
        ),
    };

    let out = execute(&op, &slice, &NullMonitor).unwrap();
    assert_eq!(out.aux[0].shape(), &[4]);
}

#[test]
fn aux_without_input_axes_gets_no_axes() {
    let slice = tagged(Dataset::zeros(&[1, 6]), &[1]);
    let op = Fixture {
        name: "fit",
        input_rank: OperationRank::Fixed(1),
        output_rank: OperationRank::Fixed(1),
        result: OperationData::with_aux(Dataset::zeros(&[6]), vec![Dataset::scalar(1.0)]),
    };

    let out = execute(&op, &slice, &NullMonitor).unwrap();
    assert_eq!(out.aux[0].shape(), &[1]);
    assert!(out.aux[0].first_axes_metadata().is_none());
}

// =============================================================================
// Failure semantics
// =============================================================================

#[test]
fn output_rank_none_is_rejected_before_processing() {
    struct Exploding;
    impl Operation for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }
        fn input_rank(&self) -> OperationRank {
            OperationRank::Same
        }
        fn output_rank(&self) -> OperationRank {
            OperationRank::None
        }
        fn process(
            &self,
            _input: &Dataset,
            _monitor: &dyn Monitor,
        ) -> Result<OperationData, BoxError> {
            panic!("process must not run for an unreconstructible rank");
        }
    }

    // no origin metadata attached: the rank check must fire first
    let err = execute(&Exploding, &Dataset::zeros(&[4]), &NullMonitor).unwrap_err();
    assert!(matches!(err, OperationError::InvalidOutputRank { .. }));
    assert_eq!(err.operation(), "exploding");
}

#[test]
fn output_rank_above_two_is_rejected() {
    let slice = tagged(Dataset::zeros(&[2, 2, 2]), &[0, 1, 2]);
    let op = Fixture {
        name: "volume",
        input_rank: OperationRank::Same,
        output_rank: OperationRank::Fixed(3),
        result: OperationData::new(Dataset::zeros(&[2, 2, 2])),
    };
    assert!(matches!(
        execute(&op, &slice, &NullMonitor),
        Err(OperationError::InvalidOutputRank { .. })
    ));
}

#[test]
fn output_rank_zero_is_rejected() {
    let op = Fixture {
        name: "scalarize",
        input_rank: OperationRank::Same,
        output_rank: OperationRank::Zero,
        result: OperationData::new(Dataset::scalar(0.0)),
    };
    assert!(matches!(
        execute(&op, &Dataset::zeros(&[4]), &NullMonitor),
        Err(OperationError::InvalidOutputRank { .. })
    ));
}

#[test]
fn input_rank_mismatch_is_rejected_before_processing() {
    struct Strict;
    impl Operation for Strict {
        fn name(&self) -> &str {
            "strict"
        }
        fn input_rank(&self) -> OperationRank {
            OperationRank::Fixed(2)
        }
        fn output_rank(&self) -> OperationRank {
            OperationRank::Fixed(2)
        }
        fn process(
            &self,
            _input: &Dataset,
            _monitor: &dyn Monitor,
        ) -> Result<OperationData, BoxError> {
            panic!("process must not run on a slice of the wrong rank");
        }
    }

    // [1,6] squeezes to rank 1, which a rank-2 operation must not accept
    let slice = tagged(Dataset::zeros(&[1, 6]), &[1]);
    let err = execute(&Strict, &slice, &NullMonitor).unwrap_err();
    assert!(matches!(err, OperationError::InputRankMismatch { .. }));
    assert_eq!(err.operation(), "strict");
}

#[test]
fn missing_origin_metadata_is_an_operation_scoped_error() {
    let err = execute(&Scale(1.0), &Dataset::zeros(&[4]), &NullMonitor).unwrap_err();
    assert!(matches!(err, OperationError::Metadata { .. }));
    assert_eq!(err.operation(), "scale");
}

#[test]
fn process_failure_is_wrapped_with_operation_name() {
    struct Failing;
    impl Operation for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn input_rank(&self) -> OperationRank {
            OperationRank::Same
        }
        fn output_rank(&self) -> OperationRank {
            OperationRank::Same
        }
        fn process(
            &self,
            _input: &Dataset,
            _monitor: &dyn Monitor,
        ) -> Result<OperationData, BoxError> {
            Err("numerical breakdown".into())
        }
    }

    let slice = tagged(Dataset::zeros(&[4]), &[0]);
    let err = execute(&Failing, &slice, &NullMonitor).unwrap_err();
    assert!(matches!(err, OperationError::Process { .. }));
    assert!(err.to_string().contains("failing"));
    assert!(err.to_string().contains("numerical breakdown"));
}
