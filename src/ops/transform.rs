//! Rank-transform engine.
//!
//! Every operation step runs through [`execute`]: the slice view is
//! squeezed, the operation's `process` does the numeric work on it, and
//! the raw output is then embedded back into the slice's original
//! full-rank coordinate space. That embedding recomputes the primary
//! dataset's shape from the slice's active dimensions, rebuilds its axes
//! metadata from the operation's own axis outputs and the input's cloned
//! axes, and reconciles every scalar auxiliary output independently.

use log::{debug, trace};

use crate::data::{shape, AxesMetadata, Dataset, Metadata, MetadataKind};
use crate::error::OperationError;
use crate::monitor::Monitor;
use crate::ops::{Operation, OperationData, OperationRank};

/// Run one operation on a tagged slice and reconcile its output to full
/// rank.
///
/// The slice must carry origin metadata identifying its data dimensions in
/// the parent coordinate space, and its squeezed view must satisfy the
/// operation's declared input rank. Output ranks of `Zero`, `None`, or a
/// fixed rank above 2 are rejected as unreconstructible. Rank-expanding
/// operations (declared output rank above the input rank) are known to
/// get unreliable axis assignment; treat it as undefined.
pub fn execute(
    op: &dyn Operation,
    slice: &Dataset,
    monitor: &dyn Monitor,
) -> Result<OperationData, OperationError> {
    let declared_out = op.output_rank();
    if matches!(declared_out, OperationRank::Zero | OperationRank::None)
        || matches!(declared_out, OperationRank::Fixed(r) if r > 2)
    {
        return Err(OperationError::InvalidOutputRank {
            operation: op.name().to_string(),
            declared: declared_out,
        });
    }

    let view = slice.squeezed();

    let declared_in = op.input_rank();
    if !declared_in.accepts(view.rank()) {
        return Err(OperationError::InputRankMismatch {
            operation: op.name().to_string(),
            declared: declared_in,
            actual: view.rank(),
        });
    }

    let mut output = op
        .process(&view, monitor)
        .map_err(|e| OperationError::process(op.name(), e))?;

    let origin = slice
        .origin_metadata()
        .cloned()
        .ok_or_else(|| OperationError::metadata(op.name(), "input slice carries no origin metadata"))?;
    output.data.set_metadata(Metadata::Origin(origin));

    update_to_full_rank(op, output, slice)
}

fn update_to_full_rank(
    op: &dyn Operation,
    mut output: OperationData,
    original: &Dataset,
) -> Result<OperationData, OperationError> {
    let outr = output.data.rank();
    let inr = original.rank();

    // execute has already rejected Zero/None and fixed ranks above 2
    let declared_out = op.output_rank();
    let rank_delta: isize = if let OperationRank::Fixed(out_decl) = declared_out {
        let in_decl = op
            .input_rank()
            .resolve(inr)
            .ok_or_else(|| OperationError::UnresolvedInputRank {
                operation: op.name().to_string(),
            })?;
        in_decl as isize - out_decl as isize
    } else {
        0
    };

    // Already at the slice's rank: nothing to remap.
    if inr == outr {
        return Ok(output);
    }

    let full_rank = usize::try_from(inr as isize - rank_delta).map_err(|_| {
        OperationError::metadata(
            op.name(),
            format!("rank delta {rank_delta} exceeds input rank {inr}"),
        )
    })?;

    let mut data_dims = original
        .origin_metadata()
        .ok_or_else(|| OperationError::metadata(op.name(), "input slice carries no origin metadata"))?
        .data_dimensions()
        .to_vec();
    data_dims.sort_unstable();

    debug!(
        "{}: reconciling output rank {} to full rank {} (input rank {}, active dims {:?})",
        op.name(),
        outr,
        full_rank,
        inr,
        data_dims
    );

    let mut cor_meta: Option<AxesMetadata> = None;
    if let Some(in_meta) = original.first_axes_metadata().cloned() {
        let ax_out = output.data.first_axes_metadata().cloned();
        let in_res = op.input_rank().resolve(inr).unwrap_or(inr);
        let out_res = declared_out.resolve(inr).unwrap_or(inr);

        let reconciled = if in_res == out_res {
            trace!("{}: same-rank axes remap", op.name());
            same_rank_axes(op, in_meta, ax_out.as_ref(), &data_dims, inr, outr)?
        } else if in_res > out_res {
            trace!("{}: rank-reducing axes remap", op.name());
            reduced_axes(op, &in_meta, ax_out.as_ref(), &data_dims, inr, rank_delta, full_rank)?
        } else {
            trace!("{}: rank-expanding axes remap (unreliable)", op.name());
            expanded_axes(op, &in_meta, ax_out.as_ref(), &data_dims, rank_delta, full_rank)?
        };
        cor_meta = Some(reconciled);
        output.data.clear_metadata(MetadataKind::Axes);
    }

    update_primary_shape(op, &mut output.data, full_rank, &data_dims)?;
    if let Some(cor) = cor_meta {
        output.data.add_metadata(Metadata::Axes(cor));
    }

    update_aux_data(op, &mut output.aux, original)?;

    Ok(output)
}

/// Axis list for a dimension, with out-of-range access reported as an
/// operation-scoped metadata failure instead of a panic.
fn axis_slot<'a>(
    op: &dyn Operation,
    meta: &'a AxesMetadata,
    dim: usize,
) -> Result<&'a [Dataset], OperationError> {
    if dim < meta.rank() {
        Ok(meta.axis(dim))
    } else {
        Err(OperationError::metadata(
            op.name(),
            format!(
                "axes metadata of rank {} has no slot for dimension {dim}",
                meta.rank()
            ),
        ))
    }
}

fn set_slot(
    op: &dyn Operation,
    meta: &mut AxesMetadata,
    dim: usize,
    axes: Vec<Dataset>,
) -> Result<(), OperationError> {
    if dim < meta.rank() {
        meta.set_axis(dim, axes);
        Ok(())
    } else {
        Err(OperationError::metadata(
            op.name(),
            format!(
                "cannot install axis at dimension {dim} of rank-{} axes metadata",
                meta.rank()
            ),
        ))
    }
}

/// Squeeze one axis dataset and reshape it into an all-ones template of
/// the given rank with its extent placed at `dim`.
fn embed_axis(
    op: &dyn Operation,
    axis: &Dataset,
    rank: usize,
    dim: usize,
) -> Result<Dataset, OperationError> {
    let squeezed = axis.squeezed();
    let mut template = vec![1usize; rank];
    if dim < rank {
        template[dim] = squeezed.shape().first().copied().unwrap_or(1);
    }
    squeezed
        .reshaped(&template)
        .map_err(|e| OperationError::metadata(op.name(), e))
}

/// Declared input and output rank are equal but the raw output rank
/// differs from the slice rank after squeezing.
///
/// Starts from a clone of the input's axes; each active dimension, paired
/// in order with the operation's own output axis slots, takes the
/// operation's axes embedded at its position, or an empty placeholder when
/// the operation produced none.
fn same_rank_axes(
    op: &dyn Operation,
    mut cor: AxesMetadata,
    ax_out: Option<&AxesMetadata>,
    data_dims: &[usize],
    inr: usize,
    outr: usize,
) -> Result<AxesMetadata, OperationError> {
    let mut consumed = 0usize;
    for &i in data_dims {
        if consumed >= outr {
            continue;
        }
        let mut axes: Option<Vec<Dataset>> = None;
        if let Some(ax) = ax_out {
            let slot = axis_slot(op, ax, consumed)?;
            consumed += 1;
            let mut list = Vec::with_capacity(slot.len());
            for axis in slot {
                list.push(embed_axis(op, axis, inr, i)?);
            }
            axes = Some(list);
        }
        set_slot(op, &mut cor, i, axes.unwrap_or_default())?;
    }
    Ok(cor)
}

/// Output rank is smaller than the input rank (reduction).
///
/// Builds fresh axes at the reduced rank: up to `rank_delta` consumed
/// slots take the operation's own axis output at the active dimensions;
/// the remaining non-active dimensions carry the input's own axes,
/// squeezed and compacted down by the number of consumed slots.
fn reduced_axes(
    op: &dyn Operation,
    in_meta: &AxesMetadata,
    ax_out: Option<&AxesMetadata>,
    data_dims: &[usize],
    inr: usize,
    rank_delta: isize,
    new_rank: usize,
) -> Result<AxesMetadata, OperationError> {
    let mut cor = AxesMetadata::with_rank(new_rank);
    let mut consumed = 0usize;
    for i in 0..inr {
        if shape::is_active(data_dims, i) || ax_out.is_none() {
            if (consumed as isize) < rank_delta {
                let mut axes: Option<Vec<Dataset>> = None;
                if let Some(ax) = ax_out {
                    let slot = axis_slot(op, ax, consumed)?;
                    consumed += 1;
                    let mut list = Vec::with_capacity(slot.len());
                    for axis in slot {
                        list.push(embed_axis(op, axis, new_rank, i)?);
                    }
                    axes = Some(list);
                }
                if i < new_rank {
                    cor.set_axis(i, axes.unwrap_or_default());
                }
            }
        } else {
            let slot = axis_slot(op, in_meta, i)?;
            let mut list = Vec::with_capacity(slot.len());
            for axis in slot {
                list.push(embed_axis(op, axis, new_rank, i)?);
            }
            set_slot(op, &mut cor, i - consumed, list)?;
        }
    }
    Ok(cor)
}

/// Output rank is larger than the input rank (expansion).
///
/// This construction is incomplete for rank-expanding operations; the
/// axis-assignment order here is undefined pending domain clarification
/// and must not be relied on.
fn expanded_axes(
    op: &dyn Operation,
    in_meta: &AxesMetadata,
    ax_out: Option<&AxesMetadata>,
    data_dims: &[usize],
    rank_delta: isize,
    new_rank: usize,
) -> Result<AxesMetadata, OperationError> {
    let mut cor = AxesMetadata::with_rank(new_rank);
    // never advances in the expanding branch
    let consumed = 0usize;
    for i in 0..new_rank {
        if (!shape::is_active(data_dims, i) || ax_out.is_none()) && (consumed as isize) > rank_delta
        {
            let mut axes: Vec<Dataset> = Vec::new();
            if let Some(ax) = ax_out {
                let slot = axis_slot(op, ax, i)?;
                for axis in slot {
                    axes.push(embed_axis(op, axis, new_rank, i)?);
                }
            }
            set_slot(op, &mut cor, i, axes)?;
        } else {
            let mut axes: Vec<Dataset> = Vec::new();
            if ax_out.is_some() {
                let slot = axis_slot(op, in_meta, i)?;
                for axis in slot {
                    axes.push(embed_axis(op, axis, new_rank, i)?);
                }
            }
            set_slot(op, &mut cor, i - consumed, axes)?;
        }
    }
    Ok(cor)
}

/// Recompute the primary dataset's full-rank shape: squeeze the raw
/// output, then embed its extents at the active dimensions of an all-ones
/// template.
fn update_primary_shape(
    op: &dyn Operation,
    data: &mut Dataset,
    rank: usize,
    data_dims: &[usize],
) -> Result<(), OperationError> {
    let squeezed = data.squeezed();
    let template = shape::embed(rank, data_dims, squeezed.shape());
    *data = squeezed
        .reshaped(&template)
        .map_err(|e| OperationError::metadata(op.name(), e))?;
    Ok(())
}

/// Reconcile scalar auxiliary outputs.
///
/// Only rank-0 entries are touched: each is reshaped to an all-ones shape
/// of rank `input_rank - active_dim_count` (the active-dim set collapses
/// to its first entry when it exceeds the declared output rank), and its
/// axes metadata is rebuilt from the input's non-active dimensions in
/// ascending order.
fn update_aux_data(
    op: &dyn Operation,
    aux: &mut [Dataset],
    original: &Dataset,
) -> Result<(), OperationError> {
    if aux.is_empty() {
        return Ok(());
    }

    let origin = original
        .origin_metadata()
        .ok_or_else(|| OperationError::metadata(op.name(), "input slice carries no origin metadata"))?;
    let mut data_dims = origin.data_dimensions().to_vec();

    if let Some(out_res) = op.output_rank().resolve(original.rank()) {
        if data_dims.len() > out_res {
            data_dims.truncate(1);
        }
    }
    data_dims.sort_unstable();

    let aux_rank = original.rank() - data_dims.len();
    let ones = vec![1usize; aux_rank];
    let in_meta = original.first_axes_metadata();

    for ds in aux.iter_mut() {
        if ds.rank() != 0 {
            continue;
        }
        let mut reconciled = ds
            .reshaped(&ones)
            .map_err(|e| OperationError::metadata(op.name(), e))?;

        if let Some(in_meta) = in_meta {
            let mut out_meta = AxesMetadata::with_rank(aux_rank);
            let mut counter = 0usize;
            for j in 0..original.rank() {
                if shape::is_active(&data_dims, j) {
                    continue;
                }
                let slot = if j < in_meta.rank() {
                    in_meta.axis(j)
                } else {
                    &[]
                };
                if let Some(first) = slot.first() {
                    let view = first
                        .reshaped(&ones)
                        .map_err(|e| OperationError::metadata(op.name(), e))?;
                    out_meta.set_axis(counter, vec![view]);
                    counter += 1;
                }
            }
            reconciled.set_metadata(Metadata::Axes(out_meta));
        }
        *ds = reconciled;
    }

    Ok(())
}
