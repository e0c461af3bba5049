//! Pure shape/rank utilities.
//!
//! Helpers over dimension-size sequences and sorted active-dimension index
//! sets. These are the building blocks the rank-transform engine uses to
//! embed lower-rank results back into full-rank coordinate space.

/// Total number of elements implied by a shape.
///
/// The empty shape (rank 0) holds exactly one element.
#[inline]
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Shape with all size-1 dimensions removed.
///
/// A shape of all ones squeezes down to rank 0.
pub fn squeeze(shape: &[usize]) -> Vec<usize> {
    shape.iter().copied().filter(|&s| s != 1).collect()
}

/// Row-major (C order) strides for a contiguous buffer of this shape.
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for d in (0..shape.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * shape[d + 1];
    }
    strides
}

/// Whether `dim` is one of the active dimensions.
///
/// `sorted_dims` must be sorted ascending.
#[inline]
pub fn is_active(sorted_dims: &[usize], dim: usize) -> bool {
    sorted_dims.binary_search(&dim).is_ok()
}

/// Embed an inner shape into an all-ones template of the given rank.
///
/// Slot `data_dims[i]` receives `inner[i]`; every other slot stays 1.
/// Trailing entries of the longer of the two sequences are ignored, as are
/// slots at or beyond `rank` (a following reshape reports the resulting
/// element-count mismatch), so the result always has exactly `rank`
/// dimensions.
pub fn embed(rank: usize, data_dims: &[usize], inner: &[usize]) -> Vec<usize> {
    let mut template = vec![1; rank];
    for i in 0..data_dims.len().min(inner.len()) {
        if data_dims[i] < rank {
            template[data_dims[i]] = inner[i];
        }
    }
    template
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_count_handles_scalars() {
        assert_eq!(element_count(&[]), 1);
        assert_eq!(element_count(&[3, 4]), 12);
        assert_eq!(element_count(&[3, 0, 4]), 0);
    }

    #[test]
    fn squeeze_drops_unit_dims() {
        assert_eq!(squeeze(&[3, 1, 5]), vec![3, 5]);
        assert_eq!(squeeze(&[1, 1]), Vec::<usize>::new());
        assert_eq!(squeeze(&[7]), vec![7]);
    }

    #[test]
    fn strides_are_row_major() {
        assert_eq!(row_major_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(row_major_strides(&[5]), vec![1]);
        assert_eq!(row_major_strides(&[]), Vec::<usize>::new());
    }

    #[test]
    fn active_dim_lookup() {
        assert!(is_active(&[0, 2], 0));
        assert!(!is_active(&[0, 2], 1));
        assert!(is_active(&[0, 2], 2));
        assert!(!is_active(&[], 0));
    }

    #[test]
    fn embed_places_extents_at_active_dims() {
        assert_eq!(embed(3, &[0, 2], &[3, 5]), vec![3, 1, 5]);
        assert_eq!(embed(2, &[1], &[20]), vec![1, 20]);
        // extra inner extents beyond the active dims are dropped
        assert_eq!(embed(2, &[0], &[4, 9]), vec![4, 1]);
        // slots beyond the template rank are ignored
        assert_eq!(embed(1, &[1, 2], &[20, 30]), vec![1]);
    }
}
