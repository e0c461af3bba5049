//! Slice descriptors and slice iteration.
//!
//! A pipeline run walks a full dataset one view at a time: the active
//! ("data") dimensions are taken whole, and every combination of indices
//! along the remaining dimensions produces one slice. [`SliceIter`] yields
//! those combinations in ascending odometer order, which is the sequential
//! order the runner processes them in.

use serde::{Deserialize, Serialize};

use crate::data::shape;

/// Half-open, strided range over a single dimension.
///
/// Covers indices `start, start + step, ...` up to but excluding `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slice {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl Slice {
    /// A slice with an explicit step.
    pub fn new(start: usize, stop: usize, step: usize) -> Self {
        Slice { start, stop, step }
    }

    /// The whole extent of a dimension of the given size.
    pub fn all(size: usize) -> Self {
        Slice {
            start: 0,
            stop: size,
            step: 1,
        }
    }

    /// A single index along a dimension.
    pub fn at(index: usize) -> Self {
        Slice {
            start: index,
            stop: index + 1,
            step: 1,
        }
    }

    /// Number of indices the slice covers.
    pub fn len(&self) -> usize {
        if self.stop <= self.start || self.step == 0 {
            0
        } else {
            (self.stop - self.start).div_ceil(self.step)
        }
    }

    /// Whether the slice covers no indices.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.step == 1 {
            write!(f, "{}:{}", self.start, self.stop)
        } else {
            write!(f, "{}:{}:{}", self.start, self.stop, self.step)
        }
    }
}

/// Number of slices a run over `shape` with the given active dims visits.
pub fn slice_count(shape: &[usize], data_dims: &[usize]) -> usize {
    shape
        .iter()
        .enumerate()
        .filter(|(d, _)| !shape::is_active(data_dims, *d))
        .map(|(_, &s)| s)
        .product()
}

/// Iterator over per-slice descriptors.
///
/// Active dimensions always get their full extent; the other dimensions are
/// single indices advanced last-dimension-fastest.
#[derive(Debug, Clone)]
pub struct SliceIter {
    shape: Vec<usize>,
    data_dims: Vec<usize>,
    cursor: Vec<usize>,
    remaining: usize,
}

impl SliceIter {
    /// `data_dims` must be sorted ascending and in range for `shape`.
    pub fn new(shape: &[usize], data_dims: &[usize]) -> Self {
        SliceIter {
            shape: shape.to_vec(),
            data_dims: data_dims.to_vec(),
            cursor: vec![0; shape.len()],
            remaining: slice_count(shape, data_dims),
        }
    }
}

impl Iterator for SliceIter {
    type Item = Vec<Slice>;

    fn next(&mut self) -> Option<Vec<Slice>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let slices: Vec<Slice> = self
            .shape
            .iter()
            .enumerate()
            .map(|(d, &size)| {
                if shape::is_active(&self.data_dims, d) {
                    Slice::all(size)
                } else {
                    Slice::at(self.cursor[d])
                }
            })
            .collect();

        // advance the odometer over the non-active dims
        for d in (0..self.shape.len()).rev() {
            if shape::is_active(&self.data_dims, d) {
                continue;
            }
            self.cursor[d] += 1;
            if self.cursor[d] < self.shape[d] {
                break;
            }
            self.cursor[d] = 0;
        }

        Some(slices)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SliceIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_lengths() {
        assert_eq!(Slice::all(10).len(), 10);
        assert_eq!(Slice::at(3).len(), 1);
        assert_eq!(Slice::new(0, 10, 3).len(), 4);
        assert!(Slice::new(5, 5, 1).is_empty());
    }

    #[test]
    fn display_format() {
        assert_eq!(Slice::all(4).to_string(), "0:4");
        assert_eq!(Slice::new(1, 9, 2).to_string(), "1:9:2");
    }

    #[test]
    fn descriptors_persist_as_plain_json() {
        let s = Slice::new(1, 9, 2);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"start":1,"stop":9,"step":2}"#);
        let back: Slice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn counts_non_active_combinations() {
        assert_eq!(slice_count(&[10, 20, 30], &[2]), 200);
        assert_eq!(slice_count(&[10, 20], &[0, 1]), 1);
        assert_eq!(slice_count(&[4], &[]), 4);
    }

    #[test]
    fn iterates_in_odometer_order() {
        let all: Vec<Vec<Slice>> = SliceIter::new(&[2, 3, 4], &[2]).collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], vec![Slice::at(0), Slice::at(0), Slice::all(4)]);
        assert_eq!(all[1], vec![Slice::at(0), Slice::at(1), Slice::all(4)]);
        assert_eq!(all[3], vec![Slice::at(1), Slice::at(0), Slice::all(4)]);
        assert_eq!(all[5], vec![Slice::at(1), Slice::at(2), Slice::all(4)]);
    }

    #[test]
    fn all_dims_active_yields_one_full_slice() {
        let all: Vec<Vec<Slice>> = SliceIter::new(&[5, 6], &[0, 1]).collect();
        assert_eq!(all, vec![vec![Slice::all(5), Slice::all(6)]]);
    }
}
