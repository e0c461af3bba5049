//! Rank declarations for operations.

use serde::{Deserialize, Serialize};

/// Categorical rank contract an operation declares for its input and
/// output datasets.
///
/// `Same` and `None` carry no concrete value; they are resolved against
/// the actual input rank at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationRank {
    /// No dataset is accepted/produced (scalar-only operations).
    None,
    /// Rank exactly 0.
    Zero,
    /// Output rank equals input rank; value unknown until run time.
    Same,
    /// A concrete rank (1 and 2 are the ones seen in practice).
    Fixed(usize),
}

impl OperationRank {
    /// The declared rank when one is defined without context.
    pub fn rank(&self) -> Option<usize> {
        match self {
            OperationRank::Zero => Some(0),
            OperationRank::Fixed(r) => Some(*r),
            OperationRank::Same | OperationRank::None => Option::None,
        }
    }

    /// Resolve against the actual input rank; `Same` takes that rank,
    /// `None` stays undefined.
    pub fn resolve(&self, actual: usize) -> Option<usize> {
        match self {
            OperationRank::Same => Some(actual),
            _ => self.rank(),
        }
    }

    /// Whether a dataset of the given rank satisfies this declaration.
    pub fn accepts(&self, rank: usize) -> bool {
        match self {
            OperationRank::None => false,
            OperationRank::Same => true,
            _ => self.rank() == Some(rank),
        }
    }
}

impl std::fmt::Display for OperationRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationRank::None => write!(f, "NONE"),
            OperationRank::Zero => write!(f, "ZERO"),
            OperationRank::Same => write!(f, "SAME"),
            OperationRank::Fixed(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_same_takes_actual_rank() {
        assert_eq!(OperationRank::Same.resolve(3), Some(3));
        assert_eq!(OperationRank::Fixed(2).resolve(3), Some(2));
        assert_eq!(OperationRank::Zero.resolve(3), Some(0));
        assert_eq!(OperationRank::None.resolve(3), None);
    }

    #[test]
    fn accepts_matches_declaration() {
        assert!(OperationRank::Same.accepts(5));
        assert!(OperationRank::Fixed(2).accepts(2));
        assert!(!OperationRank::Fixed(2).accepts(1));
        assert!(OperationRank::Zero.accepts(0));
        assert!(!OperationRank::None.accepts(0));
    }

    #[test]
    fn display_names() {
        assert_eq!(OperationRank::Same.to_string(), "SAME");
        assert_eq!(OperationRank::Fixed(2).to_string(), "2");
    }

    #[test]
    fn declarations_persist_as_tagged_json() {
        assert_eq!(
            serde_json::to_string(&OperationRank::Same).unwrap(),
            r#""Same""#
        );
        assert_eq!(
            serde_json::to_string(&OperationRank::Fixed(2)).unwrap(),
            r#"{"Fixed":2}"#
        );
        let back: OperationRank = serde_json::from_str(r#"{"Fixed":1}"#).unwrap();
        assert_eq!(back, OperationRank::Fixed(1));
    }
}
