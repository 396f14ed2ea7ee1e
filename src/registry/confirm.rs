//! Caller-supplied confirmation policy and index selections.

use crate::{FeederError, Result};

/// Answers yes/no questions before destructive registry operations.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Confirms everything; for non-interactive use.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Declines everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Which registry positions an operation addresses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    One(usize),
    /// Exactly these positions, in this order.
    Many(Vec<usize>),
}

impl Selection {
    /// Resolve against a list of `len` entries.
    ///
    /// Fails if any position is out of range.
    pub fn resolve(&self, len: usize) -> Result<Vec<usize>> {
        let indices = match self {
            Selection::All => return Ok((0..len).collect()),
            Selection::One(index) => vec![*index],
            Selection::Many(indices) => indices.clone(),
        };

        if let Some(bad) = indices.iter().find(|&&index| index >= len) {
            return Err(FeederError::Validation(format!(
                "index {} out of range (count {})",
                bad, len
            )));
        }
        Ok(indices)
    }
}

impl From<usize> for Selection {
    fn from(index: usize) -> Self {
        Selection::One(index)
    }
}

impl From<Vec<usize>> for Selection {
    fn from(indices: Vec<usize>) -> Self {
        Selection::Many(indices)
    }
}

impl From<&[usize]> for Selection {
    fn from(indices: &[usize]) -> Self {
        Selection::Many(indices.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Selection {
    fn from(indices: [usize; N]) -> Self {
        Selection::Many(indices.to_vec())
    }
}

impl From<Option<usize>> for Selection {
    fn from(index: Option<usize>) -> Self {
        index.map_or(Selection::All, Selection::One)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_policies() {
        assert!(AlwaysConfirm.confirm("sure?"));
        assert!(!NeverConfirm.confirm("sure?"));

        let only_overwrite = |prompt: &str| prompt.contains("overwrite");
        assert!(only_overwrite.confirm("overwrite?"));
        assert!(!only_overwrite.confirm("delete?"));
    }

    #[test]
    fn test_resolve_all() {
        assert_eq!(Selection::All.resolve(3).unwrap(), vec![0, 1, 2]);
        assert!(Selection::All.resolve(0).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_keeps_given_order() {
        assert_eq!(Selection::from([2usize, 0, 1]).resolve(3).unwrap(), vec![2, 0, 1]);
        assert_eq!(Selection::from(1usize).resolve(3).unwrap(), vec![1]);
    }

    #[test]
    fn test_resolve_out_of_range() {
        let result = Selection::from(vec![0usize, 3]).resolve(3);
        assert!(matches!(result, Err(FeederError::Validation(_))));
        assert!(Selection::One(0).resolve(0).is_err());
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Selection::from(None), Selection::All);
        assert_eq!(Selection::from(Some(4usize)), Selection::One(4));
    }
}
