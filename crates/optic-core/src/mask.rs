//! Activation masks over the raw site table.
//!
//! A mask holds one bit per raw input row, `'1'` meaning active. It is the
//! only artifact handed to external consumers, as a single line of `0`/`1`
//! characters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OpticError, Result};

/// Fixed-length activation mask
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Mask {
    bits: Vec<bool>,
}

impl Mask {
    /// All-zero mask of length `n`
    pub fn zeros(n: usize) -> Self {
        Self {
            bits: vec![false; n],
        }
    }

    /// Map a solver assignment over `candidate_ids` onto a length-`n` mask.
    ///
    /// Fails with [`OpticError::Shape`] when `bits` and `candidate_ids` differ
    /// in length; that is a contract violation, never truncated or padded.
    /// An id `>= n` is a [`OpticError::Validation`] error.
    pub fn encode(n: usize, candidate_ids: &[usize], bits: &[bool]) -> Result<Self> {
        if bits.len() != candidate_ids.len() {
            return Err(OpticError::shape(candidate_ids.len(), bits.len()));
        }
        let mut mask = Self::zeros(n);
        for (&id, &on) in candidate_ids.iter().zip(bits) {
            let slot = mask.bits.get_mut(id).ok_or_else(|| {
                OpticError::validation(format!(
                    "candidate id {} out of range for a {}-site catalog",
                    id, n
                ))
            })?;
            if on {
                *slot = true;
            }
        }
        Ok(mask)
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn is_active(&self, id: usize) -> bool {
        self.bits.get(id).copied().unwrap_or(false)
    }

    /// Ids of active sites, ascending
    pub fn active_ids(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &on)| on)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Check the mask against a catalog of `expected` raw rows
    pub fn validate_against(&self, expected: usize) -> Result<()> {
        if self.bits.len() != expected {
            return Err(OpticError::validation(format!(
                "mask has {} characters but the catalog has {} rows",
                self.bits.len(),
                expected
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.bits {
            f.write_str(if b { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for Mask {
    type Err = OpticError;

    /// Parse a mask line; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let bits = s
            .trim()
            .chars()
            .enumerate()
            .map(|(i, c)| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(OpticError::validation(format!(
                    "invalid mask character {:?} at position {}",
                    other, i
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bits })
    }
}

impl From<Mask> for String {
    fn from(mask: Mask) -> Self {
        mask.to_string()
    }
}

impl TryFrom<String> for Mask {
    type Error = OpticError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_writes_selected_ids() {
        let mask = Mask::encode(6, &[4, 1, 3], &[true, false, true]).unwrap();
        assert_eq!(mask.to_string(), "000110");
        assert_eq!(mask.active_ids(), vec![3, 4]);
        assert!(!mask.is_active(1));
    }

    #[test]
    fn test_length_mismatch_is_shape_error() {
        let err = Mask::encode(4, &[0, 1], &[true]).unwrap_err();
        assert!(matches!(err, OpticError::Shape { expected: 2, got: 1 }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_out_of_range_id() {
        let err = Mask::encode(2, &[2], &[true]).unwrap_err();
        assert!(matches!(err, OpticError::Validation { .. }));
    }

    #[test]
    fn test_empty_catalog() {
        let mask = Mask::encode(0, &[], &[]).unwrap();
        assert!(mask.is_empty());
        assert_eq!(mask.to_string(), "");
        assert!(mask.validate_against(0).is_ok());
    }

    #[test]
    fn test_parse() {
        let mask: Mask = " 0101\n".parse().unwrap();
        assert_eq!(mask.len(), 4);
        assert_eq!(mask.active_count(), 2);
        assert!("01x1".parse::<Mask>().is_err());
    }

    #[test]
    fn test_validate_length() {
        let mask: Mask = "0101".parse().unwrap();
        assert!(mask.validate_against(4).is_ok());
        assert!(matches!(
            mask.validate_against(5),
            Err(OpticError::Validation { .. })
        ));
    }
}
