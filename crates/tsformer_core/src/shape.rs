//! Per-sample input shape.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Shape of one time-series sample, `(V, L)` in the workspace convention.
///
/// Models are built for a fixed shape: the positional tables have one row per patch,
/// so the patch count must be known at construction time.
///
/// # Example
///
/// ```rust
/// use tsformer_core::SeriesShape;
///
/// let shape = SeriesShape::new(4, 23);
/// assert_eq!(shape.n_vars(), 4);
/// assert_eq!(shape.seq_len(), 23);
/// assert_eq!(shape.n_patches(5).unwrap(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesShape {
    n_vars: usize,
    seq_len: usize,
}

impl SeriesShape {
    /// Create a shape from the variable count and sequence length.
    #[must_use]
    pub const fn new(n_vars: usize, seq_len: usize) -> Self {
        Self { n_vars, seq_len }
    }

    /// Build from a channels-last `(L, V)` pair, as series are often described.
    #[must_use]
    pub const fn from_channels_last(seq_len: usize, n_vars: usize) -> Self {
        Self { n_vars, seq_len }
    }

    /// Number of variables per timestep.
    #[must_use]
    pub const fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// Number of timesteps.
    #[must_use]
    pub const fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Number of contiguous patches of `patch_len` timesteps.
    ///
    /// Trailing timesteps that do not fill a whole patch are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if `patch_len` is zero or longer than the sequence.
    pub fn n_patches(&self, patch_len: usize) -> Result<usize> {
        if patch_len == 0 {
            return Err(CoreError::InvalidConfig(
                "patch_len must be greater than zero".to_string(),
            ));
        }
        if patch_len > self.seq_len {
            return Err(CoreError::InvalidConfig(format!(
                "patch_len {} exceeds sequence length {}",
                patch_len, self.seq_len
            )));
        }
        Ok(self.seq_len / patch_len)
    }

    /// Timesteps dropped when splitting into patches of `patch_len`.
    #[must_use]
    pub fn truncated_steps(&self, patch_len: usize) -> usize {
        if patch_len == 0 {
            return 0;
        }
        self.seq_len % patch_len
    }

    /// Check that a batch dims slice `[B, V, L]` matches this shape.
    ///
    /// # Errors
    ///
    /// Returns an error when the rank is not 3 or `V`/`L` differ.
    pub fn check_batch_dims(&self, dims: &[usize]) -> Result<()> {
        if dims.len() != 3 || dims[1] != self.n_vars || dims[2] != self.seq_len {
            return Err(CoreError::InvalidShape {
                expected: format!("(B, {}, {})", self.n_vars, self.seq_len),
                got: format!("{:?}", dims),
            });
        }
        Ok(())
    }

    /// Check that the shape has at least one variable and one timestep.
    ///
    /// # Errors
    ///
    /// Returns an error when either dimension is zero.
    pub fn validate(&self) -> Result<()> {
        if self.n_vars == 0 || self.seq_len == 0 {
            return Err(CoreError::InvalidShape {
                expected: "non-empty (V, L)".to_string(),
                got: format!("({}, {})", self.n_vars, self.seq_len),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for SeriesShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(V={}, L={})", self.n_vars, self.seq_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n_patches_floor() {
        let shape = SeriesShape::new(4, 23);
        assert_eq!(shape.n_patches(1).unwrap(), 23);
        assert_eq!(shape.n_patches(4).unwrap(), 5);
        assert_eq!(shape.truncated_steps(4), 3);
        assert_eq!(shape.n_patches(23).unwrap(), 1);
    }

    #[test]
    fn test_n_patches_rejects_bad_patch_len() {
        let shape = SeriesShape::new(4, 23);
        assert!(shape.n_patches(0).is_err());
        assert!(shape.n_patches(24).is_err());
    }

    #[test]
    fn test_check_batch_dims() {
        let shape = SeriesShape::from_channels_last(23, 4);
        assert!(shape.check_batch_dims(&[8, 4, 23]).is_ok());
        assert!(shape.check_batch_dims(&[8, 23, 4]).is_err());
        assert!(shape.check_batch_dims(&[4, 23]).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(SeriesShape::new(1, 1).validate().is_ok());
        assert!(SeriesShape::new(0, 10).validate().is_err());
    }
}
