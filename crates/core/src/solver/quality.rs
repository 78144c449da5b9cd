//! Quality presets for grid resolution
//!
//! Higher quality means a finer grid. Cost grows with `N²` per relaxation sweep.

use serde::{Deserialize, Serialize};

/// Quality preset determining grid resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityPreset {
    /// 256×256 interior
    Ultra,
    /// 128×128 interior
    High,
    /// 64×64 interior
    Medium,
    /// 32×32 interior
    Low,
}

impl QualityPreset {
    /// Interior grid size `N` for this preset
    ///
    /// # Returns
    ///
    /// Cells per side, excluding the ghost border
    #[must_use]
    pub const fn grid_size(&self) -> usize {
        match self {
            Self::Ultra => 256,
            Self::High => 128,
            Self::Medium => 64,
            Self::Low => 32,
        }
    }

    /// Recommended preset for interactive use
    ///
    /// # Returns
    ///
    /// Recommended quality preset
    #[must_use]
    pub fn recommended() -> Self {
        Self::Medium
    }
}
