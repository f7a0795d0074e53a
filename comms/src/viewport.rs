use serde::{Deserialize, Serialize};

/// Width and height of a client's drawing surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub w: u32,
    pub h: u32,
}

impl Viewport {
    /// A viewport is only meaningful when both dimensions are positive
    pub fn is_valid(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Componentwise minimum of two viewports
    pub fn min(self, other: Viewport) -> Viewport {
        Viewport {
            w: self.w.min(other.w),
            h: self.h.min(other.h),
        }
    }
}
