use std::fmt;

/// One of the two views of a stereo frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// Render order used by every backend.
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    /// Index into per-eye arrays: left = 0, right = 1.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }

    #[inline]
    pub const fn is_left(self) -> bool {
        matches!(self, Eye::Left)
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Eye::Left => "left",
            Eye::Right => "right",
        })
    }
}
