/// Counters for one frame. Reset by `swap_window`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Number of frames presented before this one.
    pub frame_index: u64,
    pub clears: u32,
    pub draw_calls: u32,
    /// Draws dropped because of a configuration fault.
    pub skipped_draws: u32,
}

impl RenderStats {
    pub(crate) fn next_frame(&self) -> Self {
        Self {
            frame_index: self.frame_index + 1,
            ..Self::default()
        }
    }
}
