use std::fmt;

/// Which tracking runtime a session is opened against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VrBackendKind {
    /// Row-major matrix runtime with a separate compositor (`OpenVR`-style).
    OpenVr,
    /// Quaternion pose + FOV-port runtime with texture swap chains (`Oculus`-style).
    Oculus,
}

impl fmt::Display for VrBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenVr => "OpenVR",
            Self::Oculus => "Oculus",
        })
    }
}

/// Session options.
#[derive(Debug, Clone)]
pub struct VrConfig {
    /// Near clip plane in metres.
    pub near: f32,
    /// Far clip plane in metres.
    pub far: f32,
    /// Render target pixels per display pixel at the lens centre (FOV-sized targets only).
    pub pixel_density: f32,
    /// Images per eye swap chain. At least 2.
    pub swap_chain_length: u32,
}

impl Default for VrConfig {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
            pixel_density: 1.0,
            swap_chain_length: 3,
        }
    }
}

impl VrConfig {
    pub(crate) fn sanitized(mut self) -> Self {
        if self.swap_chain_length < 2 {
            log::warn!(
                "swap chain length {} too short, using 2",
                self.swap_chain_length
            );
            self.swap_chain_length = 2;
        }
        if !self.pixel_density.is_finite() || self.pixel_density <= 0.0 {
            log::warn!("pixel density {} invalid, using 1.0", self.pixel_density);
            self.pixel_density = 1.0;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_enforces_double_buffering() {
        let cfg = VrConfig {
            swap_chain_length: 1,
            pixel_density: 0.0,
            ..VrConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.swap_chain_length, 2);
        assert_eq!(cfg.pixel_density, 1.0);
    }
}
