use std::collections::HashMap;
use std::fmt;

use glam::{Mat3, Mat4, Vec4};

use crate::gpu::{BlendMode, DepthState, GpuContext, ProgramId, UniformData, UniformId};
use crate::uniforms::UniformSet;

/// Uniform names the renderer uploads for every draw.
pub mod builtin {
    pub const MODEL: &str = "model";
    pub const VIEW: &str = "view";
    pub const PROJECTION: &str = "projection";
    pub const NORMAL_MATRIX: &str = "normal_matrix";
    pub const LIGHTS_POSITION_TYPE: &str = "lights_position_type";
    pub const LIGHTS_COLOR_RANGE: &str = "lights_color_range";
    pub const AMBIENT_LIGHT: &str = "ambient_light";
}

/// Reasons a [`ShaderDesc`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    EmptyUniformName,
    DuplicateUniformName(String),
    DuplicateLocation { name: String, location: UniformId },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUniformName => f.write_str("uniform name is empty"),
            Self::DuplicateUniformName(name) => write!(f, "uniform `{name}` declared twice"),
            Self::DuplicateLocation { name, location } => {
                write!(f, "uniform `{name}` reuses location {}", location.0)
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// Description of an already-linked program.
///
/// Compilation and linking happen elsewhere; this only records the program handle,
/// where each named uniform lives, and the fixed-function state `bind` applies.
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    pub program: ProgramId,
    pub uniforms: Vec<(String, UniformId)>,
    pub depth: DepthState,
    pub blend: BlendMode,
}

impl ShaderDesc {
    pub fn new(program: ProgramId) -> Self {
        Self {
            program,
            uniforms: Vec::new(),
            depth: DepthState::default(),
            blend: BlendMode::default(),
        }
    }

    pub fn with_uniform(mut self, name: impl Into<String>, location: UniformId) -> Self {
        self.uniforms.push((name.into(), location));
        self
    }

    pub fn with_depth(mut self, depth: DepthState) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}

/// A linked program plus its uniform table and render state.
#[derive(Debug, Clone)]
pub struct Shader {
    program: ProgramId,
    locations: HashMap<String, UniformId>,
    depth: DepthState,
    blend: BlendMode,
}

impl Shader {
    /// Validates `desc`: names must be non-empty and both names and locations unique.
    pub fn new(desc: ShaderDesc) -> Result<Self, ShaderError> {
        let mut locations = HashMap::with_capacity(desc.uniforms.len());
        for (name, location) in desc.uniforms {
            if name.is_empty() {
                return Err(ShaderError::EmptyUniformName);
            }
            if locations.values().any(|&l| l == location) {
                return Err(ShaderError::DuplicateLocation { name, location });
            }
            if locations.contains_key(&name) {
                return Err(ShaderError::DuplicateUniformName(name));
            }
            let _ = locations.insert(name, location);
        }

        Ok(Self {
            program: desc.program,
            locations,
            depth: desc.depth,
            blend: desc.blend,
        })
    }

    #[inline]
    pub fn program(&self) -> ProgramId {
        self.program
    }

    #[inline]
    pub fn depth_state(&self) -> DepthState {
        self.depth
    }

    #[inline]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformId> {
        self.locations.get(name).copied()
    }

    /// Makes this program current and applies its depth and blend state.
    pub fn bind(&self, gpu: &mut GpuContext) {
        gpu.use_program(self.program);
        gpu.set_depth_state(self.depth);
        gpu.set_blend_mode(self.blend);
    }

    /// Uploads a 4×4 matrix. Returns `false` if the program has no uniform `name`.
    pub fn set_matrix4(&self, gpu: &mut GpuContext, name: &str, value: Mat4) -> bool {
        self.upload(gpu, name, UniformData::Mat4(value))
    }

    pub fn set_matrix3(&self, gpu: &mut GpuContext, name: &str, value: Mat3) -> bool {
        self.upload(gpu, name, UniformData::Mat3(value))
    }

    pub fn set_vec4(&self, gpu: &mut GpuContext, name: &str, value: Vec4) -> bool {
        self.upload(gpu, name, UniformData::Vec4(value))
    }

    pub fn set_vec4_array(&self, gpu: &mut GpuContext, name: &str, values: &[Vec4]) -> bool {
        self.upload(gpu, name, UniformData::Vec4Array(values))
    }

    /// Pushes every entry of `uniforms` to this program.
    pub fn set_uniforms(&self, gpu: &mut GpuContext, uniforms: &UniformSet) {
        uniforms.bind(gpu);
    }

    fn upload(&self, gpu: &mut GpuContext, name: &str, data: UniformData<'_>) -> bool {
        match self.uniform_location(name) {
            Some(location) => {
                gpu.upload_uniform(location, data);
                true
            }
            // Optimized-out uniforms are normal, not an error.
            None => false,
        }
    }
}
