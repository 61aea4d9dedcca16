use std::rc::Rc;

use glam::{Mat4, Vec4};

use crate::gpu::GpuContext;
use crate::paint::Color;
use crate::uniforms::UniformSet;

use super::shader::Shader;
use super::texture::Texture;

/// A shader shared between draws plus the parameter values of one draw.
///
/// Setters resolve uniform names through the shader; names the program does not
/// declare are ignored and reported by returning `false`.
#[derive(Debug, Clone)]
pub struct Material {
    shader: Rc<Shader>,
    uniforms: UniformSet,
}

impl Material {
    pub fn new(shader: Rc<Shader>) -> Self {
        Self {
            shader,
            uniforms: UniformSet::new(),
        }
    }

    #[inline]
    pub fn shader(&self) -> &Rc<Shader> {
        &self.shader
    }

    #[inline]
    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    #[inline]
    pub fn uniforms_mut(&mut self) -> &mut UniformSet {
        &mut self.uniforms
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        self.resolve(name)
            .map(|id| self.uniforms.set_float(id, value))
            .is_some()
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) -> bool {
        self.resolve(name)
            .map(|id| self.uniforms.set_vec4(id, value))
            .is_some()
    }

    /// Stores `color` converted to linear space.
    pub fn set_color(&mut self, name: &str, color: Color) -> bool {
        self.resolve(name)
            .map(|id| self.uniforms.set_color(id, color))
            .is_some()
    }

    pub fn set_texture(&mut self, name: &str, texture: Rc<Texture>) -> bool {
        self.resolve(name)
            .map(|id| self.uniforms.set_texture(id, texture))
            .is_some()
    }

    pub fn set_matrix_array(&mut self, name: &str, matrices: Rc<[Mat4]>) -> bool {
        self.resolve(name)
            .map(|id| self.uniforms.set_matrix_array(id, matrices))
            .is_some()
    }

    /// Binds the shader and pushes this material's uniforms.
    pub fn bind(&self, gpu: &mut GpuContext) {
        self.shader.bind(gpu);
        self.shader.set_uniforms(gpu, &self.uniforms);
    }

    fn resolve(&self, name: &str) -> Option<crate::gpu::UniformId> {
        let id = self.shader.uniform_location(name);
        if id.is_none() {
            log::debug!("material: shader has no uniform `{name}`");
        }
        id
    }
}
