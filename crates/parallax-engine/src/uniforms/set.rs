use std::collections::BTreeMap;
use std::rc::Rc;

use glam::{Mat4, Vec4};

use crate::gpu::{GpuContext, UniformData, UniformId};
use crate::paint::Color;
use crate::resource::Texture;

/// Typed uniform-id → value store.
///
/// An id lives in at most one of the four mappings; setting it in one removes it from
/// the others. Mappings are ordered by id, so [`bind`](Self::bind) visits entries and
/// assigns texture units in the same order on every call with the same key set.
#[derive(Debug, Clone, Default)]
pub struct UniformSet {
    floats: BTreeMap<UniformId, f32>,
    vec4s: BTreeMap<UniformId, Vec4>,
    textures: BTreeMap<UniformId, Rc<Texture>>,
    matrix_arrays: BTreeMap<UniformId, Rc<[Mat4]>>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_float(&mut self, id: UniformId, value: f32) {
        self.evict(id);
        let _ = self.floats.insert(id, value);
    }

    pub fn set_vec4(&mut self, id: UniformId, value: Vec4) {
        self.evict(id);
        let _ = self.vec4s.insert(id, value);
    }

    /// Stores `color` as a linear-space vec4.
    pub fn set_color(&mut self, id: UniformId, color: Color) {
        self.set_vec4(id, color.to_linear());
    }

    pub fn set_texture(&mut self, id: UniformId, texture: Rc<Texture>) {
        self.evict(id);
        let _ = self.textures.insert(id, texture);
    }

    pub fn set_matrix_array(&mut self, id: UniformId, matrices: Rc<[Mat4]>) {
        self.evict(id);
        let _ = self.matrix_arrays.insert(id, matrices);
    }

    pub fn remove(&mut self, id: UniformId) -> bool {
        self.evict(id)
    }

    pub fn float(&self, id: UniformId) -> Option<f32> {
        self.floats.get(&id).copied()
    }

    pub fn vec4(&self, id: UniformId) -> Option<Vec4> {
        self.vec4s.get(&id).copied()
    }

    pub fn texture(&self, id: UniformId) -> Option<&Rc<Texture>> {
        self.textures.get(&id)
    }

    pub fn matrix_array(&self, id: UniformId) -> Option<&Rc<[Mat4]>> {
        self.matrix_arrays.get(&id)
    }

    pub fn contains(&self, id: UniformId) -> bool {
        self.floats.contains_key(&id)
            || self.vec4s.contains_key(&id)
            || self.textures.contains_key(&id)
            || self.matrix_arrays.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.floats.len() + self.vec4s.len() + self.textures.len() + self.matrix_arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties every mapping. GPU state is untouched until the next `bind`.
    pub fn clear(&mut self) {
        self.floats.clear();
        self.vec4s.clear();
        self.textures.clear();
        self.matrix_arrays.clear();
    }

    /// Uploads every entry into the currently bound program.
    ///
    /// Textures are bound to units `0..n` in id order and their uniform receives the
    /// unit index.
    pub fn bind(&self, gpu: &mut GpuContext) {
        for (&id, &value) in &self.floats {
            gpu.upload_uniform(id, UniformData::Float(value));
        }
        for (&id, &value) in &self.vec4s {
            gpu.upload_uniform(id, UniformData::Vec4(value));
        }
        for (unit, (&id, texture)) in self.textures.iter().enumerate() {
            let unit = unit as u32;
            gpu.bind_texture(unit, texture.handle());
            gpu.upload_uniform(id, UniformData::Int(unit as i32));
        }
        for (&id, matrices) in &self.matrix_arrays {
            gpu.upload_uniform(id, UniformData::Mat4Array(&matrices[..]));
        }
    }

    fn evict(&mut self, id: UniformId) -> bool {
        let mut removed = self.floats.remove(&id).is_some();
        removed |= self.vec4s.remove(&id).is_some();
        removed |= self.textures.remove(&id).is_some();
        removed |= self.matrix_arrays.remove(&id).is_some();
        removed
    }
}
