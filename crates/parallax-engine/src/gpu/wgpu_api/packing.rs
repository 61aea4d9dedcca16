//! CPU-side packing of immediate-mode uniform uploads into std140-style blocks.

use glam::Mat3;

use crate::gpu::UniformData;

/// Byte encoding of one upload. `mat3` is padded to three `vec4` columns.
pub(super) fn encode(data: UniformData<'_>) -> Vec<u8> {
    match data {
        UniformData::Float(v) => bytemuck::bytes_of(&v).to_vec(),
        UniformData::Int(v) => bytemuck::bytes_of(&v).to_vec(),
        UniformData::Vec4(v) => bytemuck::bytes_of(&v).to_vec(),
        UniformData::Vec4Array(v) => bytemuck::cast_slice(v).to_vec(),
        UniformData::Mat3(m) => bytemuck::cast_slice(&mat3_std140(m)).to_vec(),
        UniformData::Mat4(m) => bytemuck::bytes_of(&m).to_vec(),
        UniformData::Mat4Array(m) => bytemuck::cast_slice(m).to_vec(),
    }
}

fn mat3_std140(m: Mat3) -> [f32; 12] {
    let c = m.to_cols_array();
    [
        c[0], c[1], c[2], 0.0, //
        c[3], c[4], c[5], 0.0, //
        c[6], c[7], c[8], 0.0,
    ]
}

/// Copies `bytes` into `block` at `offset`, truncating at the end of the block.
///
/// Returns the number of bytes actually written.
pub(super) fn write_at(block: &mut [u8], offset: u64, bytes: &[u8]) -> usize {
    let Ok(start) = usize::try_from(offset) else { return 0 };
    if start >= block.len() {
        return 0;
    }
    let n = bytes.len().min(block.len() - start);
    block[start..start + n].copy_from_slice(&bytes[..n]);
    n
}

#[inline]
pub(super) fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Per-frame uniform arena.
///
/// Each draw copies the bound program's staged block into the arena at an aligned
/// offset, which the draw then selects with a dynamic bind-group offset.
#[derive(Debug)]
pub(super) struct UniformArena {
    bytes: Vec<u8>,
    capacity: u64,
    alignment: u64,
}

impl UniformArena {
    pub(super) fn new(capacity: u64, alignment: u64) -> Self {
        Self {
            bytes: Vec::new(),
            capacity,
            alignment,
        }
    }

    /// Appends `block`; `None` when the arena is full.
    pub(super) fn push(&mut self, block: &[u8]) -> Option<u32> {
        let offset = align_up(self.bytes.len() as u64, self.alignment);
        if offset + block.len() as u64 > self.capacity {
            return None;
        }
        self.bytes.resize(offset as usize, 0);
        self.bytes.extend_from_slice(block);
        u32::try_from(offset).ok()
    }

    pub(super) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(super) fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(super) fn reset(&mut self) {
        self.bytes.clear();
    }
}
