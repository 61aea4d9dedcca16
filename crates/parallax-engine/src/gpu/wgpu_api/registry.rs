use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::rc::Rc;

use glam::UVec2;

use crate::gpu::{BlendMode, DepthState, ProgramId, TextureHandle, Topology, UniformId, VertexStateId};

/// Vertex buffer layout shared by every mesh drawn with a program.
#[derive(Debug, Clone)]
pub struct VertexLayout {
    pub array_stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

/// Layout of a program's uniform block (`@group(0) @binding(0)`).
///
/// Uniform uploads to locations missing from `fields` are ignored, the same way an
/// inactive GL uniform location swallows writes.
#[derive(Debug, Clone, Default)]
pub struct UniformBlockLayout {
    /// Block size in bytes.
    pub size: u64,
    /// Byte offset of each uniform within the block.
    pub fields: HashMap<UniformId, u64>,
}

/// A compiled shader program handed to the wgpu backend.
///
/// Shader compilation happens outside the engine; this describes how the module's
/// interface maps onto the immediate-mode command stream. Texture unit `i` binds
/// `@group(1) @binding(2 * i)` (texture) and `@binding(2 * i + 1)` (sampler).
#[derive(Debug, Clone)]
pub struct WgpuProgramDesc {
    pub label: String,
    pub module: wgpu::ShaderModule,
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub vertex_layout: VertexLayout,
    pub uniform_block: UniformBlockLayout,
    pub texture_units: u32,
}

pub(super) struct ProgramEntry {
    pub(super) desc: WgpuProgramDesc,
    pub(super) layout: wgpu::PipelineLayout,
    pub(super) uniform_bind_group: wgpu::BindGroup,
    pub(super) texture_layout: Option<wgpu::BindGroupLayout>,
    /// Current uniform values; persists across draws like GL program state.
    pub(super) staging: Vec<u8>,
}

pub(super) struct TextureEntry {
    pub(super) view: wgpu::TextureView,
    pub(super) format: wgpu::TextureFormat,
    pub(super) size: UVec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub(super) program: ProgramId,
    pub(super) topology: Topology,
    pub(super) blend: BlendMode,
    pub(super) depth: DepthState,
    pub(super) color_format: wgpu::TextureFormat,
}

#[derive(Default)]
pub(super) struct Resources {
    pub(super) programs: HashMap<ProgramId, ProgramEntry>,
    pub(super) vertex_buffers: HashMap<VertexStateId, wgpu::Buffer>,
    pub(super) textures: HashMap<TextureHandle, TextureEntry>,
    pub(super) pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    pub(super) next_id: u64,
}

impl Resources {
    pub(super) fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Registration handle for resources created outside the engine.
///
/// Clones share the same resource tables as the [`super::WgpuApi`] they came from.
#[derive(Clone)]
pub struct WgpuRegistry {
    pub(super) device: wgpu::Device,
    pub(super) arena_buffer: wgpu::Buffer,
    pub(super) resources: Rc<RefCell<Resources>>,
}

impl WgpuRegistry {
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Registers a compiled program and returns its id.
    pub fn register_program(&self, desc: WgpuProgramDesc) -> ProgramId {
        let block_size = NonZeroU64::new(desc.uniform_block.size.max(16));

        let uniform_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("parallax uniform block bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: block_size,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("parallax uniform block bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &self.arena_buffer,
                    offset: 0,
                    size: block_size,
                }),
            }],
        });

        let texture_layout = (desc.texture_units > 0).then(|| {
            let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..desc.texture_units)
                .flat_map(|unit| {
                    [
                        wgpu::BindGroupLayoutEntry {
                            binding: unit * 2,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: unit * 2 + 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ]
                })
                .collect();
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("parallax texture units bgl"),
                    entries: &entries,
                })
        });

        let layout = {
            let mut groups = vec![&uniform_layout];
            if let Some(t) = texture_layout.as_ref() {
                groups.push(t);
            }
            self.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("parallax program layout"),
                    bind_group_layouts: &groups,
                    immediate_size: 0,
                })
        };

        let staging = vec![0u8; desc.uniform_block.size as usize];
        let mut res = self.resources.borrow_mut();
        let id = ProgramId(res.alloc_id() as u32);
        log::debug!("registered program {:?} ({})", id, desc.label);
        let _ = res.programs.insert(
            id,
            ProgramEntry {
                desc,
                layout,
                uniform_bind_group,
                texture_layout,
                staging,
            },
        );
        id
    }

    /// Registers a vertex buffer laid out per the program it will be drawn with.
    pub fn register_vertex_buffer(&self, buffer: wgpu::Buffer) -> VertexStateId {
        let mut res = self.resources.borrow_mut();
        let id = VertexStateId(res.alloc_id() as u32);
        let _ = res.vertex_buffers.insert(id, buffer);
        id
    }

    /// Registers a 2D texture for sampling (and, if it has `RENDER_ATTACHMENT`
    /// usage, for import as a render target).
    pub fn register_texture(&self, texture: &wgpu::Texture) -> TextureHandle {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let entry = TextureEntry {
            view,
            format: texture.format(),
            size: UVec2::new(texture.width(), texture.height()),
        };
        let mut res = self.resources.borrow_mut();
        let handle = TextureHandle(res.alloc_id());
        let _ = res.textures.insert(handle, entry);
        handle
    }

    /// Drops the registry's reference to a texture.
    pub fn unregister_texture(&self, handle: TextureHandle) {
        let _ = self.resources.borrow_mut().textures.remove(&handle);
    }
}

pub(super) fn create_pipeline(
    device: &wgpu::Device,
    program: &ProgramEntry,
    key: PipelineKey,
    depth_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let desc = &program.desc;
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label.as_str()),
        layout: Some(&program.layout),

        vertex: wgpu::VertexState {
            module: &desc.module,
            entry_point: Some(desc.vertex_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: desc.vertex_layout.array_stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &desc.vertex_layout.attributes,
            }],
        },

        fragment: Some(wgpu::FragmentState {
            module: &desc.module,
            entry_point: Some(desc.fragment_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.color_format,
                blend: blend_state(key.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: match key.topology {
                Topology::Points => wgpu::PrimitiveTopology::PointList,
                Topology::Lines => wgpu::PrimitiveTopology::LineList,
                Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            },
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: key.depth.write,
            depth_compare: if key.depth.test {
                wgpu::CompareFunction::LessEqual
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn blend_state(blend: BlendMode) -> Option<wgpu::BlendState> {
    match blend {
        BlendMode::Disabled => None,
        BlendMode::AlphaBlending => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::AdditiveBlending => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        }),
    }
}
