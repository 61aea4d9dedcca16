//! wgpu implementation of [`GraphicsApi`].
//!
//! wgpu has no immediate-mode uniform or binding state, so this backend keeps that
//! state on the CPU and resolves it at draw time:
//! - uniform uploads land in a per-program staging block
//! - each draw copies the staging block into a per-frame arena and selects it with a
//!   dynamic offset
//! - pipelines are created lazily per (program, topology, blend, depth, target format)
//! - clears and draws are encoded as render passes against the bound target
//!
//! Nothing reaches the GPU until `flush` or `present`.

mod packing;
mod registry;
mod viewport;

use std::collections::{BTreeMap, HashMap};

use glam::UVec2;

use crate::coords::PixelRect;
use crate::device::Gpu;

use super::api::{ClearRequest, GpuError, GraphicsApi, UniformData};
use super::handles::{
    BlendMode, DepthState, FramebufferId, ProgramId, RenderTarget, TextureHandle, Topology,
    UniformId, VertexStateId,
};

use packing::UniformArena;
use registry::{PipelineKey, Resources};

pub use registry::{UniformBlockLayout, VertexLayout, WgpuProgramDesc, WgpuRegistry};

/// Configuration of the wgpu backend.
#[derive(Debug, Clone)]
pub struct WgpuApiConfig {
    /// Size of the per-frame uniform arena. Draws that do not fit are skipped.
    pub uniform_arena_size: u64,
    pub depth_format: wgpu::TextureFormat,
    /// Colour format of render targets created by the engine.
    pub render_target_format: wgpu::TextureFormat,
}

impl Default for WgpuApiConfig {
    fn default() -> Self {
        Self {
            uniform_arena_size: 4 * 1024 * 1024,
            depth_format: wgpu::TextureFormat::Depth32Float,
            render_target_format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

struct TargetEntry {
    color: TextureHandle,
    depth_view: wgpu::TextureView,
    size: UVec2,
    /// Set when the engine created the colour texture and must destroy it.
    owned: Option<wgpu::Texture>,
}

/// Attachments resolved for one pass.
struct ResolvedTarget {
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    size: UVec2,
}

/// [`GraphicsApi`] backed by a wgpu device.
pub struct WgpuApi {
    gpu: Gpu,
    config: WgpuApiConfig,
    registry: WgpuRegistry,
    sampler: wgpu::Sampler,
    fallback_texture: TextureHandle,

    targets: HashMap<FramebufferId, TargetEntry>,
    next_framebuffer: u32,

    /// Off-screen default framebuffer when there is no surface.
    backbuffer: Option<(wgpu::Texture, TextureHandle)>,
    default_depth: Option<(UVec2, wgpu::TextureView)>,
    surface_frame: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,

    encoder: Option<wgpu::CommandEncoder>,
    arena: UniformArena,

    program: Option<ProgramId>,
    vertex_state: Option<VertexStateId>,
    textures: BTreeMap<u32, TextureHandle>,
    viewport: Option<PixelRect>,
    framebuffer: Option<FramebufferId>,
    depth: DepthState,
    blend: BlendMode,
}

impl WgpuApi {
    pub fn new(gpu: Gpu, config: WgpuApiConfig) -> Self {
        let device = gpu.device().clone();

        let arena_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("parallax uniform arena"),
            size: config.uniform_arena_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);

        let registry = WgpuRegistry {
            device: device.clone(),
            arena_buffer,
            resources: Default::default(),
        };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("parallax linear sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let white = device.create_texture(&color_texture_desc(
            "parallax fallback texture",
            UVec2::ONE,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ));
        gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &white,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255, 255, 255, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            extent(UVec2::ONE),
        );
        let fallback_texture = registry.register_texture(&white);

        let backbuffer = (!gpu.has_surface()).then(|| {
            let texture = device.create_texture(&color_texture_desc(
                "parallax backbuffer",
                gpu.size(),
                config.render_target_format,
            ));
            let handle = registry.register_texture(&texture);
            (texture, handle)
        });

        Self {
            gpu,
            arena: UniformArena::new(config.uniform_arena_size, alignment),
            config,
            registry,
            sampler,
            fallback_texture,
            targets: HashMap::new(),
            next_framebuffer: 1,
            backbuffer,
            default_depth: None,
            surface_frame: None,
            encoder: None,
            program: None,
            vertex_state: None,
            textures: BTreeMap::new(),
            viewport: None,
            framebuffer: None,
            depth: DepthState::default(),
            blend: BlendMode::default(),
        }
    }

    /// Handle for registering programs, vertex buffers and textures.
    pub fn registry(&self) -> WgpuRegistry {
        self.registry.clone()
    }

    /// Texture backing the default framebuffer of a headless context.
    pub fn backbuffer(&self) -> Option<TextureHandle> {
        self.backbuffer.as_ref().map(|(_, handle)| *handle)
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let device = self.gpu.device();
        self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("parallax frame encoder"),
            })
        })
    }

    fn submit_pending(&mut self) {
        let Some(encoder) = self.encoder.take() else { return };
        if !self.arena.is_empty() {
            self.gpu
                .queue()
                .write_buffer(&self.registry.arena_buffer, 0, self.arena.bytes());
        }
        let _ = self.gpu.queue().submit(std::iter::once(encoder.finish()));
        self.arena.reset();
    }

    fn resolve_target(&mut self) -> Option<ResolvedTarget> {
        match self.framebuffer {
            Some(id) => {
                let Some(entry) = self.targets.get(&id) else {
                    log::warn!("framebuffer {id:?} is not a live render target");
                    return None;
                };
                let res = self.registry.resources.borrow();
                let color = res.textures.get(&entry.color)?;
                Some(ResolvedTarget {
                    color_view: color.view.clone(),
                    depth_view: entry.depth_view.clone(),
                    format: color.format,
                    size: entry.size,
                })
            }
            None => self.resolve_default_target(),
        }
    }

    fn resolve_default_target(&mut self) -> Option<ResolvedTarget> {
        let (color_view, format, size) = if let Some((_, handle)) = self.backbuffer.as_ref() {
            let res = self.registry.resources.borrow();
            let entry = res.textures.get(handle)?;
            (entry.view.clone(), entry.format, entry.size)
        } else {
            if self.surface_frame.is_none() {
                match self.gpu.acquire_surface_texture() {
                    Ok(Some(texture)) => {
                        let view = texture
                            .texture
                            .create_view(&wgpu::TextureViewDescriptor::default());
                        self.surface_frame = Some((texture, view));
                    }
                    Ok(None) => return None,
                    Err(err) => {
                        log::warn!("surface frame unavailable: {err}");
                        let action = self.gpu.handle_surface_error(err);
                        log::debug!("surface error handled: {action:?}");
                        return None;
                    }
                }
            }
            let (texture, view) = self.surface_frame.as_ref()?;
            let size = UVec2::new(texture.texture.width(), texture.texture.height());
            (view.clone(), texture.texture.format(), size)
        };

        let depth_view = match self.default_depth.as_ref() {
            Some((depth_size, view)) if *depth_size == size => view.clone(),
            _ => {
                let view = create_depth_view(self.gpu.device(), self.config.depth_format, size);
                self.default_depth = Some((size, view.clone()));
                view
            }
        };

        Some(ResolvedTarget {
            color_view,
            depth_view,
            format,
            size,
        })
    }

    fn alloc_framebuffer(&mut self) -> FramebufferId {
        let id = FramebufferId(self.next_framebuffer);
        self.next_framebuffer += 1;
        id
    }

    fn check_target_size(&self, size: UVec2) -> Result<(), GpuError> {
        let max = self.gpu.device().limits().max_texture_dimension_2d;
        if size.x == 0 || size.y == 0 || size.x > max || size.y > max {
            return Err(GpuError::InvalidTargetSize(size));
        }
        Ok(())
    }
}

impl GraphicsApi for WgpuApi {
    fn drawable_size(&self) -> UVec2 {
        self.gpu.size()
    }

    fn resize_drawable(&mut self, size: UVec2) {
        self.gpu.resize(size);
    }

    fn set_viewport(&mut self, rect: PixelRect) {
        self.viewport = Some(rect);
    }

    fn clear(&mut self, request: ClearRequest) {
        let Some(target) = self.resolve_target() else { return };

        let color_load = match request.color {
            Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                r: f64::from(c.x),
                g: f64::from(c.y),
                b: f64::from(c.z),
                a: f64::from(c.w),
            }),
            None => wgpu::LoadOp::Load,
        };
        let depth_load = match request.depth {
            Some(d) => wgpu::LoadOp::Clear(d),
            None => wgpu::LoadOp::Load,
        };

        let _pass = self.encoder().begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("parallax clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    fn use_program(&mut self, program: ProgramId) {
        if !self.registry.resources.borrow().programs.contains_key(&program) {
            log::warn!("use_program: unknown program {program:?}");
        }
        self.program = Some(program);
    }

    fn set_depth_state(&mut self, depth: DepthState) {
        self.depth = depth;
    }

    fn set_blend_mode(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    fn upload_uniform(&mut self, location: UniformId, data: UniformData<'_>) {
        let Some(program) = self.program else { return };
        let mut res = self.registry.resources.borrow_mut();
        let Some(entry) = res.programs.get_mut(&program) else { return };
        let Some(&offset) = entry.desc.uniform_block.fields.get(&location) else { return };
        let bytes = packing::encode(data);
        let written = packing::write_at(&mut entry.staging, offset, &bytes);
        if written < bytes.len() {
            log::warn!(
                "uniform {location:?} truncated to {written} of {} bytes in program {}",
                bytes.len(),
                entry.desc.label
            );
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        let _ = self.textures.insert(unit, texture);
    }

    fn bind_vertex_state(&mut self, vertex_state: VertexStateId) {
        self.vertex_state = Some(vertex_state);
    }

    fn draw_arrays(&mut self, topology: Topology, vertex_count: u32) {
        if vertex_count == 0 {
            return;
        }
        let (Some(program), Some(vertex_state)) = (self.program, self.vertex_state) else {
            log::warn!("draw_arrays without a bound program and vertex state");
            return;
        };
        let Some(target) = self.resolve_target() else { return };
        let Some(viewport) = viewport::top_left_viewport(self.viewport, target.size) else { return };

        let key = PipelineKey {
            program,
            topology,
            blend: self.blend,
            depth: self.depth,
            color_format: target.format,
        };

        let device = self.gpu.device().clone();
        let mut res = self.registry.resources.borrow_mut();
        let Resources {
            programs,
            vertex_buffers,
            textures,
            pipelines,
            ..
        } = &mut *res;

        let Some(entry) = programs.get(&program) else {
            log::warn!("draw_arrays: unknown program {program:?}");
            return;
        };
        let Some(vertex_buffer) = vertex_buffers.get(&vertex_state).cloned() else {
            log::warn!("draw_arrays: unknown vertex state {vertex_state:?}");
            return;
        };
        let Some(uniform_offset) = self.arena.push(&entry.staging) else {
            log::warn!("uniform arena exhausted; draw skipped");
            return;
        };

        let texture_bind_group = entry.texture_layout.as_ref().map(|layout| {
            let views: Vec<wgpu::TextureView> = (0..entry.desc.texture_units)
                .map(|unit| {
                    self.textures
                        .get(&unit)
                        .and_then(|handle| textures.get(handle))
                        .or_else(|| textures.get(&self.fallback_texture))
                        .map(|t| t.view.clone())
                })
                .collect::<Option<_>>()
                .unwrap_or_default();
            let entries: Vec<wgpu::BindGroupEntry<'_>> = views
                .iter()
                .enumerate()
                .flat_map(|(unit, view)| {
                    [
                        wgpu::BindGroupEntry {
                            binding: unit as u32 * 2,
                            resource: wgpu::BindingResource::TextureView(view),
                        },
                        wgpu::BindGroupEntry {
                            binding: unit as u32 * 2 + 1,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                    ]
                })
                .collect();
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("parallax texture units"),
                layout,
                entries: &entries,
            })
        });

        let pipeline = pipelines
            .entry(key)
            .or_insert_with(|| registry::create_pipeline(&device, entry, key, self.config.depth_format))
            .clone();
        let uniform_bind_group = entry.uniform_bind_group.clone();
        drop(res);

        let mut pass = self.encoder().begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("parallax draw"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &uniform_bind_group, &[uniform_offset]);
        if let Some(bind_group) = texture_bind_group.as_ref() {
            pass.set_bind_group(1, bind_group, &[]);
        }
        pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        pass.draw(0..vertex_count, 0..1);
    }

    fn create_render_target(&mut self, size: UVec2) -> Result<RenderTarget, GpuError> {
        self.check_target_size(size)?;
        let texture = self.gpu.device().create_texture(&color_texture_desc(
            "parallax render target",
            size,
            self.config.render_target_format,
        ));
        let color = self.registry.register_texture(&texture);
        let depth_view = create_depth_view(self.gpu.device(), self.config.depth_format, size);
        let framebuffer = self.alloc_framebuffer();
        let _ = self.targets.insert(
            framebuffer,
            TargetEntry {
                color,
                depth_view,
                size,
                owned: Some(texture),
            },
        );
        Ok(RenderTarget {
            framebuffer,
            color,
            size,
        })
    }

    fn import_render_target(
        &mut self,
        color: TextureHandle,
        size: UVec2,
    ) -> Result<RenderTarget, GpuError> {
        self.check_target_size(size)?;
        let actual = self
            .registry
            .resources
            .borrow()
            .textures
            .get(&color)
            .map(|t| t.size)
            .ok_or(GpuError::UnknownHandle("texture", color.0))?;
        if actual != size {
            return Err(GpuError::InvalidTargetSize(size));
        }
        let depth_view = create_depth_view(self.gpu.device(), self.config.depth_format, size);
        let framebuffer = self.alloc_framebuffer();
        let _ = self.targets.insert(
            framebuffer,
            TargetEntry {
                color,
                depth_view,
                size,
                owned: None,
            },
        );
        Ok(RenderTarget {
            framebuffer,
            color,
            size,
        })
    }

    fn destroy_render_target(&mut self, target: RenderTarget) {
        let Some(entry) = self.targets.remove(&target.framebuffer) else {
            log::warn!("destroy_render_target: unknown {:?}", target.framebuffer);
            return;
        };
        if let Some(texture) = entry.owned {
            self.registry.unregister_texture(entry.color);
            texture.destroy();
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.framebuffer = framebuffer;
    }

    fn flush(&mut self) {
        self.submit_pending();
    }

    fn present(&mut self) -> Result<(), GpuError> {
        self.submit_pending();
        if let Some((texture, view)) = self.surface_frame.take() {
            drop(view);
            texture.present();
        }
        Ok(())
    }
}

fn extent(size: UVec2) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.x,
        height: size.y,
        depth_or_array_layers: 1,
    }
}

fn color_texture_desc(
    label: &'static str,
    size: UVec2,
    format: wgpu::TextureFormat,
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(size),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    }
}

fn create_depth_view(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    size: UVec2,
) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("parallax depth"),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}
