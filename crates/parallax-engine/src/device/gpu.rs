use anyhow::{Context, Result};
use glam::UVec2;
use wgpu::SurfaceError;

use super::SurfaceErrorAction;

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    ///
    /// Shading happens in linear space, so an sRGB target does the final encode.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// VR mirrors usually want `Immediate` or `Mailbox` so the desktop window never
    /// throttles the headset; FIFO is the portable default.
    pub present_mode: wgpu::PresentMode,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

/// Owns wgpu core objects and, when presenting to a window, the surface.
pub struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Surface plus its active configuration; `None` for headless contexts.
    surface: Option<(wgpu::Surface<'static>, wgpu::SurfaceConfiguration)>,

    /// Current drawable size in physical pixels.
    size: UVec2,
}

impl Gpu {
    /// Creates a GPU context presenting to `target`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu; see [`Gpu::new_blocking`].
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: UVec2,
        init: GpuInit,
    ) -> Result<Self> {
        anyhow::ensure!(size.x > 0 && size.y > 0, "surface has zero size");

        let instance = create_instance();
        let surface = instance
            .create_surface(target)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = request_device(&adapter, &init).await?;

        let caps = surface.get_capabilities(&adapter);
        let format =
            choose_surface_format(&caps, init.prefer_srgb).context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.x,
            height: size.y,
            present_mode: init.present_mode,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        log::info!(
            "gpu ready: {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            size.x,
            size.y,
            format
        );

        Ok(Self {
            device,
            queue,
            surface: Some((surface, config)),
            size,
        })
    }

    /// Creates a GPU context without a presentation surface.
    ///
    /// `size` becomes the size of the off-screen default framebuffer.
    pub async fn headless(size: UVec2, init: GpuInit) -> Result<Self> {
        anyhow::ensure!(size.x > 0 && size.y > 0, "headless target has zero size");

        let instance = create_instance();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = request_device(&adapter, &init).await?;
        log::info!("headless gpu ready: {}", adapter.get_info().name);

        Ok(Self {
            device,
            queue,
            surface: None,
            size,
        })
    }

    /// Blocking wrapper around [`Gpu::new`] for synchronous frame loops.
    pub fn new_blocking(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: UVec2,
        init: GpuInit,
    ) -> Result<Self> {
        pollster::block_on(Self::new(target, size, init))
    }

    /// Blocking wrapper around [`Gpu::headless`].
    pub fn headless_blocking(size: UVec2, init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::headless(size, init))
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns the current drawable size (physical pixels).
    #[inline]
    pub fn size(&self) -> UVec2 {
        self.size
    }

    #[inline]
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Format of the surface, if one is attached.
    pub fn surface_format(&self) -> Option<wgpu::TextureFormat> {
        self.surface.as_ref().map(|(_, config)| config.format)
    }

    /// Reconfigures the surface after a resize.
    ///
    /// wgpu does not support configuring a surface with a 0x0 size; in that case,
    /// only internal state is updated and configuration is deferred.
    pub fn resize(&mut self, new_size: UVec2) {
        self.size = new_size;
        if new_size.x == 0 || new_size.y == 0 {
            return;
        }
        if let Some((surface, config)) = self.surface.as_mut() {
            config.width = new_size.x;
            config.height = new_size.y;
            surface.configure(&self.device, config);
        }
    }

    /// Acquires the next surface texture; `Ok(None)` for headless contexts.
    pub fn acquire_surface_texture(
        &self,
    ) -> std::result::Result<Option<wgpu::SurfaceTexture>, SurfaceError> {
        match self.surface.as_ref() {
            Some((surface, _)) => surface.get_current_texture().map(Some),
            None => Ok(None),
        }
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        match err {
            SurfaceError::Lost | SurfaceError::Outdated => {
                if self.size.x > 0 && self.size.y > 0 {
                    if let Some((surface, config)) = self.surface.as_ref() {
                        surface.configure(&self.device, config);
                    }
                }
                SurfaceErrorAction::Reconfigured
            }
            SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
            SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
            SurfaceError::Other => SurfaceErrorAction::SkipFrame,
        }
    }
}

fn create_instance() -> wgpu::Instance {
    // Use all backends to allow wgpu to select the optimal platform backend.
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_device(
    adapter: &wgpu::Adapter,
    init: &GpuInit,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("parallax device"),
            required_features: init.required_features,
            required_limits: init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")
}

fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}
