use glam::{Mat4, UVec2};
use parallax_engine::gpu::{GpuContext, RenderTarget, TargetReleaser};

use crate::config::VrConfig;
use crate::convert;
use crate::error::VrError;
use crate::eye::Eye;
use crate::runtime::OvrSession;
use crate::runtime::oculus::{EyeFovLayer, FovPort, HmdDesc, Sizei, StatusFlags};

use super::{ControllerPose, EyeSetup, TrackedPoses};

pub(crate) struct OculusBackend {
    session: Box<dyn OvrSession>,
    desc: HmdDesc,
    fov: [FovPort; 2],
    sizes: [Sizei; 2],
    /// Swap chain images wrapped as render targets, per eye.
    chains: [Vec<RenderTarget>; 2],
    chain_created: [bool; 2],
    releaser: TargetReleaser,
}

impl OculusBackend {
    pub fn open(
        session: Box<dyn OvrSession>,
        gpu: &mut GpuContext,
        config: &VrConfig,
    ) -> Result<Self, VrError> {
        let desc = session.hmd_desc();
        let fov = desc.default_eye_fov;
        let sizes =
            Eye::BOTH.map(|eye| session.fov_texture_size(eye, fov[eye.index()], config.pixel_density));

        let mut backend = Self {
            session,
            desc,
            fov,
            sizes,
            chains: [Vec::new(), Vec::new()],
            chain_created: [false; 2],
            releaser: gpu.releaser(),
        };
        // On error `backend` drops here, destroying any chain and the session.
        if let Err(e) = backend.create_chains(gpu, config.swap_chain_length) {
            backend.release_targets(gpu);
            return Err(e);
        }

        log::info!("Oculus session opened: {}", backend.debug_info());
        Ok(backend)
    }

    fn create_chains(&mut self, gpu: &mut GpuContext, length: u32) -> Result<(), VrError> {
        for eye in Eye::BOTH {
            let i = eye.index();
            let size = sizei_to_uvec2(self.sizes[i]);
            let images = self
                .session
                .create_swap_chain(eye, self.sizes[i], length)
                .map_err(|e| VrError::SwapChain(format!("{eye} eye: {e}")))?;
            self.chain_created[i] = true;

            if images.len() < 2 {
                return Err(VrError::SwapChain(format!(
                    "{eye} eye chain has {} image(s), need at least 2",
                    images.len()
                )));
            }
            for image in images {
                let target = gpu.import_render_target(image, size)?;
                self.chains[i].push(target);
            }
            log::debug!(
                "{eye} eye swap chain: {} images at {}x{}",
                self.chains[i].len(),
                size.x,
                size.y
            );
        }
        Ok(())
    }

    pub fn target_size(&self, eye: Eye) -> UVec2 {
        sizei_to_uvec2(self.sizes[eye.index()])
    }

    pub fn setup_cameras(&self, near: f32, far: f32) -> EyeSetup {
        EyeSetup {
            projection: self.fov.map(|fov| convert::fov_projection(&fov, near, far)),
            eye_to_head: Eye::BOTH.map(|eye| {
                convert::posef_to_mat4(&self.session.hmd_to_eye_pose(eye, self.fov[eye.index()]))
            }),
        }
    }

    pub fn update_pose(&mut self, frame_index: u64) -> TrackedPoses {
        let state = self.session.tracking_state(frame_index);

        let head = state
            .status
            .contains(StatusFlags::ORIENTATION_TRACKED)
            .then(|| convert::posef_to_mat4(&state.head_pose));

        let controllers = (0..2)
            .filter(|&hand| state.hand_status[hand].contains(StatusFlags::ORIENTATION_TRACKED))
            .map(|hand| ControllerPose {
                id: hand as u32,
                pose: convert::posef_to_mat4(&state.hand_poses[hand]),
            })
            .collect();

        TrackedPoses {
            head,
            controllers: Some(controllers),
        }
    }

    pub fn target(&self, eye: Eye) -> Option<RenderTarget> {
        let chain = &self.chains[eye.index()];
        if chain.is_empty() {
            return None;
        }
        let index = self.session.current_swap_chain_index(eye) % chain.len();
        Some(chain[index])
    }

    pub fn submit(&mut self, eye: Eye) -> Result<(), VrError> {
        self.session
            .commit_swap_chain(eye)
            .map_err(|e| VrError::Compositor(format!("{eye} eye commit: {e}")))
    }

    pub fn advance(&mut self, frame_index: u64, eye_poses: [Mat4; 2]) -> Result<(), VrError> {
        let layer = EyeFovLayer {
            fov: self.fov,
            render_pose: eye_poses.map(convert::mat4_to_posef),
            viewport: self.sizes,
        };
        self.session
            .submit_frame(frame_index, &layer)
            .map_err(|e| VrError::Compositor(format!("submit frame {frame_index}: {e}")))
    }

    pub fn debug_info(&self) -> String {
        format!(
            "{} ({}), display {}x{} at {} Hz",
            self.desc.product_name,
            self.desc.manufacturer,
            self.desc.resolution.w,
            self.desc.resolution.h,
            self.desc.display_refresh_rate
        )
    }

    pub fn release_targets(&mut self, gpu: &mut GpuContext) {
        for chain in &mut self.chains {
            for target in chain.drain(..) {
                gpu.destroy_render_target(target);
            }
        }
    }
}

impl Drop for OculusBackend {
    fn drop(&mut self) {
        if self.chains.iter().any(|c| !c.is_empty()) {
            log::debug!("Oculus backend dropped without release; eye targets queued");
            for chain in &mut self.chains {
                self.releaser.release_all(chain.drain(..));
            }
        }
        for eye in Eye::BOTH {
            if self.chain_created[eye.index()] {
                self.session.destroy_swap_chain(eye);
            }
        }
        self.session.destroy();
        log::debug!("Oculus session destroyed");
    }
}

fn sizei_to_uvec2(size: Sizei) -> UVec2 {
    UVec2::new(size.w.max(0) as u32, size.h.max(0) as u32)
}
