use glam::UVec2;
use parallax_engine::gpu::{GpuContext, RenderTarget, TargetReleaser};

use crate::convert;
use crate::error::VrError;
use crate::eye::Eye;
use crate::runtime::OpenVrRuntime;
use crate::runtime::openvr::{
    HMD_DEVICE_INDEX, MAX_TRACKED_DEVICES, TrackedDeviceClass, TrackedDevicePose,
};

use super::{ControllerPose, EyeSetup, TrackedPoses, create_eye_targets};

pub(crate) struct OpenVrBackend {
    runtime: Box<dyn OpenVrRuntime>,
    size: UVec2,
    targets: Option<[RenderTarget; 2]>,
    releaser: TargetReleaser,
    poses: Vec<TrackedDevicePose>,
}

impl OpenVrBackend {
    pub fn open(runtime: Box<dyn OpenVrRuntime>, gpu: &mut GpuContext) -> Result<Self, VrError> {
        let (w, h) = runtime.recommended_render_target_size();
        let mut backend = Self {
            runtime,
            size: UVec2::new(w, h),
            targets: None,
            releaser: gpu.releaser(),
            poses: vec![TrackedDevicePose::default(); MAX_TRACKED_DEVICES],
        };
        // On error `backend` drops here and shuts the runtime down.
        backend.targets = Some(create_eye_targets(gpu, backend.size)?);

        log::info!("OpenVR session opened: {}", backend.debug_info());
        Ok(backend)
    }

    pub fn target_size(&self) -> UVec2 {
        self.size
    }

    pub fn setup_cameras(&self, near: f32, far: f32) -> EyeSetup {
        let eyes = Eye::BOTH;
        EyeSetup {
            projection: eyes.map(|eye| {
                convert::hmd44_to_mat4(&self.runtime.projection_matrix(eye, near, far))
            }),
            eye_to_head: eyes
                .map(|eye| convert::hmd34_to_mat4(&self.runtime.eye_to_head_transform(eye))),
        }
    }

    pub fn update_pose(&mut self) -> TrackedPoses {
        if let Err(e) = self.runtime.wait_get_poses(&mut self.poses) {
            log::warn!("OpenVR pose query failed: {e}");
            return TrackedPoses::default();
        }

        let head = self
            .poses
            .get(HMD_DEVICE_INDEX)
            .filter(|p| p.pose_is_valid)
            .map(|p| convert::hmd34_to_mat4(&p.device_to_absolute_tracking));

        let controllers = self
            .poses
            .iter()
            .enumerate()
            .filter(|&(index, pose)| {
                index != HMD_DEVICE_INDEX
                    && pose.pose_is_valid
                    && self.runtime.tracked_device_class(index) == TrackedDeviceClass::Controller
            })
            .map(|(index, pose)| ControllerPose {
                id: index as u32,
                pose: convert::hmd34_to_mat4(&pose.device_to_absolute_tracking),
            })
            .collect();

        TrackedPoses {
            head,
            controllers: Some(controllers),
        }
    }

    pub fn target(&self, eye: Eye) -> Option<RenderTarget> {
        self.targets.map(|t| t[eye.index()])
    }

    pub fn submit(&mut self, eye: Eye) -> Result<(), VrError> {
        let target = self
            .target(eye)
            .ok_or_else(|| VrError::Compositor(format!("{eye} eye target released")))?;
        self.runtime
            .submit(eye, target.color)
            .map_err(|e| VrError::Compositor(format!("{eye} eye: {e}")))
    }

    pub fn advance(&mut self) {
        self.runtime.post_present_handoff();
    }

    pub fn debug_info(&self) -> String {
        format!(
            "{} {} ({}x{} per eye)",
            self.runtime.tracking_system_name(),
            self.runtime.model_number(),
            self.size.x,
            self.size.y
        )
    }

    pub fn release_targets(&mut self, gpu: &mut GpuContext) {
        if let Some(targets) = self.targets.take() {
            for target in targets {
                gpu.destroy_render_target(target);
            }
        }
    }
}

impl Drop for OpenVrBackend {
    fn drop(&mut self) {
        if let Some(targets) = self.targets.take() {
            log::debug!("OpenVR backend dropped without release; eye targets queued");
            self.releaser.release_all(targets);
        }
        self.runtime.shutdown();
        log::debug!("OpenVR runtime shut down");
    }
}

