//! Scripted runtimes for exercising the device protocol without hardware.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use parallax_engine::gpu::{CommandLog, GpuContext, RecordingApi, TextureHandle};
use parallax_engine::renderer::{Renderer, RendererConfig};

use crate::convert;
use crate::eye::Eye;
use crate::runtime::oculus::{
    EyeFovLayer, FovPort, HmdDesc, OvrError, OvrSession, Posef, Sizei, StatusFlags, TrackingState,
};
use crate::runtime::openvr::{
    CompositorError, HmdMatrix34, HmdMatrix44, OpenVrRuntime, TrackedDeviceClass,
    TrackedDevicePose, TrackingResult,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    WaitPoses,
    TrackingState(u64),
    Callback(Eye),
    Submit(Eye),
    Handoff,
    Commit(Eye),
    SubmitFrame(u64),
    DestroyChain(Eye),
    Shutdown,
}

pub(crate) type Events = Rc<RefCell<Vec<Event>>>;

pub(crate) const IPD: f32 = 0.064;

pub(crate) fn renderer() -> (Renderer, CommandLog) {
    let (api, log) = RecordingApi::new(glam::UVec2::new(1280, 720));
    let mut renderer = Renderer::new(GpuContext::new(api), RendererConfig::default());
    renderer.init();
    (renderer, log)
}

pub(crate) fn eye_offset(eye: Eye) -> Mat4 {
    let x = if eye.is_left() { -IPD / 2.0 } else { IPD / 2.0 };
    Mat4::from_translation(Vec3::new(x, 0.0, 0.0))
}

fn to_hmd34(m: Mat4) -> HmdMatrix34 {
    let rows = m.transpose().to_cols_array_2d();
    HmdMatrix34 {
        m: [rows[0], rows[1], rows[2]],
    }
}

fn to_hmd44(m: Mat4) -> HmdMatrix44 {
    HmdMatrix44 {
        m: m.transpose().to_cols_array_2d(),
    }
}

/// Projection the fake OpenVR runtime reports: 100° vertical, square.
pub(crate) fn openvr_projection(near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(100f32.to_radians(), 1.0, near, far)
}

// ── OpenVR ───────────────────────────────────────────────────────────────

pub(crate) struct OpenVrScript {
    pub head: Option<Mat4>,
    /// `(device index, pose)` of connected controllers.
    pub controllers: Vec<(usize, Mat4)>,
    pub fail_wait: bool,
    pub fail_submit: bool,
    pub events: Events,
}

#[derive(Clone)]
pub(crate) struct FakeOpenVr(pub Rc<RefCell<OpenVrScript>>);

impl FakeOpenVr {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(OpenVrScript {
            head: Some(Mat4::IDENTITY),
            controllers: Vec::new(),
            fail_wait: false,
            fail_submit: false,
            events: Events::default(),
        })))
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.borrow().clone()
    }

    pub fn events_handle(&self) -> Events {
        self.0.borrow().events.clone()
    }
}

impl OpenVrRuntime for FakeOpenVr {
    fn tracking_system_name(&self) -> String {
        "fake_lighthouse".into()
    }

    fn model_number(&self) -> String {
        "Test HMD 1".into()
    }

    fn recommended_render_target_size(&self) -> (u32, u32) {
        (1000, 1100)
    }

    fn projection_matrix(&self, _eye: Eye, near: f32, far: f32) -> HmdMatrix44 {
        to_hmd44(openvr_projection(near, far))
    }

    fn eye_to_head_transform(&self, eye: Eye) -> HmdMatrix34 {
        to_hmd34(eye_offset(eye))
    }

    fn tracked_device_class(&self, index: usize) -> TrackedDeviceClass {
        match index {
            0 => TrackedDeviceClass::Hmd,
            i if self.0.borrow().controllers.iter().any(|&(c, _)| c == i) => {
                TrackedDeviceClass::Controller
            }
            _ => TrackedDeviceClass::Invalid,
        }
    }

    fn wait_get_poses(&mut self, poses: &mut [TrackedDevicePose]) -> Result<(), CompositorError> {
        let script = self.0.borrow();
        script.events.borrow_mut().push(Event::WaitPoses);
        if script.fail_wait {
            return Err(CompositorError::DoNotHaveFocus);
        }
        poses.fill(TrackedDevicePose::default());
        if let Some(head) = script.head {
            poses[0] = valid_pose(head);
        }
        for &(index, pose) in &script.controllers {
            poses[index] = valid_pose(pose);
        }
        Ok(())
    }

    fn submit(&mut self, eye: Eye, _texture: TextureHandle) -> Result<(), CompositorError> {
        let script = self.0.borrow();
        script.events.borrow_mut().push(Event::Submit(eye));
        if script.fail_submit {
            Err(CompositorError::TextureIsOnWrongDevice)
        } else {
            Ok(())
        }
    }

    fn post_present_handoff(&mut self) {
        self.0.borrow().events.borrow_mut().push(Event::Handoff);
    }

    fn shutdown(&mut self) {
        self.0.borrow().events.borrow_mut().push(Event::Shutdown);
    }
}

fn valid_pose(m: Mat4) -> TrackedDevicePose {
    TrackedDevicePose {
        device_to_absolute_tracking: to_hmd34(m),
        tracking_result: TrackingResult::RunningOk,
        pose_is_valid: true,
        device_is_connected: true,
    }
}

// ── Oculus ───────────────────────────────────────────────────────────────

pub(crate) struct OvrScript {
    pub head: Option<Mat4>,
    pub chain_length: Option<usize>,
    pub fail_commit: bool,
    pub current: [usize; 2],
    pub layers: Vec<EyeFovLayer>,
    pub events: Events,
    next_texture: u64,
}

#[derive(Clone)]
pub(crate) struct FakeOvr(pub Rc<RefCell<OvrScript>>);

pub(crate) const OVR_FOV: FovPort = FovPort {
    up_tan: 1.3,
    down_tan: 1.3,
    left_tan: 1.1,
    right_tan: 0.9,
};

impl FakeOvr {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(OvrScript {
            head: Some(Mat4::IDENTITY),
            chain_length: None,
            fail_commit: false,
            current: [0; 2],
            layers: Vec::new(),
            events: Events::default(),
            next_texture: 500,
        })))
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.borrow().clone()
    }
}

impl OvrSession for FakeOvr {
    fn hmd_desc(&self) -> HmdDesc {
        HmdDesc {
            product_name: "Fake Rift".into(),
            manufacturer: "Tests".into(),
            resolution: Sizei { w: 2160, h: 1200 },
            display_refresh_rate: 90.0,
            default_eye_fov: [OVR_FOV; 2],
        }
    }

    fn fov_texture_size(&self, _eye: Eye, _fov: FovPort, pixel_density: f32) -> Sizei {
        Sizei {
            w: (1000.0 * pixel_density) as i32,
            h: (1200.0 * pixel_density) as i32,
        }
    }

    fn hmd_to_eye_pose(&self, eye: Eye, _fov: FovPort) -> Posef {
        convert::mat4_to_posef(eye_offset(eye))
    }

    fn tracking_state(&mut self, frame_index: u64) -> TrackingState {
        let script = self.0.borrow();
        script
            .events
            .borrow_mut()
            .push(Event::TrackingState(frame_index));
        match script.head {
            Some(head) => TrackingState {
                head_pose: convert::mat4_to_posef(head),
                status: StatusFlags::ORIENTATION_TRACKED | StatusFlags::POSITION_TRACKED,
                hand_poses: [Posef::IDENTITY; 2],
                hand_status: [StatusFlags::ORIENTATION_TRACKED, StatusFlags::empty()],
            },
            None => TrackingState::default(),
        }
    }

    fn create_swap_chain(
        &mut self,
        _eye: Eye,
        _size: Sizei,
        length: u32,
    ) -> Result<Vec<TextureHandle>, OvrError> {
        let mut script = self.0.borrow_mut();
        let count = script.chain_length.unwrap_or(length as usize);
        let first = script.next_texture;
        script.next_texture += count as u64;
        Ok((first..first + count as u64).map(TextureHandle).collect())
    }

    fn current_swap_chain_index(&self, eye: Eye) -> usize {
        self.0.borrow().current[eye.index()]
    }

    fn commit_swap_chain(&mut self, eye: Eye) -> Result<(), OvrError> {
        let mut script = self.0.borrow_mut();
        script.events.borrow_mut().push(Event::Commit(eye));
        if script.fail_commit {
            return Err(OvrError {
                code: -6000,
                message: "display lost".into(),
            });
        }
        script.current[eye.index()] += 1;
        Ok(())
    }

    fn submit_frame(&mut self, frame_index: u64, layer: &EyeFovLayer) -> Result<(), OvrError> {
        let mut script = self.0.borrow_mut();
        script
            .events
            .borrow_mut()
            .push(Event::SubmitFrame(frame_index));
        script.layers.push(*layer);
        Ok(())
    }

    fn destroy_swap_chain(&mut self, eye: Eye) {
        self.0.borrow().events.borrow_mut().push(Event::DestroyChain(eye));
    }

    fn destroy(&mut self) {
        self.0.borrow().events.borrow_mut().push(Event::Shutdown);
    }
}
