//! Head-tracked stereo rendering protocol.
//!
//! Every call to [`VrDevice::render`] runs, in order:
//!
//! 1. pose update: sample the head and controllers and rebuild both eye views as
//!    `inverse(head * eye_to_head) * base_view`,
//! 2. for the left then the right eye: bind the eye target, make the eye camera
//!    active, invoke the render callback, unbind,
//! 3. flush the GPU and submit both eye images,
//! 4. end the frame on the compositor side.
//!
//! If tracking is lost the previous head pose is kept, and a failed pose query keeps
//! the previous controllers as well. Compositor rejections are logged and never stop
//! the frame loop. Eye targets of a device dropped without [`VrDevice::release`] are
//! destroyed at the renderer's next flush or present.

use std::fmt;

use glam::{Mat4, UVec2, Vec3};
use parallax_engine::camera::Camera;
use parallax_engine::gpu::RenderTarget;
use parallax_engine::renderer::Renderer;

use crate::backend::{Backend, ControllerPose, OculusBackend, OpenVrBackend};
use crate::config::{VrBackendKind, VrConfig};
use crate::error::VrError;
use crate::eye::Eye;
use crate::runtime::VrRuntimes;

/// Per-eye drawing hook: `(renderer, eye target, eye camera, eye)`.
///
/// The eye target is bound and the eye camera is active on `renderer` when it runs.
pub type RenderCallback = Box<dyn FnMut(&mut Renderer, &RenderTarget, &Camera, Eye)>;

/// Counters for the most recent frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct VrFrameStats {
    pub frame_index: u64,
    /// Whether the head pose of this frame was fresh.
    pub tracked: bool,
    pub submit_failures: u32,
}

pub struct VrDevice {
    backend: Backend,
    near: f32,
    far: f32,
    base_view: Mat4,
    head_pose: Mat4,
    eye_to_head: [Mat4; 2],
    cameras: [Camera; 2],
    controllers: Vec<ControllerPose>,
    callback: Option<RenderCallback>,
    frame_index: u64,
    last_frame: VrFrameStats,
    tracking_lost: bool,
}

impl VrDevice {
    /// Opens a session on the requested runtime.
    ///
    /// Returns `None` when the runtime cannot be reached or the session cannot be set
    /// up; the reason is logged and the caller keeps rendering to the window.
    pub fn create(
        kind: VrBackendKind,
        runtimes: &VrRuntimes,
        renderer: &mut Renderer,
        config: VrConfig,
    ) -> Option<Self> {
        match Self::try_create(kind, runtimes, renderer, config) {
            Ok(device) => Some(device),
            Err(e) => {
                log::warn!("VR disabled: {e}");
                None
            }
        }
    }

    /// Like [`create`](Self::create) but reports why the session could not be opened.
    pub fn try_create(
        kind: VrBackendKind,
        runtimes: &VrRuntimes,
        renderer: &mut Renderer,
        config: VrConfig,
    ) -> Result<Self, VrError> {
        let config = config.sanitized();
        let gpu = renderer.gpu_mut();
        let backend = match kind {
            VrBackendKind::OpenVr => Backend::OpenVr(OpenVrBackend::open(runtimes.open_openvr()?, gpu)?),
            VrBackendKind::Oculus => {
                Backend::Oculus(OculusBackend::open(runtimes.open_oculus()?, gpu, &config)?)
            }
        };

        let mut device = Self {
            backend,
            near: config.near,
            far: config.far,
            base_view: Mat4::IDENTITY,
            head_pose: Mat4::IDENTITY,
            eye_to_head: [Mat4::IDENTITY; 2],
            cameras: [Camera::new(); 2],
            controllers: Vec::new(),
            callback: None,
            frame_index: 0,
            last_frame: VrFrameStats::default(),
            tracking_lost: false,
        };
        device.setup_cameras();
        device.update_eye_views();
        Ok(device)
    }

    #[inline]
    pub fn kind(&self) -> VrBackendKind {
        self.backend.kind()
    }

    // ── placement ────────────────────────────────────────────────────────

    /// Places the tracking origin in the world. Takes effect on the next `render`,
    /// composed with the head pose sampled then.
    pub fn look_at(&mut self, eye: Vec3, at: Vec3, up: Vec3) {
        let mut camera = Camera::new();
        camera.look_at(eye, at, up);
        self.base_view = camera.view_transform();
    }

    pub fn set_view_transform(&mut self, view: Mat4) {
        self.base_view = view;
    }

    #[inline]
    pub fn view_transform(&self) -> Mat4 {
        self.base_view
    }

    /// Changes the clip planes and rebuilds both eye projections immediately.
    pub fn set_near_far_planes(&mut self, near: f32, far: f32) {
        debug_assert!(near > 0.0 && near < far);
        self.near = near;
        self.far = far;
        self.setup_cameras();
    }

    #[inline]
    pub fn near_far_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    // ── frame ────────────────────────────────────────────────────────────

    pub fn set_render_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Renderer, &RenderTarget, &Camera, Eye) + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear_render_callback(&mut self) {
        self.callback = None;
    }

    /// Renders and submits one stereo frame.
    ///
    /// Afterwards the window framebuffer is bound and the renderer's previous camera is
    /// active again.
    pub fn render(&mut self, renderer: &mut Renderer) {
        let tracked = self.update_pose();

        let previous_camera = renderer.camera().copied();
        for eye in Eye::BOTH {
            let Some(target) = self.backend.target(eye) else {
                log::error!("{eye} eye has no render target");
                continue;
            };
            let camera = self.cameras[eye.index()];

            renderer.bind_render_target(Some(&target));
            renderer.set_camera(camera);
            if let Some(callback) = self.callback.as_mut() {
                callback(renderer, &target, &camera, eye);
            }
            renderer.bind_render_target(None);
        }
        match previous_camera {
            Some(camera) => renderer.set_camera(camera),
            None => renderer.clear_camera(),
        }

        // Eye images must be complete before the compositor reads them.
        renderer.gpu_mut().flush();

        let mut submit_failures = 0;
        for eye in Eye::BOTH {
            if let Err(e) = self.backend.submit(eye) {
                log::warn!("{e}");
                submit_failures += 1;
            }
        }
        let eye_poses = self.eye_to_head.map(|offset| self.head_pose * offset);
        if let Err(e) = self.backend.advance(self.frame_index, eye_poses) {
            log::warn!("{e}");
            submit_failures += 1;
        }

        self.last_frame = VrFrameStats {
            frame_index: self.frame_index,
            tracked,
            submit_failures,
        };
        self.frame_index += 1;
    }

    // ── state ────────────────────────────────────────────────────────────

    /// Camera used for `eye` in the most recent frame.
    #[inline]
    pub fn camera(&self, eye: Eye) -> &Camera {
        &self.cameras[eye.index()]
    }

    /// Last valid head pose, head to tracking space.
    #[inline]
    pub fn head_pose(&self) -> Mat4 {
        self.head_pose
    }

    #[inline]
    pub fn eye_to_head(&self, eye: Eye) -> Mat4 {
        self.eye_to_head[eye.index()]
    }

    /// Controllers from the most recent pose sample, in tracking space.
    #[inline]
    pub fn controllers(&self) -> &[ControllerPose] {
        &self.controllers
    }

    /// World transform of a controller under the current base view.
    pub fn controller_world_transform(&self, controller: &ControllerPose) -> Mat4 {
        self.base_view.inverse() * controller.pose
    }

    #[inline]
    pub fn render_target_size(&self, eye: Eye) -> UVec2 {
        self.backend.target_size(eye)
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    pub fn last_frame(&self) -> VrFrameStats {
        self.last_frame
    }

    pub fn debug_info(&self) -> String {
        format!("{}: {}", self.kind(), self.backend.debug_info())
    }

    /// Ends the session: destroys the eye targets on `renderer`'s context, then the
    /// native session.
    pub fn release(mut self, renderer: &mut Renderer) {
        self.backend.release_targets(renderer.gpu_mut());
        log::info!("VR session ended after {} frames", self.frame_index);
    }

    // ── internals ────────────────────────────────────────────────────────

    fn setup_cameras(&mut self) {
        let setup = self.backend.setup_cameras(self.near, self.far);
        self.eye_to_head = setup.eye_to_head;
        for eye in Eye::BOTH {
            self.cameras[eye.index()].set_projection_transform(setup.projection[eye.index()]);
        }
    }

    /// Samples tracking and rebuilds both eye views. Returns whether the head pose is
    /// fresh.
    fn update_pose(&mut self) -> bool {
        let poses = self.backend.update_pose(self.frame_index);
        if let Some(controllers) = poses.controllers {
            self.controllers = controllers;
        }

        let tracked = match poses.head {
            Some(head) => {
                if self.tracking_lost {
                    log::info!("head tracking regained");
                    self.tracking_lost = false;
                }
                self.head_pose = head;
                true
            }
            None => {
                if !self.tracking_lost {
                    log::warn!("head tracking lost; keeping last pose");
                    self.tracking_lost = true;
                }
                false
            }
        };

        self.update_eye_views();
        tracked
    }

    fn update_eye_views(&mut self) {
        for eye in Eye::BOTH {
            let i = eye.index();
            let eye_to_tracking = self.head_pose * self.eye_to_head[i];
            self.cameras[i].set_view_transform(eye_to_tracking.inverse() * self.base_view);
        }
    }
}

impl fmt::Debug for VrDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VrDevice")
            .field("kind", &self.kind())
            .field("near", &self.near)
            .field("far", &self.far)
            .field("frame_index", &self.frame_index)
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec4;
    use parallax_engine::gpu::GpuCommand;
    use parallax_engine::paint::Color;

    use super::*;
    use crate::runtime::{OpenVrRuntime, OvrSession};
    use crate::testing::{
        Event, FakeOpenVr, FakeOvr, eye_offset, openvr_projection, renderer,
    };

    const EPS: f32 = 1e-5;

    fn openvr_device(fake: &FakeOpenVr, renderer: &mut Renderer) -> VrDevice {
        let handle = fake.clone();
        let runtimes =
            VrRuntimes::new().with_openvr(move || Ok(Box::new(handle.clone()) as Box<dyn OpenVrRuntime>));
        VrDevice::create(VrBackendKind::OpenVr, &runtimes, renderer, VrConfig::default())
            .expect("fake OpenVR session")
    }

    fn oculus_device(fake: &FakeOvr, renderer: &mut Renderer) -> VrDevice {
        let handle = fake.clone();
        let runtimes =
            VrRuntimes::new().with_oculus(move || Ok(Box::new(handle.clone()) as Box<dyn OvrSession>));
        VrDevice::create(VrBackendKind::Oculus, &runtimes, renderer, VrConfig::default())
            .expect("fake Oculus session")
    }

    // ── creation ─────────────────────────────────────────────────────────

    #[test]
    fn unavailable_backend_yields_no_device() {
        let (mut r, log) = renderer();
        log.clear();

        let none = VrRuntimes::new();
        assert!(VrDevice::create(VrBackendKind::OpenVr, &none, &mut r, VrConfig::default()).is_none());
        assert!(VrDevice::create(VrBackendKind::Oculus, &none, &mut r, VrConfig::default()).is_none());

        let no_headset = VrRuntimes::new().with_openvr(|| {
            Err(VrError::SessionUnavailable {
                backend: VrBackendKind::OpenVr,
                reason: "no HMD connected".into(),
            })
        });
        let err = VrDevice::try_create(VrBackendKind::OpenVr, &no_headset, &mut r, VrConfig::default())
            .unwrap_err();
        assert!(matches!(err, VrError::SessionUnavailable { .. }));
        assert!(log.is_empty());
    }

    #[test]
    fn short_swap_chain_tears_session_down() {
        let (mut r, log) = renderer();
        let fake = FakeOvr::new();
        fake.0.borrow_mut().chain_length = Some(1);
        let handle = fake.clone();
        let runtimes =
            VrRuntimes::new().with_oculus(move || Ok(Box::new(handle.clone()) as Box<dyn OvrSession>));

        let err = VrDevice::try_create(VrBackendKind::Oculus, &runtimes, &mut r, VrConfig::default())
            .unwrap_err();
        assert!(matches!(err, VrError::SwapChain(_)));
        assert_eq!(
            fake.events(),
            vec![Event::DestroyChain(Eye::Left), Event::Shutdown]
        );
        assert_eq!(
            log.count(|c| matches!(c, GpuCommand::ImportRenderTarget(_))),
            log.count(|c| matches!(c, GpuCommand::DestroyRenderTarget(_)))
        );
    }

    #[test]
    fn failed_target_creation_shuts_runtime_down() {
        let (mut r, _log) = renderer();

        struct ZeroSize(FakeOpenVr);
        impl OpenVrRuntime for ZeroSize {
            fn tracking_system_name(&self) -> String {
                self.0.tracking_system_name()
            }
            fn model_number(&self) -> String {
                self.0.model_number()
            }
            fn recommended_render_target_size(&self) -> (u32, u32) {
                (0, 0)
            }
            fn projection_matrix(&self, eye: Eye, near: f32, far: f32) -> crate::runtime::openvr::HmdMatrix44 {
                self.0.projection_matrix(eye, near, far)
            }
            fn eye_to_head_transform(&self, eye: Eye) -> crate::runtime::openvr::HmdMatrix34 {
                self.0.eye_to_head_transform(eye)
            }
            fn tracked_device_class(&self, index: usize) -> crate::runtime::openvr::TrackedDeviceClass {
                self.0.tracked_device_class(index)
            }
            fn wait_get_poses(
                &mut self,
                poses: &mut [crate::runtime::openvr::TrackedDevicePose],
            ) -> Result<(), crate::runtime::openvr::CompositorError> {
                self.0.wait_get_poses(poses)
            }
            fn submit(
                &mut self,
                eye: Eye,
                texture: parallax_engine::gpu::TextureHandle,
            ) -> Result<(), crate::runtime::openvr::CompositorError> {
                self.0.submit(eye, texture)
            }
            fn post_present_handoff(&mut self) {
                self.0.post_present_handoff()
            }
            fn shutdown(&mut self) {
                self.0.shutdown()
            }
        }

        let fake = FakeOpenVr::new();
        let handle = fake.clone();
        let runtimes = VrRuntimes::new()
            .with_openvr(move || Ok(Box::new(ZeroSize(handle.clone())) as Box<dyn OpenVrRuntime>));
        let err = VrDevice::try_create(VrBackendKind::OpenVr, &runtimes, &mut r, VrConfig::default())
            .unwrap_err();
        assert!(matches!(err, VrError::RenderTarget(_)));
        assert_eq!(fake.events(), vec![Event::Shutdown]);
    }

    // ── pose composition ─────────────────────────────────────────────────

    #[test]
    fn identity_head_gives_inverse_eye_offset_times_base() {
        let (mut r, _log) = renderer();
        let fake = FakeOpenVr::new();
        let mut device = openvr_device(&fake, &mut r);
        device.look_at(Vec3::new(0.0, 1.6, 3.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        let base = device.view_transform();

        device.render(&mut r);

        for eye in Eye::BOTH {
            let expected = eye_offset(eye).inverse() * base;
            assert!(device.camera(eye).view_transform().abs_diff_eq(expected, EPS), "{eye}");
        }
    }

    #[test]
    fn head_pose_is_composed_before_eye_offset() {
        let (mut r, _log) = renderer();
        let fake = FakeOvr::new();
        let head = Mat4::from_rotation_translation(
            glam::Quat::from_rotation_y(0.4),
            Vec3::new(0.2, 1.7, -0.3),
        );
        fake.0.borrow_mut().head = Some(head);
        let mut device = oculus_device(&fake, &mut r);
        let base = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        device.set_view_transform(base);

        device.render(&mut r);

        let expected = (head * eye_offset(Eye::Right)).inverse() * base;
        assert!(device.camera(Eye::Right).view_transform().abs_diff_eq(expected, 1e-4));
        assert!(device.head_pose().abs_diff_eq(head, 1e-5));
    }

    #[test]
    fn base_view_applies_at_next_render() {
        let (mut r, _log) = renderer();
        let fake = FakeOpenVr::new();
        let mut device = openvr_device(&fake, &mut r);
        device.render(&mut r);
        let before = device.camera(Eye::Left).view_transform();

        device.set_view_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)));
        assert_eq!(device.camera(Eye::Left).view_transform(), before);

        device.render(&mut r);
        assert_ne!(device.camera(Eye::Left).view_transform(), before);
    }

    #[test]
    fn lost_tracking_keeps_previous_view() {
        let (mut r, _log) = renderer();
        let fake = FakeOpenVr::new();
        fake.0.borrow_mut().head = Some(Mat4::from_translation(Vec3::new(0.0, 1.7, 0.0)));
        let mut device = openvr_device(&fake, &mut r);

        device.render(&mut r);
        let tracked_view = device.camera(Eye::Left).view_transform();
        assert!(device.last_frame().tracked);

        fake.0.borrow_mut().head = None;
        device.render(&mut r);
        assert_eq!(device.camera(Eye::Left).view_transform(), tracked_view);
        assert!(!device.last_frame().tracked);

        fake.0.borrow_mut().fail_wait = true;
        device.render(&mut r);
        assert_eq!(device.camera(Eye::Left).view_transform(), tracked_view);
        assert_eq!(device.frame_index(), 3);
    }

    #[test]
    fn failed_pose_query_keeps_previous_controllers() {
        let (mut r, _log) = renderer();
        let fake = FakeOpenVr::new();
        let hand = Mat4::from_translation(Vec3::new(0.3, 1.0, -0.4));
        fake.0.borrow_mut().controllers = vec![(3, hand)];
        let mut device = openvr_device(&fake, &mut r);
        device.render(&mut r);
        assert_eq!(device.controllers().len(), 1);

        fake.0.borrow_mut().fail_wait = true;
        device.render(&mut r);
        assert_eq!(device.controllers().len(), 1);
        assert!(device.controllers()[0].pose.abs_diff_eq(hand, EPS));
        assert!(!device.last_frame().tracked);

        // A successful sample without the controller does replace the list.
        {
            let mut script = fake.0.borrow_mut();
            script.fail_wait = false;
            script.controllers.clear();
        }
        device.render(&mut r);
        assert!(device.controllers().is_empty());
    }

    #[test]
    fn oculus_lost_orientation_keeps_previous_view() {
        let (mut r, _log) = renderer();
        let fake = FakeOvr::new();
        let head = Mat4::from_rotation_translation(
            glam::Quat::from_rotation_y(-0.25),
            Vec3::new(0.0, 1.6, 0.1),
        );
        fake.0.borrow_mut().head = Some(head);
        let mut device = oculus_device(&fake, &mut r);
        device.render(&mut r);
        let tracked_views = Eye::BOTH.map(|eye| device.camera(eye).view_transform());
        assert!(device.last_frame().tracked);

        fake.0.borrow_mut().head = None;
        device.render(&mut r);
        for eye in Eye::BOTH {
            assert_eq!(device.camera(eye).view_transform(), tracked_views[eye.index()]);
        }
        assert!(!device.last_frame().tracked);
        assert!(device.head_pose().abs_diff_eq(head, EPS));

        // The submitted layer still carries the last good eye poses.
        let layer = fake.0.borrow().layers[1];
        let left = crate::convert::posef_to_mat4(&layer.render_pose[0]);
        assert!(left.abs_diff_eq(head * eye_offset(Eye::Left), 1e-4));

        fake.0.borrow_mut().head = Some(Mat4::IDENTITY);
        device.render(&mut r);
        assert!(device.last_frame().tracked);
        assert_ne!(device.camera(Eye::Left).view_transform(), tracked_views[0]);
    }

    // ── per-frame protocol ───────────────────────────────────────────────

    #[test]
    fn openvr_frame_runs_in_protocol_order() {
        let (mut r, log) = renderer();
        let fake = FakeOpenVr::new();
        let mut device = openvr_device(&fake, &mut r);
        let events = fake.events_handle();
        device.set_render_callback(move |renderer, _target, _camera, eye| {
            events.borrow_mut().push(Event::Callback(eye));
            renderer.clear_screen(Color::BLACK, true, true);
        });
        log.clear();

        device.render(&mut r);

        assert_eq!(
            fake.events(),
            vec![
                Event::WaitPoses,
                Event::Callback(Eye::Left),
                Event::Callback(Eye::Right),
                Event::Submit(Eye::Left),
                Event::Submit(Eye::Right),
                Event::Handoff,
            ]
        );

        let cmds = log.snapshot();
        let flush = cmds.iter().position(|c| *c == GpuCommand::Flush).unwrap();
        let last_unbind = cmds
            .iter()
            .rposition(|c| *c == GpuCommand::BindFramebuffer(None))
            .unwrap();
        let last_clear = cmds
            .iter()
            .rposition(|c| matches!(c, GpuCommand::Clear(_)))
            .unwrap();
        assert!(last_clear < last_unbind);
        assert!(last_unbind < flush);
        assert_eq!(log.count(|c| matches!(c, GpuCommand::Clear(_))), 2);
    }

    #[test]
    fn oculus_frame_commits_then_submits_layer() {
        let (mut r, _log) = renderer();
        let fake = FakeOvr::new();
        let mut device = oculus_device(&fake, &mut r);
        let events = fake.0.borrow().events.clone();
        device.set_render_callback(move |_, _, _, eye| events.borrow_mut().push(Event::Callback(eye)));

        device.render(&mut r);

        assert_eq!(
            fake.events(),
            vec![
                Event::TrackingState(0),
                Event::Callback(Eye::Left),
                Event::Callback(Eye::Right),
                Event::Commit(Eye::Left),
                Event::Commit(Eye::Right),
                Event::SubmitFrame(0),
            ]
        );
        let layer = fake.0.borrow().layers[0];
        let left = crate::convert::posef_to_mat4(&layer.render_pose[0]);
        assert!(left.abs_diff_eq(eye_offset(Eye::Left), EPS));
    }

    #[test]
    fn callback_runs_with_eye_target_bound_and_eye_camera_active() {
        let (mut r, _log) = renderer();
        let fake = FakeOpenVr::new();
        let mut device = openvr_device(&fake, &mut r);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        device.set_render_callback(move |renderer, target, camera, eye| {
            let bound = renderer.gpu().bound().framebuffer == Some(target.framebuffer);
            let active = renderer.camera() == Some(camera);
            sink.borrow_mut().push((eye, bound, active, target.size));
        });

        let mut window_camera = Camera::new();
        window_camera.set_window_coordinates();
        r.set_camera(window_camera);
        device.render(&mut r);

        let size = glam::UVec2::new(1000, 1100);
        assert_eq!(
            *seen.borrow(),
            vec![(Eye::Left, true, true, size), (Eye::Right, true, true, size)]
        );
        assert_eq!(r.camera(), Some(&window_camera));
        assert_eq!(r.gpu().bound().framebuffer, None);
    }

    #[test]
    fn oculus_swap_chain_rotates_targets() {
        let (mut r, _log) = renderer();
        let fake = FakeOvr::new();
        let mut device = oculus_device(&fake, &mut r);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        device.set_render_callback(move |_, target, _, eye| {
            if eye.is_left() {
                sink.borrow_mut().push(target.framebuffer);
            }
        });

        for _ in 0..4 {
            device.render(&mut r);
        }
        let seen = seen.borrow();
        assert_ne!(seen[0], seen[1]);
        assert_ne!(seen[1], seen[2]);
        // Default chain length is 3.
        assert_eq!(seen[0], seen[3]);
    }

    #[test]
    fn compositor_failures_do_not_stop_frames() {
        let (mut r, _log) = renderer();
        let fake = FakeOpenVr::new();
        fake.0.borrow_mut().fail_submit = true;
        let mut device = openvr_device(&fake, &mut r);
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        device.set_render_callback(move |_, _, _, _| *counter.borrow_mut() += 1);

        device.render(&mut r);
        device.render(&mut r);

        assert_eq!(*calls.borrow(), 4);
        assert_eq!(device.frame_index(), 2);
        assert_eq!(device.last_frame().submit_failures, 2);
        assert_eq!(
            fake.events().iter().filter(|e| **e == Event::Handoff).count(),
            2
        );
    }

    #[test]
    fn oculus_commit_failure_is_counted() {
        let (mut r, _log) = renderer();
        let fake = FakeOvr::new();
        fake.0.borrow_mut().fail_commit = true;
        let mut device = oculus_device(&fake, &mut r);
        device.render(&mut r);
        assert_eq!(device.last_frame().submit_failures, 2);
        assert_eq!(fake.0.borrow().layers.len(), 1);
    }

    // ── projection / clip planes ─────────────────────────────────────────

    #[test]
    fn near_far_change_rebuilds_projections_immediately() {
        let (mut r, _log) = renderer();
        let fake = FakeOpenVr::new();
        let mut device = openvr_device(&fake, &mut r);
        let size = device.render_target_size(Eye::Left);
        assert!(
            device
                .camera(Eye::Left)
                .projection_transform(size)
                .abs_diff_eq(openvr_projection(0.1, 100.0), EPS)
        );

        device.set_near_far_planes(0.5, 20.0);
        assert_eq!(device.near_far_planes(), (0.5, 20.0));
        for eye in Eye::BOTH {
            assert!(
                device
                    .camera(eye)
                    .projection_transform(size)
                    .abs_diff_eq(openvr_projection(0.5, 20.0), EPS)
            );
        }
    }

    #[test]
    fn oculus_projection_comes_from_fov_port() {
        let (mut r, _log) = renderer();
        let fake = FakeOvr::new();
        let device = oculus_device(&fake, &mut r);
        let p = device
            .camera(Eye::Left)
            .projection_transform(device.render_target_size(Eye::Left));
        let near = p * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = p * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
        assert_eq!(device.render_target_size(Eye::Right), glam::UVec2::new(1000, 1200));
    }

    // ── controllers / diagnostics ────────────────────────────────────────

    #[test]
    fn controllers_are_reported_in_tracking_space() {
        let (mut r, _log) = renderer();
        let fake = FakeOpenVr::new();
        let hand = Mat4::from_translation(Vec3::new(0.3, 1.0, -0.4));
        fake.0.borrow_mut().controllers = vec![(3, hand)];
        let mut device = openvr_device(&fake, &mut r);
        device.set_view_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)));

        device.render(&mut r);

        let controllers = device.controllers();
        assert_eq!(controllers.len(), 1);
        assert_eq!(controllers[0].id, 3);
        assert!(controllers[0].pose.abs_diff_eq(hand, EPS));
        let world = device.controller_world_transform(&controllers[0]);
        assert!(
            world
                .transform_point3(Vec3::ZERO)
                .abs_diff_eq(Vec3::new(0.3, 1.0, 1.6), EPS)
        );
    }

    #[test]
    fn oculus_reports_tracked_hands_only() {
        let (mut r, _log) = renderer();
        let fake = FakeOvr::new();
        let mut device = oculus_device(&fake, &mut r);
        device.render(&mut r);
        assert_eq!(device.controllers().len(), 1);
        assert_eq!(device.controllers()[0].id, 0);
        assert!(device.controllers()[0].pose.abs_diff_eq(Mat4::IDENTITY, EPS));
    }

    #[test]
    fn debug_info_names_runtime_and_headset() {
        let (mut r, _log) = renderer();
        let openvr = openvr_device(&FakeOpenVr::new(), &mut r);
        let info = openvr.debug_info();
        assert!(info.starts_with("OpenVR"));
        assert!(info.contains("Test HMD 1"));
        assert!(info.contains("1000x1100"));

        let oculus = oculus_device(&FakeOvr::new(), &mut r);
        assert!(oculus.debug_info().contains("Fake Rift"));
    }

    // ── teardown ─────────────────────────────────────────────────────────

    #[test]
    fn release_destroys_targets_then_session() {
        let (mut r, log) = renderer();
        let fake = FakeOpenVr::new();
        let device = openvr_device(&fake, &mut r);
        log.clear();

        device.release(&mut r);

        assert_eq!(log.count(|c| matches!(c, GpuCommand::DestroyRenderTarget(_))), 2);
        assert_eq!(fake.events().last(), Some(&Event::Shutdown));
    }

    #[test]
    fn oculus_release_destroys_every_chain_image() {
        let (mut r, log) = renderer();
        let fake = FakeOvr::new();
        let device = oculus_device(&fake, &mut r);
        let imported = log.count(|c| matches!(c, GpuCommand::ImportRenderTarget(_)));
        assert_eq!(imported, 6);

        device.release(&mut r);

        assert_eq!(
            log.count(|c| matches!(c, GpuCommand::DestroyRenderTarget(_))),
            imported
        );
        assert_eq!(
            fake.events(),
            vec![
                Event::DestroyChain(Eye::Left),
                Event::DestroyChain(Eye::Right),
                Event::Shutdown
            ]
        );
    }
    #[test]
    fn dropped_device_targets_are_destroyed_at_next_present() {
        let (mut r, log) = renderer();
        let fake = FakeOvr::new();
        let mut device = oculus_device(&fake, &mut r);
        device.render(&mut r);
        let imported = log.count(|c| matches!(c, GpuCommand::ImportRenderTarget(_)));
        assert_eq!(imported, 6);

        drop(device);
        assert_eq!(fake.events().last(), Some(&Event::Shutdown));
        assert_eq!(r.gpu().releaser().pending(), imported);

        r.swap_window();
        assert_eq!(
            log.count(|c| matches!(c, GpuCommand::DestroyRenderTarget(_))),
            imported
        );
        assert_eq!(r.gpu().releaser().pending(), 0);
    }

    #[test]
    fn dropped_openvr_device_targets_are_destroyed_at_next_flush() {
        let (mut r, log) = renderer();
        let fake = FakeOpenVr::new();
        let device = openvr_device(&fake, &mut r);
        drop(device);

        r.gpu_mut().flush();
        assert_eq!(log.count(|c| matches!(c, GpuCommand::DestroyRenderTarget(_))), 2);
        assert_eq!(fake.events(), vec![Event::Shutdown]);
    }
}
