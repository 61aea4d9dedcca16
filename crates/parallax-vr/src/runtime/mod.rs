//! Tracking runtime boundary.
//!
//! Vendor SDK bindings live outside this crate. An application registers a loader per
//! runtime it can reach; [`VrDevice::create`](crate::VrDevice::create) calls the loader
//! for the requested backend and treats any failure as "no VR this run".

pub mod oculus;
pub mod openvr;

use std::fmt;

use crate::config::VrBackendKind;
use crate::error::VrError;

pub use oculus::OvrSession;
pub use openvr::OpenVrRuntime;

type OpenVrLoader = Box<dyn Fn() -> Result<Box<dyn OpenVrRuntime>, VrError>>;
type OculusLoader = Box<dyn Fn() -> Result<Box<dyn OvrSession>, VrError>>;

/// Registry of runtime loaders.
#[derive(Default)]
pub struct VrRuntimes {
    openvr: Option<OpenVrLoader>,
    oculus: Option<OculusLoader>,
}

impl VrRuntimes {
    /// A registry with no runtimes; every session request fails.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_openvr<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn OpenVrRuntime>, VrError> + 'static,
    {
        self.openvr = Some(Box::new(loader));
        self
    }

    pub fn with_oculus<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn OvrSession>, VrError> + 'static,
    {
        self.oculus = Some(Box::new(loader));
        self
    }

    pub fn is_registered(&self, kind: VrBackendKind) -> bool {
        match kind {
            VrBackendKind::OpenVr => self.openvr.is_some(),
            VrBackendKind::Oculus => self.oculus.is_some(),
        }
    }

    pub(crate) fn open_openvr(&self) -> Result<Box<dyn OpenVrRuntime>, VrError> {
        let loader = self
            .openvr
            .as_ref()
            .ok_or(VrError::RuntimeNotInstalled(VrBackendKind::OpenVr))?;
        loader()
    }

    pub(crate) fn open_oculus(&self) -> Result<Box<dyn OvrSession>, VrError> {
        let loader = self
            .oculus
            .as_ref()
            .ok_or(VrError::RuntimeNotInstalled(VrBackendKind::Oculus))?;
        loader()
    }
}

impl fmt::Debug for VrRuntimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VrRuntimes")
            .field("openvr", &self.openvr.is_some())
            .field("oculus", &self.oculus.is_some())
            .finish()
    }
}
