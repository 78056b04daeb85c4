//SPDX-License-Identifier: MPL-2.0
/*!
Backend selection.

Every module runs on one [`System`]: the platform's native window system or the headless server.
Windows carry the matching [`NativeWindow`] variant.
*/

use std::sync::Arc;

use crate::coordinates::Size;
use crate::error::WindowError;
use crate::module::Context;
use crate::window::{Adapter, CreateParams, NativeHandle, WindowShared};

pub mod headless;

#[cfg(target_os = "windows")]
pub(crate) mod windows;
#[cfg(target_os = "windows")]
pub(crate) use self::windows as native;

#[cfg(target_os = "linux")]
pub(crate) mod linux;
#[cfg(target_os = "linux")]
pub(crate) use self::linux as native;

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "android"))]
pub(crate) mod reactive;
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "android"))]
pub(crate) use self::reactive as native;

#[cfg(not(any(
    target_os = "windows",
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "android"
)))]
pub(crate) mod unsupported;
#[cfg(not(any(
    target_os = "windows",
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "android"
)))]
pub(crate) use self::unsupported as native;

pub(crate) const NATIVE_BACKEND_NAME: &str = native::NAME;

#[derive(Debug)]
pub(crate) enum System {
    Headless(headless::Server),
    Native(native::System),
}

#[derive(Debug)]
pub(crate) enum NativeWindow {
    Headless(headless::Window),
    Native(native::Window),
}

/**
Calls the same method on whichever backend window `$native` holds.
*/
macro_rules! dispatch {
    ($native:expr, $w:ident => $call:expr) => {
        match $native {
            $crate::sys::NativeWindow::Headless($w) => $call,
            $crate::sys::NativeWindow::Native($w) => $call,
        }
    };
}
pub(crate) use dispatch;

impl NativeWindow {
    pub fn is_open(&self) -> bool {
        dispatch!(self, w => w.is_open())
    }

    /// Whether the window is found through the module's registry by the message loop.
    pub fn uses_registry(&self) -> bool {
        dispatch!(self, w => w.uses_registry())
    }

    pub fn destroy(&self, shared: &WindowShared) {
        dispatch!(self, w => w.destroy(shared))
    }
}

impl System {
    pub fn create_window(
        &self,
        shared: &Arc<WindowShared>,
        params: &CreateParams<'_>,
    ) -> Result<(), WindowError> {
        match self {
            System::Headless(server) => server.create_window(shared, params),
            System::Native(system) => system.create_window(shared, params),
        }
    }

    pub fn wrap_window(&self, shared: &Arc<WindowShared>, handle: NativeHandle) -> Result<(), WindowError> {
        match (self, handle) {
            (System::Headless(server), NativeHandle::Headless { window }) => {
                server.wrap_window(shared, window)
            }
            (System::Headless(_), _) => Err(WindowError::Unsupported("headless")),
            (System::Native(system), handle) => system.wrap_window(shared, handle),
        }
    }

    pub fn screen_size(&self, adapter: Adapter) -> Result<Size, WindowError> {
        match self {
            System::Headless(server) => server.screen_size(adapter),
            System::Native(system) => system.screen_size(adapter),
        }
    }

    pub fn pump_pending(&self, context: &Context) -> Result<usize, WindowError> {
        match self {
            System::Headless(server) => server.pump_pending(context),
            System::Native(system) => system.pump_pending(context),
        }
    }

    pub fn run_loop(&self, context: &Context) -> Result<(), WindowError> {
        match self {
            System::Headless(server) => server.run_loop(context),
            System::Native(system) => system.run_loop(context),
        }
    }

    /// Interrupts a blocked native wait.  Safe from any thread.
    pub fn wake(&self) {
        match self {
            System::Headless(server) => server.wake(),
            System::Native(system) => system.wake(),
        }
    }

    pub fn finalize(&self) {
        match self {
            System::Headless(server) => server.finalize(),
            System::Native(system) => system.finalize(),
        }
    }
}
