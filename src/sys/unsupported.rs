//SPDX-License-Identifier: MPL-2.0
//! Targets without a native window system.  Only the headless backend is available.

use std::sync::Arc;

use raw_window_handle::{HandleError, RawDisplayHandle, RawWindowHandle};

use crate::config::WindowConfig;
use crate::coordinates::{Position, Size};
use crate::error::WindowError;
use crate::module::Context;
use crate::window::{Adapter, CreateParams, NativeHandle, WindowShared};

pub(crate) const NAME: &str = "unsupported";

#[derive(Debug)]
pub(crate) enum System {}

impl System {
    pub fn new(_config: &WindowConfig) -> Result<Self, WindowError> {
        logwise::error_sync!("No native window system on this target; use the headless backend");
        Err(WindowError::Unsupported(NAME))
    }
    pub fn create_window(&self, _: &Arc<WindowShared>, _: &CreateParams<'_>) -> Result<(), WindowError> {
        match *self {}
    }
    pub fn wrap_window(&self, _: &Arc<WindowShared>, _: NativeHandle) -> Result<(), WindowError> {
        match *self {}
    }
    pub fn screen_size(&self, _: Adapter) -> Result<Size, WindowError> {
        match *self {}
    }
    pub fn pump_pending(&self, _: &Context) -> Result<usize, WindowError> {
        match *self {}
    }
    pub fn run_loop(&self, _: &Context) -> Result<(), WindowError> {
        match *self {}
    }
    pub fn wake(&self) {
        match *self {}
    }
    pub fn finalize(&self) {
        match *self {}
    }
}

#[derive(Debug)]
pub(crate) enum Window {}

impl Window {
    pub fn is_open(&self) -> bool { match *self {} }
    pub fn uses_registry(&self) -> bool { match *self {} }
    pub fn destroy(&self, _: &WindowShared) { match *self {} }
    pub fn resize(&self, _: &WindowShared, _: Size) -> Result<(), WindowError> { match *self {} }
    pub fn move_to(&self, _: &WindowShared, _: Position) -> Result<(), WindowError> { match *self {} }
    pub fn maximize(&self, _: &WindowShared) -> Result<(), WindowError> { match *self {} }
    pub fn minimize(&self, _: &WindowShared) -> Result<(), WindowError> { match *self {} }
    pub fn restore(&self, _: &WindowShared) -> Result<(), WindowError> { match *self {} }
    pub fn is_visible(&self) -> Result<bool, WindowError> { match *self {} }
    pub fn is_maximized(&self) -> Result<bool, WindowError> { match *self {} }
    pub fn is_minimized(&self) -> Result<bool, WindowError> { match *self {} }
    pub fn has_focus(&self) -> Result<bool, WindowError> { match *self {} }
    pub fn size(&self) -> Result<Size, WindowError> { match *self {} }
    pub fn position(&self) -> Result<Position, WindowError> { match *self {} }
    pub fn set_title(&self, _: &str) -> Result<(), WindowError> { match *self {} }
    pub fn show_cursor(&self, _: bool, _: bool) -> Result<(), WindowError> { match *self {} }
    pub fn set_cursor_pos(&self, _: Position) -> Result<(), WindowError> { match *self {} }
    pub fn is_cursor_locked(&self) -> Result<bool, WindowError> { match *self {} }
    pub fn fit_to_screen(&self, _: &WindowShared) -> Result<(), WindowError> { match *self {} }
    pub fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError> { match *self {} }
    pub fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError> { match *self {} }
}
