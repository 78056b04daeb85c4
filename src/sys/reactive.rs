//SPDX-License-Identifier: MPL-2.0
/*!
Callback-driven backend for AppKit, UIKit and Android.

On these platforms the OS owns the run loop and the native window; platform glue (an `NSWindow`
delegate, a `UIViewController`, an Android activity) wraps its view with
[`crate::Window::wrap`], hands [`crate::Window::native_user_data`] to its callbacks, and reports
notifications through the exported `window_bridge_notify*` functions.  The window's geometry and
state are cached from those notifications.
*/

use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use raw_window_handle::{HandleError, RawDisplayHandle, RawWindowHandle};
#[cfg(target_os = "android")]
use raw_window_handle::{AndroidDisplayHandle, AndroidNdkWindowHandle};
#[cfg(target_os = "macos")]
use raw_window_handle::{AppKitDisplayHandle, AppKitWindowHandle};
#[cfg(target_os = "ios")]
use raw_window_handle::{UiKitDisplayHandle, UiKitWindowHandle};

use crate::bridge::NativeSignal;
use crate::config::WindowConfig;
use crate::coordinates::{Position, Rect, Size};
use crate::error::WindowError;
use crate::event::NativePayload;
use crate::message_loop::{self, Pump, PumpStatus};
use crate::module::Context;
use crate::window::{Adapter, CreateParams, NativeHandle, WindowShared};

#[cfg(target_os = "macos")]
pub(crate) const NAME: &str = "appkit";
#[cfg(target_os = "ios")]
pub(crate) const NAME: &str = "uikit";
#[cfg(target_os = "android")]
pub(crate) const NAME: &str = "android";

/**
Signal codes accepted by [`window_bridge_notify`].
*/
fn signal_from_code(code: u32) -> Option<NativeSignal> {
    Some(match code {
        1 => NativeSignal::Shown,
        2 => NativeSignal::Hidden,
        3 => NativeSignal::Resized,
        4 => NativeSignal::Moved,
        5 => NativeSignal::Paint,
        6 => NativeSignal::FocusGained,
        7 => NativeSignal::FocusLost,
        8 => NativeSignal::CloseRequested,
        9 => NativeSignal::LiveResizeStarted,
        10 => NativeSignal::LiveResizeEnded,
        11 => NativeSignal::Configured,
        _ => return None,
    })
}

/// Notifications arrived or a quit was requested.
#[derive(Debug, Default)]
struct Wakeup {
    pending: Mutex<bool>,
    ready: Condvar,
}

impl Wakeup {
    fn signal(&self) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.ready.notify_all();
    }

    fn wait(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        while !*pending {
            pending = self
                .ready
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *pending = false;
    }
}

#[derive(Debug)]
pub(crate) struct System {
    wakeup: Arc<Wakeup>,
}

impl System {
    pub fn new(_config: &WindowConfig) -> Result<Self, WindowError> {
        Ok(System {
            wakeup: Arc::new(Wakeup::default()),
        })
    }

    pub fn screen_size(&self, _adapter: Adapter) -> Result<Size, WindowError> {
        Err(WindowError::Unsupported(NAME))
    }

    pub fn create_window(&self, _shared: &Arc<WindowShared>, _params: &CreateParams<'_>) -> Result<(), WindowError> {
        logwise::warn_sync!("Windows are owned by the platform here; wrap the native view instead");
        Err(WindowError::Unsupported(NAME))
    }

    pub fn wrap_window(&self, shared: &Arc<WindowShared>, handle: NativeHandle) -> Result<(), WindowError> {
        let view = match handle {
            #[cfg(target_os = "macos")]
            NativeHandle::AppKit { ns_view } => ns_view,
            #[cfg(target_os = "ios")]
            NativeHandle::UiKit { ui_view } => ui_view,
            #[cfg(target_os = "android")]
            NativeHandle::AndroidNdk { a_native_window } => a_native_window,
            _ => return Err(WindowError::Unsupported(NAME)),
        };
        shared.attach(super::NativeWindow::Native(Window {
            view: view.as_ptr() as usize,
            wakeup: self.wakeup.clone(),
            open: AtomicBool::new(true),
            state: Mutex::new(CachedState::default()),
        }));
        Ok(())
    }

    pub fn wake(&self) {
        self.wakeup.signal();
    }

    pub fn finalize(&self) {}

    pub fn pump_pending(&self, _context: &Context) -> Result<usize, WindowError> {
        Ok(0)
    }

    pub fn run_loop(&self, context: &Context) -> Result<(), WindowError> {
        let mut pump = ReactivePump {
            wakeup: &self.wakeup,
        };
        message_loop::run(&context.loop_control, &context.token, &mut pump)
    }
}

struct ReactivePump<'a> {
    wakeup: &'a Wakeup,
}

impl Pump for ReactivePump<'_> {
    fn pump_once(&mut self) -> Result<PumpStatus, WindowError> {
        self.wakeup.wait();
        Ok(PumpStatus::Continue)
    }
}

#[derive(Debug, Default)]
struct CachedState {
    frame: Rect,
    visible: bool,
    minimized: bool,
    focused: bool,
}

#[derive(Debug)]
pub(crate) struct Window {
    view: usize,
    wakeup: Arc<Wakeup>,
    open: AtomicBool,
    state: Mutex<CachedState>,
}

impl Window {
    fn state(&self) -> std::sync::MutexGuard<'_, CachedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe(&self, signal: NativeSignal) {
        let mut state = self.state();
        match signal {
            NativeSignal::Shown => {
                state.visible = true;
                state.minimized = false;
            }
            NativeSignal::Hidden => state.visible = false,
            NativeSignal::FocusGained => state.focused = true,
            NativeSignal::FocusLost => state.focused = false,
            _ => {}
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn uses_registry(&self) -> bool {
        false
    }

    pub fn destroy(&self, _shared: &WindowShared) {
        self.open.store(false, Ordering::Release);
    }

    pub fn resize(&self, _shared: &WindowShared, _size: Size) -> Result<(), WindowError> {
        Err(WindowError::Unsupported(NAME))
    }

    pub fn move_to(&self, _shared: &WindowShared, _position: Position) -> Result<(), WindowError> {
        Err(WindowError::Unsupported(NAME))
    }

    pub fn maximize(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        Err(WindowError::Unsupported(NAME))
    }

    pub fn minimize(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        Err(WindowError::Unsupported(NAME))
    }

    pub fn restore(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        Err(WindowError::Unsupported(NAME))
    }

    pub fn is_visible(&self) -> Result<bool, WindowError> {
        Ok(self.state().visible)
    }

    pub fn is_maximized(&self) -> Result<bool, WindowError> {
        Ok(false)
    }

    pub fn is_minimized(&self) -> Result<bool, WindowError> {
        Ok(self.state().minimized)
    }

    pub fn has_focus(&self) -> Result<bool, WindowError> {
        Ok(self.state().focused)
    }

    pub fn size(&self) -> Result<Size, WindowError> {
        Ok(self.state().frame.size())
    }

    pub fn position(&self) -> Result<Position, WindowError> {
        Ok(self.state().frame.origin())
    }

    pub fn set_title(&self, _title: &str) -> Result<(), WindowError> {
        Err(WindowError::Unsupported(NAME))
    }

    pub fn show_cursor(&self, _show: bool, _lock: bool) -> Result<(), WindowError> {
        Err(WindowError::Unsupported(NAME))
    }

    pub fn set_cursor_pos(&self, _position: Position) -> Result<(), WindowError> {
        Err(WindowError::Unsupported(NAME))
    }

    pub fn is_cursor_locked(&self) -> Result<bool, WindowError> {
        Ok(false)
    }

    pub fn fit_to_screen(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        Err(WindowError::Unsupported(NAME))
    }

    fn view(&self) -> Result<NonNull<c_void>, HandleError> {
        NonNull::new(self.view as *mut c_void).ok_or(HandleError::Unavailable)
    }

    pub fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError> {
        let view = self.view()?;
        #[cfg(target_os = "macos")]
        return Ok(RawWindowHandle::AppKit(AppKitWindowHandle::new(view)));
        #[cfg(target_os = "ios")]
        return Ok(RawWindowHandle::UiKit(UiKitWindowHandle::new(view)));
        #[cfg(target_os = "android")]
        return Ok(RawWindowHandle::AndroidNdk(AndroidNdkWindowHandle::new(view)));
    }

    pub fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError> {
        #[cfg(target_os = "macos")]
        return Ok(RawDisplayHandle::AppKit(AppKitDisplayHandle::new()));
        #[cfg(target_os = "ios")]
        return Ok(RawDisplayHandle::UiKit(UiKitDisplayHandle::new()));
        #[cfg(target_os = "android")]
        return Ok(RawDisplayHandle::Android(AndroidDisplayHandle::new()));
    }
}

fn native_of(shared: &WindowShared) -> Option<&Window> {
    match shared.native().ok()? {
        super::NativeWindow::Native(window) => Some(window),
        super::NativeWindow::Headless(_) => None,
    }
}

/**
Reports a native notification for the window behind `user_data`.

# Safety
`user_data` must come from [`crate::Window::native_user_data`] of a window that is still alive.
*/
#[unsafe(no_mangle)]
pub unsafe extern "C" fn window_bridge_notify(user_data: *const c_void, code: u32) {
    let Some(shared) = (unsafe { (user_data as *const WindowShared).as_ref() }) else {
        return;
    };
    let Some(signal) = signal_from_code(code) else {
        logwise::warn_sync!("Unknown native signal {code}", code = code);
        return;
    };
    shared.post_native(NativePayload::Bytes(code.to_ne_bytes().into()));
    if let Some(window) = native_of(shared) {
        window.observe(signal);
        window.wakeup.signal();
    }
    shared.apply_signal(signal);
}

/**
Reports a new frame, in points, for the window behind `user_data`.

# Safety
As for [`window_bridge_notify`].
*/
#[unsafe(no_mangle)]
pub unsafe extern "C" fn window_bridge_notify_frame(
    user_data: *const c_void,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) {
    let Some(shared) = (unsafe { (user_data as *const WindowShared).as_ref() }) else {
        return;
    };
    let Some(window) = native_of(shared) else {
        return;
    };
    let frame = Rect::new(
        Position::new(x as i32, y as i32),
        Size::new(width.max(0.0) as u32, height.max(0.0) as u32),
    );
    let previous = std::mem::replace(&mut window.state().frame, frame);
    if previous.size() != frame.size() {
        shared.apply_signal(NativeSignal::Resized);
    }
    if previous.origin() != frame.origin() {
        shared.apply_signal(NativeSignal::Moved);
    }
    window.wakeup.signal();
}

/**
Reports that the window behind `user_data` was miniaturized (or backgrounded).

# Safety
As for [`window_bridge_notify`].
*/
#[unsafe(no_mangle)]
pub unsafe extern "C" fn window_bridge_notify_minimized(user_data: *const c_void, minimized: bool) {
    let Some(shared) = (unsafe { (user_data as *const WindowShared).as_ref() }) else {
        return;
    };
    if let Some(window) = native_of(shared) {
        window.state().minimized = minimized;
        window.wakeup.signal();
    }
    if minimized {
        shared.apply_signal(NativeSignal::Hidden);
    } else {
        shared.apply_signal(NativeSignal::Shown);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn signal_codes_round_trip_known_values() {
        assert_eq!(signal_from_code(1), Some(NativeSignal::Shown));
        assert_eq!(signal_from_code(8), Some(NativeSignal::CloseRequested));
        assert_eq!(signal_from_code(0), None);
        assert_eq!(signal_from_code(99), None);
    }
}
