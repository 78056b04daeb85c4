//SPDX-License-Identifier: MPL-2.0

use std::ffi::c_void;
use std::fmt::Debug;
use std::num::NonZeroIsize;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use raw_window_handle::{DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle};

use crate::bridge::{BridgeState, NativeSignal};
use crate::coordinates::{Position, Size};
use crate::error::WindowError;
use crate::event::{NativePayload, WindowEventId, WindowId, WindowRef};
use crate::module::{Context, WindowModule};
use crate::sys::{self, NativeWindow};

bitflags::bitflags! {
    /**
    Creation flags for [`Window::create`].
    */
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowFlags: u32 {
        /// Do not show the window after creation.
        const NO_SHOW = 0x0001;
        /// Caption without system menu (minimize/maximize/close buttons).
        const NO_SYSTEM_MENU = 0x0002;
        /// Borderless window covering the whole screen.
        const FULLSCREEN = 0x0004;
        /// The user cannot resize the window by dragging its border.
        const NO_RESIZE = 0x0008;
    }
}

/**
The monitor or display a window is placed on.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Adapter(Option<u32>);

impl Adapter {
    /// The platform's default display.
    pub const DEFAULT: Adapter = Adapter(None);

    pub const fn index(index: u32) -> Adapter {
        Adapter(Some(index))
    }

    pub const fn get(&self) -> Option<u32> {
        self.0
    }

    pub const fn is_default(&self) -> bool {
        self.0.is_none()
    }
}

/**
An externally owned native window to wrap with [`Window::wrap`].
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NativeHandle {
    /// A Win32 `HWND`.
    Win32 { hwnd: NonZeroIsize },
    /// An X11 window on the module's display connection.
    Xlib { window: u64 },
    /// An AppKit `NSView`.
    AppKit { ns_view: NonNull<c_void> },
    /// A UIKit `UIView`.
    UiKit { ui_view: NonNull<c_void> },
    /// An Android `ANativeWindow`.
    AndroidNdk { a_native_window: NonNull<c_void> },
    /// A window on the headless server, see [`crate::HeadlessServer::create_foreign`].
    Headless { window: u64 },
}

pub(crate) struct CreateParams<'a> {
    pub adapter: Adapter,
    pub title: &'a str,
    pub size: Size,
    pub flags: WindowFlags,
}

/**
State shared between a [`Window`], the native callback that serves it, and weak event references.
*/
pub(crate) struct WindowShared {
    id: WindowId,
    self_ref: Weak<WindowShared>,
    context: Arc<Context>,
    created: bool,
    adapter: Adapter,
    flags: WindowFlags,
    bridge: Mutex<BridgeState>,
    native: OnceLock<NativeWindow>,
}

impl Debug for WindowShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowShared")
            .field("id", &self.id)
            .field("created", &self.created)
            .field("adapter", &self.adapter)
            .field("flags", &self.flags)
            .finish()
    }
}

impl WindowShared {
    fn new(context: Arc<Context>, created: bool, adapter: Adapter, flags: WindowFlags) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| WindowShared {
            id: WindowId::next(),
            self_ref: self_ref.clone(),
            context,
            created,
            adapter,
            flags,
            bridge: Mutex::new(BridgeState::default()),
            native: OnceLock::new(),
        })
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn flags(&self) -> WindowFlags {
        self.flags
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn window_ref(&self) -> WindowRef {
        WindowRef::new(self.id, self.self_ref.clone())
    }

    /**
    Installs the native window.  Backends call this before the window becomes visible to the
    native event source.
    */
    pub fn attach(&self, native: NativeWindow) {
        if self.native.set(native).is_err() {
            logwise::warn_sync!(
                "Native window attached twice to window {id}",
                id = logwise::privacy::LogIt(&self.id)
            );
        }
    }

    pub fn native(&self) -> Result<&NativeWindow, WindowError> {
        match self.native.get() {
            Some(native) if native.is_open() => Ok(native),
            _ => Err(WindowError::InvalidWindow),
        }
    }

    pub fn is_open(&self) -> bool {
        self.native.get().map(|n| n.is_open()).unwrap_or(false)
    }

    pub fn post(&self, id: WindowEventId) {
        self.context.stream.post(id, self.window_ref(), None);
    }

    pub fn post_native(&self, payload: NativePayload) {
        self.context
            .stream
            .post(WindowEventId::Native, self.window_ref(), Some(payload));
    }

    /**
    Runs `signal` through this window's bridge state at the current generation token.
    */
    pub fn apply_signal(&self, signal: NativeSignal) {
        let token = self.context.token.current();
        let emitted = self
            .bridge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(signal, token, self.created);
        for id in emitted.into_iter().flatten() {
            self.post(id);
        }
    }

    /// Visibility as last reported through the bridge.
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    pub fn bridge_visible(&self) -> bool {
        self.bridge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .visible
    }

    fn finalize(&self) {
        let Some(native) = self.native.get() else {
            return;
        };
        if !native.is_open() {
            return;
        }
        if self.created && native.uses_registry() {
            if let Some(this) = self.self_ref.upgrade() {
                self.context.registry.unregister(&this);
            }
        }
        native.destroy(self);
    }
}

/**
A native window.

Dropping the window finalizes it: a window this library created is destroyed (emitting
[`WindowEventId::Destroy`]); a wrapped window is only released from the library.
*/
pub struct Window {
    shared: Arc<WindowShared>,
}

impl Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.shared.id)
            .field("created", &self.shared.created)
            .field("open", &self.shared.is_open())
            .finish()
    }
}

impl Window {
    /**
    Creates and registers a native window, posting [`WindowEventId::Create`].

    On failure the reason is logged and returned; no window exists afterwards.
    */
    pub fn create(
        module: &WindowModule,
        adapter: Adapter,
        title: &str,
        width: u32,
        height: u32,
        flags: WindowFlags,
    ) -> Result<Window, WindowError> {
        let system = module.system()?;
        if width == 0 || height == 0 {
            return Err(WindowError::InvalidArgument("window size must be non-zero"));
        }
        logwise::debuginternal_sync!(
            "Creating window {title} {width}x{height}",
            title = logwise::privacy::LogIt(&title),
            width = width,
            height = height
        );
        let shared = WindowShared::new(module.context().clone(), true, adapter, flags);
        let params = CreateParams {
            adapter,
            title,
            size: Size::new(width, height),
            flags,
        };
        match system.create_window(&shared, &params) {
            Ok(()) => Ok(Window { shared }),
            Err(e) => {
                logwise::error_sync!(
                    "Unable to create window: {err}",
                    err = logwise::privacy::LogIt(&e)
                );
                Err(e)
            }
        }
    }

    /**
    Wraps an externally owned native window.

    The library never destroys a wrapped native window and never reports
    [`WindowEventId::Destroy`] for it.
    */
    pub fn wrap(module: &WindowModule, handle: NativeHandle) -> Result<Window, WindowError> {
        let system = module.system()?;
        let shared = WindowShared::new(module.context().clone(), false, Adapter::DEFAULT, WindowFlags::empty());
        system.wrap_window(&shared, handle)?;
        Ok(Window { shared })
    }

    pub fn id(&self) -> WindowId {
        self.shared.id
    }

    /// A weak reference to this window, as carried by events.
    pub fn window_ref(&self) -> WindowRef {
        self.shared.window_ref()
    }

    pub fn adapter(&self) -> Adapter {
        self.shared.adapter
    }

    pub fn flags(&self) -> WindowFlags {
        self.shared.flags
    }

    /// Whether this library created (and owns) the native window.
    pub fn is_created(&self) -> bool {
        self.shared.created
    }

    /**
    Finalizes the window now.  Equivalent to dropping it.
    */
    pub fn destroy(self) {
        drop(self)
    }

    /**
    Forwards a native notification into the bridge.

    This is the entry point for platform glue that receives window callbacks itself, such as an
    AppKit delegate or an Android activity.  `payload` is posted as a [`WindowEventId::Native`]
    event ahead of the translated events.
    */
    pub fn deliver(&self, signal: NativeSignal, payload: Option<Vec<u8>>) {
        if let Some(bytes) = payload {
            self.shared
                .post_native(NativePayload::Bytes(bytes.into_boxed_slice()));
        }
        self.shared.apply_signal(signal);
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    pub(crate) fn native(&self) -> Result<&NativeWindow, WindowError> {
        self.shared.native()
    }

    pub fn is_visible(&self) -> Result<bool, WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.is_visible())
    }

    pub fn is_maximized(&self) -> Result<bool, WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.is_maximized())
    }

    pub fn is_minimized(&self) -> Result<bool, WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.is_minimized())
    }

    pub fn has_focus(&self) -> Result<bool, WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.has_focus())
    }

    pub fn maximize(&self) -> Result<(), WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.maximize(&self.shared))
    }

    pub fn minimize(&self) -> Result<(), WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.minimize(&self.shared))
    }

    pub fn restore(&self) -> Result<(), WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.restore(&self.shared))
    }

    /**
    Resizes the client area.  A maximized window is restored first.
    */
    pub fn resize(&self, width: u32, height: u32) -> Result<(), WindowError> {
        if width == 0 || height == 0 {
            return Err(WindowError::InvalidArgument("window size must be non-zero"));
        }
        sys::dispatch!(self.shared.native()?, w => w.resize(&self.shared, Size::new(width, height)))
    }

    /**
    Moves the window.  A maximized window is restored first.
    */
    pub fn move_to(&self, x: i32, y: i32) -> Result<(), WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.move_to(&self.shared, Position::new(x, y)))
    }

    /// Client area size.
    pub fn size(&self) -> Result<Size, WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.size())
    }

    pub fn width(&self) -> Result<u32, WindowError> {
        self.size().map(|s| s.width())
    }

    pub fn height(&self) -> Result<u32, WindowError> {
        self.size().map(|s| s.height())
    }

    /// Position of the window on its screen.
    pub fn position(&self) -> Result<Position, WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.position())
    }

    pub fn position_x(&self) -> Result<i32, WindowError> {
        self.position().map(|p| p.x())
    }

    pub fn position_y(&self) -> Result<i32, WindowError> {
        self.position().map(|p| p.y())
    }

    pub fn set_title(&self, title: &str) -> Result<(), WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.set_title(title))
    }

    /**
    Shows or hides the cursor over this window.  `lock` confines the cursor to the window.
    */
    pub fn show_cursor(&self, show: bool, lock: bool) -> Result<(), WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.show_cursor(show, lock))
    }

    /// Warps the cursor to a position relative to the client area.
    pub fn set_cursor_pos(&self, x: i32, y: i32) -> Result<(), WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.set_cursor_pos(Position::new(x, y)))
    }

    pub fn is_cursor_locked(&self) -> Result<bool, WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.is_cursor_locked())
    }

    /**
    Shrinks and moves the window so it is fully visible on its screen, keeping its aspect ratio.
    */
    pub fn fit_to_screen(&self) -> Result<(), WindowError> {
        sys::dispatch!(self.shared.native()?, w => w.fit_to_screen(&self.shared))
    }

    /**
    Opaque pointer identifying this window to native callback glue.

    Valid until the window is finalized.  Callback-driven platform glue passes it back to the
    exported `window_bridge_notify` functions.
    */
    pub fn native_user_data(&self) -> *const c_void {
        Arc::as_ptr(&self.shared) as *const c_void
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.shared.finalize();
    }
}

impl HasWindowHandle for Window {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        let native = self.shared.native().map_err(|_| HandleError::Unavailable)?;
        let raw = sys::dispatch!(native, w => w.raw_window_handle())?;
        //SAFETY: the handle stays valid while `self` is borrowed, since only finalization destroys it
        Ok(unsafe { WindowHandle::borrow_raw(raw) })
    }
}

impl HasDisplayHandle for Window {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        let native = self.shared.native().map_err(|_| HandleError::Unavailable)?;
        let raw = sys::dispatch!(native, w => w.raw_display_handle())?;
        //SAFETY: the display connection outlives every window that uses it
        Ok(unsafe { DisplayHandle::borrow_raw(raw) })
    }
}

#[cfg(test)]
mod test {
    use crate::window::Window;

    #[test]
    fn test_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Window>();
        fn assert_sync<T: Sync>() {}
        assert_sync::<Window>();
    }
}
