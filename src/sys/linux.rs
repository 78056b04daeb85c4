//SPDX-License-Identifier: MPL-2.0
/*!
X11 backend.

One display connection serves every window of a module.  It is opened when the module is
initialized, after `XInitThreads`, so window operations may come from any thread while the message
loop waits on the connection.  The display lock is always taken before the registry lock.  The loop waits on the connection fd and an eventfd; a quit request writes the eventfd.
*/

use std::ffi::{CStr, CString, c_int, c_long, c_uchar, c_uint, c_ulong, c_void};
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once, PoisonError};

use raw_window_handle::{
    HandleError, RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle,
};
use x11_dl::xlib::{self, Atom, Display, XEvent, Xlib};

use crate::bridge::NativeSignal;
use crate::config::WindowConfig;
use crate::coordinates::{Position, Rect, Size, clamp_onto, fit_within};
use crate::error::WindowError;
use crate::event::{NativePayload, WindowEventId};
use crate::message_loop::{self, Pump, PumpStatus};
use crate::module::Context;
use crate::window::{Adapter, CreateParams, NativeHandle, WindowFlags, WindowShared};

pub(crate) const NAME: &str = "x11";

const EVENT_MASK: c_long = xlib::ExposureMask
    | xlib::StructureNotifyMask
    | xlib::VisibilityChangeMask
    | xlib::FocusChangeMask
    | xlib::KeyPressMask
    | xlib::KeyReleaseMask
    | xlib::ButtonPressMask
    | xlib::ButtonReleaseMask
    | xlib::PointerMotionMask
    | xlib::PropertyChangeMask;

const NET_WM_STATE_REMOVE: c_long = 0;
const NET_WM_STATE_ADD: c_long = 1;
//source indication: normal application
const NET_WM_SOURCE_APPLICATION: c_long = 1;

//ICCCM WM_STATE value of an iconified window
const ICONIC_STATE: c_ulong = 3;

//XEventsQueued mode that never touches the socket
const QUEUED_ALREADY: c_int = 0;

const MWM_HINTS_FUNCTIONS: c_long = 1 << 0;
const MWM_FUNC_RESIZE: c_long = 1 << 1;
const MWM_FUNC_MOVE: c_long = 1 << 2;

/**
The loaded Xlib function table.
*/
struct Lib(Xlib);

//SAFETY: Xlib is a table of function pointers into a library that stays loaded for the table's lifetime
unsafe impl Send for Lib {}
unsafe impl Sync for Lib {}

impl std::ops::Deref for Lib {
    type Target = Xlib;
    fn deref(&self) -> &Xlib {
        &self.0
    }
}

unsafe extern "C" fn error_handler(_display: *mut Display, event: *mut xlib::XErrorEvent) -> c_int {
    if let Some(event) = unsafe { event.as_ref() } {
        logwise::error_sync!(
            "X11 error {code} (request {request}.{minor}) on resource {resource}",
            code = event.error_code,
            request = event.request_code,
            minor = event.minor_code,
            resource = event.resourceid
        );
    }
    0
}

#[derive(Debug, Copy, Clone)]
struct Atoms {
    wm_protocols: Atom,
    wm_delete_window: Atom,
    wm_state: Atom,
    net_wm_state: Atom,
    net_wm_state_maximized_horz: Atom,
    net_wm_state_maximized_vert: Atom,
    net_wm_state_fullscreen: Atom,
    motif_wm_hints: Atom,
}

impl Atoms {
    unsafe fn intern(xlib: &Xlib, display: *mut Display) -> Atoms {
        let intern = |name: &CStr| unsafe { (xlib.XInternAtom)(display, name.as_ptr(), xlib::False) };
        Atoms {
            wm_protocols: intern(c"WM_PROTOCOLS"),
            wm_delete_window: intern(c"WM_DELETE_WINDOW"),
            wm_state: intern(c"WM_STATE"),
            net_wm_state: intern(c"_NET_WM_STATE"),
            net_wm_state_maximized_horz: intern(c"_NET_WM_STATE_MAXIMIZED_HORZ"),
            net_wm_state_maximized_vert: intern(c"_NET_WM_STATE_MAXIMIZED_VERT"),
            net_wm_state_fullscreen: intern(c"_NET_WM_STATE_FULLSCREEN"),
            motif_wm_hints: intern(c"_MOTIF_WM_HINTS"),
        }
    }
}

/**
An open display connection.  Closed when the last window and the system release it.
*/
struct Connection {
    lib: Arc<Lib>,
    display: *mut Display,
    default_screen: c_int,
    atoms: Atoms,
}

//SAFETY: XInitThreads runs before the display is opened, so Xlib serializes access internally;
//compound operations additionally hold XLockDisplay
unsafe impl Send for Connection {}
unsafe impl Sync for Connection {}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("display", &self.display)
            .field("default_screen", &self.default_screen)
            .finish()
    }
}

struct DisplayGuard<'a> {
    connection: &'a Connection,
}

impl DisplayGuard<'_> {
    /**
    Reads and dispatches every event already available on the connection.
    */
    fn drain(&self, windows: &[Arc<WindowShared>]) -> usize {
        let connection = self.connection;
        let mut handled = 0;
        while unsafe { (connection.lib.XPending)(connection.display) } > 0 {
            let mut event = MaybeUninit::<XEvent>::zeroed();
            unsafe { (connection.lib.XNextEvent)(connection.display, event.as_mut_ptr()) };
            let mut event = unsafe { event.assume_init() };
            if dispatch(connection, windows, &mut event) {
                handled += 1;
            }
        }
        handled
    }
}

impl Drop for DisplayGuard<'_> {
    fn drop(&mut self) {
        unsafe { (self.connection.lib.XUnlockDisplay)(self.connection.display) };
    }
}

impl Connection {
    fn open(lib: Arc<Lib>) -> Result<Connection, WindowError> {
        let display = unsafe { (lib.XOpenDisplay)(ptr::null()) };
        if display.is_null() {
            let name = std::env::var("DISPLAY").unwrap_or_default();
            return Err(WindowError::DisplayUnavailable(format!(
                "XOpenDisplay failed for DISPLAY={name:?}"
            )));
        }
        let default_screen = unsafe { (lib.XDefaultScreen)(display) };
        let atoms = unsafe { Atoms::intern(&lib, display) };
        Ok(Connection {
            lib,
            display,
            default_screen,
            atoms,
        })
    }

    fn lock(&self) -> DisplayGuard<'_> {
        unsafe { (self.lib.XLockDisplay)(self.display) };
        DisplayGuard { connection: self }
    }

    fn flush(&self) {
        unsafe { (self.lib.XFlush)(self.display) };
    }

    /// Events Xlib has already read off the socket but nobody has dequeued.
    fn queued_already(&self) -> c_int {
        let _guard = self.lock();
        unsafe { (self.lib.XEventsQueued)(self.display, QUEUED_ALREADY) }
    }

    fn fd(&self) -> c_int {
        unsafe { (self.lib.XConnectionNumber)(self.display) }
    }

    fn screen(&self, adapter: Adapter) -> Result<c_int, WindowError> {
        match adapter.get() {
            None => Ok(self.default_screen),
            Some(index) => {
                let count = unsafe { (self.lib.XScreenCount)(self.display) };
                if (index as i64) < count as i64 {
                    Ok(index as c_int)
                } else {
                    Err(WindowError::InvalidArgument("no such adapter"))
                }
            }
        }
    }

    fn screen_size(&self, screen: c_int) -> Size {
        let width = unsafe { (self.lib.XDisplayWidth)(self.display, screen) };
        let height = unsafe { (self.lib.XDisplayHeight)(self.display, screen) };
        Size::new(width.max(0) as u32, height.max(0) as u32)
    }

    fn root(&self, screen: c_int) -> xlib::Window {
        unsafe { (self.lib.XRootWindow)(self.display, screen) }
    }

    fn attributes(&self, window: xlib::Window) -> Result<xlib::XWindowAttributes, WindowError> {
        let mut attributes = MaybeUninit::<xlib::XWindowAttributes>::zeroed();
        let status =
            unsafe { (self.lib.XGetWindowAttributes)(self.display, window, attributes.as_mut_ptr()) };
        if status == 0 {
            return Err(WindowError::InvalidWindow);
        }
        Ok(unsafe { attributes.assume_init() })
    }

    /**
    Reads a format-32 property as a list of longs.  Missing properties read as empty.
    */
    fn property(&self, window: xlib::Window, property: Atom, kind: Atom) -> Vec<c_ulong> {
        let mut actual_type: Atom = 0;
        let mut actual_format: c_int = 0;
        let mut items: c_ulong = 0;
        let mut bytes_after: c_ulong = 0;
        let mut data: *mut c_uchar = ptr::null_mut();
        let status = unsafe {
            (self.lib.XGetWindowProperty)(
                self.display,
                window,
                property,
                0,
                1024,
                xlib::False,
                kind,
                &mut actual_type,
                &mut actual_format,
                &mut items,
                &mut bytes_after,
                &mut data,
            )
        };
        if status != 0 || data.is_null() {
            return Vec::new();
        }
        let values = if actual_format == 32 {
            unsafe { std::slice::from_raw_parts(data as *const c_ulong, items as usize) }.to_vec()
        } else {
            Vec::new()
        };
        unsafe { (self.lib.XFree)(data as *mut c_void) };
        values
    }

    fn send_to_root(&self, window: xlib::Window, screen: c_int, message_type: Atom, data: [c_long; 5]) {
        let mut event = unsafe { MaybeUninit::<XEvent>::zeroed().assume_init() };
        let message = unsafe { &mut event.client_message };
        message.type_ = xlib::ClientMessage;
        message.send_event = xlib::True;
        message.display = self.display;
        message.window = window;
        message.message_type = message_type;
        message.format = 32;
        for (i, value) in data.into_iter().enumerate() {
            message.data.set_long(i, value);
        }
        unsafe {
            (self.lib.XSendEvent)(
                self.display,
                self.root(screen),
                xlib::False,
                xlib::SubstructureRedirectMask | xlib::SubstructureNotifyMask,
                &mut event,
            );
        }
        self.flush();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe { (self.lib.XCloseDisplay)(self.display) };
        logwise::debuginternal_sync!("Closed X11 display");
    }
}

fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

pub(crate) struct System {
    connection: Arc<Connection>,
    wake_fd: c_int,
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("connection", &self.connection)
            .field("wake_fd", &self.wake_fd)
            .finish()
    }
}

impl System {
    pub fn new(_config: &WindowConfig) -> Result<Self, WindowError> {
        let xlib = Xlib::open().map_err(|e| WindowError::DisplayUnavailable(e.to_string()))?;
        static THREADS: Once = Once::new();
        THREADS.call_once(|| unsafe {
            (xlib.XInitThreads)();
            (xlib.XSetErrorHandler)(Some(error_handler));
        });
        let connection = Arc::new(Connection::open(Arc::new(Lib(xlib)))?);
        logwise::info_sync!("Opened X11 display");
        let wake_fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) };
        if wake_fd == -1 {
            return Err(WindowError::Pump(-errno()));
        }
        Ok(System { connection, wake_fd })
    }

    pub fn screen_size(&self, adapter: Adapter) -> Result<Size, WindowError> {
        let screen = self.connection.screen(adapter)?;
        Ok(self.connection.screen_size(screen))
    }

    pub fn create_window(
        &self,
        shared: &Arc<WindowShared>,
        params: &CreateParams<'_>,
    ) -> Result<(), WindowError> {
        let connection = &self.connection;
        let screen = connection.screen(params.adapter)?;
        let lib = &connection.lib;
        let display = connection.display;
        let screen_size = connection.screen_size(screen);
        let size = if params.flags.contains(WindowFlags::FULLSCREEN) {
            screen_size
        } else {
            fit_within(params.size, Size::default(), screen_size)
        };
        //registration happens under the display lock so the loop cannot see events for an unknown
        //window; the loop takes the display lock before the registry lock too
        let guard = connection.lock();
        let drawable = unsafe {
            let black = (lib.XBlackPixel)(display, screen);
            (lib.XCreateSimpleWindow)(
                display,
                connection.root(screen),
                0,
                0,
                size.width(),
                size.height(),
                0,
                black,
                black,
            )
        };
        if drawable == 0 {
            return Err(WindowError::Creation("XCreateSimpleWindow failed".to_owned()));
        }
        let title = CString::new(params.title.replace('\0', "")).unwrap_or_default();
        let mut protocols = [connection.atoms.wm_delete_window];
        unsafe {
            (lib.XSelectInput)(display, drawable, EVENT_MASK);
            (lib.XStoreName)(display, drawable, title.as_ptr());
            (lib.XSetWMProtocols)(display, drawable, protocols.as_mut_ptr(), 1);
        }
        if params.flags.contains(WindowFlags::NO_RESIZE) {
            let mut hints = unsafe { MaybeUninit::<xlib::XSizeHints>::zeroed().assume_init() };
            hints.flags = xlib::PMinSize | xlib::PMaxSize;
            hints.min_width = size.width() as c_int;
            hints.max_width = size.width() as c_int;
            hints.min_height = size.height() as c_int;
            hints.max_height = size.height() as c_int;
            unsafe { (lib.XSetWMNormalHints)(display, drawable, &mut hints) };
        }
        if params.flags.contains(WindowFlags::NO_SYSTEM_MENU) {
            let hints: [c_long; 5] = [MWM_HINTS_FUNCTIONS, MWM_FUNC_RESIZE | MWM_FUNC_MOVE, 0, 0, 0];
            unsafe {
                (lib.XChangeProperty)(
                    display,
                    drawable,
                    connection.atoms.motif_wm_hints,
                    connection.atoms.motif_wm_hints,
                    32,
                    xlib::PropModeReplace,
                    hints.as_ptr() as *const c_uchar,
                    hints.len() as c_int,
                );
            }
        }
        if params.flags.contains(WindowFlags::FULLSCREEN) {
            let state = [connection.atoms.net_wm_state_fullscreen];
            unsafe {
                (lib.XChangeProperty)(
                    display,
                    drawable,
                    connection.atoms.net_wm_state,
                    xlib::XA_ATOM,
                    32,
                    xlib::PropModeReplace,
                    state.as_ptr() as *const c_uchar,
                    1,
                );
            }
        }
        shared.attach(super::NativeWindow::Native(Window {
            connection: connection.clone(),
            drawable,
            screen,
            owned: true,
            open: AtomicBool::new(true),
            cursor: Mutex::new(CursorState::default()),
        }));
        shared.context().registry.register(shared.clone());
        shared.post(WindowEventId::Create);
        if !params.flags.contains(WindowFlags::NO_SHOW) {
            unsafe { (lib.XMapRaised)(display, drawable) };
        }
        connection.flush();
        drop(guard);
        logwise::debuginternal_sync!("Created X11 window {drawable}", drawable = drawable);
        Ok(())
    }

    pub fn wrap_window(&self, shared: &Arc<WindowShared>, handle: NativeHandle) -> Result<(), WindowError> {
        let NativeHandle::Xlib { window } = handle else {
            return Err(WindowError::Unsupported(NAME));
        };
        let connection = self.connection.clone();
        let drawable = window as xlib::Window;
        let attributes = connection
            .attributes(drawable)
            .map_err(|_| WindowError::InvalidArgument("not a window on this display"))?;
        let screen = unsafe { (connection.lib.XScreenNumberOfScreen)(attributes.screen) };
        shared.attach(super::NativeWindow::Native(Window {
            connection,
            drawable,
            screen,
            owned: false,
            open: AtomicBool::new(true),
            cursor: Mutex::new(CursorState::default()),
        }));
        Ok(())
    }

    pub fn wake(&self) {
        let value: u64 = 1;
        let written = unsafe {
            libc::write(
                self.wake_fd,
                &value as *const u64 as *const c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if written != std::mem::size_of::<u64>() as isize {
            logwise::warn_sync!("Failed to write to eventfd: {err}", err = errno());
        }
    }

    fn drain_wake(&self) {
        let mut value: u64 = 0;
        unsafe {
            libc::read(
                self.wake_fd,
                &mut value as *mut u64 as *mut c_void,
                std::mem::size_of::<u64>(),
            )
        };
    }

    pub fn finalize(&self) {
        self.connection.flush();
    }

    pub fn pump_pending(&self, context: &Context) -> Result<usize, WindowError> {
        let guard = self.connection.lock();
        Ok(context
            .registry
            .try_for_each_snapshot(|windows| guard.drain(windows))
            .unwrap_or(0))
    }

    pub fn run_loop(&self, context: &Context) -> Result<(), WindowError> {
        let mut pump = X11Pump {
            system: self,
            context,
        };
        message_loop::run(&context.loop_control, &context.token, &mut pump)
    }
}

impl Drop for System {
    fn drop(&mut self) {
        unsafe { libc::close(self.wake_fd) };
    }
}

fn drawable_of(shared: &WindowShared) -> Option<xlib::Window> {
    match shared.native().ok()? {
        super::NativeWindow::Native(window) => Some(window.drawable),
        super::NativeWindow::Headless(_) => None,
    }
}

/**
Routes one event to the window it targets.  Returns whether a registered window took it.
*/
fn dispatch(connection: &Connection, windows: &[Arc<WindowShared>], event: &mut XEvent) -> bool {
    let target = unsafe { event.any.window };
    if unsafe { (connection.lib.XFilterEvent)(event, target) } != 0 {
        return false;
    }
    let Some(window) = windows.iter().find(|w| drawable_of(w) == Some(target)) else {
        return false;
    };
    let bytes = unsafe {
        std::slice::from_raw_parts(event as *const XEvent as *const u8, std::mem::size_of::<XEvent>())
    };
    window.post_native(NativePayload::Bytes(bytes.into()));

    if let Some(signal) = signal_for_xevent(event, &connection.atoms) {
        window.apply_signal(signal);
    }
    true
}

/**
The bridge signal an X event carries, if any.
*/
fn signal_for_xevent(event: &XEvent, atoms: &Atoms) -> Option<NativeSignal> {
    match event.get_type() {
        xlib::ConfigureNotify => Some(NativeSignal::Configured),
        xlib::Expose => Some(NativeSignal::Paint),
        xlib::VisibilityNotify => {
            if unsafe { event.visibility.state } == xlib::VisibilityFullyObscured {
                Some(NativeSignal::Hidden)
            } else {
                Some(NativeSignal::Shown)
            }
        }
        xlib::UnmapNotify => Some(NativeSignal::Hidden),
        xlib::FocusIn => Some(NativeSignal::FocusGained),
        xlib::FocusOut => Some(NativeSignal::FocusLost),
        xlib::ClientMessage => {
            let message = unsafe { &event.client_message };
            if message.message_type == atoms.wm_protocols
                && message.data.get_long(0) as Atom == atoms.wm_delete_window
            {
                Some(NativeSignal::CloseRequested)
            } else {
                None
            }
        }
        _ => None,
    }
}

struct X11Pump<'a> {
    system: &'a System,
    context: &'a Context,
}

impl Pump for X11Pump<'_> {
    fn pump_once(&mut self) -> Result<PumpStatus, WindowError> {
        let connection = &self.system.connection;
        {
            let guard = connection.lock();
            self.context
                .registry
                .for_each_snapshot(|windows| guard.drain(windows));
        }

        let mut fds = [
            libc::pollfd {
                fd: self.system.wake_fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: connection.fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        //another thread's round trip may have read our events off the socket since the drain
        let timeout = poll_timeout(connection.queued_already());
        let r = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout) };
        if r == -1 {
            let err = errno();
            if err == libc::EINTR {
                return Ok(PumpStatus::Continue);
            }
            return Err(WindowError::Pump(-err));
        }
        if fds[0].revents & libc::POLLIN != 0 {
            self.system.drain_wake();
        }
        Ok(PumpStatus::Continue)
    }
}

/**
How long the loop may block in `poll`.  Events already in Xlib's queue never show up on the fd.
*/
fn poll_timeout(queued: c_int) -> c_int {
    if queued > 0 { 0 } else { -1 }
}

#[derive(Debug, Default)]
struct CursorState {
    hidden: bool,
    locked: bool,
    invisible: xlib::Cursor,
}

#[derive(Debug)]
pub(crate) struct Window {
    connection: Arc<Connection>,
    drawable: xlib::Window,
    screen: c_int,
    owned: bool,
    open: AtomicBool,
    cursor: Mutex<CursorState>,
}

impl Window {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn uses_registry(&self) -> bool {
        self.owned
    }

    fn lib(&self) -> &Xlib {
        &self.connection.lib
    }

    fn display(&self) -> *mut Display {
        self.connection.display
    }

    pub fn destroy(&self, shared: &WindowShared) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        let cursor = std::mem::take(&mut *self.cursor.lock().unwrap_or_else(PoisonError::into_inner));
        let guard = self.connection.lock();
        unsafe {
            if cursor.locked {
                (self.lib().XUngrabPointer)(self.display(), xlib::CurrentTime);
            }
            if cursor.invisible != 0 {
                (self.lib().XFreeCursor)(self.display(), cursor.invisible);
            }
            if self.owned {
                (self.lib().XDestroyWindow)(self.display(), self.drawable);
            }
        }
        self.connection.flush();
        drop(guard);
        if self.owned {
            shared.apply_signal(NativeSignal::Destroyed);
        }
    }

    fn net_wm_state(&self, action: c_long, first: Atom, second: Atom) {
        self.connection.send_to_root(
            self.drawable,
            self.screen,
            self.connection.atoms.net_wm_state,
            [
                action,
                first as c_long,
                second as c_long,
                NET_WM_SOURCE_APPLICATION,
                0,
            ],
        );
    }

    pub fn maximize(&self, shared: &WindowShared) -> Result<(), WindowError> {
        if self.is_minimized()? {
            self.restore(shared)?;
        }
        let atoms = self.connection.atoms;
        self.net_wm_state(
            NET_WM_STATE_ADD,
            atoms.net_wm_state_maximized_horz,
            atoms.net_wm_state_maximized_vert,
        );
        Ok(())
    }

    pub fn minimize(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        let status = unsafe { (self.lib().XIconifyWindow)(self.display(), self.drawable, self.screen) };
        self.connection.flush();
        if status == 0 {
            return Err(WindowError::InvalidWindow);
        }
        Ok(())
    }

    pub fn restore(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        if self.is_minimized()? || !self.is_visible()? {
            unsafe { (self.lib().XMapRaised)(self.display(), self.drawable) };
            self.connection.flush();
        } else if self.is_maximized()? {
            let atoms = self.connection.atoms;
            self.net_wm_state(
                NET_WM_STATE_REMOVE,
                atoms.net_wm_state_maximized_horz,
                atoms.net_wm_state_maximized_vert,
            );
        }
        Ok(())
    }

    pub fn resize(&self, shared: &WindowShared, size: Size) -> Result<(), WindowError> {
        if self.is_maximized()? {
            self.restore(shared)?;
        }
        unsafe { (self.lib().XResizeWindow)(self.display(), self.drawable, size.width(), size.height()) };
        self.connection.flush();
        Ok(())
    }

    pub fn move_to(&self, shared: &WindowShared, position: Position) -> Result<(), WindowError> {
        if self.is_maximized()? {
            self.restore(shared)?;
        }
        unsafe { (self.lib().XMoveWindow)(self.display(), self.drawable, position.x(), position.y()) };
        self.connection.flush();
        Ok(())
    }

    pub fn is_visible(&self) -> Result<bool, WindowError> {
        Ok(self.connection.attributes(self.drawable)?.map_state == xlib::IsViewable)
    }

    pub fn is_maximized(&self) -> Result<bool, WindowError> {
        let atoms = self.connection.atoms;
        let state = self
            .connection
            .property(self.drawable, atoms.net_wm_state, xlib::XA_ATOM);
        let horz = state.contains(&(atoms.net_wm_state_maximized_horz as c_ulong));
        let vert = state.contains(&(atoms.net_wm_state_maximized_vert as c_ulong));
        Ok(horz && vert)
    }

    pub fn is_minimized(&self) -> Result<bool, WindowError> {
        let wm_state = self.connection.atoms.wm_state;
        let state = self.connection.property(self.drawable, wm_state, wm_state);
        Ok(state.first() == Some(&ICONIC_STATE))
    }

    pub fn has_focus(&self) -> Result<bool, WindowError> {
        let mut focused: xlib::Window = 0;
        let mut revert: c_int = 0;
        unsafe { (self.lib().XGetInputFocus)(self.display(), &mut focused, &mut revert) };
        Ok(focused == self.drawable)
    }

    pub fn size(&self) -> Result<Size, WindowError> {
        let attributes = self.connection.attributes(self.drawable)?;
        Ok(Size::new(attributes.width.max(0) as u32, attributes.height.max(0) as u32))
    }

    pub fn position(&self) -> Result<Position, WindowError> {
        let mut x: c_int = 0;
        let mut y: c_int = 0;
        let mut child: xlib::Window = 0;
        let ok = unsafe {
            (self.lib().XTranslateCoordinates)(
                self.display(),
                self.drawable,
                self.connection.root(self.screen),
                0,
                0,
                &mut x,
                &mut y,
                &mut child,
            )
        };
        if ok == 0 {
            return Err(WindowError::InvalidWindow);
        }
        Ok(Position::new(x, y))
    }

    pub fn set_title(&self, title: &str) -> Result<(), WindowError> {
        let title = CString::new(title.replace('\0', "")).unwrap_or_default();
        unsafe { (self.lib().XStoreName)(self.display(), self.drawable, title.as_ptr()) };
        self.connection.flush();
        Ok(())
    }

    fn invisible_cursor(&self, state: &mut CursorState) -> xlib::Cursor {
        if state.invisible == 0 {
            let data = [0 as std::ffi::c_char; 8];
            unsafe {
                let bitmap =
                    (self.lib().XCreateBitmapFromData)(self.display(), self.drawable, data.as_ptr(), 8, 8);
                let mut black = MaybeUninit::<xlib::XColor>::zeroed().assume_init();
                state.invisible = (self.lib().XCreatePixmapCursor)(
                    self.display(),
                    bitmap,
                    bitmap,
                    &mut black,
                    &mut black,
                    0,
                    0,
                );
                (self.lib().XFreePixmap)(self.display(), bitmap);
            }
        }
        state.invisible
    }

    pub fn show_cursor(&self, show: bool, lock: bool) -> Result<(), WindowError> {
        let mut state = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self.connection.lock();
        if show {
            unsafe { (self.lib().XUndefineCursor)(self.display(), self.drawable) };
        } else {
            let cursor = self.invisible_cursor(&mut state);
            unsafe { (self.lib().XDefineCursor)(self.display(), self.drawable, cursor) };
        }
        state.hidden = !show;
        if lock && !state.locked {
            let mask = (xlib::ButtonPressMask | xlib::ButtonReleaseMask | xlib::PointerMotionMask) as c_uint;
            let grab = unsafe {
                (self.lib().XGrabPointer)(
                    self.display(),
                    self.drawable,
                    xlib::True,
                    mask,
                    xlib::GrabModeAsync,
                    xlib::GrabModeAsync,
                    self.drawable,
                    0,
                    xlib::CurrentTime,
                )
            };
            state.locked = grab == xlib::GrabSuccess;
            if !state.locked {
                logwise::warn_sync!("XGrabPointer failed with {grab}", grab = grab);
            }
        } else if !lock && state.locked {
            unsafe { (self.lib().XUngrabPointer)(self.display(), xlib::CurrentTime) };
            state.locked = false;
        }
        self.connection.flush();
        Ok(())
    }

    pub fn set_cursor_pos(&self, position: Position) -> Result<(), WindowError> {
        unsafe {
            (self.lib().XWarpPointer)(
                self.display(),
                0,
                self.drawable,
                0,
                0,
                0,
                0,
                position.x(),
                position.y(),
            )
        };
        self.connection.flush();
        Ok(())
    }

    pub fn is_cursor_locked(&self) -> Result<bool, WindowError> {
        Ok(self.cursor.lock().unwrap_or_else(PoisonError::into_inner).locked)
    }

    pub fn fit_to_screen(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        let screen = self.connection.screen_size(self.screen);
        let frame = Rect::new(self.position()?, self.size()?);
        let size = fit_within(frame.size(), Size::default(), screen);
        let fitted = clamp_onto(frame.with_size(size), screen);
        if fitted != frame {
            unsafe {
                (self.lib().XMoveResizeWindow)(
                    self.display(),
                    self.drawable,
                    fitted.origin().x(),
                    fitted.origin().y(),
                    fitted.size().width(),
                    fitted.size().height(),
                )
            };
            self.connection.flush();
        }
        Ok(())
    }

    pub fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError> {
        Ok(RawWindowHandle::Xlib(XlibWindowHandle::new(self.drawable)))
    }

    pub fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError> {
        let display = NonNull::new(self.display() as *mut c_void);
        Ok(RawDisplayHandle::Xlib(XlibDisplayHandle::new(display, self.screen)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn event_mask_covers_bridge_inputs() {
        for mask in [
            xlib::ExposureMask,
            xlib::StructureNotifyMask,
            xlib::VisibilityChangeMask,
            xlib::FocusChangeMask,
        ] {
            assert_eq!(EVENT_MASK & mask, mask);
        }
    }

    fn atoms() -> Atoms {
        Atoms {
            wm_protocols: 10,
            wm_delete_window: 11,
            wm_state: 12,
            net_wm_state: 13,
            net_wm_state_maximized_horz: 14,
            net_wm_state_maximized_vert: 15,
            net_wm_state_fullscreen: 16,
            motif_wm_hints: 17,
        }
    }

    fn event_of(kind: c_int) -> XEvent {
        let mut event = unsafe { MaybeUninit::<XEvent>::zeroed().assume_init() };
        let any = unsafe { &mut event.any };
        any.type_ = kind;
        event
    }

    fn visibility(state: c_int) -> XEvent {
        let mut event = event_of(xlib::VisibilityNotify);
        let visibility = unsafe { &mut event.visibility };
        visibility.state = state;
        event
    }

    fn client_message(message_type: Atom, protocol: Atom) -> XEvent {
        let mut event = event_of(xlib::ClientMessage);
        let message = unsafe { &mut event.client_message };
        message.message_type = message_type;
        message.format = 32;
        message.data.set_long(0, protocol as c_long);
        event
    }

    #[test]
    fn visibility_maps_to_shown_or_hidden() {
        let atoms = atoms();
        assert_eq!(
            signal_for_xevent(&visibility(xlib::VisibilityFullyObscured), &atoms),
            Some(NativeSignal::Hidden)
        );
        assert_eq!(
            signal_for_xevent(&visibility(xlib::VisibilityUnobscured), &atoms),
            Some(NativeSignal::Shown)
        );
        assert_eq!(
            signal_for_xevent(&visibility(xlib::VisibilityPartiallyObscured), &atoms),
            Some(NativeSignal::Shown)
        );
    }

    #[test]
    fn only_wm_delete_window_requests_close() {
        let atoms = atoms();
        assert_eq!(
            signal_for_xevent(&client_message(atoms.wm_protocols, atoms.wm_delete_window), &atoms),
            Some(NativeSignal::CloseRequested)
        );
        assert_eq!(signal_for_xevent(&client_message(99, atoms.wm_delete_window), &atoms), None);
        assert_eq!(signal_for_xevent(&client_message(atoms.wm_protocols, 99), &atoms), None);
    }

    #[test]
    fn structure_and_focus_events_map_to_signals() {
        let atoms = atoms();
        let cases = [
            (xlib::ConfigureNotify, Some(NativeSignal::Configured)),
            (xlib::Expose, Some(NativeSignal::Paint)),
            (xlib::UnmapNotify, Some(NativeSignal::Hidden)),
            (xlib::FocusIn, Some(NativeSignal::FocusGained)),
            (xlib::FocusOut, Some(NativeSignal::FocusLost)),
            (xlib::KeyPress, None),
            (xlib::MotionNotify, None),
        ];
        for (kind, expected) in cases {
            assert_eq!(signal_for_xevent(&event_of(kind), &atoms), expected, "event type {kind}");
        }
    }

    #[test]
    fn queued_events_skip_the_wait() {
        assert_eq!(poll_timeout(0), -1);
        assert_eq!(poll_timeout(3), 0);
    }

    #[test]
    fn native_window_handles_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Window>();
        assert_send_sync::<System>();
    }
}
