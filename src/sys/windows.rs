//SPDX-License-Identifier: MPL-2.0
/*!
Win32 backend.

Each window gets its own window class so that destroying it can unregister the class again.  The
window procedure finds its [`WindowShared`] through `GWLP_USERDATA`, which holds a strong reference
from `WM_NCCREATE` until `WM_NCDESTROY`.

Windows belong to the thread that created them; run the message loop on that thread.
*/

use std::ffi::c_void;
use std::num::NonZeroIsize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Once};
use std::time::{SystemTime, UNIX_EPOCH};

use raw_window_handle::{
    HandleError, RawDisplayHandle, RawWindowHandle, Win32WindowHandle, WindowsDisplayHandle,
};
use windows::Win32::Foundation::{
    ERROR_CLASS_ALREADY_EXISTS, GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, POINT, RECT,
    WPARAM,
};
use windows::Win32::Graphics::Gdi::{
    ClientToScreen, EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITOR_DEFAULTTONEAREST,
    MONITORINFO, MonitorFromWindow,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::{
    GetRawInputData, HRAWINPUT, RAWINPUTDEVICE, RAWINPUTDEVICE_FLAGS, RAWINPUTHEADER, RID_INPUT,
    RegisterRawInputDevices,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRectEx, CREATESTRUCTW, CW_USEDEFAULT, ClipCursor, CreateWindowExW, DefWindowProcW,
    DestroyWindow, DispatchMessageW, GCW_ATOM, GWL_EXSTYLE, GWL_STYLE, GWLP_HINSTANCE,
    GWLP_USERDATA, GetClassLongPtrW, GetClientRect, GetForegroundWindow, GetMessageW,
    GetSystemMetrics, GetWindowLongPtrW, GetWindowRect, HTBORDER, HTCLIENT, HTLEFT, IDC_ARROW,
    IsIconic, IsWindow, IsWindowVisible, IsZoomed, LoadCursorW, MSG, PM_NOREMOVE, PM_REMOVE,
    PeekMessageW, PostMessageW, PostThreadMessageW, RegisterClassExW, SET_WINDOW_POS_FLAGS,
    SIZE_MINIMIZED,
    SIZE_RESTORED, SM_CXSCREEN, SM_CYSCREEN, SW_MAXIMIZE, SW_MINIMIZE, SW_RESTORE, SW_SHOW,
    SWP_HIDEWINDOW, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER, SWP_SHOWWINDOW,
    SetCursorPos, SetWindowLongPtrW, SetWindowPos, SetWindowTextW, ShowCursor, ShowWindow,
    TranslateMessage, UNICODE_NOCHAR, UnregisterClassW, WINDOW_EX_STYLE, WINDOW_STYLE, WINDOWPOS,
    WM_APP, WM_CLOSE, WM_CREATE, WM_DESTROY, WM_ENTERSIZEMOVE, WM_EXITSIZEMOVE, WM_INPUT,
    WM_KILLFOCUS, WM_MOVE, WM_NCCREATE, WM_NCDESTROY, WM_NCHITTEST, WM_NCPAINT, WM_PAINT,
    WM_QUIT, WM_SETFOCUS, WM_SIZE, WM_UNICHAR, WM_USER, WM_WINDOWPOSCHANGED, WNDCLASSEXW,
    WS_CAPTION, WS_EX_APPWINDOW, WS_MAXIMIZEBOX, WS_OVERLAPPED, WS_OVERLAPPEDWINDOW, WS_POPUP,
    WS_THICKFRAME,
};
use windows::core::{HSTRING, PCWSTR};

use crate::bridge::NativeSignal;
use crate::config::WindowConfig;
use crate::coordinates::{Position, Rect, Size, clamp_onto, fit_within};
use crate::error::WindowError;
use crate::event::{NativeMessage, NativePayload, WindowEventId};
use crate::message_loop::{self, Pump, PumpStatus};
use crate::module::Context;
use crate::window::{Adapter, CreateParams, NativeHandle, WindowFlags, WindowShared};

pub(crate) const NAME: &str = "win32";

/// Asks the owning thread to destroy a window created there.
const WM_BRIDGE_DESTROY: u32 = WM_APP + 0x42;

const CLASS_NAME_ATTEMPTS: u32 = 8;

fn hwnd(raw: isize) -> HWND {
    HWND(raw as *mut c_void)
}

/**
Registers a window class with a process-unique name.
*/
fn register_class(instance: HINSTANCE) -> Result<HSTRING, WindowError> {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let cursor = unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default();
    for _ in 0..CLASS_NAME_ATTEMPTS {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let name = HSTRING::from(format!(
            "window_bridge_{stamp:x}_{n}",
            n = COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(window_proc),
            hInstance: instance,
            hCursor: cursor,
            lpszClassName: PCWSTR(name.as_ptr()),
            ..Default::default()
        };
        if unsafe { RegisterClassExW(&class) } != 0 {
            return Ok(name);
        }
        let err = unsafe { GetLastError() };
        if err != ERROR_CLASS_ALREADY_EXISTS {
            return Err(WindowError::ClassRegistration(format!("{err:?}")));
        }
    }
    Err(WindowError::ClassRegistration(
        "no unique class name available".to_owned(),
    ))
}

fn register_raw_input() {
    //generic desktop page: mouse, joystick, gamepad, keyboard
    let devices = [2u16, 4, 5, 6].map(|usage| RAWINPUTDEVICE {
        usUsagePage: 0x01,
        usUsage: usage,
        dwFlags: RAWINPUTDEVICE_FLAGS(0),
        hwndTarget: HWND::default(),
    });
    let r = unsafe {
        RegisterRawInputDevices(&devices, std::mem::size_of::<RAWINPUTDEVICE>() as u32)
    };
    if let Err(e) = r {
        logwise::warn_sync!(
            "Unable to register raw input devices: {err}",
            err = logwise::privacy::LogIt(&e)
        );
    }
}

fn styles(flags: WindowFlags) -> (WINDOW_STYLE, WINDOW_EX_STYLE) {
    let mut style = if flags.contains(WindowFlags::FULLSCREEN) {
        WS_POPUP
    } else if flags.contains(WindowFlags::NO_SYSTEM_MENU) {
        WS_OVERLAPPED | WS_CAPTION | WS_THICKFRAME
    } else {
        WS_OVERLAPPEDWINDOW
    };
    if flags.contains(WindowFlags::NO_RESIZE) {
        style &= !(WS_THICKFRAME | WS_MAXIMIZEBOX);
    }
    (style, WS_EX_APPWINDOW)
}

/// Non-client padding around a client area for the given styles.
fn frame_padding(style: WINDOW_STYLE, ex_style: WINDOW_EX_STYLE) -> Size {
    let mut rect = RECT::default();
    if unsafe { AdjustWindowRectEx(&mut rect, style, false, ex_style) }.is_err() {
        return Size::default();
    }
    Size::new(
        (rect.right - rect.left).max(0) as u32,
        (rect.bottom - rect.top).max(0) as u32,
    )
}

fn monitor_rects() -> Vec<RECT> {
    unsafe extern "system" fn collect(_: HMONITOR, _: HDC, rect: *mut RECT, data: LPARAM) -> windows::core::BOOL {
        let rects = unsafe { &mut *(data.0 as *mut Vec<RECT>) };
        if let Some(rect) = unsafe { rect.as_ref() } {
            rects.push(*rect);
        }
        true.into()
    }
    let mut rects: Vec<RECT> = Vec::new();
    let _ = unsafe {
        EnumDisplayMonitors(None, None, Some(collect), LPARAM(&mut rects as *mut Vec<RECT> as isize))
    };
    rects
}

#[derive(Debug)]
pub(crate) struct System {
    instance: isize,
    loop_thread: AtomicU32,
    raw_input: Once,
}

impl System {
    pub fn new(_config: &WindowConfig) -> Result<Self, WindowError> {
        let instance = unsafe { GetModuleHandleW(PCWSTR::null()) }
            .map_err(|e| WindowError::ClassRegistration(e.to_string()))?;
        Ok(System {
            instance: instance.0 as isize,
            loop_thread: AtomicU32::new(0),
            raw_input: Once::new(),
        })
    }

    fn instance(&self) -> HINSTANCE {
        HINSTANCE(self.instance as *mut c_void)
    }

    pub fn screen_size(&self, adapter: Adapter) -> Result<Size, WindowError> {
        match adapter.get() {
            None => {
                let width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
                let height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
                Ok(Size::new(width.max(0) as u32, height.max(0) as u32))
            }
            Some(index) => monitor_rects()
                .get(index as usize)
                .map(|r| {
                    Size::new(
                        (r.right - r.left).max(0) as u32,
                        (r.bottom - r.top).max(0) as u32,
                    )
                })
                .ok_or(WindowError::InvalidArgument("no such adapter")),
        }
    }

    pub fn create_window(
        &self,
        shared: &Arc<WindowShared>,
        params: &CreateParams<'_>,
    ) -> Result<(), WindowError> {
        let screen = self.screen_size(params.adapter)?;
        let instance = self.instance();
        let class = register_class(instance)?;
        self.raw_input.call_once(register_raw_input);

        let (style, ex_style) = styles(params.flags);
        let (origin, outer) = if params.flags.contains(WindowFlags::FULLSCREEN) {
            (Position::default(), screen)
        } else {
            let padding = frame_padding(style, ex_style);
            let client = fit_within(params.size, padding, screen);
            (
                Position::new(CW_USEDEFAULT, CW_USEDEFAULT),
                Size::new(client.width() + padding.width(), client.height() + padding.height()),
            )
        };
        let title = HSTRING::from(params.title);
        let created = unsafe {
            CreateWindowExW(
                ex_style,
                PCWSTR(class.as_ptr()),
                PCWSTR(title.as_ptr()),
                style,
                origin.x(),
                origin.y(),
                outer.width() as i32,
                outer.height() as i32,
                None,
                None,
                Some(instance),
                Some(Arc::as_ptr(shared) as *const c_void),
            )
        };
        let handle = match created {
            Ok(handle) => handle,
            Err(e) => {
                let _ = unsafe { UnregisterClassW(PCWSTR(class.as_ptr()), Some(instance)) };
                return Err(WindowError::Creation(e.to_string()));
            }
        };
        shared.attach(super::NativeWindow::Native(Window {
            hwnd: handle.0 as isize,
            owned: true,
            open: AtomicBool::new(true),
            creator_thread: unsafe { GetCurrentThreadId() },
            cursor_hidden: AtomicBool::new(false),
            cursor_locked: AtomicBool::new(false),
        }));
        if !params.flags.contains(WindowFlags::NO_SHOW) {
            unsafe {
                let _ = ShowWindow(handle, SW_SHOW);
            }
        }
        logwise::debuginternal_sync!(
            "Created Win32 window {hwnd}",
            hwnd = logwise::privacy::LogIt(&handle)
        );
        Ok(())
    }

    pub fn wrap_window(&self, shared: &Arc<WindowShared>, handle: NativeHandle) -> Result<(), WindowError> {
        let NativeHandle::Win32 { hwnd: raw } = handle else {
            return Err(WindowError::Unsupported(NAME));
        };
        if !unsafe { IsWindow(Some(hwnd(raw.get()))) }.as_bool() {
            return Err(WindowError::InvalidArgument("not a window"));
        }
        shared.attach(super::NativeWindow::Native(Window {
            hwnd: raw.get(),
            owned: false,
            open: AtomicBool::new(true),
            creator_thread: 0,
            cursor_hidden: AtomicBool::new(false),
            cursor_locked: AtomicBool::new(false),
        }));
        Ok(())
    }

    pub fn wake(&self) {
        let thread = self.loop_thread.load(Ordering::Acquire);
        if thread != 0 {
            if let Err(e) = unsafe { PostThreadMessageW(thread, WM_QUIT, WPARAM(0), LPARAM(0)) } {
                logwise::warn_sync!(
                    "Unable to post WM_QUIT: {err}",
                    err = logwise::privacy::LogIt(&e)
                );
            }
        }
    }

    pub fn finalize(&self) {}

    pub fn pump_pending(&self, _context: &Context) -> Result<usize, WindowError> {
        let mut msg = MSG::default();
        let mut handled = 0;
        while unsafe { PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE) }.as_bool() {
            if msg.message == WM_QUIT {
                logwise::debuginternal_sync!("WM_QUIT while polling");
                continue;
            }
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
            handled += 1;
        }
        Ok(handled)
    }

    pub fn run_loop(&self, context: &Context) -> Result<(), WindowError> {
        let mut msg = MSG::default();
        //makes sure this thread has a message queue before anyone posts to it
        unsafe {
            let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
        }
        discard_stale_quit();
        let thread = unsafe { GetCurrentThreadId() };
        if self
            .loop_thread
            .compare_exchange(0, thread, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WindowError::LoopRunning);
        }
        let result = message_loop::run(&context.loop_control, &context.token, &mut Win32Pump);
        self.loop_thread.store(0, Ordering::Release);
        //a quit seen through the loop state leaves its WM_QUIT behind
        discard_stale_quit();
        result
    }
}

/**
Removes any `WM_QUIT` still queued for this thread so it cannot end the next loop.
*/
fn discard_stale_quit() -> usize {
    let mut msg = MSG::default();
    let mut discarded = 0;
    while unsafe { PeekMessageW(&mut msg, None, WM_QUIT, WM_QUIT, PM_REMOVE) }.as_bool() {
        discarded += 1;
    }
    if discarded > 0 {
        logwise::debuginternal_sync!("Discarded {count} stale WM_QUIT", count = discarded);
    }
    discarded
}

struct Win32Pump;

impl Pump for Win32Pump {
    fn pump_once(&mut self) -> Result<PumpStatus, WindowError> {
        let mut msg = MSG::default();
        let r = unsafe { GetMessageW(&mut msg, None, 0, 0) }.0;
        match r {
            0 => Ok(PumpStatus::Quit),
            -1 => Err(WindowError::Pump(-1)),
            _ => {
                unsafe {
                    //the return value only says whether a character message was generated
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
                Ok(PumpStatus::Continue)
            }
        }
    }
}

fn read_raw_input(lparam: LPARAM) -> Box<[u8]> {
    let handle = HRAWINPUT(lparam.0 as *mut c_void);
    let header = std::mem::size_of::<RAWINPUTHEADER>() as u32;
    let mut size: u32 = 0;
    let r = unsafe { GetRawInputData(handle, RID_INPUT, None, &mut size, header) };
    if r == u32::MAX || size == 0 {
        return Box::default();
    }
    let mut buffer = vec![0u8; size as usize];
    let r = unsafe {
        GetRawInputData(
            handle,
            RID_INPUT,
            Some(buffer.as_mut_ptr() as *mut c_void),
            &mut size,
            header,
        )
    };
    if r == u32::MAX {
        return Box::default();
    }
    buffer.truncate(r as usize);
    buffer.into_boxed_slice()
}

/// Destroys `window` and unregisters its private class.
fn destroy_owned(window: HWND) {
    unsafe {
        let atom = GetClassLongPtrW(window, GCW_ATOM);
        let instance = HINSTANCE(GetWindowLongPtrW(window, GWLP_HINSTANCE) as *mut c_void);
        if let Err(e) = DestroyWindow(window) {
            logwise::warn_sync!(
                "DestroyWindow failed: {err}",
                err = logwise::privacy::LogIt(&e)
            );
            return;
        }
        //MAKEINTATOM
        let _ = UnregisterClassW(PCWSTR(atom as *const u16), Some(instance));
    }
}

extern "system" fn window_proc(window: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if msg == WM_NCCREATE {
        let create = lparam.0 as *const CREATESTRUCTW;
        if let Some(create) = unsafe { create.as_ref() } {
            let shared = create.lpCreateParams as *const WindowShared;
            if !shared.is_null() {
                //held by the window until WM_NCDESTROY
                unsafe { Arc::increment_strong_count(shared) };
                unsafe { SetWindowLongPtrW(window, GWLP_USERDATA, shared as isize) };
            }
        }
    }
    let ptr = unsafe { GetWindowLongPtrW(window, GWLP_USERDATA) } as *const WindowShared;
    if ptr.is_null() {
        return unsafe { DefWindowProcW(window, msg, wparam, lparam) };
    }
    if msg == WM_NCDESTROY {
        unsafe {
            SetWindowLongPtrW(window, GWLP_USERDATA, 0);
            drop(Arc::from_raw(ptr));
            return DefWindowProcW(window, msg, wparam, lparam);
        }
    }
    let shared = unsafe { &*ptr };
    handle_message(shared, window, msg, wparam, lparam)
}

fn handle_message(shared: &WindowShared, window: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let extra = if msg == WM_INPUT {
        read_raw_input(lparam)
    } else {
        Box::default()
    };
    shared.post_native(NativePayload::Message(NativeMessage {
        hwnd: window.0 as usize,
        msg,
        wparam: wparam.0,
        lparam: lparam.0,
        extra,
    }));

    let default = || unsafe { DefWindowProcW(window, msg, wparam, lparam) };
    match msg {
        WM_CREATE => {
            shared.post(WindowEventId::Create);
            LRESULT(0)
        }
        WM_BRIDGE_DESTROY => {
            destroy_owned(window);
            LRESULT(0)
        }
        WM_SIZE => {
            let os_visible = unsafe { IsWindowVisible(window) }.as_bool();
            shared.apply_signal(size_signal(wparam.0 as u32, shared.bridge_visible(), os_visible));
            LRESULT(0)
        }
        WM_MOVE => {
            shared.apply_signal(NativeSignal::Moved);
            LRESULT(0)
        }
        WM_ENTERSIZEMOVE => {
            shared.apply_signal(NativeSignal::LiveResizeStarted);
            default()
        }
        WM_EXITSIZEMOVE => {
            shared.apply_signal(NativeSignal::LiveResizeEnded);
            default()
        }
        WM_WINDOWPOSCHANGED => {
            let pos = unsafe { (lparam.0 as *const WINDOWPOS).as_ref() };
            if let Some(signal) = pos.and_then(|pos| window_pos_signal(pos.flags)) {
                shared.apply_signal(signal);
            }
            //generates WM_SIZE and WM_MOVE
            default()
        }
        WM_PAINT | WM_NCPAINT => {
            shared.apply_signal(NativeSignal::Paint);
            default()
        }
        WM_SETFOCUS => {
            shared.apply_signal(NativeSignal::FocusGained);
            LRESULT(0)
        }
        WM_KILLFOCUS => {
            shared.apply_signal(NativeSignal::FocusLost);
            LRESULT(0)
        }
        WM_CLOSE => {
            shared.apply_signal(NativeSignal::CloseRequested);
            LRESULT(0)
        }
        WM_DESTROY => {
            shared.apply_signal(NativeSignal::Destroyed);
            LRESULT(0)
        }
        WM_NCHITTEST if shared.flags().contains(WindowFlags::NO_RESIZE) => {
            LRESULT(no_resize_hit(default().0))
        }
        WM_UNICHAR if wparam.0 as u32 == UNICODE_NOCHAR => LRESULT(1),
        _ => default(),
    }
}

/**
The signal a `WM_SIZE` of kind `kind` carries.

A restore only counts as showing the window when the bridge still has it hidden and the OS
reports it visible; otherwise it is a plain resize.
*/
fn size_signal(kind: u32, bridge_visible: bool, os_visible: bool) -> NativeSignal {
    if kind == SIZE_MINIMIZED {
        NativeSignal::Hidden
    } else if kind == SIZE_RESTORED && !bridge_visible && os_visible {
        NativeSignal::Shown
    } else {
        NativeSignal::Resized
    }
}

fn window_pos_signal(flags: SET_WINDOW_POS_FLAGS) -> Option<NativeSignal> {
    if flags.contains(SWP_HIDEWINDOW) {
        Some(NativeSignal::Hidden)
    } else if flags.contains(SWP_SHOWWINDOW) {
        Some(NativeSignal::Shown)
    } else {
        None
    }
}

/// Sizing borders of a fixed-size window answer as client area.
fn no_resize_hit(hit: isize) -> isize {
    if (HTLEFT as isize..=HTBORDER as isize).contains(&hit) {
        HTCLIENT as isize
    } else {
        hit
    }
}

#[derive(Debug)]
pub(crate) struct Window {
    hwnd: isize,
    owned: bool,
    open: AtomicBool,
    creator_thread: u32,
    cursor_hidden: AtomicBool,
    cursor_locked: AtomicBool,
}

impl Window {
    fn handle(&self) -> HWND {
        hwnd(self.hwnd)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn uses_registry(&self) -> bool {
        false
    }

    pub fn destroy(&self, _shared: &WindowShared) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        if self.cursor_locked.load(Ordering::Acquire) {
            let _ = unsafe { ClipCursor(None) };
        }
        if self.cursor_hidden.load(Ordering::Acquire) {
            unsafe { ShowCursor(true) };
        }
        if !self.owned {
            return;
        }
        if unsafe { GetCurrentThreadId() } == self.creator_thread {
            destroy_owned(self.handle());
        } else if let Err(e) =
            unsafe { PostMessageW(Some(self.handle()), WM_BRIDGE_DESTROY, WPARAM(0), LPARAM(0)) }
        {
            logwise::error_sync!(
                "Unable to hand window destruction to its thread: {err}",
                err = logwise::privacy::LogIt(&e)
            );
        }
    }

    fn restore_if_zoomed(&self) {
        if unsafe { IsZoomed(self.handle()) }.as_bool() {
            unsafe {
                let _ = ShowWindow(self.handle(), SW_RESTORE);
            }
        }
    }

    fn show(&self, command: windows::Win32::UI::WindowsAndMessaging::SHOW_WINDOW_CMD) -> Result<(), WindowError> {
        unsafe {
            //returns the previous visibility, not an error
            let _ = ShowWindow(self.handle(), command);
        }
        Ok(())
    }

    pub fn maximize(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        self.show(SW_MAXIMIZE)
    }

    pub fn minimize(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        self.show(SW_MINIMIZE)
    }

    pub fn restore(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        self.show(SW_RESTORE)
    }

    fn styles(&self) -> (WINDOW_STYLE, WINDOW_EX_STYLE) {
        unsafe {
            (
                WINDOW_STYLE(GetWindowLongPtrW(self.handle(), GWL_STYLE) as u32),
                WINDOW_EX_STYLE(GetWindowLongPtrW(self.handle(), GWL_EXSTYLE) as u32),
            )
        }
    }

    pub fn resize(&self, _shared: &WindowShared, size: Size) -> Result<(), WindowError> {
        self.restore_if_zoomed();
        let (style, ex_style) = self.styles();
        let padding = frame_padding(style, ex_style);
        unsafe {
            SetWindowPos(
                self.handle(),
                None,
                0,
                0,
                (size.width() + padding.width()) as i32,
                (size.height() + padding.height()) as i32,
                SWP_NOMOVE | SWP_NOZORDER | SWP_NOACTIVATE,
            )
        }
        .map_err(|_| WindowError::InvalidWindow)
    }

    pub fn move_to(&self, _shared: &WindowShared, position: Position) -> Result<(), WindowError> {
        self.restore_if_zoomed();
        unsafe {
            SetWindowPos(
                self.handle(),
                None,
                position.x(),
                position.y(),
                0,
                0,
                SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
            )
        }
        .map_err(|_| WindowError::InvalidWindow)
    }

    pub fn is_visible(&self) -> Result<bool, WindowError> {
        Ok(unsafe { IsWindowVisible(self.handle()) }.as_bool())
    }

    pub fn is_maximized(&self) -> Result<bool, WindowError> {
        Ok(unsafe { IsZoomed(self.handle()) }.as_bool())
    }

    pub fn is_minimized(&self) -> Result<bool, WindowError> {
        Ok(unsafe { IsIconic(self.handle()) }.as_bool())
    }

    pub fn has_focus(&self) -> Result<bool, WindowError> {
        Ok(unsafe { GetForegroundWindow() } == self.handle())
    }

    pub fn size(&self) -> Result<Size, WindowError> {
        let mut rect = RECT::default();
        unsafe { GetClientRect(self.handle(), &mut rect) }.map_err(|_| WindowError::InvalidWindow)?;
        Ok(Size::new(
            (rect.right - rect.left).max(0) as u32,
            (rect.bottom - rect.top).max(0) as u32,
        ))
    }

    fn outer(&self) -> Result<RECT, WindowError> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(self.handle(), &mut rect) }.map_err(|_| WindowError::InvalidWindow)?;
        Ok(rect)
    }

    pub fn position(&self) -> Result<Position, WindowError> {
        let rect = self.outer()?;
        Ok(Position::new(rect.left, rect.top))
    }

    pub fn set_title(&self, title: &str) -> Result<(), WindowError> {
        let title = HSTRING::from(title);
        unsafe { SetWindowTextW(self.handle(), PCWSTR(title.as_ptr())) }
            .map_err(|_| WindowError::InvalidWindow)
    }

    pub fn show_cursor(&self, show: bool, lock: bool) -> Result<(), WindowError> {
        let hidden = !show;
        if self.cursor_hidden.swap(hidden, Ordering::AcqRel) != hidden {
            //ShowCursor keeps a display counter; only move it on actual changes
            unsafe { ShowCursor(show) };
        }
        if lock {
            let rect = self.outer()?;
            unsafe { ClipCursor(Some(&rect)) }.map_err(|_| WindowError::InvalidWindow)?;
        } else if self.cursor_locked.load(Ordering::Acquire) {
            let _ = unsafe { ClipCursor(None) };
        }
        self.cursor_locked.store(lock, Ordering::Release);
        Ok(())
    }

    pub fn set_cursor_pos(&self, position: Position) -> Result<(), WindowError> {
        let mut point = POINT {
            x: position.x(),
            y: position.y(),
        };
        if !unsafe { ClientToScreen(self.handle(), &mut point) }.as_bool() {
            return Err(WindowError::InvalidWindow);
        }
        unsafe { SetCursorPos(point.x, point.y) }.map_err(|_| WindowError::InvalidWindow)
    }

    pub fn is_cursor_locked(&self) -> Result<bool, WindowError> {
        Ok(self.cursor_locked.load(Ordering::Acquire))
    }

    pub fn fit_to_screen(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        let monitor = unsafe { MonitorFromWindow(self.handle(), MONITOR_DEFAULTTONEAREST) };
        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
            return Err(WindowError::InvalidWindow);
        }
        let work = info.rcWork;
        let work_size = Size::new(
            (work.right - work.left).max(0) as u32,
            (work.bottom - work.top).max(0) as u32,
        );
        let outer = self.outer()?;
        let client = self.size()?;
        let outer_size = Size::new(
            (outer.right - outer.left).max(0) as u32,
            (outer.bottom - outer.top).max(0) as u32,
        );
        let padding = Size::new(
            outer_size.width().saturating_sub(client.width()),
            outer_size.height().saturating_sub(client.height()),
        );
        let fitted = fit_within(client, padding, work_size);
        let frame = Rect::new(
            Position::new(outer.left - work.left, outer.top - work.top),
            Size::new(fitted.width() + padding.width(), fitted.height() + padding.height()),
        );
        let frame = clamp_onto(frame, work_size);
        unsafe {
            SetWindowPos(
                self.handle(),
                None,
                frame.origin().x() + work.left,
                frame.origin().y() + work.top,
                frame.size().width() as i32,
                frame.size().height() as i32,
                SWP_NOZORDER | SWP_NOACTIVATE,
            )
        }
        .map_err(|_| WindowError::InvalidWindow)
    }

    pub fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError> {
        let hwnd = NonZeroIsize::new(self.hwnd).ok_or(HandleError::Unavailable)?;
        let mut handle = Win32WindowHandle::new(hwnd);
        handle.hinstance =
            NonZeroIsize::new(unsafe { GetWindowLongPtrW(self.handle(), GWLP_HINSTANCE) });
        Ok(RawWindowHandle::Win32(handle))
    }

    pub fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError> {
        Ok(RawDisplayHandle::Windows(WindowsDisplayHandle::new()))
    }
}
