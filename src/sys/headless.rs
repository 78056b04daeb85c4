//SPDX-License-Identifier: MPL-2.0
/*!
An in-process window server.

The server keeps window geometry and focus, and queues the notifications a compliant X11 window
manager would send (map, configure, expose, focus changes).  The message loop waits on the queue
exactly as the X11 backend waits on its display connection, so every bridge path runs without a
display.
*/

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use raw_window_handle::{HandleError, RawDisplayHandle, RawWindowHandle};

use crate::bridge::NativeSignal;
use crate::coordinates::{Position, Rect, Size, clamp_onto, fit_within};
use crate::error::WindowError;
use crate::event::{NativePayload, WindowEventId, WindowId};
use crate::message_loop::{self, Pump, PumpStatus};
use crate::module::Context;
use crate::window::{Adapter, CreateParams, WindowFlags, WindowShared};

/**
A notification from the headless window server.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ServerEventKind {
    /// The window was mapped or de-iconified.
    Map,
    /// The window was iconified.
    Unmap,
    /// The window became fully obscured.
    Obscured,
    /// The window became (partially) visible again.
    Unobscured,
    /// The window's frame changed.
    Configure(Rect),
    Expose,
    FocusIn,
    FocusOut,
    /// The user asked the window manager to close the window.
    DeleteRequest,
}

impl ServerEventKind {
    fn signal(&self) -> NativeSignal {
        match self {
            ServerEventKind::Map | ServerEventKind::Unobscured => NativeSignal::Shown,
            ServerEventKind::Unmap | ServerEventKind::Obscured => NativeSignal::Hidden,
            ServerEventKind::Configure(_) => NativeSignal::Configured,
            ServerEventKind::Expose => NativeSignal::Paint,
            ServerEventKind::FocusIn => NativeSignal::FocusGained,
            ServerEventKind::FocusOut => NativeSignal::FocusLost,
            ServerEventKind::DeleteRequest => NativeSignal::CloseRequested,
        }
    }
}

/**
A queued server notification, as carried by [`crate::event::NativePayload::Headless`].
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    /// Server-side window id; equal to the [`WindowId`] of windows this library created.
    pub window: u64,
    /// Monotonic sequence number.
    pub serial: u64,
    pub kind: ServerEventKind,
}

#[derive(Debug)]
struct ServerWindow {
    rect: Rect,
    //frame to restore to while maximized
    saved: Option<Rect>,
    mapped: bool,
    minimized: bool,
    title: String,
    cursor_hidden: bool,
    cursor_locked: bool,
    cursor: Position,
}

#[derive(Debug, Default)]
struct EventQueue {
    events: VecDeque<ServerEvent>,
    serial: u64,
    wake: bool,
}

impl EventQueue {
    fn push(&mut self, window: u64, kind: ServerEventKind) {
        self.serial += 1;
        self.events.push_back(ServerEvent {
            window,
            serial: self.serial,
            kind,
        });
    }
}

#[derive(Debug, Default)]
struct ServerState {
    windows: HashMap<u64, ServerWindow>,
    queue: EventQueue,
    focused: Option<u64>,
}

fn set_focus(focused: &mut Option<u64>, queue: &mut EventQueue, target: Option<u64>) {
    if *focused == target {
        return;
    }
    if let Some(old) = focused.take() {
        queue.push(old, ServerEventKind::FocusOut);
    }
    if let Some(new) = target {
        queue.push(new, ServerEventKind::FocusIn);
    }
    *focused = target;
}

#[derive(Debug)]
struct ServerInner {
    state: Mutex<ServerState>,
    ready: Condvar,
    screen: Size,
}

#[derive(Debug, Clone)]
pub(crate) struct Server {
    inner: Arc<ServerInner>,
}

impl Server {
    pub fn new(screen: Size) -> Self {
        Server {
            inner: Arc::new(ServerInner {
                state: Mutex::new(ServerState::default()),
                ready: Condvar::new(),
                screen,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn screen(&self) -> Size {
        self.inner.screen
    }

    pub fn screen_size(&self, adapter: Adapter) -> Result<Size, WindowError> {
        match adapter.get() {
            None | Some(0) => Ok(self.inner.screen),
            Some(_) => Err(WindowError::InvalidArgument("no such adapter")),
        }
    }

    /**
    Runs `f` on window `id` with access to the event queue and focus, then wakes the loop.
    */
    fn update<R>(
        &self,
        id: u64,
        f: impl FnOnce(&mut ServerWindow, &mut EventQueue, &mut Option<u64>, Size) -> R,
    ) -> Result<R, WindowError> {
        let screen = self.inner.screen;
        let mut guard = self.lock();
        let ServerState {
            windows,
            queue,
            focused,
        } = &mut *guard;
        let window = windows.get_mut(&id).ok_or(WindowError::InvalidWindow)?;
        let r = f(window, queue, focused, screen);
        let notify = !queue.events.is_empty();
        drop(guard);
        if notify {
            self.inner.ready.notify_all();
        }
        Ok(r)
    }

    fn query<R>(&self, id: u64, f: impl FnOnce(&ServerWindow, Option<u64>) -> R) -> Result<R, WindowError> {
        let state = self.lock();
        let window = state.windows.get(&id).ok_or(WindowError::InvalidWindow)?;
        Ok(f(window, state.focused))
    }

    fn insert(&self, id: u64, title: &str, rect: Rect) {
        self.lock().windows.insert(
            id,
            ServerWindow {
                rect,
                saved: None,
                mapped: false,
                minimized: false,
                title: title.to_owned(),
                cursor_hidden: false,
                cursor_locked: false,
                cursor: Position::default(),
            },
        );
    }

    fn remove(&self, id: u64) {
        let mut state = self.lock();
        state.windows.remove(&id);
        if state.focused == Some(id) {
            state.focused = None;
        }
        state.queue.events.retain(|e| e.window != id);
    }

    /// Maps an unmapped or iconified window and gives it focus, like a window manager would.
    fn map(window: &mut ServerWindow, queue: &mut EventQueue, focused: &mut Option<u64>, id: u64) {
        if window.mapped && !window.minimized {
            return;
        }
        window.mapped = true;
        window.minimized = false;
        queue.push(id, ServerEventKind::Map);
        set_focus(focused, queue, Some(id));
        queue.push(id, ServerEventKind::Expose);
    }

    pub fn create_window(
        &self,
        shared: &Arc<WindowShared>,
        params: &CreateParams<'_>,
    ) -> Result<(), WindowError> {
        let screen = self.screen_size(params.adapter)?;
        let id = shared.id().get();
        let rect = if params.flags.contains(WindowFlags::FULLSCREEN) {
            Rect::new(Position::default(), screen)
        } else {
            Rect::new(
                Position::default(),
                fit_within(params.size, Size::default(), screen),
            )
        };
        self.insert(id, params.title, rect);
        shared.attach(super::NativeWindow::Headless(Window {
            server: self.clone(),
            id,
            owned: true,
            open: std::sync::atomic::AtomicBool::new(true),
        }));
        shared.context().registry.register(shared.clone());
        shared.post(WindowEventId::Create);
        if !params.flags.contains(WindowFlags::NO_SHOW) {
            self.update(id, |w, queue, focused, _| Self::map(w, queue, focused, id))?;
        }
        Ok(())
    }

    pub fn wrap_window(&self, shared: &Arc<WindowShared>, window: u64) -> Result<(), WindowError> {
        self.query(window, |_, _| ())?;
        shared.attach(super::NativeWindow::Headless(Window {
            server: self.clone(),
            id: window,
            owned: false,
            open: std::sync::atomic::AtomicBool::new(true),
        }));
        Ok(())
    }

    pub fn wake(&self) {
        self.lock().queue.wake = true;
        self.inner.ready.notify_all();
    }

    pub fn finalize(&self) {
        let mut state = self.lock();
        state.queue.events.clear();
        state.queue.wake = true;
        drop(state);
        self.inner.ready.notify_all();
    }

    fn take_events(&self) -> VecDeque<ServerEvent> {
        std::mem::take(&mut self.lock().queue.events)
    }

    fn wait(&self) {
        let mut state = self.lock();
        while state.queue.events.is_empty() && !state.queue.wake {
            state = self
                .inner
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.queue.wake = false;
    }

    /**
    Dispatches everything queued without blocking.  Skipped when the registry is contended.
    */
    pub fn pump_pending(&self, context: &Context) -> Result<usize, WindowError> {
        let handled = context
            .registry
            .try_for_each_snapshot(|windows| dispatch(windows, self.take_events()));
        Ok(handled.unwrap_or(0))
    }

    pub fn run_loop(&self, context: &Context) -> Result<(), WindowError> {
        let mut pump = HeadlessPump {
            server: self,
            context,
        };
        message_loop::run(&context.loop_control, &context.token, &mut pump)
    }
}

fn dispatch(windows: &[Arc<WindowShared>], events: VecDeque<ServerEvent>) -> usize {
    let mut handled = 0;
    for event in events {
        let Some(window) = windows.iter().find(|w| w.id().get() == event.window) else {
            logwise::debuginternal_sync!(
                "Dropping server event for unknown window {window}",
                window = event.window
            );
            continue;
        };
        let signal = event.kind.signal();
        window.post_native(NativePayload::Headless(event));
        window.apply_signal(signal);
        handled += 1;
    }
    handled
}

struct HeadlessPump<'a> {
    server: &'a Server,
    context: &'a Context,
}

impl Pump for HeadlessPump<'_> {
    fn pump_once(&mut self) -> Result<PumpStatus, WindowError> {
        self.server.wait();
        let server = self.server;
        self.context
            .registry
            .for_each_snapshot(|windows| dispatch(windows, server.take_events()));
        Ok(PumpStatus::Continue)
    }
}

#[derive(Debug)]
pub(crate) struct Window {
    server: Server,
    id: u64,
    owned: bool,
    open: std::sync::atomic::AtomicBool,
}

impl Window {
    pub fn is_open(&self) -> bool {
        self.open.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn uses_registry(&self) -> bool {
        self.owned
    }

    pub fn destroy(&self, shared: &WindowShared) {
        if !self.open.swap(false, std::sync::atomic::Ordering::AcqRel) {
            return;
        }
        if self.owned {
            self.server.remove(self.id);
            shared.apply_signal(NativeSignal::Destroyed);
        }
    }

    fn restore_maximized(window: &mut ServerWindow) {
        if let Some(saved) = window.saved.take() {
            window.rect = saved;
        }
    }

    pub fn resize(&self, _shared: &WindowShared, size: Size) -> Result<(), WindowError> {
        let id = self.id;
        self.server.update(id, |w, queue, _, _| {
            Self::restore_maximized(w);
            w.rect = w.rect.with_size(size);
            queue.push(id, ServerEventKind::Configure(w.rect));
            queue.push(id, ServerEventKind::Expose);
        })
    }

    pub fn move_to(&self, _shared: &WindowShared, position: Position) -> Result<(), WindowError> {
        let id = self.id;
        self.server.update(id, |w, queue, _, _| {
            Self::restore_maximized(w);
            w.rect = w.rect.with_origin(position);
            queue.push(id, ServerEventKind::Configure(w.rect));
        })
    }

    pub fn maximize(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        let id = self.id;
        self.server.update(id, |w, queue, focused, screen| {
            Server::map(w, queue, focused, id);
            if w.saved.is_none() {
                w.saved = Some(w.rect);
                w.rect = Rect::new(Position::default(), screen);
                queue.push(id, ServerEventKind::Configure(w.rect));
                queue.push(id, ServerEventKind::Expose);
            }
        })
    }

    pub fn minimize(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        let id = self.id;
        self.server.update(id, |w, queue, focused, _| {
            if w.minimized || !w.mapped {
                return;
            }
            w.minimized = true;
            queue.push(id, ServerEventKind::Unmap);
            if *focused == Some(id) {
                set_focus(focused, queue, None);
            }
        })
    }

    pub fn restore(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        let id = self.id;
        self.server.update(id, |w, queue, focused, _| {
            if w.minimized || !w.mapped {
                Server::map(w, queue, focused, id);
            } else if let Some(saved) = w.saved.take() {
                w.rect = saved;
                queue.push(id, ServerEventKind::Configure(w.rect));
                queue.push(id, ServerEventKind::Expose);
            }
        })
    }

    pub fn is_visible(&self) -> Result<bool, WindowError> {
        self.server.query(self.id, |w, _| w.mapped && !w.minimized)
    }

    pub fn is_maximized(&self) -> Result<bool, WindowError> {
        self.server.query(self.id, |w, _| w.saved.is_some())
    }

    pub fn is_minimized(&self) -> Result<bool, WindowError> {
        self.server.query(self.id, |w, _| w.minimized)
    }

    pub fn has_focus(&self) -> Result<bool, WindowError> {
        let id = self.id;
        self.server.query(id, |_, focused| focused == Some(id))
    }

    pub fn size(&self) -> Result<Size, WindowError> {
        self.server.query(self.id, |w, _| w.rect.size())
    }

    pub fn position(&self) -> Result<Position, WindowError> {
        self.server.query(self.id, |w, _| w.rect.origin())
    }

    pub fn set_title(&self, title: &str) -> Result<(), WindowError> {
        self.server
            .update(self.id, |w, _, _, _| w.title = title.to_owned())
    }

    pub fn show_cursor(&self, show: bool, lock: bool) -> Result<(), WindowError> {
        self.server.update(self.id, |w, _, _, _| {
            w.cursor_hidden = !show;
            w.cursor_locked = lock;
        })
    }

    pub fn set_cursor_pos(&self, position: Position) -> Result<(), WindowError> {
        self.server.update(self.id, |w, _, _, _| w.cursor = position)
    }

    pub fn is_cursor_locked(&self) -> Result<bool, WindowError> {
        self.server.query(self.id, |w, _| w.cursor_locked)
    }

    pub fn fit_to_screen(&self, _shared: &WindowShared) -> Result<(), WindowError> {
        let id = self.id;
        self.server.update(id, |w, queue, _, screen| {
            let size = fit_within(w.rect.size(), Size::default(), screen);
            let rect = clamp_onto(w.rect.with_size(size), screen);
            if rect != w.rect {
                w.rect = rect;
                queue.push(id, ServerEventKind::Configure(rect));
                queue.push(id, ServerEventKind::Expose);
            }
        })
    }

    pub fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError> {
        Err(HandleError::NotSupported)
    }

    pub fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError> {
        Err(HandleError::NotSupported)
    }
}

/**
Control surface of the headless window server, standing in for the user and the window manager.

Obtained from [`crate::WindowModule::headless_server`].
*/
#[derive(Debug, Clone)]
pub struct HeadlessServer {
    server: Server,
}

impl HeadlessServer {
    pub(crate) fn new(server: Server) -> Self {
        HeadlessServer { server }
    }

    pub fn screen(&self) -> Size {
        self.server.screen()
    }

    /// Simulates the user clicking the window's close button.
    pub fn request_close(&self, window: &crate::Window) -> Result<(), WindowError> {
        self.push(window, ServerEventKind::DeleteRequest)
    }

    /// Simulates the window becoming fully covered by another window.
    pub fn obscure(&self, window: &crate::Window) -> Result<(), WindowError> {
        self.push(window, ServerEventKind::Obscured)
    }

    pub fn reveal(&self, window: &crate::Window) -> Result<(), WindowError> {
        self.push(window, ServerEventKind::Unobscured)
    }

    /// Invalidates the window's contents.
    pub fn expose(&self, window: &crate::Window) -> Result<(), WindowError> {
        self.push(window, ServerEventKind::Expose)
    }

    /// Moves keyboard focus to `window`, or away from every window.
    pub fn set_focus(&self, window: Option<&crate::Window>) {
        let target = window.and_then(|w| server_id(w).ok());
        let mut guard = self.server.lock();
        let ServerState { queue, focused, .. } = &mut *guard;
        set_focus(focused, queue, target);
        drop(guard);
        self.server.inner.ready.notify_all();
    }

    /**
    Creates a window owned by someone else, for use with [`crate::NativeHandle::Headless`].
    */
    pub fn create_foreign(&self, title: &str, width: u32, height: u32) -> u64 {
        let id = WindowId::next().get();
        self.server
            .insert(id, title, Rect::new(Position::default(), Size::new(width, height)));
        let _ = self.server.update(id, |w, _, _, _| w.mapped = true);
        id
    }

    /// Whether a server-side window exists.
    pub fn exists(&self, window: u64) -> bool {
        self.server.query(window, |_, _| ()).is_ok()
    }

    pub fn title(&self, window: &crate::Window) -> Result<String, WindowError> {
        self.server.query(server_id(window)?, |w, _| w.title.clone())
    }

    pub fn is_cursor_hidden(&self, window: &crate::Window) -> Result<bool, WindowError> {
        self.server.query(server_id(window)?, |w, _| w.cursor_hidden)
    }

    pub fn cursor_position(&self, window: &crate::Window) -> Result<Position, WindowError> {
        self.server.query(server_id(window)?, |w, _| w.cursor)
    }

    /// Number of notifications not yet dispatched.
    pub fn pending(&self) -> usize {
        self.server.lock().queue.events.len()
    }

    fn push(&self, window: &crate::Window, kind: ServerEventKind) -> Result<(), WindowError> {
        let id = server_id(window)?;
        self.server.update(id, |_, queue, _, _| queue.push(id, kind))
    }
}

fn server_id(window: &crate::Window) -> Result<u64, WindowError> {
    match window.native()? {
        super::NativeWindow::Headless(w) => Ok(w.id),
        _ => Err(WindowError::InvalidWindow),
    }
}
