//SPDX-License-Identifier: MPL-2.0
/*!
Window events and the thread-safe stream that carries them.

Events are posted by the platform bridge (from whatever thread the OS delivers notifications on)
and by explicit API calls.  A consumer drains them in batches with [`EventStream::process`]:
every event posted between two `process` calls is delivered together, in post order, exactly once.

```
# use window_bridge::{WindowModule, WindowConfig, Backend, event::WindowEventId};
let module = WindowModule::new();
module.initialize(WindowConfig::default().with_backend(Backend::Headless)).unwrap();
for event in module.event_stream().process() {
    match event.id() {
        WindowEventId::Resize => { /* reallocate swapchain */ }
        _ => {}
    }
}
module.finalize();
```
*/

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, Weak};

use crate::window::WindowShared;

/**
Identifies the kind of a window event.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WindowEventId {
    /// Window was created
    Create = 1,
    /// Window was resized
    Resize,
    /// Window was moved
    Move,
    /// Window close requested.  The window is not destroyed; the caller decides.
    Close,
    /// Window was destroyed
    Destroy,
    /// Window was shown
    Show,
    /// Window was hidden
    Hide,
    /// Window got focus
    GotFocus,
    /// Window lost focus
    LostFocus,
    /// Window needs to be redrawn
    Redraw,
    /// Native event, see [`Event::native`]
    Native,
}

impl WindowEventId {
    pub const ALL: [WindowEventId; 11] = [
        WindowEventId::Create,
        WindowEventId::Resize,
        WindowEventId::Move,
        WindowEventId::Close,
        WindowEventId::Destroy,
        WindowEventId::Show,
        WindowEventId::Hide,
        WindowEventId::GotFocus,
        WindowEventId::LostFocus,
        WindowEventId::Redraw,
        WindowEventId::Native,
    ];
}

/**
Process-unique identity of a window.  Never reused while the process runs.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub(crate) u64);

impl WindowId {
    pub(crate) fn next() -> WindowId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        WindowId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

/**
A weak reference from an event to the window it concerns.

The event stream outlives individual windows, so an event may be drained after its window is gone.
A `WindowRef` never keeps the window alive; use [`WindowRef::is_alive`] before acting on it.
*/
#[derive(Clone)]
pub struct WindowRef {
    id: WindowId,
    shared: Weak<WindowShared>,
}

impl WindowRef {
    pub(crate) fn new(id: WindowId, shared: Weak<WindowShared>) -> Self {
        WindowRef { id, shared }
    }

    #[cfg(test)]
    pub(crate) fn detached(id: WindowId) -> Self {
        WindowRef { id, shared: Weak::new() }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    /**
    Whether the referenced window still exists and has an open native window.
    */
    pub fn is_alive(&self) -> bool {
        self.shared.upgrade().map(|s| s.is_open()).unwrap_or(false)
    }

    /**
    Whether this reference names `window`.
    */
    pub fn refers_to(&self, window: &crate::window::Window) -> bool {
        self.id == window.id()
    }
}

impl Debug for WindowRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowRef").field("id", &self.id.0).finish()
    }
}

impl PartialEq for WindowRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for WindowRef {}

/**
A Win32 window message as delivered to the window procedure.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeMessage {
    pub hwnd: usize,
    pub msg: u32,
    pub wparam: usize,
    pub lparam: isize,
    /// Extra data read on behalf of the message, such as raw input bytes.
    pub extra: Box<[u8]>,
}

/**
The raw platform data behind a [`WindowEventId::Native`] event.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NativePayload {
    /// A Win32 message.
    Message(NativeMessage),
    /// Raw event bytes, such as a complete X11 `XEvent`.
    Bytes(Box<[u8]>),
    /// An event from the headless window server.
    Headless(crate::sys::headless::ServerEvent),
}

/**
A window event.
*/
#[derive(Debug, Clone)]
pub struct Event {
    id: WindowEventId,
    window: WindowRef,
    native: Option<NativePayload>,
}

impl Event {
    pub(crate) fn new(id: WindowEventId, window: WindowRef, native: Option<NativePayload>) -> Self {
        Event { id, window, native }
    }

    pub fn id(&self) -> WindowEventId {
        self.id
    }

    /**
    The window this event concerns.  The reference may dangle; see [`WindowRef`].
    */
    pub fn window(&self) -> &WindowRef {
        &self.window
    }

    /**
    Native payload, present for [`WindowEventId::Native`] events.
    */
    pub fn native(&self) -> Option<&NativePayload> {
        self.native.as_ref()
    }
}

/**
A batch of events taken by [`EventStream::process`], yielded in post order.
*/
#[derive(Debug)]
pub struct EventBatch {
    events: std::vec::IntoIter<Event>,
}

impl EventBatch {
    fn empty() -> Self {
        EventBatch { events: Vec::new().into_iter() }
    }
}

impl Iterator for EventBatch {
    type Item = Event;
    fn next(&mut self) -> Option<Event> {
        self.events.next()
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.events.size_hint()
    }
}

impl ExactSizeIterator for EventBatch {}

/**
The process-wide queue of window events.

Posting is safe from any thread, including native callback threads, and is a no-op while the stream
is not initialized.  Only one thread should call [`EventStream::process`] at a time.
*/
#[derive(Debug)]
pub struct EventStream {
    //None while uninitialized
    pending: Mutex<Option<Vec<Event>>>,
    capacity: AtomicUsize,
    max_pending: AtomicUsize,
    dropped: AtomicU64,
}

impl EventStream {
    pub(crate) fn new() -> Self {
        EventStream {
            pending: Mutex::new(None),
            capacity: AtomicUsize::new(0),
            max_pending: AtomicUsize::new(usize::MAX),
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn initialize(&self, capacity: usize, max_pending: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
        self.max_pending.store(max_pending.max(1), Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.is_none() {
            *pending = Some(Vec::with_capacity(capacity));
        }
    }

    /**
    Tears the stream down.  Pending events are dropped; later posts are ignored.
    */
    pub(crate) fn finalize(&self) {
        let discarded = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let count = discarded.map(|d| d.len()).unwrap_or(0);
        if count > 0 {
            logwise::debuginternal_sync!("Dropping {count} undrained events", count = count);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn post(&self, id: WindowEventId, window: WindowRef, native: Option<NativePayload>) {
        let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(pending) = guard.as_mut() else {
            return;
        };
        if pending.len() >= self.max_pending.load(Ordering::Relaxed) {
            drop(guard);
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            logwise::warn_sync!(
                "Event stream is full, dropping {id} event ({dropped} dropped so far)",
                id = logwise::privacy::LogIt(&id),
                dropped = logwise::privacy::LogIt(&dropped)
            );
            return;
        }
        pending.push(Event::new(id, window, native));
    }

    /**
    Takes every event posted since the previous call.

    Returns an empty batch when the stream is not initialized.
    */
    pub fn process(&self) -> EventBatch {
        let capacity = self.capacity.load(Ordering::Relaxed);
        let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(pending) => {
                let events = std::mem::replace(pending, Vec::with_capacity(capacity));
                EventBatch { events: events.into_iter() }
            }
            None => EventBatch::empty(),
        }
    }

    /**
    Number of events discarded because the stream reached its growth bound.
    */
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    fn stream() -> EventStream {
        let s = EventStream::new();
        s.initialize(16, 1024);
        s
    }

    #[test]
    fn post_before_initialize_is_ignored() {
        let s = EventStream::new();
        s.post(WindowEventId::Create, WindowRef::detached(WindowId(1)), None);
        assert_eq!(s.process().count(), 0);
        s.initialize(4, 16);
        assert_eq!(s.process().count(), 0);
    }

    #[test]
    fn batch_preserves_post_order() {
        let s = stream();
        let w = WindowRef::detached(WindowId(7));
        let ids = [
            WindowEventId::Create,
            WindowEventId::Show,
            WindowEventId::GotFocus,
            WindowEventId::Redraw,
            WindowEventId::Resize,
        ];
        for id in ids {
            s.post(id, w.clone(), None);
        }
        let got: Vec<_> = s.process().map(|e| e.id()).collect();
        assert_eq!(got, ids);
        assert_eq!(s.process().count(), 0, "events are delivered exactly once");
    }

    #[test]
    fn posts_after_finalize_are_ignored() {
        let s = stream();
        s.post(WindowEventId::Create, WindowRef::detached(WindowId(1)), None);
        s.finalize();
        s.post(WindowEventId::Destroy, WindowRef::detached(WindowId(1)), None);
        assert!(!s.is_initialized());
        assert_eq!(s.process().count(), 0);
    }

    #[test]
    fn growth_bound_drops_and_counts() {
        let s = EventStream::new();
        s.initialize(2, 3);
        for _ in 0..5 {
            s.post(WindowEventId::Redraw, WindowRef::detached(WindowId(1)), None);
        }
        assert_eq!(s.process().len(), 3);
        assert_eq!(s.dropped(), 2);
    }

    #[test]
    fn concurrent_producers_keep_per_thread_order() {
        let s = Arc::new(stream());
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let s = s.clone();
                std::thread::spawn(move || {
                    for i in 0..100u64 {
                        let native = NativePayload::Bytes(i.to_le_bytes().to_vec().into_boxed_slice());
                        s.post(WindowEventId::Native, WindowRef::detached(WindowId(t)), Some(native));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let mut last = [None::<u64>; 4];
        let mut total = 0;
        for event in s.process() {
            let t = event.window().id().get() as usize;
            let Some(NativePayload::Bytes(bytes)) = event.native() else {
                panic!("expected byte payload");
            };
            let i = u64::from_le_bytes(bytes[..8].try_into().unwrap());
            if let Some(prev) = last[t] {
                assert!(i > prev, "events from one producer must stay in order");
            }
            last[t] = Some(i);
            total += 1;
        }
        assert_eq!(total, 400);
    }

    #[test]
    fn dangling_reference_is_not_alive() {
        let r = WindowRef::detached(WindowId(3));
        assert!(!r.is_alive());
        assert_eq!(r.id().get(), 3);
    }

    #[test]
    fn test_send() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EventStream>();
        assert_send_sync::<Event>();
    }
}
