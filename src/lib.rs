//SPDX-License-Identifier: MPL-2.0

/*!
A cross-platform native window lifecycle and event bridge.

This crate brings up native windows on Win32 and X11, wraps windows owned by a platform host
(AppKit, UIKit, Android), and turns the native notifications those windows receive into one
uniform stream of lifecycle events: create, destroy, show, hide, focus, resize, move, redraw and
close.  Drawing into the window is out of scope; hand the window to a renderer through its
`raw-window-handle` implementations.

# Quick Start

```
use window_bridge::{Adapter, Backend, Window, WindowConfig, WindowFlags, WindowModule};
use window_bridge::event::WindowEventId;

let module = WindowModule::new();
module.initialize(WindowConfig::default().with_backend(Backend::Headless)).unwrap();

let window = Window::create(&module, Adapter::DEFAULT, "Hello", 800, 600, WindowFlags::empty()).unwrap();
module.event_process().unwrap();

let ids: Vec<WindowEventId> = module.event_stream().process().map(|e| e.id()).collect();
assert_eq!(ids.first(), Some(&WindowEventId::Create));

window.destroy();
module.finalize();
```

# Event delivery

Native notifications are folded through a per-window bridge before they reach the stream.  Each
message-loop iteration advances a generation token; the bridge reports at most one
[`event::WindowEventId::Resize`], one [`event::WindowEventId::Move`] and one
[`event::WindowEventId::Redraw`] per window per token, no matter how many native messages arrive.
Visibility and focus events are only reported when the state actually changes.

Events name their window through a weak [`event::WindowRef`], so an event read after its window
was destroyed is still safe to inspect.

# Threading Model

- [`WindowModule`] and [`Window`] are `Send + Sync`.
- [`WindowModule::message_loop`] blocks the calling thread.  On Win32 it must be the thread
  that created the windows.
- [`WindowModule::message_quit`] may be called from any thread.
- The [`event::EventStream`] may be drained from any thread.

# Backends

| Platform        | Backend  | Create | Wrap |
|-----------------|----------|--------|------|
| Windows         | Win32    | yes    | yes  |
| Linux           | X11      | yes    | yes  |
| macOS/iOS       | reactive | no     | yes  |
| Android         | reactive | no     | yes  |
| any             | headless | yes    | yes  |

The headless backend simulates a window server in-process.  See [`HeadlessServer`].
*/

/// Integer screen coordinates.
///
/// ```
/// use window_bridge::coordinates::{Position, Size};
///
/// let pos = Position::new(100, 200);
/// assert_eq!(pos.x(), 100);
///
/// let size = Size::new(800, 600);
/// assert_eq!(size.height(), 600);
/// ```
pub mod coordinates;

/// Events, the event stream, and weak window references.
pub mod event;

mod bridge;
mod config;
mod error;
mod message_loop;
mod module;
mod registry;
mod sys;
mod window;

pub use bridge::NativeSignal;
pub use config::{Backend, WindowConfig};
pub use coordinates::{Position, Rect, Size};
pub use error::WindowError;
pub use message_loop::LoopState;
pub use module::{AppEvent, WindowModule};
pub use sys::headless::{HeadlessServer, ServerEvent, ServerEventKind};
pub use window::{Adapter, NativeHandle, Window, WindowFlags};

logwise::declare_logging_domain!();
