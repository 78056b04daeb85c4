//SPDX-License-Identifier: MPL-2.0
/*!
The window module: the context every window, the event stream and the message loop hang off.

A [`WindowModule`] is an explicit, cloneable handle.  Several modules may coexist (tests create one
each); every window belongs to the module it was created with.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::bridge::GenerationToken;
use crate::config::{Backend, WindowConfig};
use crate::coordinates::Size;
use crate::error::WindowError;
use crate::event::{EventStream, WindowEventId};
use crate::message_loop::{LoopControl, LoopState};
use crate::registry::WindowRegistry;
use crate::sys::{self, System};
use crate::window::{Adapter, Window, WindowShared};

/**
Application lifecycle notifications forwarded by platform glue.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AppEvent {
    Start,
    Pause,
    Resume,
    Terminate,
}

#[derive(Debug)]
struct Active {
    config: WindowConfig,
    system: Arc<System>,
}

#[derive(Debug)]
pub(crate) struct Context {
    pub stream: EventStream,
    pub registry: WindowRegistry<WindowShared>,
    pub token: GenerationToken,
    pub loop_control: LoopControl,
    app_started: AtomicBool,
    app_paused: AtomicBool,
    active: Mutex<Option<Active>>,
}

impl Context {
    fn new() -> Self {
        Context {
            stream: EventStream::new(),
            registry: WindowRegistry::new(),
            token: GenerationToken::new(),
            loop_control: LoopControl::new(),
            app_started: AtomicBool::new(false),
            app_paused: AtomicBool::new(true),
            active: Mutex::new(None),
        }
    }

    fn system(&self) -> Result<Arc<System>, WindowError> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|a| a.system.clone())
            .ok_or(WindowError::NotInitialized)
    }
}

/**
Handle to a window module.

```
use window_bridge::{Adapter, Backend, Window, WindowConfig, WindowFlags, WindowModule};
use window_bridge::event::WindowEventId;

let module = WindowModule::new();
module.initialize(WindowConfig::default().with_backend(Backend::Headless)).unwrap();
let window = Window::create(&module, Adapter::DEFAULT, "demo", 640, 480, WindowFlags::empty()).unwrap();
module.event_process().unwrap();
let ids: Vec<_> = module.event_stream().process().map(|e| e.id()).collect();
assert_eq!(ids[0], WindowEventId::Create);
drop(window);
module.finalize();
```
*/
#[derive(Debug, Clone)]
pub struct WindowModule {
    context: Arc<Context>,
}

impl Default for WindowModule {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowModule {
    /**
    Creates an uninitialized module.
    */
    pub fn new() -> Self {
        WindowModule {
            context: Arc::new(Context::new()),
        }
    }

    pub(crate) fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub(crate) fn system(&self) -> Result<Arc<System>, WindowError> {
        self.context.system()
    }

    /**
    Initializes the event stream and the selected backend.

    Calling this on an initialized module does nothing and returns `Ok`.
    */
    pub fn initialize(&self, config: WindowConfig) -> Result<(), WindowError> {
        let mut active = self
            .context
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Ok(());
        }
        let system = match config.backend {
            Backend::Headless => System::Headless(sys::headless::Server::new(config.headless_screen)),
            Backend::Native => System::Native(sys::native::System::new(&config)?),
        };
        self.context
            .stream
            .initialize(config.stream_capacity, config.max_pending_events);
        self.context.token.reset();
        self.context.loop_control.reset();
        self.context.app_started.store(false, Ordering::Release);
        self.context.app_paused.store(true, Ordering::Release);
        logwise::info_sync!(
            "Window module initialized with {backend} backend",
            backend = config.backend.name()
        );
        *active = Some(Active {
            config,
            system: Arc::new(system),
        });
        Ok(())
    }

    /**
    Tears the module down.  A running message loop is asked to quit; windows still alive stay
    valid objects but no longer deliver events.
    */
    pub fn finalize(&self) {
        let Some(active) = self
            .context
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        if self.context.loop_control.request_quit() {
            active.system.wake();
        }
        self.context.registry.clear();
        self.context.stream.finalize();
        active.system.finalize();
        logwise::info_sync!(
            "Window module finalized ({backend} backend)",
            backend = active.config.backend.name()
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.context
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /**
    The configuration the module was initialized with.
    */
    pub fn config(&self) -> Option<WindowConfig> {
        self.context
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|a| a.config.clone())
    }

    pub fn event_stream(&self) -> &EventStream {
        &self.context.stream
    }

    /**
    Posts a custom event for `window`.
    */
    pub fn event_post(&self, id: WindowEventId, window: &Window) {
        self.context.stream.post(id, window.window_ref(), None);
    }

    /**
    Dispatches pending native events without blocking, then advances the generation token.

    For hosts that own their loop instead of calling [`Self::message_loop`].  If another thread
    holds the window registry, the poll is skipped.  Returns the number of native events handled.
    */
    pub fn event_process(&self) -> Result<usize, WindowError> {
        let system = self.system()?;
        let handled = system.pump_pending(&self.context)?;
        self.context.token.advance();
        Ok(handled)
    }

    /**
    Records an application lifecycle transition reported by platform glue.
    */
    pub fn event_handle(&self, event: AppEvent) {
        logwise::debuginternal_sync!(
            "Application event {event}",
            event = logwise::privacy::LogIt(&event)
        );
        match event {
            AppEvent::Start => {
                self.context.app_started.store(true, Ordering::Release);
                self.context.app_paused.store(false, Ordering::Release);
            }
            AppEvent::Pause => self.context.app_paused.store(true, Ordering::Release),
            AppEvent::Resume => self.context.app_paused.store(false, Ordering::Release),
            AppEvent::Terminate => {
                self.context.app_started.store(false, Ordering::Release);
                self.context.app_paused.store(true, Ordering::Release);
                self.message_quit();
            }
        }
    }

    pub fn app_started(&self) -> bool {
        self.context.app_started.load(Ordering::Acquire)
    }

    pub fn app_paused(&self) -> bool {
        self.context.app_paused.load(Ordering::Acquire)
    }

    /**
    Runs the blocking message loop on the calling thread until [`Self::message_quit`].

    Only one loop may run per module; a second one fails with [`WindowError::LoopRunning`].
    */
    pub fn message_loop(&self) -> Result<(), WindowError> {
        let system = self.system()?;
        system.run_loop(&self.context)
    }

    /**
    Asks the message loop to return.  Safe from any thread.  A quit requested while no loop runs
    makes the next loop return immediately.
    */
    pub fn message_quit(&self) {
        if self.context.loop_control.request_quit() {
            if let Ok(system) = self.system() {
                system.wake();
            }
        }
    }

    pub fn loop_state(&self) -> LoopState {
        self.context.loop_control.state()
    }

    /// Size of the given adapter's screen.
    pub fn screen_size(&self, adapter: Adapter) -> Result<Size, WindowError> {
        self.system()?.screen_size(adapter)
    }

    pub fn screen_width(&self, adapter: Adapter) -> Result<u32, WindowError> {
        self.screen_size(adapter).map(|s| s.width())
    }

    pub fn screen_height(&self, adapter: Adapter) -> Result<u32, WindowError> {
        self.screen_size(adapter).map(|s| s.height())
    }

    /**
    The simulated window server, when initialized with [`Backend::Headless`].
    */
    pub fn headless_server(&self) -> Option<crate::HeadlessServer> {
        match &*self.system().ok()? {
            System::Headless(server) => Some(crate::HeadlessServer::new(server.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn headless() -> WindowModule {
        let module = WindowModule::new();
        module
            .initialize(WindowConfig::default().with_backend(Backend::Headless))
            .unwrap();
        module
    }

    #[test]
    fn operations_before_initialize_fail() {
        let module = WindowModule::new();
        assert!(!module.is_initialized());
        assert_eq!(module.event_process(), Err(WindowError::NotInitialized));
        assert_eq!(module.message_loop(), Err(WindowError::NotInitialized));
        assert_eq!(
            module.screen_width(Adapter::DEFAULT),
            Err(WindowError::NotInitialized)
        );
        assert_eq!(module.event_stream().process().count(), 0);
    }

    #[test]
    fn initialize_is_idempotent_and_finalize_resets() {
        let module = headless();
        module
            .initialize(WindowConfig::default().with_backend(Backend::Headless))
            .unwrap();
        assert!(module.is_initialized());
        assert!(module.event_stream().is_initialized());
        module.finalize();
        assert!(!module.is_initialized());
        assert!(!module.event_stream().is_initialized());
        module.finalize();
        module
            .initialize(WindowConfig::default().with_backend(Backend::Headless))
            .unwrap();
        assert!(module.is_initialized());
    }

    #[test]
    fn lifecycle_flags_follow_app_events() {
        let module = headless();
        assert!(!module.app_started());
        assert!(module.app_paused());
        module.event_handle(AppEvent::Start);
        assert!(module.app_started());
        assert!(!module.app_paused());
        module.event_handle(AppEvent::Pause);
        assert!(module.app_paused());
        module.event_handle(AppEvent::Resume);
        assert!(!module.app_paused());
        module.event_handle(AppEvent::Terminate);
        assert!(!module.app_started());
        assert_eq!(module.loop_state(), LoopState::QuitRequested);
        assert_eq!(module.message_loop(), Ok(()));
    }

    #[test]
    fn event_process_advances_token() {
        let module = headless();
        let before = module.context.token.current();
        assert_eq!(module.event_process(), Ok(0));
        assert_eq!(module.context.token.current(), before + 1);
    }

    #[test]
    fn headless_screen_size() {
        let module = WindowModule::new();
        module
            .initialize(
                WindowConfig::default()
                    .with_backend(Backend::Headless)
                    .with_headless_screen(Size::new(1280, 720)),
            )
            .unwrap();
        assert_eq!(module.screen_width(Adapter::DEFAULT), Ok(1280));
        assert_eq!(module.screen_height(Adapter::index(0)), Ok(720));
        assert!(module.headless_server().is_some());
    }

    #[test]
    fn test_send() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WindowModule>();
    }
}
