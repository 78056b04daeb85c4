//SPDX-License-Identifier: MPL-2.0

use crate::coordinates::Size;

/**
Which window system backs the module.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    /**
    The platform's native window system: Win32 on Windows, X11 on Linux, and the
    callback-driven bridge on macOS, iOS and Android.
    */
    #[default]
    Native,
    /**
    An in-process simulated window server.  Available everywhere; behaves like a compliant
    window manager that maps, focuses and exposes new windows.
    */
    Headless,
}

impl Backend {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Backend::Native => crate::sys::NATIVE_BACKEND_NAME,
            Backend::Headless => "headless",
        }
    }
}

/**
Configuration for [`crate::WindowModule::initialize`].
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub backend: Backend,
    /// Initial capacity of each event batch.
    pub stream_capacity: usize,
    /// Events beyond this many undrained ones are dropped with a warning.
    pub max_pending_events: usize,
    /// Screen size reported by the headless backend.
    pub headless_screen: Size,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            backend: Backend::Native,
            stream_capacity: 1024,
            max_pending_events: 65536,
            headless_screen: Size::new(1920, 1080),
        }
    }
}

impl WindowConfig {
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    pub fn with_max_pending_events(mut self, max: usize) -> Self {
        self.max_pending_events = max;
        self
    }

    pub fn with_headless_screen(mut self, screen: Size) -> Self {
        self.headless_screen = screen;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builders_override_defaults() {
        let config = WindowConfig::default()
            .with_backend(Backend::Headless)
            .with_stream_capacity(8)
            .with_max_pending_events(16)
            .with_headless_screen(Size::new(320, 240));
        assert_eq!(config.backend, Backend::Headless);
        assert_eq!(config.stream_capacity, 8);
        assert_eq!(config.max_pending_events, 16);
        assert_eq!(config.headless_screen, Size::new(320, 240));
        assert_eq!(WindowConfig::default().backend, Backend::Native);
    }
}
