//SPDX-License-Identifier: MPL-2.0

/**
Errors reported by the window module.
*/
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WindowError {
    /// The module has not been initialized, or has been finalized.
    #[error("window module is not initialized")]
    NotInitialized,
    /// The native display connection could not be opened.
    #[error("unable to open native display: {0}")]
    DisplayUnavailable(String),
    /// A window class could not be registered with the OS.
    #[error("unable to register window class: {0}")]
    ClassRegistration(String),
    /// The OS refused to create the native window.
    #[error("unable to create native window: {0}")]
    Creation(String),
    /// The window reference does not refer to an open native window.
    #[error("window is not open")]
    InvalidWindow,
    /// An argument was outside of the accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The requested operation is not available on this backend.
    #[error("operation is not supported by the {0} backend")]
    Unsupported(&'static str),
    /// A message loop is already running.
    #[error("a message loop is already running")]
    LoopRunning,
    /// The native event pump failed.
    #[error("native event pump failed with code {0}")]
    Pump(i32),
}

impl WindowError {
    /**
    The negative status code for this error.

    Pump failures return the native code when it is already negative.
    */
    pub fn status_code(&self) -> i32 {
        match self {
            WindowError::NotInitialized => -1,
            WindowError::DisplayUnavailable(_) => -2,
            WindowError::ClassRegistration(_) => -3,
            WindowError::Creation(_) => -4,
            WindowError::InvalidWindow => -5,
            WindowError::InvalidArgument(_) => -6,
            WindowError::Unsupported(_) => -7,
            WindowError::LoopRunning => -9,
            WindowError::Pump(code) if *code < 0 => *code,
            WindowError::Pump(_) => -8,
        }
    }
}

#[cfg(test)]
mod test {
    use super::WindowError;

    #[test]
    fn status_codes_are_negative() {
        let errors = [
            WindowError::NotInitialized,
            WindowError::DisplayUnavailable("x".to_string()),
            WindowError::ClassRegistration("x".to_string()),
            WindowError::Creation("x".to_string()),
            WindowError::InvalidWindow,
            WindowError::InvalidArgument("x"),
            WindowError::Unsupported("x"),
            WindowError::LoopRunning,
            WindowError::Pump(3),
        ];
        for e in errors {
            assert!(e.status_code() < 0, "{e} should map to a negative code");
        }
        assert_eq!(WindowError::Pump(-1).status_code(), -1);
    }

    #[test]
    fn test_send() {
        fn assert_send_sync<T: Send + Sync + std::error::Error>() {}
        assert_send_sync::<WindowError>();
    }
}
