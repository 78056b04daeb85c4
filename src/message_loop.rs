//SPDX-License-Identifier: MPL-2.0
/*!
The blocking message loop and its quit protocol.

```text
Idle -> Running -> (pump iteration)* -> QuitRequested -> Stopped
```

A loop iteration blocks in the backend's native wait primitive, dispatches whatever arrived to the
bridge, and then advances the generation token exactly once.  A quit request from any thread moves
the state to `QuitRequested` and wakes the native wait.  A quit requested while no loop is running
is latched and ends the next loop immediately.
*/

use std::sync::atomic::{AtomicU8, Ordering};

use crate::bridge::GenerationToken;
use crate::error::WindowError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoopState {
    Idle = 0,
    Running = 1,
    QuitRequested = 2,
    Stopped = 3,
}

impl LoopState {
    fn from_u8(v: u8) -> LoopState {
        match v {
            1 => LoopState::Running,
            2 => LoopState::QuitRequested,
            3 => LoopState::Stopped,
            _ => LoopState::Idle,
        }
    }
}

/**
Outcome of one native pump step.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum PumpStatus {
    Continue,
    /// The native source itself asked the loop to end (Win32 `WM_QUIT`).
    #[cfg_attr(not(any(test, target_os = "windows")), allow(dead_code))]
    Quit,
}

/**
A native event source that the message loop drives.
*/
pub(crate) trait Pump {
    /**
    Blocks until the native source has something to deliver (or is woken by a quit request),
    then dispatches everything pending to the bridge.
    */
    fn pump_once(&mut self) -> Result<PumpStatus, WindowError>;
}

#[derive(Debug)]
pub(crate) struct LoopControl {
    state: AtomicU8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Begin {
    Running,
    /// A quit was requested before the loop started.
    QuitLatched,
}

impl LoopControl {
    pub fn new() -> Self {
        LoopControl {
            state: AtomicU8::new(LoopState::Idle as u8),
        }
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn begin(&self) -> Result<Begin, WindowError> {
        loop {
            let current = self.state();
            match current {
                LoopState::Running => return Err(WindowError::LoopRunning),
                LoopState::QuitRequested => {
                    if self
                        .state
                        .compare_exchange(
                            current as u8,
                            LoopState::Stopped as u8,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                    {
                        return Ok(Begin::QuitLatched);
                    }
                }
                LoopState::Idle | LoopState::Stopped => {
                    if self
                        .state
                        .compare_exchange(
                            current as u8,
                            LoopState::Running as u8,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                    {
                        return Ok(Begin::Running);
                    }
                }
            }
        }
    }

    pub fn should_quit(&self) -> bool {
        self.state() == LoopState::QuitRequested
    }

    pub fn finish(&self) {
        self.state.store(LoopState::Stopped as u8, Ordering::Release);
    }

    /**
    Requests the loop to stop.  Returns true if a running loop must be woken.
    */
    pub fn request_quit(&self) -> bool {
        let previous = LoopState::from_u8(
            self.state
                .swap(LoopState::QuitRequested as u8, Ordering::AcqRel),
        );
        previous == LoopState::Running
    }

    pub fn reset(&self) {
        self.state.store(LoopState::Idle as u8, Ordering::Release);
    }
}

/**
Runs `pump` until a quit is requested, advancing `token` once per iteration.
*/
pub(crate) fn run<P: Pump>(
    control: &LoopControl,
    token: &GenerationToken,
    pump: &mut P,
) -> Result<(), WindowError> {
    match control.begin()? {
        Begin::QuitLatched => {
            logwise::debuginternal_sync!("Message loop quit before it started");
            return Ok(());
        }
        Begin::Running => {}
    }
    logwise::debuginternal_sync!("Message loop running");
    let result = loop {
        if control.should_quit() {
            break Ok(());
        }
        match pump.pump_once() {
            Ok(PumpStatus::Continue) => {}
            Ok(PumpStatus::Quit) => break Ok(()),
            Err(e) => {
                logwise::error_sync!(
                    "Native event pump failed: {err}",
                    err = logwise::privacy::LogIt(&e)
                );
                break Err(e);
            }
        }
        token.advance();
    };
    control.finish();
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::{Receiver, channel};
    use std::sync::Arc;
    use std::time::Duration;

    struct CountingPump<'a> {
        control: &'a LoopControl,
        iterations: u32,
        quit_after: u32,
    }

    impl Pump for CountingPump<'_> {
        fn pump_once(&mut self) -> Result<PumpStatus, WindowError> {
            self.iterations += 1;
            if self.iterations == self.quit_after {
                self.control.request_quit();
            }
            Ok(PumpStatus::Continue)
        }
    }

    #[test]
    fn token_advances_once_per_iteration() {
        let control = LoopControl::new();
        let token = GenerationToken::new();
        let mut pump = CountingPump {
            control: &control,
            iterations: 0,
            quit_after: 3,
        };
        assert_eq!(run(&control, &token, &mut pump), Ok(()));
        assert_eq!(pump.iterations, 3);
        assert_eq!(token.current(), GenerationToken::INITIAL + 3);
        assert_eq!(control.state(), LoopState::Stopped);
    }

    struct FailingPump;
    impl Pump for FailingPump {
        fn pump_once(&mut self) -> Result<PumpStatus, WindowError> {
            Err(WindowError::Pump(-1))
        }
    }

    #[test]
    fn pump_failure_is_reported() {
        let control = LoopControl::new();
        let token = GenerationToken::new();
        let err = run(&control, &token, &mut FailingPump).unwrap_err();
        assert!(err.status_code() < 0);
        assert_eq!(control.state(), LoopState::Stopped);
    }

    #[test]
    fn latched_quit_ends_next_loop() {
        let control = LoopControl::new();
        assert!(!control.request_quit(), "nothing to wake while idle");
        let token = GenerationToken::new();
        let mut pump = FailingPump;
        assert_eq!(run(&control, &token, &mut pump), Ok(()));
        assert_eq!(token.current(), GenerationToken::INITIAL);
    }

    struct ChannelPump {
        wake: Receiver<()>,
    }
    impl Pump for ChannelPump {
        fn pump_once(&mut self) -> Result<PumpStatus, WindowError> {
            self.wake.recv().map_err(|_| WindowError::Pump(-1))?;
            Ok(PumpStatus::Continue)
        }
    }

    #[test]
    fn quit_from_other_thread() {
        let control = Arc::new(LoopControl::new());
        let (sender, receiver) = channel();
        let looping = {
            let control = control.clone();
            std::thread::spawn(move || {
                let token = GenerationToken::new();
                run(&control, &token, &mut ChannelPump { wake: receiver })
            })
        };
        while control.state() != LoopState::Running {
            std::thread::sleep(Duration::from_millis(1));
        }
        if control.request_quit() {
            sender.send(()).unwrap();
        }
        assert_eq!(looping.join().unwrap(), Ok(()));
    }

    struct NativeQuitPump;
    impl Pump for NativeQuitPump {
        fn pump_once(&mut self) -> Result<PumpStatus, WindowError> {
            Ok(PumpStatus::Quit)
        }
    }

    #[test]
    fn native_quit_stops_without_advancing() {
        let control = LoopControl::new();
        let token = GenerationToken::new();
        assert_eq!(run(&control, &token, &mut NativeQuitPump), Ok(()));
        assert_eq!(token.current(), GenerationToken::INITIAL);
        assert_eq!(control.state(), LoopState::Stopped);
    }

    #[test]
    fn second_loop_is_refused() {
        let control = LoopControl::new();
        assert_eq!(control.begin(), Ok(Begin::Running));
        assert_eq!(control.begin(), Err(WindowError::LoopRunning));
        control.finish();
        assert_eq!(control.begin(), Ok(Begin::Running));
    }
}
