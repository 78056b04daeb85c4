//SPDX-License-Identifier: MPL-2.0
/*!
Translation of native window notifications into window events.

Every backend reduces its native notifications (Win32 messages, X11 events, delegate callbacks,
headless server events) to a [`NativeSignal`] and hands it to the bridge together with the raw
native payload.  The bridge keeps a small per-window state machine that suppresses redundant
notifications:

* SHOW/HIDE and GOTFOCUS/LOSTFOCUS are only emitted on an actual change of state.
* RESIZE, MOVE and REDRAW are stamped with the current generation token.  A window emits at most
  one of each per token value, however many native notifications arrive in that interval.

The generation token advances once per message loop iteration (or per
[`crate::WindowModule::event_process`] call).
*/

use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::WindowEventId;

/**
A platform-independent native window notification.
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum NativeSignal {
    /// The window became visible or was restored from minimized.
    Shown,
    /// The window became fully obscured or was minimized.
    Hidden,
    /// The window size changed.
    Resized,
    /// The window position changed.
    Moved,
    /// The window geometry changed and its contents are invalid (X11 `ConfigureNotify`).
    Configured,
    /// Part of the window needs to be painted.
    Paint,
    FocusGained,
    FocusLost,
    /// The user asked to close the window (title bar button, delete-window protocol).
    CloseRequested,
    /// The native window was torn down.
    Destroyed,
    /// An interactive size/move loop started.  Size changes are held until it ends.
    LiveResizeStarted,
    /// An interactive size/move loop ended.
    LiveResizeEnded,
}

/**
The process-wide generation counter used to deduplicate notifications.
*/
#[derive(Debug)]
pub(crate) struct GenerationToken(AtomicU64);

impl GenerationToken {
    pub const INITIAL: u64 = 1;

    pub fn new() -> Self {
        GenerationToken(AtomicU64::new(Self::INITIAL))
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Advances the token, returning the new value.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn reset(&self) {
        self.0.store(Self::INITIAL, Ordering::Release);
    }
}

/**
Per-window deduplication state.

Tokens start at zero, which the generation token never takes, so the first notification of each
kind always passes.
*/
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct BridgeState {
    pub visible: bool,
    pub focus: bool,
    pub last_paint: u64,
    pub last_resize: u64,
    pub last_move: u64,
    pub is_resizing: bool,
    pub destroyed: bool,
}

/// Events produced by one signal, in emission order.
pub(crate) type Emitted = [Option<WindowEventId>; 2];

impl BridgeState {
    fn stamp_paint(&mut self, token: u64) -> Option<WindowEventId> {
        if self.last_paint != token {
            self.last_paint = token;
            Some(WindowEventId::Redraw)
        } else {
            None
        }
    }

    fn stamp_resize(&mut self, token: u64) -> Option<WindowEventId> {
        if self.last_resize != token {
            self.last_resize = token;
            Some(WindowEventId::Resize)
        } else {
            None
        }
    }

    fn stamp_move(&mut self, token: u64) -> Option<WindowEventId> {
        if self.last_move != token {
            self.last_move = token;
            Some(WindowEventId::Move)
        } else {
            None
        }
    }

    /**
    Applies `signal` at generation `token` and returns the events to emit.

    `created` is whether this library owns the native window; only owned windows report DESTROY.
    */
    pub fn apply(&mut self, signal: NativeSignal, token: u64, created: bool) -> Emitted {
        match signal {
            NativeSignal::Shown => {
                if self.visible {
                    [None, None]
                } else {
                    self.visible = true;
                    [Some(WindowEventId::Show), self.stamp_paint(token)]
                }
            }
            NativeSignal::Hidden => {
                if self.visible {
                    self.visible = false;
                    [Some(WindowEventId::Hide), None]
                } else {
                    [None, None]
                }
            }
            NativeSignal::Resized => {
                if self.is_resizing {
                    [None, None]
                } else {
                    [self.stamp_resize(token), None]
                }
            }
            NativeSignal::Moved => {
                if self.is_resizing {
                    [None, None]
                } else {
                    [self.stamp_move(token), None]
                }
            }
            NativeSignal::Configured => [self.stamp_resize(token), self.stamp_paint(token)],
            NativeSignal::Paint => [self.stamp_paint(token), None],
            NativeSignal::FocusGained => {
                if self.focus {
                    [None, None]
                } else {
                    self.focus = true;
                    [Some(WindowEventId::GotFocus), None]
                }
            }
            NativeSignal::FocusLost => {
                if self.focus {
                    self.focus = false;
                    [Some(WindowEventId::LostFocus), None]
                } else {
                    [None, None]
                }
            }
            NativeSignal::CloseRequested => [Some(WindowEventId::Close), None],
            NativeSignal::Destroyed => {
                if created && !self.destroyed {
                    self.destroyed = true;
                    [Some(WindowEventId::Destroy), None]
                } else {
                    [None, None]
                }
            }
            NativeSignal::LiveResizeStarted => {
                self.is_resizing = true;
                [None, None]
            }
            NativeSignal::LiveResizeEnded => {
                self.is_resizing = false;
                [self.stamp_move(token), self.stamp_resize(token)]
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use WindowEventId::*;

    fn emitted(state: &mut BridgeState, signal: NativeSignal, token: u64) -> Vec<WindowEventId> {
        state.apply(signal, token, true).into_iter().flatten().collect()
    }

    #[test]
    fn show_emits_redraw_once_per_token() {
        let mut s = BridgeState::default();
        assert_eq!(emitted(&mut s, NativeSignal::Shown, 1), vec![Show, Redraw]);
        assert_eq!(emitted(&mut s, NativeSignal::Shown, 1), vec![]);
        assert_eq!(emitted(&mut s, NativeSignal::Paint, 1), vec![]);
        assert!(s.visible);
    }

    #[test]
    fn show_after_paint_in_same_token_skips_redraw() {
        let mut s = BridgeState::default();
        assert_eq!(emitted(&mut s, NativeSignal::Paint, 4), vec![Redraw]);
        assert_eq!(emitted(&mut s, NativeSignal::Shown, 4), vec![Show]);
    }

    #[test]
    fn hide_requires_visible() {
        let mut s = BridgeState::default();
        assert_eq!(emitted(&mut s, NativeSignal::Hidden, 1), vec![]);
        emitted(&mut s, NativeSignal::Shown, 1);
        assert_eq!(emitted(&mut s, NativeSignal::Hidden, 1), vec![Hide]);
        assert_eq!(emitted(&mut s, NativeSignal::Hidden, 2), vec![]);
        assert!(!s.visible);
    }

    #[test]
    fn configure_burst_collapses_within_token() {
        let mut s = BridgeState::default();
        let mut all = Vec::new();
        for _ in 0..10 {
            all.extend(emitted(&mut s, NativeSignal::Configured, 3));
            all.extend(emitted(&mut s, NativeSignal::Paint, 3));
        }
        assert_eq!(all, vec![Resize, Redraw]);
        assert_eq!(emitted(&mut s, NativeSignal::Configured, 4), vec![Resize, Redraw]);
    }

    #[test]
    fn focus_transitions_only_on_change() {
        let mut s = BridgeState::default();
        assert_eq!(emitted(&mut s, NativeSignal::FocusLost, 1), vec![]);
        assert_eq!(emitted(&mut s, NativeSignal::FocusGained, 1), vec![GotFocus]);
        assert_eq!(emitted(&mut s, NativeSignal::FocusGained, 2), vec![]);
        assert_eq!(emitted(&mut s, NativeSignal::FocusLost, 2), vec![LostFocus]);
    }

    #[test]
    fn close_is_never_deduplicated() {
        let mut s = BridgeState::default();
        assert_eq!(emitted(&mut s, NativeSignal::CloseRequested, 1), vec![Close]);
        assert_eq!(emitted(&mut s, NativeSignal::CloseRequested, 1), vec![Close]);
    }

    #[test]
    fn destroy_only_for_owned_windows_and_only_once() {
        let mut wrapped = BridgeState::default();
        assert_eq!(
            wrapped.apply(NativeSignal::Destroyed, 1, false),
            [None, None]
        );
        let mut owned = BridgeState::default();
        assert_eq!(emitted(&mut owned, NativeSignal::Destroyed, 1), vec![Destroy]);
        assert_eq!(emitted(&mut owned, NativeSignal::Destroyed, 2), vec![]);
    }

    #[test]
    fn live_resize_holds_size_changes_until_end() {
        let mut s = BridgeState::default();
        emitted(&mut s, NativeSignal::LiveResizeStarted, 5);
        for _ in 0..20 {
            assert_eq!(emitted(&mut s, NativeSignal::Resized, 5), vec![]);
            assert_eq!(emitted(&mut s, NativeSignal::Moved, 5), vec![]);
        }
        assert_eq!(emitted(&mut s, NativeSignal::LiveResizeEnded, 5), vec![Move, Resize]);
        assert!(!s.is_resizing);
        assert_eq!(emitted(&mut s, NativeSignal::Resized, 5), vec![]);
    }

    #[test]
    fn resize_and_move_dedup_independently() {
        let mut s = BridgeState::default();
        assert_eq!(emitted(&mut s, NativeSignal::Resized, 2), vec![Resize]);
        assert_eq!(emitted(&mut s, NativeSignal::Moved, 2), vec![Move]);
        assert_eq!(emitted(&mut s, NativeSignal::Resized, 2), vec![]);
        assert_eq!(emitted(&mut s, NativeSignal::Moved, 2), vec![]);
        assert_eq!(emitted(&mut s, NativeSignal::Resized, 3), vec![Resize]);
    }

    #[test]
    fn token_advances_monotonically() {
        let t = GenerationToken::new();
        assert_eq!(t.current(), GenerationToken::INITIAL);
        assert_eq!(t.advance(), 2);
        assert_eq!(t.advance(), 3);
        assert_eq!(t.current(), 3);
        t.reset();
        assert_eq!(t.current(), 1);
    }
}
