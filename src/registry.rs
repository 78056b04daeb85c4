//SPDX-License-Identifier: MPL-2.0
/*!
The set of live windows served by a single global native event source.

X11 delivers every window's events over one display connection, so the message loop must find
the logical window for each native event.  Registration, removal and iteration all happen under
one lock: a window removed by another thread is either visited in full or not at all.
*/

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

#[derive(Debug)]
pub(crate) struct WindowRegistry<W> {
    windows: Mutex<Vec<Arc<W>>>,
}

impl<W> WindowRegistry<W> {
    pub fn new() -> Self {
        WindowRegistry {
            windows: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<W>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, window: Arc<W>) {
        self.lock().push(window);
    }

    /**
    Removes `window`.  Returns false if it was not registered, which is benign.
    */
    pub fn unregister(&self, window: &Arc<W>) -> bool {
        let mut windows = self.lock();
        match windows.iter().position(|w| Arc::ptr_eq(w, window)) {
            Some(index) => {
                windows.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /**
    Runs `f` over every registered window while holding the registry lock.
    */
    pub fn for_each_snapshot<R, F: FnOnce(&[Arc<W>]) -> R>(&self, f: F) -> R {
        let windows = self.lock();
        f(&windows)
    }

    /**
    Like [`Self::for_each_snapshot`] but gives up immediately if the lock is contended.

    Returns `None` when the pass was skipped; `f` is then not called at all.
    */
    pub fn try_for_each_snapshot<R, F: FnOnce(&[Arc<W>]) -> R>(&self, f: F) -> Option<R> {
        let windows = match self.windows.try_lock() {
            Ok(windows) => windows,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some(f(&windows))
    }
}

impl<W> Default for WindowRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::WindowRegistry;
    use std::sync::{Arc, Barrier};

    #[test]
    fn register_and_unregister() {
        let r = WindowRegistry::new();
        let a = Arc::new(1);
        let b = Arc::new(2);
        r.register(a.clone());
        r.register(b.clone());
        assert_eq!(r.len(), 2);
        assert!(r.unregister(&a));
        assert!(!r.unregister(&a), "second removal is benign");
        let mut seen = Vec::new();
        r.for_each_snapshot(|w| seen.extend(w.iter().map(|w| **w)));
        assert_eq!(seen, vec![2]);
    }

    #[test]
    fn identity_not_value_decides_removal() {
        let r = WindowRegistry::new();
        let a = Arc::new(5);
        let twin = Arc::new(5);
        r.register(a.clone());
        assert!(!r.unregister(&twin));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn contended_poll_is_skipped() {
        let r = Arc::new(WindowRegistry::new());
        r.register(Arc::new(0u8));
        let held = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let holder = {
            let r = r.clone();
            let held = held.clone();
            let release = release.clone();
            std::thread::spawn(move || {
                r.for_each_snapshot(|_| {
                    held.wait();
                    release.wait();
                });
            })
        };
        held.wait();
        let mut called = false;
        assert!(r.try_for_each_snapshot(|_| called = true).is_none());
        assert!(!called);
        release.wait();
        holder.join().unwrap();
        assert_eq!(r.try_for_each_snapshot(|w| w.len()), Some(1));
    }

    #[test]
    fn removal_waits_for_iteration() {
        let r = Arc::new(WindowRegistry::new());
        let w = Arc::new(1u32);
        r.register(w.clone());
        let started = Arc::new(Barrier::new(2));
        let iterating = {
            let r = r.clone();
            let started = started.clone();
            std::thread::spawn(move || {
                let mut visited = 0;
                r.for_each_snapshot(|windows| {
                    started.wait();
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    visited = windows.len();
                });
                visited
            })
        };
        started.wait();
        assert!(r.unregister(&w));
        assert_eq!(iterating.join().unwrap(), 1, "the pass saw the window in full");
        assert_eq!(r.len(), 0);
    }
}
