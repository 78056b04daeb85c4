//SPDX-License-Identifier: MPL-2.0

//! Message loop start/quit behavior.
//!
//! The loop blocks the calling thread, so this runs without the test harness and drives every
//! scenario from `main`.
//!
//! Run with: `cargo test --test message_loop_quit_test`

use std::collections::{HashMap, HashSet};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use window_bridge::event::WindowEventId;
use window_bridge::{
    Adapter, AppEvent, Backend, LoopState, Window, WindowConfig, WindowError, WindowFlags,
    WindowModule,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn headless() -> WindowModule {
    let module = WindowModule::new();
    module
        .initialize(WindowConfig::default().with_backend(Backend::Headless))
        .unwrap();
    module
}

/// Runs the loop on a helper thread and reports its result.
fn spawn_loop(module: &WindowModule) -> mpsc::Receiver<Result<(), WindowError>> {
    let (sender, receiver) = mpsc::channel();
    let module = module.clone();
    thread::Builder::new()
        .name("message_loop".to_string())
        .spawn(move || {
            let _ = sender.send(module.message_loop());
        })
        .unwrap();
    receiver
}

fn wait_for_state(module: &WindowModule, state: LoopState) {
    let start = std::time::Instant::now();
    while module.loop_state() != state {
        assert!(start.elapsed() < TIMEOUT, "loop never reached {state:?}");
        thread::sleep(Duration::from_millis(1));
    }
}

fn test_quit_from_other_thread() {
    let module = headless();
    let done = spawn_loop(&module);
    wait_for_state(&module, LoopState::Running);

    let quitter = module.clone();
    thread::spawn(move || quitter.message_quit()).join().unwrap();
    done.recv_timeout(TIMEOUT).unwrap().unwrap();
    assert_eq!(module.loop_state(), LoopState::Stopped);
    module.finalize();
}

fn test_quit_before_loop_is_latched() {
    let module = headless();
    module.message_quit();
    assert_eq!(module.loop_state(), LoopState::QuitRequested);
    module.message_loop().unwrap();
    assert_eq!(module.loop_state(), LoopState::Stopped);
    module.finalize();
}

fn test_second_loop_is_rejected() {
    let module = headless();
    let done = spawn_loop(&module);
    wait_for_state(&module, LoopState::Running);
    assert_eq!(module.message_loop(), Err(WindowError::LoopRunning));
    module.message_quit();
    done.recv_timeout(TIMEOUT).unwrap().unwrap();
    module.finalize();
}

fn test_loop_dispatches_window_events() {
    let module = headless();
    let window =
        Window::create(&module, Adapter::DEFAULT, "loop", 800, 600, WindowFlags::empty()).unwrap();
    let done = spawn_loop(&module);

    let start = std::time::Instant::now();
    let mut seen = Vec::new();
    while !seen.contains(&WindowEventId::GotFocus) {
        assert!(start.elapsed() < TIMEOUT, "focus never reported, saw {seen:?}");
        seen.extend(module.event_stream().process().map(|e| e.id()));
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(seen.first(), Some(&WindowEventId::Create));
    assert!(seen.contains(&WindowEventId::Show));

    module.headless_server().unwrap().request_close(&window).unwrap();
    let start = std::time::Instant::now();
    while !seen.contains(&WindowEventId::Close) {
        assert!(start.elapsed() < TIMEOUT, "close never reported");
        seen.extend(module.event_stream().process().map(|e| e.id()));
        thread::sleep(Duration::from_millis(1));
    }

    module.message_quit();
    done.recv_timeout(TIMEOUT).unwrap().unwrap();
    drop(window);
    module.finalize();
}

fn test_windows_created_while_loop_runs() {
    const CREATORS: usize = 4;
    const PER_CREATOR: usize = 8;
    let module = headless();
    let done = spawn_loop(&module);
    wait_for_state(&module, LoopState::Running);

    let creators: Vec<_> = (0..CREATORS)
        .map(|c| {
            let module = module.clone();
            thread::spawn(move || {
                (0..PER_CREATOR)
                    .map(|i| {
                        let title = format!("creator {c} window {i}");
                        Window::create(&module, Adapter::DEFAULT, &title, 320, 240, WindowFlags::empty())
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    //drain concurrently so the stream sees creation and dispatch interleave
    let mut seen: HashMap<_, HashSet<WindowEventId>> = HashMap::new();
    let mut windows = Vec::new();
    for creator in creators {
        while !creator.is_finished() {
            for event in module.event_stream().process() {
                seen.entry(event.window().id()).or_default().insert(event.id());
            }
            thread::sleep(Duration::from_millis(1));
        }
        windows.extend(creator.join().unwrap());
    }
    assert_eq!(windows.len(), CREATORS * PER_CREATOR);

    let start = std::time::Instant::now();
    loop {
        for event in module.event_stream().process() {
            seen.entry(event.window().id()).or_default().insert(event.id());
        }
        let shown = windows.iter().all(|w| {
            seen.get(&w.id())
                .is_some_and(|ids| ids.contains(&WindowEventId::Create) && ids.contains(&WindowEventId::Show))
        });
        if shown {
            break;
        }
        assert!(start.elapsed() < TIMEOUT, "not every window was created and shown");
        thread::sleep(Duration::from_millis(1));
    }

    module.message_quit();
    done.recv_timeout(TIMEOUT).unwrap().unwrap();
    for window in windows {
        window.destroy();
    }
    module.finalize();
}

fn test_terminate_quits_and_loop_restarts() {
    let module = headless();
    module.event_handle(AppEvent::Start);
    assert!(module.app_started());
    let done = spawn_loop(&module);
    wait_for_state(&module, LoopState::Running);
    module.event_handle(AppEvent::Terminate);
    done.recv_timeout(TIMEOUT).unwrap().unwrap();
    assert!(!module.app_started());

    let done = spawn_loop(&module);
    wait_for_state(&module, LoopState::Running);
    module.message_quit();
    done.recv_timeout(TIMEOUT).unwrap().unwrap();
    module.finalize();
}

fn test_finalize_stops_running_loop() {
    let module = headless();
    let done = spawn_loop(&module);
    wait_for_state(&module, LoopState::Running);
    module.finalize();
    done.recv_timeout(TIMEOUT).unwrap().unwrap();
}

fn main() {
    println!("=== message loop quit tests ===");
    let tests: [(&str, fn()); 7] = [
        ("quit_from_other_thread", test_quit_from_other_thread),
        ("quit_before_loop_is_latched", test_quit_before_loop_is_latched),
        ("second_loop_is_rejected", test_second_loop_is_rejected),
        ("loop_dispatches_window_events", test_loop_dispatches_window_events),
        ("windows_created_while_loop_runs", test_windows_created_while_loop_runs),
        ("terminate_quits_and_loop_restarts", test_terminate_quits_and_loop_restarts),
        ("finalize_stops_running_loop", test_finalize_stops_running_loop),
    ];
    for (name, test) in tests {
        println!("running {name}");
        test();
        println!("{name} ... ok");
    }
    println!("=== all message loop tests passed ===");
}
