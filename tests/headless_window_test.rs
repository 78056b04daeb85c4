//SPDX-License-Identifier: MPL-2.0

//! Window lifecycle scenarios against the headless window server.
//!
//! Run with: `cargo test --test headless_window_test`

use window_bridge::event::{Event, NativePayload, WindowEventId};
use window_bridge::{
    Adapter, Backend, NativeHandle, NativeSignal, ServerEventKind, Size, Window, WindowConfig,
    WindowError, WindowFlags, WindowModule,
};

use WindowEventId::*;

fn module() -> WindowModule {
    let module = WindowModule::new();
    module
        .initialize(WindowConfig::default().with_backend(Backend::Headless))
        .unwrap();
    module
}

fn window(module: &WindowModule, width: u32, height: u32) -> Window {
    Window::create(module, Adapter::DEFAULT, "test", width, height, WindowFlags::empty()).unwrap()
}

fn drain(module: &WindowModule) -> Vec<Event> {
    module.event_stream().process().collect()
}

/// Processes native events, then returns the ids of the non-native events produced.
fn step(module: &WindowModule) -> Vec<WindowEventId> {
    module.event_process().unwrap();
    drain(module)
        .into_iter()
        .map(|e| e.id())
        .filter(|id| *id != Native)
        .collect()
}

fn server_kind(event: &Event) -> Option<ServerEventKind> {
    match event.native() {
        Some(NativePayload::Headless(e)) => Some(e.kind),
        _ => None,
    }
}

#[test]
fn create_then_destroy_reports_each_once() {
    let module = module();
    let w = Window::create(&module, Adapter::DEFAULT, "test", 320, 200, WindowFlags::NO_SHOW).unwrap();
    let id = w.id();
    w.destroy();
    let events = drain(&module);
    let ids: Vec<_> = events.iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec![Create, Destroy]);
    assert!(events.iter().all(|e| e.window().id() == id));
    module.event_process().unwrap();
    assert!(drain(&module).is_empty());
    module.finalize();
}

#[test]
fn new_window_is_shown_painted_and_focused() {
    let module = module();
    let w = window(&module, 800, 600);
    module.event_process().unwrap();
    let events = drain(&module);

    let ids: Vec<_> = events.iter().map(|e| e.id()).collect();
    assert_eq!(
        ids,
        vec![Create, Native, Show, Redraw, Native, GotFocus, Native]
    );
    let kinds: Vec<_> = events.iter().filter_map(server_kind).collect();
    assert_eq!(
        kinds,
        vec![ServerEventKind::Map, ServerEventKind::FocusIn, ServerEventKind::Expose]
    );

    assert_eq!(w.size().unwrap(), Size::new(800, 600));
    assert!(w.is_visible().unwrap());
    assert!(w.has_focus().unwrap());
    assert!(!w.is_maximized().unwrap());
    drop(w);
    module.finalize();
}

#[test]
fn resize_burst_collapses_to_one_resize_and_redraw() {
    let module = module();
    let w = window(&module, 800, 600);
    step(&module);

    for width in 400..420 {
        w.resize(width, 300).unwrap();
    }
    assert_eq!(step(&module), vec![Resize, Redraw]);
    assert_eq!(w.size().unwrap(), Size::new(419, 300));

    w.resize(640, 480).unwrap();
    assert_eq!(step(&module), vec![Resize, Redraw]);
    assert!(step(&module).is_empty());
    module.finalize();
}

#[test]
fn resize_rejects_empty_size() {
    let module = module();
    let w = window(&module, 800, 600);
    assert!(matches!(w.resize(0, 10), Err(WindowError::InvalidArgument(_))));
    assert!(matches!(
        Window::create(&module, Adapter::DEFAULT, "empty", 0, 0, WindowFlags::empty()),
        Err(WindowError::InvalidArgument(_))
    ));
    module.finalize();
}

#[test]
fn move_reports_move_once_per_generation() {
    let module = module();
    let w = window(&module, 800, 600);
    step(&module);
    w.move_to(10, 20).unwrap();
    w.move_to(30, 40).unwrap();
    //a server configure invalidates size and contents together
    assert_eq!(step(&module), vec![Resize, Redraw]);
    assert_eq!(w.position_x().unwrap(), 30);
    assert_eq!(w.position_y().unwrap(), 40);

    w.deliver(NativeSignal::Moved, None);
    w.deliver(NativeSignal::Moved, None);
    assert_eq!(step(&module), vec![Move]);
    module.finalize();
}

#[test]
fn events_are_delivered_in_post_order() {
    let module = module();
    let a = Window::create(&module, Adapter::DEFAULT, "a", 100, 100, WindowFlags::NO_SHOW).unwrap();
    let b = Window::create(&module, Adapter::DEFAULT, "b", 100, 100, WindowFlags::NO_SHOW).unwrap();
    drain(&module);

    module.event_post(Redraw, &a);
    module.event_post(Move, &b);
    module.event_post(Close, &a);
    let events = drain(&module);
    let seen: Vec<_> = events
        .iter()
        .map(|e| (e.id(), e.window().refers_to(&a)))
        .collect();
    assert_eq!(seen, vec![(Redraw, true), (Move, false), (Close, true)]);
    assert!(drain(&module).is_empty());
    module.finalize();
}

#[test]
fn events_outlive_their_window() {
    let module = module();
    let w = window(&module, 200, 200);
    let id = w.id();
    drop(w);
    let events = drain(&module);
    assert_eq!(events.first().map(|e| e.id()), Some(Create));
    assert_eq!(events.last().map(|e| e.id()), Some(Destroy));
    for event in &events {
        assert_eq!(event.window().id(), id);
        assert!(!event.window().is_alive());
    }
    module.finalize();
}

#[test]
fn window_outlives_module_finalize() {
    let module = module();
    let w = window(&module, 200, 200);
    let events_ref = w.window_ref();
    assert!(events_ref.is_alive());
    module.finalize();
    // finalizing the module leaves the window object valid
    assert!(w.is_open());
    drop(w);
    assert!(!events_ref.is_alive());
}

#[test]
fn maximize_and_restore() {
    let module = module();
    let w = window(&module, 800, 600);
    step(&module);

    w.maximize().unwrap();
    assert_eq!(step(&module), vec![Resize, Redraw]);
    assert!(w.is_maximized().unwrap());
    assert_eq!(w.size().unwrap(), module.screen_size(Adapter::DEFAULT).unwrap());

    w.maximize().unwrap();
    assert!(step(&module).is_empty());

    w.restore().unwrap();
    assert_eq!(step(&module), vec![Resize, Redraw]);
    assert!(!w.is_maximized().unwrap());
    assert_eq!(w.size().unwrap(), Size::new(800, 600));
    module.finalize();
}

#[test]
fn minimize_hides_and_restore_shows() {
    let module = module();
    let w = window(&module, 800, 600);
    step(&module);

    w.minimize().unwrap();
    assert_eq!(step(&module), vec![Hide, LostFocus]);
    assert!(w.is_minimized().unwrap());
    assert!(!w.is_visible().unwrap());
    assert!(!w.has_focus().unwrap());

    w.restore().unwrap();
    assert_eq!(step(&module), vec![Show, Redraw, GotFocus]);
    assert!(!w.is_minimized().unwrap());
    module.finalize();
}

#[test]
fn no_show_window_stays_hidden_until_restored() {
    let module = module();
    let w = Window::create(&module, Adapter::DEFAULT, "hidden", 640, 480, WindowFlags::NO_SHOW).unwrap();
    assert_eq!(step(&module), vec![Create]);
    assert!(!w.is_visible().unwrap());

    w.restore().unwrap();
    assert_eq!(step(&module), vec![Show, Redraw, GotFocus]);
    module.finalize();
}

#[test]
fn fullscreen_window_covers_the_screen() {
    let module = WindowModule::new();
    module
        .initialize(
            WindowConfig::default()
                .with_backend(Backend::Headless)
                .with_headless_screen(Size::new(1280, 720)),
        )
        .unwrap();
    let w = Window::create(&module, Adapter::DEFAULT, "full", 300, 200, WindowFlags::FULLSCREEN).unwrap();
    assert_eq!(w.size().unwrap(), Size::new(1280, 720));
    assert_eq!(module.screen_width(Adapter::DEFAULT).unwrap(), 1280);
    assert_eq!(module.screen_height(Adapter::index(0)).unwrap(), 720);
    assert!(module.screen_size(Adapter::index(3)).is_err());
    module.finalize();
}

#[test]
fn oversized_window_is_fitted_to_screen() {
    let module = module();
    let w = window(&module, 4000, 1000);
    assert_eq!(w.size().unwrap(), Size::new(1920, 480));

    w.move_to(1800, 900).unwrap();
    w.fit_to_screen().unwrap();
    let position = w.position().unwrap();
    assert_eq!(position.x(), 0);
    assert_eq!(position.y(), 600);
    module.finalize();
}

#[test]
fn close_request_does_not_destroy() {
    let module = module();
    let w = window(&module, 800, 600);
    step(&module);
    let server = module.headless_server().unwrap();

    server.request_close(&w).unwrap();
    server.request_close(&w).unwrap();
    assert_eq!(step(&module), vec![Close, Close]);
    assert!(w.is_open());
    w.destroy();
    assert_eq!(step(&module), vec![Destroy]);
    module.finalize();
}

#[test]
fn obscure_and_reveal() {
    let module = module();
    let w = window(&module, 800, 600);
    step(&module);
    let server = module.headless_server().unwrap();

    server.obscure(&w).unwrap();
    server.obscure(&w).unwrap();
    assert_eq!(step(&module), vec![Hide]);

    server.reveal(&w).unwrap();
    server.expose(&w).unwrap();
    assert_eq!(step(&module), vec![Show, Redraw]);

    server.expose(&w).unwrap();
    server.expose(&w).unwrap();
    assert_eq!(step(&module), vec![Redraw]);
    module.finalize();
}

#[test]
fn focus_moves_between_windows() {
    let module = module();
    let a = window(&module, 300, 300);
    let b = window(&module, 300, 300);
    module.event_process().unwrap();
    let events = drain(&module);
    let focus: Vec<_> = events
        .iter()
        .filter(|e| matches!(e.id(), GotFocus | LostFocus))
        .map(|e| (e.id(), e.window().refers_to(&a)))
        .collect();
    assert_eq!(
        focus,
        vec![(GotFocus, true), (LostFocus, true), (GotFocus, false)]
    );
    assert!(b.has_focus().unwrap());
    assert!(!a.has_focus().unwrap());

    let server = module.headless_server().unwrap();
    server.set_focus(None);
    assert_eq!(step(&module), vec![LostFocus]);
    server.set_focus(Some(&a));
    assert_eq!(step(&module), vec![GotFocus]);
    module.finalize();
}

#[test]
fn wrapped_window_is_released_not_destroyed() {
    let module = module();
    let server = module.headless_server().unwrap();
    let foreign = server.create_foreign("host", 640, 480);

    let w = Window::wrap(&module, NativeHandle::Headless { window: foreign }).unwrap();
    assert!(!w.is_created());
    assert_eq!(w.size().unwrap(), Size::new(640, 480));
    w.set_title("renamed").unwrap();
    assert_eq!(server.title(&w).unwrap(), "renamed");

    w.deliver(NativeSignal::Destroyed, Some(vec![1, 2, 3]));
    let events = drain(&module);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id(), Native);

    drop(w);
    assert!(drain(&module).is_empty());
    assert!(server.exists(foreign));
    assert!(matches!(
        Window::wrap(&module, NativeHandle::Headless { window: foreign + 1_000_000 }),
        Err(WindowError::InvalidWindow)
    ));
    module.finalize();
}

#[test]
fn cursor_state_is_tracked() {
    let module = module();
    let w = window(&module, 800, 600);
    let server = module.headless_server().unwrap();

    w.show_cursor(false, true).unwrap();
    assert!(server.is_cursor_hidden(&w).unwrap());
    assert!(w.is_cursor_locked().unwrap());
    w.set_cursor_pos(12, 34).unwrap();
    assert_eq!(server.cursor_position(&w).unwrap().x(), 12);
    w.show_cursor(true, false).unwrap();
    assert!(!w.is_cursor_locked().unwrap());
    module.finalize();
}

#[test]
fn module_can_be_initialized_again() {
    let module = module();
    let w = window(&module, 100, 100);
    module.finalize();
    assert_eq!(module.event_process(), Err(WindowError::NotInitialized));
    assert!(drain(&module).is_empty());
    drop(w);

    module
        .initialize(WindowConfig::default().with_backend(Backend::Headless))
        .unwrap();
    let w = window(&module, 100, 100);
    assert_eq!(step(&module), vec![Create, Show, Redraw, GotFocus]);
    drop(w);
    module.finalize();
}

#[test]
fn stream_drops_events_past_its_bound() {
    let module = WindowModule::new();
    module
        .initialize(
            WindowConfig::default()
                .with_backend(Backend::Headless)
                .with_max_pending_events(4),
        )
        .unwrap();
    let w = Window::create(&module, Adapter::DEFAULT, "bounded", 100, 100, WindowFlags::NO_SHOW).unwrap();
    for _ in 0..10 {
        module.event_post(Redraw, &w);
    }
    assert_eq!(drain(&module).len(), 4);
    assert_eq!(module.event_stream().dropped(), 7);
    module.finalize();
}

#[test]
fn live_resize_holds_size_changes() {
    let module = module();
    let w = window(&module, 800, 600);
    step(&module);

    w.deliver(NativeSignal::LiveResizeStarted, None);
    w.deliver(NativeSignal::Resized, None);
    w.deliver(NativeSignal::Moved, None);
    assert!(step(&module).is_empty());

    w.deliver(NativeSignal::LiveResizeEnded, None);
    assert_eq!(step(&module), vec![Move, Resize]);
    module.finalize();
}
