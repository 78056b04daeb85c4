/*!
Creates a window, prints its events until the user closes it, then destroys it.

Pass `--headless` to run against the simulated window server, which closes the window on its own.
*/
use std::thread;
use std::time::Duration;

use window_bridge::event::WindowEventId;
use window_bridge::{Adapter, Backend, Window, WindowConfig, WindowFlags, WindowModule};

pub fn main() {
    let headless = std::env::args().any(|a| a == "--headless");
    let backend = if headless { Backend::Headless } else { Backend::Native };
    let module = WindowModule::new();
    if let Err(e) = module.initialize(WindowConfig::default().with_backend(backend)) {
        eprintln!("unable to initialize window module: {e}");
        std::process::exit(e.status_code());
    }

    let window = match Window::create(&module, Adapter::DEFAULT, "createdestroy", 800, 600, WindowFlags::empty()) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("unable to create window: {e}");
            module.finalize();
            std::process::exit(e.status_code());
        }
    };

    if let Some(server) = module.headless_server() {
        let _ = server.request_close(&window);
    }

    let consumer = module.clone();
    let printer = thread::Builder::new()
        .name("events".to_string())
        .spawn(move || {
            loop {
                for event in consumer.event_stream().process() {
                    println!("{:?} {:?}", event.window().id(), event.id());
                    if event.id() == WindowEventId::Close {
                        consumer.message_quit();
                        return;
                    }
                }
                thread::sleep(Duration::from_millis(16));
            }
        })
        .unwrap();

    if let Err(e) = module.message_loop() {
        eprintln!("message loop failed: {e}");
        module.message_quit();
    }
    let _ = printer.join();

    window.destroy();
    for event in module.event_stream().process() {
        println!("{:?} {:?}", event.window().id(), event.id());
    }
    module.finalize();
}
