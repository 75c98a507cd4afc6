// Simbar Example
//
// Mirrors the Mac's virtual Touch Bar into a floating window and forwards
// clicks in the window back to the bar.
//
// Usage notes:
//
// The window server only talks to processes inside an app bundle, so this
// example uses the Trampoline feature of the fruitbasket crate to relaunch
// itself as one.  Grant the resulting app Screen Recording and Accessibility
// access in System Settings, then run:
//
// $ cargo run --example simulator
//
//
#[cfg(target_os = "macos")]
extern crate fruitbasket;
extern crate simbar;

#[macro_use]
extern crate log;

use std::time::Duration;

use simbar::{SimulatorConfig, SystemSignals};

/// Roughly one display refresh.
const TICK: Duration = Duration::from_millis(16);

#[cfg(target_os = "macos")]
fn main() -> Result<(), ()> {
    // Write log to home directory
    fruitbasket::create_logger(".simbar.log", fruitbasket::LogDir::Home, 5, 2)
        .map_err(|_| ())?;

    let mut nsapp = fruitbasket::Trampoline::new(
        "simbar",
        "simbar",
        "com.trevorbentley.simbar",
    )
    .version(env!("CARGO_PKG_VERSION"))
    .plist_key("LSUIElement", "1")
    .build(fruitbasket::InstallDir::Custom("target/".to_string()))
    .map_err(|_| ())?;
    nsapp.set_activation_policy(fruitbasket::ActivationPolicy::Accessory);

    let config = SimulatorConfig::new()
        .docking(simbar::Docking::Floating)
        .all_desktops(true);
    let mut sim = simbar::simulator("Touch Bar", config);
    if let Err(e) = sim.start() {
        error!("{}", e);
        return Err(());
    }
    let signals = SystemSignals::new();

    // Enter OS X application loop, a frame at a time.
    while nsapp.run(fruitbasket::RunPeriod::Time(TICK)).is_ok() {
        while let Some(signal) = signals.try_recv() {
            if let Err(e) = sim.handle_signal(signal) {
                error!("{}", e);
                return Err(());
            }
        }
        if let Some(simbar::Error::InjectionDenied) = sim.tick() {
            warn!("allow Accessibility access, then input will resume");
        }
        if sim.forwarder().is_suppressed() {
            sim.recheck_permission();
        }
    }
    sim.stop();
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn main() {
    simbar::logging::init_logger(None, log::LevelFilter::Info)
        .expect("logger");
    let mut sim = simbar::simulator("Touch Bar", SimulatorConfig::new());
    match sim.start() {
        Err(e) => info!("{}", e),
        Ok(()) => {
            let signals = SystemSignals::new();
            while let Some(signal) = signals.try_recv() {
                let _ = sim.handle_signal(signal);
            }
            std::thread::sleep(TICK);
            sim.tick();
        }
    }
}
