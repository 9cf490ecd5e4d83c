// src/devices/mod.rs
//! Host-side display devices used by the binary and tests in place of real
//! panels.

pub mod console;
pub mod headless;

pub use console::ConsoleDisplay;
pub use headless::HeadlessDisplay;
