//! JNI side of `libtest_monotonic.so`, loaded by
//! `com.example.test_monotonic.MainActivity`.

mod error;
mod ffi;
pub mod session;

pub use error::Error;
pub use ffi::*;

pub const GREETING: &str = "Hello from Rust";

/// Routes `tracing` events to logcat. Safe to call from every entry point.
#[cfg(target_os = "android")]
pub fn init_logging() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("TestMonotonic"),
    );
}

#[cfg(not(target_os = "android"))]
pub const fn init_logging() {}
