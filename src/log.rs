//! Leveled diagnostics.
//!
//! With the `esp32-log` feature every line goes to `esp_println`. Without it
//! the macros compile to nothing, but arguments are still type-checked.

#[cfg(feature = "esp32-log")]
macro_rules! emit {
    ($level:literal, $($arg:tt)+) => {
        esp_println::println!("[{}] {}", $level, format_args!($($arg)+))
    };
}

#[cfg(not(feature = "esp32-log"))]
macro_rules! emit {
    ($level:literal, $($arg:tt)+) => {{
        let _ = format_args!($($arg)+);
    }};
}

macro_rules! debug {
    ($($arg:tt)+) => {
        $crate::log::emit!("DEBUG", $($arg)+)
    };
}

macro_rules! info {
    ($($arg:tt)+) => {
        $crate::log::emit!("INFO", $($arg)+)
    };
}

macro_rules! warn {
    ($($arg:tt)+) => {
        $crate::log::emit!("WARN", $($arg)+)
    };
}

macro_rules! error {
    ($($arg:tt)+) => {
        $crate::log::emit!("ERROR", $($arg)+)
    };
}

pub(crate) use emit;
