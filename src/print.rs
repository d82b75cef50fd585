// SPDX-License-Identifier: MIT

//! Console output and the `log` backend.

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(not(test))]
extern "C" {
    fn pmu_console_write(buf: *const cty::c_char, len: cty::c_uint);
}

pub struct ConsoleWriter;

impl core::fmt::Write for ConsoleWriter {
    #[inline]
    fn write_str(&mut self, msg: &str) -> core::fmt::Result {
        write(msg)
    }
}

impl ConsoleWriter {
    #[inline]
    pub fn write_fmt(args: core::fmt::Arguments) -> core::fmt::Result {
        core::fmt::Write::write_fmt(&mut Self, args)
    }

    #[inline]
    pub fn write_str(msg: &str) -> core::fmt::Result {
        write(msg)
    }

    #[inline]
    pub fn write_nl() -> core::fmt::Result {
        write("\n")
    }
}

#[cfg(not(test))]
#[inline]
fn write(msg: &str) -> core::fmt::Result {
    unsafe { pmu_console_write(msg.as_ptr() as _, msg.len() as cty::c_uint) };
    Ok(())
}

#[cfg(test)]
fn write(msg: &str) -> core::fmt::Result {
    std::print!("{}", msg);
    Ok(())
}

#[macro_export]
macro_rules! println {
    () => { $crate::println!("") };
    ($($arg:tt)*) => {
        #[allow(unused_must_use)]
        {
            $crate::print::ConsoleWriter::write_fmt(format_args!($($arg)*));
            $crate::print::ConsoleWriter::write_nl();
        }
    };
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        #[allow(unused_must_use)]
        {
            $crate::print::ConsoleWriter::write_fmt(format_args!($($arg)*));
        }
    };
}

/// `log` sink writing one line per record to the firmware console.
pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = core::fmt::Write::write_fmt(
            &mut ConsoleWriter,
            format_args!(
                "[{}] {}: {}\n",
                record.level(),
                record.target(),
                record.args()
            ),
        );
    }

    fn flush(&self) {}
}

/// Installs the console logger. Calling it again only updates the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
