//! Centralized logging for the ROM decoding and rendering pipeline.
//!
//! Library code never prints directly. Every diagnostic goes through [`log`],
//! which checks a per-category level (falling back to a global level), applies
//! a per-category rate limit, and only then evaluates the message closure.
//!
//! # Architecture
//!
//! - **LogConfig**: process-wide configuration stored in atomics
//! - **LogLevel**: Off < Error < Warn < Info < Debug < Trace
//! - **LogCategory**: Rom, Parser, Resolver, Cache, Render
//! - **log()**: the single entry point; output goes to stderr or, once
//!   [`LogConfig::set_log_file`] is called, to a background writer thread
//!
//! # Usage
//!
//! ```rust
//! use rom_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Resolver, LogLevel::Debug, || {
//!     format!("object {:#05X}: table entry at {:#06X}", 0x0F99, 0x8532)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Pipeline stage a message originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// ROM image loading and address translation
    Rom,
    /// Object record decoding and room stream parsing
    Parser,
    /// Pointer-table walks and tile resolution
    Resolver,
    /// Graphics sheet cache hits, misses, evictions
    Cache,
    /// Tile rasterization and batch rendering
    Render,
}

impl LogCategory {
    pub const ALL: [LogCategory; 5] = [
        LogCategory::Rom,
        LogCategory::Parser,
        LogCategory::Resolver,
        LogCategory::Cache,
        LogCategory::Render,
    ];

    fn index(self) -> usize {
        match self {
            LogCategory::Rom => 0,
            LogCategory::Parser => 1,
            LogCategory::Resolver => 2,
            LogCategory::Cache => 3,
            LogCategory::Render => 4,
        }
    }
}

const CATEGORY_COUNT: usize = LogCategory::ALL.len();

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct CategoryWindow {
    timestamps: VecDeque<Instant>,
    dropped: usize,
    last_drop_report: Option<Instant>,
}

/// Sliding-window rate limiter, one window per category.
struct RateLimiter {
    max_per_second: AtomicUsize,
    window: Duration,
    windows: Mutex<[CategoryWindow; CATEGORY_COUNT]>,
}

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second: AtomicUsize::new(max_per_second),
            window: Duration::from_secs(1),
            windows: Mutex::new(Default::default()),
        }
    }

    /// Returns (allowed, dropped) where dropped is Some(n) when a drop summary
    /// is due for this category.
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let mut windows = lock(&self.windows);
        let w = &mut windows[category.index()];

        while let Some(&front) = w.timestamps.front() {
            if now.duration_since(front) > self.window {
                w.timestamps.pop_front();
            } else {
                break;
            }
        }

        if w.timestamps.len() < self.max_per_second.load(Ordering::Relaxed) {
            w.timestamps.push_back(now);
            if w.dropped > 0 {
                let dropped = std::mem::take(&mut w.dropped);
                w.last_drop_report = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        w.dropped += 1;
        let report_due = w
            .last_drop_report
            .map_or(true, |last| now.duration_since(last) >= self.window);
        if report_due {
            let dropped = std::mem::take(&mut w.dropped);
            w.last_drop_report = Some(now);
            (false, Some(dropped))
        } else {
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; CATEGORY_COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// All levels Off, 60 messages per second per category.
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category-specific level wins when set; Off defers to the global level.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        match self.get_level(category) {
            LogLevel::Off => level <= self.get_global_level(),
            category_level => level <= category_level,
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .max_per_second
            .store(max_logs_per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_per_second.load(Ordering::Relaxed)
    }

    /// Route output to `path` through a background writer thread.
    ///
    /// Replaces any previously configured file; the old writer exits once its
    /// sender is dropped.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
            })?;

        *lock(&self.log_sender) = Some(sender);
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop file logging and return to stderr
    pub fn clear_log_file(&self) {
        *lock(&self.log_sender) = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, message: String) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            if let Some(sender) = lock(&self.log_sender).as_ref() {
                if let Err(unsent) = sender.send(message) {
                    eprintln!("{}", unsent.0);
                }
                return;
            }
        }
        eprintln!("{}", message);
    }
}

/// Log a message with the specified category and level.
///
/// The closure only runs when the category/level is enabled and the rate
/// limiter admits the message, so formatting costs nothing when logging is off.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped.filter(|&n| n > 0) {
        config.write_message(format!(
            "[{:?}] WARNING: Rate limit exceeded, {} log message(s) dropped in the last second",
            category, count
        ));
    }
    if allowed {
        config.write_message(format!("[{:?}] {}", category, message_fn()));
    }
}
