//! Centralized diagnostics for the display path.
//!
//! # Architecture
//!
//! - **LogConfig**: thread-safe global configuration using atomic operations
//! - **LogLevel**: hierarchical log levels (Off < Error < Warn < Info < Debug < Trace)
//! - **LogCategory**: Canvas lifecycle, Renderer backends, Gpu uploads, Palette changes
//! - **log()**: common logging function; messages are built lazily
//!
//! Several callers run once per emulated frame (or once per scanline), so every
//! category is rate limited. Messages go to the `log` facade under the target
//! `emu::<category>` unless a log file has been configured, in which case a
//! background thread appends them to the file.
//!
//! # Usage
//!
//! ```rust
//! use emu_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Canvas, LogLevel::Warn, || {
//!     format!("refresh rect {}x{} out of bounds", 10, 10)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

const CATEGORY_COUNT: usize = 4;

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

    /// Matching `log` crate level; `None` for `Off`.
    pub fn to_log_level(self) -> Option<log::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(log::Level::Error),
            LogLevel::Warn => Some(log::Level::Warn),
            LogLevel::Info => Some(log::Level::Info),
            LogLevel::Debug => Some(log::Level::Debug),
            LogLevel::Trace => Some(log::Level::Trace),
        }
    }
}

/// Log category for the display components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Canvas lifecycle: creation, resize, teardown, sequencing errors
    Canvas,
    /// Renderer backends: refresh bounds, composition, backend selection
    Renderer,
    /// GPU device: shader setup, texture lifecycle, uploads
    Gpu,
    /// Palette translation and color table installs
    Palette,
}

impl LogCategory {
    const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::Canvas,
        LogCategory::Renderer,
        LogCategory::Gpu,
        LogCategory::Palette,
    ];

    fn index(self) -> usize {
        match self {
            LogCategory::Canvas => 0,
            LogCategory::Renderer => 1,
            LogCategory::Gpu => 2,
            LogCategory::Palette => 3,
        }
    }

    /// Target string used with the `log` facade.
    pub fn target(self) -> &'static str {
        match self {
            LogCategory::Canvas => "emu::canvas",
            LogCategory::Renderer => "emu::renderer",
            LogCategory::Gpu => "emu::gpu",
            LogCategory::Palette => "emu::palette",
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding a logging lock must not take diagnostics down with it.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sliding-window rate limiter, one window per category.
struct RateLimiter {
    max_logs_per_second: AtomicUsize,
    window_duration: Duration,
    timestamps: Mutex<[VecDeque<Instant>; CATEGORY_COUNT]>,
    dropped_counts: Mutex<[usize; CATEGORY_COUNT]>,
    last_drop_report: Mutex<[Option<Instant>; CATEGORY_COUNT]>,
}

impl RateLimiter {
    fn new(max_logs_per_second: usize) -> Self {
        Self {
            max_logs_per_second: AtomicUsize::new(max_logs_per_second),
            window_duration: Duration::from_secs(1),
            timestamps: Mutex::new(Default::default()),
            dropped_counts: Mutex::new([0; CATEGORY_COUNT]),
            last_drop_report: Mutex::new([None; CATEGORY_COUNT]),
        }
    }

    fn set_max_logs_per_second(&self, max: usize) {
        self.max_logs_per_second.store(max, Ordering::Relaxed);
    }

    fn get_max_logs_per_second(&self) -> usize {
        self.max_logs_per_second.load(Ordering::Relaxed)
    }

    /// Returns (allowed, dropped_count) where dropped_count is Some(n) if drops should be reported
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let idx = category.index();

        let mut timestamps = lock(&self.timestamps);
        let mut dropped_counts = lock(&self.dropped_counts);
        let mut last_drop_report = lock(&self.last_drop_report);

        let window = &mut timestamps[idx];
        while let Some(&front) = window.front() {
            if now.duration_since(front) > self.window_duration {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < self.get_max_logs_per_second() {
            window.push_back(now);

            let dropped = dropped_counts[idx];
            if dropped > 0 {
                dropped_counts[idx] = 0;
                last_drop_report[idx] = Some(now);
                return (true, Some(dropped));
            }

            (true, None)
        } else {
            dropped_counts[idx] += 1;

            let should_report = match last_drop_report[idx] {
                None => true,
                Some(last) => now.duration_since(last) >= Duration::from_secs(1),
            };

            if should_report {
                let dropped = dropped_counts[idx];
                dropped_counts[idx] = 0;
                last_drop_report[idx] = Some(now);
                (false, Some(dropped))
            } else {
                (false, None)
            }
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
    /// Global level `Warn`, no category overrides, 60 logs/second per category
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Warn as u8),
            category_levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    /// Override the level for one category (`Off` removes the override)
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category override wins; otherwise the global level applies.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Restore the defaults: global `Warn`, no overrides
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Warn);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .set_max_logs_per_second(max_logs_per_second);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.get_max_logs_per_second()
    }

    /// Append log output to `path` from a background writer thread.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let mut file = file;
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
                let _ = file.flush();
            })?;

        *lock(&self.log_sender) = Some(sender);
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop logging to file; the writer thread exits once the sender drops
    pub fn clear_log_file(&self) {
        *lock(&self.log_sender) = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, category: LogCategory, level: LogLevel, message: &str) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            let log_sender = lock(&self.log_sender);
            if let Some(sender) = log_sender.as_ref() {
                let line = format!("[{}] {:?}: {}", category.target(), level, message);
                if sender.send(line).is_ok() {
                    return;
                }
            }
        }
        if let Some(level) = level.to_log_level() {
            log::log!(target: category.target(), level, "{}", message);
        }
    }
}

/// Log a message with the specified category and level
///
/// The closure only runs when the category/level is enabled and the rate
/// limiter lets the message through. When messages have been dropped a
/// summary warning is emitted first.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped_count) = config.rate_limiter.should_allow(category);

    if let Some(count) = dropped_count {
        if count > 0 {
            let warning = format!(
                "rate limit exceeded, {} log message(s) dropped in the last second",
                count
            );
            config.write_message(category, LogLevel::Warn, &warning);
        }
    }

    if allowed {
        let message = message_fn();
        config.write_message(category, level, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("ERR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("3"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("invalid"), None);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_default_level_shows_warnings() {
        let config = LogConfig::new();
        assert_eq!(config.get_global_level(), LogLevel::Warn);
        assert!(config.should_log(LogCategory::Renderer, LogLevel::Warn));
        assert!(!config.should_log(LogCategory::Renderer, LogLevel::Info));
        assert!(!config.should_log(LogCategory::Renderer, LogLevel::Off));
    }

    #[test]
    fn test_category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Gpu, LogLevel::Debug);

        assert!(config.should_log(LogCategory::Gpu, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::Canvas, LogLevel::Warn));
        assert!(config.should_log(LogCategory::Canvas, LogLevel::Error));
    }

    #[test]
    fn test_reset() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Palette, LogLevel::Debug);

        config.reset();

        assert_eq!(config.get_global_level(), LogLevel::Warn);
        assert_eq!(config.get_level(LogCategory::Palette), LogLevel::Off);
    }

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let limiter = RateLimiter::new(60);
        for _ in 0..60 {
            let (allowed, _) = limiter.should_allow(LogCategory::Renderer);
            assert!(allowed);
        }
        let (allowed, _) = limiter.should_allow(LogCategory::Renderer);
        assert!(!allowed, "Should block logs exceeding the rate limit");
    }

    #[test]
    fn test_rate_limiter_per_category() {
        let limiter = RateLimiter::new(5);
        for _ in 0..5 {
            limiter.should_allow(LogCategory::Renderer);
        }
        assert!(!limiter.should_allow(LogCategory::Renderer).0);
        assert!(limiter.should_allow(LogCategory::Gpu).0);
    }

    #[test]
    fn test_rate_limiter_reports_dropped_count() {
        let limiter = RateLimiter::new(5);
        for _ in 0..5 {
            limiter.should_allow(LogCategory::Canvas);
        }
        for _ in 0..10 {
            limiter.should_allow(LogCategory::Canvas);
        }

        std::thread::sleep(Duration::from_millis(1100));

        let (allowed, dropped) = limiter.should_allow(LogCategory::Canvas);
        assert!(allowed, "Should be allowed after window slides");
        // The first drop is reported immediately, so 9 or 10 remain.
        let dropped = dropped.unwrap_or(0);
        assert!((9..=10).contains(&dropped), "got {}", dropped);
    }

    #[test]
    fn test_category_targets_are_distinct() {
        let targets: std::collections::HashSet<_> =
            LogCategory::ALL.iter().map(|c| c.target()).collect();
        assert_eq!(targets.len(), CATEGORY_COUNT);
    }
}
