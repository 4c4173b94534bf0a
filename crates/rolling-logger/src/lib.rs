//! Rolling Logger
//!
//! File logger with size-capped rotation and an in-memory circular buffer of
//! the most recent lines. Installs itself as the global `tracing` subscriber;
//! records emitted through the `log` facade are bridged in.

mod buffer;
mod file;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

pub use buffer::LogBuffer;
pub use file::RollingFile;

/// Default size of one log file before it is rotated
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;
/// Rotated files kept next to the active one
pub const DEFAULT_MAX_FILES: usize = 5;
/// Lines kept in memory
pub const DEFAULT_BUFFER_LINES: usize = 500;

#[derive(Debug)]
pub enum LoggerError {
    Io(io::Error),
    AlreadyInitialized,
    NotInitialized,
}

impl std::fmt::Display for LoggerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggerError::Io(e) => write!(f, "Log file error: {}", e),
            LoggerError::AlreadyInitialized => write!(f, "Logger already initialized"),
            LoggerError::NotInitialized => write!(f, "Logger not initialized"),
        }
    }
}

impl std::error::Error for LoggerError {}

impl From<io::Error> for LoggerError {
    fn from(e: io::Error) -> Self {
        LoggerError::Io(e)
    }
}

struct Sink {
    file: RollingFile,
    buffer: LogBuffer,
    /// Bytes of a line not yet terminated by '\n'
    partial: Vec<u8>,
}

/// Writer shared between the subscriber and the helper functions
#[derive(Clone)]
pub struct SharedSink {
    inner: Arc<Mutex<Sink>>,
}

impl SharedSink {
    pub fn new(file: RollingFile, buffer_lines: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Sink {
                file,
                buffer: LogBuffer::new(buffer_lines),
                partial: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sink> {
        // A panic while holding the lock only loses a log line
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Last `n` complete lines, oldest first
    pub fn recent(&self, n: usize) -> Vec<String> {
        self.lock().buffer.recent(n)
    }
}

pub struct SinkWriter<'a> {
    sink: MutexGuard<'a, Sink>,
}

impl Write for SinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let sink = &mut *self.sink;
        sink.file.write_all(buf)?;
        for &byte in buf {
            if byte == b'\n' {
                let line = String::from_utf8_lossy(&sink.partial).into_owned();
                sink.buffer.push(line);
                sink.partial.clear();
            } else {
                sink.partial.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.file.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedSink {
    type Writer = SinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter { sink: self.lock() }
    }
}

/// Local wall-clock timestamps with milliseconds
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

struct Logger {
    app_name: String,
    sink: SharedSink,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Initialize the global logger writing `<app_name>.log` under `log_dir`.
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), LoggerError> {
    init_logger_with(log_dir, app_name, LevelFilter::INFO)
}

/// Same as [`init_logger`] with an explicit maximum level.
pub fn init_logger_with(
    log_dir: PathBuf,
    app_name: &str,
    level: LevelFilter,
) -> Result<(), LoggerError> {
    if LOGGER.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    std::fs::create_dir_all(&log_dir)?;
    let file = RollingFile::open(log_dir, app_name, DEFAULT_MAX_BYTES, DEFAULT_MAX_FILES)?;
    let sink = SharedSink::new(file, DEFAULT_BUFFER_LINES);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(sink.clone())
        .with_ansi(false)
        .with_timer(LocalTime);
    // The console only sees warnings; the file and buffer keep everything
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_timer(LocalTime)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(level)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)?;
    log::set_max_level(log_level(level));

    LOGGER
        .set(Logger {
            app_name: app_name.to_string(),
            sink,
        })
        .map_err(|_| LoggerError::AlreadyInitialized)
}

/// Matching cap for records bridged in from the `log` facade
fn log_level(level: LevelFilter) -> log::LevelFilter {
    if level >= LevelFilter::TRACE {
        log::LevelFilter::Trace
    } else if level >= LevelFilter::DEBUG {
        log::LevelFilter::Debug
    } else if level >= LevelFilter::INFO {
        log::LevelFilter::Info
    } else if level >= LevelFilter::WARN {
        log::LevelFilter::Warn
    } else if level >= LevelFilter::ERROR {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Off
    }
}

fn logger() -> Result<&'static Logger, LoggerError> {
    LOGGER.get().ok_or(LoggerError::NotInitialized)
}

pub fn info(msg: &str) -> Result<(), LoggerError> {
    let logger = logger()?;
    tracing::info!(app = %logger.app_name, "{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), LoggerError> {
    let logger = logger()?;
    tracing::warn!(app = %logger.app_name, "{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), LoggerError> {
    let logger = logger()?;
    tracing::error!(app = %logger.app_name, "{}", msg);
    Ok(())
}

/// Most recent `n` lines written to the log file, oldest first.
pub fn recent_lines(n: usize) -> Vec<String> {
    match LOGGER.get() {
        Some(logger) => logger.sink.recent(n),
        None => Vec::new(),
    }
}
