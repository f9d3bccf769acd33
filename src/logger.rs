//! Session logger — writes all log output to a single file in the OS data directory.
//!
//! The file is **truncated (overwritten) at each launch**, so it only ever
//! contains output from the most-recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\Pixmark\pixmark.log`
//!   Linux:    `~/.local/share/Pixmark/pixmark.log`
//!   macOS:    `~/Library/Application Support/Pixmark/pixmark.log`
//!
//! Usage — anywhere in the crate use the `log_info!` / `log_warn!` / `log_err!`
//! macros.  A host embedding the library can additionally install a
//! diagnostic sink with [`set_diagnostic_sink`]; every logged line is forwarded
//! to it.  Until [`init`] runs, nothing is written to disk, so library users
//! and tests that never call it only see the sink.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static SINK: RwLock<Option<Arc<DiagnosticSink>>> = RwLock::new(None);
static SINK_FAILURE_REPORTED: AtomicBool = AtomicBool::new(false);

/// Host callback receiving `(level, source, message)` for every log line.
pub type DiagnosticSink = dyn Fn(Level, &str, &str) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Install (or with `None`, remove) the host diagnostic sink.
pub fn set_diagnostic_sink(sink: Option<Box<DiagnosticSink>>) {
    let sink = sink.map(Arc::from);
    match SINK.write() {
        Ok(mut slot) => *slot = sink,
        Err(poisoned) => *poisoned.into_inner() = sink,
    }
    SINK_FAILURE_REPORTED.store(false, Ordering::Relaxed);
}

/// Write a line to the session log.  Silently ignores I/O errors so that
/// logging never crashes the application.
pub fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Write a timestamped, level-tagged line to the session log and forward it
/// to the diagnostic sink.
pub fn write(level: Level, source: &str, msg: &str) {
    write_line(&format!("[{}] [{}] {}", timestamp(), level.tag(), msg));
    forward_to_sink(level, source, msg);
}

fn forward_to_sink(level: Level, source: &str, msg: &str) {
    let sink = match SINK.read() {
        Ok(slot) => slot.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    let Some(sink) = sink else { return };

    // The sink is host code: a panic in it must not unwind into the editor.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink(level, source, msg)));
    if outcome.is_err() && !SINK_FAILURE_REPORTED.swap(true, Ordering::Relaxed) {
        eprintln!("[logger] diagnostic sink panicked; further sink failures are suppressed");
        write_line(&format!("[{}] [WARN] diagnostic sink panicked", timestamp()));
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, module_path!(), &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, module_path!(), &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, module_path!(), &format!($($arg)*));
    };
}

/// Initialise the session logger.  Call once from the binary before any logging.
///
/// * Creates (or truncates) the log file.
/// * Installs a panic hook that writes the panic message to the log before
///   propagating to the default handler.
pub fn init() {
    let path = log_file_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);

    match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            // Can't open log file — not fatal, just skip
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    }

    write_line(&format!(
        "=== Pixmark session started {} ===",
        human_timestamp()
    ));
    write_line(&format!("Log file: {}", path.display()));
    write_line("");

    let prev = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
}

fn log_file_path() -> PathBuf {
    data_dir().join("Pixmark").join("pixmark.log")
}

/// Platform data directory (without the app sub-folder).
pub(crate) fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

/// HH:MM:SS within the current UTC day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            let h = (secs % 86400) / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            format!("{:02}:{:02}:{:02}", h, m, s)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}
