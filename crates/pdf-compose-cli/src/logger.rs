use chrono::{Days, Local, NaiveDate};
use log::{Level, LevelFilter, Metadata, Record};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const FILE_PREFIX: &str = "img2pdf-";
const FILE_SUFFIX: &str = ".log";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of daily log files kept, today's included
pub const RETAINED_DAYS: u64 = 7;

/// Number of records kept in memory
pub const HISTORY_LEN: usize = 100;

struct OpenLog {
    date: NaiveDate,
    file: File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

/// Most recent log records, shared between the installed logger and the app
#[derive(Debug, Clone)]
pub struct LogHistory {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    max_entries: usize,
}

impl LogHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(max_entries))),
            max_entries,
        }
    }

    /// The most recent record, for the final status line
    pub fn latest(&self) -> Option<LogEntry> {
        self.lock().back().cloned()
    }

    #[cfg(test)]
    fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    fn push(&self, entry: LogEntry) {
        let mut entries = self.lock();
        entries.push_back(entry);
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Logger writing one file per day into a directory, pruning old days
pub struct RollingFileLogger {
    dir: PathBuf,
    level: LevelFilter,
    echo_stderr: bool,
    current: Mutex<Option<OpenLog>>,
    history: LogHistory,
}

impl RollingFileLogger {
    pub fn new(dir: impl Into<PathBuf>, level: LevelFilter) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            level,
            echo_stderr: false,
            current: Mutex::new(None),
            history: LogHistory::new(HISTORY_LEN),
        })
    }

    /// Handle to the in-memory records, still usable after `init`
    pub fn history(&self) -> LogHistory {
        self.history.clone()
    }

    /// Also print records to stderr
    pub fn with_stderr(mut self, echo: bool) -> Self {
        self.echo_stderr = echo;
        self
    }

    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }

    /// Path of the log file for `date`
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(log_file_name(date))
    }

    fn open(&self, date: NaiveDate) -> io::Result<File> {
        if let Err(e) = prune_old_logs(&self.dir, date) {
            eprintln!("Failed to prune old logs in {}: {}", self.dir.display(), e);
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(date))
    }
}

/// Three-letter level tag used in log lines
pub fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERR",
        Level::Warn => "WRN",
        Level::Info => "INF",
        Level::Debug => "DBG",
        Level::Trace => "TRC",
    }
}

fn log_file_name(date: NaiveDate) -> String {
    format!("{}{}{}", FILE_PREFIX, date.format(DATE_FORMAT), FILE_SUFFIX)
}

fn parse_log_date(file_name: &str) -> Option<NaiveDate> {
    let date = file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// Delete log files older than the retention window ending at `today`.
///
/// Returns the number of files removed.
pub fn prune_old_logs(dir: &Path, today: NaiveDate) -> io::Result<usize> {
    let Some(oldest_kept) = today.checked_sub_days(Days::new(RETAINED_DAYS - 1)) else {
        return Ok(0);
    };

    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(date) = name.to_str().and_then(parse_log_date) else {
            continue;
        };
        if date < oldest_kept {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

impl log::Log for RollingFileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = Local::now();
        let message = record.args().to_string();
        let line = format!(
            "{} [{}] {}: {}\n",
            now.format("%Y-%m-%d %H:%M:%S%.3f"),
            level_tag(record.level()),
            record.target(),
            message
        );

        self.history.push(LogEntry {
            level: record.level(),
            message,
        });

        if self.echo_stderr {
            eprint!("{}", line);
        }

        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let today = now.date_naive();

        // Roll over on the first record of a new day
        if current.as_ref().is_none_or(|log| log.date != today) {
            match self.open(today) {
                Ok(file) => *current = Some(OpenLog { date: today, file }),
                Err(e) => {
                    eprintln!("Failed to open log file in {}: {}", self.dir.display(), e);
                    *current = None;
                    return;
                }
            }
        }

        if let Some(log) = current.as_mut() {
            let _ = log.file.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Some(log) = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_mut()
        {
            let _ = log.file.flush();
        }
    }
}
