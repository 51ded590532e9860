//! Terminal output for the injector.
//!
//! Three kinds of output share stdout:
//!
//! - prefixed lines from [`log!`](crate::log) and [`debug!`](crate::debug),
//!   e.g. `[inject] loading live.tosc`
//! - the results table after a full pass ([`print_results`])
//! - one status block in watch mode that each save redraws ([`status_success`] etc.)
//!
//! ```ignore
//! log!("inject"; "{} scripts applied", count);
//! debug!("patch"; "found {} occurrences", n);
//! status_success("patched tag_knob.lua (2 nodes)");
//! ```

use std::fmt;
use std::io::{Write, stdout};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crossterm::cursor::MoveUp;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use owo_colors::OwoColorize;
use parking_lot::Mutex;

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enables `debug!` output (`--verbose` / `--debug`).
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

// ============================================================================
// Prefixed lines
// ============================================================================

/// `log!("module"; "fmt", args..)` prints `[module] message`.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {
        $crate::logger::emit($module, format_args!($($arg)*))
    };
}

/// Like `log!`, but silent unless verbose output is on.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {
        if $crate::logger::is_verbose() {
            $crate::logger::emit($module, format_args!($($arg)*))
        }
    };
}

pub fn emit(module: &str, message: fmt::Arguments<'_>) {
    let tag = tag(module);
    let mut out = stdout().lock();
    // A status line may still occupy the cursor row
    execute!(out, Clear(ClearType::UntilNewLine)).ok();
    writeln!(out, "{tag} {message}").ok();
    out.flush().ok();
}

/// `[module]`, colored by subsystem.
fn tag(module: &str) -> String {
    let tag = format!("[{module}]");
    if module.eq_ignore_ascii_case("inject") {
        tag.bright_blue().bold().to_string()
    } else if module.eq_ignore_ascii_case("watch") {
        tag.bright_green().bold().to_string()
    } else if module.eq_ignore_ascii_case("error") {
        tag.bright_red().bold().to_string()
    } else {
        tag.bright_yellow().bold().to_string()
    }
}

// ============================================================================
// Results table
// ============================================================================

/// One line per selector key: `• key - N injected`, `!` for orphans.
pub fn print_results(entries: &[(&str, usize)]) {
    let mut out = stdout().lock();
    for row in result_rows(entries) {
        writeln!(out, "{row}").ok();
    }
    out.flush().ok();
}

fn result_rows(entries: &[(&str, usize)]) -> Vec<String> {
    entries
        .iter()
        .map(|&(key, count)| {
            let row = format!("{key} - {count} injected");
            match count {
                0 => format!("{} {}", "!".red().bold(), row.red()),
                _ => format!("{} {row}", "•".green()),
            }
        })
        .collect()
}

// ============================================================================
// Watch status
// ============================================================================

/// `HH:MM:SS` in UTC.
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    let (h, m, s) = (secs / 3600 % 24, secs / 60 % 60, secs % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Applied,
    Failed,
    Quiet,
}

/// The block a script save leaves on screen.
///
/// Redrawing erases the previous block first, so a burst of saves shows as
/// one line rather than a scrolling log.
pub struct WatchStatus {
    /// Rows drawn by the last message, erased on the next redraw.
    drawn: usize,
}

static STATUS: LazyLock<Mutex<WatchStatus>> = LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    pub const fn new() -> Self {
        Self { drawn: 0 }
    }

    pub fn success(&mut self, message: &str) {
        self.redraw(Mark::Applied, message);
    }

    pub fn unchanged(&mut self, message: &str) {
        self.redraw(Mark::Quiet, message);
    }

    /// `detail` goes on the rows below `summary`.
    pub fn error(&mut self, summary: &str, detail: &str) {
        if detail.is_empty() {
            self.redraw(Mark::Failed, summary);
        } else {
            self.redraw(Mark::Failed, &format!("{summary}\n{detail}"));
        }
    }

    /// Keep the current block: the next message is drawn below it.
    pub fn detach(&mut self) {
        self.drawn = 0;
    }

    fn redraw(&mut self, mark: Mark, message: &str) {
        let mut out = stdout().lock();

        if self.drawn > 0 {
            let up = u16::try_from(self.drawn).unwrap_or(u16::MAX);
            execute!(out, MoveUp(up), Clear(ClearType::FromCursorDown)).ok();
        }

        let stamp = format!("[{}]", clock()).dimmed().to_string();
        match mark {
            Mark::Applied => writeln!(out, "{stamp} {} {message}", "✓".green()),
            Mark::Failed => writeln!(out, "{stamp} {} {message}", "✗".red()),
            Mark::Quiet => writeln!(out, "{stamp} {}", message.dimmed()),
        }
        .ok();
        out.flush().ok();

        self.drawn = rows(message);
    }
}

fn rows(message: &str) -> usize {
    message.lines().count().max(1)
}

pub fn status_success(message: &str) {
    STATUS.lock().success(message);
}

pub fn status_unchanged(message: &str) {
    STATUS.lock().unchanged(message);
}

pub fn status_error(summary: &str, detail: &str) {
    STATUS.lock().error(summary, detail);
}

pub fn status_detach() {
    STATUS.lock().detach();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        assert_eq!(rows(""), 1);
        assert_eq!(rows("patched A.lua"), 1);
        assert_eq!(rows("failed: A.lua\nfailed to read script"), 2);
    }

    #[test]
    fn test_detach_keeps_block() {
        let mut status = WatchStatus { drawn: 3 };
        status.detach();
        assert_eq!(status.drawn, 0);
        assert_eq!(WatchStatus::new().drawn, 0);
    }

    #[test]
    fn test_clock_format() {
        let time = clock();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
    }

    #[test]
    fn test_result_rows() {
        let table = result_rows(&[("_root", 1), ("name: ghost", 0), ("tag: knob", 2)]);
        assert_eq!(table.len(), 3);
        assert!(table[0].contains("_root - 1 injected"));
        assert!(table[0].contains('•'));
        assert!(table[1].contains('!'));
        assert!(table[1].contains("name: ghost"));
        assert!(table[2].contains("tag: knob - 2 injected"));
    }
}
