use anyhow::{Result, bail};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

/// Ask for the project path when stdin is a terminal.
///
/// An empty answer keeps `current`. Without a terminal `current` is returned
/// as is, and a missing path is an error.
pub fn project_path(current: Option<&Path>) -> Result<PathBuf> {
    if !io::stdin().is_terminal() {
        return match current {
            Some(path) => Ok(path.to_path_buf()),
            None => bail!("no project file given and stdin is not a terminal"),
        };
    }

    loop {
        match current {
            Some(path) => eprint!("Project file [{}]: ", path.display()),
            None => eprint!("Project file (.tosc): "),
        }
        io::stderr().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            bail!("stdin closed");
        }

        if let Some(path) = parse_answer(&input, current) {
            return Ok(path);
        }
    }
}

/// Trim whitespace and the quotes terminals add to dropped files.
fn parse_answer(input: &str, current: Option<&Path>) -> Option<PathBuf> {
    let answer = input.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if answer.is_empty() {
        current.map(Path::to_path_buf)
    } else {
        Some(PathBuf::from(answer))
    }
}
