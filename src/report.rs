use colored::Colorize;
use std::fmt::Display;
use std::io::{self, Write};

/// Side channel for per-record and per-batch failures
///
/// Each report is one `error: <detail>` line, followed by the offending raw
/// content when there is any. Reports never stop the stream that produced them.
pub struct ErrorChannel<W: Write> {
    out: W,
    reported: usize,
}

impl<W: Write> ErrorChannel<W> {
    pub fn new(out: W) -> Self {
        Self { out, reported: 0 }
    }

    pub fn report(&mut self, detail: impl Display, raw: Option<&str>) -> io::Result<()> {
        self.reported += 1;
        writeln!(self.out, "{}: {}", "error".red().bold(), detail)?;
        if let Some(raw) = raw {
            writeln!(self.out, "{}", raw.dimmed())?;
        }
        Ok(())
    }

    /// Number of reports written so far
    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
