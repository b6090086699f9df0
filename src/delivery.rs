use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

/// One capability: put the final text blob where the operator can
/// collect it. Keeping this behind a trait lets the extraction pipeline
/// stay pure and the tests substitute a capture target.
pub trait Sink {
    fn deliver(&mut self, text: &str) -> Result<()>;
}

/// System clipboard, the default target.
pub struct ClipboardSink;

impl Sink for ClipboardSink {
    fn deliver(&mut self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
        clipboard.set_text(text).context("clipboard write failed")?;
        Ok(())
    }
}

/// Prints the blob verbatim so stdout can be redirected.
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn deliver(&mut self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Writes the blob to the operator's collection file, either replacing
/// it or appending. The text is written verbatim, no trailing newline,
/// so splitting the file on the separator recovers the records exactly.
pub struct FileSink {
    pub path: PathBuf,
    pub append: bool,
}

impl Sink for FileSink {
    fn deliver(&mut self, text: &str) -> Result<()> {
        let mut options = OpenOptions::new();
        options.create(true);
        if self.append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

/// Try the primary sink; on failure print the framed blob so the data
/// survives the run even when the automatic copy does not. One fallback,
/// no retry. Returns whether the primary sink took the text.
pub fn deliver_or_print(primary: &mut dyn Sink, text: &str) -> bool {
    match primary.deliver(text) {
        Ok(()) => true,
        Err(e) => {
            warn!("delivery failed: {:#}", e);
            println!("Copy the text below manually:");
            println!("{}", "=".repeat(60));
            println!("{}", text);
            println!("{}", "=".repeat(60));
            false
        }
    }
}

// ── Tests ──
