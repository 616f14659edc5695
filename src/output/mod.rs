//! Output module for collected content, link snapshots and reports
//!
//! This module handles:
//! - Appending collected items to line-per-item text files
//! - Writing link snapshots that replace the previous snapshot
//! - Building per-job and fleet-wide collection reports

mod report;

pub use report::{CollectorShare, FleetReport, JobReport};

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Appends items to a file, one per line, creating the file if absent
///
/// Existing content is never truncated, so repeated flushes and separate
/// runs of the same collector accumulate in one file.
///
/// # Arguments
///
/// * `path` - File to append to
/// * `items` - Lines to write (without trailing newlines)
///
/// # Returns
///
/// * `Ok(())` - All lines were written and flushed
/// * `Err(std::io::Error)` - The file could not be opened or written
pub fn append_lines<I, S>(path: &Path, items: I) -> std::io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    write_lines(file, items)
}

/// Writes a snapshot of items to a file, one per line, replacing its content
pub fn write_snapshot<I, S>(path: &Path, items: I) -> std::io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let file = File::create(path)?;
    write_lines(file, items)
}

fn write_lines<I, S>(file: File, items: I) -> std::io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut writer = BufWriter::new(file);
    for item in items {
        writer.write_all(item.as_ref().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}
