//! Plain-text label files, one integer per line in point order

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use yass3d_core::{Error, Label, Result};

pub fn save_labels<P: AsRef<Path>>(labels: &[Label], path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for label in labels {
        writeln!(writer, "{}", label)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a file written by [`save_labels`]; blank lines are ignored
pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<Label>> {
    let reader = BufReader::new(File::open(path)?);
    let mut labels = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let label = text
            .parse()
            .map_err(|_| Error::InvalidData(format!("line {}: invalid label '{}'", number + 1, text)))?;
        labels.push(label);
    }
    Ok(labels)
}
