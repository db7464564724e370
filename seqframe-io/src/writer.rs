//! File writers for reduced results.

use crate::Result;
use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writer for 2-D result buffers such as a summed frame.
pub struct ResultFileWriter {
    writer: BufWriter<File>,
}

impl ResultFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes the buffer as CSV, one row per line.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_csv(&mut self, data: &Array2<f32>) -> Result<()> {
        for row in data.rows() {
            let line: Vec<String> = row.iter().map(ToString::to_string).collect();
            writeln!(self.writer, "{}", line.join(","))?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes the buffer as raw little-endian `f32` values in row-major order.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_binary(&mut self, data: &Array2<f32>) -> Result<()> {
        for value in data {
            self.writer.write_all(&value.to_le_bytes())?;
        }

        self.writer.flush()?;
        Ok(())
    }
}
