use std::io::{self, Read, Write};

/// Default read size when filling from a reader without an explicit limit.
const DEFAULT_FILL: usize = 4 * 1024;

/// A resizable buffer with separate read and write cursors, used for all
/// per-connection I/O: it accumulates request bytes while reading and holds
/// the pending portion of the response while writing.
pub struct Buffer {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl Buffer {
    /// Create a new buffer with the specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Read up to `max` bytes from a reader into the buffer
    pub fn fill_from<R: Read>(&mut self, reader: &mut R, max: usize) -> io::Result<usize> {
        self.ensure_capacity(max);

        let end = (self.write_pos + max).min(self.data.len());
        let bytes_read = reader.read(&mut self.data[self.write_pos..end])?;
        self.write_pos += bytes_read;

        Ok(bytes_read)
    }

    /// Read data from a reader into the buffer
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        self.fill_from(reader, DEFAULT_FILL)
    }

    /// Write pending data from the buffer to a writer, advancing the read
    /// cursor by however much the writer accepted
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        if self.available_data() == 0 {
            return Ok(0);
        }

        let bytes_written = writer.write(&self.data[self.read_pos..self.write_pos])?;
        self.read_pos += bytes_written;

        if self.read_pos == self.write_pos {
            self.reset();
        }

        Ok(bytes_written)
    }

    /// Append a slice of data to the buffer
    pub fn write(&mut self, data: &[u8]) {
        self.ensure_capacity(data.len());
        self.data[self.write_pos..self.write_pos + data.len()].copy_from_slice(data);
        self.write_pos += data.len();
    }

    /// Ensure the buffer has at least the specified additional capacity,
    /// compacting consumed bytes to the front before growing
    pub fn ensure_capacity(&mut self, additional: usize) {
        if self.data.len() - self.write_pos >= additional {
            return;
        }

        if self.read_pos > 0 {
            self.data.copy_within(self.read_pos..self.write_pos, 0);
            self.write_pos -= self.read_pos;
            self.read_pos = 0;
        }

        let available = self.data.len() - self.write_pos;
        if available < additional {
            let new_capacity = (self.data.len() + additional).max(self.data.len() * 2);
            self.data.resize(new_capacity, 0);
        }
    }

    /// Reset the buffer, discarding all pending data
    pub fn reset(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Get the amount of data available to read
    pub fn available_data(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Get the remaining capacity before the buffer has to grow
    pub fn remaining_capacity(&self) -> usize {
        self.data.len() - self.write_pos
    }

    /// Get the total capacity of the buffer
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Get a slice of the pending data
    pub fn slice(&self) -> &[u8] {
        &self.data[self.read_pos..self.write_pos]
    }
}
