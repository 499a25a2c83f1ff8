use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// One newline-terminated record and the file position just past it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub next_offset: u64,
    /// Raw bytes including the trailing newline
    pub data: Vec<u8>,
}

/// Reads newline-delimited records from a file, starting at a byte offset.
///
/// Iteration ends when no further complete record is available; it never
/// waits for the writer. A trailing line without its newline is left unread
/// so a later reader picks it up once it is complete. The file handle is
/// released when the reader is dropped.
pub struct RecordReader {
    reader: BufReader<File>,
    offset: u64,
    done: bool,
}

impl RecordReader {
    /// Open `path` positioned at `offset`
    pub fn open(path: impl AsRef<Path>, offset: u64) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(file, offset)
    }

    /// Read from an already open handle
    pub fn from_file(mut file: File, offset: u64) -> io::Result<Self> {
        file.seek(SeekFrom::Start(offset))?;

        Ok(Self {
            reader: BufReader::new(file),
            offset,
            done: false,
        })
    }

    /// Position just past the last record returned
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn read_record(&mut self) -> io::Result<Option<Record>> {
        let mut data = Vec::new();
        let n = self.reader.read_until(b'\n', &mut data)?;

        if n == 0 || data.last() != Some(&b'\n') {
            // EOF, possibly in the middle of a line still being written
            return Ok(None);
        }

        self.offset += n as u64;
        Ok(Some(Record {
            next_offset: self.offset,
            data,
        }))
    }
}

impl Iterator for RecordReader {
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
