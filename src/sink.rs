// SPDX-License-Identifier: Apache-2.0

//! Destination for emitted records.

use std::io::Write;
use std::path::Path;

use crate::checkpoint::Checkpoint;
use crate::error::{Error, Result};

/// Receives every emitted record, once, in order.
///
/// A record counts as delivered once `handoff` returns `Ok`; the checkpoint
/// is advanced past it only after that.
pub trait Sink {
    /// `checkpoint` is the position the record was read from.
    fn handoff(&mut self, source: &Path, checkpoint: &Checkpoint, record: &[u8]) -> Result<()>;
}

/// Writes records to an output stream.
///
/// Plain mode writes the bytes exactly as read. Verbose mode prefixes each
/// record with its source path and checkpoint, tab separated.
pub struct WriterSink<W: Write> {
    writer: W,
    verbose: bool,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, verbose: bool) -> Self {
        Self { writer, verbose }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn handoff(&mut self, source: &Path, checkpoint: &Checkpoint, record: &[u8]) -> Result<()> {
        let written = if self.verbose {
            write!(self.writer, "{}\t{}\t", source.display(), checkpoint)
                .and_then(|_| self.writer.write_all(record))
        } else {
            self.writer.write_all(record)
        };

        written
            .and_then(|_| self.writer.flush())
            .map_err(|e| Error::Sink(format!("failed to write record: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Signature;
    use std::io;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_plain_output_is_unchanged() {
        let mut sink = WriterSink::new(Vec::new(), false);
        let cp = Checkpoint::default();

        sink.handoff(Path::new("app.log"), &cp, b"a\n").unwrap();
        sink.handoff(Path::new("app.log"), &cp, b"b\r\n").unwrap();

        assert_eq!(sink.into_inner(), b"a\nb\r\n");
    }

    #[test]
    fn test_verbose_output_includes_source() {
        let mut sink = WriterSink::new(Vec::new(), true);
        let cp = Checkpoint::new(
            Signature::from_prefix(b"a\n"),
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            0,
        );

        sink.handoff(Path::new("/var/log/app.log"), &cp, b"a\n").unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.starts_with("/var/log/app.log\t"));
        assert!(out.contains("2023-11-14T22:13:20"));
        assert!(out.ends_with(" 0\ta\n"));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut sink = WriterSink::new(BrokenPipe, false);
        let err = sink
            .handoff(Path::new("app.log"), &Checkpoint::default(), b"a\n")
            .unwrap_err();
        assert!(matches!(err, Error::Sink(_)));
    }
}
