use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Name used for `_source` when reading standard input
pub const STDIN_NAME: &str = "<stdin>";

/// A named line-oriented input
pub struct InputStream {
    name: String,
    reader: Box<dyn BufRead>,
}

impl InputStream {
    pub fn new(name: impl Into<String>, reader: impl BufRead + 'static) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(reader),
        }
    }

    /// Open a file by path, or standard input for `-`
    pub fn open(path: &Path) -> io::Result<Self> {
        if path.as_os_str() == "-" {
            return Ok(Self::new(STDIN_NAME, BufReader::new(io::stdin())));
        }

        let file = File::open(path)?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }

    pub fn stdin() -> Self {
        Self::new(STDIN_NAME, BufReader::new(io::stdin()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterate over the lines of the stream
    ///
    /// Invalid UTF-8 is replaced rather than rejected, and trailing `\r\n`
    /// or `\n` is stripped.
    pub fn lines(self) -> LossyLines {
        LossyLines {
            reader: self.reader,
            buf: Vec::new(),
        }
    }
}

pub struct LossyLines {
    reader: Box<dyn BufRead>,
    buf: Vec<u8>,
}

impl Iterator for LossyLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
