use anyhow::{Context, Result, anyhow};
use std::io::BufRead;

/// Reads the line-based text formats, skipping `#` comment lines.
pub struct LineReader<'a> {
    reader: &'a mut dyn BufRead,
    line_no: usize,
    line: String,
}

impl<'a> LineReader<'a> {
    pub fn new(reader: &'a mut (dyn BufRead + 'a)) -> Self {
        LineReader::<'a> {
            reader,
            line_no: 0,
            line: String::new(),
        }
    }

    pub fn get_last_line_number(&self) -> usize {
        self.line_no
    }

    pub fn get_last_line(&self) -> &str {
        &self.line
    }

    /// Reads the next line; returns false at the end of the input.
    fn next_line_raw_option(&mut self) -> Result<bool> {
        self.line.clear();

        match self.reader.read_line(&mut self.line) {
            Ok(0) => Ok(false),
            Ok(_n) => {
                if self.line.ends_with('\n') {
                    self.line.pop();
                    if self.line.ends_with('\r') {
                        self.line.pop();
                    }
                }
                self.line_no += 1;
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn next_line_raw(&mut self) -> Result<()> {
        if self.next_line_raw_option()? {
            Ok(())
        } else {
            Err(anyhow!("premature end of file"))
        }
    }

    pub fn next_line(&mut self) -> Result<()> {
        self.next_line_raw()?;
        while self.get_last_line().trim_start().starts_with('#') {
            self.next_line_raw()?;
        }
        Ok(())
    }

    /// Like `next_line`, but returns false instead of an error when only comments, empty lines or nothing remains.
    pub fn next_line_option(&mut self) -> Result<bool> {
        loop {
            if !self.next_line_raw_option()? {
                return Ok(false);
            }
            let trimmed = self.get_last_line().trim_start();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                return Ok(true);
            }
        }
    }

    pub fn next_line_string(&mut self) -> Result<String> {
        self.next_line()?;
        Ok(self.get_last_line().to_string())
    }

    pub fn next_line_index(&mut self) -> Result<usize> {
        self.next_line()?;
        self.parse_last_line_index()
    }

    pub fn next_line_natural(&mut self) -> Result<u64> {
        self.next_line()?;
        self.get_last_line().trim().parse::<u64>().with_context(|| {
            format!(
                "failed to read integer at line {}; found `{}`",
                self.get_last_line_number(),
                self.get_last_line()
            )
        })
    }

    /// Reads a line of the form `<index> <index>`.
    pub fn next_line_index_pair(&mut self) -> Result<(usize, usize)> {
        self.next_line()?;
        let mut parts = self.get_last_line().split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) => {
                let a = a.parse::<usize>();
                let b = b.parse::<usize>();
                match (a, b) {
                    (Ok(a), Ok(b)) => Ok((a, b)),
                    _ => Err(anyhow!(
                        "failed to read pair of integers at line {}; found `{}`",
                        self.get_last_line_number(),
                        self.get_last_line()
                    )),
                }
            }
            _ => Err(anyhow!(
                "expected two integers separated by a space at line {}; found `{}`",
                self.get_last_line_number(),
                self.get_last_line()
            )),
        }
    }

    pub fn parse_last_line_index(&self) -> Result<usize> {
        self.get_last_line()
            .trim()
            .parse::<usize>()
            .with_context(|| {
                format!(
                    "failed to read integer at line {}; found `{}`",
                    self.get_last_line_number(),
                    self.get_last_line()
                )
            })
    }

    pub fn parse_last_line_natural(&self) -> Result<u64> {
        self.get_last_line().trim().parse::<u64>().with_context(|| {
            format!(
                "failed to read integer at line {}; found `{}`",
                self.get_last_line_number(),
                self.get_last_line()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::LineReader;

    #[test]
    fn line_reader_skips_comments() {
        let mut input = Cursor::new("# comment\n3\n# pair\n1 2\n");
        let mut reader = LineReader::new(&mut input);
        assert_eq!(reader.next_line_index().unwrap(), 3);
        assert_eq!(reader.next_line_index_pair().unwrap(), (1, 2));
        assert_eq!(reader.get_last_line_number(), 4);
        assert!(!reader.next_line_option().unwrap());
        assert!(reader.next_line().is_err());
    }

    #[test]
    fn line_reader_rejects_garbage() {
        let mut input = Cursor::new("x\n1 2 3\n");
        let mut reader = LineReader::new(&mut input);
        assert!(reader.next_line_index().is_err());
        assert!(reader.next_line_index_pair().is_err());
    }
}
