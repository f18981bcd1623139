// FILE: src/core/scanner.rs
//! Cursor scanner for KEGML node content.
//!
//! A `Scanner` is created fresh for every parse. Tentative branches take a
//! `Mark` before consuming anything and `revert` to it on failure, so a
//! failed attempt leaves the cursor exactly where the caller left it.

/// Longest title a heading may carry, in characters.
pub const MAX_TITLE_CHARS: usize = 70;

/// Saved cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    buf: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(buf: &'a str) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn mark(&self) -> Mark {
        Mark(self.pos)
    }

    pub fn revert(&mut self, mark: Mark) {
        self.pos = mark.0;
    }

    pub fn peek(&self) -> Option<char> {
        self.buf[self.pos..].chars().next()
    }

    /// Consumes and returns the next character.
    pub fn scan(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &'a str {
        &self.buf[self.pos..]
    }

    /// Skips lines that are empty or hold only spaces, tabs and carriage
    /// returns. Stops at the start of the first line with other content.
    pub fn skip_blank_lines(&mut self) {
        loop {
            let line_start = self.mark();
            while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
                self.scan();
            }
            match self.peek() {
                Some('\n') => {
                    self.scan();
                }
                _ => {
                    self.revert(line_start);
                    return;
                }
            }
        }
    }

    /// Scans a `# ` heading line and returns its text.
    ///
    /// Returns `None` and reverts when the first non-blank line is not a
    /// heading, when the heading is empty, or when the text reaches
    /// `MAX_TITLE_CHARS + 1` characters before a line end. End of input
    /// terminates the line.
    pub fn scan_title(&mut self) -> Option<String> {
        let m = self.mark();
        self.skip_blank_lines();

        if self.scan() != Some('#') || self.scan() != Some(' ') {
            self.revert(m);
            return None;
        }

        let mut buf = String::with_capacity(MAX_TITLE_CHARS);
        let mut count = 0;
        loop {
            match self.scan() {
                None | Some('\n') => break,
                Some('\r') if matches!(self.peek(), Some('\n') | None) => {
                    self.scan();
                    break;
                }
                Some(r) => {
                    count += 1;
                    if count > MAX_TITLE_CHARS {
                        self.revert(m);
                        return None;
                    }
                    buf.push(r);
                }
            }
        }

        if buf.is_empty() {
            self.revert(m);
            return None;
        }
        Some(buf)
    }
}

/// Scans the title heading at the start of `body`.
pub fn scan_title(body: &str) -> Option<String> {
    Scanner::new(body).scan_title()
}
