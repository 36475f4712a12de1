/// input_source.rs
///
/// Program text with a scanning cursor, and the error reports that point back
/// into it. A report quotes the offending source line and marks the column
/// with a caret.

use std::fmt;
use std::io::{self, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InputPosition {
    pub line: usize,
    pub column: usize,
    // byte offset into the input
    pub(crate) offset: usize,
}

impl Default for InputPosition {
    fn default() -> Self {
        InputPosition { line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for InputPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone)]
pub struct InputSource {
    pub(crate) filename: String,
    pub(crate) input: Vec<u8>,
    cursor: InputPosition,
}

impl InputSource {
    pub fn new<R: Read, S: ToString>(filename: S, reader: &mut R) -> io::Result<InputSource> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        Ok(Self::from_bytes(filename, input))
    }

    /// Reads a whole file. Reports produced for it carry the file name.
    pub fn from_file(path: &Path) -> io::Result<InputSource> {
        let filename = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => return Err(io::Error::new(io::ErrorKind::InvalidInput, "path does not name a file")),
        };
        let mut file = std::fs::File::open(path)?;
        Self::new(filename, &mut file)
    }

    pub fn from_string(text: &str) -> InputSource {
        Self::from_named_string("", text)
    }

    pub fn from_named_string<S: ToString>(filename: S, text: &str) -> InputSource {
        Self::from_bytes(filename, text.as_bytes().to_vec())
    }

    fn from_bytes<S: ToString>(filename: S, input: Vec<u8>) -> InputSource {
        InputSource { filename: filename.to_string(), input, cursor: InputPosition::default() }
    }

    pub(crate) fn pos(&self) -> InputPosition {
        self.cursor
    }

    /// Byte under the cursor.
    pub(crate) fn next(&self) -> Option<u8> {
        self.input.get(self.cursor.offset).copied()
    }

    /// Byte `distance` places past the cursor.
    pub(crate) fn lookahead(&self, distance: usize) -> Option<u8> {
        self.input.get(self.cursor.offset + distance).copied()
    }

    pub(crate) fn section(&self, start: usize, end: usize) -> &[u8] {
        &self.input[start..end]
    }

    /// Moves the cursor one byte ahead. "\r\n" counts as a single line break,
    /// and so do a lone '\r' and a lone '\n'.
    pub(crate) fn consume(&mut self) {
        let byte = match self.next() {
            Some(byte) => byte,
            None => return,
        };
        self.cursor.offset += 1;
        let is_crlf = byte == b'\r' && self.next() == Some(b'\n');
        if (byte == b'\n' || byte == b'\r') && !is_crlf {
            self.cursor.line += 1;
            self.cursor.column = 1;
        } else if !is_crlf {
            self.cursor.column += 1;
        }
    }

    /// Full text of the line `position` lies on, without its line break.
    fn line_text(&self, position: InputPosition) -> String {
        let start = position.offset.saturating_sub(position.column - 1).min(self.input.len());
        let end = self.input[start..]
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r')
            .map_or(self.input.len(), |len| start + len);
        String::from_utf8_lossy(&self.input[start..end]).to_string()
    }
}

/// Removes everything from `marker` up to the end of each line. Line breaks
/// are kept, so positions of the remaining text do not change.
pub fn strip_comments(text: &str, marker: &str) -> String {
    if marker.is_empty() {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    for (line_idx, line) in text.split('\n').enumerate() {
        if line_idx != 0 {
            result.push('\n');
        }
        match line.find(marker) {
            Some(comment_start) => {
                result.push_str(&line[..comment_start]);
                // keep a trailing '\r' so CRLF line structure survives
                if line.ends_with('\r') {
                    result.push('\r');
                }
            }
            None => result.push_str(line),
        }
    }

    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Info,
}

/// One message of a report, together with the source line it refers to.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub(crate) severity: Severity,
    pub(crate) position: InputPosition,
    pub(crate) filename: String,
    pub(crate) line_text: String,
    pub(crate) message: String,
}

impl ReportEntry {
    fn new(severity: Severity, source: &InputSource, position: InputPosition, message: &str) -> Self {
        ReportEntry {
            severity,
            position,
            filename: source.filename.clone(),
            line_text: source.line_text(position),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Info => " info",
        };
        writeln!(f, "{}: {}", label, self.message)?;
        if self.filename.is_empty() {
            writeln!(f, "  --> {}", self.position)?;
        } else {
            writeln!(f, "  --> {}:{}", self.filename, self.position)?;
        }

        // tabs are copied so that the caret lines up under the same column
        let padding: String = self.line_text
            .chars()
            .take(self.position.column.saturating_sub(1))
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        writeln!(f, "   |")?;
        writeln!(f, "   | {}", self.line_text)?;
        writeln!(f, "   | {}^", padding)
    }
}

/// Human readable account of a failure: an error, possibly followed by notes
/// that point at related places in the source.
#[derive(Debug, Clone, Default)]
pub struct ErrorReport {
    pub(crate) entries: Vec<ReportEntry>,
}

impl ErrorReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn error(source: &InputSource, position: InputPosition, message: &str) -> Self {
        ErrorReport { entries: vec![ReportEntry::new(Severity::Error, source, position, message)] }
    }

    pub fn with_info(mut self, source: &InputSource, position: InputPosition, message: &str) -> Self {
        self.entries.push(ReportEntry::new(Severity::Info, source, position, message));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_position(&self) -> Option<InputPosition> {
        self.entries.first().map(|entry| entry.position)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, entry) in self.entries.iter().enumerate() {
            if idx != 0 {
                writeln!(f)?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seek(source: &mut InputSource, byte: u8) -> InputPosition {
        while source.next() != Some(byte) {
            source.consume();
        }
        source.pos()
    }

    #[test]
    fn strips_comments_keeping_lines() {
        let stripped = strip_comments("{ // open\n  var int x; // decl\n}", "//");
        assert_eq!(stripped, "{ \n  var int x; \n}");
    }

    #[test]
    fn strips_with_custom_marker() {
        assert_eq!(strip_comments("push 1; # one\nhalt;", "#"), "push 1; \nhalt;");
        assert_eq!(strip_comments("a // b", ""), "a // b");
    }

    #[test]
    fn crlf_is_one_line_break() {
        let mut source = InputSource::from_string("a\r\nb\rc");
        let b = seek(&mut source, b'b');
        assert_eq!((b.line, b.column, b.offset), (2, 1, 3));
        let c = seek(&mut source, b'c');
        assert_eq!((c.line, c.column), (3, 1));
    }

    #[test]
    fn report_points_at_column() {
        let mut source = InputSource::from_string("{\n  x = 1;\n}");
        let pos = seek(&mut source, b'x');
        assert_eq!((pos.line, pos.column), (2, 3));

        let report = ErrorReport::error(&source, pos, "unknown identifier");
        assert_eq!(
            report.to_string(),
            "error: unknown identifier\n  --> 2:3\n   |\n   |   x = 1;\n   |   ^\n"
        );
        assert_eq!(report.first_position(), Some(pos));
    }

    #[test]
    fn report_carries_file_name_and_notes() {
        let mut source = InputSource::from_named_string("main.sl", "a\tb;");
        let pos = seek(&mut source, b'b');
        let report = ErrorReport::error(&source, pos, "first").with_info(&source, pos, "second");
        let rendered = report.to_string();
        assert!(rendered.contains("  --> main.sl:1:3\n"), "{}", rendered);
        assert!(rendered.contains("   |  \t^\n"), "{}", rendered);
        assert!(rendered.contains("\n info: second\n"), "{}", rendered);
        assert_eq!(report.entries.len(), 2);
    }
}
