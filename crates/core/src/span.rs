use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

/// Assembly source split into newline-delimited, 1-indexed lines.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub name: String,
    pub text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (offset, ch) in text.char_indices() {
            if ch == '\n' {
                line_starts.push(offset + 1);
            }
        }

        Self {
            id: SourceId(0),
            name: name.into(),
            text,
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte range of `line` without its terminating newline.
    pub fn line_range(&self, line: usize) -> Option<Range<usize>> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        Some(start..end)
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        self.line_range(line).map(|range| &self.text[range])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_lines_to_ranges() {
        let file = SourceFile::new("test", "first\nsecond\n\nthird");
        assert_eq!(file.line_count(), 4);
        assert_eq!(file.line_text(1), Some("first"));
        assert_eq!(file.line_text(2), Some("second"));
        assert_eq!(file.line_text(3), Some(""));
        assert_eq!(file.line_text(4), Some("third"));
        assert_eq!(file.line_range(0), None);
        assert_eq!(file.line_range(5), None);
    }

    #[test]
    fn trailing_newline_yields_empty_last_line() {
        let file = SourceFile::new("test", "ret\n");
        assert_eq!(file.line_count(), 2);
        assert_eq!(file.line_text(1), Some("ret"));
        assert_eq!(file.line_text(2), Some(""));
    }
}
