//! Indent-aware string builder for graph description languages.
//!
//! DOT and Mermaid output both use 2-space indentation.

pub struct DiagramWriter {
    buf: String,
    indent_level: usize,
}

impl DiagramWriter {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(2048),
            indent_level: 0,
        }
    }

    /// Write a complete line (appends newline).
    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent_level {
            self.buf.push_str("  ");
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Write `text {` and increase indent (e.g. `digraph "x" {`).
    pub fn block_open(&mut self, text: &str) {
        self.line(&format!("{} {{", text));
        self.indent();
    }

    /// Decrease indent and write `}`.
    pub fn block_close(&mut self) {
        self.dedent();
        self.line("}");
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for DiagramWriter {
    fn default() -> Self {
        Self::new()
    }
}
