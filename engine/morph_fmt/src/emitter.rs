//! Output emitter.
//!
//! A thin string builder with the two formatting rules the writer enforces
//! globally: 4-space indentation and exactly one trailing newline.

/// String-based emitter.
#[derive(Default)]
pub struct StringEmitter {
    buffer: String,
}

impl StringEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a text fragment.
    pub fn emit(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Emit a newline (Unix-style `\n`).
    pub fn emit_newline(&mut self) {
        self.buffer.push('\n');
    }

    /// Emit indentation (4 spaces per level).
    pub fn emit_indent(&mut self, level: usize) {
        for _ in 0..level {
            self.buffer.push_str("    ");
        }
    }

    /// Emit a single space.
    pub fn emit_space(&mut self) {
        self.buffer.push(' ');
    }

    /// Ensure the output ends with a single newline.
    pub fn ensure_trailing_newline(&mut self) {
        while self.buffer.ends_with("\n\n") {
            self.buffer.pop();
        }
        if !self.buffer.is_empty() && !self.buffer.ends_with('\n') {
            self.buffer.push('\n');
        }
    }

    /// Get the formatted output.
    pub fn output(self) -> String {
        self.buffer
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_newline_rule() {
        let mut emitter = StringEmitter::new();
        emitter.emit("fn f() { }");
        emitter.emit_newline();
        emitter.emit_newline();
        emitter.ensure_trailing_newline();
        assert_eq!(emitter.output(), "fn f() { }\n");
    }

    #[test]
    fn test_indent() {
        let mut emitter = StringEmitter::new();
        emitter.emit_indent(2);
        emitter.emit("return;");
        assert_eq!(emitter.as_str(), "        return;");
    }
}
