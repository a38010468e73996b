//! Indented text writer for emitted C#.
//!
//! Output is built line by line. Preprocessor directives are written at the
//! current indentation like every other line; the C# compiler accepts leading
//! whitespace before `#`. Lines are always terminated with `\n` so output is
//! byte-identical across hosts.

#[derive(Debug, Clone)]
pub struct CodeWriter {
    indent_unit: String,
    level: usize,
    out: String,
}

impl CodeWriter {
    pub fn new(indent_unit: &str) -> Self {
        Self {
            indent_unit: indent_unit.to_string(),
            level: 0,
            out: String::new(),
        }
    }

    pub fn indent_unit(&self) -> &str {
        &self.indent_unit
    }

    /// Write one line at the current indentation. Empty lines carry no
    /// trailing whitespace.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.level {
                self.out.push_str(&self.indent_unit);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.line(line);
        }
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Write `{` and indent.
    pub fn open(&mut self) {
        self.line("{");
        self.indent();
    }

    /// Dedent and write `}`.
    pub fn close(&mut self) {
        self.dedent();
        self.line("}");
    }

    /// `if (condition)` followed by an indented single statement.
    pub fn write_if(&mut self, condition: &str, statement: &str) {
        self.line(format!("if ({condition})"));
        self.indent();
        self.line(statement);
        self.dedent();
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_indent() {
        let mut w = CodeWriter::new("  ");
        w.line("class A");
        w.open();
        w.line("int x;");
        w.blank();
        w.write_if("x == 0", "return;");
        w.close();
        assert_eq!(
            w.finish(),
            "class A\n{\n  int x;\n\n  if (x == 0)\n    return;\n}\n"
        );
    }

    #[test]
    fn empty_line_has_no_indent() {
        let mut w = CodeWriter::new("\t");
        w.open();
        w.line("");
        w.close();
        assert_eq!(w.finish(), "{\n\n}\n");
    }

    #[test]
    fn close_never_underflows() {
        let mut w = CodeWriter::new("  ");
        w.close();
        w.line("x");
        assert_eq!(w.finish(), "}\nx\n");
    }
}
