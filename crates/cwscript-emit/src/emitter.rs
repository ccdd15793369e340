use crate::config::IndentStyle;

pub use cwscript_core::naming::{screaming_snake_case, snake_case};

#[derive(Debug, Clone)]
pub struct EmitContext {
    pub indent_level: usize,
    pub indent_chars: String,
}

impl EmitContext {
    pub fn new() -> Self {
        Self::with_style(IndentStyle::Spaces(4))
    }

    pub fn with_style(style: IndentStyle) -> Self {
        Self {
            indent_level: 0,
            indent_chars: style.unit(),
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    pub fn get_indent(&self) -> String {
        self.indent_chars.repeat(self.indent_level)
    }

    pub fn nested(&self) -> Self {
        let mut ctx = self.clone();
        ctx.indent();
        ctx
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Line-oriented source buffer. Every template renders at column zero;
/// embedding a rendered fragment re-indents it to the current level.
#[derive(Debug, Default)]
pub struct SourceWriter {
    buf: String,
    ctx: EmitContext,
}

impl SourceWriter {
    pub fn new(ctx: EmitContext) -> Self {
        Self {
            buf: String::new(),
            ctx,
        }
    }

    pub fn line(&mut self, text: &str) {
        if !text.is_empty() {
            self.buf.push_str(&self.ctx.get_indent());
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    pub fn embed(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    pub fn indent(&mut self) {
        self.ctx.indent();
    }

    pub fn dedent(&mut self) {
        self.ctx.dedent();
    }

    pub fn block<E, F>(&mut self, header: &str, body: F) -> Result<(), E>
    where
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        self.line(&format!("{} {{", header));
        self.ctx.indent();
        body(self)?;
        self.ctx.dedent();
        self.line("}");
        Ok(())
    }

    pub fn finish(self) -> String {
        self.buf
    }
}
