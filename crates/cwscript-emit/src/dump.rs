use cwscript_core::{GenerationError, Renderer, TemplateBinding};

/// Renders every binding as pretty JSON instead of host source.
///
/// Nested constructs are rendered first, so an enclosing binding carries the
/// JSON of its children as fragment text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingDumpRenderer;

impl Renderer for BindingDumpRenderer {
    fn render(&self, binding: &TemplateBinding) -> Result<String, GenerationError> {
        let mut json = serde_json::to_string_pretty(binding)
            .map_err(|err| GenerationError::Render(err.to_string()))?;
        json.push('\n');
        Ok(json)
    }
}
