use crate::ui::config;
use std::path::Path;
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, ThemeSet};
use syntect::parsing::SyntaxSet;

pub struct CodeLineRenderer<'a> {
    syntax_set: &'a SyntaxSet,
    highlighter: Option<HighlightLines<'a>>,
}

/// Stylized line representation.
pub enum StylizedLine<'a> {
    /// No styling needed.
    NoneStyle(&'a str),
    /// `syntect` stylized line, list of stylized line segments.
    Stylized(Vec<(Style, &'a str)>),
}

impl CodeLineRenderer<'_> {
    /// Prettify source code line if needed.
    pub fn render_line<'s>(&mut self, line: &'s str) -> anyhow::Result<StylizedLine<'s>> {
        match &mut self.highlighter {
            None => Ok(StylizedLine::NoneStyle(line)),
            Some(h) => Ok(StylizedLine::Stylized(
                h.highlight_line(line, self.syntax_set)?,
            )),
        }
    }
}

pub struct CodeRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Default for CodeRenderer {
    fn default() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }
}

impl CodeRenderer {
    const DEFAULT_EXT: &'static str = "c";

    /// Return a line renderer for a source file, highlighting is chosen by file extension.
    pub fn line_renderer(&self, file: &Path) -> CodeLineRenderer {
        let plain = CodeLineRenderer {
            syntax_set: &self.syntax_set,
            highlighter: None,
        };

        let config = config::current();
        if cfg!(feature = "int_test") || !config.colored {
            return plain;
        }
        let Some(theme) = config
            .theme
            .to_syntect_name()
            .and_then(|name| self.theme_set.themes.get(name))
        else {
            return plain;
        };

        let ext = file
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(Self::DEFAULT_EXT);
        let Some(syntax_ref) = self
            .syntax_set
            .find_syntax_by_extension(ext)
            .or_else(|| self.syntax_set.find_syntax_by_extension(Self::DEFAULT_EXT))
        else {
            return plain;
        };

        CodeLineRenderer {
            syntax_set: &self.syntax_set,
            highlighter: Some(HighlightLines::new(syntax_ref, theme)),
        }
    }
}

static RENDERER: OnceLock<CodeRenderer> = OnceLock::new();

/// Return current source code renderer.
pub fn syntax_renderer() -> &'static CodeRenderer {
    RENDERER.get_or_init(CodeRenderer::default)
}
