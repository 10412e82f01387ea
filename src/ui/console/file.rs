use crate::debugger::SourcePlace;
use crate::ui::syntax;
use crate::ui::syntax::StylizedLine;
use anyhow::anyhow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::{fs, io};
use syntect::util::as_24_bit_terminal_escaped;

/// Number of lines printed by the `list` command.
pub const LIST_LENGTH: u64 = 10;

#[derive(Default)]
pub struct FileView {
    cached_lines: RefCell<HashMap<PathBuf, Box<[String]>>>,
}

impl FileView {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_lines<T>(
        &self,
        file_path: &Path,
        f: impl FnOnce(&[String]) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let mut cache = self.cached_lines.borrow_mut();
        if !cache.contains_key(file_path) {
            let file = fs::File::open(file_path)?;
            let lines = io::BufReader::new(file)
                .lines()
                .map_while(Result::ok)
                .collect::<Vec<_>>();
            cache.insert(file_path.to_path_buf(), lines.into_boxed_slice());
        }
        let lines = cache
            .get(file_path)
            .ok_or_else(|| anyhow!("file {} is not cached", file_path.display()))?;
        f(lines)
    }

    fn render(&self, file_path: &Path, start: u64, length: u64) -> anyhow::Result<String> {
        self.with_lines(file_path, |file_lines| {
            let syntax_renderer = syntax::syntax_renderer();
            let mut line_renderer = syntax_renderer.line_renderer(file_path);

            let mut i = 0;
            file_lines
                .iter()
                .skip(start as usize)
                .take(length as usize)
                .try_fold(String::default(), |acc, line| -> anyhow::Result<String> {
                    let line_number = start + 1 + i;
                    i += 1;

                    match line_renderer.render_line(line)? {
                        StylizedLine::NoneStyle(line) => {
                            Ok(format!("{acc}{line_number:>4} {line}\n"))
                        }
                        StylizedLine::Stylized(segments) => {
                            let escaped = as_24_bit_terminal_escaped(&segments, false);
                            Ok(format!("{acc}{line_number:>4} {escaped}\x1b[0m\n"))
                        }
                    }
                })
        })
    }

    /// Single source line, `None` if file or line is not available.
    pub fn line(&self, place: &SourcePlace) -> Option<String> {
        if place.line == 0 {
            return None;
        }
        self.with_lines(Path::new(&place.file), |lines| {
            Ok(lines.get(place.line as usize - 1).cloned())
        })
        .ok()
        .flatten()
    }

    /// Render `bounds` lines before and after the place line.
    pub fn render_source(&self, place: &SourcePlace, bounds: u64) -> anyhow::Result<String> {
        let line_pos = place.line.max(1) - 1;
        let start = line_pos.saturating_sub(bounds);
        self.render(Path::new(&place.file), start, bounds * 2 + 1)
    }

    /// Render ten lines for the `list` command, the place line is the fifth one.
    pub fn render_listing(&self, place: &SourcePlace) -> anyhow::Result<String> {
        let path = Path::new(&place.file);
        let total = self.with_lines(path, |lines| Ok(lines.len() as u64))?;
        if place.line == 0 || place.line > total {
            return Err(anyhow!("Line {} out of range.", place.line));
        }
        let from = place.line.saturating_sub(4).max(1);
        self.render(path, from - 1, LIST_LENGTH)
    }
}
