//! Markdown heading chunker.

use std::sync::Arc;

use vault_env_core::api::{Block, Chunker, ChunkerFactory, ConfigSnapshot};

/// Splits markdown into one block per heading section.
///
/// Block keys are the heading path (`#Intro#Setup`); text before the first
/// heading gets the key `#`. Sections under an excluded heading, and
/// sections with no text besides the heading line, are dropped.
#[derive(Debug, Clone, Default)]
pub struct HeadingChunker {
    excluded: Vec<String>,
}

impl HeadingChunker {
    pub fn new(excluded: Vec<String>) -> Self {
        Self { excluded }
    }

    fn is_excluded(&self, path: &[(usize, String)]) -> bool {
        path.iter()
            .any(|(_, heading)| self.excluded.iter().any(|e| e == heading))
    }
}

struct Section {
    path: Vec<(usize, String)>,
    lines: Vec<String>,
    line_start: usize,
}

fn parse_heading(line: &str) -> Option<(usize, String)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some((level, rest.trim().to_string()))
}

impl Chunker for HeadingChunker {
    fn chunk(&self, content: &str) -> Vec<Block> {
        let mut sections: Vec<Section> = Vec::new();
        let mut current = Section {
            path: Vec::new(),
            lines: Vec::new(),
            line_start: 1,
        };

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            if let Some((level, heading)) = parse_heading(line) {
                let mut path = current.path.clone();
                path.retain(|(l, _)| *l < level);
                path.push((level, heading));
                let done = std::mem::replace(
                    &mut current,
                    Section {
                        path,
                        lines: vec![line.to_string()],
                        line_start: line_no,
                    },
                );
                sections.push(done);
            } else {
                current.lines.push(line.to_string());
            }
        }
        sections.push(current);

        sections
            .into_iter()
            .filter(|s| !self.is_excluded(&s.path))
            .filter_map(|s| {
                let has_heading = !s.path.is_empty();
                let body_lines = if has_heading { &s.lines[1..] } else { &s.lines[..] };
                if body_lines.iter().all(|l| l.trim().is_empty()) {
                    return None;
                }
                let key: String = if has_heading {
                    s.path.iter().map(|(_, h)| format!("#{h}")).collect()
                } else {
                    "#".to_string()
                };
                Some(Block {
                    key,
                    text: s.lines.join("\n"),
                    line_start: s.line_start,
                    line_end: s.line_start + s.lines.len() - 1,
                })
            })
            .collect()
    }
}

pub struct HeadingChunkerFactory;

impl ChunkerFactory for HeadingChunkerFactory {
    fn build(&self, snapshot: &ConfigSnapshot) -> anyhow::Result<Arc<dyn Chunker>> {
        Ok(Arc::new(HeadingChunker::new(
            snapshot.exclusions().headings.clone(),
        )))
    }
}
