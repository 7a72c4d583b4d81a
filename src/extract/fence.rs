//! Line scanner for Markdown documents.
//!
//! Splits a document into headings, fenced code blocks, prose lines and blank
//! lines. Only the structure needed to pair SQL blocks with their
//! explanations is recognized; inline Markdown is left untouched.

/// A structural element of a Markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// An ATX heading (`#` through `######`).
    Heading { line: usize, text: String },
    /// A closed fenced code block.
    Fence(Fence),
    /// A non-blank prose line.
    Text { line: usize, text: String },
    /// A blank line.
    Blank { line: usize },
    /// A fence that was never closed. Always the last block.
    Unterminated { line: usize, info: String },
}

/// A fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    /// 1-based line of the opening fence.
    pub line: usize,
    /// Info string after the opening fence, trimmed.
    pub info: String,
    /// Raw body lines between the fences.
    pub body: Vec<String>,
}

impl Fence {
    /// Returns the lowercased first word of the info string.
    pub fn language(&self) -> String {
        self.info
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase()
    }

    /// Returns true if this fence holds SQL.
    pub fn is_sql(&self) -> bool {
        matches!(
            self.language().as_str(),
            "sql" | "postgres" | "postgresql" | "pgsql" | "psql"
        )
    }

    /// Returns true if this fence can hold documented output.
    pub fn is_output(&self) -> bool {
        matches!(
            self.language().as_str(),
            "" | "text" | "output" | "result" | "console"
        )
    }

    /// Returns the body as a single string.
    pub fn content(&self) -> String {
        self.body.join("\n")
    }
}

/// An opening fence marker: fence character and run length.
struct Opener {
    marker: char,
    len: usize,
}

/// Parses a line as an opening fence, returning the marker and info string.
fn parse_opener(line: &str) -> Option<(Opener, String)> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }

    let marker = trimmed.chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }

    let len = trimmed.chars().take_while(|&c| c == marker).count();
    if len < 3 {
        return None;
    }

    let info = trimmed[len..].trim();
    // A backtick in the info string means this is inline code, not a fence.
    if marker == '`' && info.contains('`') {
        return None;
    }

    Some((Opener { marker, len }, info.to_string()))
}

/// Returns true if `line` closes a fence opened with `opener`.
fn closes(line: &str, opener: &Opener) -> bool {
    let trimmed = line.trim();
    let run = trimmed.chars().take_while(|&c| c == opener.marker).count();
    run >= opener.len && run == trimmed.chars().count()
}

/// Parses a line as an ATX heading, returning its text.
fn parse_heading(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }

    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }

    Some(rest.trim().trim_end_matches('#').trim().to_string())
}

/// Scans a document into blocks.
pub fn scan(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

    while let Some((number, line)) = lines.next() {
        if let Some((opener, info)) = parse_opener(line) {
            let mut body = Vec::new();
            let mut closed = false;

            for (_, inner) in lines.by_ref() {
                if closes(inner, &opener) {
                    closed = true;
                    break;
                }
                body.push(inner.to_string());
            }

            if closed {
                blocks.push(Block::Fence(Fence {
                    line: number,
                    info,
                    body,
                }));
            } else {
                blocks.push(Block::Unterminated { line: number, info });
            }
            continue;
        }

        if line.trim().is_empty() {
            blocks.push(Block::Blank { line: number });
        } else if let Some(heading) = parse_heading(line) {
            blocks.push(Block::Heading {
                line: number,
                text: heading,
            });
        } else {
            blocks.push(Block::Text {
                line: number,
                text: line.trim().to_string(),
            });
        }
    }

    blocks
}
