//! Single-pass lexical scanner
//!
//! Splits program text into code and comment segments and reports statement
//! boundaries, without parsing. Strings, quasi-literals and comments are
//! protected: a `;` inside them never ends a statement. Neither does a `;`
//! inside the parenthesized header of a `for` loop.

use std::iter::Peekable;
use std::str::CharIndices;

/* ===================== Context ===================== */

/// Lexical context of the character being scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Normal,
    SingleQuoted { escaped: bool },
    DoubleQuoted { escaped: bool },
    /// Back-tick literal; `depth` counts open `${` holes
    Quasi { depth: usize, escaped: bool },
    LineComment,
    BlockComment(BlockState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Next character is the `*` of the opening `/*`
    Opening,
    Body,
    /// Next character is the `/` of the closing `*/`
    Closing,
}

impl Context {
    /// Inside a string, quasi-literal or comment
    pub fn is_protected(self) -> bool {
        self != Context::Normal
    }
}

/* ===================== Output ===================== */

/// A statement that just ended at a terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based line of its first non-whitespace character
    pub line: u32,
    /// 1-based column (in characters) of its first non-whitespace character
    pub column: u32,
    /// Source text, trimmed, whitespace runs collapsed, comments removed
    pub code: String,
}

/// One piece of scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Program text, including string and quasi-literal contents
    Code(&'a str),
    /// Part of a `//` comment; the terminating newline is code
    LineComment(&'a str),
    /// Part of a `/* */` comment, delimiters included
    BlockComment(&'a str),
    /// The statement ending with the previous code segment
    Boundary(Statement),
    /// A statement cut off by the end of the input
    Trailing(Statement),
}

/* ===================== Scanner ===================== */

pub struct Scanner<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    context: Context,

    /// Position of the next character
    line: u32,
    column: u32,

    paren_depth: usize,
    /// Paren depths at which open `for` headers started
    headers: Vec<usize>,
    /// Saw `for`; the next `(` opens a loop header
    pending_header: bool,
    ident: String,

    buffer: String,
    start: Option<(u32, u32)>,
    queued: Option<Statement>,
    flushed: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            context: Context::Normal,
            line: 1,
            column: 1,
            paren_depth: 0,
            headers: Vec::new(),
            pending_header: false,
            ident: String::new(),
            buffer: String::new(),
            start: None,
            queued: None,
            flushed: false,
        }
    }

    /// Position of the next character; after the last segment, the end of the source
    pub fn position(&self) -> (u32, u32) {
        (self.line, self.column)
    }

    pub fn context(&self) -> Context {
        self.context
    }

    fn scan(&mut self, ch: char, next: Option<char>) -> SegmentKind {
        match self.context {
            Context::LineComment if ch != '\n' => return SegmentKind::LineComment,
            // The newline ends the comment and is scanned as code
            Context::LineComment => self.context = Context::Normal,
            Context::BlockComment(state) => {
                self.context = match state {
                    BlockState::Opening => Context::BlockComment(BlockState::Body),
                    BlockState::Body if ch == '*' && next == Some('/') => {
                        Context::BlockComment(BlockState::Closing)
                    }
                    BlockState::Body => Context::BlockComment(BlockState::Body),
                    BlockState::Closing => Context::Normal,
                };
                return SegmentKind::BlockComment;
            }
            _ => {}
        }

        if self.context == Context::Normal && ch == '/' {
            match next {
                Some('/') => {
                    self.context = Context::LineComment;
                    self.comment_boundary();
                    return SegmentKind::LineComment;
                }
                Some('*') => {
                    self.context = Context::BlockComment(BlockState::Opening);
                    self.comment_boundary();
                    return SegmentKind::BlockComment;
                }
                _ => {}
            }
        }

        self.context = match self.context {
            Context::Normal => match ch {
                '\'' => Context::SingleQuoted { escaped: false },
                '"' => Context::DoubleQuoted { escaped: false },
                '`' => Context::Quasi {
                    depth: 0,
                    escaped: false,
                },
                _ => Context::Normal,
            },
            Context::SingleQuoted { escaped } => match ch {
                _ if escaped => Context::SingleQuoted { escaped: false },
                '\\' => Context::SingleQuoted { escaped: true },
                '\'' => Context::Normal,
                _ => Context::SingleQuoted { escaped: false },
            },
            Context::DoubleQuoted { escaped } => match ch {
                _ if escaped => Context::DoubleQuoted { escaped: false },
                '\\' => Context::DoubleQuoted { escaped: true },
                '"' => Context::Normal,
                _ => Context::DoubleQuoted { escaped: false },
            },
            Context::Quasi { depth, escaped } => match ch {
                _ if escaped => Context::Quasi {
                    depth,
                    escaped: false,
                },
                '\\' => Context::Quasi {
                    depth,
                    escaped: true,
                },
                '`' if depth == 0 => Context::Normal,
                '$' if next == Some('{') => Context::Quasi {
                    depth: depth + 1,
                    escaped: false,
                },
                '}' if depth > 0 => Context::Quasi {
                    depth: depth - 1,
                    escaped: false,
                },
                _ => Context::Quasi {
                    depth,
                    escaped: false,
                },
            },
            other => other,
        };

        let protected = self.context.is_protected();
        if !protected {
            self.track_code(ch);
        }

        if self.start.is_none() && !ch.is_whitespace() {
            self.start = Some((self.line, self.column));
        }
        self.buffer.push(ch);

        if !protected && ch == ';' && !self.in_loop_header() {
            self.queued = self.take_statement();
        }
        SegmentKind::Code
    }

    /// Identifier and parenthesis tracking for loop headers
    fn track_code(&mut self, ch: char) {
        if is_ident_char(ch) {
            self.ident.push(ch);
        } else {
            if self.ident == "for" {
                self.pending_header = true;
            }
            self.ident.clear();
        }

        match ch {
            '(' => {
                if self.pending_header {
                    self.headers.push(self.paren_depth);
                    self.pending_header = false;
                }
                self.paren_depth += 1;
            }
            ')' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                if self.headers.last() == Some(&self.paren_depth) {
                    self.headers.pop();
                }
                self.pending_header = false;
            }
            c if !c.is_whitespace() => self.pending_header = false,
            _ => {}
        }
    }

    fn in_loop_header(&self) -> bool {
        self.headers
            .last()
            .is_some_and(|depth| self.paren_depth > *depth)
    }

    /// A comment separates the code around it like a space
    fn comment_boundary(&mut self) {
        self.buffer.push(' ');
        if self.ident == "for" {
            self.pending_header = true;
        }
        self.ident.clear();
    }

    fn take_statement(&mut self) -> Option<Statement> {
        let code = normalize_snippet(&self.buffer);
        self.buffer.clear();
        let (line, column) = self.start.take()?;
        if code.is_empty() {
            return None;
        }
        Some(Statement { line, column, code })
    }

    fn advance_position(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Code,
    LineComment,
    BlockComment,
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if let Some(statement) = self.queued.take() {
            return Some(Segment::Boundary(statement));
        }

        let Some((offset, ch)) = self.chars.next() else {
            // A trailing statement without terminator ends with the input,
            // unless the input ends inside a literal or block comment
            if self.flushed {
                return None;
            }
            self.flushed = true;
            if !matches!(self.context, Context::Normal | Context::LineComment) {
                return None;
            }
            return self.take_statement().map(Segment::Trailing);
        };
        let next = self.chars.peek().map(|(_, c)| *c);
        let text = &self.source[offset..offset + ch.len_utf8()];

        let kind = self.scan(ch, next);
        self.advance_position(ch);

        Some(match kind {
            SegmentKind::Code => Segment::Code(text),
            SegmentKind::LineComment => Segment::LineComment(text),
            SegmentKind::BlockComment => Segment::BlockComment(text),
        })
    }
}

/* ===================== Helpers ===================== */

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

/// Trim and collapse every whitespace run to a single space
pub fn normalize_snippet(snippet: &str) -> String {
    snippet.split_whitespace().collect::<Vec<_>>().join(" ")
}
