//! Grouping of statements into `object network` / `object service` blocks.
//!
//! Device configuration has no block terminator: a block runs until the next
//! `object` header. Indented lines always continue the open block, and so do
//! unindented lines shaped like a clause of the block's category. Any other
//! unindented line is a foreign top-level command (`service resetoutside`,
//! `hostname fw01`); it closes the block and is skipped.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::lexer::RawStatement;

/// First tokens that may continue a network block without indentation.
const NETWORK_CLAUSE_KEYWORDS: &[&str] = &["host", "subnet", "range", "fqdn"];
/// Protocols that mark an unindented `service` line as a service clause.
const SERVICE_PROTOCOLS: &[&str] = &["tcp", "udp"];

const HEADER_KEYWORD: &str = "object";
const DESCRIPTION_KEYWORD: &str = "description";

/// Declared category of an object block. Also the key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Network,
    Service,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Network => "network",
            Category::Service => "service",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "network" => Ok(Category::Network),
            "service" => Ok(Category::Service),
            other => Err(format!("unknown object category '{other}'")),
        }
    }
}

/// A named object definition and the clause lines that belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectBlock {
    pub name: String,
    pub category: Category,
    /// Line of the `object …` header.
    pub line: usize,
    /// Text of the last `description` clause, if any.
    pub description: Option<String>,
    /// Every other clause, recognized or not, in source order.
    pub clauses: Vec<RawStatement>,
}

impl ObjectBlock {
    fn new(name: &str, category: Category, line: usize) -> Self {
        Self {
            name: name.to_string(),
            category,
            line,
            description: None,
            clauses: Vec::new(),
        }
    }

    fn push_clause(&mut self, stmt: RawStatement) {
        if stmt.keyword() == DESCRIPTION_KEYWORD {
            let text = stmt.text[DESCRIPTION_KEYWORD.len()..].trim();
            self.description = Some(text.to_string());
            return;
        }
        self.clauses.push(stmt);
    }
}

/// Structural fault in a block header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("object {category} header is missing the object name")]
    MissingName { category: Category },
    #[error("object {category} '{name}' is already defined on line {first_line}")]
    DuplicateName {
        category: Category,
        name: String,
        first_line: usize,
    },
}

/// Output of [`parse_blocks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Accepted blocks in source order.
    pub blocks: Vec<ObjectBlock>,
    /// Header faults in source order. The affected blocks are not in `blocks`.
    pub errors: Vec<ParseError>,
    /// Statements outside any object block.
    pub skipped_lines: usize,
}

enum Open {
    None,
    Block(ObjectBlock),
    /// Clauses after a rejected header are swallowed with it.
    Discard(Category),
}

impl Open {
    fn category(&self) -> Option<Category> {
        match self {
            Open::None => None,
            Open::Block(block) => Some(block.category),
            Open::Discard(category) => Some(*category),
        }
    }
}

#[derive(Default)]
struct Grouper {
    doc: ParsedDocument,
    first_seen: HashMap<(Category, String), usize>,
}

impl Grouper {
    fn close(&mut self, open: Open) {
        let Open::Block(block) = open else {
            return;
        };
        let key = (block.category, block.name.clone());
        if let Some(&first_line) = self.first_seen.get(&key) {
            self.doc.errors.push(ParseError {
                line: block.line,
                kind: ParseErrorKind::DuplicateName {
                    category: block.category,
                    name: block.name,
                    first_line,
                },
            });
            return;
        }
        self.first_seen.insert(key, block.line);
        self.doc.blocks.push(block);
    }

    fn skip(&mut self, stmt: &RawStatement) {
        debug!(line = stmt.line, text = %stmt.text, "skipping statement outside object block");
        self.doc.skipped_lines += 1;
    }
}

/// Group statements into object blocks.
pub fn parse_blocks<I>(statements: I) -> ParsedDocument
where
    I: IntoIterator<Item = RawStatement>,
{
    let mut grouper = Grouper::default();
    let mut open = Open::None;

    for stmt in statements {
        if let Some(category) = header_category(&stmt) {
            grouper.close(std::mem::replace(&mut open, Open::None));
            open = open_block(&mut grouper, stmt, category);
            continue;
        }

        let continues = stmt.indented
            || open
                .category()
                .is_some_and(|category| is_clause_line(category, &stmt));
        if !continues {
            grouper.close(std::mem::replace(&mut open, Open::None));
            grouper.skip(&stmt);
            continue;
        }
        match &mut open {
            Open::Block(block) => block.push_clause(stmt),
            Open::Discard(_) => {}
            Open::None => grouper.skip(&stmt),
        }
    }
    grouper.close(open);

    grouper.doc
}

fn open_block(grouper: &mut Grouper, stmt: RawStatement, category: Category) -> Open {
    let Some(name) = stmt.token(2) else {
        grouper.doc.errors.push(ParseError {
            line: stmt.line,
            kind: ParseErrorKind::MissingName { category },
        });
        return Open::Discard(category);
    };

    let mut block = ObjectBlock::new(name, category, stmt.line);
    if stmt.tokens.len() > 3 {
        // One-line form: `object network T3 range 185.188.32.0 185.188.35.255`.
        let inline = RawStatement::from_tokens(stmt.line, stmt.tokens[3..].to_vec(), true);
        block.push_clause(inline);
    }
    Open::Block(block)
}

/// Whether an unindented statement reads as a clause of a `category` block.
fn is_clause_line(category: Category, stmt: &RawStatement) -> bool {
    let keyword = stmt.keyword();
    if keyword == DESCRIPTION_KEYWORD {
        return true;
    }
    match category {
        Category::Network => NETWORK_CLAUSE_KEYWORDS.contains(&keyword),
        Category::Service => {
            keyword == "service" && stmt.token(1).is_some_and(|proto| SERVICE_PROTOCOLS.contains(&proto))
        }
    }
}

fn header_category(stmt: &RawStatement) -> Option<Category> {
    if stmt.keyword() != HEADER_KEYWORD {
        return None;
    }
    stmt.token(1)?.parse().ok()
}
