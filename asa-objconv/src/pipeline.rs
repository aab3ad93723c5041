//! Lex, group, classify, key, and render one configuration document.
//!
//! Header and classification faults are recorded per block and never stop
//! the batch. Registry and writer failures abort the whole translation: a
//! document whose keys may not have been persisted must not be handed out.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::block::{parse_blocks, Category, ParseError, ParseErrorKind};
use crate::classify::{classify, ClassificationError, ClassifiedObject};
use crate::config::ConvertConfig;
use crate::lexer::statements;
use crate::registry::{IdentifierRegistry, RegistryError};
use crate::render::{render, KeyedObject, SerializationError};

/// Pipeline step at which a block was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parse,
    Classify,
}

/// A rejected block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockError {
    pub line: usize,
    /// Object name, when the header carried one.
    pub name: Option<String>,
    pub category: Category,
    pub stage: Stage,
    pub reason: String,
}

impl From<ParseError> for BlockError {
    fn from(err: ParseError) -> Self {
        let (name, category) = match &err.kind {
            ParseErrorKind::MissingName { category } => (None, *category),
            ParseErrorKind::DuplicateName { name, category, .. } => (Some(name.clone()), *category),
        };
        Self {
            line: err.line,
            name,
            category,
            stage: Stage::Parse,
            reason: err.kind.to_string(),
        }
    }
}

impl From<ClassificationError> for BlockError {
    fn from(err: ClassificationError) -> Self {
        Self {
            line: err.line,
            name: Some(err.name),
            category: err.category,
            stage: Stage::Classify,
            reason: err.kind.to_string(),
        }
    }
}

/// Outcome of [`Translator::translate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationResult {
    /// Rendered document; an empty root when nothing classified.
    pub document: String,
    /// Successfully keyed objects in source order.
    pub objects: Vec<KeyedObject>,
    /// Rejected blocks in source order.
    pub errors: Vec<BlockError>,
    /// Statements outside any object block.
    pub skipped_lines: usize,
}

impl TranslationResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of [`check`]: classification without keys or rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub objects: Vec<ClassifiedObject>,
    pub errors: Vec<BlockError>,
    pub skipped_lines: usize,
}

/// Failures that abort a whole translation.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// Classify every block of `text`.
pub fn check(text: &str) -> CheckResult {
    let parsed = parse_blocks(statements(text));

    let mut errors: Vec<BlockError> = parsed.errors.into_iter().map(BlockError::from).collect();
    let mut objects = Vec::new();
    for block in &parsed.blocks {
        match classify(block) {
            Ok(object) => objects.push(object),
            Err(err) => {
                warn!(line = err.line, object = %err.name, reason = %err.kind, "rejected object");
                errors.push(err.into());
            }
        }
    }
    errors.sort_by_key(|e| e.line);

    CheckResult {
        objects,
        errors,
        skipped_lines: parsed.skipped_lines,
    }
}

/// Runs the full pipeline against a shared registry.
#[derive(Debug)]
pub struct Translator<'a> {
    registry: &'a IdentifierRegistry,
    config: &'a ConvertConfig,
}

impl<'a> Translator<'a> {
    pub fn new(registry: &'a IdentifierRegistry, config: &'a ConvertConfig) -> Self {
        Self { registry, config }
    }

    /// Translate one document. Newly allocated keys are saved before the
    /// document is returned.
    pub fn translate(&self, text: &str) -> Result<TranslationResult, TranslateError> {
        let CheckResult {
            objects,
            errors,
            skipped_lines,
        } = check(text);

        let objects = objects
            .into_iter()
            .map(|object| {
                let db_key = self.registry.assign(object.category, &object.name)?;
                Ok(KeyedObject { object, db_key })
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;

        if self.registry.is_dirty() {
            self.registry.save()?;
        }

        let document = render(&objects, self.config)?;
        info!(
            objects = objects.len(),
            errors = errors.len(),
            skipped_lines,
            "translated configuration"
        );

        Ok(TranslationResult {
            document,
            objects,
            errors,
            skipped_lines,
        })
    }
}
