//! `%s` substitution templates used for operators and wrappers.
//!
//! A template is literal text with `%s` placeholders. `%%` stands for a
//! literal percent sign; any other `%` directive is rejected when the
//! template is parsed, so substitution itself can never fail on syntax.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template {template:?}: unsupported directive '%{directive}'")]
    BadDirective { template: String, directive: char },
    #[error("template {template:?}: dangling '%' at end")]
    Dangling { template: String },
    #[error("template {template:?} takes {expected} argument(s), got {got}")]
    Arity {
        template: String,
        expected: usize,
        got: usize,
    },
}

/// A parsed substitution template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    /// Literal text between placeholders; always `placeholders + 1` pieces.
    pieces: Vec<String>,
}

impl Template {
    /// Parse a template, validating every `%` directive.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut chars = source.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                current.push(c);
                continue;
            }
            match chars.next() {
                Some('s') => pieces.push(std::mem::take(&mut current)),
                Some('%') => current.push('%'),
                Some(directive) => {
                    return Err(TemplateError::BadDirective {
                        template: source.to_string(),
                        directive,
                    });
                }
                None => {
                    return Err(TemplateError::Dangling {
                        template: source.to_string(),
                    });
                }
            }
        }
        pieces.push(current);
        Ok(Self {
            source: source.to_string(),
            pieces,
        })
    }

    /// Original template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of `%s` placeholders.
    #[must_use]
    pub fn placeholders(&self) -> usize {
        self.pieces.len() - 1
    }

    /// Substitute `args` in order, one per placeholder.
    pub fn apply(&self, args: &[&str]) -> Result<String, TemplateError> {
        if args.len() != self.placeholders() {
            return Err(TemplateError::Arity {
                template: self.source.clone(),
                expected: self.placeholders(),
                got: args.len(),
            });
        }
        let extra: usize = args.iter().map(|a| a.len()).sum();
        let mut out = String::with_capacity(self.source.len() + extra);
        for (piece, arg) in self.pieces.iter().zip(args) {
            out.push_str(piece);
            out.push_str(arg);
        }
        if let Some(last) = self.pieces.last() {
            out.push_str(last);
        }
        Ok(out)
    }
}
