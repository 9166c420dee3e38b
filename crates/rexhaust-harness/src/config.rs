//! Run configuration: bounds, alphabets, templates and options.
//!
//! A [`RunConfig`] is validated once by [`RunConfigBuilder::build`]; every
//! template in it has already been parsed, so nothing in a run can fail on
//! template syntax.

use std::str::FromStr;

use rexhaust_core::{GeneratorError, Template, TemplateError};
use thiserror::Error;

/// Environment variable selecting [`BoundsMode`].
pub const BOUNDS_ENV: &str = "REXHAUST_BOUNDS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("wrapper {template:?} must have exactly one %s, has {placeholders}")]
    BadTemplate {
        template: String,
        placeholders: usize,
    },
    #[error("operator {template:?} must have one or two %s, has {placeholders}")]
    BadOperator {
        template: String,
        placeholders: usize,
    },
    #[error(transparent)]
    TemplateSyntax(#[from] TemplateError),
    #[error("random strings cannot be used when exporting a corpus")]
    RandomStringsWithExport,
    #[error("regexp alphabet is empty")]
    EmptyAlphabet,
    #[error("bad random sample {spec:?}: expected SEED:COUNT")]
    BadRandomSpec { spec: String },
}

impl From<GeneratorError> for ConfigError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::Template(inner) => Self::TemplateSyntax(inner),
            GeneratorError::BadOperator {
                template,
                placeholders,
            } => Self::BadOperator {
                template,
                placeholders,
            },
        }
    }
}

/// Whether bounds are used as given or shrunk for slow builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundsMode {
    #[default]
    Full,
    /// Each bound greater than one is decremented by one.
    Reduced,
}

impl BoundsMode {
    /// Parse a mode name, case-insensitive. Unknown names mean `Full`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "reduced" | "debug" | "quick" | "small" => Self::Reduced,
            _ => Self::Full,
        }
    }

    /// Mode named by `REXHAUST_BOUNDS`, or `Full` when unset.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(BOUNDS_ENV)
            .map(|v| Self::from_str_loose(&v))
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Reduced => "reduced",
        }
    }

    /// Effective bounds under this mode.
    #[must_use]
    pub fn apply(self, bounds: Bounds) -> Bounds {
        match self {
            Self::Full => bounds,
            Self::Reduced => {
                let shrink = |n: usize| if n > 1 { n - 1 } else { n };
                Bounds {
                    max_atoms: shrink(bounds.max_atoms),
                    max_ops: shrink(bounds.max_ops),
                    max_strlen: shrink(bounds.max_strlen),
                }
            }
        }
    }
}

/// Size limits of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub max_atoms: usize,
    pub max_ops: usize,
    pub max_strlen: usize,
}

/// A deterministic random sample: `count` items drawn from `seed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSample {
    pub seed: u64,
    pub count: usize,
}

impl FromStr for RandomSample {
    type Err = ConfigError;

    /// Parses `SEED:COUNT`.
    fn from_str(s: &str) -> Result<Self, ConfigError> {
        let bad = || ConfigError::BadRandomSpec {
            spec: s.to_string(),
        };
        let (seed, count) = s.split_once(':').ok_or_else(bad)?;
        Ok(Self {
            seed: seed.trim().parse().map_err(|_| bad())?,
            count: count.trim().parse().map_err(|_| bad())?,
        })
    }
}

/// Immutable parameters of one exhaustive run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub alphabet: Vec<String>,
    pub ops: Vec<String>,
    pub bounds: Bounds,
    pub str_alphabet: Vec<String>,
    pub wrapper: Option<Template>,
    pub topwrapper: Option<Template>,
    pub random_strings: Option<RandomSample>,
    pub random_regexps: Option<RandomSample>,
}

impl RunConfig {
    #[must_use]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    alphabet: Vec<String>,
    ops: Vec<String>,
    bounds: Option<Bounds>,
    str_alphabet: Vec<String>,
    wrapper: Option<String>,
    topwrapper: Option<String>,
    random_strings: Option<RandomSample>,
    random_regexps: Option<RandomSample>,
}

impl RunConfigBuilder {
    /// Regexp atoms, in enumeration order.
    #[must_use]
    pub fn alphabet<S: Into<String>>(mut self, atoms: impl IntoIterator<Item = S>) -> Self {
        self.alphabet = atoms.into_iter().map(Into::into).collect();
        self
    }

    /// Operator templates with one or two `%s`.
    #[must_use]
    pub fn ops<S: Into<String>>(mut self, ops: impl IntoIterator<Item = S>) -> Self {
        self.ops = ops.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Symbols concatenated to form candidate strings.
    #[must_use]
    pub fn str_alphabet<S: Into<String>>(mut self, symbols: impl IntoIterator<Item = S>) -> Self {
        self.str_alphabet = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Template applied to every atom. Empty means none.
    #[must_use]
    pub fn wrapper(mut self, template: impl Into<String>) -> Self {
        self.wrapper = Some(template.into());
        self
    }

    /// Template applied once to every composed regexp. Empty means none.
    #[must_use]
    pub fn topwrapper(mut self, template: impl Into<String>) -> Self {
        self.topwrapper = Some(template.into());
        self
    }

    #[must_use]
    pub fn random_strings(mut self, sample: Option<RandomSample>) -> Self {
        self.random_strings = sample;
        self
    }

    #[must_use]
    pub fn random_regexps(mut self, sample: Option<RandomSample>) -> Self {
        self.random_regexps = sample;
        self
    }

    pub fn build(self) -> Result<RunConfig, ConfigError> {
        if self.alphabet.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        for op in &self.ops {
            let placeholders = Template::parse(op)?.placeholders();
            if !(1..=2).contains(&placeholders) {
                return Err(ConfigError::BadOperator {
                    template: op.clone(),
                    placeholders,
                });
            }
        }
        Ok(RunConfig {
            alphabet: self.alphabet,
            ops: self.ops,
            bounds: self.bounds.unwrap_or(Bounds {
                max_atoms: 1,
                max_ops: 0,
                max_strlen: 0,
            }),
            str_alphabet: self.str_alphabet,
            wrapper: wrapping_template(self.wrapper)?,
            topwrapper: wrapping_template(self.topwrapper)?,
            random_strings: self.random_strings,
            random_regexps: self.random_regexps,
        })
    }
}

fn wrapping_template(source: Option<String>) -> Result<Option<Template>, ConfigError> {
    let Some(source) = source.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let template = Template::parse(&source)?;
    if template.placeholders() != 1 {
        return Err(ConfigError::BadTemplate {
            template: source,
            placeholders: template.placeholders(),
        });
    }
    Ok(Some(template))
}

/// Knobs that shape a run without changing what is enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Print each regexp to the progress writer as it is tested.
    pub show_regexps: bool,
    /// Stop testing a regexp after this many strings break it.
    pub max_bad_inputs: u64,
    pub bounds: BoundsMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            show_regexps: false,
            max_bad_inputs: 1,
            bounds: BoundsMode::Full,
        }
    }
}
