//! Exhaustive and seeded-random regexp enumeration.
//!
//! Regexps are built as postfix programs over atoms and operator templates.
//! Every program that reduces to exactly one expression is rendered by
//! substituting operands into the operator template and wrapping the result
//! in `(?:...)`, so operator precedence never depends on the template text.

use thiserror::Error;

use super::rng::XorShift64;
use super::template::{Template, TemplateError};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("operator {template:?} must take 1 or 2 arguments, has {placeholders}")]
    BadOperator {
        template: String,
        placeholders: usize,
    },
}

/// Basic egrep operators: concatenation, alternation, star, plus, quest.
const EGREP_OPS: [&str; 5] = ["%s%s", "%s|%s", "%s*", "%s+", "%s?"];

/// Moves tried by one frame of a random program before it gives up.
const MAX_RANDOM_STEPS: usize = 4096;

#[derive(Debug, Clone, Copy)]
enum Token<'a> {
    Atom(&'a str),
    Op(&'a Template),
}

/// Enumerates every regexp with at most `max_atoms` atoms and `max_ops`
/// operators. Enumeration order is fixed by the order of atoms and ops, so
/// two calls to [`RegexpGenerator::generate`] yield the same sequence.
#[derive(Debug, Clone)]
pub struct RegexpGenerator {
    max_atoms: usize,
    max_ops: usize,
    atoms: Vec<String>,
    ops: Vec<Template>,
}

impl RegexpGenerator {
    pub fn new<S: AsRef<str>>(
        max_atoms: usize,
        max_ops: usize,
        atoms: Vec<String>,
        ops: &[S],
    ) -> Result<Self, GeneratorError> {
        let ops = ops
            .iter()
            .map(|op| {
                let template = Template::parse(op.as_ref())?;
                match template.placeholders() {
                    1 | 2 => Ok(template),
                    placeholders => Err(GeneratorError::BadOperator {
                        template: op.as_ref().to_string(),
                        placeholders,
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            max_atoms,
            max_ops,
            atoms,
            ops,
        })
    }

    /// The basic egrep operator set.
    #[must_use]
    pub fn egrep_ops() -> Vec<String> {
        EGREP_OPS.iter().map(|op| (*op).to_string()).collect()
    }

    /// Call `handle` once for every regexp within the bounds.
    pub fn generate<E>(
        &self,
        handle: &mut dyn FnMut(&str) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut postfix = Vec::new();
        self.generate_postfix(&mut postfix, 0, 0, 0, handle)
    }

    fn generate_postfix<'a, E>(
        &'a self,
        postfix: &mut Vec<Token<'a>>,
        nstk: usize,
        ops: usize,
        atoms: usize,
        handle: &mut dyn FnMut(&str) -> Result<(), E>,
    ) -> Result<(), E> {
        if nstk == 1 {
            self.run_postfix(postfix, handle)?;
        }

        // Give up once the binary operators still needed to reduce the
        // stack to one expression would exceed the operator budget.
        if ops + nstk > self.max_ops + 1 {
            return Ok(());
        }

        if atoms < self.max_atoms {
            for atom in &self.atoms {
                postfix.push(Token::Atom(atom));
                self.generate_postfix(postfix, nstk + 1, ops, atoms + 1, handle)?;
                postfix.pop();
            }
        }

        if ops < self.max_ops {
            for op in &self.ops {
                let nargs = op.placeholders();
                if nargs <= nstk {
                    postfix.push(Token::Op(op));
                    self.generate_postfix(postfix, nstk - nargs + 1, ops + 1, atoms, handle)?;
                    postfix.pop();
                }
            }
        }
        Ok(())
    }

    /// Call `handle` for `count` random regexps drawn deterministically
    /// from `seed`.
    pub fn generate_random<E>(
        &self,
        seed: u64,
        count: usize,
        handle: &mut dyn FnMut(&str) -> Result<(), E>,
    ) -> Result<(), E> {
        if self.atoms.is_empty() || self.max_atoms == 0 {
            return Ok(());
        }
        let mut rng = XorShift64::new(seed);
        for _ in 0..count {
            let mut postfix = Vec::new();
            self.generate_random_postfix(&mut rng, &mut postfix, 0, 0, 0, handle)?;
        }
        Ok(())
    }

    /// Whether a program with `nstk` expressions on the stack can still be
    /// reduced to one expression within the remaining budgets.
    fn can_finish(&self, nstk: usize, ops: usize, atoms: usize) -> bool {
        match nstk {
            0 => atoms < self.max_atoms && !self.atoms.is_empty(),
            1 => true,
            n => {
                self.ops.iter().any(|op| op.placeholders() == 2)
                    && n - 1 <= self.max_ops.saturating_sub(ops)
            }
        }
    }

    /// Returns `Ok(true)` once a regexp has been emitted, `Ok(false)` when
    /// this branch cannot produce one.
    fn generate_random_postfix<'a, E>(
        &'a self,
        rng: &mut XorShift64,
        postfix: &mut Vec<Token<'a>>,
        nstk: usize,
        ops: usize,
        atoms: usize,
        handle: &mut dyn FnMut(&str) -> Result<(), E>,
    ) -> Result<bool, E> {
        if !self.can_finish(nstk, ops, atoms) {
            return Ok(false);
        }
        for _ in 0..MAX_RANDOM_STEPS {
            // Stop at a single expression, but only sometimes.
            if nstk == 1 && rng.gen_range_usize(0, self.max_atoms - atoms) == 0 {
                self.run_postfix(postfix, handle)?;
                return Ok(true);
            }

            if ops < self.max_ops && !self.ops.is_empty() && rng.gen_bool() {
                let op = &self.ops[rng.gen_range_usize(0, self.ops.len() - 1)];
                let nargs = op.placeholders();
                if nargs <= nstk {
                    postfix.push(Token::Op(op));
                    let done = self.generate_random_postfix(
                        rng,
                        postfix,
                        nstk - nargs + 1,
                        ops + 1,
                        atoms,
                        handle,
                    )?;
                    postfix.pop();
                    if done {
                        return Ok(true);
                    }
                }
            }

            if atoms < self.max_atoms && rng.gen_bool() {
                let atom = &self.atoms[rng.gen_range_usize(0, self.atoms.len() - 1)];
                postfix.push(Token::Atom(atom));
                let done =
                    self.generate_random_postfix(rng, postfix, nstk + 1, ops, atoms + 1, handle)?;
                postfix.pop();
                if done {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn run_postfix<E>(
        &self,
        postfix: &[Token<'_>],
        handle: &mut dyn FnMut(&str) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut stack: Vec<String> = Vec::new();
        for token in postfix {
            match *token {
                Token::Atom(atom) => stack.push(atom.to_string()),
                Token::Op(op) => {
                    let nargs = op.placeholders();
                    if stack.len() < nargs {
                        debug_assert!(false, "postfix underflow for {}", op.source());
                        return Ok(());
                    }
                    let args = stack.split_off(stack.len() - nargs);
                    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
                    match op.apply(&refs) {
                        Ok(expanded) => stack.push(format!("(?:{expanded})")),
                        Err(_) => return Ok(()),
                    }
                }
            }
        }
        match stack.as_slice() {
            [regexp] => handle(regexp),
            _ => {
                debug_assert!(false, "postfix left {} expressions", stack.len());
                Ok(())
            }
        }
    }
}
