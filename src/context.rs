//! Per-call generation state.
//!
//! One [`Context`] is allocated per top-level generate call and never shared
//! across independent calls. The rule tree itself carries no request-scoped
//! state, so independent calls may run concurrently as long as each owns its
//! own context.

use crate::convergence::Convergence;
use crate::error::ErrorRepr;
use crate::Error;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Tuning values threaded through a [`Context`] at construction, so multiple
/// grammars or tuning profiles can coexist in one process.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Upper bound on the repetition count drawn for `*` and `+`.
    pub max_repeat: u32,
    /// Multiplicative decay in `(0, 1)` applied to a chosen alternative's
    /// weight. Smaller values terminate recursion faster but reduce depth.
    pub convergence_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_repeat: 5,
            convergence_factor: 0.5,
        }
    }
}

/// Mutable state for one generation call: the seeded random source, the
/// active rule-reference path, the scope stack and the choosing strategy.
pub struct Context {
    pub(crate) rng: StdRng,
    pub(crate) config: Config,
    strategy: Convergence,
    path: Vec<PathFrame>,
    scopes: Vec<ScopeFrame>,
    emitted: usize,
}

/// One in-flight rule reference. `emitted_at_entry` snapshots the output
/// length so re-entry can be classified as productive or not.
struct PathFrame {
    rule: String,
    emitted_at_entry: usize,
}

struct ScopeFrame {
    lexer: bool,
}

impl Context {
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, Config::default())
    }

    pub fn with_config(seed: u64, config: Config) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            strategy: Convergence::new(config.convergence_factor),
            config,
            path: Vec::new(),
            scopes: Vec::new(),
            emitted: 0,
        }
    }

    /// Picks one of `children` alternatives at the decision point `parent`.
    pub(crate) fn choose(&mut self, parent: usize, children: usize) -> usize {
        self.strategy.choose(parent, children, &mut self.rng)
    }

    /// Runs `f` under a fork of the choosing strategy. Decay recorded inside
    /// the fork never bleeds into sibling branches.
    pub(crate) fn forked<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let fork = self.strategy.copy();
        let saved = std::mem::replace(&mut self.strategy, fork);
        let out = f(self);
        self.strategy = saved;
        out
    }

    /// Pushes `name` onto the active reference path. Fails if `name` is
    /// already active with nothing emitted since its last entry: such a
    /// cycle can never produce text and would otherwise recurse forever.
    pub(crate) fn enter_rule(&mut self, name: &str) -> Result<(), Error> {
        let unproductive = self
            .path
            .iter()
            .any(|frame| frame.rule == name && frame.emitted_at_entry == self.emitted);
        if unproductive {
            let mut chain: Vec<String> = self.path.iter().map(|f| f.rule.clone()).collect();
            chain.push(name.to_string());
            return Err(Error(ErrorRepr::Recursion(chain)));
        }
        self.path.push(PathFrame {
            rule: name.to_string(),
            emitted_at_entry: self.emitted,
        });
        Ok(())
    }

    /// Must be called on every exit path of the reference entered last.
    pub(crate) fn leave_rule(&mut self) {
        self.path.pop();
    }

    pub(crate) fn push_scope(&mut self, lexer: bool) {
        self.scopes.push(ScopeFrame { lexer });
    }

    /// Must be called on every exit path of the rule that pushed the scope,
    /// including failure.
    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// `true` while generating inside a lexer (token) rule.
    pub(crate) fn in_lexer_scope(&self) -> bool {
        self.scopes.last().is_some_and(|s| s.lexer)
    }

    /// Records `chars` characters of output. This is the recursion guard's
    /// productivity signal.
    pub(crate) fn note_emitted(&mut self, chars: usize) {
        self.emitted += chars;
    }
}
