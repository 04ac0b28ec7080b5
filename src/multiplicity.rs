//! EBNF quantifier suffixes and their bounded repetition semantics.

use crate::error::ErrorRepr;
use crate::Error;

use rand::Rng;
use std::fmt;

/// The base operation of an EBNF suffix: `?`, `*` or `+`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, enum_iterator::Sequence)]
pub enum EbnfOperator {
    Optional,
    ZeroOrMore,
    OneOrMore,
}

impl EbnfOperator {
    pub(crate) const fn as_str(&self) -> &'static str {
        match self {
            Self::Optional => "?",
            Self::ZeroOrMore => "*",
            Self::OneOrMore => "+",
        }
    }
}

/// An EBNF quantifier as written in the grammar: a base operation plus an
/// optional reluctant marker, e.g. `*` or `*?`.
///
/// The reluctant marker changes how a real lexer matches input; it does not
/// change what the quantifier can derive, so generation treats `*` and `*?`
/// identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EbnfSuffix {
    op: EbnfOperator,
    reluctant: bool,
}

impl EbnfSuffix {
    /// A missing base operation is a configuration error: a bare reluctant
    /// marker does not name a quantifier.
    pub fn new(op: Option<EbnfOperator>, reluctant: bool) -> Result<Self, Error> {
        match op {
            Some(op) => Ok(Self { op, reluctant }),
            None => Err(Error(ErrorRepr::MissingSuffixOp)),
        }
    }

    pub(crate) const fn of(op: EbnfOperator, reluctant: bool) -> Self {
        Self { op, reluctant }
    }

    pub(crate) fn multiplier(&self) -> Multiplier {
        match self.op {
            EbnfOperator::Optional => Multiplier::ZeroOrOne,
            EbnfOperator::ZeroOrMore => Multiplier::ZeroOrMore,
            EbnfOperator::OneOrMore => Multiplier::OneOrMore,
        }
    }
}

impl fmt::Display for EbnfSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), if self.reluctant { "?" } else { "" })
    }
}

/// How many renderings of a sub-rule an element produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Multiplier {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Multiplier {
    pub(crate) fn from_suffix(suffix: Option<&EbnfSuffix>) -> Self {
        match suffix {
            None => Self::One,
            Some(s) => s.multiplier(),
        }
    }

    /// Draws a repetition count. `limit` caps the open-ended quantifiers so
    /// output size stays bounded independent of grammar shape.
    pub(crate) fn count<R: Rng>(&self, rng: &mut R, limit: u32) -> u32 {
        match self {
            Self::One => 1,
            Self::ZeroOrOne => rng.random::<bool>() as u32,
            Self::ZeroOrMore => rng.random_range(0..=limit),
            Self::OneOrMore => rng.random_range(1..=limit.max(1)),
        }
    }
}
