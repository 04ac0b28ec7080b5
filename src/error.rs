use std::collections::HashSet;
use std::fmt;

/// The type of error that can occur when loading a grammar or generating a sentence.
#[derive(Debug, PartialEq)]
pub struct Error(pub(crate) ErrorRepr);

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.0 {
            ErrorRepr::Grammar(e) => Some(e),
            ErrorRepr::Class(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum ErrorRepr {
    Grammar(peg::error::ParseError<peg::str::LineCol>),
    Class(regex_syntax::Error),
    EmptyClass(String),
    MissingGrammarName,
    DuplicateRules(HashSet<String>),
    UnknownRule(String, Vec<String>),
    EmptyAltList(String),
    MissingSuffixOp,
    Recursion(Vec<String>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ErrorRepr::Grammar(e) => e.fmt(f),
            ErrorRepr::Class(e) => e.fmt(f),
            ErrorRepr::EmptyClass(e) => write!(f, "Character set matches nothing: {}", e),
            ErrorRepr::MissingGrammarName => {
                write!(f, "Grammar name not found in source text (expected `grammar <Name>;`)")
            }
            ErrorRepr::DuplicateRules(e) => write!(f, "Duplicate rule definitions: {:?}", e),
            ErrorRepr::UnknownRule(name, chain) => {
                if chain.is_empty() {
                    write!(f, "Unknown rule reference: {}", name)
                } else {
                    write!(
                        f,
                        "Unknown rule reference: {} (while producing {})",
                        name,
                        chain.join(" > ")
                    )
                }
            }
            ErrorRepr::EmptyAltList(e) => write!(f, "Rule {} has no alternatives", e),
            ErrorRepr::MissingSuffixOp => write!(f, "EBNF suffix without a base operation"),
            ErrorRepr::Recursion(chain) => {
                write!(f, "Unproductive recursion: {}", chain.join(" -> "))
            }
        }
    }
}
