//! Intermediary representation (ir) for parsed grammar text.

use crate::multiplicity::{EbnfOperator, EbnfSuffix};

use peg::parser;

#[derive(Debug)]
pub(crate) struct GrammarIr {
    /// From the `grammar <Name>;` header; absent when the source has none.
    pub(crate) name: Option<String>,
    pub(crate) rules: Vec<(String, Expr)>,
}

#[derive(Debug)]
pub(crate) enum Expr {
    Alts(Vec<Expr>),
    Seq(Vec<Expr>),
    Suffixed(Box<Expr>, EbnfSuffix),
    Ref(String),
    Literal(String),
    Class(String),
    NotClass(String),
    Range(char, char),
    Any,
    Group(Box<Expr>),
    Empty,
}

/// Escapes a single character for use inside a `[...]` set body.
fn class_escape(c: char) -> String {
    match c {
        '\\' | ']' | '[' | '^' | '-' | '&' | '~' => format!("\\{}", c),
        _ => c.to_string(),
    }
}

parser! {
/// Parses the supported `.g4` subset: combined or split lexer/parser
/// grammars, rules with alternatives and EBNF suffixes, quoted literals,
/// character sets, ranges, the wildcard, `fragment` modifiers and (ignored)
/// lexer commands. Grammar parsing is off the hot path, so this favors
/// clarity over speed.
pub(crate) grammar g4() for str {
    pub(crate) rule grammar_file() -> GrammarIr
        = _ h:header()? _ rs:(rule_def() ** _) _ ![_] {
            GrammarIr { name: h, rules: rs }
        }

    rule header() -> String
        = "lexer" __ "grammar" __ n:ident() _ ";" { n }
        / "parser" __ "grammar" __ n:ident() _ ";" { n }
        / "grammar" __ n:ident() _ ";" { n }

    rule rule_def() -> (String, Expr)
        = ("fragment" __)? n:ident() _ ":" _ b:alt_list() _ command()? ";" { (n, b) }

    rule alt_list() -> Expr
        = l:(alternative() ** (_ "|" _)) { Expr::Alts(l) }

    rule alternative() -> Expr
        = l:(element() ++ _) {
            let mut l = l;
            if l.len() == 1 {
                match l.pop() {
                    Some(e) => e,
                    None => Expr::Empty,
                }
            } else {
                Expr::Seq(l)
            }
        }
        / "" { Expr::Empty }

    rule element() -> Expr
        = a:atom() _ s:suffix()? {
            match s {
                Some(s) => Expr::Suffixed(Box::new(a), s),
                None => a,
            }
        }

    rule suffix() -> EbnfSuffix
        = "?" r:reluctant_marker() { EbnfSuffix::of(EbnfOperator::Optional, r) }
        / "*" r:reluctant_marker() { EbnfSuffix::of(EbnfOperator::ZeroOrMore, r) }
        / "+" r:reluctant_marker() { EbnfSuffix::of(EbnfOperator::OneOrMore, r) }

    rule reluctant_marker() -> bool
        = "?" { true }
        / "" { false }

    rule atom() -> Expr
        = r:char_range() { r }
        / "~" _ "[" s:class_body() "]" { Expr::NotClass(s) }
        / "~" _ c:char_literal() { Expr::NotClass(class_escape(c)) }
        / "[" s:class_body() "]" { Expr::Class(s) }
        / "." { Expr::Any }
        / s:str_literal() { Expr::Literal(s) }
        / "(" _ b:alt_list() _ ")" { Expr::Group(Box::new(b)) }
        / n:ident() { Expr::Ref(n) }

    rule char_range() -> Expr
        = a:char_literal() _ ".." _ b:char_literal() { Expr::Range(a, b) }

    rule char_literal() -> char
        = "'" c:literal_char() "'" { c }

    rule str_literal() -> String
        = "'" s:literal_char()* "'" { s.into_iter().collect() }

    rule literal_char() -> char
        = escape_char()
        / c:[^ '\'' | '\\'] { c }

    // checks for the escape characters ANTLR literals allow
    rule escape_char() -> char
        = "\\n" { '\n' }
        / "\\r" { '\r' }
        / "\\t" { '\t' }
        / "\\b" { '\u{8}' }
        / "\\f" { '\u{c}' }
        / "\\\\" { '\\' }
        / "\\'" { '\'' }
        / "\\\"" { '"' }
        / "\\u" value:$(['0'..='9' | 'a'..='f' | 'A'..='F']*<4>) {?
              u32::from_str_radix(value, 16).ok().and_then(char::from_u32).ok_or("valid unicode code point")
          }
        / expected!("valid escape sequence")

    rule class_body() -> String
        = s:$(class_char()*) { s.to_string() }

    rule class_char()
        = "\\" [_] {}
        / [^ ']'] {}

    // lexer commands steer a real lexer, not generation; parsed and dropped
    rule command()
        = "->" _ lexer_command() (_ "," _ lexer_command())* _

    rule lexer_command()
        = ident() (_ "(" _ ident() _ ")")? {}

    rule ident() -> String
        = s:$(['a'..='z' | 'A'..='Z' | '_'] ['a'..='z' | 'A'..='Z' | '_' | '0'..='9']*) { s.to_string() }

    rule ws_unit()
        = [' ' | '\t' | '\r' | '\n'] {}
        / "//" [^ '\n']* {}
        / "/*" (!"*/" [_])* "*/" {}

    rule _ = quiet!{ ws_unit()* }
    rule __ = quiet!{ ws_unit() _ }
}}
