use crate::charset::CharSet;
use crate::context::Context;
use crate::error::ErrorRepr;
use crate::ir::{self, GrammarIr};
use crate::multiplicity::{EbnfSuffix, Multiplier};
use crate::text::Text;
use crate::Error;

use fxhash::FxHashMap;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub(crate) type NodeId = usize;

/// The rule-name registry and generation entry point.
///
/// # Implementation
/// ## Construction
/// An `Unparser` is built from one or more grammar source texts sharing a
/// single token namespace (a combined grammar, or a split lexer/parser
/// pair):
/// - A peg parser converts each source into an "intermediary representation"
///   AST (in ir.rs).
/// - The IRs are validated for missing grammar names and duplicate rule
///   definitions across all sources.
/// - The IR is lowered into an arena of rule-tree nodes; character sets are
///   compiled and rule definitions are indexed by name.
///
/// The rule tree is immutable once construction completes. No node carries
/// request-scoped state, so one `Unparser` can serve concurrent generation
/// calls as long as each call owns its own [`Context`].
///
/// ## Generation
/// [`Unparser::generate`] resolves the top rule name and recursively renders
/// the tree: the context's choosing strategy picks alternatives (decaying
/// each taken path), quantified elements draw bounded repetition counts, and
/// rule references are re-resolved against the registry on every visit with
/// an unproductive-cycle guard on the active path.
#[derive(Debug)]
pub struct Unparser {
    nodes: Vec<Node>,
    // parent of each node, used only to print production chains in errors
    parents: Vec<Option<NodeId>>,
    registry: FxHashMap<String, NodeId>,
    // definitions in declaration order, for Display
    order: Vec<NodeId>,
    grammar_names: Vec<String>,
}

#[derive(Debug)]
enum Node {
    Definition { name: String, alts: NodeId },
    AltList(Vec<NodeId>),
    Sequence(Vec<NodeId>),
    Element { inner: NodeId, suffix: Option<EbnfSuffix> },
    Ruleref(String),
    Literal(String),
    CharSet(CharSet),
    Block(NodeId),
    Empty,
}

impl FromStr for Unparser {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_sources(&[s])
    }
}

impl Unparser {
    /// Builds the merged registry for one or more grammar sources. Every
    /// source must declare a `grammar <Name>;` header; rule names must be
    /// unique across all sources.
    pub fn from_sources(sources: &[&str]) -> Result<Self, Error> {
        let irs = sources
            .iter()
            .map(|s| ir::g4::grammar_file(s).map_err(|e| Error(ErrorRepr::Grammar(e))))
            .collect::<Result<Vec<_>, _>>()?;
        Self::try_from_irs(irs)
    }

    pub(crate) fn try_from_irs(irs: Vec<GrammarIr>) -> Result<Self, Error> {
        let mut grammar_names = Vec::with_capacity(irs.len());
        for g in &irs {
            match &g.name {
                Some(name) => grammar_names.push(name.clone()),
                None => return Err(Error(ErrorRepr::MissingGrammarName)),
            }
        }

        let rule_names: Vec<&String> = irs.iter().flat_map(|g| g.rules.iter()).map(|(n, _)| n).collect();
        if let Some(dups) = find_duplicates(&rule_names) {
            return Err(Error(ErrorRepr::DuplicateRules(dups)));
        }

        let mut this = Self {
            nodes: Vec::new(),
            parents: Vec::new(),
            registry: FxHashMap::default(),
            order: Vec::new(),
            grammar_names,
        };
        for g in irs {
            for (name, body) in g.rules {
                // the definition node is pushed first so its body can point
                // back to it, then patched with the body's id
                let def = this.push(Node::Empty, None);
                let alts = this.build(body, def, &name)?;
                this.nodes[def] = Node::Definition { name: name.clone(), alts };
                this.registry.insert(name, def);
                this.order.push(def);
            }
        }
        Ok(this)
    }

    /// The names declared in the `grammar <Name>;` headers, in source order.
    pub fn grammar_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.grammar_names.iter().map(String::as_str)
    }

    /// The declared rule names, in declaration order across all sources.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().filter_map(|id| match &self.nodes[*id] {
            Node::Definition { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Generates one sentence derivable from `top`, using a fresh context
    /// seeded with `seed`. Deterministic for a fixed grammar and seed.
    pub fn generate(&self, top: &str, seed: u64) -> Result<String, Error> {
        let mut ctx = Context::new(seed);
        Ok(self.generate_text(top, &mut ctx)?.flatten())
    }

    /// Like [`Unparser::generate`], but renders under a caller-supplied
    /// context and returns the structural production tree behind the string.
    pub fn generate_text(&self, top: &str, ctx: &mut Context) -> Result<Text, Error> {
        match self.registry.get(top) {
            Some(id) => self.render(*id, ctx),
            None => Err(Error(ErrorRepr::UnknownRule(top.to_string(), Vec::new()))),
        }
    }

    fn render(&self, id: NodeId, ctx: &mut Context) -> Result<Text, Error> {
        match &self.nodes[id] {
            Node::Definition { name, alts } => {
                let nested_in_token = ctx.in_lexer_scope();
                let lexer = name.starts_with(|c: char| c.is_uppercase());
                ctx.push_scope(lexer);
                let result = self.render(*alts, ctx);
                // the scope is released before any error propagates
                ctx.pop_scope();
                let body = result?;
                if nested_in_token {
                    // token internals are not interesting productions; the
                    // enclosing token flattens them into one fragment
                    Ok(body)
                } else if lexer {
                    Ok(Text::labeled(name, vec![Text::leaf(body.flatten())]))
                } else {
                    Ok(Text::labeled(name, vec![body]))
                }
            }
            Node::AltList(alts) => {
                // construction guarantees at least one alternative
                let chosen = if alts.len() == 1 {
                    0
                } else {
                    ctx.choose(id, alts.len())
                };
                self.render(alts[chosen], ctx)
            }
            Node::Sequence(items) => {
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    children.push(ctx.forked(|c| self.render(*item, c))?);
                }
                Ok(Text::seq(children))
            }
            Node::Element { inner, suffix } => {
                let reps = Multiplier::from_suffix(suffix.as_ref())
                    .count(&mut ctx.rng, ctx.config.max_repeat);
                let mut children = Vec::with_capacity(reps as usize);
                for _ in 0..reps {
                    children.push(ctx.forked(|c| self.render(*inner, c))?);
                }
                Ok(Text::seq(children))
            }
            Node::Ruleref(name) => {
                let target = match self.registry.get(name) {
                    Some(target) => *target,
                    None => {
                        return Err(Error(ErrorRepr::UnknownRule(
                            name.clone(),
                            self.production_chain(id),
                        )))
                    }
                };
                ctx.enter_rule(name)?;
                let result = self.render(target, ctx);
                // popped on success and failure alike
                ctx.leave_rule();
                result
            }
            Node::Literal(s) => {
                ctx.note_emitted(s.chars().count());
                Ok(Text::leaf(s.clone()))
            }
            Node::CharSet(set) => {
                let c = set.sample(&mut ctx.rng);
                ctx.note_emitted(1);
                Ok(Text::leaf(c.to_string()))
            }
            Node::Block(inner) => self.render(*inner, ctx),
            Node::Empty => Ok(Text::empty()),
        }
    }

    /// Lowers one IR expression into arena nodes, recording parents.
    /// This is the only place nodes are appended; the tree is read-only
    /// afterwards.
    fn build(&mut self, expr: ir::Expr, parent: NodeId, rule: &str) -> Result<NodeId, Error> {
        Ok(match expr {
            ir::Expr::Alts(alts) => {
                if alts.is_empty() {
                    return Err(Error(ErrorRepr::EmptyAltList(rule.to_string())));
                }
                let id = self.push(Node::AltList(Vec::new()), Some(parent));
                let children = alts
                    .into_iter()
                    .map(|a| self.build(a, id, rule))
                    .collect::<Result<Vec<_>, _>>()?;
                self.nodes[id] = Node::AltList(children);
                id
            }
            ir::Expr::Seq(items) => {
                let id = self.push(Node::Sequence(Vec::new()), Some(parent));
                let children = items
                    .into_iter()
                    .map(|e| self.build(e, id, rule))
                    .collect::<Result<Vec<_>, _>>()?;
                self.nodes[id] = Node::Sequence(children);
                id
            }
            ir::Expr::Suffixed(inner, suffix) => {
                let id = self.push(Node::Element { inner: 0, suffix: Some(suffix) }, Some(parent));
                let child = self.build(*inner, id, rule)?;
                self.nodes[id] = Node::Element { inner: child, suffix: Some(suffix) };
                id
            }
            ir::Expr::Ref(name) => self.push(Node::Ruleref(name), Some(parent)),
            ir::Expr::Literal(s) => self.push(Node::Literal(s), Some(parent)),
            ir::Expr::Class(body) => {
                let set = CharSet::from_class(&body, false)?;
                self.push(Node::CharSet(set), Some(parent))
            }
            ir::Expr::NotClass(body) => {
                let set = CharSet::from_class(&body, true)?;
                self.push(Node::CharSet(set), Some(parent))
            }
            ir::Expr::Range(lo, hi) => {
                let set = CharSet::from_range(lo, hi)?;
                self.push(Node::CharSet(set), Some(parent))
            }
            ir::Expr::Any => self.push(Node::CharSet(CharSet::any()), Some(parent)),
            ir::Expr::Group(inner) => {
                let id = self.push(Node::Block(0), Some(parent));
                let child = self.build(*inner, id, rule)?;
                self.nodes[id] = Node::Block(child);
                id
            }
            ir::Expr::Empty => self.push(Node::Empty, Some(parent)),
        })
    }

    fn push(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
        self.nodes.push(node);
        self.parents.push(parent);
        self.nodes.len() - 1
    }

    /// The chain of definition names leading to `id`, outermost first.
    /// Walks the parent side-table; never used for anything but diagnostics.
    fn production_chain(&self, id: NodeId) -> Vec<String> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(at) = cursor {
            if let Node::Definition { name, .. } = &self.nodes[at] {
                chain.push(name.clone());
            }
            cursor = self.parents[at];
        }
        chain.reverse();
        chain
    }

    fn source_of(&self, id: NodeId) -> String {
        match &self.nodes[id] {
            Node::Definition { name, .. } => name.clone(),
            Node::AltList(alts) => alts
                .iter()
                .map(|a| self.source_of(*a))
                .collect::<Vec<_>>()
                .join(" | "),
            Node::Sequence(items) => items
                .iter()
                .map(|e| self.source_of(*e))
                .collect::<Vec<_>>()
                .join(" "),
            Node::Element { inner, suffix } => match suffix {
                Some(suffix) => format!("{}{}", self.source_of(*inner), suffix),
                None => self.source_of(*inner),
            },
            Node::Ruleref(name) => name.clone(),
            Node::Literal(s) => format!("'{}'", literal_escape(s)),
            Node::CharSet(set) => set.to_string(),
            Node::Block(inner) => format!("({})", self.source_of(*inner)),
            Node::Empty => String::new(),
        }
    }
}

/// Pretty prints the compiled rules in grammar notation. Helpful to check
/// that the rule tree matches what was meant in the un-parsed source.
impl fmt::Display for Unparser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        for def in &self.order {
            if let Node::Definition { name, alts } = &self.nodes[*def] {
                writeln!(f, "{} : {} ;", name, self.source_of(*alts))?;
            }
        }
        Ok(())
    }
}

fn literal_escape(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\n' => "\\n".to_string(),
            '\r' => "\\r".to_string(),
            '\t' => "\\t".to_string(),
            '\\' => "\\\\".to_string(),
            '\'' => "\\'".to_string(),
            c => c.to_string(),
        })
        .collect()
}

fn find_duplicates(names: &[&String]) -> Option<HashSet<String>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut dups: HashSet<String> = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            dups.insert(name.to_string());
        }
    }
    (!dups.is_empty()).then_some(dups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catches_duplicates() {
        for src in [
            "grammar G; x : y ; x : z ; y : 'a' ; z : 'b' ;",
            "grammar G; x : 'a' ; x : x ;",
        ] {
            let result: Error = src.parse::<Unparser>().unwrap_err();
            assert_eq!(
                result,
                Error(ErrorRepr::DuplicateRules(["x".into()].into_iter().collect()))
            );
        }
    }

    #[test]
    fn catches_duplicates_across_sources() {
        let parser = "parser grammar P; expr : INT ; ";
        let lexer = "lexer grammar L; INT : [0-9]+ ; expr : 'x' ;";
        let result = Unparser::from_sources(&[parser, lexer]).unwrap_err();
        assert_eq!(
            result,
            Error(ErrorRepr::DuplicateRules(["expr".into()].into_iter().collect()))
        );
    }

    #[test]
    fn requires_a_grammar_name() {
        let result: Error = "expr : 'a' ;".parse::<Unparser>().unwrap_err();
        assert_eq!(result, Error(ErrorRepr::MissingGrammarName));
    }

    #[test]
    fn rejects_empty_alt_lists() {
        let irs = vec![GrammarIr {
            name: Some("G".into()),
            rules: vec![("a".into(), ir::Expr::Alts(Vec::new()))],
        }];
        let result = Unparser::try_from_irs(irs).unwrap_err();
        assert_eq!(result, Error(ErrorRepr::EmptyAltList("a".into())));
    }

    #[test]
    fn unknown_top_rule_fails_fast() {
        let unparser: Unparser = "grammar G; a : 'x' ;".parse().unwrap();
        let result = unparser.generate("zzz", 0).unwrap_err();
        assert_eq!(result, Error(ErrorRepr::UnknownRule("zzz".into(), Vec::new())));
    }

    #[test]
    fn unknown_reference_carries_the_production_chain() {
        let unparser: Unparser = "grammar G; a : b ; b : missing ;".parse().unwrap();
        let result = unparser.generate("a", 0).unwrap_err();
        assert_eq!(
            result,
            Error(ErrorRepr::UnknownRule(
                "missing".into(),
                vec!["b".into()]
            ))
        );
    }

    #[test]
    fn immediate_self_reference_is_a_recursion_error() {
        let unparser: Unparser = "grammar G; a : a ;".parse().unwrap();
        for seed in 0..10 {
            let result = unparser.generate("a", seed).unwrap_err();
            assert_eq!(
                result,
                Error(ErrorRepr::Recursion(vec!["a".into(), "a".into()]))
            );
        }
    }

    #[test]
    fn indirect_unproductive_cycle_is_caught() {
        let unparser: Unparser = "grammar G; a : b ; b : c ; c : a ;".parse().unwrap();
        let result = unparser.generate("a", 0).unwrap_err();
        assert_eq!(
            result,
            Error(ErrorRepr::Recursion(vec![
                "b".into(),
                "c".into(),
                "a".into(),
                "b".into()
            ]))
        );
    }

    #[test]
    fn productive_recursion_is_allowed() {
        // the '(' is emitted before expr is re-entered, so every path
        // through this grammar is productive and generation always succeeds
        let unparser: Unparser = r#"
            grammar Math;
            expr   : num | '(' expr symbol expr ')' ;
            symbol : '+' | '-' | '*' | '/' ;
            num    : [0-9] ;
        "#
        .parse()
        .unwrap();
        for seed in 0..100 {
            let sentence = unparser.generate("expr", seed).unwrap();
            assert!(!sentence.is_empty());
        }
    }

    #[test]
    fn left_recursion_terminates_one_way_or_the_other() {
        // re-entering expr before any text is emitted trips the recursion
        // guard; other seeds descend into num first and succeed. Either
        // way the call returns instead of exhausting the stack.
        let unparser: Unparser = r#"
            grammar Math;
            expr   : num | expr symbol expr ;
            symbol : '+' | '-' ;
            num    : [0-9] ;
        "#
        .parse()
        .unwrap();
        let mut successes = 0;
        for seed in 0..100 {
            match unparser.generate("expr", seed) {
                Ok(sentence) => {
                    successes += 1;
                    assert!(!sentence.is_empty());
                }
                Err(e) => assert!(matches!(e, Error(ErrorRepr::Recursion(_)))),
            }
        }
        assert!(successes > 0);
    }

    #[test]
    fn literals_render_verbatim() {
        let unparser: Unparser = r"grammar G; a : 'x\ny' ;".parse().unwrap();
        assert_eq!(unparser.generate("a", 0).unwrap(), "x\ny");
    }

    #[test]
    fn token_references_resolve_across_sources() {
        let parser = "parser grammar ArithParser; expr : INT '+' INT ;";
        let lexer = "lexer grammar ArithLexer; INT : [0-9] ;";
        let unparser = Unparser::from_sources(&[parser, lexer]).unwrap();
        assert_eq!(
            unparser.grammar_names().collect::<Vec<_>>(),
            ["ArithParser", "ArithLexer"]
        );
        for seed in 0..20 {
            let sentence = unparser.generate("expr", seed).unwrap();
            assert_eq!(sentence.len(), 3);
            assert_eq!(&sentence[1..2], "+");
        }
    }

    #[test]
    fn rule_names_follow_declaration_order() {
        let unparser: Unparser = "grammar G; b : 'x' ; a : 'y' ;".parse().unwrap();
        assert_eq!(unparser.rule_names().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[test]
    fn display_round_trips_through_the_parser() {
        let unparser: Unparser = r#"
            grammar G;
            expr : term ('+' term)* ;
            term : [0-9]+ | '(' expr ')' ;
        "#
        .parse()
        .unwrap();
        let printed = format!("grammar G; {}", unparser);
        let reparsed: Unparser = printed.parse().unwrap();
        assert_eq!(unparser.to_string(), reparsed.to_string());
    }

    #[test]
    fn display_shows_suffixes_and_alternatives() {
        let unparser: Unparser = "grammar G; a : 'x'? 'y'+? | b ; b : 'z' ;".parse().unwrap();
        let printed = unparser.to_string();
        assert!(printed.contains("'x'? 'y'+? | b"));
        assert!(printed.contains("b : 'z' ;"));
    }

    #[test]
    fn generated_text_labels_parser_rules_and_flattens_tokens() {
        let unparser: Unparser = r#"
            grammar G;
            pair : KEY ':' KEY ;
            KEY  : LETTER LETTER ;
            fragment LETTER : [a-z] ;
        "#
        .parse()
        .unwrap();
        let mut ctx = Context::new(1);
        let text = unparser.generate_text("pair", &mut ctx).unwrap();
        assert_eq!(text.label(), Some("pair"));
        let tree = text.tree();
        assert!(tree.contains("KEY"));
        // LETTER is internal to the KEY token and does not appear
        assert!(!tree.contains("LETTER"));
        let flat = text.flatten();
        assert_eq!(flat.len(), 5);
        assert_eq!(&flat[2..3], ":");
    }

    #[test]
    fn quantifier_repetitions_stay_under_the_limit() {
        let unparser: Unparser = "grammar G; a : 'x'* ;".parse().unwrap();
        let mut lengths = HashSet::new();
        for seed in 0..200 {
            let sentence = unparser.generate("a", seed).unwrap();
            assert!(sentence.len() <= 5);
            lengths.insert(sentence.len());
        }
        assert!(lengths.len() > 1);
    }

    #[test]
    fn empty_alternative_can_produce_nothing() {
        let unparser: Unparser = "grammar G; a : 'x' | ;".parse().unwrap();
        let mut outputs = HashSet::new();
        for seed in 0..50 {
            outputs.insert(unparser.generate("a", seed).unwrap());
        }
        assert_eq!(
            outputs,
            ["".to_string(), "x".to_string()].into_iter().collect()
        );
    }
}
