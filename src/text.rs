//! The structured result of one generation call.
//!
//! A [`Text`] mirrors the productions taken while generating: labeled nodes
//! for rule definitions, leaves for emitted fragments, and unlabeled
//! interior nodes for sequences and repetitions. It flattens to the output
//! string and renders as an indented tree or a DOT document for diagnostics.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    label: Option<String>,
    fragment: Option<String>,
    children: Vec<Text>,
}

impl Text {
    /// The neutral production: flattens to nothing.
    pub(crate) fn empty() -> Self {
        Self {
            label: None,
            fragment: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn leaf(fragment: impl Into<String>) -> Self {
        Self {
            label: None,
            fragment: Some(fragment.into()),
            children: Vec::new(),
        }
    }

    pub(crate) fn labeled(label: &str, children: Vec<Text>) -> Self {
        Self {
            label: Some(label.to_string()),
            fragment: None,
            children,
        }
    }

    pub(crate) fn seq(children: Vec<Text>) -> Self {
        Self {
            label: None,
            fragment: None,
            children,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn children(&self) -> &[Text] {
        &self.children
    }

    /// The generated string: all fragments, in production order.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut String) {
        if let Some(fragment) = &self.fragment {
            out.push_str(fragment);
        }
        for child in &self.children {
            child.flatten_into(out);
        }
    }

    /// An indented production tree. Unlabeled interior nodes do not add
    /// indentation; they exist for structure, not for reading.
    pub fn tree(&self) -> String {
        let mut out = String::new();
        self.tree_into(0, &mut out);
        out
    }

    fn tree_into(&self, depth: usize, out: &mut String) {
        if let Some(label) = &self.label {
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(label);
            out.push('\n');
            for child in &self.children {
                child.tree_into(depth + 1, out);
            }
        } else if let Some(fragment) = &self.fragment {
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(&format!("{:?}\n", fragment));
        } else {
            for child in &self.children {
                child.tree_into(depth, out);
            }
        }
    }

    /// A DOT document of the production tree, for external graph tooling.
    /// Unlabeled interior nodes are skipped; their children attach to the
    /// nearest labeled ancestor.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph text {\n  node [shape=box];\n");
        let mut next_id = 0usize;
        self.dot_into(None, &mut next_id, &mut out);
        out.push_str("}\n");
        out
    }

    fn dot_into(&self, parent: Option<usize>, next_id: &mut usize, out: &mut String) {
        let label = match (&self.label, &self.fragment) {
            (Some(label), _) => label.clone(),
            (None, Some(fragment)) => format!("{:?}", fragment),
            (None, None) => {
                for child in &self.children {
                    child.dot_into(parent, next_id, out);
                }
                return;
            }
        };
        let id = *next_id;
        *next_id += 1;
        out.push_str(&format!("  n{} [label=\"{}\"];\n", id, dot_escape(&label)));
        if let Some(parent) = parent {
            out.push_str(&format!("  n{} -> n{};\n", parent, id));
        }
        for child in &self.children {
            child.dot_into(Some(id), next_id, out);
        }
    }
}

/// Displays as the flattened output string.
impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flatten())
    }
}

fn dot_escape(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            c => vec![c],
        })
        .collect()
}
