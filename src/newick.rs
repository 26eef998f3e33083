//! Newick serialization with `[&key=value]` metadata annotations.
//!
//! The dialect: annotations follow a node's name immediately, before the
//! branch length (`name[&state="I",support=0.9]:1.5`). String values are
//! double-quoted, numbers and booleans appear bare, arrays of scalars are
//! bracketed. Keys must not contain `,`, `=` or `]`; encoded values must
//! not contain `=` or `]`. A trailing `;` terminates each tree and
//! multiple trees sit one per line. The parser additionally accepts (and
//! ignores) a leading tree-level `[&..]` annotation and can translate
//! taxon names through a NEXUS-style TRANSLATE table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::metadata::{decode_value, encode_value};
use crate::tree::Tree;
use crate::NodeId;

/// Errors of the newick layer.
#[derive(Error, Debug)]
pub enum NewickError {
    #[error("cannot serialize an empty tree")]
    EmptyTree,
    #[error("unexpected end of input (expected one of {expected:?})")]
    UnexpectedEnd { expected: String },
    #[error("unexpected character {got:?} at byte {at}")]
    Unexpected { got: char, at: usize },
    #[error("invalid branch length {0:?}")]
    InvalidBranchLength(String),
    #[error("annotation {0:?} is missing a '='")]
    InvalidAnnotation(String),
    #[error("invalid feature key {0:?}: keys must not contain ',', '=', or ']'")]
    InvalidKey(String),
    #[error("invalid value {value:?} for feature {key:?}: values must not contain '=' or ']'")]
    InvalidValue { key: String, value: String },
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a tree, metadata annotations included, with a trailing `;`.
///
/// # Errors
///
/// [`NewickError::EmptyTree`] for an arena without a root, or a
/// key/value validation failure.
pub fn to_newick(tree: &Tree) -> Result<String, NewickError> {
    let root = tree.root().ok_or(NewickError::EmptyTree)?;
    let mut out = String::new();
    write_clade(tree, root, &mut out)?;
    out.push(';');
    Ok(out)
}

fn write_clade(tree: &Tree, id: NodeId, out: &mut String) -> Result<(), NewickError> {
    let node = tree.node(id);
    if !node.is_leaf() {
        out.push('(');
        for (i, child) in node.children().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_clade(tree, *child, out)?;
        }
        out.push(')');
    }
    out.push_str(node.name());
    if !node.metadata().is_empty() {
        out.push_str("[&");
        for (i, (key, value)) in node.metadata().iter().enumerate() {
            if key.contains(',') || key.contains('=') || key.contains(']') {
                return Err(NewickError::InvalidKey(key.clone()));
            }
            let encoded = encode_value(value);
            if encoded.contains('=') || encoded.contains(']') {
                return Err(NewickError::InvalidValue {
                    key: key.clone(),
                    value: encoded,
                });
            }
            if i > 0 {
                out.push(',');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(&encoded);
        }
        out.push(']');
    }
    if let Some(length) = node.branch_length() {
        out.push(':');
        out.push_str(&length.to_string());
    }
    Ok(())
}

/// Parse a single newick tree.
///
/// # Errors
///
/// Any [`NewickError`] parse failure.
pub fn parse_newick(newick: &str) -> Result<Tree, NewickError> {
    parse_newick_with_translations(newick, None)
}

/// Parse a single newick tree, translating taxon names through a
/// NEXUS-style TRANSLATE table.
///
/// A leading tree-level `[&..]` annotation is accepted and ignored.
///
/// # Errors
///
/// Any [`NewickError`] parse failure.
pub fn parse_newick_with_translations(
    newick: &str,
    translations: Option<&HashMap<String, String>>,
) -> Result<Tree, NewickError> {
    let mut text = newick.trim();
    if let Some(rest) = text.strip_prefix("[&") {
        match rest.find(']') {
            Some(end) => text = rest[end + 1..].trim_start(),
            None => {
                return Err(NewickError::UnexpectedEnd {
                    expected: "]".to_string(),
                })
            }
        }
    }
    let mut parser = Parser {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        translations,
    };
    let mut tree = Tree::new();
    let root = parser.parse_clade(&mut tree)?;
    match parser.peek() {
        Some(b';') => Ok(tree.extract(root)),
        Some(other) => Err(NewickError::Unexpected {
            got: other as char,
            at: parser.pos,
        }),
        None => Err(NewickError::UnexpectedEnd {
            expected: ";".to_string(),
        }),
    }
}

/// Parse every non-empty line of `text` as one newick tree.
///
/// # Errors
///
/// Any [`NewickError`] parse failure.
pub fn parse_forest(text: &str) -> Result<Vec<Tree>, NewickError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_newick)
        .collect()
}

/// Load one or more trees from a newick file, one per line.
///
/// # Errors
///
/// I/O failures and any [`NewickError`] parse failure.
pub fn read_newick(path: impl AsRef<Path>) -> Result<Vec<Tree>, NewickError> {
    parse_forest(&fs::read_to_string(path)?)
}

/// Write trees to a newick file, one per line.
///
/// # Errors
///
/// I/O failures and serialization failures.
pub fn write_newick<'a>(
    trees: impl IntoIterator<Item = &'a Tree>,
    path: impl AsRef<Path>,
) -> Result<(), NewickError> {
    let mut out = String::new();
    for tree in trees {
        out.push_str(&to_newick(tree)?);
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    translations: Option<&'a HashMap<String, String>>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    // The returned slice borrows the input, not the parser.
    fn read_until(&mut self, stoppers: &[u8]) -> Result<&'a str, NewickError> {
        let start = self.pos;
        while self.pos < self.bytes.len() && !stoppers.contains(&self.bytes[self.pos]) {
            self.pos += 1;
        }
        if self.pos == self.bytes.len() {
            return Err(NewickError::UnexpectedEnd {
                expected: String::from_utf8_lossy(stoppers).into_owned(),
            });
        }
        Ok(&self.text[start..self.pos])
    }

    fn parse_clade(&mut self, tree: &mut Tree) -> Result<NodeId, NewickError> {
        let mut children = Vec::new();
        if self.peek() == Some(b'(') {
            self.bump();
            loop {
                children.push(self.parse_clade(tree)?);
                match self.peek() {
                    Some(b',') => self.bump(),
                    Some(b')') => {
                        self.bump();
                        break;
                    }
                    Some(other) => {
                        return Err(NewickError::Unexpected {
                            got: other as char,
                            at: self.pos,
                        })
                    }
                    None => {
                        return Err(NewickError::UnexpectedEnd {
                            expected: ",)".to_string(),
                        })
                    }
                }
            }
        }

        let name = self.read_until(&[b':', b'[', b',', b')', b';'])?;
        let name = match self.translations.and_then(|table| table.get(name)) {
            Some(translated) => translated.clone(),
            None => name.to_string(),
        };
        let id = tree.add_node(name);

        if self.peek() == Some(b'[') {
            self.bump();
            if self.peek() != Some(b'&') {
                return Err(NewickError::Unexpected {
                    got: self.peek().map_or(' ', |b| b as char),
                    at: self.pos,
                });
            }
            self.bump();
            let raw = self.read_until(&[b']'])?;
            self.bump();
            for feature in split_features(raw) {
                let (key, value) = feature
                    .split_once('=')
                    .ok_or_else(|| NewickError::InvalidAnnotation(feature.to_string()))?;
                tree.node_mut(id)
                    .metadata_mut()
                    .insert(key.to_string(), decode_value(value));
            }
        }

        if self.peek() == Some(b':') {
            self.bump();
            let raw = self.read_until(&[b',', b')', b';'])?;
            let length: f64 = raw
                .trim()
                .parse()
                .map_err(|_| NewickError::InvalidBranchLength(raw.to_string()))?;
            tree.node_mut(id).set_branch_length(length);
        }

        for child in children {
            tree.link(id, child);
        }
        Ok(id)
    }
}

// A comma separates two features only when the text that follows it (up
// to the next comma) carries a '='; commas inside encoded values stay put.
fn split_features(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, byte) in raw.bytes().enumerate() {
        if byte == b',' {
            let next = raw[i + 1..].split(',').next().unwrap_or("");
            if next.contains('=') {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
        }
    }
    parts.push(&raw[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_features_keeps_commas_inside_values() {
        assert_eq!(
            split_features("state=\"I\",tags=[1,2],support=0.9"),
            vec!["state=\"I\"", "tags=[1,2]", "support=0.9"]
        );
    }

    #[test]
    fn test_parse_rejects_truncated_input() {
        assert!(parse_newick("(a:1,b:2)root").is_err());
        assert!(parse_newick("(a:1,b:2").is_err());
    }
}
