/*
 * collection.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Parsing whole configuration documents.
//!
//! Every string leaf containing `${` is parsed into a [`ParsedTemplate`] and
//! every object carrying a directive key becomes a directive node. Directive
//! shape is validated here, once, so evaluation never sees a malformed
//! `$forEach` or `$if`.

use crate::ast::ParsedTemplate;
use crate::diagnostics::SourceDocument;
use crate::error::{TemplateError, TemplateResult};
use crate::parser::{is_template_string, parse_template};
use crate::path::DocumentPath;
use crate::value::TemplateValue;
use garden_error_reporting::natural_list;
use indexmap::IndexMap;
use std::sync::Arc;

pub const MERGE_KEY: &str = "$merge";
pub const CONCAT_KEY: &str = "$concat";
pub const FOR_EACH_KEY: &str = "$forEach";
pub const FILTER_KEY: &str = "$filter";
pub const RETURN_KEY: &str = "$return";
pub const IF_KEY: &str = "$if";
pub const THEN_KEY: &str = "$then";
pub const ELSE_KEY: &str = "$else";

const FOR_EACH_KEYS: [&str; 3] = [FOR_EACH_KEY, FILTER_KEY, RETURN_KEY];
const IF_KEYS: [&str; 3] = [IF_KEY, THEN_KEY, ELSE_KEY];

/// Options for [`parse_template_collection`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// The document the value was loaded from, for snippet rendering.
    pub source: Option<Arc<SourceDocument>>,
    /// Path of the value inside its document.
    pub base_path: DocumentPath,
}

impl ParseOptions {
    pub fn with_source(mut self, source: Arc<SourceDocument>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_base_path(mut self, base_path: DocumentPath) -> Self {
        self.base_path = base_path;
        self
    }
}

/// A parsed document.
#[derive(Debug, Clone)]
pub struct ParsedCollection {
    root: Arc<ParsedNode>,
}

impl ParsedCollection {
    pub fn root(&self) -> &Arc<ParsedNode> {
        &self.root
    }
}

/// A node of a parsed document.
#[derive(Debug, Clone)]
pub struct ParsedNode {
    pub value: ParsedValue,
    pub path: DocumentPath,
    /// The value as written, used when a node passes through unresolved.
    pub raw: TemplateValue,
    pub source: Option<Arc<SourceDocument>>,
}

#[derive(Debug, Clone)]
pub enum ParsedValue {
    /// No template syntax anywhere below; `raw` is the value.
    Plain,
    Template(ParsedTemplate),
    Array(Vec<ArrayItem>),
    /// Entries in document order.
    Object(Vec<ObjectEntry>),
    ForEach(ForEachDirective),
    If(IfDirective),
    /// `{ $concat: ... }` used as a `$return` value.
    Concat(Arc<ParsedNode>),
}

#[derive(Debug, Clone)]
pub enum ArrayItem {
    Item(Arc<ParsedNode>),
    /// The operand of a `{ $concat: ... }` item, spliced into the array.
    Concat(Arc<ParsedNode>),
}

#[derive(Debug, Clone)]
pub enum ObjectEntry {
    Field(String, Arc<ParsedNode>),
    /// The operand of `$merge`, merged at this position.
    Merge(Arc<ParsedNode>),
}

#[derive(Debug, Clone)]
pub struct ForEachDirective {
    pub source: Arc<ParsedNode>,
    pub filter: Option<Arc<ParsedNode>>,
    pub ret: Arc<ParsedNode>,
}

#[derive(Debug, Clone)]
pub struct IfDirective {
    pub condition: Arc<ParsedNode>,
    pub then: Arc<ParsedNode>,
    pub otherwise: Option<Arc<ParsedNode>>,
}

impl ParsedNode {
    pub fn is_plain(&self) -> bool {
        matches!(self.value, ParsedValue::Plain)
    }

    /// A node that holds a plain value.
    pub fn plain(value: TemplateValue, path: DocumentPath) -> Self {
        ParsedNode {
            value: ParsedValue::Plain,
            path,
            raw: value,
            source: None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Normal,
    ArrayItem,
    Return,
}

/// Parse a document into a tree of template and directive nodes.
///
/// ```
/// use garden_template::{ParseOptions, TemplateValue, parse_template_collection};
/// use serde_json::json;
///
/// let doc = TemplateValue::from(json!({"name": "api", "image": "${var.image}"}));
/// let parsed = parse_template_collection(&doc, &ParseOptions::default()).unwrap();
/// assert!(!parsed.root().is_plain());
/// ```
pub fn parse_template_collection(
    value: &TemplateValue,
    options: &ParseOptions,
) -> TemplateResult<ParsedCollection> {
    let root = parse_node(value, options.base_path.clone(), options, Position::Normal)?;
    Ok(ParsedCollection {
        root: Arc::new(root),
    })
}

fn parse_node(
    value: &TemplateValue,
    path: DocumentPath,
    options: &ParseOptions,
    position: Position,
) -> TemplateResult<ParsedNode> {
    let parsed = match value {
        TemplateValue::String(s) if is_template_string(s) => {
            let template = parse_template(s).map_err(|err| {
                err.at_path(&path).with_document(options.source.as_ref())
            })?;
            ParsedValue::Template(template)
        }
        TemplateValue::Array(items) => parse_array(items, &path, options)?,
        TemplateValue::Object(map) => parse_object(map, &path, options, position)
            .map_err(|err| err.at_path(&path).with_document(options.source.as_ref()))?,
        _ => ParsedValue::Plain,
    };

    Ok(ParsedNode {
        value: parsed,
        path,
        raw: value.clone(),
        source: options.source.clone(),
    })
}

fn parse_array(
    items: &[TemplateValue],
    path: &DocumentPath,
    options: &ParseOptions,
) -> TemplateResult<ParsedValue> {
    let mut parsed = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let node = parse_node(item, path.index(i), options, Position::ArrayItem)?;
        parsed.push(match node.value {
            ParsedValue::Concat(operand) => ArrayItem::Concat(operand),
            _ => ArrayItem::Item(Arc::new(node)),
        });
    }

    let all_plain = parsed
        .iter()
        .all(|item| matches!(item, ArrayItem::Item(node) if node.is_plain()));
    Ok(if all_plain {
        ParsedValue::Plain
    } else {
        ParsedValue::Array(parsed)
    })
}

fn child(
    map: &IndexMap<String, TemplateValue>,
    key: &str,
    path: &DocumentPath,
    options: &ParseOptions,
    position: Position,
) -> TemplateResult<Option<Arc<ParsedNode>>> {
    map.get(key)
        .map(|value| parse_node(value, path.key(key), options, position).map(Arc::new))
        .transpose()
}

fn check_allowed_keys(
    map: &IndexMap<String, TemplateValue>,
    directive: &str,
    allowed: &[&str],
) -> TemplateResult<()> {
    let unexpected: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|key| !allowed.contains(key))
        .collect();
    if unexpected.is_empty() {
        return Ok(());
    }
    Err(TemplateError::directive(format!(
        "Found one or more unexpected keys on {directive} object: {}. Allowed keys: {}",
        natural_list(&unexpected),
        natural_list(allowed)
    )))
}

fn parse_object(
    map: &IndexMap<String, TemplateValue>,
    path: &DocumentPath,
    options: &ParseOptions,
    position: Position,
) -> TemplateResult<ParsedValue> {
    if map.contains_key(FOR_EACH_KEY) {
        check_allowed_keys(map, FOR_EACH_KEY, &FOR_EACH_KEYS)?;
        if !map.contains_key(RETURN_KEY) {
            return Err(TemplateError::directive(
                "Missing $return field next to $forEach field.",
            ));
        }
        let source = child(map, FOR_EACH_KEY, path, options, Position::Normal)?;
        let filter = child(map, FILTER_KEY, path, options, Position::Normal)?;
        let ret = child(map, RETURN_KEY, path, options, Position::Return)?;
        return match (source, ret) {
            (Some(source), Some(ret)) => Ok(ParsedValue::ForEach(ForEachDirective {
                source,
                filter,
                ret,
            })),
            _ => Err(TemplateError::directive(
                "Missing $return field next to $forEach field.",
            )),
        };
    }

    if map.contains_key(IF_KEY) {
        check_allowed_keys(map, IF_KEY, &IF_KEYS)?;
        let condition = child(map, IF_KEY, path, options, Position::Normal)?;
        let then = child(map, THEN_KEY, path, options, Position::Normal)?;
        let otherwise = child(map, ELSE_KEY, path, options, Position::Normal)?;
        return match (condition, then) {
            (Some(condition), Some(then)) => Ok(ParsedValue::If(IfDirective {
                condition,
                then,
                otherwise,
            })),
            _ => Err(TemplateError::directive("Missing $then field next to $if field.")),
        };
    }

    if let Some(operand) = map.get(CONCAT_KEY) {
        if position == Position::Normal {
            return Err(TemplateError::directive(
                "A $concat key can only be used in an array item or as a $return value.",
            ));
        }
        let siblings: Vec<&str> = map
            .keys()
            .map(String::as_str)
            .filter(|key| *key != CONCAT_KEY)
            .collect();
        if !siblings.is_empty() {
            return Err(TemplateError::directive(format!(
                "A list item with a $concat key cannot have any other keys (found {})",
                natural_list(&siblings)
            )));
        }
        let node = parse_node(operand, path.key(CONCAT_KEY), options, Position::Normal)?;
        return Ok(ParsedValue::Concat(Arc::new(node)));
    }

    for (orphan, parent) in [
        (RETURN_KEY, FOR_EACH_KEY),
        (FILTER_KEY, FOR_EACH_KEY),
        (THEN_KEY, IF_KEY),
        (ELSE_KEY, IF_KEY),
    ] {
        if map.contains_key(orphan) {
            return Err(TemplateError::directive(format!(
                "Found a {orphan} key without a {parent} key next to it."
            )));
        }
    }

    let mut entries = Vec::with_capacity(map.len());
    for (key, value) in map {
        let node = Arc::new(parse_node(value, path.key(key), options, Position::Normal)?);
        if key == MERGE_KEY {
            entries.push(ObjectEntry::Merge(node));
        } else {
            entries.push(ObjectEntry::Field(key.clone(), node));
        }
    }

    let all_plain = entries
        .iter()
        .all(|entry| matches!(entry, ObjectEntry::Field(_, node) if node.is_plain()));
    Ok(if all_plain {
        ParsedValue::Plain
    } else {
        ParsedValue::Object(entries)
    })
}
