/*
 * helpers.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Helper functions callable from templates, e.g. `${upper(var.name)}`.
//!
//! Each helper declares a positional argument schema that is validated
//! before the helper runs, so implementations can read their arguments
//! without further checks.

use crate::error::{TemplateError, TemplateResult};
use crate::value::TemplateValue;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use garden_error_reporting::natural_list;
use once_cell::sync::Lazy;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Accepted type of a helper argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    Number,
    Array,
    ArrayOrString,
    Any,
}

impl ArgType {
    fn accepts(self, value: &TemplateValue) -> bool {
        match self {
            ArgType::String => matches!(value, TemplateValue::String(_)),
            ArgType::Number => matches!(value, TemplateValue::Number(_)),
            ArgType::Array => matches!(value, TemplateValue::Array(_)),
            ArgType::ArrayOrString => {
                matches!(value, TemplateValue::Array(_) | TemplateValue::String(_))
            }
            ArgType::Any => true,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Number => "number",
            ArgType::Array => "array",
            ArgType::ArrayOrString => "array or string",
            ArgType::Any => "any value",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub ty: ArgType,
    pub required: bool,
}

macro_rules! arg {
    ($name:literal, $ty:ident) => {
        ArgSpec {
            name: $name,
            ty: ArgType::$ty,
            required: true,
        }
    };
    ($name:literal, $ty:ident, optional) => {
        ArgSpec {
            name: $name,
            ty: ArgType::$ty,
            required: false,
        }
    };
}

type HelperFn = fn(&Args<'_>) -> TemplateResult<TemplateValue>;

pub struct HelperFunction {
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
    call: HelperFn,
}

impl std::fmt::Debug for HelperFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperFunction")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

impl HelperFunction {
    /// Validate arguments against the schema, then run the helper.
    pub fn call(&self, args: &[Option<TemplateValue>]) -> TemplateResult<TemplateValue> {
        if args.len() > self.args.len() {
            return Err(TemplateError::argument(format!(
                "Too many arguments for {} helper function (expected at most {}, got {})",
                self.name,
                self.args.len(),
                args.len()
            )));
        }
        for (index, spec) in self.args.iter().enumerate() {
            match args.get(index).and_then(Option::as_ref) {
                None if spec.required => {
                    return Err(TemplateError::argument(format!(
                        "Missing argument '{}' (at index {index}) for {} helper function",
                        spec.name, self.name
                    )));
                }
                Some(value) if !spec.ty.accepts(value) => {
                    return Err(TemplateError::argument(format!(
                        "Error validating argument '{}' (at index {index}) for {} helper function: expected {}, got {}",
                        spec.name,
                        self.name,
                        spec.ty.describe(),
                        value.type_name()
                    )));
                }
                _ => {}
            }
        }
        (self.call)(&Args(args))
    }
}

/// Validated helper arguments.
struct Args<'a>(&'a [Option<TemplateValue>]);

impl Args<'_> {
    fn get(&self, index: usize) -> Option<&TemplateValue> {
        self.0.get(index).and_then(Option::as_ref)
    }

    fn str(&self, index: usize) -> &str {
        self.get(index).and_then(TemplateValue::as_str).unwrap_or_default()
    }

    fn number(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(TemplateValue::as_f64)
    }

    /// An indentation width: a whole number in `0..=MAX_SPACES`. Missing
    /// means zero.
    fn spaces(&self, index: usize, helper: &str) -> TemplateResult<usize> {
        let spaces = self.number(index).unwrap_or_default();
        if !(0.0..=MAX_SPACES as f64).contains(&spaces) || spaces.fract() != 0.0 {
            return Err(TemplateError::argument(format!(
                "The spaces argument of {helper} must be an integer between 0 and {MAX_SPACES} (got {spaces})"
            )));
        }
        Ok(spaces as usize)
    }
}

const MAX_SPACES: usize = 1024;

static HELPERS: Lazy<BTreeMap<&'static str, HelperFunction>> = Lazy::new(|| {
    let helpers = [
        HelperFunction {
            name: "base64Decode",
            description: "Decodes the given base64-encoded string.",
            args: &[arg!("string", String)],
            call: |args| {
                let bytes = BASE64.decode(args.str(0)).map_err(|err| {
                    TemplateError::argument(format!("Unable to decode base64 string: {err}"))
                })?;
                Ok(String::from_utf8_lossy(&bytes).into_owned().into())
            },
        },
        HelperFunction {
            name: "base64Encode",
            description: "Encodes the given string as base64.",
            args: &[arg!("string", String)],
            call: |args| Ok(BASE64.encode(args.str(0)).into()),
        },
        HelperFunction {
            name: "camelCase",
            description: "Converts the given string to camelCase.",
            args: &[arg!("string", String)],
            call: |args| {
                let mut out = String::new();
                for (i, word) in words(args.str(0)).iter().enumerate() {
                    let lower = word.to_lowercase();
                    if i == 0 {
                        out.push_str(&lower);
                    } else {
                        let mut chars = lower.chars();
                        if let Some(first) = chars.next() {
                            out.extend(first.to_uppercase());
                            out.push_str(chars.as_str());
                        }
                    }
                }
                Ok(out.into())
            },
        },
        HelperFunction {
            name: "concat",
            description: "Concatenates two arrays or two strings.",
            args: &[arg!("arg1", ArrayOrString), arg!("arg2", ArrayOrString)],
            call: |args| match (args.get(0), args.get(1)) {
                (Some(TemplateValue::Array(a)), Some(TemplateValue::Array(b))) => {
                    Ok(TemplateValue::Array(a.iter().chain(b).cloned().collect()))
                }
                (Some(TemplateValue::String(a)), Some(TemplateValue::String(b))) => {
                    Ok(format!("{a}{b}").into())
                }
                (a, b) => Err(TemplateError::argument(format!(
                    "Both arguments to concat must be of the same type (got {} and {})",
                    a.map_or("undefined", TemplateValue::type_name),
                    b.map_or("undefined", TemplateValue::type_name)
                ))),
            },
        },
        HelperFunction {
            name: "indent",
            description: "Indents each non-empty line of the string with the given number of spaces.",
            args: &[arg!("string", String), arg!("spaces", Number)],
            call: |args| {
                let prefix = " ".repeat(args.spaces(1, "indent")?);
                let lines: Vec<String> = args
                    .str(0)
                    .split('\n')
                    .map(|line| {
                        if line.is_empty() {
                            String::new()
                        } else {
                            format!("{prefix}{line}")
                        }
                    })
                    .collect();
                Ok(lines.join("\n").into())
            },
        },
        HelperFunction {
            name: "isEmpty",
            description: "Returns true if the value is undefined, null, or an empty string, array or map.",
            args: &[arg!("value", Any, optional)],
            call: |args| {
                let empty = match args.get(0) {
                    None | Some(TemplateValue::Null) => true,
                    Some(TemplateValue::String(s)) => s.is_empty(),
                    Some(TemplateValue::Array(items)) => items.is_empty(),
                    Some(TemplateValue::Object(map)) => map.is_empty(),
                    Some(_) => false,
                };
                Ok(empty.into())
            },
        },
        HelperFunction {
            name: "join",
            description: "Joins the items of an array into a string using the given separator.",
            args: &[arg!("input", Array), arg!("separator", String)],
            call: |args| {
                let Some(TemplateValue::Array(items)) = args.get(0) else {
                    return Ok(String::new().into());
                };
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match item.to_interpolated() {
                        Some(part) => parts.push(part),
                        None => {
                            return Err(TemplateError::argument(format!(
                                "Cannot join array items of type {}",
                                item.type_name()
                            )));
                        }
                    }
                }
                Ok(parts.join(args.str(1)).into())
            },
        },
        HelperFunction {
            name: "jsonDecode",
            description: "Decodes the given JSON string.",
            args: &[arg!("string", String)],
            call: |args| {
                serde_json::from_str::<serde_json::Value>(args.str(0))
                    .map(TemplateValue::from)
                    .map_err(|err| TemplateError::argument(format!("Unable to decode JSON: {err}")))
            },
        },
        HelperFunction {
            name: "jsonEncode",
            description: "Encodes the given value as JSON, optionally indented by the given number of spaces.",
            args: &[arg!("value", Any), arg!("spaces", Number, optional)],
            call: |args| {
                let value = args.get(0).cloned().unwrap_or_default();
                let spaces = args.spaces(1, "jsonEncode")?;
                let encoded = if spaces == 0 {
                    serde_json::to_string(&value)
                } else {
                    let indent = " ".repeat(spaces);
                    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                    let mut out = Vec::new();
                    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
                    let result = value.serialize(&mut serializer);
                    result.map(|()| String::from_utf8_lossy(&out).into_owned())
                };
                encoded
                    .map(TemplateValue::from)
                    .map_err(|err| TemplateError::argument(format!("Unable to encode JSON: {err}")))
            },
        },
        HelperFunction {
            name: "kebabCase",
            description: "Converts the given string to kebab-case.",
            args: &[arg!("string", String)],
            call: |args| {
                let words: Vec<String> =
                    words(args.str(0)).iter().map(|w| w.to_lowercase()).collect();
                Ok(words.join("-").into())
            },
        },
        HelperFunction {
            name: "lower",
            description: "Converts the given string to lowercase.",
            args: &[arg!("string", String)],
            call: |args| Ok(args.str(0).to_lowercase().into()),
        },
        HelperFunction {
            name: "replace",
            description: "Replaces every occurrence of a substring.",
            args: &[
                arg!("string", String),
                arg!("substring", String),
                arg!("replacement", String),
            ],
            call: |args| Ok(args.str(0).replace(args.str(1), args.str(2)).into()),
        },
        HelperFunction {
            name: "sha256",
            description: "Returns the hex-encoded SHA256 hash of the given string.",
            args: &[arg!("string", String)],
            call: |args| Ok(hex::encode(Sha256::digest(args.str(0).as_bytes())).into()),
        },
        HelperFunction {
            name: "slice",
            description: "Slices a string or array between the start and (optional) end index. Negative indices count from the end.",
            args: &[
                arg!("input", ArrayOrString),
                arg!("start", Number),
                arg!("end", Number, optional),
            ],
            call: |args| {
                let start = args.number(1).unwrap_or_default();
                let end = args.number(2);
                match args.get(0) {
                    Some(TemplateValue::Array(items)) => {
                        let (from, to) = slice_bounds(items.len(), start, end);
                        Ok(TemplateValue::Array(items[from..to].to_vec()))
                    }
                    _ => {
                        let chars: Vec<char> = args.str(0).chars().collect();
                        let (from, to) = slice_bounds(chars.len(), start, end);
                        Ok(chars[from..to].iter().collect::<String>().into())
                    }
                }
            },
        },
        HelperFunction {
            name: "split",
            description: "Splits a string into an array of strings by the given separator.",
            args: &[arg!("string", String), arg!("separator", String)],
            call: |args| {
                let (input, separator) = (args.str(0), args.str(1));
                // An empty separator yields one item per character and none
                // for an empty string.
                let items: Vec<TemplateValue> = if separator.is_empty() {
                    input.chars().map(|c| c.to_string().into()).collect()
                } else {
                    input.split(separator).map(TemplateValue::from).collect()
                };
                Ok(TemplateValue::Array(items))
            },
        },
        HelperFunction {
            name: "string",
            description: "Converts the given value to a string.",
            args: &[arg!("value", Any)],
            call: |args| {
                let value = args.get(0).cloned().unwrap_or_default();
                Ok(match value.to_interpolated() {
                    Some(s) => s.into(),
                    None => value.to_json().to_string().into(),
                })
            },
        },
        HelperFunction {
            name: "trim",
            description: "Removes leading and trailing whitespace from the given string.",
            args: &[arg!("string", String)],
            call: |args| Ok(args.str(0).trim().into()),
        },
        HelperFunction {
            name: "upper",
            description: "Converts the given string to uppercase.",
            args: &[arg!("string", String)],
            call: |args| Ok(args.str(0).to_uppercase().into()),
        },
        HelperFunction {
            name: "yamlDecode",
            description: "Decodes the given YAML string.",
            args: &[arg!("string", String)],
            call: |args| {
                serde_yaml::from_str::<TemplateValue>(args.str(0))
                    .map_err(|err| TemplateError::argument(format!("Unable to decode YAML: {err}")))
            },
        },
        HelperFunction {
            name: "yamlEncode",
            description: "Encodes the given value as YAML.",
            args: &[arg!("value", Any)],
            call: |args| {
                let value = args.get(0).cloned().unwrap_or_default();
                serde_yaml::to_string(&value)
                    .map(TemplateValue::from)
                    .map_err(|err| TemplateError::argument(format!("Unable to encode YAML: {err}")))
            },
        },
    ];
    helpers.into_iter().map(|helper| (helper.name, helper)).collect()
});

/// All helpers, sorted by name.
pub fn helper_functions() -> impl Iterator<Item = &'static HelperFunction> {
    HELPERS.values()
}

pub fn get_helper(name: &str) -> Option<&'static HelperFunction> {
    HELPERS.get(name)
}

/// Call a helper by name.
pub fn call_helper(name: &str, args: &[Option<TemplateValue>]) -> TemplateResult<TemplateValue> {
    let Some(helper) = get_helper(name) else {
        let names: Vec<&str> = HELPERS.keys().copied().collect();
        return Err(TemplateError::type_error(format!(
            "Could not find helper function '{name}'. Available helper functions: {}",
            natural_list(&names)
        )));
    };
    helper.call(args)
}

/// Split a string into words on separators and lower-to-upper case changes.
fn words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in s.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_numeric();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Slice bounds with negative indices counting from the end, clamped to
/// `0..=len`.
fn slice_bounds(len: usize, start: f64, end: Option<f64>) -> (usize, usize) {
    let clamp = |index: f64| -> usize {
        let index = index.trunc();
        if index < 0.0 {
            (len as f64 + index).max(0.0) as usize
        } else {
            index.min(len as f64) as usize
        }
    };
    let from = clamp(start);
    let to = end.map_or(len, clamp);
    (from, to.max(from))
}
