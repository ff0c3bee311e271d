// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered through miette.
//!
//! Figment reports failures against the merged document. This module maps
//! each one back to the `section.key` an operator wrote, points at it in the
//! TOML source when the source is known, names the `IDEALAB_*` variable when
//! the value came from the environment, and suggests the closest valid key
//! or variant.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::fmt::Write as _;

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

use crate::loader::ENV_PREFIX;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Source name used for TOML handed over as a string.
pub const INLINE_SOURCE: &str = "<inline>";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key or section no config struct declares.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(idealab::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys, env_var.as_deref()))
    )]
    UnknownKey {
        /// Dotted path, e.g. `guard.vote_celing`.
        key: String,
        suggestion: Option<String>,
        /// Keys accepted where the unknown one was found.
        valid_keys: String,
        /// Set when the key came from an environment variable.
        env_var: Option<String>,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that does not fit its key.
    #[error("invalid value for `{key}`: found {found}")]
    #[diagnostic(
        code(idealab::config::invalid_value),
        help("{}", invalid_value_help(expected, suggestion.as_deref()))
    )]
    InvalidValue {
        key: String,
        found: String,
        expected: String,
        suggestion: Option<String>,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that parsed but breaks a semantic rule.
    #[error("{message}")]
    #[diagnostic(code(idealab::config::validation))]
    Validation { message: String },

    /// Anything figment reports that has no finer mapping, such as an
    /// unreadable file or malformed TOML.
    #[error("{0}")]
    #[diagnostic(code(idealab::config::load))]
    Load(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str, env_var: Option<&str>) -> String {
    let mut help = match suggestion {
        Some(s) => format!("did you mean `{s}`? valid here: {valid_keys}"),
        None => format!("valid here: {valid_keys}"),
    };
    if let Some(var) = env_var {
        let _ = write!(help, " (set by environment variable `{var}`)");
    }
    help
}

fn invalid_value_help(expected: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`?"),
        None => format!("expected {expected}"),
    }
}

/// Map a figment error, which may hold several failures, to diagnostics.
///
/// `sources` pairs each TOML document's name with its content so spans can
/// be attached. A document handed over as a string is named
/// [`INLINE_SOURCE`].
pub fn from_figment(err: figment::Error, sources: &[(String, String)]) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                unknown_key(&error.path, field, expected, sources)
            }
            Kind::UnknownVariant(variant, expected) => invalid_value(
                &error.path,
                format!("`{variant}`"),
                one_of(expected),
                suggest_key(variant, expected),
                sources,
            ),
            Kind::InvalidType(actual, expected) | Kind::InvalidValue(actual, expected) => {
                invalid_value(&error.path, actual.to_string(), expected.clone(), None, sources)
            }
            _ => ConfigError::Load(error.to_string()),
        })
        .collect()
}

fn unknown_key(
    path: &[String],
    field: &str,
    expected: &[&str],
    sources: &[(String, String)],
) -> ConfigError {
    let section = path.first().map(String::as_str);
    let key = match section {
        Some(section) => format!("{section}.{field}"),
        None => field.to_string(),
    };
    let valid_keys = match section {
        Some(_) => expected.join(", "),
        None => expected
            .iter()
            .map(|s| format!("[{s}]"))
            .collect::<Vec<_>>()
            .join(", "),
    };

    let located = locate_in(sources, |content| match section {
        Some(section) => locate_key(content, Some(section), field),
        None => locate_header(content, field).or_else(|| locate_key(content, None, field)),
    });
    let env_var = match located {
        Some(_) => None,
        None => env_var_for(section, field),
    };
    let (span, src) = located.unzip();

    ConfigError::UnknownKey {
        key,
        suggestion: suggest_key(field, expected),
        valid_keys,
        env_var,
        span,
        src,
    }
}

fn invalid_value(
    path: &[String],
    found: String,
    expected: String,
    suggestion: Option<String>,
    sources: &[(String, String)],
) -> ConfigError {
    let (section, field) = match path {
        [section, field, ..] => (Some(section.as_str()), field.as_str()),
        [field] => (None, field.as_str()),
        [] => (None, ""),
    };
    let located = locate_in(sources, |content| locate_value(content, section, field));
    let (span, src) = located.unzip();

    ConfigError::InvalidValue {
        key: path.join("."),
        found,
        expected,
        suggestion,
        span,
        src,
    }
}

fn one_of(variants: &[&str]) -> String {
    let quoted: Vec<String> = variants.iter().map(|v| format!("`{v}`")).collect();
    format!("one of {}", quoted.join(", "))
}

/// First held document where `find` locates the offending text.
///
/// Figment tags merged tables with whichever provider introduced them, so
/// the documents are searched rather than trusted from error metadata.
fn locate_in(
    sources: &[(String, String)],
    find: impl Fn(&str) -> Option<SourceSpan>,
) -> Option<(SourceSpan, NamedSource<String>)> {
    sources.iter().find_map(|(name, content)| {
        let span = find(content)?;
        Some((span, NamedSource::new(name, content.clone())))
    })
}

/// `IDEALAB_<SECTION>_<KEY>`, when that variable is actually set.
fn env_var_for(section: Option<&str>, field: &str) -> Option<String> {
    let name = match section {
        Some(section) => format!("{ENV_PREFIX}{section}_{field}"),
        None => format!("{ENV_PREFIX}{field}"),
    }
    .to_ascii_uppercase();
    std::env::var_os(&name).map(|_| name)
}

/// Walk `content` line by line, yielding each line's byte offset and the
/// table it sits in.
fn lines_with_section(content: &str) -> impl Iterator<Item = (usize, Option<&str>, &str)> {
    let mut offset = 0;
    let mut current: Option<&str> = None;
    content.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        if let Some(name) = header_name(line) {
            current = Some(name);
        }
        (start, current, line)
    })
}

fn header_name(line: &str) -> Option<&str> {
    let inner = line.trim().strip_prefix('[')?;
    let end = inner.find(']')?;
    Some(inner[..end].trim())
}

/// Span of `field` as written inside `[section]`, or before any header.
pub fn locate_key(content: &str, section: Option<&str>, field: &str) -> Option<SourceSpan> {
    lines_with_section(content)
        .filter(|(_, current, line)| *current == section && header_name(line).is_none())
        .find_map(|(start, _, line)| {
            let indent = line.len() - line.trim_start().len();
            let rest = line.trim_start().strip_prefix(field)?;
            rest.trim_start()
                .starts_with('=')
                .then(|| SourceSpan::new((start + indent).into(), field.len()))
        })
}

/// Span of the name in a `[section]` header.
fn locate_header(content: &str, section: &str) -> Option<SourceSpan> {
    lines_with_section(content).find_map(|(start, _, line)| {
        if header_name(line) != Some(section) {
            return None;
        }
        let at = line.find(section)?;
        Some(SourceSpan::new((start + at).into(), section.len()))
    })
}

/// Span of the value assigned to `field` inside `[section]`.
fn locate_value(content: &str, section: Option<&str>, field: &str) -> Option<SourceSpan> {
    let key = locate_key(content, section, field)?;
    let line_end = content[key.offset()..]
        .find('\n')
        .map_or(content.len(), |n| key.offset() + n);
    let line = &content[key.offset()..line_end];
    let eq = line.find('=')?;
    let value = line[eq + 1..].trim();
    let at = key.offset() + eq + 1 + line[eq + 1..].find(value)?;
    Some(SourceSpan::new(at.into(), value.len()))
}

/// Closest entry of `valid` to `unknown`, if any is close enough.
pub fn suggest_key(unknown: &str, valid: &[&str]) -> Option<String> {
    valid
        .iter()
        .map(|candidate| (strsim::jaro_winkler(unknown, candidate), *candidate))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

/// Every diagnostic in `errors` rendered for a terminal, followed by a
/// count line.
pub fn render_report(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        if handler.render_report(&mut out, error).is_err() {
            let _ = writeln!(out, "error: {error}");
        }
    }
    let noun = if errors.len() == 1 { "error" } else { "errors" };
    let _ = writeln!(out, "idealab: {} configuration {noun}", errors.len());
    out
}

/// Print [`render_report`] to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_report(errors));
}
