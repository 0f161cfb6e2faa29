// src/control/mod.rs

//! Debian control-stanza parsing
//!
//! Index files are sequences of stanzas: blocks of `Key: value` lines
//! separated by blank lines, where a value may continue on following lines
//! that begin with whitespace, and a continuation line holding a single `.`
//! marks an explicitly empty line inside the value. [`Paragraphs`] walks the
//! raw text lazily and yields one [`Stanza`] per block; relationship fields
//! (`Depends`, `Provides`, ...) are parsed further into AND-of-OR groups of
//! `(name, constraint?)` by [`parse_relations`].
//!
//! Duplicate keys within one stanza are a parse error; the parser never
//! guesses intent on malformed input.

use crate::error::{Error, Result};
use crate::version::{Comparator, Constraint, Version};
use std::collections::HashMap;

/// One parsed control stanza: field name → unfolded value
///
/// Field names are case-sensitive; lookup is by exact name. The line number
/// of the stanza's first field is kept for error reporting.
#[derive(Debug, Clone)]
pub struct Stanza {
    start_line: usize,
    fields: HashMap<String, String>,
}

impl Stanza {
    /// Line number (1-based) of the stanza's first field
    pub fn start_line(&self) -> usize {
        self.start_line
    }

    /// Look up a field value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    /// Look up a mandatory field, failing with the stanza's location
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| Error::StanzaParse {
            line: self.start_line,
            message: format!("missing mandatory field '{}'", name),
        })
    }

    /// Number of fields in this stanza
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Lazy iterator over the stanzas of a control file
pub struct Paragraphs<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    done: bool,
}

impl<'a> Paragraphs<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            done: false,
        }
    }
}

/// Parse the stanzas of a control file lazily
pub fn parse_stanzas(text: &str) -> Paragraphs<'_> {
    Paragraphs::new(text)
}

impl<'a> Iterator for Paragraphs<'a> {
    type Item = Result<Stanza>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut fields: HashMap<String, String> = HashMap::new();
        let mut start_line = 0usize;
        let mut current: Option<String> = None;

        loop {
            let Some((idx, raw)) = self.lines.next() else {
                self.done = true;
                break;
            };
            let line_no = idx + 1;

            if raw.trim().is_empty() {
                if fields.is_empty() {
                    // Leading or repeated separators between stanzas
                    continue;
                }
                break;
            }

            if raw.starts_with(' ') || raw.starts_with('\t') {
                let Some(ref key) = current else {
                    return Some(Err(Error::StanzaParse {
                        line: line_no,
                        message: "continuation line without a preceding field".to_string(),
                    }));
                };
                let continuation = raw.trim();
                // A lone `.` is the marker for an empty line inside the value
                let continuation = if continuation == "." { "" } else { continuation };
                let value = fields.get_mut(key).expect("current key always present");
                value.push('\n');
                value.push_str(continuation);
                continue;
            }

            let Some(colon) = raw.find(':') else {
                return Some(Err(Error::StanzaParse {
                    line: line_no,
                    message: format!("expected 'Key: value', got '{}'", raw),
                }));
            };

            let key = raw[..colon].trim();
            let value = raw[colon + 1..].trim();

            if key.is_empty() || key.contains(char::is_whitespace) {
                return Some(Err(Error::StanzaParse {
                    line: line_no,
                    message: format!("invalid field name '{}'", key),
                }));
            }

            if fields.contains_key(key) {
                return Some(Err(Error::StanzaParse {
                    line: line_no,
                    message: format!("duplicate field '{}' within one stanza", key),
                }));
            }

            if fields.is_empty() {
                start_line = line_no;
            }
            fields.insert(key.to_string(), value.to_string());
            current = Some(key.to_string());
        }

        if fields.is_empty() {
            None
        } else {
            Some(Ok(Stanza { start_line, fields }))
        }
    }
}

/// One alternative within a dependency OR-group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepAlternative {
    pub name: String,
    pub constraint: Option<Constraint>,
}

impl std::fmt::Display for DepAlternative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{} ({})", self.name, c),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One AND-group: alternatives in declaration order, any one satisfies it
pub type DepGroup = Vec<DepAlternative>;

/// Parse a relationship field value into AND-of-OR structure
///
/// Top-level entries split on `,`, alternatives within an entry on `|`, and
/// each alternative optionally carries a parenthesized `(op version)`
/// constraint. Architecture qualifiers (`python3:any`) are stripped from
/// names; bracketed architecture restrictions and build profiles
/// (`[linux-any]`, `<!nocheck>`) are ignored. `package` and `field` name the
/// offending stanza in errors.
pub fn parse_relations(package: &str, field: &str, value: &str) -> Result<Vec<DepGroup>> {
    let mut groups = Vec::new();

    for entry in value.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            // Tolerate a trailing comma; reject a genuinely empty entry
            // between two others.
            continue;
        }

        let mut group = Vec::new();
        for alternative in entry.split('|') {
            group.push(parse_alternative(package, field, alternative)?);
        }
        groups.push(group);
    }

    Ok(groups)
}

/// Parse a single `name[:arch] [(op version)] [restrictions]` alternative
fn parse_alternative(package: &str, field: &str, text: &str) -> Result<DepAlternative> {
    let bad = |reason: &str| Error::DependencyExpression {
        package: package.to_string(),
        field: field.to_string(),
        expr: format!("'{}': {}", text.trim(), reason),
    };

    let mut rest = text.trim();
    if rest.is_empty() {
        return Err(bad("empty alternative"));
    }

    // Strip architecture restriction lists and build profiles; they select
    // whether the dependency applies, which is decided upstream of this
    // resolver (single fixed architecture per run).
    rest = strip_restrictions(rest);
    let rest = rest.trim();

    let (name_part, constraint) = match rest.find('(') {
        Some(open) => {
            let Some(close) = rest.rfind(')') else {
                return Err(bad("unterminated version constraint"));
            };
            if close < open {
                return Err(bad("mismatched parentheses"));
            }
            let inner = rest[open + 1..close].trim();
            if !rest[close + 1..].trim().is_empty() {
                return Err(bad("trailing junk after version constraint"));
            }

            let mut parts = inner.split_whitespace();
            let (op, ver) = match (parts.next(), parts.next(), parts.next()) {
                (Some(op), Some(ver), None) => (op, ver),
                _ => return Err(bad("constraint must be '(op version)'")),
            };
            let comparator = Comparator::parse(op)
                .ok_or_else(|| bad(&format!("unknown comparator '{}'", op)))?;
            let version = Version::parse(ver).map_err(|e| bad(&e.to_string()))?;

            (rest[..open].trim(), Some(Constraint::new(comparator, version)))
        }
        None => (rest, None),
    };

    if name_part.is_empty() {
        return Err(bad("missing package name"));
    }

    // Strip the architecture qualifier: `gcc:amd64` and `python3:any`
    // depend on the package, not on a foreign-arch variant.
    let name = name_part.split(':').next().unwrap_or(name_part);

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_'))
    {
        return Err(bad(&format!("invalid package name '{}'", name)));
    }

    Ok(DepAlternative {
        name: name.to_string(),
        constraint,
    })
}

/// Cut `[arch-list]` and `<build-profile>` qualifiers off an alternative
///
/// A `<` or `[` at parenthesis depth zero starts a qualifier; comparators
/// like `<<` only ever occur inside the parenthesized constraint, so depth
/// tracking is enough to tell them apart.
fn strip_restrictions(text: &str) -> &str {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '[' | '<' if depth == 0 => return text[..i].trim_end(),
            _ => {}
        }
    }
    text
}
