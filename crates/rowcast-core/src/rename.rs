//! Key renaming: which JSON key populates which declared field
//!
//! Rules come from two kinds of table properties:
//!
//! - `changekeyto.<field> = <pattern>`: the JSON key at the end of any
//!   key path matched by `<pattern>` populates `<field>` instead of a
//!   field named after the key itself.
//! - `mapping.<field> = <key>`: `<field>` reads JSON key `<key>` at
//!   whatever struct level the field is declared.
//!
//! Key paths run from the record root through object keys and map keys.
//! Arrays add no segment, so `ary.shoop.foot.noot` reaches into every
//! element of the array `ary`.

use crate::error::{Error, Result};
use crate::json::JsonValue;
use crate::pattern::{PathPattern, eq_folded};

/// A compiled `changekeyto` rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenameRule {
    /// Declared field that receives the value
    pub field: String,
    /// Key path the value is taken from
    pub pattern: PathPattern,
}

/// How a JSON key relates to a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Candidate {
    /// Key carries the field's name (or its `mapping` key)
    Literal,
    /// A rename rule sends this key to the field
    Renamed,
}

/// All rename and mapping rules of a table, frozen after compilation
#[derive(Debug, Clone, Default)]
pub struct KeyRenamer {
    rules: Vec<RenameRule>,
    mappings: Vec<(String, String)>,
    case_insensitive: bool,
    dots_in_keys: bool,
}

impl KeyRenamer {
    /// Compile rename rules and field mappings
    ///
    /// Rules are ranked most specific first. Two rules that target
    /// different fields, rank equally, and can match a common path are
    /// rejected, since neither could be chosen deterministically.
    pub fn compile(
        renames: impl IntoIterator<Item = (String, String)>,
        mappings: impl IntoIterator<Item = (String, String)>,
        case_insensitive: bool,
        dots_in_keys: bool,
    ) -> Result<Self> {
        let mut rules = Vec::new();
        for (field, text) in renames {
            if field.is_empty() {
                return Err(Error::ConfigInvalid {
                    message: format!("rename rule '{text}' has no target field"),
                });
            }
            let pattern = PathPattern::compile(&text, case_insensitive).map_err(|message| {
                Error::InvalidPattern {
                    field: field.clone(),
                    pattern: text.clone(),
                    message,
                }
            })?;
            rules.push(RenameRule { field, pattern });
        }

        for (i, a) in rules.iter().enumerate() {
            for b in &rules[i + 1..] {
                let same_rank = a.pattern.specificity() == b.pattern.specificity();
                let same_field = eq_folded(&a.field, &b.field, case_insensitive);
                if same_rank && !same_field && a.pattern.overlaps(&b.pattern) {
                    return Err(Error::AmbiguousRenameRule {
                        first: a.pattern.to_string(),
                        first_field: a.field.clone(),
                        second: b.pattern.to_string(),
                        second_field: b.field.clone(),
                    });
                }
            }
        }

        rules.sort_by(|a, b| {
            a.pattern
                .rank(&b.pattern)
                .then_with(|| a.pattern.as_str().cmp(b.pattern.as_str()))
        });
        for rule in &rules {
            tracing::debug!(field = %rule.field, pattern = %rule.pattern, "compiled rename rule");
        }

        let mut mappings: Vec<(String, String)> = mappings.into_iter().collect();
        mappings.sort();

        Ok(Self {
            rules,
            mappings,
            case_insensitive,
            dots_in_keys,
        })
    }

    /// Rules, most specific first
    pub fn rules(&self) -> &[RenameRule] {
        &self.rules
    }

    /// Field-to-key mappings, sorted by field
    pub fn mappings(&self) -> &[(String, String)] {
        &self.mappings
    }

    /// Target field of the best rule matching a concrete key path
    pub fn resolve(&self, path: &[&str]) -> Option<&str> {
        if self.rules.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| rule.field.as_str())
    }

    /// Rename target of every entry of one object, given the object's path
    pub fn renames<'r>(
        &'r self,
        entries: &[(String, JsonValue)],
        parent: &[&str],
    ) -> Vec<Option<&'r str>> {
        if self.rules.is_empty() {
            return vec![None; entries.len()];
        }
        let mut path: Vec<&str> = parent.to_vec();
        entries
            .iter()
            .map(|(key, _)| {
                path.push(key);
                let target = self.resolve(&path);
                path.pop();
                target
            })
            .collect()
    }

    /// How an entry with `key` (renamed to `renamed`, if any) relates to `field`
    ///
    /// A renamed key only ever feeds its rule's target; it no longer
    /// answers to its own name.
    pub fn candidate(&self, key: &str, renamed: Option<&str>, field: &str) -> Option<Candidate> {
        match renamed {
            Some(target) => {
                eq_folded(target, field, self.case_insensitive).then_some(Candidate::Renamed)
            }
            None => self.key_matches(key, field).then_some(Candidate::Literal),
        }
    }

    fn key_matches(&self, key: &str, field: &str) -> bool {
        let wanted = self.mapping_for(field).unwrap_or(field);
        if eq_folded(key, wanted, self.case_insensitive) {
            return true;
        }
        self.dots_in_keys
            && key.contains('.')
            && eq_folded(&key.replace('.', "_"), wanted, self.case_insensitive)
    }

    fn mapping_for(&self, field: &str) -> Option<&str> {
        self.mappings
            .iter()
            .find(|(f, _)| eq_folded(f, field, self.case_insensitive))
            .map(|(_, key)| key.as_str())
    }

    /// Index of the entry that populates `field`
    ///
    /// A renamed entry beats a literal one; among equals the last
    /// occurrence wins.
    pub fn pick(
        &self,
        entries: &[(String, JsonValue)],
        renames: &[Option<&str>],
        field: &str,
    ) -> Option<usize> {
        let mut best: Option<(Candidate, usize)> = None;
        for (i, ((key, _), renamed)) in entries.iter().zip(renames).enumerate() {
            if let Some(candidate) = self.candidate(key, *renamed, field) {
                if best.is_none_or(|(current, _)| candidate >= current) {
                    best = Some((candidate, i));
                }
            }
        }
        best.map(|(_, i)| i)
    }

    /// Index of the entry of the object at `parent` that populates `field`
    pub fn resolve_field_source(
        &self,
        entries: &[(String, JsonValue)],
        parent: &[&str],
        field: &str,
    ) -> Option<usize> {
        let renames = self.renames(entries, parent);
        self.pick(entries, &renames, field)
    }
}
