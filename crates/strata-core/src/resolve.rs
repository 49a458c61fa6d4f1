//! `#NAME#` placeholder resolution for descriptor variable tables.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("variable reference cycle: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },
}

/// The token that references variable `name` inside a string.
pub fn placeholder(name: &str) -> String {
    format!("#{name}#")
}

/// Resolve every placeholder in `variables` that names another key of the table.
///
/// Each key is resolved once, dependencies first. The table is only replaced
/// when every key resolved; on a reference cycle it is left untouched.
/// Placeholders for keys that are not in the table stay as written.
pub fn resolve(variables: &mut BTreeMap<String, String>) -> Result<(), ResolveError> {
    let source: &BTreeMap<String, String> = variables;
    let mut resolver = Resolver {
        source,
        resolved: BTreeMap::new(),
        stack: Vec::new(),
    };
    for key in source.keys() {
        resolver.resolve_key(key)?;
    }
    let resolved = resolver.resolved;
    *variables = resolved;
    Ok(())
}

/// Replace every known placeholder in `text` with its (already resolved) value.
pub fn substitute(text: &str, variables: &BTreeMap<String, String>) -> String {
    let mut out = text.to_owned();
    for (name, value) in variables {
        let token = placeholder(name);
        while out.contains(&token) {
            out = out.replace(&token, value);
        }
    }
    out
}

struct Resolver<'a> {
    source: &'a BTreeMap<String, String>,
    resolved: BTreeMap<String, String>,
    stack: Vec<&'a str>,
}

impl<'a> Resolver<'a> {
    fn resolve_key(&mut self, key: &'a str) -> Result<(), ResolveError> {
        if self.resolved.contains_key(key) {
            return Ok(());
        }
        if let Some(start) = self.stack.iter().position(|k| *k == key) {
            let mut chain: Vec<String> = self.stack[start..]
                .iter()
                .map(|k| (*k).to_owned())
                .collect();
            chain.push(key.to_owned());
            return Err(ResolveError::Cycle { chain });
        }

        self.stack.push(key);
        let mut value = self.source[key].clone();
        // A replacement can form a new token with its neighbours, so rescan
        // until no reference to a known key is left.
        loop {
            let refs = self.references(&value);
            if refs.is_empty() {
                break;
            }
            for name in refs {
                self.resolve_key(name)?;
                let token = placeholder(name);
                while value.contains(&token) {
                    value = value.replace(&token, &self.resolved[name]);
                }
            }
        }
        self.stack.pop();

        trace!("resolved variable {key} = {value}");
        self.resolved.insert(key.to_owned(), value);
        Ok(())
    }

    fn references(&self, value: &str) -> BTreeSet<&'a str> {
        self.source
            .keys()
            .filter(|name| value.contains(&placeholder(name)))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn resolves_simple_reference() {
        let mut vars = table(&[("GREETING", "hello #NAME#"), ("NAME", "world")]);
        resolve(&mut vars).unwrap();
        assert_eq!(vars, table(&[("GREETING", "hello world"), ("NAME", "world")]));
    }

    #[test]
    fn resolves_transitive_chain() {
        let mut vars = table(&[("A", "#B#/a"), ("B", "#C#/b"), ("C", "root")]);
        resolve(&mut vars).unwrap();
        assert_eq!(vars["A"], "root/b/a");
        assert_eq!(vars["B"], "root/b");
        assert_eq!(vars["C"], "root");
    }

    #[test]
    fn replaces_repeated_and_multiple_references() {
        let mut vars = table(&[
            ("URL", "#HOST#:#PORT#/#HOST#"),
            ("HOST", "example.com"),
            ("PORT", "80"),
        ]);
        resolve(&mut vars).unwrap();
        assert_eq!(vars["URL"], "example.com:80/example.com");
    }

    #[test]
    fn diamond_dependencies_resolve_once() {
        let mut vars = table(&[
            ("TOP", "#LEFT# #RIGHT#"),
            ("LEFT", "l-#BASE#"),
            ("RIGHT", "r-#BASE#"),
            ("BASE", "#LEAF#!"),
            ("LEAF", "x"),
        ]);
        resolve(&mut vars).unwrap();
        assert_eq!(vars["TOP"], "l-x! r-x!");
    }

    #[test]
    fn tokens_formed_by_a_replacement_are_resolved() {
        let mut vars = table(&[("R", "#"), ("V", "#R#R#")]);
        resolve(&mut vars).unwrap();
        assert_eq!(vars["V"], "#");

        let mut vars = table(&[("H", "#X"), ("V", "#H##"), ("X", "x")]);
        resolve(&mut vars).unwrap();
        assert_eq!(vars["V"], "x");
        for (name, value) in &vars {
            for key in vars.keys() {
                assert!(!value.contains(&placeholder(key)), "{name} = {value}");
            }
        }
    }

    #[test]
    fn substitute_repeats_until_token_is_gone() {
        let vars = table(&[("R", "#")]);
        assert_eq!(substitute("#R#R#", &vars), "#");
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let mut vars = table(&[("A", "#MISSING# and #B#"), ("B", "b")]);
        resolve(&mut vars).unwrap();
        assert_eq!(vars["A"], "#MISSING# and b");
    }

    #[test]
    fn two_key_cycle_is_rejected() {
        let mut vars = table(&[("A", "#B#"), ("B", "#A#")]);
        let err = resolve(&mut vars).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Cycle {
                chain: vec!["A".to_owned(), "B".to_owned(), "A".to_owned()]
            }
        );
        assert_eq!(err.to_string(), "variable reference cycle: A -> B -> A");
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut vars = table(&[("A", "x#A#")]);
        assert!(matches!(resolve(&mut vars), Err(ResolveError::Cycle { .. })));
    }

    #[test]
    fn failed_resolution_leaves_table_untouched() {
        let original = table(&[
            ("A", "#B#"),
            ("B", "#C#"),
            ("C", "#B#"),
            ("D", "#E#"),
            ("E", "e"),
        ]);
        let mut vars = original.clone();
        assert!(resolve(&mut vars).is_err());
        assert_eq!(vars, original);
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut once = table(&[
            ("REPO", "#MIRROR#/#OS#/#ARCH#"),
            ("MIRROR", "http://#HOST#"),
            ("HOST", "mirror.local"),
            ("OS", "fedora"),
            ("ARCH", "x86_64"),
        ]);
        resolve(&mut once).unwrap();
        let mut twice = once.clone();
        resolve(&mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn substitute_after_resolve_leaves_no_known_placeholder() {
        let mut vars = table(&[("MIRROR", "http://#HOST#"), ("HOST", "mirror.local")]);
        resolve(&mut vars).unwrap();

        let text = substitute("#MIRROR#/updates and #HOST# but #OTHER#", &vars);
        assert_eq!(text, "http://mirror.local/updates and mirror.local but #OTHER#");
        for name in vars.keys() {
            assert!(!text.contains(&placeholder(name)));
        }
    }

    #[test]
    fn empty_table_resolves() {
        let mut vars = BTreeMap::new();
        resolve(&mut vars).unwrap();
        assert!(vars.is_empty());
    }
}
