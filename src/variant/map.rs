//! Variant assignment maps.
//!
//! Names map to the tuple of values assigned to them. Keys are kept sorted,
//! which is also the canonical rendering order.

use crate::error::SpecError;
use crate::spec::quote::quote_if_needed;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VariantMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl VariantMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `values` to `name`. A name can be assigned only once.
    pub fn insert<I, S>(&mut self, name: impl Into<String>, values: I) -> Result<(), SpecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(SpecError::DuplicateVariant { name });
        }
        let values = values.into_iter().map(Into::into).collect();
        self.entries.insert(name, values);
        Ok(())
    }

    pub fn insert_one(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), SpecError> {
        self.insert(name, [value.into()])
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Open-world overlap test: every name assigned on both sides must share
    /// at least one value. Names assigned on one side only are still open.
    pub fn intersects(&self, other: &VariantMap) -> bool {
        self.iter().all(|(name, values)| match other.get(name) {
            Some(theirs) => values.iter().any(|v| theirs.contains(v)),
            None => true,
        })
    }

    /// Every name `other` assigns is assigned here with a superset of values.
    pub fn satisfies(&self, other: &VariantMap) -> bool {
        other.iter().all(|(name, required)| match self.get(name) {
            Some(ours) => required.iter().all(|v| ours.contains(v)),
            None => false,
        })
    }

    /// Union `other` into this map, keeping first-seen value order.
    pub fn constrain(&mut self, other: &VariantMap) {
        for (name, values) in other.iter() {
            let merged = self.entries.entry(name.to_string()).or_default();
            for value in values {
                if !merged.contains(value) {
                    merged.push(value.clone());
                }
            }
        }
    }

    pub fn freeze(self) -> FrozenVariantMap {
        FrozenVariantMap(self)
    }

    /// Render one assignment: `+name`, `~name` or `name=v1,v2`.
    pub fn stringify(name: &str, values: &[String]) -> String {
        if let Some(b) = bool_value(values) {
            return if b {
                format!("+{name}")
            } else {
                format!("~{name}")
            };
        }
        let joined = values.join(",");
        let rendered = quote_if_needed(&joined).unwrap_or_else(|_| format!("'{joined}'"));
        format!("{name}={rendered}")
    }
}

fn bool_value(values: &[String]) -> Option<bool> {
    match values {
        [single] if single.eq_ignore_ascii_case("true") => Some(true),
        [single] if single.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

impl fmt::Display for VariantMap {
    /// Boolean variants first (concatenated, so no ` ~foo` fragments), then
    /// key-value pairs separated by spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (bools, pairs): (Vec<_>, Vec<_>) =
            self.iter().partition(|(_, values)| bool_value(values).is_some());

        let bools: String = bools
            .iter()
            .map(|(name, values)| Self::stringify(name, values))
            .collect();
        let pairs: Vec<String> = pairs
            .iter()
            .map(|(name, values)| Self::stringify(name, values))
            .collect();

        f.write_str(&bools)?;
        if !bools.is_empty() && !pairs.is_empty() {
            f.write_str(" ")?;
        }
        f.write_str(&pairs.join(" "))
    }
}

/// Variant map of a concrete spec. Reads go through `Deref`; every write
/// fails with `SpecError::Immutable`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrozenVariantMap(VariantMap);

impl FrozenVariantMap {
    pub fn insert<I, S>(&mut self, _name: impl Into<String>, _values: I) -> Result<(), SpecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Err(SpecError::Immutable {
            spec: format!("'{}'", self.0),
            field: "variants",
        })
    }

    /// Concrete maps have no open names left, so overlap means satisfaction.
    pub fn intersects(&self, other: &VariantMap) -> bool {
        self.0.satisfies(other)
    }

    pub fn as_map(&self) -> &VariantMap {
        &self.0
    }
}

impl Deref for FrozenVariantMap {
    type Target = VariantMap;

    fn deref(&self) -> &VariantMap {
        &self.0
    }
}

impl fmt::Display for FrozenVariantMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, &[&str])]) -> VariantMap {
        let mut m = VariantMap::new();
        for (name, values) in pairs {
            m.insert(*name, values.iter().copied()).unwrap();
        }
        m
    }

    #[test]
    fn names_are_assigned_once() {
        let mut m = VariantMap::new();
        m.insert_one("debug", "true").unwrap();
        let err = m.insert_one("debug", "false").unwrap_err();
        assert!(err.to_string().contains("variant 'debug'"));
    }

    #[test]
    fn rendering_puts_booleans_first() {
        let m = map(&[
            ("f", &["false"]),
            ("e", &["true"]),
            ("cflags", &["-O3 -g"]),
            ("arch", &["a", "b"]),
        ]);
        assert_eq!(m.to_string(), "+e~f arch=a,b cflags='-O3 -g'");
    }

    #[test]
    fn satisfies_requires_superset() {
        let wide = map(&[("caliper", &["time", "mpi"]), ("debug", &["true"])]);
        let narrow = map(&[("caliper", &["mpi"])]);
        assert!(wide.satisfies(&narrow));
        assert!(!narrow.satisfies(&wide));
        assert!(wide.satisfies(&VariantMap::new()));
    }

    #[test]
    fn intersects_treats_missing_names_as_open() {
        let a = map(&[("mode", &["a", "b"])]);
        let b = map(&[("mode", &["b"]), ("other", &["x"])]);
        let c = map(&[("mode", &["c"])]);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn constrain_unions_values() {
        let mut a = map(&[("caliper", &["time"])]);
        a.constrain(&map(&[("caliper", &["mpi", "time"]), ("debug", &["true"])]));
        assert_eq!(a.get("caliper").unwrap(), &["time".to_string(), "mpi".to_string()]);
        assert_eq!(a.get("debug").unwrap(), &["true".to_string()]);
    }

    #[test]
    fn frozen_map_rejects_every_write() {
        let mut frozen = map(&[("mode", &["a"])]).freeze();
        assert!(matches!(
            frozen.insert("other", ["x"]),
            Err(SpecError::Immutable { .. })
        ));
        assert!(matches!(
            frozen.insert("mode", ["b"]),
            Err(SpecError::Immutable { .. })
        ));
        assert_eq!(frozen.get("mode").unwrap(), &["a".to_string()]);
    }
}
