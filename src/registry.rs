//! Ordered, named stage registry.
//!
//! Every pipeline kind is driven by one [`OrderedRegistry`]. Iteration order
//! is execution order for preprocess and tree stages, and match priority for
//! block and inline stages, so extensions place their stages relative to
//! stages they know about rather than at fixed indices.
//!
//! ## Location directives
//!
//! | Directive | Meaning |
//! |-----------|---------|
//! | `_begin`  | first position |
//! | `_end`    | last position |
//! | `<name`   | immediately before `name` |
//! | `>name`   | immediately after `name` |
//!
//! A directive naming an unregistered stage, or one that fits none of the
//! forms above, is a [`MarkupError::Config`]. There is no fallback position.

use crate::error::MarkupError;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Where to insert a stage relative to the current order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Begin,
    End,
    Before(String),
    After(String),
}

impl Location {
    pub fn before(name: impl Into<String>) -> Self {
        Location::Before(name.into())
    }

    pub fn after(name: impl Into<String>) -> Self {
        Location::After(name.into())
    }
}

impl FromStr for Location {
    type Err = MarkupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "_begin" => Ok(Location::Begin),
            "_end" => Ok(Location::End),
            _ => {
                if let Some(name) = s.strip_prefix('<').filter(|n| !n.is_empty()) {
                    Ok(Location::Before(name.to_string()))
                } else if let Some(name) = s.strip_prefix('>').filter(|n| !n.is_empty()) {
                    Ok(Location::After(name.to_string()))
                } else {
                    Err(MarkupError::config(format!(
                        "malformed location '{s}': expected _begin, _end, <name or >name"
                    )))
                }
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Begin => f.write_str("_begin"),
            Location::End => f.write_str("_end"),
            Location::Before(name) => write!(f, "<{name}"),
            Location::After(name) => write!(f, ">{name}"),
        }
    }
}

/// An order-preserving map from unique names to stages.
pub struct OrderedRegistry<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for OrderedRegistry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for OrderedRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<T> OrderedRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `stage` under `name` at `location`.
    ///
    /// Fails without modifying the registry if `name` is already taken or
    /// `location` names a stage that is not registered.
    pub fn add(&mut self, name: &str, stage: T, location: Location) -> Result<(), MarkupError> {
        if self.contains(name) {
            return Err(MarkupError::config(format!(
                "a stage named '{name}' is already registered"
            )));
        }
        let index = self.resolve(&location)?;
        debug!(stage = name, %location, index, "registering stage");
        self.entries.insert(index, (name.to_string(), stage));
        Ok(())
    }

    /// [`add`](Self::add) with a textual directive (`_begin`, `<name`, …).
    pub fn add_at(&mut self, name: &str, stage: T, location: &str) -> Result<(), MarkupError> {
        let location = location.parse()?;
        self.add(name, stage, location)
    }

    /// Remove and return the stage registered under `name`.
    pub fn remove(&mut self, name: &str) -> Result<T, MarkupError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| MarkupError::not_found(name))?;
        Ok(self.entries.remove(index).1)
    }

    pub fn get(&self, name: &str) -> Result<&T, MarkupError> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, stage)| stage)
            .ok_or_else(|| MarkupError::not_found(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut T, MarkupError> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, stage)| stage)
            .ok_or_else(|| MarkupError::not_found(name))
    }

    /// Swap the stage stored under `name`, keeping its position.
    ///
    /// Returns the previous stage.
    pub fn replace(&mut self, name: &str, stage: T) -> Result<T, MarkupError> {
        let slot = self.get_mut(name)?;
        Ok(std::mem::replace(slot, stage))
    }

    /// Move an existing stage to a new location.
    ///
    /// On a bad location the registry is left exactly as it was.
    pub fn link(&mut self, name: &str, location: Location) -> Result<(), MarkupError> {
        let from = self
            .index_of(name)
            .ok_or_else(|| MarkupError::not_found(name))?;
        if matches!(&location, Location::Before(other) | Location::After(other) if other == name) {
            return Err(MarkupError::config(format!(
                "cannot move '{name}' relative to itself"
            )));
        }
        let entry = self.entries.remove(from);
        match self.resolve(&location) {
            Ok(to) => {
                self.entries.insert(to, entry);
                Ok(())
            }
            Err(e) => {
                self.entries.insert(from, entry);
                Err(e)
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Stages with their names, in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.entries.iter_mut().map(|(n, s)| (n.as_str(), s))
    }

    pub fn stages(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, s)| s)
    }

    fn resolve(&self, location: &Location) -> Result<usize, MarkupError> {
        match location {
            Location::Begin => Ok(0),
            Location::End => Ok(self.entries.len()),
            Location::Before(other) => self.index_of(other).ok_or_else(|| {
                MarkupError::config(format!("cannot insert before unknown stage '{other}'"))
            }),
            Location::After(other) => self
                .index_of(other)
                .map(|i| i + 1)
                .ok_or_else(|| {
                    MarkupError::config(format!("cannot insert after unknown stage '{other}'"))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OrderedRegistry<&'static str> {
        let mut reg = OrderedRegistry::new();
        reg.add("first", "This", Location::End).unwrap();
        reg.add("third", "a", Location::End).unwrap();
        reg.add("fourth", "self", Location::End).unwrap();
        reg.add("fifth", "test", Location::End).unwrap();
        reg
    }

    fn order<'a>(reg: &'a OrderedRegistry<&'static str>) -> Vec<&'a str> {
        reg.names().collect()
    }

    #[test]
    fn parse_locations() {
        assert_eq!("_begin".parse::<Location>().unwrap(), Location::Begin);
        assert_eq!("_end".parse::<Location>().unwrap(), Location::End);
        assert_eq!(
            "<strong".parse::<Location>().unwrap(),
            Location::before("strong")
        );
        assert_eq!(">link".parse::<Location>().unwrap(), Location::after("link"));
    }

    #[test]
    fn malformed_locations_are_config_errors() {
        for bad in ["third", "", "<", ">", "begin", "^first"] {
            let err = bad.parse::<Location>().unwrap_err();
            assert!(matches!(err, MarkupError::Config { .. }), "{bad:?}: {err}");
        }
    }

    #[test]
    fn location_display_round_trips() {
        for s in ["_begin", "_end", "<a", ">b"] {
            assert_eq!(s.parse::<Location>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn add_before() {
        let mut reg = sample();
        reg.add_at("second", "is", "<third").unwrap();
        assert_eq!(order(&reg), ["first", "second", "third", "fourth", "fifth"]);
    }

    #[test]
    fn add_after() {
        let mut reg = sample();
        reg.add_at("second", "is", ">first").unwrap();
        assert_eq!(order(&reg), ["first", "second", "third", "fourth", "fifth"]);
    }

    #[test]
    fn add_after_last() {
        let mut reg = sample();
        reg.add_at("sixth", ".", ">fifth").unwrap();
        assert_eq!(order(&reg), ["first", "third", "fourth", "fifth", "sixth"]);
    }

    #[test]
    fn add_begin_and_end() {
        let mut reg = sample();
        reg.add_at("zero", "CRAZY", "_begin").unwrap();
        reg.add_at("sixth", ".", "_end").unwrap();
        assert_eq!(
            order(&reg),
            ["zero", "first", "third", "fourth", "fifth", "sixth"]
        );
    }

    #[test]
    fn add_with_unknown_reference_fails_and_leaves_registry() {
        let mut reg = sample();
        let err = reg.add_at("sixth", ".", "<seventh").unwrap_err();
        assert!(matches!(err, MarkupError::Config { .. }));
        let err = reg.add_at("second", "is", "third").unwrap_err();
        assert!(matches!(err, MarkupError::Config { .. }));
        assert_eq!(order(&reg), ["first", "third", "fourth", "fifth"]);
    }

    #[test]
    fn duplicate_name_never_overwrites() {
        let mut reg = sample();
        let err = reg.add_at("third", "other", "_begin").unwrap_err();
        assert!(matches!(err, MarkupError::Config { .. }));
        assert_eq!(*reg.get("third").unwrap(), "a");
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn order_is_a_function_of_directives() {
        let directives = [
            ("a", "_end"),
            ("b", "_begin"),
            ("c", ">b"),
            ("d", "<a"),
            ("e", "_end"),
            ("f", ">e"),
            ("g", "<b"),
        ];
        let build = || {
            let mut reg = OrderedRegistry::new();
            for (name, loc) in directives {
                reg.add_at(name, (), loc).unwrap();
            }
            reg.names().map(str::to_string).collect::<Vec<_>>()
        };
        assert_eq!(build(), ["g", "b", "c", "d", "a", "e", "f"]);
        assert_eq!(build(), build());
    }

    #[test]
    fn remove_and_get() {
        let mut reg = sample();
        assert_eq!(reg.remove("fourth").unwrap(), "self");
        assert_eq!(order(&reg), ["first", "third", "fifth"]);
        assert!(matches!(
            reg.remove("fourth").unwrap_err(),
            MarkupError::NotFound { .. }
        ));
        assert!(matches!(
            reg.get("fourth").unwrap_err(),
            MarkupError::NotFound { .. }
        ));
        assert_eq!(*reg.get("fifth").unwrap(), "test");
    }

    #[test]
    fn replace_keeps_position() {
        let mut reg = sample();
        assert_eq!(reg.replace("fourth", "CRAZY").unwrap(), "self");
        assert_eq!(order(&reg), ["first", "third", "fourth", "fifth"]);
        assert_eq!(*reg.get("fourth").unwrap(), "CRAZY");
        assert!(reg.replace("missing", "x").is_err());
    }

    #[test]
    fn link_moves_entry() {
        let mut reg = sample();
        reg.link("fourth", Location::before("third")).unwrap();
        assert_eq!(order(&reg), ["first", "fourth", "third", "fifth"]);
        reg.link("first", Location::End).unwrap();
        assert_eq!(order(&reg), ["fourth", "third", "fifth", "first"]);
    }

    #[test]
    fn bad_link_keeps_data() {
        let mut reg = sample();
        assert!(reg.link("fourth", Location::before("bad")).is_err());
        assert!(reg.link("fourth", Location::after("fourth")).is_err());
        assert_eq!(order(&reg), ["first", "third", "fourth", "fifth"]);
        assert!(matches!(
            reg.link("nope", Location::End).unwrap_err(),
            MarkupError::NotFound { .. }
        ));
    }

    #[test]
    fn iter_yields_current_order() {
        let reg = sample();
        let values: Vec<_> = reg.stages().copied().collect();
        assert_eq!(values, ["This", "a", "self", "test"]);
        assert_eq!(reg.index_of("fifth"), Some(3));
    }
}
