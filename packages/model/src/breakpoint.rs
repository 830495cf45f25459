//! Responsive breakpoints
//!
//! Breakpoints are totally ordered by `min_width`, ties broken by their
//! position in the list. The breakpoint with `min_width == 0` is the base
//! scope every other rule cascades from and must always exist.

use crate::ModelError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    pub id: String,
    pub label: String,
    pub min_width: u32,
}

impl Breakpoint {
    pub fn new(id: impl Into<String>, label: impl Into<String>, min_width: u32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            min_width,
        }
    }

    pub fn is_base(&self) -> bool {
        self.min_width == 0
    }
}

/// The `breakpoints` container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breakpoints(pub Vec<Breakpoint>);

impl Breakpoints {
    pub fn new(breakpoints: Vec<Breakpoint>) -> Self {
        Self(breakpoints)
    }

    /// Mobile-first defaults used for new projects
    pub fn defaults() -> Self {
        Self(vec![
            Breakpoint::new("base", "Base", 0),
            Breakpoint::new("tablet", "Tablet", 768),
            Breakpoint::new("laptop", "Laptop", 1024),
            Breakpoint::new("desktop", "Desktop", 1280),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Breakpoint> {
        self.0.iter().find(|bp| bp.id == id)
    }

    /// The zero-width breakpoint
    pub fn base(&self) -> Result<&Breakpoint, ModelError> {
        self.0
            .iter()
            .find(|bp| bp.is_base())
            .ok_or(ModelError::MissingBaseBreakpoint)
    }

    /// Breakpoints in cascade order (stable sort keeps list order on ties)
    pub fn sorted(&self) -> Vec<&Breakpoint> {
        let mut sorted: Vec<&Breakpoint> = self.0.iter().collect();
        sorted.sort_by_key(|bp| bp.min_width);
        sorted
    }

    /// Breakpoints whose rules apply when `id` is selected, widest last.
    ///
    /// Returns an empty list when `id` is unknown.
    pub fn cascade_for(&self, id: &str) -> Vec<&Breakpoint> {
        let sorted = self.sorted();
        match sorted.iter().position(|bp| bp.id == id) {
            Some(index) => sorted[..=index].to_vec(),
            None => Vec::new(),
        }
    }

    /// Insert a breakpoint or replace the one with the same id
    pub fn upsert(&mut self, breakpoint: Breakpoint) {
        match self.0.iter_mut().find(|bp| bp.id == breakpoint.id) {
            Some(existing) => *existing = breakpoint,
            None => self.0.push(breakpoint),
        }
    }

    /// Remove a breakpoint by id. The base breakpoint cannot be removed.
    pub fn remove(&mut self, id: &str) -> Result<Breakpoint, ModelError> {
        let index = self
            .0
            .iter()
            .position(|bp| bp.id == id)
            .ok_or_else(|| ModelError::BreakpointNotFound(id.to_string()))?;

        if self.0[index].is_base() && self.0.iter().filter(|bp| bp.is_base()).count() == 1 {
            return Err(ModelError::BaseBreakpointDeletion(id.to_string()));
        }

        Ok(self.0.remove(index))
    }

    /// Check the list can be published
    pub fn validate(&self) -> Result<(), ModelError> {
        self.base().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_is_stable_on_ties() {
        let bps = Breakpoints::new(vec![
            Breakpoint::new("wide", "Wide", 1280),
            Breakpoint::new("a", "A", 768),
            Breakpoint::new("base", "Base", 0),
            Breakpoint::new("b", "B", 768),
        ]);

        let ids: Vec<&str> = bps.sorted().iter().map(|bp| bp.id.as_str()).collect();
        assert_eq!(ids, vec!["base", "a", "b", "wide"]);
    }

    #[test]
    fn test_cascade_for() {
        let bps = Breakpoints::defaults();
        let ids: Vec<&str> = bps.cascade_for("laptop").iter().map(|bp| bp.id.as_str()).collect();
        assert_eq!(ids, vec!["base", "tablet", "laptop"]);
        assert!(bps.cascade_for("missing").is_empty());
    }

    #[test]
    fn test_base_required() {
        let bps = Breakpoints::new(vec![Breakpoint::new("tablet", "Tablet", 768)]);
        assert_eq!(bps.validate(), Err(ModelError::MissingBaseBreakpoint));
        assert!(Breakpoints::defaults().validate().is_ok());
    }

    #[test]
    fn test_remove_base_is_rejected() {
        let mut bps = Breakpoints::defaults();
        assert!(matches!(
            bps.remove("base"),
            Err(ModelError::BaseBreakpointDeletion(_))
        ));
        assert!(bps.remove("tablet").is_ok());
        assert_eq!(bps.len(), 3);
        assert!(matches!(bps.remove("tablet"), Err(ModelError::BreakpointNotFound(_))));
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut bps = Breakpoints::defaults();
        bps.upsert(Breakpoint::new("tablet", "Tablet", 800));
        assert_eq!(bps.get("tablet").unwrap().min_width, 800);
        assert_eq!(bps.len(), 4);
    }
}
