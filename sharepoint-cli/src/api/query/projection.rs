//! Field projection with nested expansion

use serde::{Deserialize, Serialize};

/// One selected field, optionally expanded with its own projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub field: String,
    pub nested: Option<Projection>,
}

/// Selected fields in insertion order. Empty means "all default fields".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    selections: Vec<Selection>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projection of plain fields
    pub fn of<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields.into_iter().fold(Self::new(), |p, f| p.select(f))
    }

    /// Add a plain field; selecting a field twice keeps the first entry
    pub fn select(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.selections.iter().any(|s| s.field == field) {
            self.selections.push(Selection {
                field,
                nested: None,
            });
        }
        self
    }

    /// Expand a field with a child projection, merging with an earlier entry
    pub fn expand(mut self, field: impl Into<String>, nested: Projection) -> Self {
        let field = field.into();
        match self.selections.iter_mut().find(|s| s.field == field) {
            Some(existing) => {
                let merged = match existing.nested.take() {
                    Some(previous) => previous.merge(nested),
                    None => nested,
                };
                existing.nested = Some(merged);
            }
            None => self.selections.push(Selection {
                field,
                nested: Some(nested),
            }),
        }
        self
    }

    /// Union of two projections, keeping `self`'s order first
    pub fn merge(self, other: Projection) -> Self {
        other
            .selections
            .into_iter()
            .fold(self, |acc, selection| match selection.nested {
                Some(nested) => acc.expand(selection.field, nested),
                None => acc.select(selection.field),
            })
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}
