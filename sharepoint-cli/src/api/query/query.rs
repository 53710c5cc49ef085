//! Immutable query value
//!
//! Every composition method takes `&self` and returns a new `Query`, so a
//! query already handed to an executor can never change underneath it.

use serde::{Deserialize, Serialize};

use super::filters::Predicate;
use super::orderby::{Direction, OrderBy};
use super::projection::Projection;

/// Server-side paging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub skip: Option<u32>,
    /// `None` means unbounded
    pub top: Option<u32>,
}

impl PageSpec {
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.top.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    predicate: Option<Predicate>,
    order: Vec<OrderBy>,
    projection: Projection,
    page: PageSpec,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate; successive calls are AND-ed together
    pub fn filter(&self, predicate: Predicate) -> Self {
        let mut next = self.clone();
        next.predicate = Some(match next.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        next
    }

    /// Append an ordering term (lower priority than existing terms)
    pub fn order_by(&self, field: impl Into<String>, direction: Direction) -> Self {
        let mut next = self.clone();
        next.order.push(OrderBy {
            field: field.into(),
            direction,
        });
        next
    }

    pub fn select<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.projection = fields
            .into_iter()
            .fold(next.projection, |p, field| p.select(field));
        next
    }

    pub fn expand(&self, field: impl Into<String>, nested: Projection) -> Self {
        let mut next = self.clone();
        next.projection = next.projection.expand(field, nested);
        next
    }

    pub fn skip(&self, skip: u32) -> Self {
        let mut next = self.clone();
        next.page.skip = Some(skip);
        next
    }

    pub fn top(&self, top: u32) -> Self {
        let mut next = self.clone();
        next.page.top = Some(top);
        next
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn order(&self) -> &[OrderBy] {
        &self.order
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn page(&self) -> PageSpec {
        self.page
    }

    /// No predicate, ordering, projection or paging
    pub fn is_empty(&self) -> bool {
        self.predicate.is_none()
            && self.order.is_empty()
            && self.projection.is_empty()
            && self.page.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composition_does_not_mutate_original() {
        let base = Query::new().filter(Predicate::eq("Title", "A"));
        let narrowed = base.filter(Predicate::gt("Id", 3)).top(5);

        assert!(matches!(base.predicate(), Some(Predicate::Comparison { .. })));
        assert_eq!(base.page(), PageSpec::default());
        assert!(matches!(narrowed.predicate(), Some(Predicate::And(_, _))));
        assert_eq!(narrowed.page().top, Some(5));
    }

    #[test]
    fn test_order_terms_keep_insertion_order() {
        let q = Query::new()
            .order_by("Modified", Direction::Descending)
            .order_by("Title", Direction::Ascending);
        assert_eq!(q.order(), &[OrderBy::desc("Modified"), OrderBy::asc("Title")]);
    }

    #[test]
    fn test_empty_query() {
        assert!(Query::new().is_empty());
        assert!(!Query::new().skip(0).is_empty());
    }
}
