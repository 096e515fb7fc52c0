//! Filter trees for read operations.
//!
//! A [`FilterTree`] is either a flat conjunction of field predicates or an
//! AND / OR / NOT combinator over sub-trees. Trees compile to MongoDB query
//! documents and can also be evaluated directly against a BSON row, which is
//! what the in-memory store does.

use mongodb::bson::{doc, Bson, Document};
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Bson),
    Ne(Bson),
    Lt(Bson),
    Lte(Bson),
    Gt(Bson),
    Gte(Bson),
    In(Vec<Bson>),
    NotIn(Vec<Bson>),
    /// `IsSet(false)` matches a missing or null field.
    IsSet(bool),
}

/// A condition on one (possibly dotted) field path.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub condition: Condition,
}

impl Predicate {
    pub fn new(field: impl Into<String>, condition: Condition) -> Self {
        Self {
            field: field.into(),
            condition,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, Condition::Eq(value.into()))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, Condition::Ne(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, Condition::Lte(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, Condition::Gte(value.into()))
    }

    pub fn not_in(field: impl Into<String>, values: Vec<Bson>) -> Self {
        Self::new(field, Condition::NotIn(values))
    }

    pub fn is_set(field: impl Into<String>, set: bool) -> Self {
        Self::new(field, Condition::IsSet(set))
    }

    fn condition_document(&self) -> Document {
        match &self.condition {
            Condition::Eq(v) => doc! { "$eq": v.clone() },
            Condition::Ne(v) => doc! { "$ne": v.clone() },
            Condition::Lt(v) => doc! { "$lt": v.clone() },
            Condition::Lte(v) => doc! { "$lte": v.clone() },
            Condition::Gt(v) => doc! { "$gt": v.clone() },
            Condition::Gte(v) => doc! { "$gte": v.clone() },
            Condition::In(vs) => doc! { "$in": vs.clone() },
            Condition::NotIn(vs) => doc! { "$nin": vs.clone() },
            Condition::IsSet(true) => doc! { "$ne": Bson::Null },
            Condition::IsSet(false) => doc! { "$eq": Bson::Null },
        }
    }

    /// Evaluate with MongoDB semantics: a missing field behaves like null,
    /// ordering comparisons never match across types or against null.
    pub fn matches(&self, row: &Document) -> bool {
        let value = lookup(row, &self.field).unwrap_or(&Bson::Null);
        match &self.condition {
            Condition::Eq(expected) => values_equal(value, expected),
            Condition::Ne(expected) => !values_equal(value, expected),
            Condition::Lt(bound) => compare(value, bound) == Some(Ordering::Less),
            Condition::Lte(bound) => matches!(
                compare(value, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Condition::Gt(bound) => compare(value, bound) == Some(Ordering::Greater),
            Condition::Gte(bound) => matches!(
                compare(value, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::In(options) => options.iter().any(|o| values_equal(value, o)),
            Condition::NotIn(options) => !options.iter().any(|o| values_equal(value, o)),
            Condition::IsSet(set) => (*value != Bson::Null) == *set,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterTree {
    /// Flat conjunction of field predicates. Empty matches every row.
    Fields(Vec<Predicate>),
    And(Vec<FilterTree>),
    /// Empty matches no row.
    Or(Vec<FilterTree>),
    Not(Box<FilterTree>),
}

/// The empty conjunction, matching every row.
impl Default for FilterTree {
    fn default() -> Self {
        FilterTree::Fields(Vec::new())
    }
}

impl FilterTree {
    pub fn field(predicate: Predicate) -> Self {
        FilterTree::Fields(vec![predicate])
    }

    pub fn fields(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        FilterTree::Fields(predicates.into_iter().collect())
    }

    pub fn and(children: impl IntoIterator<Item = FilterTree>) -> Self {
        FilterTree::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = FilterTree>) -> Self {
        FilterTree::Or(children.into_iter().collect())
    }

    pub fn not(child: FilterTree) -> Self {
        FilterTree::Not(Box::new(child))
    }

    /// Compile to a MongoDB query document.
    pub fn to_document(&self) -> Document {
        match self {
            FilterTree::Fields(predicates) => {
                let mut seen = HashSet::new();
                let repeated = predicates.iter().any(|p| !seen.insert(p.field.as_str()));
                if repeated {
                    // A document cannot hold the same key twice.
                    let parts: Vec<Document> = predicates
                        .iter()
                        .map(|p| {
                            let mut part = Document::new();
                            part.insert(p.field.clone(), p.condition_document());
                            part
                        })
                        .collect();
                    doc! { "$and": parts }
                } else {
                    predicates
                        .iter()
                        .map(|p| (p.field.clone(), Bson::Document(p.condition_document())))
                        .collect()
                }
            }
            FilterTree::And(children) if children.is_empty() => Document::new(),
            FilterTree::And(children) => {
                let parts: Vec<Document> = children.iter().map(|c| c.to_document()).collect();
                doc! { "$and": parts }
            }
            // MongoDB rejects an empty $or.
            FilterTree::Or(children) if children.is_empty() => {
                doc! { "_id": { "$in": [] } }
            }
            FilterTree::Or(children) => {
                let parts: Vec<Document> = children.iter().map(|c| c.to_document()).collect();
                doc! { "$or": parts }
            }
            // MongoDB has no top-level $not; $nor over one clause negates it.
            FilterTree::Not(child) => doc! { "$nor": [child.to_document()] },
        }
    }

    pub fn matches(&self, row: &Document) -> bool {
        match self {
            FilterTree::Fields(predicates) => predicates.iter().all(|p| p.matches(row)),
            FilterTree::And(children) => children.iter().all(|c| c.matches(row)),
            FilterTree::Or(children) => children.iter().any(|c| c.matches(row)),
            FilterTree::Not(child) => !child.matches(row),
        }
    }
}

/// Compile an optional tree; absent means "match everything".
pub fn to_query(filter: Option<&FilterTree>) -> Document {
    filter.map(FilterTree::to_document).unwrap_or_default()
}

/// Resolve a dotted path such as `security.protected`.
pub fn lookup<'a>(row: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = row.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
