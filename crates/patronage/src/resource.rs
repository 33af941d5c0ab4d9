//! Partial data model for the API's paginated resource documents.
//!
//! The API speaks a JSON:API-shaped dialect: a `data` section that is either
//! one resource or a list, an `included` sidecar for related resources, and
//! a `links.next` pagination pointer. Only the fields the synchronizer needs
//! are modeled, which keeps deserialization resilient to API additions.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One page of the API, or a single-resource event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub data: Option<OneOrMany<Resource>>,
    #[serde(default)]
    pub included: Vec<Resource>,
    #[serde(default)]
    pub links: Links,
}

impl Document {
    /// Primary entries, normalized to a sequence.
    ///
    /// A single-member payload yields a one-element slice; a missing `data`
    /// section yields an empty slice (see [`has_data`](Self::has_data)).
    #[must_use]
    pub fn entries(&self) -> &[Resource] {
        self.data.as_ref().map(OneOrMany::as_slice).unwrap_or(&[])
    }

    /// Whether the document carried a `data` section at all.
    ///
    /// `{"data": []}` is a valid empty page; `{}` is not a page.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// The next-page URI, if pagination continues.
    #[must_use]
    pub fn next_link(&self) -> Option<&str> {
        self.links.next.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

/// A resource entry: id, type, raw attributes, named relationships.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub relationships: HashMap<String, Relationship>,
}

impl Resource {
    /// Identifiers linked under the named relationship (empty when the
    /// relationship is absent or its data is null).
    #[must_use]
    pub fn related(&self, name: &str) -> &[ResourceIdentifier] {
        self.relationships
            .get(name)
            .map(|r| r.data.as_slice())
            .unwrap_or(&[])
    }

    /// The single identifier of a to-one relationship.
    #[must_use]
    pub fn related_id(&self, name: &str) -> Option<&str> {
        self.related(name).first().map(|r| r.id.as_str())
    }
}

/// A relationship's linkage, normalized to a list at deserialization time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Relationship {
    #[serde(default, deserialize_with = "de_identifiers")]
    pub data: Vec<ResourceIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// `data` sections may hold one resource or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item),
            OneOrMany::Many(items) => items.as_slice(),
        }
    }
}

fn de_identifiers<'de, D>(deserializer: D) -> Result<Vec<ResourceIdentifier>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<OneOrMany<ResourceIdentifier>>::deserialize(deserializer)?;
    Ok(match raw {
        None => Vec::new(),
        Some(OneOrMany::One(id)) => vec![id],
        Some(OneOrMany::Many(ids)) => ids,
    })
}

/// Member attributes - the fields extraction needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberAttributes {
    #[serde(default)]
    pub currently_entitled_amount_cents: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub last_charge_date: Option<String>,
    #[serde(default)]
    pub last_charge_status: Option<String>,
}

/// Reward tier attributes from the campaign listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TierAttributes {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub amount_cents: i64,
}
