//! Pure extraction of membership state from one API page.
//!
//! Each members page is boiled down to four partial maps covering only the
//! patrons on that page; merging partials across pages is the
//! reconciliation engine's job.

use tracing::debug;

use crate::cache::{DeclineMap, PledgeMap, RewardMemberMap, UserMap};
use crate::resource::{Document, MemberAttributes, Resource};

/// Charge status string the API uses for a failed billing attempt.
const CHARGE_DECLINED: &str = "Declined";

/// Partial membership maps extracted from a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtract {
    /// Patron id -> entitled amount in cents.
    pub pledges: PledgeMap,
    /// Patron id -> last charge date, declined patrons only.
    pub declines: DeclineMap,
    /// Patron id -> lower-cased email.
    pub users: UserMap,
    /// Reward id -> patrons entitled to it on this page.
    pub reward_members: RewardMemberMap,
}

impl PageExtract {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pledges.is_empty()
            && self.declines.is_empty()
            && self.users.is_empty()
            && self.reward_members.is_empty()
    }
}

/// Extract the membership maps from one page document.
///
/// Only `member` entries carry membership state; entries of other types
/// are passed over. Members with no currently entitled tiers are former
/// or followed-only patrons and are skipped entirely.
#[must_use]
pub fn extract_page(document: &Document) -> PageExtract {
    let mut extract = PageExtract::default();
    for entry in document.entries() {
        extract_entry(entry, &mut extract);
    }
    extract
}

/// Fold one member resource into the partial maps.
///
/// Also used for single-resource event payloads, which share the shape of
/// a page entry.
pub fn extract_entry(entry: &Resource, extract: &mut PageExtract) {
    if entry.kind != "member" {
        return;
    }

    let tiers = entry.related("currently_entitled_tiers");
    if tiers.is_empty() {
        return;
    }

    let Some(patron_id) = entry.related_id("user") else {
        debug!(resource = %entry.id, "member entry without a user link");
        return;
    };
    let patron_id = patron_id.to_string();

    let attrs: MemberAttributes =
        serde_json::from_value(entry.attributes.clone()).unwrap_or_default();

    extract
        .pledges
        .insert(patron_id.clone(), attrs.currently_entitled_amount_cents);

    if attrs.last_charge_status.as_deref() == Some(CHARGE_DECLINED) {
        extract.declines.insert(
            patron_id.clone(),
            attrs.last_charge_date.unwrap_or_default(),
        );
    }

    if let Some(email) = attrs.email.filter(|e| !e.is_empty()) {
        extract.users.insert(patron_id.clone(), email.to_lowercase());
    }

    for tier in tiers {
        extract
            .reward_members
            .entry(tier.id.clone())
            .or_default()
            .push(patron_id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: serde_json::Value) -> Document {
        serde_json::from_value(value).expect("page should parse")
    }

    fn member(id: &str, user: &str, tiers: &[&str], attrs: serde_json::Value) -> serde_json::Value {
        json!({
            "id": id,
            "type": "member",
            "attributes": attrs,
            "relationships": {
                "user": {"data": {"id": user, "type": "user"}},
                "currently_entitled_tiers": {
                    "data": tiers.iter()
                        .map(|t| json!({"id": t, "type": "tier"}))
                        .collect::<Vec<_>>()
                }
            }
        })
    }

    #[test]
    fn extracts_all_four_maps_from_a_page() {
        let doc = page(json!({
            "data": [
                member("m1", "111", &["t1", "t2"], json!({
                    "currently_entitled_amount_cents": 500,
                    "email": "Alice@Example.COM",
                    "last_charge_status": "Paid"
                })),
                member("m2", "222", &["t1"], json!({
                    "currently_entitled_amount_cents": 250,
                    "last_charge_status": "Declined",
                    "last_charge_date": "2024-02-01T00:00:00.000+00:00"
                })),
            ]
        }));

        let extract = extract_page(&doc);

        assert_eq!(extract.pledges.get("111"), Some(&500));
        assert_eq!(extract.pledges.get("222"), Some(&250));

        assert_eq!(extract.users.get("111"), Some(&"alice@example.com".to_string()));
        assert!(!extract.users.contains_key("222"));

        assert!(!extract.declines.contains_key("111"));
        assert_eq!(
            extract.declines.get("222"),
            Some(&"2024-02-01T00:00:00.000+00:00".to_string())
        );

        assert_eq!(
            extract.reward_members.get("t1"),
            Some(&vec!["111".to_string(), "222".to_string()])
        );
        assert_eq!(
            extract.reward_members.get("t2"),
            Some(&vec!["111".to_string()])
        );
    }

    #[test]
    fn skips_members_with_no_entitled_tiers() {
        let doc = page(json!({
            "data": [
                member("m1", "111", &[], json!({
                    "currently_entitled_amount_cents": 0,
                    "email": "former@example.com"
                })),
            ]
        }));

        let extract = extract_page(&doc);
        assert!(extract.is_empty());
    }

    #[test]
    fn single_member_payloads_extract_like_a_one_entry_page() {
        let doc = page(json!({
            "data": member("m1", "333", &["t9"], json!({
                "currently_entitled_amount_cents": 300
            }))
        }));

        let extract = extract_page(&doc);
        assert_eq!(extract.pledges.get("333"), Some(&300));
        assert_eq!(
            extract.reward_members.get("t9"),
            Some(&vec!["333".to_string()])
        );
    }

    #[test]
    fn non_member_entries_are_ignored() {
        let doc = page(json!({
            "data": [{
                "id": "g1",
                "type": "goal",
                "attributes": {"currently_entitled_amount_cents": 100},
                "relationships": {
                    "user": {"data": {"id": "555", "type": "user"}},
                    "currently_entitled_tiers": {"data": [{"id": "t1", "type": "tier"}]}
                }
            }]
        }));

        let extract = extract_page(&doc);
        assert!(extract.is_empty());
    }

    #[test]
    fn members_without_a_user_link_are_dropped() {
        let doc = page(json!({
            "data": [{
                "id": "m1",
                "type": "member",
                "attributes": {"currently_entitled_amount_cents": 100},
                "relationships": {
                    "currently_entitled_tiers": {"data": [{"id": "t1", "type": "tier"}]}
                }
            }]
        }));

        let extract = extract_page(&doc);
        assert!(extract.is_empty());
    }

    #[test]
    fn blank_emails_are_not_recorded() {
        let doc = page(json!({
            "data": [member("m1", "444", &["t1"], json!({
                "currently_entitled_amount_cents": 100,
                "email": ""
            }))]
        }));

        let extract = extract_page(&doc);
        assert_eq!(extract.pledges.get("444"), Some(&100));
        assert!(extract.users.is_empty());
    }

    #[test]
    fn missing_attributes_default_rather_than_fail() {
        let doc = page(json!({
            "data": [{
                "id": "m1",
                "type": "member",
                "relationships": {
                    "user": {"data": {"id": "444", "type": "user"}},
                    "currently_entitled_tiers": {"data": [{"id": "t1", "type": "tier"}]}
                }
            }]
        }));

        let extract = extract_page(&doc);
        assert_eq!(extract.pledges.get("444"), Some(&0));
        assert!(extract.users.is_empty());
        assert!(extract.declines.is_empty());
    }
}
