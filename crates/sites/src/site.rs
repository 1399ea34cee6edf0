//! The site record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

/// Index over the site's domain (unique)
pub const DOMAIN_INDEX: &str = "domain";

/// Index over site owners (one entry per owner)
pub const OWNERS_INDEX: &str = "owners";

/// A hosted static site.
///
/// A record exists only once the site's directories, certificate and vhost
/// have been provisioned; it is the last thing written on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    /// Domain the site is served on; also the record key
    domain: String,
    /// Deploy counter
    #[serde(default)]
    pub deploys: u64,
    /// Owner identifiers, in the order they were added
    #[serde(default)]
    pub owners: Vec<String>,
    /// When the certificate and vhost were first activated
    #[serde(default)]
    pub cert_created: Option<DateTime<Utc>>,
    /// When the certificate was last renewed
    #[serde(default)]
    pub cert_renewed: Option<DateTime<Utc>>,
}

impl Site {
    /// Build the record written after a successful registration.
    pub fn new(domain: impl Into<String>, owners: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            domain: domain.into(),
            deploys: 1,
            owners,
            cert_created: Some(now),
            cert_renewed: None,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Append an owner. Duplicates are kept.
    pub fn add_owner(&mut self, owner: impl Into<String>) {
        self.owners.push(owner.into());
    }

    /// Remove the first occurrence of `owner`.
    ///
    /// Returns whether anything was removed; removing a non-member leaves
    /// the owner list untouched.
    pub fn remove_owner(&mut self, owner: &str) -> bool {
        match self.owners.iter().position(|o| o == owner) {
            Some(index) => {
                self.owners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owners.iter().any(|o| o == owner)
    }
}

impl Record for Site {
    const MODEL: &'static str = "site";

    fn key(&self) -> &str {
        &self.domain
    }

    fn index_values(&self, index: &str) -> Vec<String> {
        match index {
            DOMAIN_INDEX => vec![self.domain.clone()],
            OWNERS_INDEX => self.owners.clone(),
            _ => Vec::new(),
        }
    }
}

/// Longest name DNS can carry, without the root dot
pub const MAX_HOSTNAME_LEN: usize = 253;

const MAX_LABEL_LEN: usize = 63;

/// Whether `name` is a plain host name: dot-separated labels of ASCII
/// letters, digits and `-`, no label starting or ending with `-`.
///
/// The fully-qualified form with a trailing dot is not accepted, and
/// neither is anything nginx or a shell would read as syntax.
pub fn is_valid_hostname(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_HOSTNAME_LEN {
        return false;
    }

    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

/// Canonical form a domain is stored and looked up under
pub fn normalize_hostname(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
}

/// Whether `domain` is `<name>.<apex>` with `<name>` in `reserved`.
///
/// Matching is ASCII case-insensitive and ignores a trailing root dot. Only
/// the label directly in front of the apex is considered a sub-domain name:
/// `a.www.<apex>` is not reserved by `www`.
pub fn is_reserved_subdomain(domain: &str, apex: &str, reserved: &[String]) -> bool {
    let domain = normalize_hostname(domain);
    let suffix = format!(".{}", normalize_hostname(apex));

    match domain.strip_suffix(&suffix) {
        Some(name) => reserved.iter().any(|r| r.eq_ignore_ascii_case(name)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reserved() -> Vec<String> {
        vec!["www".to_string(), "api".to_string()]
    }

    #[test]
    fn test_new_site() {
        let now = Utc::now();
        let site = Site::new("alice.static.land", vec!["alice".into()], now);

        assert_eq!(site.domain(), "alice.static.land");
        assert_eq!(site.deploys, 1);
        assert_eq!(site.owners, vec!["alice"]);
        assert_eq!(site.cert_created, Some(now));
        assert_eq!(site.cert_renewed, None);
    }

    #[test]
    fn test_serialized_field_names() {
        let site = Site::new("a.static.land", vec!["a".into()], Utc::now());
        let json = serde_json::to_value(&site).unwrap();

        assert!(json.get("certCreated").is_some());
        assert!(json.get("certRenewed").unwrap().is_null());
        assert_eq!(json["deploys"], 1);
        assert_eq!(json["domain"], "a.static.land");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let site: Site = serde_json::from_str(r#"{"domain": "old.example.com"}"#).unwrap();
        assert_eq!(site.deploys, 0);
        assert!(site.owners.is_empty());
        assert!(site.cert_created.is_none());
    }

    #[test]
    fn test_add_owner_keeps_duplicates() {
        let mut site = Site::new("a.static.land", vec!["alice".into()], Utc::now());
        site.add_owner("alice");
        assert_eq!(site.owners, vec!["alice", "alice"]);
    }

    #[test]
    fn test_remove_owner_first_match_only() {
        let mut site = Site::new(
            "a.static.land",
            vec!["alice".into(), "bob".into(), "alice".into()],
            Utc::now(),
        );
        assert!(site.remove_owner("alice"));
        assert_eq!(site.owners, vec!["bob", "alice"]);
    }

    #[test]
    fn test_remove_non_member_is_noop() {
        let mut site = Site::new("a.static.land", vec!["alice".into()], Utc::now());
        assert!(!site.remove_owner("mallory"));
        assert_eq!(site.owners, vec!["alice"]);
    }

    #[test]
    fn test_index_values() {
        let site = Site::new(
            "a.static.land",
            vec!["alice".into(), "bob".into()],
            Utc::now(),
        );
        assert_eq!(site.index_values(DOMAIN_INDEX), vec!["a.static.land"]);
        assert_eq!(site.index_values(OWNERS_INDEX), vec!["alice", "bob"]);
        assert!(site.index_values("deploys").is_empty());
    }

    #[test]
    fn test_reserved_subdomains() {
        let reserved = reserved();
        assert!(is_reserved_subdomain("www.static.land", "static.land", &reserved));
        assert!(is_reserved_subdomain("API.Static.Land", "static.land", &reserved));
        assert!(!is_reserved_subdomain("alice.static.land", "static.land", &reserved));
        assert!(!is_reserved_subdomain("a.www.static.land", "static.land", &reserved));
        assert!(!is_reserved_subdomain("www.example.com", "static.land", &reserved));
        assert!(!is_reserved_subdomain("static.land", "static.land", &reserved));
        assert!(!is_reserved_subdomain("wwwstatic.land", "static.land", &reserved));
    }

    #[test]
    fn test_reserved_fully_qualified_form() {
        let reserved = reserved();
        assert!(is_reserved_subdomain("www.static.land.", "static.land", &reserved));
        assert!(is_reserved_subdomain("WWW.static.land.", "static.land.", &reserved));
        assert!(!is_reserved_subdomain("alice.static.land.", "static.land", &reserved));
    }

    #[test]
    fn test_valid_hostnames() {
        for name in [
            "static.land",
            "alice.static.land",
            "Alice.Example.COM",
            "xn--bcher-kva.example",
            "a-b.c1.io",
            "localhost",
        ] {
            assert!(is_valid_hostname(name), "{name}");
        }
    }

    #[test]
    fn test_invalid_hostnames() {
        let long_label = format!("{}.com", "a".repeat(64));
        let long_name = vec!["abcdefghi"; 26].join(".");
        for name in [
            "",
            ".foo",
            "foo.",
            "www.static.land.",
            "a..b",
            "-a.com",
            "a-.com",
            "a b.com",
            "a.com;",
            "x.static.land;\n    autoindex on",
            "a{b}.com",
            "a/b.com",
            "under_score.com",
            long_label.as_str(),
            long_name.as_str(),
        ] {
            assert!(!is_valid_hostname(name), "{name:?}");
        }
    }

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("Alice.Static.Land."), "alice.static.land");
        assert_eq!(normalize_hostname("alice.static.land"), "alice.static.land");
    }

    proptest! {
        #[test]
        fn prop_add_then_remove_restores_owners(
            owners in prop::collection::vec("[a-z]{1,8}", 1..6),
            extra in "[a-z]{1,8}",
        ) {
            let mut site = Site::new("p.static.land", owners.clone(), Utc::now());
            site.add_owner(extra.clone());
            site.remove_owner(&extra);

            // Removal takes the first match, so the appended owner only comes
            // back off the end when it was not already a member.
            if owners.contains(&extra) {
                let mut expected = owners.clone();
                let first = expected.iter().position(|o| *o == extra).unwrap();
                expected.remove(first);
                expected.push(extra);
                prop_assert_eq!(site.owners, expected);
            } else {
                prop_assert_eq!(site.owners, owners);
            }
        }

        #[test]
        fn prop_unreserved_names_are_free(name in "[a-z][a-z0-9]{0,12}") {
            let reserved = reserved();
            let domain = format!("{}.static.land", name);
            prop_assert_eq!(
                is_reserved_subdomain(&domain, "static.land", &reserved),
                reserved.contains(&name)
            );
        }

        #[test]
        fn prop_reserved_names_always_reserved(
            name in "(www|api)",
            upper in any::<bool>(),
            root_dot in any::<bool>(),
        ) {
            let mut domain = format!("{}.static.land", name);
            if upper {
                domain = domain.to_ascii_uppercase();
            }
            if root_dot {
                domain.push('.');
            }
            prop_assert!(is_reserved_subdomain(&domain, "static.land", &reserved()));
        }

        #[test]
        fn prop_other_apexes_never_reserved(name in "(www|api)", apex in "[a-z]{3,10}\\.(com|net)") {
            let domain = format!("{}.{}", name, apex);
            prop_assert!(!is_reserved_subdomain(&domain, "static.land", &reserved()));
        }
    }
}
