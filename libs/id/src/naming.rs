//! Deterministic name derivation.
//!
//! Sharded clusters are named after the address that owns them. The name is
//! a sanitized prefix of the address string followed by a name-based UUID of
//! the address resource name, which keeps ids short while making collisions
//! as unlikely as UUID collisions.

use uuid::Uuid;

use crate::{BrokerId, ClusterId, IdError};

/// Maximum length of a DNS-1123 label.
pub const MAX_LABEL_LENGTH: usize = 63;

/// Number of address characters kept in a sharded cluster id.
pub const MAX_ADDRESS_ID_LENGTH: usize = 10;

/// Cluster id shared by every pooled broker.
pub const POOLED_CLUSTER_ID: &str = "broker";

/// Prefix of pooled broker instance ids.
pub const POOLED_BROKER_PREFIX: &str = "broker-";

/// Instance id that all router usage accrues to.
pub const ROUTER_INSTANCE: &str = "all";

/// Namespace for sharded cluster UUIDs.
const SHARDED_CLUSTER_NAMESPACE: Uuid = Uuid::from_u128(0x9b1d_3c4e_7a2f_4e8b_a6d0_52c1_f0e3_8d47);

/// Validate a DNS-1123 label: `[a-z0-9]([a-z0-9-]*[a-z0-9])?`, at most 63 chars.
pub fn validate_label(s: &str) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    if s.len() > MAX_LABEL_LENGTH {
        return Err(IdError::TooLong {
            length: s.len(),
            max: MAX_LABEL_LENGTH,
        });
    }
    if let Some(character) = s
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(IdError::InvalidCharacter {
            name: s.to_string(),
            character,
        });
    }
    if s.starts_with('-') || s.ends_with('-') {
        return Err(IdError::InvalidBoundary(s.to_string()));
    }
    Ok(())
}

/// Reduce an arbitrary string to DNS label characters.
///
/// Uppercase ASCII is lowered, anything outside `[a-z0-9-]` is dropped, and
/// leading or trailing hyphens are trimmed. The result may be empty.
pub fn sanitize_name(name: &str) -> String {
    let clean: String = name
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    let clean = clean.trim_matches('-');
    truncate_label(clean, MAX_LABEL_LENGTH).to_string()
}

/// Join a sanitized name with a UUID, keeping the result within a label.
pub fn sanitize_with_uuid(name: &str, uuid: &str) -> String {
    let budget = MAX_LABEL_LENGTH.saturating_sub(uuid.len() + 1);
    let prefix = sanitize_name(name);
    let prefix = truncate_label(&prefix, budget);
    if prefix.is_empty() {
        uuid.to_string()
    } else {
        format!("{prefix}-{uuid}")
    }
}

/// Cluster id of the dedicated cluster owned by a sharded address.
///
/// `name` is the address resource name and seeds the UUID; `address` is the
/// address string, of which the first ten characters become the prefix.
pub fn sharded_cluster_id(name: &str, address: &str) -> ClusterId {
    let prefix: String = address.chars().take(MAX_ADDRESS_ID_LENGTH).collect();
    let uuid = Uuid::new_v5(&SHARDED_CLUSTER_NAMESPACE, name.as_bytes());
    ClusterId::from_validated(sanitize_with_uuid(&prefix, &uuid.to_string()))
}

/// Cluster id of the shared pooled broker cluster.
pub fn pooled_cluster_id() -> ClusterId {
    ClusterId::from_validated(POOLED_CLUSTER_ID.to_string())
}

/// Id of the `index`-th pooled broker.
pub fn pooled_broker_id(index: usize) -> BrokerId {
    BrokerId::from_validated(format!("{POOLED_BROKER_PREFIX}{index}"))
}

/// Returns true if `id` names a pooled broker (`broker-` followed by digits).
pub fn is_pooled_broker(id: &str) -> bool {
    id.strip_prefix(POOLED_BROKER_PREFIX)
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Id of the `index`-th subscription shard of a sharded cluster.
pub fn shard_broker_id(cluster_id: &ClusterId, index: usize) -> BrokerId {
    let suffix = format!("-{index}");
    let base = truncate_label(cluster_id.as_str(), MAX_LABEL_LENGTH - suffix.len());
    BrokerId::from_validated(format!("{base}{suffix}"))
}

/// Returns true if `id` is a subscription shard of `cluster_id`.
pub fn is_shard_of(id: &str, cluster_id: &ClusterId) -> bool {
    id.strip_prefix(cluster_id.as_str())
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn truncate_label(s: &str, max: usize) -> &str {
    // Sanitized labels are ASCII, so byte slicing is char-aligned.
    let cut = &s[..s.len().min(max)];
    cut.trim_end_matches('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("My_Queue.1"), "myqueue1");
        assert_eq!(sanitize_name("--topic--"), "topic");
        assert_eq!(sanitize_name("///"), "");
    }

    #[test]
    fn test_sharded_cluster_id_shape() {
        let id = sharded_cluster_id("space.xlarge-topic", "xlarge-topic");
        assert!(id.as_str().starts_with("xlarge-top-"));
        assert_eq!(id.as_str().len(), "xlarge-top-".len() + 36);
        assert!(validate_label(id.as_str()).is_ok());
    }

    #[test]
    fn test_sharded_cluster_id_without_usable_prefix() {
        let id = sharded_cluster_id("space.odd", "/$$/");
        assert_eq!(id.as_str().len(), 36);
        assert!(validate_label(id.as_str()).is_ok());
    }

    #[test]
    fn test_pooled_broker_ids() {
        assert_eq!(pooled_broker_id(0), "broker-0");
        assert!(is_pooled_broker("broker-12"));
        assert!(!is_pooled_broker("broker"));
        assert!(!is_pooled_broker("broker-"));
        assert!(!is_pooled_broker("broker-1a"));
        assert!(!is_pooled_broker("xbroker-1"));
    }

    #[test]
    fn test_shard_broker_id() {
        let cluster = sharded_cluster_id("space.t", "t");
        let shard = shard_broker_id(&cluster, 2);
        assert_eq!(shard.as_str(), format!("{cluster}-2"));
        assert!(is_shard_of(shard.as_str(), &cluster));
        assert!(!is_shard_of(cluster.as_str(), &cluster));
    }

    #[test]
    fn test_shard_broker_id_stays_within_label() {
        let cluster = ClusterId::parse(&"c".repeat(63)).unwrap();
        let shard = shard_broker_id(&cluster, 10);
        assert_eq!(shard.as_str().len(), 63);
        assert!(shard.as_str().ends_with("-10"));
    }

    proptest! {
        #[test]
        fn prop_sharded_cluster_id_deterministic(name in ".{1,40}", address in ".{1,40}") {
            let first = sharded_cluster_id(&name, &address);
            let second = sharded_cluster_id(&name, &address);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_sharded_cluster_id_is_valid_label(name in ".{0,80}", address in ".{0,80}") {
            let id = sharded_cluster_id(&name, &address);
            prop_assert!(validate_label(id.as_str()).is_ok());
        }

        #[test]
        fn prop_distinct_names_give_distinct_ids(a in "[a-z]{1,20}", b in "[a-z]{1,20}") {
            prop_assume!(a != b);
            prop_assert_ne!(sharded_cluster_id(&a, "queue"), sharded_cluster_id(&b, "queue"));
        }
    }
}
