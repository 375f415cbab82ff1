//! Presence checks deciding whether an optional backend block is emitted.
//!
//! Like the group accessors, these only look at the first instance.

use crate::instance::ServiceInstance;
use crate::label::{self, raw_label};

/// True if the first instance carries a non-empty value for `key`.
pub fn has_first(group: &[ServiceInstance], key: &str) -> bool {
    group
        .first()
        .is_some_and(|first| raw_label(first, key).is_some())
}

/// True if the first instance carries any of `keys`.
pub fn has_any(group: &[ServiceInstance], keys: &[&str]) -> bool {
    keys.iter().any(|key| has_first(group, key))
}

pub fn has_load_balancer_block(group: &[ServiceInstance]) -> bool {
    has_any(
        group,
        &[
            label::BACKEND_LB_METHOD,
            label::BACKEND_LB_STICKY,
            label::BACKEND_LB_STICKINESS,
            label::BACKEND_LB_STICKINESS_COOKIE_NAME,
        ],
    )
}

pub fn has_health_check_block(group: &[ServiceInstance]) -> bool {
    has_first(group, label::BACKEND_HEALTH_CHECK_PATH)
}

pub fn has_circuit_breaker_block(group: &[ServiceInstance]) -> bool {
    has_first(group, label::BACKEND_CIRCUIT_BREAKER_EXPRESSION)
}

/// Both the amount and the extractor are required; a half-configured
/// limiter is not emitted.
pub fn has_max_conn_block(group: &[ServiceInstance]) -> bool {
    has_first(group, label::BACKEND_MAX_CONN_AMOUNT)
        && has_first(group, label::BACKEND_MAX_CONN_EXTRACTOR_FUNC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_has_nothing() {
        assert!(!has_first(&[], label::BACKEND_LB_METHOD));
        assert!(!has_load_balancer_block(&[]));
        assert!(!has_max_conn_block(&[]));
    }

    #[test]
    fn only_first_instance_counts() {
        let group = vec![
            ServiceInstance::new("web"),
            ServiceInstance::new("web").with_label(label::BACKEND_HEALTH_CHECK_PATH, "/health"),
        ];
        assert!(!has_health_check_block(&group));
    }

    #[test]
    fn empty_value_is_not_present() {
        let group = vec![
            ServiceInstance::new("web").with_label(label::BACKEND_CIRCUIT_BREAKER_EXPRESSION, ""),
        ];
        assert!(!has_circuit_breaker_block(&group));
    }

    #[test]
    fn any_load_balancer_key_enables_block() {
        for key in [
            label::BACKEND_LB_METHOD,
            label::BACKEND_LB_STICKY,
            label::BACKEND_LB_STICKINESS,
            label::BACKEND_LB_STICKINESS_COOKIE_NAME,
        ] {
            let group = vec![ServiceInstance::new("web").with_label(key, "x")];
            assert!(has_load_balancer_block(&group), "{key}");
        }
    }
}
