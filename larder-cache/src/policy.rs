//! Cache policies and per-call overrides.

use crate::serialize::Serialization;
use std::time::Duration;

/// Expiration and serialization settings for a cache operation.
///
/// A client carries one default policy; every operation accepts a slice of
/// overrides that are layered on top of it with [`CachePolicy::merge`].
/// Policies are values: the `with_*` methods and `merge` always return a new
/// policy and never touch the receiver or the overrides.
///
/// # Examples
///
/// ```
/// use larder_cache::{CachePolicy, Serialization};
/// use std::time::Duration;
///
/// let defaults = CachePolicy::new()
///     .with_expiration(Duration::from_secs(60))
///     .with_strategy(Serialization::Json);
///
/// let resolved = defaults.merge(&[CachePolicy::new().with_strategy(Serialization::MessagePack)]);
///
/// assert_eq!(resolved.expiration(), Some(Duration::from_secs(60)));
/// assert_eq!(resolved.strategy(), Serialization::MessagePack);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    expiration: Option<Duration>,
    strategy: Option<Serialization>,
}

impl CachePolicy {
    /// A policy with no expiration and no strategy set.
    pub const fn new() -> Self {
        Self {
            expiration: None,
            strategy: None,
        }
    }

    /// Set the expiration. A zero duration leaves the expiration unset.
    pub const fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = if expiration.is_zero() {
            None
        } else {
            Some(expiration)
        };
        self
    }

    /// Set the serialization strategy.
    pub const fn with_strategy(mut self, strategy: Serialization) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Expiration to apply, if any.
    pub fn expiration(&self) -> Option<Duration> {
        self.expiration.filter(|d| !d.is_zero())
    }

    /// Strategy to apply, falling back to [`Serialization::default`] when unset.
    pub fn strategy(&self) -> Serialization {
        self.strategy.unwrap_or_default()
    }

    /// Whether a strategy was set explicitly.
    pub fn has_strategy(&self) -> bool {
        self.strategy.is_some()
    }

    /// Layer `overrides` over this policy, left to right.
    ///
    /// A later override wins over an earlier one. An override only replaces
    /// the running expiration when it is longer than zero and only replaces
    /// the running strategy when one is set.
    pub fn merge(&self, overrides: &[CachePolicy]) -> CachePolicy {
        overrides.iter().fold(*self, |mut merged, over| {
            if let Some(expiration) = over.expiration() {
                merged.expiration = Some(expiration);
            }
            if let Some(strategy) = over.strategy {
                merged.strategy = Some(strategy);
            }
            merged
        })
    }
}

impl From<Serialization> for CachePolicy {
    fn from(strategy: Serialization) -> Self {
        CachePolicy::new().with_strategy(strategy)
    }
}

impl From<Duration> for CachePolicy {
    fn from(expiration: Duration) -> Self {
        CachePolicy::new().with_expiration(expiration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy_strategy() -> impl Strategy<Value = CachePolicy> {
        (
            prop::option::of(0u64..5_000),
            prop::option::of(prop_oneof![
                Just(Serialization::Json),
                Just(Serialization::MessagePack)
            ]),
        )
            .prop_map(|(millis, strategy)| {
                let mut policy = CachePolicy::new();
                if let Some(millis) = millis {
                    policy = policy.with_expiration(Duration::from_millis(millis));
                }
                if let Some(strategy) = strategy {
                    policy = policy.with_strategy(strategy);
                }
                policy
            })
    }

    #[test]
    fn test_new_policy_is_unset() {
        let policy = CachePolicy::new();
        assert_eq!(policy.expiration(), None);
        assert!(!policy.has_strategy());
        assert_eq!(policy.strategy(), Serialization::Json);
    }

    #[test]
    fn test_zero_expiration_is_unset() {
        let policy = CachePolicy::new().with_expiration(Duration::ZERO);
        assert_eq!(policy.expiration(), None);
    }

    #[test]
    fn test_merge_later_override_wins() {
        let base = CachePolicy::new()
            .with_expiration(Duration::from_secs(60))
            .with_strategy(Serialization::Json);

        let merged = base.merge(&[
            CachePolicy::new().with_expiration(Duration::from_secs(10)),
            CachePolicy::new()
                .with_expiration(Duration::from_secs(20))
                .with_strategy(Serialization::MessagePack),
        ]);

        assert_eq!(merged.expiration(), Some(Duration::from_secs(20)));
        assert_eq!(merged.strategy(), Serialization::MessagePack);
    }

    #[test]
    fn test_merge_does_not_touch_inputs() {
        let base = CachePolicy::new().with_expiration(Duration::from_secs(60));
        let over = CachePolicy::new().with_strategy(Serialization::MessagePack);

        let merged = base.merge(&[over]);

        assert_eq!(base, CachePolicy::new().with_expiration(Duration::from_secs(60)));
        assert_eq!(over, CachePolicy::new().with_strategy(Serialization::MessagePack));
        assert_ne!(merged, base);
    }

    #[test]
    fn test_merge_with_no_overrides() {
        let base = CachePolicy::from(Duration::from_secs(5));
        assert_eq!(base.merge(&[]), base);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_merge_equals_pairwise_fold(
            base in policy_strategy(),
            overrides in prop::collection::vec(policy_strategy(), 0..8),
        ) {
            let whole = base.merge(&overrides);
            let folded = overrides
                .iter()
                .fold(base, |acc, over| acc.merge(std::slice::from_ref(over)));
            prop_assert_eq!(whole, folded);
        }

        #[test]
        fn prop_unset_fields_never_overwrite(base in policy_strategy()) {
            let merged = base.merge(&[
                CachePolicy::new(),
                CachePolicy::new().with_expiration(Duration::ZERO),
            ]);
            prop_assert_eq!(merged.expiration(), base.expiration());
            prop_assert_eq!(merged.has_strategy(), base.has_strategy());
            prop_assert_eq!(merged.strategy(), base.strategy());
        }

        #[test]
        fn prop_last_set_field_wins(
            base in policy_strategy(),
            overrides in prop::collection::vec(policy_strategy(), 1..8),
        ) {
            let merged = base.merge(&overrides);

            let expected_expiration = overrides
                .iter()
                .rev()
                .find_map(|p| p.expiration())
                .or(base.expiration());
            let expected_strategy = overrides
                .iter()
                .rev()
                .find(|p| p.has_strategy())
                .map(|p| p.strategy())
                .unwrap_or(base.strategy());

            prop_assert_eq!(merged.expiration(), expected_expiration);
            prop_assert_eq!(merged.strategy(), expected_strategy);
        }
    }
}
