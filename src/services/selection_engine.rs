//! Adaptive stimulus selection.
//!
//! Pure logic: partition an experiment's ideas into fixation and expansion
//! pools, drop what the participant has already seen, draw the next stimulus
//! according to the current expansion rate, and nudge that rate after each
//! reaction. All randomness comes through the injected [`Sampler`].

use std::collections::HashSet;

use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{GroupRole, Idea, Reaction};
use crate::domain::ports::{PoolMember, Sampler};

/// Fixed adjustment applied to the expansion rate after each reaction.
pub const RATE_STEP: f64 = 0.05;

/// The two candidate pools for the next draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pools {
    pub fixation: Vec<Idea>,
    pub expansion: Vec<Idea>,
}

impl Pools {
    /// The stopping condition: drawing requires both pools non-empty.
    pub fn either_empty(&self) -> bool {
        self.fixation.is_empty() || self.expansion.is_empty()
    }
}

/// Flatten role-tagged pool members into the two pools.
///
/// An idea reached through two groups of the same role appears once per
/// membership; no de-duplication happens here.
pub fn partition_pools(members: Vec<PoolMember>) -> Pools {
    let mut pools = Pools::default();
    for member in members {
        match member.role {
            GroupRole::Fixation => pools.fixation.push(member.idea),
            GroupRole::Expansion => pools.expansion.push(member.idea),
        }
    }
    pools
}

/// Remove every already-shown idea from both pools.
///
/// Both pools are checked for each seen idea so a presented stimulus can
/// never become eligible again through the other pool.
pub fn exclude_seen(pools: &mut Pools, seen: &[Uuid]) {
    let seen: HashSet<Uuid> = seen.iter().copied().collect();
    pools.fixation.retain(|idea| !seen.contains(&idea.id));
    pools.expansion.retain(|idea| !seen.contains(&idea.id));
}

/// Draw the next stimulus.
///
/// One uniform sample in [0, 1) decides the pool: sample <= rate expands,
/// anything else fixates. The stimulus is then picked uniformly from the
/// chosen pool. Callers must have checked the stopping condition first;
/// an empty chosen pool is an invariant violation, not a recoverable state.
pub fn draw_next(
    pools: &Pools,
    rate: f64,
    sampler: &mut dyn Sampler,
) -> DomainResult<(Idea, bool)> {
    let expand = sampler.sample_unit() <= rate;
    let (pool, role) = if expand {
        (&pools.expansion, GroupRole::Expansion)
    } else {
        (&pools.fixation, GroupRole::Fixation)
    };

    if pool.is_empty() {
        return Err(DomainError::EmptyPool(role));
    }

    let idea = pool[sampler.pick_index(pool.len())].clone();
    Ok((idea, expand))
}

/// Adjust the expansion rate after a reaction.
///
/// After an expansion draw, `continue` raises the rate and `expand` lowers
/// it; after a fixation draw the two are mirrored. Every other reaction
/// leaves the rate unchanged. The result is always clamped to [0, 1].
pub fn adjust_rate(current: f64, did_expand: bool, reaction: Reaction) -> f64 {
    let raises = if did_expand { Reaction::Continue } else { Reaction::Expand };
    let lowers = if did_expand { Reaction::Expand } else { Reaction::Continue };

    let adjusted = if reaction == raises {
        current + RATE_STEP
    } else if reaction == lowers {
        current - RATE_STEP
    } else {
        current
    };

    adjusted.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::RngSampler;
    use proptest::prelude::*;

    fn member(role: GroupRole, value: &str) -> PoolMember {
        PoolMember { role, idea: Idea::new(value) }
    }

    #[test]
    fn test_partition_groups_by_role() {
        let pools = partition_pools(vec![
            member(GroupRole::Fixation, "a"),
            member(GroupRole::Expansion, "b"),
            member(GroupRole::Fixation, "c"),
        ]);
        assert_eq!(pools.fixation.len(), 2);
        assert_eq!(pools.expansion.len(), 1);
    }

    #[test]
    fn test_partition_keeps_duplicate_memberships() {
        let idea = Idea::new("shared");
        let pools = partition_pools(vec![
            PoolMember { role: GroupRole::Fixation, idea: idea.clone() },
            PoolMember { role: GroupRole::Fixation, idea },
        ]);
        assert_eq!(pools.fixation.len(), 2);
    }

    #[test]
    fn test_exclude_seen_checks_both_pools() {
        let shared = Idea::new("both");
        let mut pools = Pools {
            fixation: vec![shared.clone(), Idea::new("f")],
            expansion: vec![shared.clone(), Idea::new("e")],
        };

        exclude_seen(&mut pools, &[shared.id]);

        assert_eq!(pools.fixation.len(), 1);
        assert_eq!(pools.expansion.len(), 1);
        assert!(pools.fixation.iter().all(|i| i.id != shared.id));
        assert!(pools.expansion.iter().all(|i| i.id != shared.id));
    }

    #[test]
    fn test_draw_rate_one_always_expands() {
        let pools = Pools {
            fixation: vec![Idea::new("f")],
            expansion: vec![Idea::new("e1"), Idea::new("e2")],
        };
        let mut sampler = RngSampler::seeded(1);

        for _ in 0..50 {
            let (idea, did_expand) = draw_next(&pools, 1.0, &mut sampler).unwrap();
            assert!(did_expand);
            assert!(pools.expansion.iter().any(|e| e.id == idea.id));
        }
    }

    #[test]
    fn test_draw_rate_zero_almost_never_expands() {
        // sample <= 0.0 has probability zero for a [0,1) uniform draw
        let pools = Pools {
            fixation: vec![Idea::new("f1"), Idea::new("f2")],
            expansion: vec![Idea::new("e")],
        };
        let mut sampler = RngSampler::seeded(2);

        for _ in 0..50 {
            let (_, did_expand) = draw_next(&pools, 0.0, &mut sampler).unwrap();
            assert!(!did_expand);
        }
    }

    #[test]
    fn test_draw_from_empty_pool_is_an_error() {
        let pools = Pools { fixation: vec![], expansion: vec![Idea::new("e")] };
        let mut sampler = RngSampler::seeded(3);

        let err = draw_next(&pools, 0.0, &mut sampler).unwrap_err();
        assert!(matches!(err, DomainError::EmptyPool(GroupRole::Fixation)));
    }

    #[test]
    fn test_adjust_after_expansion_draw() {
        let up = adjust_rate(0.5, true, Reaction::Continue);
        assert!((up - 0.55).abs() < 1e-9);

        let down = adjust_rate(0.5, true, Reaction::Expand);
        assert!((down - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_adjust_after_fixation_draw_is_mirrored() {
        let up = adjust_rate(0.5, false, Reaction::Expand);
        assert!((up - 0.55).abs() < 1e-9);

        let down = adjust_rate(0.5, false, Reaction::Continue);
        assert!((down - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_neutral_and_sentinel_leave_rate_unchanged() {
        assert!((adjust_rate(0.3, true, Reaction::Neutral) - 0.3).abs() < f64::EPSILON);
        assert!((adjust_rate(0.3, false, Reaction::Undefined) - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_adjust_clamps_at_bounds() {
        assert!((adjust_rate(1.0, true, Reaction::Continue) - 1.0).abs() < f64::EPSILON);
        assert!((adjust_rate(0.0, true, Reaction::Expand)).abs() < f64::EPSILON);
        assert!((adjust_rate(0.98, true, Reaction::Continue) - 1.0).abs() < f64::EPSILON);
        assert!((adjust_rate(0.02, false, Reaction::Continue)).abs() < f64::EPSILON);
    }

    proptest! {
        // Clamping law: whatever goes in, the adjusted rate stays in [0, 1].
        #[test]
        fn prop_adjusted_rate_always_in_unit_interval(
            current in -1.0f64..2.0,
            did_expand in proptest::bool::ANY,
            reaction in prop_oneof![
                Just(Reaction::Undefined),
                Just(Reaction::Continue),
                Just(Reaction::Expand),
                Just(Reaction::Neutral),
            ],
        ) {
            let adjusted = adjust_rate(current, did_expand, reaction);
            prop_assert!((0.0..=1.0).contains(&adjusted));
        }
    }
}
