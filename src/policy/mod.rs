// src/policy/mod.rs - Tiered escalation policy
pub mod config;

pub use config::{ChaoticEntry, KeyChord, PolicyConfig, RickrollConfig, TauntConfig};

use crate::clock::Uptime;
use crate::profile::Profile;
use crate::rng::{pick_weighted, random_below};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Escalation level, from least to most aggressive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Dormant,
    Warning,
    Escalated,
    Chaotic,
}

/// One host-facing behavior per loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    BenignKey,
    Rickroll,
    Taunt,
    NoOp,
}

/// Wait before the next decision, in whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Delay(pub u32);

impl Delay {
    pub const ZERO: Delay = Delay(0);

    pub fn secs(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Outcome of one policy query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub tier: Tier,
    pub action: Action,
    pub delay: Delay,
    /// Exclusive upper bound the delay was drawn below. Equal to `delay`
    /// when nothing was drawn.
    pub delay_bound: Delay,
}

type Guard = fn(&EscalationPolicy, u16, Uptime) -> bool;

// Evaluated top to bottom; the first guard that holds selects the tier.
const TIER_TABLE: [(Tier, Guard); 4] = [
    (Tier::Chaotic, EscalationPolicy::chaotic_guard),
    (Tier::Escalated, EscalationPolicy::escalated_guard),
    (Tier::Warning, EscalationPolicy::warning_guard),
    (Tier::Dormant, EscalationPolicy::dormant_guard),
];

/// Maps (boot count, uptime) to an action and the delay that follows it.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    config: PolicyConfig,
    trigger: Uptime,
    crazy: Uptime,
}

impl EscalationPolicy {
    /// Bind a variant to the uptime thresholds of a build profile.
    pub fn new(config: PolicyConfig, profile: &Profile) -> Self {
        Self::with_thresholds(
            config,
            Uptime::from_secs(profile.uptime_trigger_secs, profile.tick_hz),
            Uptime::from_secs(profile.uptime_crazy_secs, profile.tick_hz),
        )
    }

    /// Thresholds out of order collapse the escalated ramp to zero; see
    /// [`Profile::validate`] for the check applied to build profiles.
    pub fn with_thresholds(config: PolicyConfig, trigger: Uptime, crazy: Uptime) -> Self {
        Self { config, trigger, crazy }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn trigger(&self) -> Uptime {
        self.trigger
    }

    pub fn crazy(&self) -> Uptime {
        self.crazy
    }

    fn chaotic_guard(&self, boot_count: u16, uptime: Uptime) -> bool {
        boot_count > self.config.chaotic_above_boots || self.uptime_is_crazy(uptime)
    }

    fn escalated_guard(&self, _boot_count: u16, uptime: Uptime) -> bool {
        uptime >= self.trigger
    }

    fn warning_guard(&self, boot_count: u16, _uptime: Uptime) -> bool {
        boot_count >= self.config.warning_min_boots
    }

    fn dormant_guard(&self, _boot_count: u16, _uptime: Uptime) -> bool {
        true
    }

    /// Uptime half of the chaotic predicate. Monotonic in `uptime`.
    pub fn uptime_is_crazy(&self, uptime: Uptime) -> bool {
        self.config.chaotic_on_uptime && uptime >= self.crazy
    }

    pub fn tier(&self, boot_count: u16, uptime: Uptime) -> Tier {
        TIER_TABLE
            .iter()
            .find(|(_, guard)| guard(self, boot_count, uptime))
            .map(|&(tier, _)| tier)
            .unwrap_or(Tier::Dormant)
    }

    /// Random span of the escalated delay: the full ramp at the trigger,
    /// shrinking linearly to zero at the crazy threshold.
    pub fn escalated_span_secs(&self, uptime: Uptime) -> u32 {
        let window = self.crazy.ticks().saturating_sub(self.trigger.ticks()) as u64;
        if window == 0 {
            return 0;
        }
        let left = (self.crazy.ticks().saturating_sub(uptime.ticks()) as u64).min(window);
        (self.config.escalated_ramp_secs as u64 * left / window) as u32
    }

    /// Random span of the warning delay: one step per boot left below the cap.
    pub fn warning_span_secs(&self, boot_count: u16) -> u32 {
        let left = self.config.warning_cap_boots.saturating_sub(boot_count) as u32;
        self.config.warning_step_secs.saturating_mul(left)
    }

    /// Pick the tier, the action and the delay before the next decision.
    ///
    /// Pure apart from advancing `rng`: the same inputs and generator state
    /// always give the same decision.
    pub fn decide<R: Rng>(&self, boot_count: u16, uptime: Uptime, rng: &mut R) -> Decision {
        let tier = self.tier(boot_count, uptime);
        let decision = match tier {
            Tier::Chaotic => self.decide_chaotic(rng),
            Tier::Escalated => {
                let span = self.escalated_span_secs(uptime);
                tracing::debug!("Sanity delay is 0x{:04X}", span);
                self.floored(tier, Action::BenignKey, span, rng)
            }
            Tier::Warning => {
                let span = self.warning_span_secs(boot_count);
                self.floored(tier, Action::BenignKey, span, rng)
            }
            Tier::Dormant => Decision {
                tier,
                action: Action::NoOp,
                delay: Delay::ZERO,
                delay_bound: Delay::ZERO,
            },
        };
        tracing::debug!(
            "Decision: tier={:?} action={:?} delay={} (< {})",
            decision.tier,
            decision.action,
            decision.delay,
            decision.delay_bound
        );
        decision
    }

    fn floored<R: Rng>(&self, tier: Tier, action: Action, span: u32, rng: &mut R) -> Decision {
        let floor = self.config.delay_floor_secs;
        Decision {
            tier,
            action,
            delay: Delay(floor.saturating_add(random_below(rng, span))),
            delay_bound: Delay(floor.saturating_add(span)),
        }
    }

    fn decide_chaotic<R: Rng>(&self, rng: &mut R) -> Decision {
        let weights: Vec<u32> = self.config.chaotic.iter().map(|e| e.weight).collect();
        match pick_weighted(rng, &weights).map(|idx| &self.config.chaotic[idx]) {
            Some(entry) => Decision {
                tier: Tier::Chaotic,
                action: entry.action,
                delay: Delay(
                    entry
                        .delay_floor_secs
                        .saturating_add(random_below(rng, entry.delay_span_secs)),
                ),
                delay_bound: Delay(entry.delay_floor_secs.saturating_add(entry.delay_span_secs)),
            },
            None => {
                tracing::warn!("Chaotic table of '{}' has no weight", self.config.name);
                Decision {
                    tier: Tier::Chaotic,
                    action: Action::NoOp,
                    delay: Delay::ZERO,
                    delay_bound: Delay::ZERO,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    fn classic() -> EscalationPolicy {
        EscalationPolicy::new(PolicyConfig::classic(), &Profile::diagnostic())
    }

    fn secs(s: u32) -> Uptime {
        Uptime::from_secs(s, 1000)
    }

    #[test]
    fn test_tier_table_order() {
        let policy = classic();
        assert_eq!(policy.tier(0, Uptime::ZERO), Tier::Dormant);
        assert_eq!(policy.tier(4, secs(9)), Tier::Dormant);
        assert_eq!(policy.tier(5, Uptime::ZERO), Tier::Warning);
        assert_eq!(policy.tier(10, Uptime::ZERO), Tier::Warning);
        assert_eq!(policy.tier(0, secs(10)), Tier::Escalated);
        assert_eq!(policy.tier(7, secs(30)), Tier::Escalated);
        assert_eq!(policy.tier(11, Uptime::ZERO), Tier::Chaotic);
        assert_eq!(policy.tier(0, secs(60)), Tier::Chaotic);
    }

    #[test]
    fn test_patient_ignores_crazy_uptime() {
        let policy = EscalationPolicy::new(PolicyConfig::patient(), &Profile::diagnostic());
        assert_eq!(policy.tier(0, secs(3600)), Tier::Escalated);
        assert_eq!(policy.tier(20, Uptime::ZERO), Tier::Warning);
        assert_eq!(policy.tier(21, Uptime::ZERO), Tier::Chaotic);
        assert_eq!(policy.escalated_span_secs(secs(3600)), 0);
    }

    #[test]
    fn test_dormant_is_noop_without_delay() {
        let policy = classic();
        let mut rng = seeded(1);
        let decision = policy.decide(3, Uptime::ZERO, &mut rng);
        assert_eq!(decision.tier, Tier::Dormant);
        assert_eq!(decision.action, Action::NoOp);
        assert_eq!(decision.delay, Delay::ZERO);
    }

    #[test]
    fn test_warning_at_cap_uses_floor_only() {
        let policy = classic();
        let mut rng = seeded(2);
        let decision = policy.decide(10, Uptime::ZERO, &mut rng);
        assert_eq!(decision.action, Action::BenignKey);
        assert_eq!(decision.delay, Delay(60));
        assert_eq!(decision.delay_bound, Delay(60));
    }

    #[test]
    fn test_escalated_span_endpoints() {
        let policy = classic();
        assert_eq!(policy.escalated_span_secs(secs(10)), 300);
        assert_eq!(policy.escalated_span_secs(secs(35)), 150);
        assert_eq!(policy.escalated_span_secs(secs(60)), 0);
        assert_eq!(policy.escalated_span_secs(Uptime::ZERO), 300);
    }

    #[test]
    fn test_chaotic_delays_depend_on_action() {
        let policy = classic();
        let mut rng = seeded(3);
        for _ in 0..500 {
            let d = policy.decide(25, Uptime::ZERO, &mut rng);
            assert_eq!(d.tier, Tier::Chaotic);
            match d.action {
                Action::Rickroll => {
                    assert_eq!(d.delay_bound, Delay(240));
                    assert!(d.delay >= Delay(60) && d.delay < Delay(240));
                }
                Action::BenignKey | Action::Taunt => {
                    assert_eq!(d.delay_bound, Delay(120));
                    assert!(d.delay < Delay(120));
                }
                Action::NoOp => panic!("chaotic tier never idles"),
            }
        }
    }

    #[test]
    fn test_huge_delays_saturate() {
        let mut config = PolicyConfig::classic();
        config.delay_floor_secs = u32::MAX;
        config.chaotic.iter_mut().for_each(|e| e.delay_floor_secs = u32::MAX);
        let policy = EscalationPolicy::new(config, &Profile::diagnostic());
        let mut rng = seeded(5);

        let warning = policy.decide(7, Uptime::ZERO, &mut rng);
        assert_eq!(warning.tier, Tier::Warning);
        assert_eq!(warning.delay, Delay(u32::MAX));
        assert_eq!(warning.delay_bound, Delay(u32::MAX));

        let chaotic = policy.decide(25, Uptime::ZERO, &mut rng);
        assert_eq!(chaotic.delay, Delay(u32::MAX));
    }

    #[test]
    fn test_inverted_thresholds_do_not_underflow() {
        let policy =
            EscalationPolicy::with_thresholds(PolicyConfig::patient(), secs(60), secs(10));
        assert_eq!(policy.escalated_span_secs(secs(30)), 0);
        let d = policy.decide(0, secs(90), &mut seeded(6));
        assert_eq!(d.tier, Tier::Escalated);
        assert_eq!(d.delay, Delay(60));
    }

    #[test]
    fn test_empty_chaotic_table_falls_back_to_noop() {
        let mut config = PolicyConfig::classic();
        config.chaotic.iter_mut().for_each(|e| e.weight = 0);
        let policy = EscalationPolicy::new(config, &Profile::diagnostic());
        let d = policy.decide(25, Uptime::ZERO, &mut seeded(4));
        assert_eq!((d.tier, d.action), (Tier::Chaotic, Action::NoOp));
    }
}
