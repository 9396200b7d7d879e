// Escalation policy: tier ordering, delay formulas and distributions

use hidprank::rng::seeded;
use hidprank::{Action, Delay, EscalationPolicy, PolicyConfig, Profile, Tier, Uptime};

fn classic() -> EscalationPolicy {
    EscalationPolicy::new(PolicyConfig::classic(), &Profile::diagnostic())
}

fn secs(s: u32) -> Uptime {
    Uptime::from_secs(s, 1000)
}

#[test]
fn test_chaotic_wins_over_warning() {
    let policy = classic();
    // 11 boots satisfies both the warning and the chaotic predicate
    assert_eq!(policy.tier(11, Uptime::ZERO), Tier::Chaotic);
    // Crazy uptime satisfies chaotic and escalated
    assert_eq!(policy.tier(0, secs(61)), Tier::Chaotic);
    // Trigger uptime plus warning boots resolves to escalated
    assert_eq!(policy.tier(7, secs(11)), Tier::Escalated);
}

#[test]
fn test_tiers_partition_the_input_space() {
    let policy = classic();
    let uptimes = [0, 5, 9, 10, 30, 59, 60, 3600];
    for boot_count in 0..=30u16 {
        for &u in &uptimes {
            let uptime = secs(u);
            let expected = if boot_count > 10 || u >= 60 {
                Tier::Chaotic
            } else if u >= 10 {
                Tier::Escalated
            } else if boot_count >= 5 {
                Tier::Warning
            } else {
                Tier::Dormant
            };
            assert_eq!(policy.tier(boot_count, uptime), expected, "boots={} uptime={}s", boot_count, u);
        }
    }
}

#[test]
fn test_warning_delay_bound_for_seven_boots() {
    let policy = classic();
    let mut rng = seeded(0xCAFE);
    for _ in 0..100 {
        let decision = policy.decide(7, Uptime::ZERO, &mut rng);
        assert_eq!(decision.tier, Tier::Warning);
        assert_eq!(decision.action, Action::BenignKey);
        assert_eq!(decision.delay_bound, Delay(60 + 60 * (10 - 7)));
        assert_eq!(decision.delay_bound, Delay(240));
        assert!(decision.delay >= Delay(60) && decision.delay < Delay(240));
    }
}

#[test]
fn test_more_boots_shorten_warning_waits() {
    let policy = classic();
    let bounds: Vec<u32> = (5..=10).map(|b| policy.warning_span_secs(b)).collect();
    assert_eq!(bounds, vec![300, 240, 180, 120, 60, 0]);
}

#[test]
fn test_decide_is_deterministic_for_same_rng_state() {
    let policy = classic();
    let mut rng = seeded(0x1337);
    for (boots, uptime) in [(3, secs(0)), (7, secs(3)), (0, secs(42)), (25, secs(5))] {
        let mut replay = rng.clone();
        let first = policy.decide(boots, uptime, &mut rng);
        let second = policy.decide(boots, uptime, &mut replay);
        assert_eq!(first, second);
    }
}

#[test]
fn test_escalated_ramp_strictly_shrinks() {
    for profile in [Profile::diagnostic(), Profile::production()] {
        let policy = EscalationPolicy::new(PolicyConfig::classic(), &profile);
        let trigger = profile.uptime_trigger_secs;
        let window = profile.uptime_crazy_secs - trigger;
        let spans: Vec<u32> = (0..10)
            .map(|i| policy.escalated_span_secs(Uptime::from_secs(trigger + window * i / 10, profile.tick_hz)))
            .collect();
        assert_eq!(spans[0], 300);
        for pair in spans.windows(2) {
            assert!(pair[1] < pair[0], "{:?}", spans);
        }
    }
}

#[test]
fn test_escalated_decisions_respect_ramp() {
    let policy = classic();
    let mut rng = seeded(11);
    let early = policy.decide(0, secs(10), &mut rng);
    let late = policy.decide(0, secs(55), &mut rng);
    assert_eq!(early.tier, Tier::Escalated);
    assert_eq!(late.tier, Tier::Escalated);
    assert_eq!(early.delay_bound, Delay(360));
    assert_eq!(late.delay_bound, Delay(90));
    assert!(late.delay_bound < early.delay_bound);
}

#[test]
fn test_crazy_uptime_predicate_is_monotonic() {
    let policy = classic();
    let mut crossed = false;
    for ms in (0..120_000u32).step_by(250) {
        let crazy = policy.uptime_is_crazy(Uptime(ms));
        if crossed {
            assert!(crazy, "predicate fell back at {}ms", ms);
        }
        crossed |= crazy;
    }
    assert!(crossed);
}

#[test]
fn test_chaotic_actions_follow_weights() {
    let policy = classic();
    let mut rng = seeded(0xABCD);
    let mut counts = [0u32; 3];
    let trials = 20_000;
    for _ in 0..trials {
        match policy.decide(25, Uptime::ZERO, &mut rng).action {
            Action::BenignKey => counts[0] += 1,
            Action::Rickroll => counts[1] += 1,
            Action::Taunt => counts[2] += 1,
            Action::NoOp => panic!("no idle action in the chaotic tier"),
        }
    }
    // 6 : 3 : 1
    assert!((11_400..12_600).contains(&counts[0]), "{:?}", counts);
    assert!((5_500..6_500).contains(&counts[1]), "{:?}", counts);
    assert!((1_700..2_300).contains(&counts[2]), "{:?}", counts);
}

#[test]
fn test_patient_variant_thresholds() {
    let policy = EscalationPolicy::new(PolicyConfig::patient(), &Profile::production());
    assert_eq!(policy.tier(9, Uptime::ZERO), Tier::Dormant);
    assert_eq!(policy.tier(10, Uptime::ZERO), Tier::Warning);
    assert_eq!(policy.tier(20, Uptime::ZERO), Tier::Warning);
    assert_eq!(policy.tier(25, Uptime::ZERO), Tier::Chaotic);
    assert_eq!(policy.warning_span_secs(12), 480);
}
