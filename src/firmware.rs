// src/firmware.rs - Boot sequence and main loop
use crate::actions;
use crate::clock::{Uptime, UptimeClock};
use crate::policy::{Action, Decision, EscalationPolicy, PolicyConfig};
use crate::profile::{BootMode, Profile};
use crate::storage::PersistentState;
use hidprank_shared::{DelayMs, Eeprom, HardwareTimer, Keyboard, StatusLed};
use rand::rngs::StdRng;
use std::sync::Arc;

/// The peripherals the firmware runs on.
pub struct Board<K, L, E, T, D> {
    pub keyboard: K,
    pub led: Arc<L>,
    pub eeprom: E,
    pub timer: T,
    pub delay: D,
}

/// Main loop state. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for enumeration and for the host OS to settle.
    BringUp,
    /// Deciding and acting until power is lost.
    Running,
}

/// The prank firmware: persistent state, uptime clock, policy and the
/// peripherals it acts through.
pub struct Firmware<K, L, E, T, D>
where
    K: Keyboard,
    L: StatusLed + 'static,
    E: Eeprom,
    T: HardwareTimer,
    D: DelayMs,
{
    keyboard: K,
    led: Arc<L>,
    storage: PersistentState<E>,
    clock: UptimeClock<T>,
    delay: D,
    policy: EscalationPolicy,
    profile: Profile,
    rng: StdRng,
    boot_count: u16,
    seed: u16,
    state: LoopState,
    iterations: u64,
}

impl<K, L, E, T, D> Firmware<K, L, E, T, D>
where
    K: Keyboard,
    L: StatusLed + 'static,
    E: Eeprom,
    T: HardwareTimer,
    D: DelayMs,
{
    /// Power-on: account for the boot, rotate the seed, start the LED and
    /// the uptime clock. The keyboard is left for [`Firmware::bring_up`].
    pub fn boot(
        board: Board<K, L, E, T, D>,
        profile: Profile,
        policy: PolicyConfig,
        mode: BootMode,
    ) -> Self {
        let mut storage = PersistentState::new(board.eeprom);
        let boot_count = storage.register_boot(mode);
        let (seed, rng) = storage.seed_rng();

        board.led.init();
        let clock = UptimeClock::start(board.timer, profile.tick_hz, board.led.clone());
        let policy = EscalationPolicy::new(policy, &profile);

        Self {
            keyboard: board.keyboard,
            led: board.led,
            storage,
            clock,
            delay: board.delay,
            policy,
            profile,
            rng,
            boot_count,
            seed,
            state: LoopState::BringUp,
            iterations: 0,
        }
    }

    /// Bring up USB, block until the host has configured the device, then
    /// give the host OS time to finish booting.
    pub fn bring_up(&mut self) {
        if self.state == LoopState::Running {
            return;
        }
        self.keyboard.init();
        while !self.keyboard.is_configured() {
            std::hint::spin_loop();
        }

        tracing::info!("Bootcount is 0x{:04X}", self.boot_count);
        tracing::info!("Seed is 0x{:04X}", self.seed);
        tracing::debug!(
            "Policy '{}' with {:?} profile",
            self.policy.config().name,
            self.profile.kind
        );

        tracing::debug!("Initial delay..");
        long_delay(&mut self.delay, self.profile.initial_delay_secs);
        tracing::debug!("Initiating mainloop..");
        self.state = LoopState::Running;
    }

    /// One loop iteration: snapshot uptime, decide, act, wait.
    pub fn step(&mut self) -> Decision {
        self.bring_up();

        let uptime = self.clock.now();
        let (hi, lo) = uptime.halves();
        tracing::debug!("Uptime is 0x{:04X}{:04X}", hi, lo);

        let decision = self.policy.decide(self.boot_count, uptime, &mut self.rng);
        self.perform(decision.action);
        long_delay(&mut self.delay, decision.delay.secs());
        long_delay(&mut self.delay, self.profile.min_delay_secs);

        self.iterations += 1;
        decision
    }

    /// Run until power is lost.
    pub fn run(mut self) -> ! {
        loop {
            self.step();
        }
    }

    fn perform(&mut self, action: Action) {
        let config = self.policy.config();
        match action {
            Action::BenignKey => actions::benign_key(&mut self.keyboard, &config.benign_keys, &mut self.rng),
            Action::Rickroll => actions::rickroll(&mut self.keyboard, &mut self.delay, &config.rickroll),
            Action::Taunt => actions::taunt(&mut self.keyboard, &config.taunt),
            Action::NoOp => actions::no_op_blink(
                self.led.as_ref(),
                &mut self.delay,
                config.blink_toggles,
                config.blink_interval_ms,
            ),
        }
    }

    pub fn boot_count(&self) -> u16 {
        self.boot_count
    }

    /// Seed read from storage at this boot.
    pub fn seed(&self) -> u16 {
        self.seed
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn uptime(&self) -> Uptime {
        self.clock.now()
    }

    pub fn clock(&self) -> &UptimeClock<T> {
        &self.clock
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    pub fn keyboard(&self) -> &K {
        &self.keyboard
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    pub fn storage(&self) -> &PersistentState<E> {
        &self.storage
    }

    /// Power off, handing back the EEPROM so a later boot can reuse it.
    pub fn power_off(self) -> E {
        self.storage.into_inner()
    }
}

/// Busy-wait whole seconds.
fn long_delay<D: DelayMs + ?Sized>(delay: &mut D, secs: u32) {
    if secs == 0 {
        return;
    }
    tracing::debug!("Longdelay(0x{:04X})", secs);
    for _ in 0..secs {
        delay.delay_ms(1000);
    }
}
