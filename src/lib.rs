// hidprank: escalation engine for a USB keyboard that pranks its host
pub mod actions;
pub mod clock;
pub mod config;
pub mod firmware;
pub mod policy;
pub mod profile;
pub mod rng;
pub mod storage;

pub use clock::{ClockState, Uptime, UptimeClock};
pub use firmware::{Board, Firmware, LoopState};
pub use policy::{Action, Decision, Delay, EscalationPolicy, PolicyConfig, Tier};
pub use profile::{BootMode, Profile, ProfileKind};
pub use storage::{PersistentState, StoredState};
