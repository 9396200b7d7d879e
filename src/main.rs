// src/main.rs - Run the prank firmware against simulated hardware
use clap::Parser;
use hidprank::config::{self, Config};
use hidprank::storage::program_defaults;
use hidprank::{BootMode, Board, Firmware, Profile};
use hidprank_simulator::{FileEeprom, RecordingKeyboard, ScaledDelay, SimLed, ThreadTimer};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "hidprank-sim",
    version,
    about = "Run the prank keyboard firmware on a simulated board"
)]
struct Args {
    /// Harness configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// EEPROM image file; each run of the simulator is one power cycle
    #[arg(long)]
    eeprom: Option<PathBuf>,
    /// Stop after this many loop iterations
    #[arg(short = 'n', long)]
    iterations: Option<u64>,
    /// Simulated seconds per real second
    #[arg(long)]
    speed: Option<f64>,
    /// Write every key press as JSON lines to this file
    #[arg(long)]
    transcript: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let profile = Profile::from_build();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(profile.log_level())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let path = path.to_string_lossy();
            tracing::info!("Loading configuration from: {}", path);
            config::load_config(&path)?
        }
        None => Config::default(),
    };
    if let Some(eeprom) = &args.eeprom {
        config.simulator.eeprom = eeprom.to_string_lossy().into_owned();
    }
    if let Some(iterations) = args.iterations {
        config.simulator.iterations = Some(iterations);
    }
    if let Some(speed) = args.speed {
        config.simulator.speed = speed;
    }
    if let Some(transcript) = &args.transcript {
        config.simulator.transcript = Some(transcript.to_string_lossy().into_owned());
    }
    config.simulator.validate()?;
    profile.validate()?;
    let policy = config.policy.resolve()?;
    let sim = &config.simulator;

    tracing::info!("Profile: {:?}, policy: {}", profile.kind, policy.name);

    let mut eeprom = FileEeprom::open(&sim.eeprom)?;
    if eeprom.is_blank() {
        tracing::info!("Programming factory EEPROM image into {}", sim.eeprom);
        program_defaults(&mut eeprom);
    }

    let mut keyboard = RecordingKeyboard::new().with_enumeration_delay(sim.enumeration_polls);
    if let Some(path) = &sim.transcript {
        keyboard = keyboard.with_transcript(Box::new(File::create(path)?));
    }

    let board = Board {
        keyboard,
        led: Arc::new(SimLed::new()),
        eeprom,
        timer: ThreadTimer::new(sim.speed),
        delay: ScaledDelay::new(sim.speed),
    };
    let mut firmware = Firmware::boot(board, profile, policy, BootMode::from_build());

    let Some(iterations) = sim.iterations else {
        firmware.run();
    };

    for _ in 0..iterations {
        let decision = firmware.step();
        println!(
            "[{}] tier={:?} action={:?} delay={}",
            firmware.uptime(),
            decision.tier,
            decision.action,
            decision.delay
        );
    }
    println!(
        "Boot 0x{:04X}: {} iterations, {} key presses, uptime {}s",
        firmware.boot_count(),
        firmware.iterations(),
        firmware.keyboard().events().len(),
        firmware.uptime().as_secs(profile.tick_hz)
    );
    Ok(())
}
