use clap::Parser;
use plasma_common::{log_state_facts, StateSnapshot};
use plasma_lightning::config::{ReplicatorConfig, SimConfig};
use plasma_lightning::replicator::{Maker, UdpMaker};
use plasma_lightning::simulator::{Simulator, Strike, StrikeObserver};
use std::io::BufRead;
use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(
    name = "plasma-sim",
    about = "Headless lightning simulator broadcasting its state every tick"
)]
struct Args {
    #[arg(long, default_value = "0.0.0.0:0")]
    bind: SocketAddr,
    #[arg(long, default_value = "255.255.255.255:63059")]
    target: SocketAddr,
    #[arg(long, default_value_t = plasma_lightning::config::DEFAULT_PACKET_SIZE)]
    packet_size: usize,
    #[arg(long, default_value_t = 60.0)]
    tick_hz: f64,
    /// Initial upper bound of the random gap between strikes, in seconds.
    #[arg(long, default_value_t = 2.5)]
    pace: f64,
    #[arg(long)]
    seed: Option<u64>,
    /// Stop after this many seconds instead of running forever.
    #[arg(long)]
    duration_secs: Option<f64>,
}

enum Command {
    Faster,
    Slower,
    ShowPace,
}

/// Stands in for the sample players: logs which voice each strike uses.
struct VoiceLog;

impl StrikeObserver for VoiceLog {
    fn on_strike(&mut self, strike: &Strike) {
        log::debug!("voice {} plays {:?} strike", strike.voice, strike.origin);
    }
}

/// `=` speeds strikes up, `-` slows them down, `p` prints the pace.
fn spawn_command_reader() -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let command = match line.trim() {
                "=" | "+" => Command::Faster,
                "-" => Command::Slower,
                "p" => Command::ShowPace,
                "" => continue,
                other => {
                    log::warn!("unknown command {other:?}, use =, - or p");
                    continue;
                }
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });
    rx
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    plasma_lightning::init_logging();
    let args = Args::parse();

    log_state_facts(StateSnapshot::SIZE);

    let config = SimConfig {
        tick_hz: args.tick_hz,
        pace_upper_bound: args.pace,
        seed: args.seed,
        ..SimConfig::with_defaults()
    };
    let replicator = ReplicatorConfig {
        bind: args.bind,
        target: args.target,
        packet_size: args.packet_size,
        broadcast: args.target.ip().is_ipv4(),
        ..ReplicatorConfig::with_defaults()
    };

    let mut maker = UdpMaker::<StateSnapshot>::bind(&replicator)?;
    let mut simulator = Simulator::new(config);
    simulator.add_observer(Box::new(VoiceLog));
    let commands = spawn_command_reader();

    let interval = Duration::from_secs_f64(simulator.config().tick_dt());
    let start = Instant::now();
    let mut last = start;
    let mut next = start + interval;
    log::info!(
        "plasma-sim running at {:.1} Hz, pace upper bound {:.1}s",
        simulator.config().tick_hz,
        simulator.timer().upper_bound()
    );

    loop {
        while let Ok(command) = commands.try_recv() {
            match command {
                Command::Faster => {
                    simulator.faster();
                }
                Command::Slower => {
                    simulator.slower();
                }
                Command::ShowPace => log::info!(
                    "next strike within {:.2}s, upper bound {:.1}s",
                    simulator.timer().pace(),
                    simulator.timer().upper_bound()
                ),
            }
        }

        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;

        let report = simulator.tick(dt);
        if report.retired > 0 {
            log::debug!("frame {}: retired {} bolts", report.frame, report.retired);
        }
        if let Err(error) = maker.publish(simulator.snapshot()) {
            log::warn!("frame {} not replicated: {error}", report.frame);
        }

        if let Some(limit) = args.duration_secs {
            if start.elapsed().as_secs_f64() >= limit {
                log::info!("stopping after {} frames", simulator.frame());
                return Ok(());
            }
        }

        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
            next += interval;
        } else {
            next = now + interval;
        }
    }
}
