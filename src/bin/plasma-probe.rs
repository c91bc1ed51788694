use clap::Parser;
use plasma_common::{log_state_facts, StateSnapshot};
use plasma_lightning::config::ReplicatorConfig;
use plasma_lightning::decode::{DecodedFrame, DrawItem, FrameSink, SnapshotDecoder};
use plasma_lightning::replicator::{Taker, UdpTaker};
use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(
    name = "plasma-probe",
    about = "Receives replicated lightning state and reports what a renderer would draw"
)]
struct Args {
    #[arg(long, default_value = "0.0.0.0:63059")]
    listen: SocketAddr,
    #[arg(long, default_value_t = 60.0)]
    frame_hz: f64,
    /// Seconds between summary lines.
    #[arg(long, default_value_t = 2.0)]
    report_secs: f64,
    #[arg(long)]
    duration_secs: Option<f64>,
}

/// Counts what would have been drawn.
#[derive(Default)]
struct ProbeSink {
    frames: u64,
    repeated: u64,
    missed: u64,
    bolts: u64,
    vertices: u64,
    hidden: u64,
    last_frame: Option<u32>,
}

impl FrameSink for ProbeSink {
    fn draw(&mut self, frame: &DecodedFrame) {
        self.frames += 1;
        self.last_frame = Some(frame.frame);
        if frame.repeated {
            self.repeated += 1;
        }
        self.missed += frame.missed_frames as u64;
        self.bolts += frame.bolts().len() as u64;
        self.vertices += frame.bolts().iter().map(|b| b.mesh.len() as u64).sum::<u64>();

        let plan = frame.draw_plan(frame.eye);
        let nucleus_at = plan.iter().position(|item| *item == DrawItem::Nucleus);
        self.hidden += nucleus_at.unwrap_or(0) as u64;
    }
}

impl ProbeSink {
    fn report(&mut self) {
        match self.last_frame {
            None => log::info!("no state received yet"),
            Some(last) => log::info!(
                "drew {} frames up to frame {last} ({} repeated, {} simulator frames missed), {:.1} bolts and {:.0} vertices per frame, {} bolts behind the nucleus",
                self.frames,
                self.repeated,
                self.missed,
                self.bolts as f64 / self.frames.max(1) as f64,
                self.vertices as f64 / self.frames.max(1) as f64,
                self.hidden
            ),
        }
        let last_frame = self.last_frame;
        *self = ProbeSink {
            last_frame,
            ..ProbeSink::default()
        };
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    plasma_lightning::init_logging();
    let args = Args::parse();

    log_state_facts(StateSnapshot::SIZE);

    let config = ReplicatorConfig {
        listen: args.listen,
        ..ReplicatorConfig::with_defaults()
    };
    let mut taker = UdpTaker::<StateSnapshot>::bind(&config)?;
    let mut decoder = SnapshotDecoder::new();
    let mut sink = ProbeSink::default();

    let interval = Duration::from_secs_f64(1.0 / args.frame_hz.max(1.0));
    let report_every = Duration::from_secs_f64(args.report_secs.max(0.1));
    let start = Instant::now();
    let mut last_report = start;

    loop {
        let reading = taker.poll();
        if let Some(frame) = decoder.decode_reading(&reading) {
            sink.draw(frame);
        }

        if last_report.elapsed() >= report_every {
            sink.report();
            last_report = Instant::now();
        }
        if let Some(limit) = args.duration_secs {
            if start.elapsed().as_secs_f64() >= limit {
                return Ok(());
            }
        }
        thread::sleep(interval);
    }
}
