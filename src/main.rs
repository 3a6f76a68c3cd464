use strummer::console_display;
use strummer::engine::StrumEngine;
use strummer::event_logger;
use strummer::host::Host;
use strummer::osc_sender;
use strummer::params::{StrumConfig, PARAMETERS};
use strummer::script_reader::ScriptReader;
use strummer::simulator;
use strummer::types::*;

use clap::Parser;
use crossbeam_channel::{bounded, Sender};
use log::{error, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

#[derive(Parser)]
#[command(name = "strummer")]
#[command(about = "Turns simultaneous MIDI note-ons into a timed guitar-style strum")]
struct Cli {
    /// JSONL performance script to play (header + one host message per line)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Built-in demo to play when no script is given: "basic" or "offbeat"
    #[arg(long, default_value = "basic")]
    demo: String,

    /// Strum config JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override a control by name, e.g. --param "Strum Division=25" (repeatable)
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Seed for the random division/velocity spread (reproducible output)
    #[arg(long)]
    seed: Option<u64>,

    /// Demo tempo (BPM)
    #[arg(long, default_value_t = 100.0)]
    tempo: f64,

    /// Pace demo blocks in real time instead of as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Print output events to the terminal
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    console: bool,

    /// Also print passed-through (non-note) events
    #[arg(long)]
    show_thru: bool,

    /// Enable OSC output
    #[arg(long)]
    osc: bool,

    /// OSC target address
    #[arg(long, default_value = "127.0.0.1:9000")]
    osc_target: String,

    /// Log output events to a session directory
    #[arg(long)]
    log_events: bool,

    /// Output directory for logged sessions
    #[arg(long, default_value = "./sessions")]
    output_dir: PathBuf,

    /// List the controls with their ranges and exit
    #[arg(long)]
    list_params: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_params {
        for p in PARAMETERS.iter() {
            println!("{:<26} {:>6} .. {:<6} default {:<5} {}", p.name, p.min, p.max, p.default, p.unit);
        }
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    // ─── Input: script file or built-in demo ────────────────────────
    let mut script = match &cli.script {
        Some(path) => {
            let file = File::open(path).map_err(|e| format!("open script {:?}: {}", path, e))?;
            Some(ScriptReader::open(BufReader::new(file))?)
        }
        None => None,
    };
    if script.is_none() {
        simulator::demo_pattern(&cli.demo)?;
    }

    // ─── Config: defaults < script header < --config < --param ──────
    let mut config = script
        .as_ref()
        .and_then(|s| s.header.config.clone())
        .unwrap_or_default();
    if let Some(path) = &cli.config {
        config = StrumConfig::load(path)?;
    }
    for assignment in &cli.params {
        config.apply_assignment(assignment)?;
    }
    let config = config.sanitized();

    info!("═══════════════════════════════════════════════");
    info!("  STRUMMER v{}", env!("CARGO_PKG_VERSION"));
    info!("  Config: {}", config);
    match &cli.script {
        Some(path) => info!("  Input: script {:?}", path),
        None => info!("  Input: demo {:?} at {} bpm", cli.demo, cli.tempo),
    }
    if cli.osc {
        info!("  Output: OSC → {}", cli.osc_target);
    }
    if cli.log_events {
        info!("  Output: session log in {:?}", cli.output_dir);
    }
    info!("═══════════════════════════════════════════════");

    let (input_tx, input_rx) = bounded::<HostMessage>(4096);
    let mut output_txs: Vec<Sender<StampedOutput>> = Vec::new();
    let mut handles = Vec::new();

    // ─── Console display ────────────────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<StampedOutput>(1024);
        output_txs.push(tx);
        let show_thru = cli.show_thru;
        handles.push(spawn("display", move || {
            console_display::ConsoleDisplay::new(rx, show_thru).run();
        })?);
    }

    // ─── OSC sender ─────────────────────────────────────────────────
    if cli.osc {
        let (tx, rx) = bounded::<StampedOutput>(1024);
        output_txs.push(tx);
        let target = cli.osc_target.clone();
        handles.push(spawn("osc", move || {
            osc_sender::OscSender::new(rx, target).run();
        })?);
    }

    // ─── Event logger ───────────────────────────────────────────────
    if cli.log_events {
        let (tx, rx) = bounded::<StampedOutput>(4096);
        output_txs.push(tx);
        let logger = event_logger::EventLogger::new(rx, &cli.output_dir, config.clone())
            .map_err(|e| format!("create session dir in {:?}: {}", cli.output_dir, e))?;
        handles.push(spawn("logger", move || {
            if let Err(e) = logger.run() {
                error!("Event logger failed: {}", e);
            }
        })?);
    }

    if output_txs.is_empty() {
        warn!("No outputs enabled; strummed notes will be discarded");
    }

    // ─── Host ───────────────────────────────────────────────────────
    let engine = match cli.seed {
        Some(seed) => StrumEngine::seeded(seed),
        None => StrumEngine::new(),
    };
    handles.push(spawn("host", move || {
        Host::with_engine(input_rx, output_txs, config, engine).run();
    })?);

    // ─── Feed input on this thread ──────────────────────────────────
    match script.take() {
        Some(mut reader) => {
            let mut sent = 0usize;
            while let Some(result) = reader.next_message() {
                match result {
                    Ok(msg) => {
                        if input_tx.send(msg).is_err() {
                            break;
                        }
                        sent += 1;
                    }
                    Err(e) => warn!("Skipping script {}", e),
                }
            }
            info!("Script finished: {} messages", sent);
        }
        None => {
            simulator::Simulator::new(input_tx.clone(), cli.tempo, cli.realtime).run(&cli.demo)?;
        }
    }
    drop(input_tx);

    for h in handles {
        let _ = h.join();
    }
    Ok(())
}

fn spawn<F>(name: &str, f: F) -> Result<thread::JoinHandle<()>, String>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map_err(|e| format!("spawn {} thread: {}", name, e))
}
