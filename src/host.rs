use crate::collector::{ChordCollector, Collected};
use crate::curve::Jitter;
use crate::engine::StrumEngine;
use crate::params::StrumConfig;
use crate::scheduler::{ChannelScheduler, HostScheduler};
use crate::types::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, trace};
use rand::rngs::StdRng;

/// Plays the sequencer's part: receives `HostMessage`s in delivery order,
/// feeds note events to the collector, runs the engine at the end of every
/// block, and fans the results out to downstream consumers.
///
/// The two host callbacks (event arrival, block processing) are strictly
/// serialized here because both run on this one thread.
pub struct Host<J: Jitter = StdRng> {
    input_rx: Receiver<HostMessage>,
    out: ChannelScheduler,
    collector: ChordCollector,
    engine: StrumEngine<J>,
    config: StrumConfig,
}

/// Counters reported when the host loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub blocks: u64,
    pub chords: u64,
    pub notes: u64,
    pub passed_through: u64,
    pub dropped: u64,
}

impl Host<StdRng> {
    pub fn new(
        input_rx: Receiver<HostMessage>,
        output_txs: Vec<Sender<StampedOutput>>,
        config: StrumConfig,
    ) -> Self {
        Self::with_engine(input_rx, output_txs, config, StrumEngine::new())
    }
}

impl<J: Jitter> Host<J> {
    pub fn with_engine(
        input_rx: Receiver<HostMessage>,
        output_txs: Vec<Sender<StampedOutput>>,
        config: StrumConfig,
        engine: StrumEngine<J>,
    ) -> Self {
        Self {
            input_rx,
            out: ChannelScheduler::new(output_txs),
            collector: ChordCollector::new(),
            engine,
            config: config.sanitized(),
        }
    }

    /// Run until the input channel closes. Blocks the calling thread.
    pub fn run(&mut self) -> HostStats {
        info!("Host running ({})", self.config);
        let mut stats = HostStats::default();

        for msg in self.input_rx.iter() {
            match msg {
                HostMessage::Midi { event, block_start } => {
                    match self.collector.handle(event, block_start) {
                        Collected::PassThrough(ev) => {
                            self.out.set_position(block_start);
                            self.out.pass_through(ev);
                            stats.passed_through += 1;
                        }
                        Collected::Buffered => {}
                        Collected::Dropped => stats.dropped += 1,
                    }
                }

                HostMessage::Block(transport) => {
                    stats.blocks += 1;
                    self.out.set_position(transport.position);
                    let chord = self.collector.take_chord();
                    let had_chord = chord.is_some();
                    let n = self
                        .engine
                        .process(chord, &transport, &self.config, &mut self.out);
                    if n > 0 {
                        stats.chords += 1;
                        stats.notes += n as u64;
                    } else if had_chord {
                        trace!("block at beat {:.3} discarded its chord", transport.position);
                    }

                    if stats.blocks % 1000 == 0 {
                        debug!("Host: {} blocks, {} chords", stats.blocks, stats.chords);
                    }
                }

                HostMessage::Config(config) => {
                    self.config = config.sanitized();
                    info!("Config updated: {}", self.config);
                }
            }
        }

        info!(
            "Host shutting down: {} blocks, {} chords, {} notes, {} passed through, {} dropped",
            stats.blocks, stats.chords, stats.notes, stats.passed_through, stats.dropped
        );
        stats
    }

    pub fn config(&self) -> &StrumConfig {
        &self.config
    }
}
