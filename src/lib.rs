// amm-sim: stochastic simulation harness for a constant-product perpetual AMM.
// drives a protocol with a diffused reference price, an arbitrageur and self-exciting
// random traders, then records liquidations and pool pnl step by step.
// deterministic for a given seed; the protocol sits behind a trait.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: ParticipantId, Side, Price, Pair, Timestamp
//   2.x  protocol.rs: Protocol and Provisioner traits, receipts, ProtocolError
//   3.x  random.rs: seeded uniform sources (seedrandom ARC4, ChaCha)
//   3.1  diffusion.rs: GBM reference price, Box-Muller
//   3.2  hawkes.rs: event-arrival statistic and intensity
//   4.x  registry.rs: open random positions, realized pnl
//   5.x  record.rs: step records and the line stream
//   6.x  events.rs: audit events
//   7.x  config.rs: run settings, presets, validation
//   8.x  engine/: step loop: pricing, arbitrage, spawner, liquidations
//   9.x  paper/: in-process constant-product exchange

// simulation core
pub mod diffusion;
pub mod engine;
pub mod hawkes;
pub mod random;
pub mod registry;
pub mod types;

// protocol seam
pub mod paper;
pub mod protocol;

// integration modules
pub mod config;
pub mod events;
pub mod record;

// re exports for convenience
pub use config::{ConfigError, Preset, SimConfig};
pub use diffusion::{DiffusionParams, PriceDiffusion};
pub use engine::*;
pub use events::*;
pub use hawkes::{HawkesParams, HawkesProcess};
pub use paper::{PaperExchange, SequentialProvisioner};
pub use protocol::*;
pub use random::{Arc4Source, ChaChaSource, CountingSource, ScriptedSource, SourceKind, UniformSource};
pub use record::{RecordSink, RecordWriter, SettledLiquidation, StepRecord};
pub use registry::{OpenPosition, PositionRegistry};
pub use types::*;
