// 8.0: simulation engine. drives the protocol one step at a time: reference price,
// arbitrage, random traders, liquidations, one record per step.
// deterministic given the seed; all I/O goes through the injected protocol and sink.

mod arbitrage;
mod config;
mod core;
mod liquidations;
mod pricing;
mod results;
mod run;
mod spawner;
mod state;

pub use arbitrage::arbitrage_side;
pub use config::EngineConfig;
pub use core::Engine;
pub use results::{
    ArbitrageOutcome, EngineError, LiquidationResult, RunSummary, ScanResult, SpawnOutcome, StepOutcome,
};
pub use spawner::{side_from_draw, trader_margin};
pub use state::SimulationState;
