//! Mutable simulation state, owned by the caller and threaded through every step.

use crate::config::SimConfig;
use crate::diffusion::PriceDiffusion;
use crate::hawkes::HawkesProcess;
use crate::random::{CountingSource, UniformSource};
use crate::registry::PositionRegistry;

pub struct SimulationState<R> {
    /// Steps completed so far.
    pub step: u64,
    pub diffusion: PriceDiffusion,
    pub hawkes: HawkesProcess,
    pub source: CountingSource<R>,
    pub registry: PositionRegistry,
}

impl<R: UniformSource> SimulationState<R> {
    pub fn new(config: &SimConfig, source: R) -> Self {
        Self {
            step: 0,
            diffusion: PriceDiffusion::new(config.diffusion.clone()),
            hawkes: HawkesProcess::new(config.hawkes.clone()),
            source: CountingSource::new(source),
            registry: PositionRegistry::new(),
        }
    }

    pub fn draws(&self) -> u64 {
        self.source.draws()
    }
}

impl SimulationState<Box<dyn UniformSource + Send>> {
    /// State backed by the generator and seed named in the config.
    pub fn from_config(config: &SimConfig) -> Self {
        let source = config.run.source.build(&config.run.seed);
        Self::new(config, source)
    }
}
