// 8.5 engine/run.rs: the step loop.
// per step: event statistic -> reference price -> arbitrage -> random trade -> liquidation scan -> record.
// the event statistic is sampled first but only acted on after arbitrage.

use super::core::Engine;
use super::results::{EngineError, RunSummary, SpawnOutcome, StepOutcome};
use super::state::SimulationState;
use crate::protocol::{Protocol, Provisioner};
use crate::random::UniformSource;
use crate::record::{RecordSink, SettledLiquidation, StepRecord};
use crate::types::Side;

impl<P: Protocol, V: Provisioner> Engine<P, V> {
    /// Run one step and return its record with everything that led to it.
    pub fn step<R: UniformSource>(&mut self, state: &mut SimulationState<R>) -> Result<StepOutcome, EngineError> {
        let step = state.step + 1;
        self.current_step = step;

        let arrival = state.hawkes.sample(&mut state.source);
        let reference_price = self.update_reference_price(state)?;
        let arbitrage = self.run_arbitrage(reference_price)?;

        // post-arbitrage: the price random trades are sized at and the one recorded
        let pool_price = self.pool_price()?;
        let spawn = if arrival.triggered {
            self.spawn_trader(state, pool_price)?
        } else {
            SpawnOutcome::NotTriggered
        };

        let scan = self.scan_liquidations(state)?;

        let trigger = match &spawn {
            SpawnOutcome::Opened { side, .. } => Some(*side),
            _ => None,
        };
        let record = StepRecord {
            trigger,
            reference_price,
            pool_price,
            liquidation: scan.liquidated.as_ref().map(|l| SettledLiquidation {
                side: l.side,
                entry_price: l.entry_price,
                pnl: l.pnl,
            }),
        };

        state.step = step;
        let outcome = StepOutcome {
            step,
            arrival,
            arbitrage,
            spawn,
            scan,
            record,
        };
        self.totals.absorb(&outcome);
        Ok(outcome)
    }

    /// Step until the configured step count, handing each record to `sink`.
    pub fn run<R: UniformSource, S: RecordSink + ?Sized>(
        &mut self,
        state: &mut SimulationState<R>,
        sink: &mut S,
    ) -> Result<RunSummary, EngineError> {
        let total = self.sim.run.steps;
        let interval = self.sim.run.progress_interval;

        while state.step < total {
            let outcome = self.step(state)?;
            sink.record(&outcome.record)?;

            if interval > 0 && outcome.step % interval == 0 {
                tracing::info!(
                    step = outcome.step,
                    total,
                    reference_price = %outcome.record.reference_price,
                    pool_price = %outcome.record.pool_price,
                    open_longs = state.registry.count_by_side(Side::Long),
                    open_shorts = state.registry.count_by_side(Side::Short),
                    "progress"
                );
            }
        }

        let summary = self.summary(state);
        tracing::info!(
            steps = summary.steps,
            random_trades = summary.random_trades(),
            trade_rejections = summary.trade_rejections,
            arbitrage_trades = summary.arbitrage_trades,
            liquidations = summary.liquidations,
            anomalies = summary.anomalies,
            total_pnl = %summary.total_pnl,
            open_positions = summary.open_positions,
            "simulation complete"
        );
        Ok(summary)
    }

    pub fn summary<R: UniformSource>(&self, state: &SimulationState<R>) -> RunSummary {
        RunSummary {
            steps: state.step,
            open_positions: state.registry.len(),
            final_price: state.diffusion.price(),
            draws: state.draws(),
            ..self.totals.clone()
        }
    }
}
