//! Scenario tests
//!
//! Drive the engine against a scripted protocol stub so every protocol
//! response is under the test's control.

use amm_sim::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
enum PoolMode {
    Fixed(Reserves),
    /// 500 base, quote sized so the pool sits at `factor` x the last pushed reference.
    PinnedToReference(Decimal),
}

#[derive(Debug, Clone)]
enum LiquidateEffect {
    /// Clears the position and moves the base reserve by the given amount.
    Clear(Decimal),
    LeaveOpen(Decimal),
    Fail,
    Offline,
}

#[derive(Debug)]
struct ScriptedProtocol {
    pool: PoolMode,
    reference: Option<Price>,
    pushes: Vec<(Decimal, Decimal)>,
    beta: Option<u32>,
    opens: Vec<(ParticipantId, OpenOrder)>,
    open_rejections: VecDeque<ProtocolError>,
    open_base_move: Decimal,
    /// Opens after this many calls fail as unreachable.
    offline_after_opens: Option<usize>,
    liquidatable: HashSet<ParticipantId>,
    effects: HashMap<ParticipantId, LiquidateEffect>,
    positions: HashMap<ParticipantId, PositionSnapshot>,
    liquidate_calls: Vec<(ParticipantId, ParticipantId)>,
    reserves_down: bool,
}

impl ScriptedProtocol {
    fn fixed(base: Decimal, quote: Decimal) -> Self {
        Self::with_pool(PoolMode::Fixed(Reserves::new(base, quote)))
    }

    fn with_pool(pool: PoolMode) -> Self {
        Self {
            pool,
            reference: None,
            pushes: Vec::new(),
            beta: None,
            opens: Vec::new(),
            open_rejections: VecDeque::new(),
            open_base_move: dec!(2.5),
            offline_after_opens: None,
            liquidatable: HashSet::new(),
            effects: HashMap::new(),
            positions: HashMap::new(),
            liquidate_calls: Vec::new(),
            reserves_down: false,
        }
    }

    fn eligible(&mut self, participant: ParticipantId, effect: LiquidateEffect) {
        self.liquidatable.insert(participant);
        self.positions.insert(
            participant,
            PositionSnapshot {
                margin: dec!(0.25),
                base_size: dec!(2.7),
                quote_size: dec!(-5000),
            },
        );
        self.effects.insert(participant, effect);
    }

    fn shift_base(&mut self, delta: Decimal) {
        if let PoolMode::Fixed(reserves) = &mut self.pool {
            reserves.base += delta;
        }
    }
}

impl Protocol for ScriptedProtocol {
    fn set_risk_parameter(&mut self, beta: u32) -> Result<(), ProtocolError> {
        self.beta = Some(beta);
        Ok(())
    }

    fn set_reference_price(&mut self, _pair: &Pair, base: Decimal, quote: Decimal) -> Result<(), ProtocolError> {
        self.pushes.push((base, quote));
        self.reference = Price::from_ratio(quote, base);
        Ok(())
    }

    fn reference_price(&self, _pair: &Pair) -> Result<Price, ProtocolError> {
        self.reference.ok_or(ProtocolError::NoReferencePrice)
    }

    fn reserves(&self, _pair: &Pair) -> Result<Reserves, ProtocolError> {
        if self.reserves_down {
            return Err(ProtocolError::Unreachable("node offline".into()));
        }
        Ok(match &self.pool {
            PoolMode::Fixed(reserves) => *reserves,
            PoolMode::PinnedToReference(factor) => {
                let reference = self.reference.map(|p| p.value()).unwrap_or(dec!(2000));
                Reserves::new(dec!(500), reference * factor * dec!(500))
            }
        })
    }

    fn open_position(&mut self, participant: ParticipantId, order: &OpenOrder) -> Result<TradeReceipt, ProtocolError> {
        self.opens.push((participant, order.clone()));
        if self.offline_after_opens.is_some_and(|limit| self.opens.len() > limit) {
            return Err(ProtocolError::Unreachable("node offline".into()));
        }
        if let Some(reason) = self.open_rejections.pop_front() {
            return Err(reason);
        }
        let delta = -order.side.sign() * self.open_base_move;
        self.shift_base(delta);
        Ok(TradeReceipt {
            participant,
            side: order.side,
            base_amount: self.open_base_move,
            quote_amount: order.notional,
        })
    }

    fn close_position(
        &mut self,
        participant: ParticipantId,
        _pair: &Pair,
        _quote_amount: Decimal,
        _deadline: Timestamp,
    ) -> Result<TradeReceipt, ProtocolError> {
        Err(ProtocolError::NoPosition(participant))
    }

    fn position(&self, _pair: &Pair, participant: ParticipantId) -> Result<PositionSnapshot, ProtocolError> {
        Ok(self.positions.get(&participant).copied().unwrap_or_default())
    }

    fn can_liquidate(&self, participant: ParticipantId) -> Result<bool, ProtocolError> {
        Ok(self.liquidatable.contains(&participant))
    }

    fn liquidate(&mut self, participant: ParticipantId, reward: ParticipantId) -> Result<LiquidationReceipt, ProtocolError> {
        self.liquidate_calls.push((participant, reward));
        let effect = self.effects.get(&participant).cloned().unwrap_or(LiquidateEffect::Fail);
        match effect {
            LiquidateEffect::Clear(delta) => {
                self.shift_base(delta);
                self.positions.remove(&participant);
                self.liquidatable.remove(&participant);
                Ok(LiquidationReceipt {
                    participant,
                    reward_recipient: reward,
                    base_closed: delta,
                    quote_closed: dec!(5000),
                    remaining_base: Decimal::ZERO,
                })
            }
            LiquidateEffect::LeaveOpen(quote_size) => {
                if let Some(p) = self.positions.get_mut(&participant) {
                    p.quote_size = quote_size;
                }
                Ok(LiquidationReceipt {
                    participant,
                    reward_recipient: reward,
                    base_closed: Decimal::ZERO,
                    quote_closed: Decimal::ZERO,
                    remaining_base: Decimal::ZERO,
                })
            }
            LiquidateEffect::Fail => Err(ProtocolError::NotLiquidatable(participant)),
            LiquidateEffect::Offline => Err(ProtocolError::Unreachable("node offline".into())),
        }
    }
}

fn provisioner() -> SequentialProvisioner {
    SequentialProvisioner::new(dec!(25), dec!(250_000))
}

fn one_step_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.run.steps = 1;
    config
}

/// Reference price the first "apeX" step pushes.
fn ape_first_reference() -> Price {
    let mut source = Arc4Source::new("apeX");
    let mut hawkes = HawkesProcess::new(HawkesParams::default());
    hawkes.sample(&mut source);
    let mut diffusion = PriceDiffusion::new(DiffusionParams::default());
    let step = diffusion.advance(&mut source);
    Price::from_f64_truncated(step.price).unwrap()
}

/// Draws for a config with jump 5: step 1 quiet, step 2 triggers, z = 0 both steps, then the side draw.
fn triggering_draws(side_draw: f64) -> ScriptedSource {
    ScriptedSource::new(vec![0.5, 0.999, 0.0, 0.25, 0.1, 0.999, 0.0, 0.25, side_draw, 0.5, 0.999, 0.0, 0.25])
}

fn excitable_config(steps: u64) -> SimConfig {
    let mut config = SimConfig::default();
    config.run.steps = steps;
    config.hawkes.jump = 5.0;
    config
}

mod setup_tests {
    use super::*;

    #[test]
    fn setup_applies_risk_parameter_and_provisions_two() {
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        let engine = Engine::new(one_step_config(), EngineConfig::default(), &mut protocol, provisioner()).unwrap();
        assert_eq!(engine.owner().id, ParticipantId(1));
        assert_eq!(engine.arbitrageur().id, ParticipantId(2));
        drop(engine);
        assert_eq!(protocol.beta, Some(50));
    }

    #[test]
    fn setup_provisioning_failure_is_fatal() {
        let protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        let result = Engine::new(
            one_step_config(),
            EngineConfig::default(),
            protocol,
            provisioner().with_capacity(1),
        );
        assert!(matches!(result, Err(EngineError::Provision(ProvisionError::Exhausted(1)))));
    }

    #[test]
    fn empty_pool_is_fatal() {
        let protocol = ScriptedProtocol::fixed(Decimal::ZERO, dec!(1_000_000));
        let result = Engine::new(one_step_config(), EngineConfig::default(), protocol, provisioner());
        assert!(matches!(result, Err(EngineError::EmptyPool(_))));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = one_step_config();
        config.risk.beta = 0;
        let protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        let result = Engine::new(config, EngineConfig::default(), protocol, provisioner());
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}

mod step_tests {
    use super::*;

    #[test]
    fn first_ape_step_is_neutral() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        let outcome = engine.step(&mut state).unwrap();
        let expected = ape_first_reference();

        assert_eq!(outcome.step, 1);
        assert!(!outcome.arrival.triggered);
        assert_eq!(outcome.arbitrage, ArbitrageOutcome::Idle);
        assert_eq!(outcome.spawn, SpawnOutcome::NotTriggered);
        assert_eq!(outcome.record.reference_price, expected);
        assert_eq!(outcome.record.pool_price.value(), dec!(2000));
        assert_eq!(outcome.record.to_string(), format!("0, {}, 2000, 0, 0, 0", expected));
        assert_eq!(state.draws(), 4);
        assert_eq!(state.step, 1);
        drop(engine);

        // 2003.4717432820134 floored to 12 places
        assert!((expected.as_f64() - 2003.471743282013).abs() < 1e-9);
        assert_eq!(protocol.pushes, vec![(Decimal::ONE, expected.value())]);
        assert!(protocol.opens.is_empty());
    }

    #[test]
    fn rich_pool_gets_one_short_before_event_logic() {
        let config = excitable_config(2);
        let mut protocol = ScriptedProtocol::with_pool(PoolMode::PinnedToReference(dec!(1.01)));
        let mut state = SimulationState::new(&config, triggering_draws(0.9));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        let first = engine.step(&mut state).unwrap();
        assert!(matches!(first.arbitrage, ArbitrageOutcome::Executed { side: Side::Short, .. }));
        assert_eq!(first.record.trigger, None);

        let second = engine.step(&mut state).unwrap();
        assert!(second.arrival.triggered);
        assert!(matches!(second.arbitrage, ArbitrageOutcome::Executed { side: Side::Short, .. }));
        assert_eq!(second.record.trigger, Some(Side::Long));
        assert_eq!(engine.events_of_kind("arbitrage_executed").count(), 2);
        drop(engine);

        // step 1: arbitrage only; step 2: arbitrage first, then the random trader
        assert_eq!(protocol.opens.len(), 3);
        let (arb, arb_order) = &protocol.opens[1];
        assert_eq!(*arb, ParticipantId(2));
        assert_eq!(arb_order.side, Side::Short);
        assert_eq!(arb_order.margin, dec!(5));
        assert_eq!(arb_order.notional, dec!(2500));
        assert_eq!(arb_order.limit, dec!(1_000_000));

        let (trader, trader_order) = &protocol.opens[2];
        assert_eq!(*trader, ParticipantId(3));
        assert_eq!(trader_order.side, Side::Long);
        assert_eq!(trader_order.limit, Decimal::new(1, 18));
    }

    #[test]
    fn cheap_pool_gets_a_long() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::with_pool(PoolMode::PinnedToReference(dec!(0.99)));
        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        let outcome = engine.step(&mut state).unwrap();
        assert!(matches!(outcome.arbitrage, ArbitrageOutcome::Executed { side: Side::Long, .. }));
    }

    #[test]
    fn rejected_arbitrage_is_logged_and_step_continues() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::with_pool(PoolMode::PinnedToReference(dec!(1.02)));
        protocol.open_rejections.push_back(ProtocolError::SlippageExceeded {
            limit: dec!(1),
            actual: dec!(2),
        });
        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        let outcome = engine.step(&mut state).unwrap();
        assert!(matches!(outcome.arbitrage, ArbitrageOutcome::Rejected { side: Side::Short, .. }));
        assert_eq!(engine.events_of_kind("arbitrage_rejected").count(), 1);
        assert_eq!(engine.totals().arbitrage_rejections, 1);
    }

    #[test]
    fn spawned_trader_is_registered_at_post_arbitrage_price() {
        let config = excitable_config(2);
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        let mut state = SimulationState::new(&config, triggering_draws(0.2));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        engine.step(&mut state).unwrap();
        let outcome = engine.step(&mut state).unwrap();

        // short: pool takes 2.5 base in, margin is 5000 / 2000 / 10
        let margin = dec!(0.25);
        assert_eq!(
            outcome.spawn,
            SpawnOutcome::Opened {
                participant: ParticipantId(3),
                side: Side::Short,
                original_base_amount: dec!(-2.5) + margin,
            }
        );
        assert_eq!(outcome.record.trigger_flag(), -1);
        assert_eq!(state.registry.len(), 1);
        let entry = state.registry.find(ParticipantId(3)).unwrap();
        assert_eq!(entry.entry_price, outcome.record.pool_price);
        assert_eq!(entry.opened_at_step, 2);
        assert_eq!(state.draws(), 9);
    }

    #[test]
    fn rejected_random_trade_still_consumes_side_draw() {
        let config = excitable_config(2);
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        protocol
            .open_rejections
            .push_back(ProtocolError::InitialMarginViolated { debt_ratio: dec!(0.97) });
        let mut state = SimulationState::new(&config, triggering_draws(0.9));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        engine.step(&mut state).unwrap();
        let outcome = engine.step(&mut state).unwrap();

        assert!(matches!(outcome.spawn, SpawnOutcome::Rejected { side: Side::Long, .. }));
        assert_eq!(outcome.record.trigger, None);
        assert!(state.registry.is_empty());
        assert_eq!(state.draws(), 9);
        assert_eq!(engine.events_of_kind("trade_rejected").count(), 1);
        assert_eq!(engine.totals().trade_rejections, 1);
    }

    #[test]
    fn failed_reserve_query_is_fatal() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();
        engine.protocol_mut().reserves_down = true;

        let result = engine.step(&mut state);
        assert!(matches!(result, Err(EngineError::Protocol(ProtocolError::Unreachable(_)))));
        assert_eq!(state.step, 0);
    }

    #[test]
    fn unreachable_exchange_on_arbitrage_is_fatal() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::with_pool(PoolMode::PinnedToReference(dec!(1.02)));
        protocol.offline_after_opens = Some(0);
        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        let result = engine.step(&mut state);
        assert!(matches!(result, Err(EngineError::Protocol(ProtocolError::Unreachable(_)))));
        assert_eq!(engine.events_of_kind("arbitrage_rejected").count(), 0);
        assert_eq!(engine.totals().arbitrage_rejections, 0);
        assert_eq!(state.step, 0);
    }

    #[test]
    fn unreachable_exchange_on_random_trade_is_fatal() {
        let config = excitable_config(2);
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        protocol.offline_after_opens = Some(0);
        let mut state = SimulationState::new(&config, triggering_draws(0.9));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        engine.step(&mut state).unwrap();
        let result = engine.step(&mut state);
        assert!(matches!(result, Err(EngineError::Protocol(ProtocolError::Unreachable(_)))));
        assert_eq!(engine.events_of_kind("trade_rejected").count(), 0);
        assert!(state.registry.is_empty());
        assert_eq!(state.step, 1);
    }

    #[test]
    fn clamped_draw_emits_event() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        let mut state = SimulationState::new(&config, ScriptedSource::new(vec![0.5, 0.5, 1.0, 0.5]));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        engine.step(&mut state).unwrap();
        let clamped: Vec<_> = engine.events_of_kind("draw_clamped").collect();
        assert_eq!(clamped.len(), 1);
        match &clamped[0].payload {
            EventPayload::DrawClamped(e) => assert_eq!(e.draw_index, 3),
            other => panic!("unexpected payload {other:?}"),
        }
    }
}

mod liquidation_tests {
    use super::*;

    fn registered(state: &mut SimulationState<Arc4Source>, id: u64, side: Side, original: Decimal) {
        state
            .registry
            .insert(OpenPosition::new(
                ParticipantId(id),
                side,
                Price::new_unchecked(dec!(1990)),
                original,
                0,
            ))
            .unwrap();
    }

    #[test]
    fn only_first_eligible_is_liquidated() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        protocol.eligible(ParticipantId(10), LiquidateEffect::Clear(dec!(2.6)));
        protocol.eligible(ParticipantId(11), LiquidateEffect::Clear(dec!(2.6)));

        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        registered(&mut state, 10, Side::Long, dec!(2.74));
        registered(&mut state, 11, Side::Long, dec!(2.74));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        let outcome = engine.step(&mut state).unwrap();
        let liquidated = outcome.scan.liquidated.clone().unwrap();
        assert_eq!(liquidated.participant, ParticipantId(10));
        assert_eq!(liquidated.pnl, dec!(0.14));
        assert_eq!(liquidated.base_reserve_after - liquidated.base_reserve_before, dec!(2.6));

        assert_eq!(outcome.record.liquidation_flag(), 1);
        assert_eq!(outcome.record.liquidation_entry_price(), dec!(1990));
        assert!(outcome.record.to_string().ends_with(", 1, 1990, 0.14"));

        assert_eq!(state.registry.participants(), vec![ParticipantId(11)]);
        assert_eq!(engine.totals().liquidations, 1);
        drop(engine);
        // reward goes to the owner
        assert_eq!(protocol.liquidate_calls, vec![(ParticipantId(10), ParticipantId(1))]);
    }

    #[test]
    fn uncleared_position_stays_registered() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        protocol.eligible(ParticipantId(10), LiquidateEffect::LeaveOpen(dec!(-100)));

        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        registered(&mut state, 10, Side::Short, dec!(-2.2));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        let outcome = engine.step(&mut state).unwrap();
        assert_eq!(outcome.scan.liquidated, None);
        assert_eq!(outcome.scan.anomalies, vec![ParticipantId(10)]);
        assert!(outcome.record.to_string().ends_with(", 0, 0, 0"));
        assert_eq!(state.registry.len(), 1);

        let anomalies: Vec<_> = engine.events_of_kind("liquidation_anomaly").collect();
        assert_eq!(anomalies.len(), 1);
        match &anomalies[0].payload {
            EventPayload::LiquidationAnomaly(e) => {
                assert_eq!(e.reason, AnomalyReason::PositionNotCleared { quote_size: dec!(-100) })
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn anomaly_does_not_stop_the_scan() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        protocol.eligible(ParticipantId(10), LiquidateEffect::Fail);
        protocol.eligible(ParticipantId(11), LiquidateEffect::Clear(dec!(-2.4)));

        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        registered(&mut state, 10, Side::Long, dec!(2.74));
        registered(&mut state, 11, Side::Short, dec!(-2.2));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        let outcome = engine.step(&mut state).unwrap();
        assert_eq!(outcome.scan.anomalies, vec![ParticipantId(10)]);
        let liquidated = outcome.scan.liquidated.unwrap();
        assert_eq!(liquidated.participant, ParticipantId(11));
        // -2.2 - (-2.4)
        assert_eq!(liquidated.pnl, dec!(0.2));
        assert_eq!(outcome.record.liquidation_flag(), -1);
        assert_eq!(state.registry.participants(), vec![ParticipantId(10)]);
    }

    #[test]
    fn unreachable_exchange_on_liquidate_is_fatal() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        protocol.eligible(ParticipantId(10), LiquidateEffect::Offline);
        protocol.eligible(ParticipantId(11), LiquidateEffect::Clear(dec!(2.6)));

        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        registered(&mut state, 10, Side::Long, dec!(2.74));
        registered(&mut state, 11, Side::Long, dec!(2.74));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        let result = engine.step(&mut state);
        assert!(matches!(result, Err(EngineError::Protocol(ProtocolError::Unreachable(_)))));
        assert_eq!(engine.events_of_kind("liquidation_anomaly").count(), 0);
        assert_eq!(state.registry.len(), 2);
        drop(engine);
        // the scan stops at the first entry
        assert_eq!(protocol.liquidate_calls.len(), 1);
    }

    #[test]
    fn ineligible_entries_are_left_alone() {
        let config = one_step_config();
        let mut protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        registered(&mut state, 10, Side::Long, dec!(2.74));
        let mut engine = Engine::new(config, EngineConfig::default(), &mut protocol, provisioner()).unwrap();

        let outcome = engine.step(&mut state).unwrap();
        assert_eq!(outcome.scan, ScanResult::default());
        drop(engine);
        assert!(protocol.liquidate_calls.is_empty());
    }
}

mod run_tests {
    use super::*;

    #[test]
    fn run_writes_header_and_one_line_per_step() {
        let mut config = SimConfig::default();
        config.run.steps = 30;
        let protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        let mut engine = Engine::new(config, EngineConfig::default(), protocol, provisioner()).unwrap();

        let mut writer = RecordWriter::new(Vec::new()).unwrap();
        let summary = engine.run(&mut state, &mut writer).unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 31);
        assert_eq!(lines[0], amm_sim::record::HEADER);
        for line in &lines[1..] {
            line.parse::<StepRecord>().unwrap();
        }
        assert_eq!(summary.steps, 30);
        assert_eq!(summary.open_positions, state.registry.len());
        assert_eq!(engine.events_of_kind("reference_price_updated").count(), 30);
    }

    #[test]
    fn run_aborts_when_exchange_goes_offline() {
        let mut config = SimConfig::default();
        config.run.steps = 5;
        // no excitation: the event statistic stays non-negative, so no random trades
        config.hawkes.jump = 0.0;
        // rich pool: every step sends one arbitrage trade
        let mut protocol = ScriptedProtocol::with_pool(PoolMode::PinnedToReference(dec!(1.02)));
        protocol.offline_after_opens = Some(2);
        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        let mut engine = Engine::new(config, EngineConfig::default(), protocol, provisioner()).unwrap();

        let mut records: Vec<StepRecord> = Vec::new();
        let result = engine.run(&mut state, &mut records);
        assert!(matches!(result, Err(EngineError::Protocol(ProtocolError::Unreachable(_)))));
        assert_eq!(records.len(), 2);
        assert_eq!(engine.totals().arbitrage_trades, 2);
        assert_eq!(engine.totals().arbitrage_rejections, 0);
    }

    #[test]
    fn event_log_is_bounded() {
        let mut config = SimConfig::default();
        config.run.steps = 20;
        let protocol = ScriptedProtocol::fixed(dec!(500), dec!(1_000_000));
        let mut state = SimulationState::new(&config, Arc4Source::new("apeX"));
        let engine_config = EngineConfig {
            max_events: 5,
            verbose: true,
        };
        let mut engine = Engine::new(config, engine_config, protocol, provisioner()).unwrap();

        let mut records: Vec<StepRecord> = Vec::new();
        engine.run(&mut state, &mut records).unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(engine.events().len(), 5);
        assert_eq!(engine.recent_events(2).len(), 2);
        assert_eq!(engine.events().last().unwrap().step, 20);
    }
}
