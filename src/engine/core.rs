// 8.0 engine/core.rs: main engine. holds the protocol handle, the two standing participants
// and the audit log. simulation state lives outside, in SimulationState.

use super::config::EngineConfig;
use super::results::{EngineError, RunSummary};
use crate::config::SimConfig;
use crate::events::{Event, EventId, EventPayload};
use crate::protocol::{Participant, Protocol, Provisioner};
use crate::types::Price;

/** 8.1: main engine struct. protocol and provisioner are injected */
pub struct Engine<P, V> {
    pub(super) config: EngineConfig,
    pub(super) sim: SimConfig,
    pub(super) protocol: P,
    pub(super) provisioner: V,
    pub(super) owner: Participant,
    pub(super) arbitrageur: Participant,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_step: u64,
    pub(super) totals: RunSummary,
}

impl<P: Protocol, V: Provisioner> Engine<P, V> {
    /// Provisions the owner and the arbitrageur and applies the risk parameter.
    /// Any failure here is fatal.
    pub fn new(sim: SimConfig, config: EngineConfig, mut protocol: P, mut provisioner: V) -> Result<Self, EngineError> {
        sim.validate()?;

        let owner = provisioner.provision()?;
        let arbitrageur = provisioner.provision()?;
        protocol.set_risk_parameter(sim.risk.beta)?;

        // the pool has to be priceable before the first step
        let reserves = protocol.reserves(&sim.pair)?;
        let initial = reserves.price().ok_or(EngineError::EmptyPool(reserves))?;

        tracing::info!(
            pair = %sim.pair,
            beta = sim.risk.beta,
            steps = sim.run.steps,
            pool_price = %initial,
            owner = %owner.id,
            arbitrageur = %arbitrageur.id,
            "simulation engine ready"
        );

        Ok(Self {
            config,
            sim,
            protocol,
            provisioner,
            owner,
            arbitrageur,
            events: Vec::new(),
            next_event_id: 1,
            current_step: 0,
            totals: RunSummary::default(),
        })
    }

    pub fn owner(&self) -> &Participant {
        &self.owner
    }

    pub fn arbitrageur(&self) -> &Participant {
        &self.arbitrageur
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn protocol_mut(&mut self) -> &mut P {
        &mut self.protocol
    }

    /// Totals accumulated over every step taken so far.
    pub fn totals(&self) -> &RunSummary {
        &self.totals
    }

    pub(super) fn pool_price(&self) -> Result<Price, EngineError> {
        let reserves = self.protocol.reserves(&self.sim.pair)?;
        reserves.price().ok_or(EngineError::EmptyPool(reserves))
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.payload.kind() == kind)
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_step, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            tracing::debug!(id = event.id.0, step = event.step, kind = event.payload.kind(), payload = ?event.payload, "event");
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
