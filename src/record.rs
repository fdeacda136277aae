//! Step records and the line-oriented record stream.
//!
//! One header line, then one line per step:
//! `trigger, reference price, pool price, liquidation, liquidation entry price, pnl`.
//! Field order is fixed; downstream analysis reads columns by position.

use crate::types::{Price, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

pub const HEADER: &str = "Trade, Oracle Price, Pool Price, Liquidation, Liquidation Entry Price, Pool PnL";

const SEPARATOR: &str = ", ";

/// Liquidation settled during a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettledLiquidation {
    pub side: Side,
    pub entry_price: Price,
    pub pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Side of the random position opened this step, if any.
    pub trigger: Option<Side>,
    pub reference_price: Price,
    pub pool_price: Price,
    pub liquidation: Option<SettledLiquidation>,
}

impl StepRecord {
    pub fn trigger_flag(&self) -> i8 {
        self.trigger.map_or(0, |s| s.flag())
    }

    pub fn liquidation_flag(&self) -> i8 {
        self.liquidation.map_or(0, |l| l.side.flag())
    }

    pub fn liquidation_entry_price(&self) -> Decimal {
        self.liquidation.map_or(Decimal::ZERO, |l| l.entry_price.value())
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.liquidation.map_or(Decimal::ZERO, |l| l.pnl)
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}, {}",
            self.trigger_flag(),
            self.reference_price,
            self.pool_price,
            self.liquidation_flag(),
            self.liquidation_entry_price().normalize(),
            self.realized_pnl().normalize(),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("I/O error writing records: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record stream already finalized")]
    Finalized,

    #[error("Malformed record line {line:?}: {reason}")]
    Malformed { line: String, reason: String },
}

impl FromStr for StepRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| RecordError::Malformed {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = line.trim_end().split(',').map(str::trim).collect();
        if fields.len() != 6 {
            return Err(malformed("expected 6 fields"));
        }

        let flag = |s: &str| -> Result<Option<Side>, RecordError> {
            let value: i8 = s.parse().map_err(|_| malformed("bad flag"))?;
            match value {
                0 => Ok(None),
                v => Side::from_flag(v).map(Some).ok_or_else(|| malformed("flag out of range")),
            }
        };
        let decimal = |s: &str| -> Result<Decimal, RecordError> {
            Decimal::from_str(s).map_err(|_| malformed("bad decimal"))
        };
        let price = |s: &str| -> Result<Price, RecordError> {
            Price::new(decimal(s)?).ok_or_else(|| malformed("non-positive price"))
        };

        let trigger = flag(fields[0])?;
        let reference_price = price(fields[1])?;
        let pool_price = price(fields[2])?;
        let liquidation = match flag(fields[3])? {
            None => None,
            Some(side) => Some(SettledLiquidation {
                side,
                entry_price: price(fields[4])?,
                pnl: decimal(fields[5])?,
            }),
        };

        Ok(StepRecord {
            trigger,
            reference_price,
            pool_price,
            liquidation,
        })
    }
}

/// Writes the header on creation and one flushed line per record.
pub struct RecordWriter<W: Write> {
    inner: Option<W>,
    records: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(mut inner: W) -> Result<Self, RecordError> {
        writeln!(inner, "{}", HEADER)?;
        inner.flush()?;
        Ok(Self {
            inner: Some(inner),
            records: 0,
        })
    }

    pub fn write(&mut self, record: &StepRecord) -> Result<(), RecordError> {
        let inner = self.inner.as_mut().ok_or(RecordError::Finalized)?;
        writeln!(inner, "{}", record)?;
        inner.flush()?;
        self.records += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Flush and hand back the sink. Further writes fail.
    pub fn finish(&mut self) -> Result<W, RecordError> {
        let mut inner = self.inner.take().ok_or(RecordError::Finalized)?;
        inner.flush()?;
        Ok(inner)
    }
}

/// Receives records as a run produces them.
pub trait RecordSink {
    fn record(&mut self, record: &StepRecord) -> Result<(), RecordError>;
}

impl<W: Write> RecordSink for RecordWriter<W> {
    fn record(&mut self, record: &StepRecord) -> Result<(), RecordError> {
        self.write(record)
    }
}

impl RecordSink for Vec<StepRecord> {
    fn record(&mut self, record: &StepRecord) -> Result<(), RecordError> {
        self.push(record.clone());
        Ok(())
    }
}
