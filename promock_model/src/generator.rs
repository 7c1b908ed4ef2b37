use crate::draw::DrawSource;
use crate::model::SeriesModel;
use crate::state::{SeriesState, StateTable};
use chrono::{DateTime, Utc};
use promock_core::{SeriesKey, SeriesKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_DAMPENING: f64 = 0.3;
pub const DEFAULT_INCREMENT_MIN: f64 = 0.1;
pub const DEFAULT_INCREMENT_MAX: f64 = 1.0;

/// Per-minute increment range for counters without a learned rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncrementRange {
    pub min: f64,
    pub max: f64,
}

impl Default for IncrementRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_INCREMENT_MIN,
            max: DEFAULT_INCREMENT_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Fraction of the way a gauge moves toward each new draw.
    #[serde(default = "default_dampening")]
    pub dampening: f64,
    #[serde(default)]
    pub default_increment: IncrementRange,
}

fn default_dampening() -> f64 {
    DEFAULT_DAMPENING
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            dampening: DEFAULT_DAMPENING,
            default_increment: IncrementRange::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.dampening > 0.0 && self.dampening <= 1.0) {
            return Err(format!(
                "dampening must be in (0, 1], got {}",
                self.dampening
            ));
        }
        let range = self.default_increment;
        if !(range.min >= 0.0 && range.min <= range.max && range.max.is_finite()) {
            return Err(format!(
                "default increment range must satisfy 0 <= min <= max, got {}..{}",
                range.min, range.max
            ));
        }
        Ok(())
    }
}

/// Produces values for one model set and owns the state of its series.
///
/// A generator lives exactly as long as the model set it was built for;
/// replacing the models means building a new generator, which starts every
/// series fresh.
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    states: StateTable,
}

impl Generator {
    pub fn new(config: GeneratorConfig, models: &BTreeMap<SeriesKey, SeriesModel>) -> Self {
        Self {
            config,
            states: StateTable::new(models.keys()),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn states(&self) -> &StateTable {
        &self.states
    }

    /// Produce the next value for `model`'s series, advancing its state.
    ///
    /// Returns `None` for a series this generator was not built for.
    pub fn generate(
        &self,
        model: &SeriesModel,
        now: DateTime<Utc>,
        draw: &mut impl DrawSource,
    ) -> Option<f64> {
        self.states
            .with_state(&model.key, |state| self.next_value(model, state, now, draw))
    }

    /// One generation step against an explicit state slot.
    pub fn next_value(
        &self,
        model: &SeriesModel,
        state: &mut Option<SeriesState>,
        now: DateTime<Utc>,
        draw: &mut impl DrawSource,
    ) -> f64 {
        match model.kind {
            SeriesKind::Counter => self.next_counter(model, state, now, draw),
            SeriesKind::Gauge => self.next_gauge(model, state, now, draw),
        }
    }

    fn next_counter(
        &self,
        model: &SeriesModel,
        state: &mut Option<SeriesState>,
        now: DateTime<Utc>,
        draw: &mut impl DrawSource,
    ) -> f64 {
        let Some(current) = state.as_mut() else {
            *state = Some(SeriesState::new(model.seed_value, now));
            return model.seed_value;
        };

        let minutes = elapsed_minutes(current.last_emitted_at, now);
        let per_minute = match model.rate {
            Some(rate) if rate.std_dev_per_minute > 0.0 => draw
                .normal(rate.mean_per_minute, rate.std_dev_per_minute)
                .abs(),
            _ => draw.uniform(
                self.config.default_increment.min,
                self.config.default_increment.max,
            ),
        };

        let increment = (per_minute * minutes).max(0.0);
        if increment.is_finite() {
            current.value += increment;
        }
        if now > current.last_emitted_at {
            current.last_emitted_at = now;
        }
        current.value
    }

    fn next_gauge(
        &self,
        model: &SeriesModel,
        state: &mut Option<SeriesState>,
        now: DateTime<Utc>,
        draw: &mut impl DrawSource,
    ) -> f64 {
        let value = if model.std_dev > 0.0 {
            let previous = state.map(|s| s.value).unwrap_or(model.mean);
            let candidate = draw.normal(model.mean, model.std_dev);
            previous + self.config.dampening * (candidate - previous)
        } else {
            draw.uniform(model.min, model.max)
        };
        let value = value.clamp(model.min, model.max);

        *state = Some(SeriesState::new(value, now));
        value
    }
}

fn elapsed_minutes(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - since).num_milliseconds();
    if millis <= 0 {
        0.0
    } else {
        millis as f64 / 60_000.0
    }
}
