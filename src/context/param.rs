//! Automation timelines for audio-rate parameters.
//!
//! An `AudioParam` holds a default value plus an ordered list of scheduled
//! events. Reading the parameter at a given time walks the list the same way
//! a Web Audio parameter does: set events hold their value from their time on,
//! ramp events interpolate from the event before them up to their end time.

use super::NodeId;
use crate::{Error, Result};

/// Shape of the segment leading up to a ramp event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Curve {
    Linear,
    Exponential,
}

impl Curve {
    /// Interpolates between `(t0, v0)` and `(t1, v1)` at `t`, with `t0 <= t < t1`.
    fn map(self, t: f64, (t0, v0): (f64, f64), (t1, v1): (f64, f64)) -> f64 {
        let span = t1 - t0;
        if span <= 0.0 {
            return v0;
        }
        let progress = ((t - t0) / span).clamp(0.0, 1.0);
        match self {
            Curve::Linear => v0 + (v1 - v0) * progress,
            // Undefined across zero or a sign change: hold the start value.
            Curve::Exponential if v0 == 0.0 || v0.signum() != v1.signum() => v0,
            Curve::Exponential => v0 * (v1 / v0).powf(progress),
        }
    }
}

/// A single scheduled change on a parameter timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time` and hold it.
    SetValue { value: f64, time: f64 },
    /// Ramp linearly from the previous event, reaching `value` at `end_time`.
    LinearRamp { value: f64, end_time: f64 },
    /// Ramp exponentially from the previous event, reaching `value` at `end_time`.
    ExponentialRamp { value: f64, end_time: f64 },
}

impl AutomationEvent {
    /// The time at which the event's value is fully reached.
    pub fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. } => time,
            AutomationEvent::LinearRamp { end_time, .. } => end_time,
            AutomationEvent::ExponentialRamp { end_time, .. } => end_time,
        }
    }

    /// The value the event settles on.
    pub fn value(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { value, .. } => value,
            AutomationEvent::LinearRamp { value, .. } => value,
            AutomationEvent::ExponentialRamp { value, .. } => value,
        }
    }
}

/// A schedulable parameter such as a gain, a frequency or a delay time.
///
/// The rendered value of a parameter is its timeline value plus the sum of
/// every signal connected into it as a modulator.
///
/// # Examples
///
/// ```
/// use tonewheel::AudioParam;
///
/// let mut gain = AudioParam::new(0.0);
/// gain.set_value_at_time(0.0, 1.0);
/// gain.linear_ramp_to_value_at_time(1.0, 2.0);
///
/// assert_eq!(gain.value_at(0.5), 0.0);
/// assert_eq!(gain.value_at(1.5), 0.5);
/// assert_eq!(gain.value_at(3.0), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParam {
    default: f64,
    events: Vec<AutomationEvent>,
    pub(crate) inputs: Vec<NodeId>,
}

impl AudioParam {
    /// Creates a parameter that rests at `default` until something is scheduled.
    pub fn new(default: f64) -> Self {
        Self {
            default,
            events: Vec::new(),
            inputs: Vec::new(),
        }
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// Scheduled events, ordered by time.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Number of modulation signals connected into this parameter.
    pub fn modulator_count(&self) -> usize {
        self.inputs.len()
    }

    /// Schedules an instantaneous change to `value` at `time`.
    pub fn set_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(AutomationEvent::SetValue { value, time });
        self
    }

    /// Schedules a linear ramp from the previous event to `value` at `end_time`.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, end_time: f64) -> &mut Self {
        self.insert(AutomationEvent::LinearRamp { value, end_time });
        self
    }

    /// Schedules an exponential ramp from the previous event to `value` at `end_time`.
    ///
    /// Exponential curves cannot reach zero or cross it, so non-positive
    /// targets are rejected instead of being silently adjusted.
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f64,
        end_time: f64,
    ) -> Result<&mut Self> {
        if value <= 0.0 || value.is_nan() {
            log::warn!("rejected exponential ramp to non-positive target {value}");
            return Err(Error::NonPositiveTarget(value));
        }
        self.insert(AutomationEvent::ExponentialRamp { value, end_time });
        Ok(self)
    }

    /// Removes every event at or after `time`.
    ///
    /// A ramp whose end lies at or after `time` is removed entirely, so the
    /// parameter falls back to the value of the last surviving event.
    pub fn cancel_scheduled_values(&mut self, time: f64) -> &mut Self {
        self.events.retain(|event| event.time() < time);
        self
    }

    /// Freezes the parameter at whatever value it has at `time`.
    ///
    /// Every event is dropped and replaced by a single hold point at `time`,
    /// so an in-flight ramp stops exactly where it was instead of snapping
    /// back. The timeline must not be read before `time` afterwards.
    pub fn cancel_and_hold_at_time(&mut self, time: f64) -> &mut Self {
        let held = self.value_at(time);
        self.events.clear();
        self.events.push(AutomationEvent::SetValue { value: held, time });
        self
    }

    /// The timeline value at `time`, excluding modulation inputs.
    pub fn value_at(&self, time: f64) -> f64 {
        let mut previous = (0.0, self.default);

        for event in &self.events {
            match *event {
                AutomationEvent::SetValue { value, time: at } => {
                    if at > time {
                        return previous.1;
                    }
                    previous = (at, value);
                }
                AutomationEvent::LinearRamp { value, end_time } => {
                    if end_time > time {
                        return Curve::Linear.map(time, previous, (end_time, value));
                    }
                    previous = (end_time, value);
                }
                AutomationEvent::ExponentialRamp { value, end_time } => {
                    if end_time > time {
                        return Curve::Exponential.map(time, previous, (end_time, value));
                    }
                    previous = (end_time, value);
                }
            }
        }

        previous.1
    }

    fn insert(&mut self, event: AutomationEvent) {
        // Events at the same instant apply in call order.
        let index = self
            .events
            .iter()
            .position(|existing| existing.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(index, event);
    }
}
