//! Click-free parameter scheduling.
//!
//! Every value change goes through the same discipline: freeze the parameter
//! where it is right now, pin that value again at the start of the ramp, then
//! ramp to the target. Nothing ever jumps, and a new change always replaces
//! whatever ramp was still in flight.

use crate::context::{AudioParam, Graph, Output, ParamRef, Sink};
use crate::Result;

/// What to do with a parameter.
///
/// Plain numbers convert into [`Control::Set`] with no ramp and no delay,
/// and outputs convert into [`Control::Modulate`], so most call sites read
/// `osc.amp(0.5)` or `osc.freq(lfo.output())`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    /// Ramp to `value` over `ramp_time` seconds, starting `delay` seconds from now.
    Set {
        value: f64,
        ramp_time: f64,
        delay: f64,
    },
    /// Sum an audio-rate signal into the parameter.
    Modulate(Output),
    /// Leave the parameter alone; only return its handle.
    Query,
}

impl Control {
    /// An immediate change.
    pub fn set(value: f64) -> Self {
        Control::Set {
            value,
            ramp_time: 0.0,
            delay: 0.0,
        }
    }

    /// A change that ramps over `ramp_time` seconds after waiting `delay` seconds.
    pub fn ramp(value: f64, ramp_time: f64, delay: f64) -> Self {
        Control::Set {
            value,
            ramp_time,
            delay,
        }
    }
}

impl From<f64> for Control {
    fn from(value: f64) -> Self {
        Control::set(value)
    }
}

impl From<Output> for Control {
    fn from(output: Output) -> Self {
        Control::Modulate(output)
    }
}

/// How a parameter travels towards its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RampShape {
    /// Straight line. Used for gains and delay times.
    Linear,
    /// Exponential for positive targets, linear otherwise.
    Frequency,
}

/// Clamps a duration to a usable, non-negative value.
pub(crate) fn seconds(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.max(0.0) }
}

/// Schedules a hold-then-ramp on `param`.
///
/// The parameter is frozen at its value at `now`, that value is pinned again
/// at `now + delay`, and the ramp lands on `value` at `now + delay + ramp_time`.
pub(crate) fn schedule_ramp(
    param: &mut AudioParam,
    now: f64,
    value: f64,
    ramp_time: f64,
    delay: f64,
    shape: RampShape,
) -> Result<()> {
    let start = now + seconds(delay);
    let end = start + seconds(ramp_time);

    let current = param.value_at(now);
    param.cancel_and_hold_at_time(now);
    param.set_value_at_time(current, start);

    match shape {
        RampShape::Frequency if value > 0.0 => {
            param.exponential_ramp_to_value_at_time(value, end)?;
        }
        RampShape::Linear | RampShape::Frequency => {
            param.linear_ramp_to_value_at_time(value, end);
        }
    }
    Ok(())
}

/// Applies `control` to the parameter behind `handle`.
///
/// Only `Set` touches the timeline. `Modulate` adds an edge from the output
/// into the parameter; remembering it across restarts is up to the caller.
pub(crate) fn apply(
    graph: &mut Graph,
    handle: ParamRef,
    control: Control,
    shape: RampShape,
) -> Result<()> {
    match control {
        Control::Set {
            value,
            ramp_time,
            delay,
        } => {
            if value.is_nan() {
                log::warn!("ignoring NaN target for {:?} on node {}", handle.slot, handle.node);
                return Ok(());
            }
            let now = graph.now();
            log::trace!(
                "{:?} on node {} -> {value} over {ramp_time}s after {delay}s",
                handle.slot,
                handle.node
            );
            schedule_ramp(graph.param_mut(handle)?, now, value, ramp_time, delay, shape)
        }
        Control::Modulate(output) => graph.connect(output.node(), Sink::Param(handle)),
        Control::Query => {
            graph.param(handle)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_control_conversions() {
        assert_eq!(
            Control::from(0.5),
            Control::Set {
                value: 0.5,
                ramp_time: 0.0,
                delay: 0.0
            }
        );
        assert_eq!(
            Control::ramp(1.0, 2.0, 3.0),
            Control::Set {
                value: 1.0,
                ramp_time: 2.0,
                delay: 3.0
            }
        );
    }

    #[test]
    fn test_seconds_sanitizes_input() {
        assert_eq!(seconds(-1.0), 0.0);
        assert_eq!(seconds(f64::NAN), 0.0);
        assert_eq!(seconds(0.25), 0.25);
    }

    #[test]
    fn test_ramp_holds_then_moves() {
        let mut param = AudioParam::new(0.0);
        schedule_ramp(&mut param, 0.0, 0.8, 2.0, 1.0, RampShape::Linear).unwrap();
        assert_eq!(param.value_at(0.5), 0.0);
        assert_eq!(param.value_at(1.0), 0.0);
        assert!((param.value_at(2.0) - 0.4).abs() < EPSILON);
        assert_eq!(param.value_at(3.0), 0.8);
    }

    #[test]
    fn test_new_ramp_starts_where_old_one_was() {
        let mut param = AudioParam::new(0.0);
        schedule_ramp(&mut param, 0.0, 1.0, 1.0, 0.0, RampShape::Linear).unwrap();
        schedule_ramp(&mut param, 0.5, 0.0, 1.0, 0.0, RampShape::Linear).unwrap();
        assert!((param.value_at(0.5) - 0.5).abs() < EPSILON);
        assert!((param.value_at(1.0) - 0.25).abs() < EPSILON);
        assert_eq!(param.value_at(1.5), 0.0);
    }

    #[test]
    fn test_frequency_ramp_is_exponential_for_positive_targets() {
        let mut param = AudioParam::new(100.0);
        schedule_ramp(&mut param, 0.0, 400.0, 2.0, 0.0, RampShape::Frequency).unwrap();
        assert!((param.value_at(1.0) - 200.0).abs() < EPSILON);
    }

    #[test]
    fn test_frequency_ramp_falls_back_to_linear() {
        let mut param = AudioParam::new(100.0);
        schedule_ramp(&mut param, 0.0, -100.0, 2.0, 0.0, RampShape::Frequency).unwrap();
        assert!((param.value_at(1.0)).abs() < EPSILON);
        assert_eq!(param.value_at(2.0), -100.0);

        let mut param = AudioParam::new(100.0);
        schedule_ramp(&mut param, 0.0, 0.0, 0.0, 0.0, RampShape::Frequency).unwrap();
        assert_eq!(param.value_at(0.0), 0.0);
    }

    #[test]
    fn test_zero_ramp_lands_immediately() {
        let mut param = AudioParam::new(0.0);
        schedule_ramp(&mut param, 1.0, 0.5, 0.0, 0.0, RampShape::Linear).unwrap();
        assert_eq!(param.value_at(1.0), 0.5);
    }
}
