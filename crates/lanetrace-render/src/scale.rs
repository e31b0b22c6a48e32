//! Mirrored time axis: the start instant sits at the high x end and "now" at the low end, so
//! "earlier" always means "greater x".

use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeScale {
    pub start: NaiveDateTime,
    pub now: NaiveDateTime,
    pub x_start: f64,
    pub x_now: f64,
}

impl TimeScale {
    pub fn new(start: NaiveDateTime, now: NaiveDateTime, x_start: f64, x_now: f64) -> Result<Self> {
        if start >= now {
            return Err(Error::InvalidTimeline { start, now });
        }
        if !(x_start.is_finite() && x_now.is_finite()) || x_start <= x_now {
            return Err(Error::InvalidConfig {
                message: format!("time axis needs x_start > x_now (got {x_start} and {x_now})"),
            });
        }
        Ok(Self {
            start,
            now,
            x_start,
            x_now,
        })
    }

    fn span_seconds(&self) -> f64 {
        (self.now - self.start).num_seconds() as f64
    }

    /// Unclamped mapping.
    pub fn x(&self, t: NaiveDateTime) -> f64 {
        let frac = (t - self.start).num_seconds() as f64 / self.span_seconds();
        self.x_start - frac * (self.x_start - self.x_now)
    }

    /// Mapping clamped to `[start, now]`; the flag reports whether clamping happened.
    pub fn x_clamped(&self, t: NaiveDateTime) -> (f64, bool) {
        if t < self.start {
            (self.x_start, true)
        } else if t > self.now {
            (self.x_now, true)
        } else {
            (self.x(t), false)
        }
    }

    pub fn invert(&self, x: f64) -> NaiveDateTime {
        let frac = (self.x_start - x) / (self.x_start - self.x_now);
        let secs = (frac * self.span_seconds()).round() as i64;
        self.start + chrono::Duration::seconds(secs)
    }

    /// `a` happens strictly before `b` on this axis.
    pub fn is_before(a: f64, b: f64) -> bool {
        a > b
    }
}
