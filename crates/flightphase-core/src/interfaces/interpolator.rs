//! Linear message interpolator
//!
//! Buffers timestamped samples received over a channel and answers
//! value-at-time queries by linear interpolation between the two samples
//! that bracket the query.

use std::collections::VecDeque;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::Interpolator;
use crate::error::{Feed, FlightError};
use crate::types::{Lerp, Stamped};

/// Default number of samples kept per feed
pub const DEFAULT_INTERPOLATOR_BUFFER: usize = 100;

/// Interpolating reader of one feed (battery voltage, odometry, ...)
#[derive(Debug)]
pub struct LinearInterpolator<V> {
    feed: Feed,
    receiver: Receiver<Stamped<V>>,
    buffer: VecDeque<Stamped<V>>,
    capacity: usize,
}

impl<V: Lerp> LinearInterpolator<V> {
    /// Interpolator for `feed` and the sender that fills it
    pub fn new(feed: Feed, capacity: usize) -> (Self, Sender<Stamped<V>>) {
        let (sender, receiver) = crossbeam_channel::unbounded::<Stamped<V>>();
        let interpolator = Self {
            feed,
            receiver,
            buffer: VecDeque::with_capacity(capacity),
            capacity: capacity.max(2),
        };
        (interpolator, sender)
    }

    pub fn feed(&self) -> Feed {
        self.feed
    }

    /// Time of the newest buffered sample
    pub fn latest_time(&mut self) -> Option<f64> {
        self.drain();
        self.buffer.back().map(|sample| sample.time)
    }

    fn drain(&mut self) {
        while let Ok(sample) = self.receiver.try_recv() {
            self.insert(sample);
        }
    }

    fn insert(&mut self, sample: Stamped<V>) {
        let index = self.buffer.partition_point(|buffered| buffered.time <= sample.time);
        if index > 0 && self.buffer[index - 1].time == sample.time {
            self.buffer[index - 1] = sample;
        } else {
            self.buffer.insert(index, sample);
        }
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    fn unavailable(&self) -> FlightError {
        FlightError::Unavailable { feed: self.feed }
    }
}

impl<V: Lerp> Interpolator<V> for LinearInterpolator<V> {
    fn value_at(&mut self, time: f64, timeout: f64) -> Result<V, FlightError> {
        self.drain();

        let index = self.buffer.partition_point(|sample| sample.time < time);

        let Some(after) = self.buffer.get(index) else {
            // Query is past the newest sample: hold it while it is fresh
            let newest = self.buffer.back().ok_or_else(|| self.unavailable())?;
            let age = time - newest.time;
            if age > timeout {
                return Err(FlightError::StaleInput { feed: self.feed, age, timeout });
            }
            return Ok(newest.value.clone());
        };

        if after.time == time {
            return Ok(after.value.clone());
        }

        // Nothing recorded before the query time
        let before = index
            .checked_sub(1)
            .and_then(|i| self.buffer.get(i))
            .ok_or_else(|| self.unavailable())?;

        let gap = after.time - before.time;
        if gap > timeout {
            return Err(FlightError::StaleInput { feed: self.feed, age: gap, timeout });
        }

        let fraction = (time - before.time) / gap;
        Ok(before.value.lerp(&after.value, fraction))
    }

    fn wait_until_ready(&mut self, timeout: Duration) -> Result<(), FlightError> {
        self.drain();
        if !self.buffer.is_empty() {
            return Ok(());
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(sample) => {
                self.insert(sample);
                Ok(())
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Err(self.unavailable()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn battery() -> (LinearInterpolator<f64>, Sender<Stamped<f64>>) {
        LinearInterpolator::new(Feed::Battery, 16)
    }

    #[test]
    fn test_interpolates_between_bracket() {
        let (mut interp, tx) = battery();
        tx.send(Stamped::new(1.0, 12.0)).unwrap();
        tx.send(Stamped::new(1.2, 11.0)).unwrap();

        let v = interp.value_at(1.05, 0.5).unwrap();
        assert_relative_eq!(v, 11.75, epsilon = 1e-12);
    }

    #[test]
    fn test_exact_sample_time() {
        let (mut interp, tx) = battery();
        tx.send(Stamped::new(1.0, 12.0)).unwrap();
        assert_relative_eq!(interp.value_at(1.0, 0.1).unwrap(), 12.0);
    }

    #[test]
    fn test_holds_newest_while_fresh() {
        let (mut interp, tx) = battery();
        tx.send(Stamped::new(1.0, 12.0)).unwrap();

        assert_relative_eq!(interp.value_at(1.2, 0.5).unwrap(), 12.0);
        let stale = interp.value_at(2.0, 0.5);
        assert!(matches!(stale, Err(FlightError::StaleInput { feed: Feed::Battery, .. })));
    }

    #[test]
    fn test_wide_bracket_is_stale() {
        let (mut interp, tx) = battery();
        tx.send(Stamped::new(1.0, 12.0)).unwrap();
        tx.send(Stamped::new(3.0, 11.0)).unwrap();

        let result = interp.value_at(2.0, 0.5);
        assert!(matches!(result, Err(FlightError::StaleInput { .. })));
    }

    #[test]
    fn test_empty_or_before_first_is_unavailable() {
        let (mut interp, tx) = battery();
        assert_eq!(
            interp.value_at(0.0, 1.0),
            Err(FlightError::Unavailable { feed: Feed::Battery })
        );

        tx.send(Stamped::new(5.0, 12.0)).unwrap();
        assert_eq!(
            interp.value_at(4.0, 10.0),
            Err(FlightError::Unavailable { feed: Feed::Battery })
        );
    }

    #[test]
    fn test_wait_until_ready() {
        let (mut interp, tx) = battery();
        assert!(interp.wait_until_ready(Duration::from_millis(5)).is_err());

        tx.send(Stamped::new(0.0, 12.0)).unwrap();
        assert!(interp.wait_until_ready(Duration::from_millis(5)).is_ok());
        assert_eq!(interp.latest_time(), Some(0.0));
    }
}
