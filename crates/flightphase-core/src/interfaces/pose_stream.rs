//! Channel-backed pose stream
//!
//! A [`PosePublisher`] fans every pose out to each subscribed
//! [`PoseStream`]. Producers run on any thread; each stream is drained by
//! its single consumer at query time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::debug;

use super::PoseSource;
use crate::error::{Feed, FlightError};
use crate::types::PoseSample;

/// Default number of poses a stream keeps buffered
pub const DEFAULT_POSE_BUFFER: usize = 256;

/// Fan-out publisher of pose samples
#[derive(Debug, Clone, Default)]
pub struct PosePublisher {
    subscribers: Arc<Mutex<Vec<Sender<PoseSample>>>>,
}

impl PosePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream that receives every pose published from now on
    pub fn subscribe(&self) -> PoseStream {
        let (sender, receiver) = crossbeam_channel::unbounded::<PoseSample>();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        PoseStream::new(receiver, DEFAULT_POSE_BUFFER)
    }

    /// Send a pose to every live subscriber
    ///
    /// Subscribers whose stream was dropped are forgotten.
    pub fn publish(&self, pose: PoseSample) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sender| sender.send(pose.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Time-ordered pose buffer fed from a channel
#[derive(Debug)]
pub struct PoseStream {
    receiver: Receiver<PoseSample>,
    buffer: VecDeque<PoseSample>,
    capacity: usize,
}

impl PoseStream {
    pub fn new(receiver: Receiver<PoseSample>, capacity: usize) -> Self {
        Self {
            receiver,
            buffer: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Standalone stream and the sender that feeds it
    pub fn channel(capacity: usize) -> (Sender<PoseSample>, Self) {
        let (sender, receiver) = crossbeam_channel::unbounded::<PoseSample>();
        (sender, Self::new(receiver, capacity))
    }

    /// Number of buffered poses
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Newest buffered pose
    pub fn latest(&mut self) -> Option<&PoseSample> {
        self.drain();
        self.buffer.back()
    }

    fn drain(&mut self) {
        while let Ok(pose) = self.receiver.try_recv() {
            self.insert(pose);
        }
    }

    fn insert(&mut self, pose: PoseSample) {
        // Producers normally publish in order; late samples are slotted in
        let index = self.buffer.partition_point(|buffered| buffered.time <= pose.time);
        if index > 0 && self.buffer[index - 1].time == pose.time {
            self.buffer[index - 1] = pose;
        } else {
            self.buffer.insert(index, pose);
        }
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    fn find_at_or_after(&self, time: f64) -> Option<&PoseSample> {
        let index = self.buffer.partition_point(|buffered| buffered.time < time);
        self.buffer.get(index)
    }
}

impl PoseSource for PoseStream {
    fn pose_at_or_after(&mut self, time: f64, max_wait: Duration) -> Result<PoseSample, FlightError> {
        self.drain();
        // No deadline when `max_wait` runs past the clock's range
        let deadline = Instant::now().checked_add(max_wait);

        loop {
            if let Some(pose) = self.find_at_or_after(time) {
                return Ok(pose.clone());
            }

            let received = match deadline {
                Some(deadline) => self
                    .receiver
                    .recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => self.receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(pose) => self.insert(pose),
                Err(RecvTimeoutError::Timeout) => {
                    debug!("no pose at or after {time:.3} within {max_wait:?}");
                    return Err(FlightError::Unavailable { feed: Feed::Pose });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // Publisher gone; whatever is buffered is all there will be
                    return self
                        .find_at_or_after(time)
                        .cloned()
                        .ok_or(FlightError::Unavailable { feed: Feed::Pose });
                }
            }
        }
    }
}
