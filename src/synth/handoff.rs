//! Lock-free parameter hand-off between a control thread and the render thread
//!
//! The control side pushes whole `ControlParameters` snapshots into a
//! single-producer/single-consumer ring buffer. The render side drains it at
//! the start of every block and keeps only the newest snapshot, so a block
//! never sees a half-written parameter set and neither side ever blocks.

use super::oscillator::PhaseDistortionOscillator;
use super::params::{ControlParameters, ParameterId};
use rtrb::{Consumer, Producer, PushError, RingBuffer};

/// Snapshots that can be queued before the render thread catches up
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Create a connected sender/receiver pair.
///
/// `initial` is what the sender reports as the last sent value until the
/// first update.
pub fn parameter_channel(
    capacity: usize,
    initial: ControlParameters,
) -> (ParameterSender, ParameterReceiver) {
    let (producer, consumer) = RingBuffer::new(capacity.max(1));
    (
        ParameterSender {
            producer,
            pending: None,
            last: initial,
        },
        ParameterReceiver { consumer },
    )
}

/// Control-thread end of the hand-off
pub struct ParameterSender {
    producer: Producer<ControlParameters>,
    /// Newest snapshot that did not fit in the queue
    pending: Option<ControlParameters>,
    last: ControlParameters,
}

impl ParameterSender {
    /// Send a full parameter set (clamped before it is queued).
    ///
    /// Returns false if the queue was full; the snapshot is then held back
    /// and retried by the next `send` or `flush`.
    pub fn send(&mut self, params: ControlParameters) -> bool {
        let params = params.clamped();
        self.last = params;
        // anything still pending is older than `params`
        self.pending = None;
        self.push(params)
    }

    /// Send all five controls at once
    pub fn set_parameters(
        &mut self,
        frequency: f64,
        amplitude: f64,
        phase_distortion: f64,
        detuning_offset: f64,
        detuning_multiplier: f64,
    ) -> bool {
        self.send(ControlParameters::new(
            frequency,
            amplitude,
            phase_distortion,
            detuning_offset,
            detuning_multiplier,
        ))
    }

    /// Change one control on top of the last value sent
    pub fn set(&mut self, id: ParameterId, value: f64) -> bool {
        self.send(self.last.with(id, value))
    }

    /// Retry a held-back snapshot. Returns true when nothing is left pending.
    pub fn flush(&mut self) -> bool {
        match self.pending.take() {
            Some(params) => self.push(params),
            None => true,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The last parameter set handed to `send`
    pub fn last(&self) -> ControlParameters {
        self.last
    }

    fn push(&mut self, params: ControlParameters) -> bool {
        match self.producer.push(params) {
            Ok(()) => true,
            Err(PushError::Full(params)) => {
                log::warn!("parameter queue full, holding update until the render thread drains it");
                self.pending = Some(params);
                false
            }
        }
    }
}

/// Render-thread end of the hand-off
pub struct ParameterReceiver {
    consumer: Consumer<ControlParameters>,
}

impl ParameterReceiver {
    /// Drain the queue and return the newest snapshot, if any arrived
    #[inline]
    pub fn latest(&mut self) -> Option<ControlParameters> {
        let mut latest = None;
        while let Ok(params) = self.consumer.pop() {
            latest = Some(params);
        }
        latest
    }

    /// Snapshots waiting to be read
    pub fn queued(&self) -> usize {
        self.consumer.slots()
    }
}

/// An oscillator owned by the render thread, fed by a `ParameterSender`
pub struct RealtimeOscillator {
    oscillator: PhaseDistortionOscillator,
    receiver: ParameterReceiver,
}

impl RealtimeOscillator {
    /// Split `oscillator` into a control handle and a render-side wrapper
    pub fn new(oscillator: PhaseDistortionOscillator, capacity: usize) -> (ParameterSender, Self) {
        let (sender, receiver) = parameter_channel(capacity, oscillator.parameters());
        (sender, Self { oscillator, receiver })
    }

    /// Apply the newest queued parameters, if any
    #[inline]
    pub fn sync(&mut self) {
        if let Some(params) = self.receiver.latest() {
            self.oscillator.apply(params);
        }
    }

    /// Pick up pending parameter changes, then fill `buffer`.
    ///
    /// Safe to call from an audio callback: no locks, no allocation.
    pub fn process(&mut self, buffer: &mut [f32]) {
        self.sync();
        self.oscillator.process(buffer);
    }

    pub fn oscillator(&self) -> &PhaseDistortionOscillator {
        &self.oscillator
    }

    pub fn oscillator_mut(&mut self) -> &mut PhaseDistortionOscillator {
        &mut self.oscillator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::Wavetable;
    use std::thread;

    fn oscillator() -> PhaseDistortionOscillator {
        let table = Wavetable::from_samples(vec![0.0, 1.0, 0.0, -1.0]).unwrap();
        PhaseDistortionOscillator::new(table, 4.0).unwrap()
    }

    #[test]
    fn test_receiver_keeps_newest() {
        let (mut tx, mut rx) = parameter_channel(8, ControlParameters::default());
        tx.set_parameters(100.0, 1.0, 0.0, 0.0, 1.0);
        tx.set_parameters(200.0, 1.0, 0.0, 0.0, 1.0);
        tx.set_parameters(300.0, 1.0, 0.0, 0.0, 1.0);

        assert_eq!(rx.queued(), 3);
        assert_eq!(rx.latest().unwrap().frequency, 300.0);
        assert_eq!(rx.latest(), None);
    }

    #[test]
    fn test_sender_clamps() {
        let (mut tx, mut rx) = parameter_channel(8, ControlParameters::default());
        tx.set_parameters(50_000.0, 1.0, 0.0, 0.0, 2.0);
        let params = rx.latest().unwrap();
        assert_eq!(params.frequency, 20_000.0);
        assert_eq!(params.detuning_multiplier, 1.11);
    }

    #[test]
    fn test_full_queue_holds_newest() {
        let (mut tx, mut rx) = parameter_channel(2, ControlParameters::default());
        assert!(tx.set(ParameterId::Frequency, 1.0));
        assert!(tx.set(ParameterId::Frequency, 2.0));
        assert!(!tx.set(ParameterId::Frequency, 3.0));
        assert!(!tx.set(ParameterId::Frequency, 4.0));
        assert!(tx.is_pending());

        assert_eq!(rx.latest().unwrap().frequency, 2.0);

        assert!(tx.flush());
        assert!(!tx.is_pending());
        assert_eq!(rx.latest().unwrap().frequency, 4.0);
    }

    #[test]
    fn test_set_builds_on_last() {
        let (mut tx, mut rx) = parameter_channel(8, ControlParameters::default());
        tx.set(ParameterId::Frequency, 220.0);
        tx.set(ParameterId::PhaseDistortion, -0.5);

        let params = rx.latest().unwrap();
        assert_eq!(params.frequency, 220.0);
        assert_eq!(params.phase_distortion, -0.5);
        assert_eq!(tx.last(), params);
    }

    #[test]
    fn test_realtime_oscillator_applies_on_process() {
        let (mut tx, mut rt) = RealtimeOscillator::new(oscillator(), 8);
        tx.set_parameters(1.0, 2.0, 0.0, 0.0, 1.0);
        assert_eq!(rt.oscillator().parameters().amplitude, 1.0);

        let mut buffer = [0.0f32; 4];
        rt.process(&mut buffer);
        assert_eq!(buffer, [0.0, 2.0, 0.0, -2.0]);
        assert_eq!(rt.oscillator().parameters().amplitude, 2.0);
    }

    #[test]
    fn test_updates_across_threads() {
        let mut osc = oscillator();
        osc.set_parameters(1.0, 0.0, 0.0, 0.0, 1.0);
        let (mut tx, mut rt) = RealtimeOscillator::new(osc, DEFAULT_QUEUE_CAPACITY);

        let control = thread::spawn(move || {
            for i in 1..=1000 {
                tx.set_parameters(1.0, i as f64 / 100.0, 0.0, 0.0, 1.0);
                while !tx.flush() {
                    thread::yield_now();
                }
            }
        });

        let mut buffer = [0.0f32; 16];
        loop {
            rt.process(&mut buffer);
            let params = rt.oscillator().parameters();
            // every snapshot is a complete one from the control thread
            assert_eq!(params.frequency, 1.0);
            if params.amplitude == 10.0 {
                break;
            }
            if control.is_finished() {
                rt.sync();
                assert_eq!(rt.oscillator().parameters().amplitude, 10.0);
                break;
            }
        }
        control.join().unwrap();
    }
}
