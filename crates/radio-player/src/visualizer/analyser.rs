//! Frequency analyser with the semantics of a browser `AnalyserNode`:
//! Blackman window, magnitude / N, exponential smoothing over time, then a
//! dB range mapped onto bytes.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    smoothing: f32,
    window: Vec<f32>,
    /// Most recent `fft_size` samples, oldest first.
    samples: VecDeque<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Analyser {
    /// `fft_size` is rounded up to a power of two, minimum 32.
    pub fn new(fft_size: usize, smoothing: f32) -> Self {
        let fft_size = fft_size.max(32).next_power_of_two();
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
        Self {
            fft,
            fft_size,
            smoothing: smoothing.clamp(0.0, 1.0),
            window: blackman(fft_size),
            samples: VecDeque::from(vec![0.0; fft_size]),
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Append PCM samples in [-1, 1]; only the newest `fft_size` are kept.
    pub fn push_samples(&mut self, pcm: &[f32]) {
        let skip = pcm.len().saturating_sub(self.fft_size);
        for &s in &pcm[skip..] {
            if self.samples.len() == self.fft_size {
                self.samples.pop_front();
            }
            self.samples.push_back(s);
        }
    }

    /// Run one analysis frame and return byte magnitudes, one per bin.
    pub fn byte_frequency_data(&mut self) -> Vec<u8> {
        for (i, (slot, &s)) in self.scratch.iter_mut().zip(self.samples.iter()).enumerate() {
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let n = self.fft_size as f32;
        let tau = self.smoothing;
        let range = MAX_DECIBELS - MIN_DECIBELS;
        self.smoothed
            .iter_mut()
            .zip(self.scratch.iter())
            .map(|(prev, bin)| {
                let mag = bin.norm() / n;
                let next = tau * *prev + (1.0 - tau) * mag;
                *prev = if next.is_finite() { next } else { 0.0 };
                let db = 20.0 * prev.log10();
                let scaled = (255.0 / range) * (db - MIN_DECIBELS);
                scaled.clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    /// `byte_frequency_data` scaled into [0, 1].
    pub fn normalized(&mut self) -> Vec<f32> {
        self.byte_frequency_data()
            .into_iter()
            .map(|b| b as f32 / 255.0)
            .collect()
    }

    /// Decay toward silence (used while no audio arrives).
    pub fn reset(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
    }
}

fn blackman(n: usize) -> Vec<f32> {
    let alpha = 0.16f32;
    let a0 = 0.5 * (1.0 - alpha);
    let a1 = 0.5;
    let a2 = 0.5 * alpha;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (2.0 * std::f32::consts::PI * x).cos()
                + a2 * (4.0 * std::f32::consts::PI * x).cos()
        })
        .collect()
}
