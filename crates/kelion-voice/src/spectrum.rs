//! Spectrum analyser
//!
//! Turns PCM windows into byte-scaled frequency magnitudes, the shape the
//! amplitude fallback expects from an audio source. Behaves like a
//! browser `AnalyserNode`: Blackman window, magnitudes averaged over time,
//! decibels in `[min_db, max_db]` mapped linearly onto `0..=255`.

use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};

/// Analyser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// FFT size; the analyser produces `fft_size / 2` bins
    pub fft_size: usize,
    /// Decibel value mapped to 0
    pub min_db: f32,
    /// Decibel value mapped to 255
    pub max_db: f32,
    /// Weight of the previous magnitude in the time average
    pub smoothing: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            min_db: -100.0,
            max_db: -30.0,
            smoothing: 0.8,
        }
    }
}

/// Windowed FFT magnitude analyser
pub struct SpectrumAnalyser {
    config: SpectrumConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buf: Vec<Complex32>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyser {
    pub fn new(config: SpectrumConfig) -> Self {
        let size = config.fft_size.max(2);
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);

        Self {
            window: blackman_window(size),
            buf: vec![Complex32::new(0.0, 0.0); size],
            smoothed: vec![0.0; size / 2],
            fft,
            config,
        }
    }

    /// Number of output bins
    pub fn bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Analyse the most recent `fft_size` samples of `samples` (zero-padded
    /// at the front when shorter) and write byte magnitudes into `out`.
    ///
    /// Only `min(out.len(), bin_count())` bins are written.
    pub fn process(&mut self, samples: &[f32], out: &mut [u8]) {
        let size = self.buf.len();
        let take = samples.len().min(size);
        let pad = size - take;
        let tail = &samples[samples.len() - take..];

        for (i, c) in self.buf.iter_mut().enumerate() {
            let s = if i < pad { 0.0 } else { tail[i - pad] };
            let s = if s.is_finite() { s } else { 0.0 };
            *c = Complex32::new(s * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buf);

        let k = self.config.smoothing.clamp(0.0, 1.0);
        let scale = 1.0 / size as f32;
        let range = (self.config.max_db - self.config.min_db).max(f32::EPSILON);

        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buf[bin].norm() * scale;
            *smoothed = k * *smoothed + (1.0 - k) * magnitude;

            if let Some(byte) = out.get_mut(bin) {
                let db = if *smoothed > 0.0 {
                    20.0 * smoothed.log10()
                } else {
                    f32::NEG_INFINITY
                };
                let scaled = 255.0 * (db - self.config.min_db) / range;
                *byte = scaled.clamp(0.0, 255.0) as u8;
            }
        }
    }

    /// Forget the time average
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|m| *m = 0.0);
    }
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new(SpectrumConfig::default())
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    let denom = n as f32;
    (0..n)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / denom;
            0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_bin: usize, size: usize, amplitude: f32) -> Vec<f32> {
        (0..size)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq_bin as f32 * i as f32 / size as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_silence_is_zero() {
        let mut analyser = SpectrumAnalyser::default();
        let mut out = vec![7u8; analyser.bin_count()];
        analyser.process(&vec![0.0; 256], &mut out);
        assert!(out.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_tone_peaks_at_its_bin() {
        let mut analyser = SpectrumAnalyser::new(SpectrumConfig {
            smoothing: 0.0,
            ..Default::default()
        });
        let mut out = vec![0u8; analyser.bin_count()];
        analyser.process(&sine(20, 256, 0.01), &mut out);

        let peak = out
            .iter()
            .enumerate()
            .max_by_key(|(_, b)| **b)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 20);
        assert!(out[20] > 150);
        assert!(out[100] < out[20]);
    }

    #[test]
    fn test_smoothing_ramps_up() {
        let mut analyser = SpectrumAnalyser::default();
        let tone = sine(10, 256, 0.05);
        let mut first = vec![0u8; analyser.bin_count()];
        let mut later = vec![0u8; analyser.bin_count()];

        analyser.process(&tone, &mut first);
        for _ in 0..20 {
            analyser.process(&tone, &mut later);
        }
        assert!(later[10] > first[10]);
    }

    #[test]
    fn test_short_input_and_small_output() {
        let mut analyser = SpectrumAnalyser::default();
        let mut out = vec![0u8; 8];
        analyser.process(&[0.5, -0.5, f32::NAN], &mut out);
        assert_eq!(out.len(), 8);
    }
}
