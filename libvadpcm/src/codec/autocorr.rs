//! Per-frame autocorrelation
//!
//! Each frame's autocorrelation is a symmetric 3x3 matrix over the frame's
//! samples and the two samples before each of them. Only the upper triangle is
//! stored, with these indexes:
//!
//! ```text
//! [0 1 3]
//! [_ 2 4]
//! [_ _ 5]
//! ```

use crate::core::FRAME_SAMPLE_COUNT;
use crate::parallel;

/// Upper triangle of a frame's autocorrelation matrix
pub type Autocorr = [f32; 6];

/// Frames handed to one worker at a time
const FRAMES_PER_TASK: usize = 512;

const SAMPLE_SCALE: f32 = 1.0 / 32768.0;

/// Autocorrelation of one frame.
///
/// `history` holds the two samples before the frame, oldest first.
pub fn frame_autocorr(history: [i16; 2], frame: &[i16]) -> Autocorr {
    let mut x2 = history[0] as f32 * SAMPLE_SCALE;
    let mut x1 = history[1] as f32 * SAMPLE_SCALE;
    let mut m = [0.0f32; 6];
    for &sample in frame {
        let x0 = sample as f32 * SAMPLE_SCALE;
        m[0] += x0 * x0;
        m[1] += x1 * x0;
        m[2] += x1 * x1;
        m[3] += x2 * x0;
        m[4] += x2 * x1;
        m[5] += x2 * x2;
        x2 = x1;
        x1 = x0;
    }
    m
}

/// Autocorrelation for every whole frame in `samples`. Audio before the
/// start of the buffer counts as silence.
pub fn autocorr(samples: &[i16]) -> Vec<Autocorr> {
    let frame_count = samples.len() / FRAME_SAMPLE_COUNT;
    let task_count = frame_count.div_ceil(FRAMES_PER_TASK);

    let groups = parallel::map(task_count, |task| {
        let start = task * FRAMES_PER_TASK;
        let end = (start + FRAMES_PER_TASK).min(frame_count);
        (start..end)
            .map(|frame| {
                let pos = frame * FRAME_SAMPLE_COUNT;
                let history = [
                    history_sample(samples, pos, 2),
                    history_sample(samples, pos, 1),
                ];
                frame_autocorr(history, &samples[pos..pos + FRAME_SAMPLE_COUNT])
            })
            .collect::<Vec<_>>()
    });

    groups.into_iter().flatten().collect()
}

fn history_sample(samples: &[i16], pos: usize, back: usize) -> i16 {
    if pos >= back {
        samples[pos - back]
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence() {
        let corr = autocorr(&[0; 64]);
        assert_eq!(corr.len(), 4);
        assert!(corr.iter().all(|m| m.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn test_partial_frame_ignored() {
        let corr = autocorr(&[100; 40]);
        assert_eq!(corr.len(), 2);
    }

    #[test]
    fn test_history_carries_between_frames() {
        let samples: Vec<i16> = (0..32).map(|i| (i * 100) as i16).collect();
        let corr = autocorr(&samples);
        let second = frame_autocorr([samples[14], samples[15]], &samples[16..]);
        assert_eq!(corr[1], second);
    }

    #[test]
    fn test_large_input_matches_sequential() {
        let samples: Vec<i16> = (0..FRAME_SAMPLE_COUNT * FRAMES_PER_TASK * 3 + 16)
            .map(|i| ((i as f32 * 0.07).sin() * 12000.0) as i16)
            .collect();
        let corr = autocorr(&samples);
        let mut history = [0i16; 2];
        for (frame, chunk) in samples.chunks_exact(FRAME_SAMPLE_COUNT).enumerate() {
            assert_eq!(corr[frame], frame_autocorr(history, chunk));
            history = [chunk[14], chunk[15]];
        }
    }
}
