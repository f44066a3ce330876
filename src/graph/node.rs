use crate::{matrix::Matrix, runtime::wave::WaveBank};

/// Context passed to processors on every call
///
/// Contains information about the sample being rendered:
/// - dt: seconds per sample (1 / sample rate)
/// - start_of_block: true for the first sample of a render call
/// - block_progress: position within the block, 0.0 at the start
/// - waves: wavetables loaded into the synth
pub struct ProcessCtx<'a> {
    pub dt: f32,
    pub start_of_block: bool,
    pub block_progress: f32,
    pub waves: &'a WaveBank,
}

impl<'a> ProcessCtx<'a> {
    pub fn new(dt: f32, waves: &'a WaveBank) -> Self {
        Self {
            dt,
            start_of_block: true,
            block_progress: 0.0,
            waves,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        1.0 / self.dt
    }
}

/// Per-voice state of one processor instance
///
/// Each Tone owns its own processors, so filter history, phases and delay
/// buffers are never shared between voices.
pub trait AudioProcessor: Send {
    /// Control-rate update, called on the first sample of every block with
    /// the same arguments as the following `update_sample`.
    ///
    /// Default implementation does nothing (pure audio-rate processors).
    fn update_control(&mut self, _args: &[Matrix], _ctx: &ProcessCtx) {
        // Default: do nothing
    }

    /// Produce this sample's value into `out`.
    fn update_sample(&mut self, args: &[Matrix], ctx: &ProcessCtx, out: &mut Matrix);
}

/// Allow boxed processors to be used as processors (for dynamic dispatch)
impl AudioProcessor for Box<dyn AudioProcessor> {
    fn update_control(&mut self, args: &[Matrix], ctx: &ProcessCtx) {
        (**self).update_control(args, ctx)
    }

    fn update_sample(&mut self, args: &[Matrix], ctx: &ProcessCtx, out: &mut Matrix) {
        (**self).update_sample(args, ctx, out)
    }
}
