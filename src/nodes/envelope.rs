use crate::{
    dsp::envelope::{AdsrParams, Envelope},
    graph::node::{AudioProcessor, ProcessCtx},
    matrix::Matrix,
};

/// `envelope(gate, attack, decay, sustain, release) -> level`
///
/// Times are read at control rate. Wire `gate` to the voice gate and the
/// level into a `MarkAlive` node so the voice dies when the release ends.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeNode {
    env: Envelope,
}

impl AudioProcessor for EnvelopeNode {
    fn update_control(&mut self, args: &[Matrix], _ctx: &ProcessCtx) {
        self.env.set_params(AdsrParams::new(
            args[1].to_scalar(),
            args[2].to_scalar(),
            args[3].to_scalar(),
            args[4].to_scalar(),
        ));
    }

    #[inline]
    fn update_sample(&mut self, args: &[Matrix], ctx: &ProcessCtx, out: &mut Matrix) {
        let level = self.env.next_sample(args[0].to_scalar(), ctx.sample_rate());
        out.set_scalar(level);
    }
}
