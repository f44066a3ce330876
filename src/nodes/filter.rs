use crate::{
    dsp::filter::{FilterType, SvFilter, SvfCoefficients},
    graph::node::{AudioProcessor, ProcessCtx},
    matrix::Matrix,
};

/// `filter(signal [M, N], cutoff, resonance, mode) -> [M, N]`
///
/// One filter state per element, allocated when the voice is built.
/// Coefficients and mode are latched once per block.
#[derive(Debug, Clone)]
pub struct FilterNode {
    filters: Vec<SvFilter>,
    coefficients: SvfCoefficients,
    filter_type: FilterType,
}

impl FilterNode {
    pub fn new(elements: usize) -> Self {
        Self {
            filters: vec![SvFilter::new(); elements.max(1)],
            coefficients: SvfCoefficients::default(),
            filter_type: FilterType::LowPass,
        }
    }
}

impl AudioProcessor for FilterNode {
    fn update_control(&mut self, args: &[Matrix], ctx: &ProcessCtx) {
        self.coefficients =
            SvfCoefficients::new(args[1].to_scalar(), args[2].to_scalar(), ctx.sample_rate());
        self.filter_type = FilterType::from_selector(args[3].to_scalar());
    }

    #[inline]
    fn update_sample(&mut self, args: &[Matrix], _ctx: &ProcessCtx, out: &mut Matrix) {
        out.copy_from(&args[0]);
        let (filters, c, t) = (&mut self.filters, &self.coefficients, self.filter_type);
        for (v, f) in out.data_mut().iter_mut().zip(filters.iter_mut()) {
            *v = f.tick(*v, c, t);
        }
    }
}
