//! Activation sources feed the convergence loop one organ map per cycle.

use crate::error::Result;
use crate::nexus::SemanticNexus;
use crate::organ::ActivationMap;

/// What a source can see when asked for a cycle's activations.
#[derive(Debug, Clone, Copy)]
pub struct CycleContext<'a> {
    pub cycle: usize,
    pub energy: f64,
    /// Gated nexuses from the previous cycle (empty on cycle 0).
    pub previous: &'a [SemanticNexus],
}

pub trait ActivationSource {
    fn activations(&mut self, ctx: &CycleContext<'_>) -> Result<ActivationMap>;
}

impl<F> ActivationSource for F
where
    F: FnMut(&CycleContext<'_>) -> Result<ActivationMap>,
{
    fn activations(&mut self, ctx: &CycleContext<'_>) -> Result<ActivationMap> {
        self(ctx)
    }
}

/// The same activations every cycle.
#[derive(Debug, Clone, Default)]
pub struct StaticActivations(pub ActivationMap);

impl ActivationSource for StaticActivations {
    fn activations(&mut self, _ctx: &CycleContext<'_>) -> Result<ActivationMap> {
        Ok(self.0.clone())
    }
}
