//! Composition and full-turn convergence over realistic activation maps.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use hyphae_core::{
    ConvergenceConfig, ConvergenceLoop, CouplingMatrix, EngineConfig, GateConfig, GateFilter,
    HyphaeEngine, LexicalActivationSource, NexusComposer, NexusConfig, SynonymNormalizer,
    SyntheticActivations, default_groups, default_lexicon,
};

const TEXT: &str = "I feel overwhelmed and scared, I can't breathe. \
It keeps happening again and I just want to feel safe here with someone I trust.";

fn bench_compose(c: &mut Criterion) {
    let composer = NexusComposer::new(
        NexusConfig::default(),
        SynonymNormalizer::from_groups(&default_groups()),
    );
    let coupling = CouplingMatrix::default_roster();
    let maps = default_lexicon().score(TEXT).into_activation_map();
    c.bench_function("compose_lexical", |b| {
        b.iter(|| composer.compose(black_box(&maps), &coupling))
    });
}

fn bench_convergence(c: &mut Criterion) {
    let composer = NexusComposer::new(
        NexusConfig::default(),
        SynonymNormalizer::from_groups(&default_groups()),
    );
    let gate = GateFilter::new(GateConfig::default());
    let lp = ConvergenceLoop::new(ConvergenceConfig::default());
    let coupling = CouplingMatrix::default_roster();
    let lexicon = default_lexicon();
    c.bench_function("converge_lexical", |b| {
        b.iter(|| {
            let mut source = LexicalActivationSource::new(&lexicon, black_box(TEXT));
            lp.run(&mut source, &composer, &gate, &coupling)
        })
    });
}

fn bench_turn(c: &mut Criterion) {
    let mut engine = match HyphaeEngine::new(
        EngineConfig::default(),
        SynonymNormalizer::from_groups(&default_groups()),
        CouplingMatrix::default_roster(),
    ) {
        Ok(engine) => engine,
        Err(e) => panic!("default config rejected: {e}"),
    };
    let mut source = SyntheticActivations::new(42);
    c.bench_function("turn_synthetic", |b| {
        b.iter(|| {
            source.next_turn();
            engine.process_turn(&mut source)
        })
    });
}

criterion_group!(benches, bench_compose, bench_convergence, bench_turn);
criterion_main!(benches);
