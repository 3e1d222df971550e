use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hyphae_core::{
    ActivationMap, ActivationSource, HyphaeEngine, LexicalActivationSource, NexusType,
    PathwayCandidate, PathwaySignals, StaticActivations, SyntheticActivations, TurnOutcome,
    default_lexicon, healing_score, pathway, validate_activations,
};
use hyphae_store::HyphaeStore;
use serde_json::json;

#[derive(Parser)]
#[command(name = "hyphae", about = "DAE_HYPHAE nexus convergence engine maintenance CLI")]
struct Cli {
    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one turn over text scored by the built-in lexicon
    Turn {
        /// Input text
        text: String,

        /// Nexus type to evaluate pathways from (inferred when omitted)
        #[arg(long = "type")]
        nexus_type: Option<String>,
    },

    /// Run one turn over an activation map read from a JSON file
    Compose {
        /// File holding {"ORGAN": {"atom": activation, ...}, ...}
        path: PathBuf,

        /// Nexus type to evaluate pathways from (inferred when omitted)
        #[arg(long = "type")]
        nexus_type: Option<String>,
    },

    /// Print the coupling matrix
    Matrix {
        /// Number of strongest pairs to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Back up the coupling matrix and reset it to identity
    Reset,

    /// Run synthetic training turns
    Train {
        /// Number of turns
        #[arg(long, default_value_t = 100)]
        turns: u64,

        /// RNG seed (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show tracker and journal statistics
    Stats,

    /// Evaluate candidate transitions from a nexus type
    Pathways {
        /// Current nexus type
        #[arg(long = "type")]
        nexus_type: String,

        #[arg(long, default_value_t = 0.5)]
        energy: f64,

        #[arg(long, default_value_t = 0.5)]
        satisfaction: f64,

        #[arg(long, default_value_t = 0.5)]
        mutual: f64,

        #[arg(long, default_value_t = 0.5)]
        rhythm: f64,

        /// A relational field is available
        #[arg(long)]
        relational: bool,
    },
}

fn open_store() -> Result<HyphaeStore> {
    let base_dir = std::env::var("HYPHAE_DATA_DIR").ok().map(PathBuf::from);
    let store = HyphaeStore::open(base_dir.as_deref()).context("failed to open data directory")?;
    store
        .ensure_defaults()
        .context("failed to write default documents")?;
    Ok(store)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Turn { text, nexus_type } => cmd_turn(&cli, text, nexus_type.as_deref()),
        Commands::Compose { path, nexus_type } => cmd_compose(&cli, path, nexus_type.as_deref()),
        Commands::Matrix { top } => cmd_matrix(&cli, *top),
        Commands::Reset => cmd_reset(&cli),
        Commands::Train { turns, seed } => cmd_train(&cli, *turns, *seed),
        Commands::Stats => cmd_stats(&cli),
        Commands::Pathways {
            nexus_type,
            energy,
            satisfaction,
            mutual,
            rhythm,
            relational,
        } => {
            let signals = PathwaySignals {
                energy: *energy,
                satisfaction: *satisfaction,
                mutual_satisfaction: *mutual,
                rhythm_coherence: *rhythm,
                relational_field_available: *relational,
                ..PathwaySignals::default()
            };
            cmd_pathways(&cli, nexus_type, &signals)
        }
    }
}

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

fn cmd_turn(cli: &Cli, text: &str, nexus_type: Option<&str>) -> Result<()> {
    let mut source = LexicalActivationSource::new(&default_lexicon(), text);
    if cli.verbose {
        eprintln!("--- active organs: {} ---", source.active_organs().join(", "));
    }
    run_turn(cli, "lexical", &mut source, nexus_type)
}

fn cmd_compose(cli: &Cli, path: &Path, nexus_type: Option<&str>) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let maps: ActivationMap = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse activation map in {}", path.display()))?;
    validate_activations(&maps).context("invalid activation map")?;
    run_turn(cli, "file", &mut StaticActivations(maps), nexus_type)
}

fn run_turn(
    cli: &Cli,
    label: &str,
    source: &mut dyn ActivationSource,
    nexus_type: Option<&str>,
) -> Result<()> {
    let store = open_store()?;
    let mut engine = store.load_engine().context("failed to load engine")?;
    let outcome = engine.process_turn(source);

    // Persistence failures never lose the turn; the next checkpoint retries.
    match store
        .open_journal()
        .and_then(|journal| journal.record(&outcome, label))
    {
        Ok(id) => tracing::debug!(%id, "turn journaled"),
        Err(e) => tracing::warn!("failed to journal turn: {e}"),
    }
    if let Err(e) = store.checkpoint(&mut engine) {
        tracing::warn!("checkpoint failed, learned state kept in memory only: {e}");
    }

    let current = nexus_type
        .map(str::to_string)
        .unwrap_or_else(|| infer_type(&outcome).as_str().to_string());
    let candidates = pathway::evaluate(&current, &signals_for(&outcome));

    if cli.json {
        let doc = json!({
            "outcome": outcome,
            "nexus_type": current,
            "pathways": candidates,
            "healing_score": healing_score(&candidates),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    print_outcome(&outcome);
    print_pathways(&current, &candidates);
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    let trace = &outcome.trace;
    println!("turn:         {}", outcome.turn);
    println!("state:        {}", trace.state.as_str());
    match trace.target_cycle_index {
        Some(c) => println!("cycles:       {} (kairos at {c})", trace.cycle_count()),
        None => println!("cycles:       {}", trace.cycle_count()),
    }
    println!(
        "energy:       {:.3} -> {:.3}",
        trace.initial_energy, trace.final_energy
    );
    println!("coherence:    {:.3}", trace.final_coherence());
    println!("satisfaction: {:.3}", trace.final_satisfaction());
    if let Some(failure) = &trace.failure {
        println!("failure:      {failure}");
    }
    println!("nexuses:      {}", trace.nexuses.len());
    for n in &trace.nexuses {
        let organs: Vec<&str> = n.participants().iter().map(|p| p.organ.as_str()).collect();
        println!(
            "  {:<14} readiness={:.3} coherence={:.3} field={:.3} organs={}",
            n.atom(),
            n.emission_readiness(),
            n.coherence(),
            n.field_strength(),
            organs.join(",")
        );
    }
    match outcome.skipped {
        None => println!("learned:      {} coupling updates", outcome.updates.len()),
        Some(reason) => println!("learned:      no ({reason:?})"),
    }
}

fn print_pathways(current: &str, candidates: &[PathwayCandidate]) {
    println!("pathways from {current}:");
    if candidates.is_empty() {
        println!("  (none)");
    }
    for c in candidates {
        println!(
            "  {:<12} p={:.3} {} - {}",
            c.target,
            c.probability,
            c.mechanism.as_str(),
            c.description
        );
    }
    println!("healing:      {:.3}", healing_score(candidates));
}

/// Nexus type suggested by which organs carried the strongest nexus.
fn infer_type(outcome: &TurnOutcome) -> NexusType {
    let Some(best) = outcome.trace.best() else {
        return NexusType::Fragmented;
    };
    let has = |organ: &str| best.activation_of(organ).is_some();
    if has("NDAM") {
        NexusType::Urgency
    } else if has("SANS") {
        NexusType::Protective
    } else if has("RNX") {
        NexusType::Recursive
    } else if has("BOND") {
        NexusType::Relational
    } else {
        NexusType::Innate
    }
}

fn signals_for(outcome: &TurnOutcome) -> PathwaySignals {
    let trace = &outcome.trace;
    PathwaySignals {
        energy: trace.final_energy,
        satisfaction: trace.final_satisfaction(),
        mutual_satisfaction: trace.final_satisfaction(),
        rhythm_coherence: trace.final_coherence(),
        relational_field_available: outcome.organ_coherences.contains_key("BOND"),
        organ_insights: outcome.organ_coherences.clone().into_iter().collect(),
    }
}

// ---------------------------------------------------------------------------
// Matrix maintenance
// ---------------------------------------------------------------------------

fn cmd_matrix(cli: &Cli, top: usize) -> Result<()> {
    let store = open_store()?;
    let config = store.load_config();
    let matrix = store
        .coupling_store(&config)
        .load_or_identity()
        .context("failed to load coupling matrix")?;

    if cli.json {
        let doc = hyphae_core::CouplingDocument::from_matrix(
            &matrix,
            config.learning.learning_rate,
            hyphae_core::time::iso8601_now(),
        );
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    print!("{:>12}", "");
    for organ in matrix.organs() {
        print!(" {:>6}", abbreviate(organ));
    }
    println!();
    for (organ, row) in matrix.organs().iter().zip(matrix.values()) {
        print!("{organ:>12}");
        for v in row {
            print!(" {v:>6.3}");
        }
        println!();
    }
    println!("total_updates: {}", matrix.total_updates());

    let pairs: Vec<_> = matrix
        .strongest_pairs(top)
        .into_iter()
        .filter(|(_, _, v)| *v > 0.0)
        .collect();
    if !pairs.is_empty() {
        println!("strongest pairs:");
        for (a, b, v) in pairs {
            println!("  {a}-{b}: {v:.4}");
        }
    }
    Ok(())
}

fn abbreviate(organ: &str) -> &str {
    organ.get(..6).unwrap_or(organ)
}

fn cmd_reset(cli: &Cli) -> Result<()> {
    let store = open_store()?;
    let config = store.load_config();
    let coupling = store.coupling_store(&config);
    let mut matrix = coupling
        .load_or_identity()
        .context("failed to load coupling matrix")?;
    let backup = coupling
        .backup_and_reset(&mut matrix)
        .context("failed to reset coupling matrix")?;

    if cli.json {
        println!(
            "{}",
            json!({ "reset": true, "backup": backup.as_ref().map(|p| p.display().to_string()) })
        );
        return Ok(());
    }
    match backup {
        Some(path) => println!("backed up to {}", path.display()),
        None => println!("no coupling matrix on disk; nothing to back up"),
    }
    println!("coupling matrix reset to identity");
    Ok(())
}

// ---------------------------------------------------------------------------
// Training and statistics
// ---------------------------------------------------------------------------

fn cmd_train(cli: &Cli, turns: u64, seed: Option<u64>) -> Result<()> {
    let store = open_store()?;
    let mut engine = store.load_engine().context("failed to load engine")?;
    let seed = seed.unwrap_or_else(rand::random);
    let mut source = SyntheticActivations::new(seed);

    let mut learned = 0u64;
    let mut kairos = 0u64;
    for _ in 0..turns {
        let outcome = engine.process_turn(&mut source);
        record_training_feedback(&mut engine, &outcome);
        if outcome.learned() {
            learned += 1;
        }
        if outcome.trace.target_reached {
            kairos += 1;
        }
        source.next_turn();
        if engine.checkpoint_due()
            && let Err(e) = store.checkpoint(&mut engine)
        {
            tracing::warn!("periodic checkpoint failed: {e}");
        }
    }
    store
        .checkpoint(&mut engine)
        .context("failed to save trained state")?;

    let matrix = engine.coupling();
    if cli.json {
        let doc = json!({
            "seed": seed,
            "turns": turns,
            "learned": learned,
            "kairos": kairos,
            "total_updates": matrix.total_updates(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }
    println!("seed:          {seed}");
    println!("turns:         {turns}");
    println!("learned:       {learned}");
    println!("kairos:        {kairos}");
    println!("total_updates: {}", matrix.total_updates());
    if let Some((a, b, v)) = matrix.strongest_pairs(1).into_iter().next() {
        println!("strongest:     {a}-{b} {v:.4}");
    }
    Ok(())
}

/// Score the turn's top readiness as a prediction that Kairos would hold.
fn record_training_feedback(engine: &mut HyphaeEngine, outcome: &TurnOutcome) {
    let confidence = outcome
        .trace
        .best()
        .map(|n| n.emission_readiness())
        .unwrap_or(0.0);
    engine.record_feedback(confidence, outcome.trace.target_reached, Some("train"));
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let store = open_store()?;
    let engine = store.load_engine().context("failed to load engine")?;
    let journal = store
        .open_journal()
        .context("failed to open trace journal")?
        .summary()
        .context("failed to summarize trace journal")?;

    let cycles = engine.cycle_stats();
    let gates = engine.gate_stats();
    let decisions = engine.decisions();

    if cli.json {
        let doc = json!({
            "cycles": cycles.snapshot(),
            "gates": gates.snapshot(),
            "decisions": decisions.snapshot(),
            "journal": journal,
            "total_updates": engine.coupling().total_updates(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("data_dir:      {}", store.base_dir().display());
    println!("turns:         {}", cycles.turns());
    println!("target_rate:   {:.3}", cycles.target_rate());
    println!("gate_pass:     {:.3}", gates.overall_pass_rate());
    println!(
        "decisions:     {} (accuracy {:.3}, calibration error {:.3})",
        decisions.total(),
        decisions.accuracy(),
        decisions.calibration_error()
    );
    println!("total_updates: {}", engine.coupling().total_updates());
    println!(
        "journal:       {} turns, {} learned, kairos {:.3}, mean cycles {:.2}",
        journal.turns, journal.learned_turns, journal.kairos_rate, journal.mean_cycles
    );
    Ok(())
}

fn cmd_pathways(cli: &Cli, nexus_type: &str, signals: &PathwaySignals) -> Result<()> {
    let candidates = pathway::evaluate(nexus_type, signals);
    if cli.json {
        let doc = json!({
            "nexus_type": nexus_type,
            "pathways": candidates,
            "healing_score": healing_score(&candidates),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }
    print_pathways(nexus_type, &candidates);
    Ok(())
}
