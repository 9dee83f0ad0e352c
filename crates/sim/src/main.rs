//! Headless driver for the ability runtime.
//!
//! Loads a RON runtime config, builds the demo arena and feeds the pacemaker
//! a fixed wall time per frame, then prints clocks, counters and the final
//! state digest.
//!
//! ```bash
//! RUST_LOG=runtime::pacemaker=debug cargo run -p ability-sim -- \
//!     --config crates/sim/data/demo.ron --frames 600
//! ```
mod demo;

use std::path::PathBuf;

use ability_core::env::EventKind;
use ability_runtime::{InstantTimer, RuntimeConfig};
use anyhow::{Context, Result};
use clap::Parser;

/// Run the demo ability scenario without a frontend
#[derive(Parser, Debug)]
#[command(name = "ability-sim", version, long_about = None)]
struct Args {
    /// Runtime config in RON; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Real frames to run
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Wall time credited to the pacemaker per frame, in microseconds
    #[arg(long = "frame-us", default_value_t = RuntimeConfig::DEFAULT_FIXED_TIMESTEP_US)]
    frame_us: u64,

    /// Entities in the arena
    #[arg(long, default_value_t = 16)]
    entities: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("loading runtime config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };

    let mut demo = demo::Demo::new(config, args.entities).context("building demo arena")?;
    tracing::info!(
        frames = args.frames,
        frame_us = args.frame_us,
        entities = args.entities,
        groups = ?demo.pacemaker.group_names().collect::<Vec<_>>(),
        "starting simulation"
    );

    let mut timer = InstantTimer::new();
    for _ in 0..args.frames {
        let report = demo
            .pacemaker
            .frame(&mut demo.sim, args.frame_us, &mut timer)?;
        if report.fused {
            tracing::warn!(tick = %demo.sim.now(), "pacemaker fused, stopping early");
            break;
        }
    }

    print_summary(&demo);
    Ok(())
}

fn print_summary(demo: &demo::Demo) {
    let sim = &demo.sim;
    let clock = sim.clock();
    let history = sim.history();
    let budget = sim.chain().budget();
    let stats = demo.pacemaker.stats();

    println!("clock");
    println!("  fixed_frame      {}", clock.fixed_frame());
    println!("  step             {}", clock.step());
    println!("pacemaker");
    println!("  frames           {}", stats.frames);
    println!("  ticks            {}", stats.ticks);
    println!("  slices           {}", stats.slices);
    println!("  yields           {}", stats.yields);
    println!("  budget_exhausted {}", stats.budget_exhausted);
    println!("  clamped_us       {}", stats.clamped_us);
    println!("  fused            {}", demo.pacemaker.is_fused());
    println!("events");
    println!("  total            {}", history.total());
    println!("  retained         {}", history.len());
    println!("  evicted          {}", history.evicted());
    println!(
        "  applied          {}",
        history.count_where(|kind| matches!(kind, EventKind::EffectApplied(_)))
    );
    println!(
        "  removed          {}",
        history.count_where(|kind| matches!(kind, EventKind::EffectRemoved(_)))
    );
    println!(
        "  attribute        {}",
        history.count_where(|kind| matches!(kind, EventKind::AttributeChanged { .. }))
    );
    println!("chain");
    println!("  committed        {}", budget.committed);
    println!("  rejected         {}", budget.rejected);
    println!("  fizzled          {}", budget.fizzled);
    println!("  negated          {}", budget.negated);
    println!("  orders_ignored   {}", budget.orders_ignored);
    println!("  dropped          {}", budget.dropped);
    println!("  prompts_dropped  {}", budget.prompts_dropped);
    println!("  windows          {}", budget.windows_opened);
    println!("  timeouts         {}", budget.timeouts);
    println!("  max_depth        {}", budget.max_depth_seen);
    println!("state");
    println!("  entities         {}", sim.world().len());
    println!("  digest           {}", hex::encode(sim.state_digest()));
}
