//! Workshop Simulation Runner
//!
//! Headless runner: builds the demo base, then lets workers pick up and carry
//! out designated upgrades, downgrades and quality work tick by tick.

use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use workshop_core::config::Tuning;
use workshop_core::events::EventLogger;
use workshop_core::systems::{build_schedule, ActiveOrders, DesignationRegistry, ResourceLedger};
use workshop_core::{create_workshop, init_world, SimWorld};

/// Command line arguments for the runner
#[derive(Parser, Debug)]
#[command(name = "workshop_sim")]
#[command(about = "Headless work-order lifecycle simulation")]
struct Args {
    /// Random seed for reproducibility (defaults to the tuning file's)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to simulate
    #[arg(long)]
    ticks: Option<u64>,

    /// Number of workers in the demo base
    #[arg(long)]
    workers: Option<usize>,

    /// Path to tuning.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the JSONL event log
    #[arg(long, default_value = "output/events.jsonl")]
    events_out: PathBuf,

    /// Write orders still running at the end as JSON
    #[arg(long)]
    save_orders: Option<PathBuf>,

    /// Interval between progress lines (in ticks)
    #[arg(long, default_value_t = 500)]
    report_interval: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let tuning = Tuning::load_or_default(args.config.as_deref());
    let seed = args.seed.unwrap_or(tuning.simulation.default_seed);
    let ticks = args.ticks.unwrap_or(tuning.simulation.default_ticks);
    let workers = args.workers.unwrap_or(tuning.simulation.workers);

    println!("Workshop Simulation");
    println!("===================");
    println!("Seed: {}", seed);
    println!("Ticks: {}", ticks);
    println!("Workers: {}", workers);
    println!();

    let logger = EventLogger::new(&args.events_out).unwrap_or_else(|e| {
        eprintln!(
            "Warning: Could not open {}: {}. Events will not be saved.",
            args.events_out.display(),
            e
        );
        EventLogger::null()
    });

    let workshop = create_workshop(workers);
    println!("  {} designations outstanding", workshop.designations.len());
    let mut world = init_world(workshop, tuning, seed, logger);
    let mut schedule = build_schedule();

    for tick in 1..=ticks {
        schedule.run(&mut world);

        if args.report_interval > 0 && tick % args.report_interval == 0 {
            let orders = world.resource::<ActiveOrders>();
            println!(
                "Tick {} / {}: {} running, {} completed, {} aborted",
                tick,
                ticks,
                orders.running_count(),
                orders.completed_count(),
                orders.aborted_count()
            );
        }

        let idle = world.resource::<ActiveOrders>().running_count() == 0
            && world.resource::<DesignationRegistry>().is_empty();
        if idle {
            println!("All designations finished at tick {}", tick);
            break;
        }
    }

    if let Err(e) = world.resource_mut::<EventLogger>().flush() {
        eprintln!("Warning: Could not flush event log: {}", e);
    }

    if let Some(path) = &args.save_orders {
        let snapshot = world.resource::<ActiveOrders>().snapshot();
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    eprintln!("Warning: Could not write {}: {}", path.display(), e);
                }
            }
            Err(e) => eprintln!("Warning: Could not serialize orders: {}", e),
        }
    }

    println!();
    let orders = world.resource::<ActiveOrders>();
    let ledger = world.resource::<ResourceLedger>();
    let sim = world.resource::<SimWorld>();
    println!("Simulation complete at tick {}.", sim.current_tick);
    println!("  Completed orders: {}", orders.completed_count());
    println!("  Aborted orders:   {}", orders.aborted_count());
    println!("  Denied attempts:  {}", orders.denied_count());
    println!("  Open reservations: {}", ledger.outstanding_reservations());
    let totals = ledger.totals();
    println!(
        "  Ledger: reserved {} released {} consumed {}",
        totals.reserved, totals.released, totals.consumed
    );
    let mut stock: BTreeMap<String, u32> = BTreeMap::new();
    for stack in ledger.stacks() {
        *stock.entry(stack.resource).or_default() += stack.quantity;
    }
    for (resource, quantity) in &stock {
        println!("    {:<10} {}", resource, quantity);
    }
    println!("  Events written: {}", world.resource::<EventLogger>().event_count());
}
