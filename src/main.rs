//! Skyscraper - Headless Entry Point
//!
//! Builds a demo tower, runs the application loop with the simulation and
//! draw drivers registered, and prints a summary once a queued quit event
//! stops the loop.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use skyscraper_core::app::{
    AppDelegate, Application, DrawDriver, EventSender, InvocationHandle, Ordering, Phase,
    QueuedEventPump, RunControl, RunSummary, SimulationDriver,
};
use skyscraper_core::core::config::{config, set_config, SimulationConfig};
use skyscraper_core::core::error::Result;
use skyscraper_core::core::types::Recti;
use skyscraper_core::items::descriptor::{
    descriptor_for_item_type, install_descriptors, DescriptorTable, ItemType,
};
use skyscraper_core::items::item::ItemState;
use skyscraper_core::tower::{Tower, TowerError};

/// Headless tower simulation
#[derive(Parser, Debug)]
#[command(name = "skyscraper")]
#[command(about = "Build a demo tower and run the simulation loop")]
struct Args {
    /// Floors above the lobby
    #[arg(long, default_value_t = 10)]
    floors: i32,

    /// Run loop iterations before quitting
    #[arg(long, default_value_t = 1800, value_parser = clap::value_parser!(u64).range(1..))]
    iterations: u64,

    /// Simulation config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Descriptor table (TOML) replacing the builtin one
    #[arg(long)]
    descriptors: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: String,

    /// Log filter, overrides RUST_LOG
    #[arg(long)]
    log: Option<String>,
}

/// JSON output structure
#[derive(Serialize)]
struct Report {
    run: RunSummary,
    ticks: u64,
    simulated_seconds: f64,
    days: u64,
    items: usize,
    operational: usize,
    under_construction: usize,
    sprites_last_frame: usize,
}

/// Sends the quit event at the start of the last iteration
struct DemoDelegate {
    sender: EventSender,
    iterations: u64,
}

impl AppDelegate for DemoDelegate {
    fn will_iterate_run_loop(&mut self, control: &mut RunControl) {
        if control.iteration() + 1 == self.iterations {
            self.sender.quit();
        }
    }

    fn iteration_failed(&mut self, control: &mut RunControl, phase: Phase, message: &str) {
        eprintln!("iteration {} ({}): {}", control.iteration(), phase, message);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("skyscraper_core=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(path) = &args.config {
        let loaded = SimulationConfig::load(path)?;
        if set_config(loaded).is_err() {
            tracing::warn!("Config already initialized, ignoring {}", path.display());
        }
    }
    if let Some(path) = &args.descriptors {
        let table = DescriptorTable::load(path)?;
        if install_descriptors(table).is_err() {
            tracing::warn!("Descriptor table already installed, ignoring {}", path.display());
        }
    }

    let tower = Rc::new(RefCell::new(Tower::with_config(config())));
    let floors = args.floors.clamp(1, config().max_floor.max(1));
    build_demo_tower(&mut tower.borrow_mut(), floors)?;
    tracing::info!("Demo tower has {} items", tower.borrow().item_count());

    let pump = QueuedEventPump::new();
    let delegate = DemoDelegate {
        sender: pump.sender(),
        iterations: args.iterations,
    };
    let mut app = Application::with_delegate(Box::new(pump), Box::new(delegate));

    let simulation = Rc::new(RefCell::new(SimulationDriver::new(Rc::clone(&tower), config())));
    let draw = Rc::new(RefCell::new(DrawDriver::new(Rc::clone(&tower), None)));
    let draw_handle = InvocationHandle::from_shared(Rc::clone(&draw));
    app.add_invocation(draw_handle.clone())?;
    // Simulate before drawing within each iteration
    app.add_invocation_relative(
        InvocationHandle::from_shared(Rc::clone(&simulation)),
        Ordering::Before,
        &draw_handle,
    )?;

    let run = app.run()?;

    let tower = tower.borrow();
    let simulation = simulation.borrow();
    let report = Report {
        run,
        ticks: simulation.ticks(),
        simulated_seconds: simulation.elapsed(),
        days: tower.day(),
        items: tower.item_count(),
        operational: tower.items().filter(|i| i.state() == ItemState::Operational).count(),
        under_construction: tower.items().filter(|i| i.is_under_construction()).count(),
        sprites_last_frame: draw.borrow().last_frame().len(),
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("=== SKYSCRAPER ===");
        println!("Iterations:          {}", report.run.iterations);
        println!("Contained failures:  {}", report.run.contained_failures);
        println!("Ticks:               {}", report.ticks);
        println!("Simulated time:      {:.1}s", report.simulated_seconds);
        println!("Days:                {}", report.days);
        println!(
            "Items:               {} ({} operational, {} under construction)",
            report.items, report.operational, report.under_construction
        );
        println!("Sprites last frame:  {}", report.sprites_last_frame);
    }

    Ok(())
}

/// Lay out `types` left to right on `floor` starting at `x`; returns the end x
fn fill_floor(
    tower: &mut Tower,
    floor: i32,
    mut x: i32,
    types: &[ItemType],
) -> std::result::Result<i32, TowerError> {
    for &item_type in types {
        let width = descriptor_for_item_type(item_type).map_or(1, |d| d.cells.x);
        tower.build(item_type, Recti::new(x, floor, width, 1))?;
        x += width;
    }
    Ok(x)
}

const TOWER_WIDTH: i32 = 60;
const STAIRS_X: i32 = 44;

/// Lobby, an elevator shaft, alternating office and hotel floors, stairs
/// between floor pairs and a housekeeping floor on top
fn build_demo_tower(tower: &mut Tower, floors: i32) -> std::result::Result<(), TowerError> {
    use ItemType as T;

    tower.build(T::Lobby, Recti::new(0, 0, TOWER_WIDTH, 1))?;
    let shaft_height = (floors + 1).clamp(2, 30);
    tower.build(T::StandardElevator, Recti::new(0, 0, 4, shaft_height))?;

    for floor in 1..=floors {
        let end = if floor == floors {
            fill_floor(tower, floor, 4, &[T::Housekeeping])?
        } else if floor % 2 == 1 {
            fill_floor(tower, floor, 4, &[T::Office, T::Office, T::Office, T::Office])?
        } else {
            fill_floor(tower, floor, 4, &[T::SingleRoom, T::SingleRoom, T::DoubleRoom, T::Suite])?
        };

        // Stairs join each odd floor to the one above it
        let has_stairs = floor % 2 == 1 && floor < floors;
        let under_stairs = floor % 2 == 0;
        let gap_end = if has_stairs || under_stairs { STAIRS_X } else { TOWER_WIDTH };
        if end < gap_end {
            tower.build(T::Floor, Recti::new(end, floor, gap_end - end, 1))?;
        }
        if has_stairs {
            tower.build(T::Stairs, Recti::new(STAIRS_X, floor, 8, 2))?;
        }
        if gap_end == STAIRS_X {
            tower.build(T::Floor, Recti::new(STAIRS_X + 8, floor, TOWER_WIDTH - STAIRS_X - 8, 1))?;
        }
    }
    Ok(())
}
