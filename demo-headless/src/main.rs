use clap::Parser;
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stable_fluids_core::{
    BackendPreference, FluidSimulation, Input, QualityPreset, SimulationParams,
};
use tracing_subscriber::EnvFilter;

/// Stable fluids demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "stable-fluids-demo")]
#[command(about = "Headless 2D stable fluids run with periodic field statistics", long_about = None)]
struct Args {
    /// Interior grid size N (overrides --quality)
    #[arg(short = 'n', long)]
    grid_size: Option<usize>,

    /// Quality preset (low, medium, high, ultra)
    #[arg(short, long, default_value = "medium")]
    quality: String,

    /// Number of ticks to run
    #[arg(short, long, default_value_t = 200)]
    steps: u64,

    /// Backend (auto, cpu, gpu)
    #[arg(short, long, default_value = "auto")]
    backend: String,

    /// Time step per tick
    #[arg(long, default_value_t = 0.1)]
    dt: f32,

    /// Velocity viscosity
    #[arg(long, default_value_t = 0.0)]
    visc: f32,

    /// Density diffusion rate
    #[arg(long, default_value_t = 0.0)]
    diff: f32,

    /// Relaxation sweeps per linear solve
    #[arg(long, default_value_t = 20)]
    iterations: u32,

    /// Random impulses injected per tick in addition to the central emitter
    #[arg(short = 'r', long, default_value_t = 0)]
    random_impulses: u32,

    /// Seed for the random impulses
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Ticks between reports
    #[arg(long, default_value_t = 20)]
    report_interval: u64,

    /// Stop injecting after this many ticks (0 = never)
    #[arg(long, default_value_t = 0)]
    emit_ticks: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    println!("=== Stable Fluids Demo ===\n");

    let quality = match args.quality.to_lowercase().as_str() {
        "low" => QualityPreset::Low,
        "high" => QualityPreset::High,
        "ultra" => QualityPreset::Ultra,
        "medium" => QualityPreset::Medium,
        other => {
            println!("Unknown quality '{}', using medium", other);
            QualityPreset::recommended()
        }
    };

    let backend = match args.backend.to_lowercase().as_str() {
        "cpu" => BackendPreference::Cpu,
        "gpu" => BackendPreference::Gpu,
        "auto" => BackendPreference::Auto,
        other => {
            println!("Unknown backend '{}', using auto", other);
            BackendPreference::Auto
        }
    };

    let mut params = SimulationParams::from_quality(quality)
        .with_dt(args.dt)
        .with_viscosity(args.visc)
        .with_diffusion(args.diff)
        .with_relaxation_iterations(args.iterations);
    if let Some(n) = args.grid_size {
        params = params.with_grid_size(n);
    }

    let mut sim = match FluidSimulation::new(params, backend) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("Failed to create simulation: {}", err);
            std::process::exit(1);
        }
    };

    let n = sim.dims().n();
    println!(
        "Grid: {}x{}, dt={}, visc={}, diff={}, sweeps={}, GPU={}\n",
        n,
        n,
        args.dt,
        args.visc,
        args.diff,
        args.iterations,
        sim.is_gpu_accelerated()
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let center = n / 2 + 1;
    let mut injected = 0.0_f64;

    println!(
        "{:>6} {:>8} {:>14} {:>14} {:>10} {:>12} {:>9}",
        "tick", "time", "total dye", "injected", "max |u|", "rms div", "step ms"
    );

    for tick in 0..args.steps {
        let emitting = args.emit_ticks == 0 || tick < args.emit_ticks;
        if emitting {
            // Rotating jet at the centre of the box
            let angle = tick as f32 * 0.05;
            let jet = Vector2::new(angle.cos(), angle.sin());
            if let Err(err) = sim
                .apply_input((center, center), Input::Density(1.0))
                .and_then(|()| sim.apply_input((center, center), Input::Force(jet)))
            {
                eprintln!("Input rejected: {}", err);
                break;
            }
            injected += f64::from(sim.params().source * sim.params().dt);

            for _ in 0..args.random_impulses {
                let cell = (rng.random_range(1..=n), rng.random_range(1..=n));
                let force = Vector2::new(
                    rng.random_range(-1.0_f32..=1.0),
                    rng.random_range(-1.0_f32..=1.0),
                );
                if let Err(err) = sim.apply_input(cell, Input::Force(force)) {
                    eprintln!("Input rejected: {}", err);
                }
            }
        }

        sim.step();

        if (tick + 1) % args.report_interval.max(1) == 0 || tick + 1 == args.steps {
            match sim.stats() {
                Ok(stats) => println!(
                    "{:>6} {:>8.2} {:>14.4} {:>14.4} {:>10.4} {:>12.3e} {:>9.2}",
                    sim.tick(),
                    sim.elapsed(),
                    stats.total_density,
                    injected,
                    stats.max_speed,
                    stats.rms_divergence,
                    sim.last_step_ms()
                ),
                Err(err) => {
                    eprintln!("Readback failed: {}", err);
                    break;
                }
            }
        }
    }

    println!("\nDone after {} ticks ({:.2}s simulated)", sim.tick(), sim.elapsed());
    sim.teardown();
}
