mod config;
mod edge_map;
mod visualisation;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use gradient_vector_flow::GvfSolver;
use std::path::PathBuf;
use visualisation::{FieldVisualiser, Palette};

/// Compute the gradient vector flow of a synthetic edge map.
#[derive(Parser, Debug)]
#[command(name = "gvf", version, about)]
struct Cli {
    /// TOML run configuration
    #[arg(long, default_value = "config/u_shape.toml")]
    config: PathBuf,

    /// Overrides `visualization.output_dir`
    #[arg(long)]
    output: Option<PathBuf>,

    /// Skip writing PNG heatmaps
    #[arg(long, default_value_t = false)]
    no_plot: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = Config::from_file(&cli.config)?;
    if let Some(dir) = cli.output {
        config.visualization.output_dir = dir;
    }
    config.print_summary();

    let edge_map = config.edge_map.build();
    let solver =
        GvfSolver::new(&edge_map, config.solver).context("Failed to set up the GVF solver")?;
    let result = solver.run().context("GVF relaxation failed")?;

    if result.converged {
        println!(
            "Converged after {} iterations (delta = {:.3e})",
            result.iterations, result.final_delta
        );
    } else {
        println!(
            "Stopped at the iteration budget ({}) without converging (delta = {:.3e}); \
             consider raising solver.max_iterations",
            result.iterations, result.final_delta
        );
    }

    if cli.no_plot {
        return Ok(());
    }

    let vis = &config.visualization;
    let visualiser = FieldVisualiser::new(&vis.output_dir, vis.image_width, vis.image_height)
        .with_context(|| format!("Failed to create '{}'", vis.output_dir.display()))?;

    let plots = [
        (edge_map, "edge_map", "Edge map", Palette::Sequential),
        (result.field.angles(), "angles", "GVF direction (rad)", Palette::Cyclic),
        (result.field.magnitude(), "magnitude", "GVF magnitude", Palette::Sequential),
    ];
    for (data, name, title, palette) in &plots {
        if let Err(e) = visualiser.plot_field(data, name, title, *palette) {
            log::warn!("Failed to plot {}: {}", name, e);
        }
    }

    println!("Heatmaps saved to {}", vis.output_dir.display());
    Ok(())
}
