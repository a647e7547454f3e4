use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use nodegraph_layout::{
    apply_positions, GraphModel, GridLayout, LayeredLayout, LayoutEngine, LayoutParameters,
    MultiscaleLayout, Point, RadialLayout, SimpleTreeLayout, Vec2,
};
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

mod shapes;

use shapes::Shape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    Layered,
    Force,
    Tree,
    Grid,
    Radial,
}

/// Lay out a synthetic graph and print the node positions
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Layout engine to run
    #[arg(short, long, value_enum, default_value_t = Engine::Layered)]
    engine: Engine,

    /// Graph family to generate
    #[arg(short, long, value_enum, default_value_t = Shape::Tree)]
    shape: Shape,

    /// Number of nodes
    #[arg(short, long, default_value_t = 12)]
    nodes: u32,

    /// Seed for random graphs and the force layout, overrides the parameter file
    #[arg(long)]
    seed: Option<u64>,

    /// RON file with layout parameters, missing fields keep their defaults
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Width and height of every node
    #[arg(long, num_args = 2, default_values_t = [60.0, 30.0])]
    size: Vec<f32>,
}

fn load_parameters(path: &Path) -> Result<LayoutParameters> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading parameters from {}", path.display()))?;
    ron::from_str(&text).with_context(|| format!("parsing parameters in {}", path.display()))
}

fn run<E>(engine: &E, graph: &GraphModel<u32>, size: Vec2) -> Result<BTreeMap<u32, Point>>
where
    E: LayoutEngine<u32>,
{
    let positions = engine
        .layout(graph, &|_node: u32| size)
        .context("computing layout")?;

    let mut placed = BTreeMap::new();
    let report = apply_positions(&positions, &mut |node: u32, point: Point| {
        placed.insert(node, point);
    });
    debug!("Applied {} positions, skipped {}", report.written, report.skipped);

    Ok(placed)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut params = match &args.params {
        Some(path) => load_parameters(path)?,
        None => LayoutParameters::default(),
    };
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    params.validate().context("validating parameters")?;

    let graph = args.shape.build(args.nodes, params.seed);
    info!(
        "Laying out {:?} graph with {} nodes and {} edges using {:?}",
        args.shape,
        graph.node_count(),
        graph.edge_count(),
        args.engine
    );

    let size = Vec2::new(args.size[0], args.size[1]);
    let placed = match args.engine {
        Engine::Layered => run(&LayeredLayout::new(params), &graph, size)?,
        Engine::Force => run(&MultiscaleLayout::new(params), &graph, size)?,
        Engine::Tree => run(&SimpleTreeLayout::new(params), &graph, size)?,
        Engine::Grid => run(&GridLayout::new(params), &graph, size)?,
        Engine::Radial => run(&RadialLayout::new(params), &graph, size)?,
    };

    for (node, point) in &placed {
        println!("{node}\t{:.2}\t{:.2}", point.x, point.y);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn every_engine_places_every_node() {
        let graph = Shape::Cycle.build(8, 0);
        let params = LayoutParameters::default().with_max_iterations_per_level(30);
        let size = Vec2::new(10.0, 10.0);

        let results = [
            run(&LayeredLayout::new(params.clone()), &graph, size).unwrap(),
            run(&MultiscaleLayout::new(params.clone()), &graph, size).unwrap(),
            run(&SimpleTreeLayout::new(params.clone()), &graph, size).unwrap(),
            run(&GridLayout::new(params.clone()), &graph, size).unwrap(),
            run(&RadialLayout::new(params), &graph, size).unwrap(),
        ];
        for placed in results {
            assert_eq!(placed.keys().copied().collect::<Vec<_>>(), (0..8).collect::<Vec<_>>());
        }
    }

    #[test]
    fn arguments_parse() {
        let args = Args::try_parse_from([
            "layout-demo",
            "--engine",
            "force",
            "--shape",
            "grid",
            "--nodes",
            "16",
            "--size",
            "20",
            "10",
        ])
        .unwrap();
        assert_eq!(args.engine, Engine::Force);
        assert_eq!(args.shape, Shape::Grid);
        assert_eq!(args.size, vec![20.0, 10.0]);
    }
}
