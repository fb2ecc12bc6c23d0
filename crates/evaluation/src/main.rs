use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use common::io::{read_classes, read_edge_list, read_metis, read_undirected_edge_list, GraphFileType};
use graph_symmetry::{SearchOptions, SearchStatus, Symmetries, SymmetryFinder, TimeLimit};
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::FmtSubscriber;

/// Computes generators and orbits of the automorphism group of a graph.
#[derive(Debug, Parser)]
struct Cli {
    #[arg(long)]
    input_type: GraphFileType,
    #[arg(long)]
    input: PathBuf,
    /// Read every line of an edge list as an undirected edge.
    #[arg(long)]
    undirected: bool,
    /// File with one class id per node. Nodes are only mapped within their class.
    #[arg(long)]
    classes: Option<PathBuf>,
    /// Wall-clock limit in seconds.
    #[arg(long)]
    time_limit: Option<f64>,
    /// Limit on the deterministic time, roughly in seconds.
    #[arg(long)]
    deterministic_limit: Option<f64>,
    #[arg(long)]
    minimize_support: bool,
    #[arg(long)]
    print_generators: bool,
    /// Write a JSON line with statistics to this file.
    #[arg(long)]
    stats: Option<PathBuf>,
    #[arg(long)]
    log_level: Option<Level>,
    #[arg(long)]
    log_json: bool,
}

fn status_name(status: SearchStatus) -> &'static str {
    match status {
        SearchStatus::Complete => "complete",
        SearchStatus::DeadlineExceeded => "deadline_exceeded",
    }
}

fn write_stats(
    stats: &Option<PathBuf>,
    input: &Path,
    finder: Option<&SymmetryFinder>,
    result: Option<(Duration, &Symmetries)>,
) -> Result<(), Box<dyn Error>> {
    let Some(stats) = stats else {
        return Ok(());
    };
    let mut out = BufWriter::new(File::create(stats)?);
    let input = input.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    let (n, m) = finder.map_or((0, 0), |finder| (finder.node_count(), finder.arc_count()));
    write!(out, "{{\"input\": \"{input}\", \"n\": {n}, \"m\": {m}, ")?;
    let Some((time, symmetries)) = result else {
        writeln!(out, "\"status\": \"unfinished\"}}")?;
        return Ok(());
    };
    let deterministic_time = finder.map_or(0.0, |finder| finder.time_limit().deterministic_time());
    write!(out, "\"time\": {}, \"deterministic_time\": {deterministic_time}, ", time.as_secs_f64())?;
    writeln!(
        out,
        "\"status\": \"{}\", \"generators\": {}, \"orbits\": {}, \"log10_group_size\": {}}}",
        status_name(symmetries.status),
        symmetries.generators.len(),
        symmetries.num_orbits(),
        symmetries.log10_group_size(),
    )?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    write_stats(&cli.stats, &cli.input, None, None)?;

    if let Some(level) = cli.log_level {
        let builder = FmtSubscriber::builder().with_max_level(level).with_span_events(FmtSpan::CLOSE);
        if cli.log_json {
            builder.json().finish().init();
        } else {
            builder.finish().init();
        }
    };

    let start = Instant::now();
    let mut finder = match (cli.input_type, cli.undirected) {
        (GraphFileType::Metis, _) => SymmetryFinder::new(&read_metis(&cli.input)?),
        (GraphFileType::EdgeList, false) => SymmetryFinder::new(&read_edge_list(&cli.input)?),
        (GraphFileType::EdgeList, true) => SymmetryFinder::new(&read_undirected_edge_list(&cli.input)?),
    };
    info!(n = finder.node_count(), m = finder.arc_count(), elapsed = ?start.elapsed(), "read graph");
    finder = finder.with_options(SearchOptions { minimize_support: cli.minimize_support });

    let classes = match &cli.classes {
        Some(path) => read_classes(path)?,
        None => vec![0; finder.node_count()],
    };

    let mut time_limit = match cli.time_limit {
        Some(seconds) => TimeLimit::new(Duration::try_from_secs_f64(seconds)?),
        None => TimeLimit::infinite(),
    };
    if let Some(limit) = cli.deterministic_limit {
        time_limit = time_limit.with_deterministic_limit(limit);
    }

    write_stats(&cli.stats, &cli.input, Some(&finder), None)?;
    let start = Instant::now();
    let symmetries = finder.find_symmetries(&classes, time_limit)?;
    let time = start.elapsed();

    if cli.print_generators {
        for generator in &symmetries.generators {
            println!("{generator}");
        }
    }
    let group_size = match symmetries.group_size() {
        Some(size) => size.to_string(),
        None => format!("10^{:.2}", symmetries.log10_group_size()),
    };
    println!(
        "nodes {}  arcs {}  generators {}  orbits {}  group size {}  status {}  time {} μs",
        finder.node_count(),
        finder.arc_count(),
        symmetries.generators.len(),
        symmetries.num_orbits(),
        group_size,
        status_name(symmetries.status),
        time.as_micros(),
    );

    write_stats(&cli.stats, &cli.input, Some(&finder), Some((time, &symmetries)))?;
    Ok(())
}
