//! Example: Jackknife and focus counts on a synthetic meta-analysis
//!
//! Usage:
//!   cargo run --release --example jackknife_report -- [--jobs N] [--out DIR] [--config FILE]
//!
//! Builds a small coordinate dataset, fits the reference density estimator,
//! treats its `stat` map as a corrected z map and runs the diagnostics workflow.

use meta_diagnostics::space::{Affine, Masker};
use meta_diagnostics::{
    run_diagnostics, Coordinate, Dataset, DiagnosticKind, Estimator, MkdaDensity, ResultTable,
    Study, WorkflowConfig,
};
use std::env;
use std::path::PathBuf;
use std::time::Instant;

const TARGET: &str = "z_desc-size_level-cluster_corr-FWE_method-montecarlo";

fn synthetic_dataset() -> Dataset {
    let affine = Affine::from_spacing_origin([2.0, 2.0, 2.0], [-20.0, -20.0, -20.0]);
    let foci = [
        ("smith2010", [-10.0, 0.0, 0.0]),
        ("smith2010", [10.0, 0.0, 0.0]),
        ("jones2012", [-10.0, 2.0, 0.0]),
        ("lee2015", [-8.0, 0.0, 2.0]),
        ("lee2015", [10.0, 2.0, 0.0]),
        ("kim2018", [12.0, 0.0, 0.0]),
    ];
    let mut studies: Vec<Study> = Vec::new();
    let mut coordinates = Vec::new();
    for (id, [x, y, z]) in foci {
        if !studies.iter().any(|s| s.id == id) {
            studies.push(Study::new(id));
        }
        coordinates.push(Coordinate::new(id, x, y, z));
    }
    Dataset::new(studies, coordinates, Masker::full([21, 21, 21], affine))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut config = WorkflowConfig {
        diagnostics: vec![DiagnosticKind::Jackknife, DiagnosticKind::FocusCounter],
        ..WorkflowConfig::default()
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--jobs" => {
                let n = args.next().ok_or("--jobs requires a value")?;
                config.n_cores = n.parse()?;
            }
            "--out" => {
                let dir = args.next().ok_or("--out requires a value")?;
                config.output_dir = Some(PathBuf::from(dir));
            }
            "--config" => {
                let path = args.next().ok_or("--config requires a value")?;
                config = WorkflowConfig::from_json_file(&PathBuf::from(path))?;
            }
            other => return Err(format!("Unknown argument: {}", other).into()),
        }
    }

    let start = Instant::now();
    let mut result = MkdaDensity::new(6.0).fit(&synthetic_dataset())?;
    let stat = result.get_map("stat")?.clone();
    result.add_map(TARGET, stat)?;

    run_diagnostics(&mut result, &config)?;

    println!("Diagnostics Results:");
    for (name, table) in &result.tables {
        println!("\n== {} ==", name);
        let mut out = Vec::new();
        table.write_tsv(&mut out)?;
        print!("{}", String::from_utf8_lossy(&out));
        if let ResultTable::Clusters(clusters) = table {
            println!("({} clusters)", clusters.len());
        }
    }
    println!(
        "\nProcessing time: {:.2} ms",
        start.elapsed().as_secs_f32() * 1000.0
    );

    Ok(())
}
