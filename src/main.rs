use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::time::Instant;

use anyhow::Context;
use log::{info, warn};
use serde_derive::{Deserialize, Serialize};

use model::matrix::DispersalMatrix;
use model::patches::{population_from_area, Patches};
use model::sweep::{run_sweep, SweepResults};
use model::{ConfigError, Parameters, TimeStep};

/// Connectivity input: the patch table and, per naturalness variant, the
/// edge mapping `(source id, destination id) → probability`.
#[derive(Deserialize)]
struct InputFile {
    patches: Vec<PatchRecord>,
    variants: BTreeMap<String, Vec<EdgeRecord>>,
}

#[derive(Deserialize)]
struct PatchRecord {
    id: u32,
    #[serde(default)]
    area: Option<f64>,
    #[serde(default)]
    capacity: Option<f64>,
    #[serde(default)]
    population: Option<f64>,
}

#[derive(Deserialize)]
struct EdgeRecord {
    from: u32,
    to: u32,
    prob: f64,
}

#[derive(Serialize)]
struct ResultFile {
    timesteps: TimeStep,
    #[serde(flatten)]
    results: SweepResults,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut p = Parameters::default();
    let mut proportions: Vec<f64> = Vec::new();
    let mut mortalities: Vec<f64> = Vec::new();
    let mut input = "connectivity.json".to_string();
    let mut output = String::new();
    {
        let mut parser = model::argparse::parse_args(&mut p, &mut proportions, &mut mortalities);
        parser.refer(&mut input).add_option(
            &["--input"],
            argparse::Store,
            "connectivity input file (patch table and matrix variants)",
        );
        parser.refer(&mut output).add_option(
            &["--output"],
            argparse::Store,
            "result file; defaults to metapop_pers_<steps>.json",
        );
        parser.parse_args_or_exit();
    }
    if proportions.is_empty() {
        proportions = vec![0.1, 0.15, 0.2, 0.25, 0.3, 0.35, 0.4, 0.45, 0.5, 0.55, 0.6];
    }
    if mortalities.is_empty() {
        mortalities = vec![0.15];
    }

    let reader =
        BufReader::new(File::open(&input).with_context(|| format!("opening {}", input))?);
    let parsed: InputFile =
        serde_json::from_reader(reader).with_context(|| format!("parsing {}", input))?;

    let patches = build_patches(parsed.patches)?;
    let mut variants = Vec::new();
    for (name, edges) in &parsed.variants {
        match DispersalMatrix::from_edges(
            &patches.ids,
            edges.iter().map(|e| (e.from, e.to, e.prob)),
        ) {
            Ok(matrix) => variants.push((name.clone(), matrix)),
            Err(e) => warn!("dropping variant {}: {}", name, e),
        }
    }

    info!(
        "{} patches, {} matrix variants, {} dispersal proportions, {} mortality rates",
        patches.len(),
        variants.len(),
        proportions.len(),
        mortalities.len()
    );

    let begun = Instant::now();
    let results = run_sweep(&variants, &patches, &proportions, &mortalities, &p)?;
    info!("sweep finished in {:.1?}", begun.elapsed());

    let out_name = if output.is_empty() {
        format!("metapop_pers_{}.json", p.timesteps)
    } else {
        output
    };
    let writer =
        BufWriter::new(File::create(&out_name).with_context(|| format!("creating {}", out_name))?);
    serde_json::to_writer_pretty(
        writer,
        &ResultFile {
            timesteps: p.timesteps,
            results,
        },
    )?;
    info!("results written to {}", out_name);
    Ok(())
}

/**
Resolve the patch table. Explicit capacity/population win; where they are
missing and every record carries an area, both fall back to the
area-proportional seeding rule (with capacity equal to the seeded
population).
 */
fn build_patches(mut records: Vec<PatchRecord>) -> Result<Patches, ConfigError> {
    records.sort_by_key(|record| record.id);
    let derived = {
        let areas: Vec<f64> = records.iter().filter_map(|record| record.area).collect();
        if !records.is_empty() && areas.len() == records.len() {
            Some(population_from_area(&areas))
        } else {
            None
        }
    };
    let mut rows = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let fallback = derived.as_ref().map(|seeded| seeded[i]);
        let population = record
            .population
            .or(fallback)
            .ok_or(ConfigError::MissingInitialState { id: record.id })?;
        let capacity = record
            .capacity
            .or(fallback)
            .ok_or(ConfigError::MissingInitialState { id: record.id })?;
        rows.push((record.id, capacity, population));
    }
    Patches::new(rows)
}
