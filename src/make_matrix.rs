use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;

use anyhow::Context;
use log::info;
use serde_derive::Serialize;

#[derive(Serialize)]
struct PatchRecord {
    id: u32,
    area: f64,
}

#[derive(Serialize)]
struct EdgeRecord {
    from: u32,
    to: u32,
    prob: f64,
}

#[derive(Serialize)]
struct InputFile {
    patches: Vec<PatchRecord>,
    variants: BTreeMap<String, Vec<EdgeRecord>>,
}

/// Generate a synthetic connectivity input: patches arranged in a ring,
/// each sending dispersers forward to its neighbor and optionally retaining
/// some locally. Useful for demos and for exercising the simulation binary
/// without real habitat data.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut patches: u32 = 3;
    let mut forward: f64 = 0.9;
    let mut retention: f64 = 0.0;
    let mut area: f64 = 200.0;
    let mut variant = "probavg_BASE".to_string();
    let mut out = "connectivity.json".to_string();
    {
        let mut parser = argparse::ArgumentParser::new();
        parser.set_description("Write a synthetic ring-topology connectivity file");
        parser.refer(&mut patches).add_option(
            &["--patches"],
            argparse::Store,
            "number of patches in the ring",
        );
        parser.refer(&mut forward).add_option(
            &["--forward"],
            argparse::Store,
            "probability of reaching the next patch in the ring",
        );
        parser.refer(&mut retention).add_option(
            &["--retention"],
            argparse::Store,
            "probability of settling back into the source patch",
        );
        parser.refer(&mut area).add_option(
            &["--area"],
            argparse::Store,
            "habitat area assigned to every patch",
        );
        parser.refer(&mut variant).add_option(
            &["--variant"],
            argparse::Store,
            "name of the matrix variant to write",
        );
        parser.refer(&mut out).add_option(
            &["--output"],
            argparse::Store,
            "file to write the connectivity input to",
        );
        parser.parse_args_or_exit();
    }

    let mut edges = Vec::new();
    for j in 0..patches {
        edges.push(EdgeRecord {
            from: j,
            to: (j + 1) % patches,
            prob: forward,
        });
        if retention > 0.0 {
            edges.push(EdgeRecord {
                from: j,
                to: j,
                prob: retention,
            });
        }
    }
    let mut variants = BTreeMap::new();
    variants.insert(variant, edges);
    let input = InputFile {
        patches: (0..patches).map(|id| PatchRecord { id, area }).collect(),
        variants,
    };

    let writer = BufWriter::new(File::create(&out).with_context(|| format!("creating {}", out))?);
    serde_json::to_writer_pretty(writer, &input)?;
    info!("wrote {} patches to {}", patches, out);
    Ok(())
}
