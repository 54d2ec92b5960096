use crate::Parameters;

pub fn parse_args<'a>(
    p: &'a mut Parameters,
    proportions: &'a mut Vec<f64>,
    mortalities: &'a mut Vec<f64>,
) -> argparse::ArgumentParser<'a> {
    let mut parser = argparse::ArgumentParser::new();
    parser.set_description("Run a metapopulation persistence sweep");
    parser.refer(&mut p.timesteps).add_option(
        &["--steps"],
        argparse::Store,
        "number of time steps per scenario",
    );
    parser.refer(&mut p.sample_stride).add_option(
        &["--sample-stride"],
        argparse::Store,
        "period of equilibrium sampling, in steps",
    );
    parser.refer(&mut p.log_every).add_option(
        &["--log-every"],
        argparse::Store,
        "period of progress logging, in steps (0 disables)",
    );
    parser.refer(&mut p.seed).add_option(
        &["--seed"],
        argparse::Store,
        "base seed; scenario generators are derived from it",
    );
    parser.refer(&mut p.remove_retention).add_option(
        &["--remove-retention"],
        argparse::StoreTrue,
        "zero the matrix diagonal, so no disperser settles in its source patch",
    );
    parser.refer(proportions).add_option(
        &["--proportion"],
        argparse::Collect,
        "dispersal proportion to sweep over, in (0, 1] (repeatable)",
    );
    parser.refer(mortalities).add_option(
        &["--mortality"],
        argparse::Collect,
        "mortality rate to sweep over, in [0, 1) (repeatable)",
    );
    parser
}
