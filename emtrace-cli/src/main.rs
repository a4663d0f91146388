mod argparse;

use anyhow::{Context, Result};
use clap::ArgMatches;

use emtrace_core::{Parameters, Session};

fn main() {
    let matches = argparse::parse_args();

    let spec = if matches.is_present("verbose") {
        "emtrace=debug,emtrace_core=debug"
    } else {
        "emtrace=info,emtrace_core=info"
    };
    flexi_logger::Logger::try_with_env_or_str(spec)
        .unwrap()
        .format(flexi_logger::opt_format)
        .start()
        .unwrap_or_else(|e| panic!("Failed to initialize logger: {}", e));

    if let Err(ref e) = run(&matches) {
        eprintln!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

fn parse_f64(matches: &ArgMatches<'_>, name: &str) -> Result<f64> {
    matches
        .value_of(name)
        .unwrap()
        .parse()
        .with_context(|| format!("--{} expects a number", name))
}

fn run(matches: &ArgMatches<'_>) -> Result<()> {
    let params = Parameters {
        permittivity: parse_f64(matches, "permittivity")?,
        conductivity: parse_f64(matches, "conductivity")?,
        max_reflections: matches
            .value_of("bounces")
            .unwrap()
            .parse()
            .context("--bounces expects a non-negative integer")?,
        ray_spacing: parse_f64(matches, "spacing")?,
        frequency: parse_f64(matches, "frequency")?,
        tx_power: parse_f64(matches, "power")?,
        rx_radius: parse_f64(matches, "rx-radius")?,
    };

    let mut session = Session::new();
    session.set_parameters(params)?;
    session.set_preprocess_method(matches.value_of("accelerator").unwrap().parse()?)?;
    session.set_transmitter(argparse::parse_point(matches.value_of("tx").unwrap())?)?;
    for rx in matches.values_of("rx").unwrap() {
        session.add_receiver(argparse::parse_point(rx)?)?;
    }

    let input = matches.value_of("INPUT").unwrap();
    let facets = session.add_stl_model(input)?;
    println!("{}: {} facets", input, facets);

    session.simulate()?;

    for (i, dbm) in session.rx_powers().iter().enumerate() {
        println!("rx {:>3}: {:>8.2} dBm", i, dbm);
    }
    Ok(())
}
