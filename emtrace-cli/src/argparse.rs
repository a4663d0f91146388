use anyhow::{bail, Context, Result};
use clap::{App, Arg, ArgMatches};

use emtrace_core::Point3;

pub fn parse_args<'a>() -> ArgMatches<'a> {
    App::new("emtrace")
        .version("0.1")
        .author("The emtrace developers")
        .about("Ray-launching radio propagation simulator")
        .arg(
            Arg::with_name("tx")
                .long("tx")
                .help("Transmitter position as x,y,z in metres")
                .default_value("0,0,0"),
        )
        .arg(
            Arg::with_name("rx")
                .long("rx")
                .help("Receiver position as x,y,z in metres (repeatable)")
                .multiple(true)
                .number_of_values(1)
                .required(true),
        )
        .arg(
            Arg::with_name("frequency")
                .long("frequency")
                .short("f")
                .help("Carrier frequency in MHz")
                .default_value("900"),
        )
        .arg(
            Arg::with_name("power")
                .long("power")
                .help("Transmit power in dBm")
                .default_value("0"),
        )
        .arg(
            Arg::with_name("spacing")
                .long("spacing")
                .help("Angular ray spacing in degrees")
                .default_value("1"),
        )
        .arg(
            Arg::with_name("bounces")
                .long("bounces")
                .short("b")
                .help("Maximum number of specular reflections")
                .default_value("3"),
        )
        .arg(
            Arg::with_name("permittivity")
                .long("permittivity")
                .help("Relative permittivity of all surfaces")
                .default_value("5.0"),
        )
        .arg(
            Arg::with_name("conductivity")
                .long("conductivity")
                .help("Surface conductivity in S/m")
                .default_value("0.01"),
        )
        .arg(
            Arg::with_name("rx-radius")
                .long("rx-radius")
                .help("Receiver capture sphere radius in metres")
                .default_value("1.0"),
        )
        .arg(
            Arg::with_name("accelerator")
                .long("accelerator")
                .short("a")
                .help("Intersection accelerator: kdtree, grid or linear")
                .default_value("kdtree"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .help("log debug information"),
        )
        .arg(
            Arg::with_name("INPUT")
                .required(true)
                .index(1)
                .help("Binary STL scene file"),
        )
        .get_matches()
}

pub fn parse_point(s: &str) -> Result<Point3> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        bail!("expected x,y,z but got '{}'", s);
    }
    let mut v = [0.0f64; 3];
    for (out, part) in v.iter_mut().zip(&parts) {
        *out = part
            .trim()
            .parse()
            .with_context(|| format!("bad coordinate '{}' in '{}'", part, s))?;
    }
    Ok(Point3::new(v[0], v[1], v[2]))
}
