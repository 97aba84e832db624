use clap::{App, Arg, ArgMatches};
use image::png::PNGEncoder;
use image::ColorType;
use mandelgrid::{
    CancelSignal, Color, ColorRamp, ComplexPoint, FractalEngine, Keyframe, ProgressReport,
    RunSettings, StabilityTest,
};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Given a string and a separator, returns the two values
/// separated by the separator.
fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

/// A specific implementation of parse_pair using a comma and expecting
/// floating point numbers.
fn parse_complex(s: &str) -> Option<ComplexPoint<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(ComplexPoint::new(re, im)),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_number<T: FromStr>(s: &str, err: &str) -> Result<(), String> {
    match T::from_str(s) {
        Ok(_) => Ok(()),
        Err(_) => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const ORIGIN: &str = "origin";
const EXTENT: &str = "extent";
const ITERATIONS: &str = "iterations";
const THRESHOLD: &str = "threshold";
const VARIANT: &str = "variant";
const PRECISION: &str = "precision";
const HISTOGRAM: &str = "histogram";

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandel")
        .version("0.1.0")
        .about("Escape-time fractal renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output PNG file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(ORIGIN)
                .required(false)
                .long(ORIGIN)
                .takes_value(true)
                .default_value("-0.5,0.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse origin"))
                .help("Center of the rendered region on the complex plane"),
        )
        .arg(
            Arg::with_name(EXTENT)
                .required(false)
                .long(EXTENT)
                .takes_value(true)
                .default_value("3.5,2.5")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse extent"))
                .help("World-space width and height of the rendered region"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("1000")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Iteration budget per point"),
        )
        .arg(
            Arg::with_name(THRESHOLD)
                .required(false)
                .long(THRESHOLD)
                .short("t")
                .takes_value(true)
                .default_value("4.0")
                .validator(|s| validate_number::<f64>(&s, "Could not parse escape threshold"))
                .help("Iteration-break bound on the squared magnitude"),
        )
        .arg(
            Arg::with_name(VARIANT)
                .required(false)
                .long(VARIANT)
                .takes_value(true)
                .default_value("classic")
                .possible_values(&["classic", "distance", "cosine", "wrap", "highprec"])
                .help("Stability test variant"),
        )
        .arg(
            Arg::with_name(PRECISION)
                .required(false)
                .long(PRECISION)
                .takes_value(true)
                .default_value("128")
                .validator(move |s| {
                    validate_range(
                        &s,
                        4,
                        16384,
                        "Could not parse precision",
                        "Precision must be between 4 and 16384 bits",
                    )
                })
                .help("Bits of precision for the highprec variant"),
        )
        .arg(
            Arg::with_name(HISTOGRAM)
                .required(false)
                .long(HISTOGRAM)
                .help("Spread the color ramp by the escape-depth distribution"),
        )
        .get_matches()
}

fn variant_for(name: &str, precision: u32) -> StabilityTest {
    match name {
        "classic" => StabilityTest::Classic,
        "distance" => StabilityTest::DistanceEstimate,
        "cosine" => StabilityTest::CosineMap,
        "wrap" => StabilityTest::BoundedWrap,
        "highprec" => StabilityTest::HighPrecision { precision },
        other => unreachable!("clap admitted unknown variant {}", other),
    }
}

/// A serviceable default ramp running from deep blue through cream to
/// red, covering [0, 1] without gaps.
fn default_ramp() -> ColorRamp {
    ColorRamp::new(vec![
        Keyframe::new(0.0, 0.25, Color::rgb(0, 0, 51), Color::rgb(25, 51, 128)),
        Keyframe::new(0.25, 0.5, Color::rgb(25, 51, 128), Color::rgb(128, 204, 230)),
        Keyframe::new(0.5, 0.75, Color::rgb(128, 204, 230), Color::rgb(255, 230, 128)),
        Keyframe::new(0.75, 1.0, Color::rgb(255, 230, 128), Color::rgb(204, 51, 25)),
    ])
}

fn write_image(outfile: &str, pixels: &[u8], width: usize, height: usize) -> Result<(), std::io::Error> {
    let output = File::create(Path::new(outfile))?;
    let encoder = PNGEncoder::new(output);
    encoder.encode(pixels, width as u32, height as u32, ColorType::RGBA(8))?;
    Ok(())
}

fn run(matches: &ArgMatches<'_>) -> Result<(), failure::Error> {
    let (width, height) =
        parse_pair(matches.value_of(SIZE).unwrap(), 'x').expect("Error parsing image size");
    let origin = parse_complex(matches.value_of(ORIGIN).unwrap()).expect("Error parsing origin");
    let (fractal_width, fractal_height) =
        parse_pair(matches.value_of(EXTENT).unwrap(), ',').expect("Error parsing extent");
    let max_iterations =
        u32::from_str(matches.value_of(ITERATIONS).unwrap()).expect("Error parsing iterations");
    let threshold =
        f64::from_str(matches.value_of(THRESHOLD).unwrap()).expect("Error parsing threshold");
    let precision =
        u32::from_str(matches.value_of(PRECISION).unwrap()).expect("Error parsing precision");
    let variant = variant_for(matches.value_of(VARIANT).unwrap(), precision);
    let histogram = matches.is_present(HISTOGRAM);

    let settings = RunSettings {
        origin,
        fractal_width,
        fractal_height,
        step_width: width,
        step_height: height,
        max_iterations,
        escape_threshold: Some(threshold),
        histogram,
    };

    let mut engine = FractalEngine::new();
    engine.configure(settings);
    engine.build_grid()?;

    let printer = |report: &ProgressReport| {
        eprintln!(
            "{:6.1}s  {:>10} / {} units, near ({:.6}, {:.6})",
            report.elapsed_seconds,
            report.current_step,
            report.total_steps,
            report.current_position.re,
            report.current_position.im
        );
    };
    engine.evaluate(
        &variant,
        &CancelSignal::new(),
        Some(&printer),
        Duration::from_secs(1),
    )?;

    let buffer = engine.render(
        &default_ramp(),
        Color::BLACK,
        histogram,
        None,
        Duration::from_secs(1),
    )?;

    let outfile = matches.value_of(OUTPUT).unwrap();
    write_image(outfile, buffer.as_bytes(), buffer.width(), buffer.height())?;
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
