//! Headless renderer: trains on a built-in two-class point set and writes
//! the final canvas (boundary overlay plus markers) to a PNG.

use std::path::PathBuf;

use planefit::{AppConfig, Class, Point, RenderTarget, Session, logging};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

struct Options {
    config: Option<PathBuf>,
    out: PathBuf,
    epochs: Option<String>,
    seed: Option<u64>,
}

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        tracing::error!("{err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config = AppConfig::load(options.config.as_deref())?;
    if options.seed.is_some() {
        config.training.seed = options.seed;
    }

    let (width, height) = (config.canvas.width, config.canvas.height);
    let mut target = RenderTarget::new(width, height);
    let mut session = Session::new();
    let marker = config.marker_style();
    for point in demo_points(width, height, config.training.seed.unwrap_or(7)) {
        if session.active_class() != point.class {
            session.toggle_class();
        }
        session.place_point(point.x, point.y, &mut target, &marker);
    }

    let epochs = options.epochs.unwrap_or_default();
    let mut training = session.begin_training::<f32>(&epochs, &config)?;
    println!("{}", session.status());

    let style = config.boundary_style();
    let points = session.points().to_vec();
    let result = training.run_to_completion(&mut target, &points, &style, |progress| {
        session.record_progress(progress);
        if progress.epoch == progress.total_epochs || progress.epoch % 100 == 0 {
            println!("{} (loss {:.4})", session.status(), progress.loss);
        }
    });
    if let Err(err) = result {
        session.fail(&err);
        return Err(err.into());
    }
    session.finish_training();
    println!("{}", session.status());

    target.save_png(&options.out)?;
    println!("Wrote {}", options.out.display());
    Ok(())
}

/// Two noisy blobs: blue on the upper left, red on the lower right.
fn demo_points(width: u32, height: u32, seed: u64) -> Vec<Point> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let (w, h) = (width as f32, height as f32);
    let mut points = Vec::with_capacity(16);
    for (class, cx, cy) in [(Class::Blue, 0.3, 0.3), (Class::Red, 0.7, 0.7)] {
        for _ in 0..8 {
            let x = (cx + rng.random_range(-0.15f32..0.15)) * w;
            let y = (cy + rng.random_range(-0.15f32..0.15)) * h;
            points.push(Point::new(x, y, class));
        }
    }
    points
}

fn parse_args(args: Vec<String>) -> Result<Options, String> {
    let mut options = Options {
        config: None,
        out: PathBuf::from("boundary.png"),
        epochs: None,
        seed: None,
    };
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => options.config = Some(PathBuf::from(value(&mut iter, &arg)?)),
            "--out" => options.out = PathBuf::from(value(&mut iter, &arg)?),
            "--epochs" => options.epochs = Some(value(&mut iter, &arg)?),
            "--seed" => {
                let raw = value(&mut iter, &arg)?;
                let seed = raw
                    .parse()
                    .map_err(|_| format!("Invalid --seed value: {raw}"))?;
                options.seed = Some(seed);
            }
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => return Err(format!("Unknown argument: {other}\n{}", usage())),
        }
    }
    Ok(options)
}

fn value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    iter.next().ok_or_else(|| format!("Missing value for {flag}"))
}

fn usage() -> &'static str {
    "Usage: planefit [--config PATH] [--out PATH] [--epochs N] [--seed N]"
}
