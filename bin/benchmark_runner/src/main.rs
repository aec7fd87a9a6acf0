use acquisition::{ReaderSource, Session};
use common::config::{load_config, SessionConfig};
use common::{FrameParser, SystemClock};
use criterion::{black_box, BatchSize, Criterion};
use std::env;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const CYCLE_RESULTS_FILE: &str = "session_cycles.csv";

fn synthetic_lines(config: &SessionConfig, samples: usize) -> Vec<u8> {
    let mut text = String::with_capacity(samples * config.sensors * 8);
    for i in 0..samples {
        let fields: Vec<String> = (0..config.sensors)
            .map(|k| format!("{:.1}", (i as f64 * 0.1 + k as f64).sin() * 50.0 + 50.0))
            .collect();
        text.push_str(&fields.join(&config.delimiter.to_string()));
        text.push_str("\r\n");
    }
    text.into_bytes()
}

/// Headless, in-memory copy of the configured session writing into `dir`.
fn offline_config(config: &SessionConfig, dir: PathBuf) -> SessionConfig {
    let mut config = config.clone();
    config.output_dir = dir;
    config.plot_data_while_running = false;
    config.cycle_stats_file = None;
    config
}

fn run_session(config: SessionConfig, lines: Vec<u8>) -> usize {
    let source = ReaderSource::new(Cursor::new(lines), "synthetic", Duration::ZERO);
    let session = Session::new(config, SystemClock).expect("Failed to start session");
    session.run_headless(source).expect("Session failed").samples
}

fn benchmark_parser(c: &mut Criterion, config: &SessionConfig) {
    let parser = FrameParser::new(config.delimiter, config.sensors);
    let lines = String::from_utf8(synthetic_lines(config, 1)).unwrap_or_default();
    let mut out = vec![0.0; config.sensors];
    c.bench_function("frame_parse", |b| {
        b.iter(|| parser.parse_into(black_box(&lines), &mut out).is_ok());
    });
}

fn benchmark_session(c: &mut Criterion, config: &SessionConfig) {
    let plan = config.validate().expect("Invalid config");
    let lines = synthetic_lines(config, plan.total_samples);

    // Fresh output directory per run.
    c.bench_function("headless_session", |b| {
        b.iter_batched(
            || {
                let dir = tempfile::tempdir().expect("Failed to create temp dir");
                let config = offline_config(config, dir.path().to_path_buf());
                (dir, config, lines.clone())
            },
            |(dir, config, lines)| (dir, black_box(run_session(config, lines))),
            BatchSize::PerIteration,
        );
    });
}

fn main() {
    print_banner();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: benchmark_runner <config_file> [parse|session|both] [--criterion]");
        eprintln!("Example: benchmark_runner configs/arduino_two_sensors.toml both");
        eprintln!("Example: benchmark_runner configs/arduino_two_sensors.toml session --criterion");
        std::process::exit(1);
    }

    let config_path = &args[1];
    let mode = args.get(2).map(|s| s.as_str()).unwrap_or("both");
    let use_criterion = args.contains(&"--criterion".to_string());

    let config = load_config(config_path).expect("Failed to load config");
    let plan = config.validate().expect("Invalid config");

    println!("Config: {}", config_path);
    println!("Sensors: {}", config.sensors);
    println!("Samples: {} in {} cycles of {}", plan.total_samples, plan.total_cycles, plan.batch_size);
    println!("========================================\n");

    if use_criterion {
        let mut criterion = Criterion::default()
            .sample_size(20)
            .measurement_time(Duration::from_secs(10));

        if mode == "parse" || mode == "both" {
            println!("Running frame parser benchmarks...");
            benchmark_parser(&mut criterion, &config);
        }
        if mode == "session" || mode == "both" {
            println!("\nRunning headless session benchmarks...");
            benchmark_session(&mut criterion, &config);
        }

        println!("\nCheck the target/criterion directory for detailed HTML reports.");
        return;
    }

    if mode == "parse" || mode == "both" {
        let parser = FrameParser::new(config.delimiter, config.sensors);
        let text = String::from_utf8(synthetic_lines(&config, plan.total_samples)).unwrap_or_default();
        let mut out = vec![0.0; config.sensors];
        let start = Instant::now();
        let parsed = text
            .lines()
            .filter(|line| parser.parse_into(line, &mut out).is_ok())
            .count();
        let elapsed = start.elapsed();
        println!(
            "Parsed {} frames in {:.3} ms ({:.0} frames/s)",
            parsed,
            elapsed.as_secs_f64() * 1e3,
            parsed as f64 / elapsed.as_secs_f64()
        );
    }

    if mode == "session" || mode == "both" {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut session_config = offline_config(&config, dir.path().to_path_buf());
        session_config.cycle_stats_file = Some(PathBuf::from(CYCLE_RESULTS_FILE));
        let lines = synthetic_lines(&config, plan.total_samples);

        let start = Instant::now();
        let samples = run_session(session_config, lines);
        let elapsed = start.elapsed();
        println!(
            "Session logged {} samples in {:.3} ms ({:.0} samples/s)",
            samples,
            elapsed.as_secs_f64() * 1e3,
            samples as f64 / elapsed.as_secs_f64()
        );
        println!("Cycle timings saved to {}", CYCLE_RESULTS_FILE);
    }
}

fn print_banner() {
    println!("========================================");
    println!("Serial Data Logger Benchmark");
    println!("========================================");
}
