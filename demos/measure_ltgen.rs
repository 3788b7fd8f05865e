//! Measure a Log Template Generator Against Ground Truth
//!
//! The reference masks numbers, hex ids and IPv4 addresses; the candidate
//! only masks plain numbers, so it over-splits every template that carries
//! an address or an id.
//!
//! Run with: cargo run --example measure_ltgen [config.json] [input.log ...]
//!
//! Without input files a synthetic sshd-style log is generated. Set
//! `RUST_LOG=debug` for per-phase detail.

use anyhow::Context;
use ltgen_eval::config::EvalConfig;
use ltgen_eval::driver::{
    measure_time, ComparisonDriver, FileLineSource, LineSource, MemoryLineSource,
    TemplateGenerator, TemplateTable,
};
use ltgen_eval::logging::init_tracing;
use ltgen_eval::template::ClusterId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Whitespace tokenizer that replaces variable tokens with `**`.
struct Masking {
    hex_and_ip: bool,
    table: TemplateTable,
}

impl Masking {
    fn reference() -> Self {
        Self {
            hex_and_ip: true,
            table: TemplateTable::new(),
        }
    }

    fn candidate() -> Self {
        Self {
            hex_and_ip: false,
            table: TemplateTable::new(),
        }
    }

    fn is_variable(&self, token: &str) -> bool {
        if token.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
        if !self.hex_and_ip {
            return false;
        }
        let hex = token.len() >= 6 && token.chars().all(|c| c.is_ascii_hexdigit());
        let ipv4 = token.split('.').count() == 4
            && token.split('.').all(|p| !p.is_empty() && p.parse::<u8>().is_ok());
        hex || ipv4
    }
}

impl TemplateGenerator for Masking {
    fn generate_tpl(&mut self, line: &str) -> ltgen_eval::Result<Option<Vec<String>>> {
        // Continuation lines carry no message of their own
        if line.starts_with(char::is_whitespace) {
            return Ok(None);
        }
        let tokens = line
            .split_whitespace()
            .map(|t| if self.is_variable(t) { "**".to_string() } else { t.to_string() })
            .collect();
        Ok(Some(tokens))
    }

    fn match_table(&mut self, tokens: &[String]) -> ltgen_eval::Result<(ClusterId, bool)> {
        Ok(self.table.match_or_insert(tokens))
    }
}

/// Synthetic sshd-style log
fn synthetic_log(lines: usize) -> MemoryLineSource {
    let mut rng = StdRng::seed_from_u64(2024);
    let log = (0..lines).map(|_| {
        let ip = format!(
            "10.{}.{}.{}",
            rng.gen_range(0..4),
            rng.gen_range(0..255),
            rng.gen_range(1..255)
        );
        match rng.gen_range(0..5) {
            0 => format!("Accepted password for user {} from {ip}", rng.gen_range(1000..1010)),
            1 => format!("Failed password for user {} from {ip}", rng.gen_range(1000..1010)),
            2 => format!("session {:08x} opened", rng.gen::<u32>() | 0x1000_0000),
            3 => format!("Connection closed by {ip} port {}", rng.gen_range(1024..65535)),
            _ => "  continued from previous message".to_string(),
        }
    });
    MemoryLineSource::new(log)
}

fn evaluate<S: LineSource + Sync>(config: EvalConfig, source: S) -> anyhow::Result<()> {
    let n_trials_time = config.n_trials_time;
    let mut driver = ComparisonDriver::new(config, source);

    println!("=== Accuracy ({} trials) ===\n", driver.config().n_trials);
    let report = driver
        .run(Masking::reference(), |_| Ok(Masking::candidate()))
        .context("evaluation run failed")?;
    println!("{report}");

    println!("=== Generation time ({n_trials_time} trials) ===\n");
    let timing = measure_time(driver.source(), |_| Ok(Masking::candidate()), n_trials_time)
        .context("timing run failed")?;
    println!("{timing}");

    println!("Streams and counters are in {}", driver.layout().root().display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing("info")?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => EvalConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config {path}"))?,
        None => EvalConfig::builder().n_trials(4).n_trials_time(3).build()?,
    };

    let inputs: Vec<String> = args.collect();
    if inputs.is_empty() {
        evaluate(config, synthetic_log(5_000))
    } else {
        evaluate(config, FileLineSource::new(inputs))
    }
}
