//! codinglab: run prefix-code transmission experiments from the command line.
//!
//! Builds a code, a sender, a channel and a tracking receiver from the
//! resolved [`Config`], runs the requested number of messages and prints
//! the result.

mod config;
mod distribution;

use codinglab_core::builders::fixed_length;
use codinglab_core::channel::{Channel, NoiselessChannel, NoisyChannel};
use codinglab_core::code::{entropy, PrefixCode};
use codinglab_core::experiment::ExperimentRunner;
use codinglab_core::logger::{ConsoleLogger, Logger, NullLogger};
use codinglab_core::receiver::TrackingReceiver;
use codinglab_core::sender::{FixedSender, ProbabilisticSender, Sender};
use config::{Command, Config, Source};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            config::print_help();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("run with --help for usage");
            return ExitCode::from(2);
        }
    };

    if config.print_config {
        config.print();
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "experiment failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,codinglab::events=info"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn build_code(config: &Config) -> AppResult<PrefixCode<char, char>> {
    let source_alphabet = match &config.code_table {
        Some(table) => table.iter().map(|(s, _)| *s).collect(),
        None => config.source.alphabet(),
    };
    let channel_alphabet = config.channel_alphabet.clone();

    let code = match &config.code_table {
        Some(table) => PrefixCode::from_table(source_alphabet, channel_alphabet, table.clone())?,
        None => PrefixCode::new(source_alphabet, channel_alphabet, fixed_length())?,
    };
    Ok(code)
}

fn run(config: &Config) -> AppResult<()> {
    let code = Arc::new(build_code(config)?);
    tracing::info!(
        symbols = code.source_alphabet().len(),
        max_codeword_len = code.tree().max_depth(),
        "code ready"
    );

    match &config.source {
        Source::Fixed(messages) => {
            let sender = FixedSender::new(Arc::clone(&code), messages.clone())?;
            with_channel(config, &code, sender)
        }
        Source::Random {
            distribution,
            min_len,
            max_len,
        } => {
            let sender = ProbabilisticSender::new(
                Arc::clone(&code),
                distribution.clone(),
                *min_len..=*max_len,
                config.seed,
            )?;
            with_channel(config, &code, sender)
        }
    }
}

fn with_channel<Sn>(config: &Config, code: &Arc<PrefixCode<char, char>>, sender: Sn) -> AppResult<()>
where
    Sn: Sender<char, char>,
{
    if config.noise.is_perfect() {
        execute(config, code, sender, NoiselessChannel::new())
    } else {
        let channel = NoisyChannel::new(code.channel_alphabet().to_vec(), config.noise)?;
        execute(config, code, sender, channel)
    }
}

fn execute<Sn, Ch>(config: &Config, code: &Arc<PrefixCode<char, char>>, sender: Sn, channel: Ch) -> AppResult<()>
where
    Sn: Sender<char, char>,
    Ch: Channel<char>,
{
    let baseline = code.baseline_len().unwrap_or(1);
    let receiver = TrackingReceiver::with_baseline(Arc::clone(code), baseline);
    let logger: Box<dyn Logger> = if config.log_events {
        Box::new(ConsoleLogger::new(config.event_detail))
    } else {
        Box::new(NullLogger)
    };

    let mut runner = ExperimentRunner::new(sender, channel, receiver, logger);
    let result = runner.run::<char>(config.num_messages)?;

    if config.export {
        print!("{}", result.stats().export_text());
        return Ok(());
    }

    println!("{}", result);

    if let Source::Random { distribution, .. } = &config.source {
        let expected = code.expected_length(distribution)?;
        let h = entropy(distribution.iter().map(|(_, p)| *p));
        println!();
        println!("=== Code Efficiency ===");
        println!("Entropy: {:.4} bits/symbol", h);
        println!("Expected codeword length: {:.4}", expected);
        println!("Fixed-length baseline: {}", baseline);
    }

    Ok(())
}
