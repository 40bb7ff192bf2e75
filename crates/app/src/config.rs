//! Configuration for the codinglab application.
//!
//! Handles parsing command-line arguments, an optional TOML file, and
//! generating defaults (including randomized defaults that are reproducible
//! with a seed).
//!
//! Precedence, highest first: command-line flags, `--config` file, defaults.
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments, using intelligent defaults.
//! All defaults are printed so runs are reproducible.

use crate::distribution::{
    alphabet_of, format_distribution, parse_code_table, parse_distribution, parse_messages,
    random_distribution,
};
use codinglab_core::channel::NoiseConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Where messages come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Replay these messages in a cycle
    Fixed(Vec<Vec<char>>),
    /// Draw i.i.d. symbols; lengths uniform in `min_len..=max_len`
    Random {
        distribution: Vec<(char, f64)>,
        min_len: usize,
        max_len: usize,
    },
}

impl Source {
    /// Source alphabet, in declaration order.
    pub fn alphabet(&self) -> Vec<char> {
        match self {
            Source::Fixed(messages) => alphabet_of(messages),
            Source::Random { distribution, .. } => distribution.iter().map(|(s, _)| *s).collect(),
        }
    }
}

/// Raw settings as read from a TOML file or the command line.
///
/// Every field is optional; [`Settings::overlay`] merges two layers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub seed: Option<u64>,
    pub messages: Option<usize>,

    /// `a=0.5,b=0.5`
    pub distribution: Option<String>,
    /// Fixed messages to replay instead of random ones
    pub fixed: Option<Vec<String>>,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,

    /// `a=0,b=10`; a fixed-length code is built when absent
    pub code: Option<String>,
    pub channel_alphabet: Option<String>,

    pub noise: NoiseSettings,

    pub log_events: Option<bool>,
    pub event_detail: Option<bool>,
}

/// `[noise]` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseSettings {
    pub substitution_rate: Option<f64>,
    pub deletion_rate: Option<f64>,
    pub insertion_rate: Option<f64>,
    pub loss_rate: Option<f64>,
}

impl NoiseSettings {
    fn overlay(self, top: NoiseSettings) -> NoiseSettings {
        NoiseSettings {
            substitution_rate: top.substitution_rate.or(self.substitution_rate),
            deletion_rate: top.deletion_rate.or(self.deletion_rate),
            insertion_rate: top.insertion_rate.or(self.insertion_rate),
            loss_rate: top.loss_rate.or(self.loss_rate),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file {}: {}", path.display(), e))?;
        Self::from_toml_str(&text)
    }

    /// Merge `top` over `self`: values set in `top` win.
    pub fn overlay(self, top: Settings) -> Settings {
        Settings {
            seed: top.seed.or(self.seed),
            messages: top.messages.or(self.messages),
            distribution: top.distribution.or(self.distribution),
            fixed: top.fixed.or(self.fixed),
            min_len: top.min_len.or(self.min_len),
            max_len: top.max_len.or(self.max_len),
            code: top.code.or(self.code),
            channel_alphabet: top.channel_alphabet.or(self.channel_alphabet),
            noise: self.noise.overlay(top.noise),
            log_events: top.log_events.or(self.log_events),
            event_detail: top.event_detail.or(self.event_detail),
        }
    }
}

/// Complete configuration for an experiment run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Seed every default and every random component derives from
    pub seed: u64,

    /// Pipeline cycles to run
    pub num_messages: usize,

    pub source: Source,

    /// Explicit code table; `None` means a fixed-length code
    pub code_table: Option<Vec<(char, Vec<char>)>>,

    pub channel_alphabet: Vec<char>,

    pub noise: NoiseConfig,

    /// Render pipeline events through tracing
    pub log_events: bool,

    /// Include payloads in rendered events
    pub event_detail: bool,

    /// Whether to print detailed config
    pub print_config: bool,

    /// Print `key=value` stats instead of the summary
    pub export: bool,
}

/// What the command line asked for.
#[derive(Debug)]
pub enum Command {
    Run(Box<Config>),
    Help,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// If no arguments provided, generates randomized defaults using a time-based seed.
    /// If --seed is provided, uses that seed for all randomness (fully deterministic).
    pub fn from_args(args: &[String]) -> Result<Command, String> {
        let mut cli = Settings::default();
        let mut config_file: Option<PathBuf> = None;
        let mut print_config = false;
        let mut export = false;

        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            let mut value = || {
                i += 1;
                args.get(i).ok_or_else(|| format!("{} requires a value", flag))
            };

            match flag {
                "--config" => config_file = Some(PathBuf::from(value()?)),
                "--seed" => cli.seed = Some(value()?.parse().map_err(|_| "invalid seed")?),
                "--messages" | "-n" => {
                    cli.messages = Some(value()?.parse().map_err(|_| "invalid message count")?)
                }
                "--distribution" => cli.distribution = Some(value()?.clone()),
                "--fixed" => {
                    let messages = parse_messages(value()?);
                    cli.fixed = Some(messages.iter().map(|m| m.iter().collect()).collect());
                }
                "--min-len" => cli.min_len = Some(value()?.parse().map_err(|_| "invalid min-len")?),
                "--max-len" => cli.max_len = Some(value()?.parse().map_err(|_| "invalid max-len")?),
                "--code" => cli.code = Some(value()?.clone()),
                "--channel-alphabet" => cli.channel_alphabet = Some(value()?.clone()),
                "--substitution" => {
                    cli.noise.substitution_rate =
                        Some(value()?.parse().map_err(|_| "invalid substitution rate")?)
                }
                "--deletion" => {
                    cli.noise.deletion_rate = Some(value()?.parse().map_err(|_| "invalid deletion rate")?)
                }
                "--insertion" => {
                    cli.noise.insertion_rate =
                        Some(value()?.parse().map_err(|_| "invalid insertion rate")?)
                }
                "--loss" => cli.noise.loss_rate = Some(value()?.parse().map_err(|_| "invalid loss rate")?),
                "--no-noise" => {
                    cli.noise = NoiseSettings {
                        substitution_rate: Some(0.0),
                        deletion_rate: Some(0.0),
                        insertion_rate: Some(0.0),
                        loss_rate: Some(0.0),
                    }
                }
                "--log-events" => cli.log_events = Some(true),
                "--event-detail" => {
                    cli.log_events = Some(true);
                    cli.event_detail = Some(true);
                }
                "--print-config" => print_config = true,
                "--export" => export = true,
                "--help" | "-h" => return Ok(Command::Help),
                _ => return Err(format!("unknown argument: {}", flag)),
            }
            i += 1;
        }

        let settings = match config_file {
            Some(path) => Settings::from_file(&path)?.overlay(cli),
            None => cli,
        };

        let mut config = Self::resolve(settings)?;
        config.print_config = print_config;
        config.export = export;
        Ok(Command::Run(Box::new(config)))
    }

    /// Fill in every unset value, drawing random defaults from the seed.
    pub fn resolve(settings: Settings) -> Result<Self, String> {
        // Determine seed (explicit or time-based)
        let seed = settings.seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default()
        });

        // Generate defaults using seed
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let code_table = settings.code.as_deref().map(parse_code_table).transpose()?;

        let source = match settings.fixed {
            Some(fixed) => {
                let messages: Vec<Vec<char>> = fixed.iter().map(|m| m.chars().collect()).collect();
                if messages.is_empty() {
                    return Err("fixed message list cannot be empty".to_string());
                }
                Source::Fixed(messages)
            }
            None => {
                let distribution = match (&settings.distribution, &code_table) {
                    (Some(text), _) => parse_distribution(text)?,
                    // Uniform over the table's symbols
                    (None, Some(table)) => {
                        let p = 1.0 / table.len() as f64;
                        table.iter().map(|(s, _)| (*s, p)).collect()
                    }
                    (None, None) => random_distribution(seed, rng.gen_range(3..=8)),
                };
                let min_len = settings.min_len.unwrap_or_else(|| rng.gen_range(1..=5));
                let max_len = settings
                    .max_len
                    .unwrap_or_else(|| min_len + rng.gen_range(5..=20));
                if min_len > max_len {
                    return Err(format!("min-len {} exceeds max-len {}", min_len, max_len));
                }
                Source::Random {
                    distribution,
                    min_len,
                    max_len,
                }
            }
        };

        let channel_alphabet: Vec<char> = match (&settings.channel_alphabet, &code_table) {
            (Some(text), _) => text.chars().collect(),
            (None, Some(table)) => alphabet_of(table.iter().map(|(_, codeword)| codeword)),
            (None, None) => vec!['0', '1'],
        };

        let noise = NoiseConfig {
            substitution_rate: settings.noise.substitution_rate.unwrap_or_else(|| {
                // Bias toward small error rates
                let r: f64 = rng.gen();
                (r * r * 0.02).min(0.02)
            }),
            deletion_rate: settings.noise.deletion_rate.unwrap_or(0.0),
            insertion_rate: settings.noise.insertion_rate.unwrap_or(0.0),
            loss_rate: settings.noise.loss_rate.unwrap_or_else(|| {
                let r: f64 = rng.gen();
                (r * r * 0.05).min(0.05)
            }),
            seed,
        };
        noise.validate().map_err(|e| e.to_string())?;

        Ok(Config {
            seed,
            num_messages: settings.messages.unwrap_or(1000),
            source,
            code_table,
            channel_alphabet,
            noise,
            log_events: settings.log_events.unwrap_or(false),
            event_detail: settings.event_detail.unwrap_or(false),
            print_config: false,
            export: false,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        println!("Seed: {}", self.seed);
        println!("Messages: {}", self.num_messages);
        println!();
        println!("=== Source ===");
        match &self.source {
            Source::Fixed(messages) => {
                let rendered: Vec<String> = messages.iter().map(|m| m.iter().collect()).collect();
                println!("Fixed messages: {}", rendered.join(","));
            }
            Source::Random {
                distribution,
                min_len,
                max_len,
            } => {
                println!("Distribution: {}", format_distribution(distribution));
                println!("Message length: {}..={}", min_len, max_len);
            }
        }
        println!();
        println!("=== Code ===");
        match &self.code_table {
            Some(table) => {
                for (symbol, codeword) in table {
                    println!("  {} -> {}", symbol, codeword.iter().collect::<String>());
                }
            }
            None => println!("Fixed-length code"),
        }
        println!("Channel alphabet: {}", self.channel_alphabet.iter().collect::<String>());
        println!();
        println!("=== Channel ===");
        println!("Substitution rate: {:.2}%", self.noise.substitution_rate * 100.0);
        println!("Deletion rate: {:.2}%", self.noise.deletion_rate * 100.0);
        println!("Insertion rate: {:.2}%", self.noise.insertion_rate * 100.0);
        println!("Loss rate: {:.2}%", self.noise.loss_rate * 100.0);
        println!();
    }
}

pub fn print_help() {
    println!("codinglab: Prefix-code transmission experiments");
    println!();
    println!("USAGE:");
    println!("    codinglab [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <PATH>            TOML file; flags override its values");
    println!("    --seed <N>                 Random seed for determinism");
    println!("    --messages, -n <N>         Messages to send (default: 1000)");
    println!();
    println!("    --distribution <DIST>      Source distribution, e.g. a=0.5,b=0.25,c=0.25");
    println!("                               (default: random over 3-8 symbols)");
    println!("    --fixed <MSGS>             Replay fixed messages, e.g. abc,ab");
    println!("    --min-len <N>              Shortest random message (default: random 1-5)");
    println!("    --max-len <N>              Longest random message (default: random)");
    println!();
    println!("    --code <TABLE>             Code table, e.g. a=0,b=10,c=11");
    println!("                               (default: fixed-length code)");
    println!("    --channel-alphabet <SYMS>  Channel symbols, e.g. 01 (default: 01)");
    println!();
    println!("    --substitution <RATE>      Symbol substitution rate (default: random 0-0.02)");
    println!("    --deletion <RATE>          Symbol deletion rate (default: 0)");
    println!("    --insertion <RATE>         Symbol insertion rate (default: 0)");
    println!("    --loss <RATE>              Message loss rate (default: random 0-0.05)");
    println!("    --no-noise                 Noiseless channel");
    println!();
    println!("    --log-events               Log every pipeline event");
    println!("    --event-detail             Log events with their payloads");
    println!("    --print-config             Print resolved configuration");
    println!("    --export                   Print stats as key=value lines");
    println!("    --help, -h                 Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    codinglab                                        # Run with random defaults");
    println!("    codinglab --seed 42                              # Deterministic run");
    println!("    codinglab --distribution a=0.5,b=0.25,c=0.25 --code a=0,b=10,c=11 --no-noise");
    println!("    codinglab --config experiment.toml --loss 0.1    # File plus override");
    println!();
}
