//! Source distributions and code tables from text.
//!
//! Both the command line and the TOML file describe distributions and codes
//! as compact `symbol=value` lists:
//!
//! - distribution: `a=0.5,b=0.25,c=0.25`
//! - code table: `a=0,b=10,c=11` (codewords spelled in channel symbols)
//!
//! When no distribution is given, one is generated from the run seed so the
//! tool works with zero arguments.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// Split `s=value` items, rejecting empty input, missing `=`, multi-char
/// symbols and repeated symbols.
fn parse_pairs<'a>(what: &str, input: &'a str) -> Result<Vec<(char, &'a str)>, String> {
    let mut pairs = Vec::new();
    let mut seen = HashSet::new();

    for item in input.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let (symbol, value) = item
            .split_once('=')
            .ok_or_else(|| format!("{} entry '{}' must look like symbol=value", what, item))?;

        let mut chars = symbol.trim().chars();
        let symbol = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(format!(
                    "{} symbol '{}' must be a single character",
                    what,
                    symbol.trim()
                ))
            }
        };

        if !seen.insert(symbol) {
            return Err(format!("{} lists '{}' more than once", what, symbol));
        }
        pairs.push((symbol, value.trim()));
    }

    if pairs.is_empty() {
        return Err(format!("{} cannot be empty", what));
    }
    Ok(pairs)
}

/// Parse `a=0.5,b=0.5` into `(symbol, probability)` pairs, in order.
///
/// Only the syntax is checked here; normalisation is checked when the
/// sender is built.
pub fn parse_distribution(input: &str) -> Result<Vec<(char, f64)>, String> {
    parse_pairs("distribution", input)?
        .into_iter()
        .map(|(symbol, value)| {
            value
                .parse::<f64>()
                .map(|p| (symbol, p))
                .map_err(|_| format!("invalid probability '{}' for '{}'", value, symbol))
        })
        .collect()
}

/// Parse `a=0,b=10` into `(symbol, codeword)` pairs, in order.
pub fn parse_code_table(input: &str) -> Result<Vec<(char, Vec<char>)>, String> {
    parse_pairs("code table", input).map(|pairs| {
        pairs
            .into_iter()
            .map(|(symbol, codeword)| (symbol, codeword.chars().collect()))
            .collect()
    })
}

/// Parse a comma-separated list of messages, one character per symbol.
pub fn parse_messages(input: &str) -> Vec<Vec<char>> {
    input
        .split(',')
        .map(|m| m.trim().chars().collect())
        .collect()
}

/// Distinct symbols in order of first appearance.
pub fn alphabet_of<'a>(messages: impl IntoIterator<Item = &'a Vec<char>>) -> Vec<char> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .flatten()
        .copied()
        .filter(|c| seen.insert(*c))
        .collect()
}

/// Random distribution over the first `size` lowercase letters.
///
/// Weights are skewed (squared uniform draws) so generated sources are
/// compressible, and normalised to sum to 1.
pub fn random_distribution(seed: u64, size: usize) -> Vec<(char, f64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let size = size.clamp(1, 26);

    let weights: Vec<f64> = (0..size)
        .map(|_| {
            let r: f64 = rng.gen_range(0.05..1.0);
            r * r
        })
        .collect();
    let total: f64 = weights.iter().sum();

    ('a'..='z')
        .zip(weights)
        .map(|(symbol, w)| (symbol, w / total))
        .collect()
}

/// Render pairs back into the `symbol=value` form.
pub fn format_distribution(distribution: &[(char, f64)]) -> String {
    distribution
        .iter()
        .map(|(s, p)| format!("{}={:.4}", s, p))
        .collect::<Vec<_>>()
        .join(",")
}
