//! Integration tests for the full coding pipeline.
//!
//! These tests verify end-to-end behavior: source -> encode -> channel ->
//! decode -> stats, with verification that decoded output matches what was
//! sent and that the counters stay consistent.

use codinglab_core::{
    builders::fixed_length,
    channel::{Channel, NoiseConfig, NoiselessChannel, NoisyChannel},
    code::{entropy, IdentityCode, PrefixCode},
    experiment::ExperimentRunner,
    logger::{EventKind, MemoryLogger, NullLogger, TableLogger},
    receiver::{Outcome, Receiver, TrackingReceiver},
    sender::{FixedSender, ProbabilisticSender, Sender},
    stats::TransmissionStats,
    tree::PrefixCodeTree,
    Decoder, Encoder, Error,
};
use std::sync::Arc;

/// Huffman-style code for A:0.5, B:0.25, C:0.125, D:0.125
fn skewed_code() -> PrefixCode<char, u8> {
    PrefixCode::from_table(
        vec!['A', 'B', 'C', 'D'],
        vec![0, 1],
        vec![
            ('A', vec![0]),
            ('B', vec![1, 0]),
            ('C', vec![1, 1, 0]),
            ('D', vec![1, 1, 1]),
        ],
    )
    .expect("valid code")
}

fn skewed_distribution() -> Vec<(char, f64)> {
    vec![('A', 0.5), ('B', 0.25), ('C', 0.125), ('D', 0.125)]
}

fn assert_consistent(stats: &TransmissionStats) {
    assert_eq!(
        stats.successful_messages + stats.failed_messages,
        stats.total_messages
    );
    assert_eq!(
        stats.failed_messages,
        stats.decode_errors + stats.lost_messages
    );
    assert!(stats.corrupted_messages <= stats.successful_messages);
}

/// Walk one message through each stage by hand.
#[test]
fn test_single_cycle_by_hand() {
    let code = skewed_code();
    let mut log = MemoryLogger::new();

    // Step 1: Generate and encode
    let mut sender = FixedSender::new(&code, vec![vec!['A', 'C', 'B']]).expect("sender");
    let (message, encoded) = sender.next(&mut log).expect("encode");
    assert_eq!(encoded, vec![0, 1, 1, 0, 1, 0]);

    // Step 2: Transmit
    let mut channel = NoiselessChannel::new();
    let output = channel
        .transmit(message.id(), &encoded, &mut log)
        .expect("noiseless channel never fails");

    // Step 3: Receive and decode
    let mut receiver = TrackingReceiver::with_baseline(&code, 2);
    let outcome: Outcome<char> = receiver.receive(message.id(), &output, &mut log);
    assert_eq!(outcome.message(), Some(&message));

    // Every stage logged, in pipeline order
    let kinds: Vec<_> = log.events().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::SourceGenerated,
            EventKind::Encoded,
            EventKind::Transmitted,
            EventKind::Received,
            EventKind::Decoded,
        ]
    );
}

/// Random messages through a perfect channel all come back intact.
#[test]
fn test_probabilistic_pipeline_no_noise() {
    let code = Arc::new(skewed_code());
    let sender = ProbabilisticSender::new(Arc::clone(&code), skewed_distribution(), 1..=20, 42)
        .expect("sender");
    let receiver = TrackingReceiver::with_baseline(Arc::clone(&code), 2);
    let mut runner = ExperimentRunner::new(sender, NoiselessChannel, receiver, TableLogger::new());

    let result = runner.run(200).expect("run");
    let stats = result.stats();

    assert_eq!(stats.total_messages, 200);
    assert_eq!(stats.successful_messages, 200);
    assert_eq!(stats.corrupted_messages, 0);
    assert_consistent(stats);

    // Dyadic distribution: the code meets the entropy bound of 1.75 bits,
    // so the observed average sits close to it
    let expected = code.expected_length(&skewed_distribution()).expect("known symbols");
    let h = entropy(skewed_distribution().into_iter().map(|(_, p)| p));
    assert!((expected - h).abs() < 1e-12);
    assert!((stats.average_code_len() - expected).abs() < 0.15);
    assert!(stats.compression_ratio() < 1.0);

    let table = runner.logger();
    assert_eq!(table.message_ids().count(), 200);
    assert_eq!(table.count_messages_with(EventKind::Decoded), 200);
}

/// Two runners with the same seeds produce identical results.
#[test]
fn test_deterministic_replay() {
    let code = skewed_code();

    let run_once = || {
        let sender =
            ProbabilisticSender::new(&code, skewed_distribution(), 3..=12, 2024).expect("sender");
        let config = NoiseConfig {
            substitution_rate: 0.05,
            deletion_rate: 0.01,
            insertion_rate: 0.01,
            loss_rate: 0.05,
            seed: 99,
        };
        let channel = NoisyChannel::new(vec![0u8, 1], config).expect("channel");
        let mut runner = ExperimentRunner::new(
            sender,
            channel,
            TrackingReceiver::new(&code),
            MemoryLogger::new(),
        );
        let result = runner.run(100).expect("run");
        let channel_stats = runner.channel().stats();
        (result.stats().clone(), channel_stats)
    };

    let (stats_a, channel_a) = run_once();
    let (stats_b, channel_b) = run_once();

    assert_eq!(stats_a.total_messages, stats_b.total_messages);
    assert_eq!(stats_a.successful_messages, stats_b.successful_messages);
    assert_eq!(stats_a.decode_errors, stats_b.decode_errors);
    assert_eq!(stats_a.lost_messages, stats_b.lost_messages);
    assert_eq!(stats_a.corrupted_messages, stats_b.corrupted_messages);
    assert_eq!(stats_a.total_channel_symbols, stats_b.total_channel_symbols);
    assert_eq!(channel_a, channel_b);
}

/// Noise causes decode failures and losses, but the run always completes.
#[test]
fn test_noisy_pipeline_completes() {
    let code = skewed_code();
    let sender = ProbabilisticSender::new(&code, skewed_distribution(), 5..=15, 7).expect("sender");
    let config = NoiseConfig {
        substitution_rate: 0.1,
        deletion_rate: 0.05,
        insertion_rate: 0.0,
        loss_rate: 0.1,
        seed: 8,
    };
    let channel = NoisyChannel::new(vec![0u8, 1], config).expect("channel");
    let mut runner = ExperimentRunner::new(sender, channel, TrackingReceiver::new(&code), MemoryLogger::new());

    let result = runner.run(300).expect("per-message failures never abort");
    let stats = result.stats();

    assert_eq!(stats.total_messages, 300);
    assert!(stats.lost_messages > 0);
    assert!(stats.failed_messages > 0);
    assert!(stats.successful_messages > 0);
    assert_consistent(stats);

    // Lost messages never reach the receiver
    let log = runner.logger();
    let received = log.of_kind(EventKind::Received).count() as u64;
    assert_eq!(received, stats.total_messages - stats.lost_messages);
    assert_eq!(runner.channel().stats().messages_lost, stats.lost_messages);
}

/// One undecodable message does not affect its neighbours.
#[test]
fn test_failure_isolation() {
    let code = skewed_code();
    let mut receiver: TrackingReceiver<char, _> = TrackingReceiver::new(&code);
    let mut log = MemoryLogger::new();

    let good = code.encode(&['B', 'A']).expect("encode");
    let inputs: Vec<Vec<u8>> = vec![good.clone(), vec![1, 1], good.clone(), vec![2], good];

    let outcomes: Vec<Outcome<char>> = inputs
        .iter()
        .enumerate()
        .map(|(id, input)| receiver.receive(id as u64, input, &mut log))
        .collect();

    let successes: Vec<bool> = outcomes.iter().map(|o| o.is_success()).collect();
    assert_eq!(successes, vec![true, false, true, false, true]);

    let stats = receiver.get_stats();
    assert_eq!(stats.successful_messages, 3);
    assert_eq!(stats.decode_errors, 2);
    assert_eq!(stats.total_source_symbols, 6);
    assert_eq!(log.of_kind(EventKind::Error).count(), 2);
}

/// Fixed-length baseline code has a compression ratio of exactly 1.
#[test]
fn test_fixed_length_baseline_ratio() {
    let code = PrefixCode::new(vec!['A', 'B', 'C', 'D', 'E'], vec![0u8, 1], fixed_length()).expect("code");
    let baseline = code.baseline_len().expect("binary channel");
    assert_eq!(baseline, 3);

    let sender = FixedSender::new(&code, vec![vec!['A', 'E', 'C'], vec!['D']]).expect("sender");
    let receiver = TrackingReceiver::with_baseline(&code, baseline);
    let mut runner = ExperimentRunner::new(sender, NoiselessChannel, receiver, NullLogger);

    let result = runner.run(10).expect("run");
    assert_eq!(result.stats().average_code_len(), 3.0);
    assert_eq!(result.stats().compression_ratio(), 1.0);
}

/// Identity code over a noisy channel: every delivered message decodes,
/// substitutions show up as corruption.
#[test]
fn test_identity_code_counts_corruption() {
    let code = IdentityCode::<u8>::new();
    let sender = FixedSender::new(code, vec![vec![0, 1, 0, 1, 1, 0, 0, 1]]).expect("sender");
    let channel = NoisyChannel::new(vec![0u8, 1], NoiseConfig::substitution(0.5, 3)).expect("channel");
    let mut runner = ExperimentRunner::new(sender, channel, TrackingReceiver::new(code), NullLogger);

    let result = runner.run(50).expect("run");
    let stats = result.stats();

    assert_eq!(stats.successful_messages, 50);
    assert!(stats.corrupted_messages > 40);
    assert_eq!(stats.compression_ratio(), 1.0);
}

/// Tree built by hand decodes a stream symbol by symbol.
#[test]
fn test_tree_streaming_decode() {
    let mut tree: PrefixCodeTree<&str, char> = PrefixCodeTree::new();
    tree.insert_code(&['a'], "one").expect("insert");
    tree.insert_code(&['b', 'a'], "two").expect("insert");
    tree.insert_code(&['b', 'b'], "three").expect("insert");

    let stream = ['b', 'b', 'a', 'b', 'a', 'b'];
    let mut steps = tree.decode_all(&stream);

    assert_eq!(steps.next(), Some(Ok(("three", 2))));
    assert_eq!(steps.next(), Some(Ok(("one", 3))));
    assert_eq!(steps.next(), Some(Ok(("two", 5))));
    assert!(matches!(steps.next(), Some(Err(_))));
    assert_eq!(steps.next(), None);
}

/// Configuration problems surface before any message flows.
#[test]
fn test_configuration_errors() {
    let code = skewed_code();

    let bad_probs = ProbabilisticSender::new(&code, vec![('A', 0.7), ('B', 0.7)], 1..=3, 0);
    assert!(matches!(bad_probs, Err(Error::InvalidConfiguration(_))));

    let bad_noise = NoisyChannel::new(
        vec![0u8, 1],
        NoiseConfig {
            loss_rate: -0.1,
            ..NoiseConfig::perfect(0)
        },
    );
    assert!(matches!(bad_noise, Err(Error::InvalidConfiguration(_))));

    let sender = FixedSender::new(&code, vec![vec!['A']]).expect("sender");
    let mut runner = ExperimentRunner::new(sender, NoiselessChannel, TrackingReceiver::new(&code), NullLogger);
    assert!(matches!(runner.run(0), Err(Error::InvalidConfiguration(_))));
}

/// Merging stats from independent runs adds their counters.
#[test]
fn test_merge_independent_runs() {
    let code = skewed_code();
    let mut total = TransmissionStats::with_baseline(2.0);

    for seed in 0..3 {
        let sender = ProbabilisticSender::new(&code, skewed_distribution(), 1..=5, seed).expect("sender");
        let mut runner = ExperimentRunner::new(
            sender,
            NoiselessChannel,
            TrackingReceiver::with_baseline(&code, 2),
            NullLogger,
        );
        let result = runner.run(20).expect("run");
        total.merge(result.stats());
    }

    assert_eq!(total.total_messages, 60);
    assert_eq!(total.successful_messages, 60);
    assert_consistent(&total);
    assert!(Decoder::decode(&code, &[0, 1, 0]).is_ok());
}
