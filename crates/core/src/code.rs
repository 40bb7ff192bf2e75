//! Encoder and decoder capabilities, and the prefix code built on them.
//!
//! A code is anything that is both an [`Encoder`] and a [`Decoder`]. The main
//! variant is [`PrefixCode`], which owns a [`PrefixCodeTree`] for decoding and a
//! [`CodeTable`] for encoding. How the tree is shaped is left to a
//! [`TreeBuilder`] supplied at construction (see [`crate::builders`]).

use crate::error::{Error, Result};
use crate::message::Symbol;
use crate::tree::PrefixCodeTree;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

/// Maps source symbols to channel-symbol sequences.
pub trait Encoder<S, C> {
    /// Encode a whole message.
    ///
    /// # Errors
    /// `UnknownSymbol` if a symbol is outside the source alphabet.
    fn encode(&self, message: &[S]) -> Result<Vec<C>>;

    /// Symbol → codeword mapping, if the code has an explicit one.
    fn code_table(&self) -> Option<&CodeTable<S, C>> {
        None
    }
}

/// Maps channel-symbol sequences back to source symbols.
pub trait Decoder<S, C> {
    /// Decode a whole message.
    ///
    /// # Errors
    /// `DecodeFailure` wrapping the step that could not be decoded.
    fn decode(&self, encoded: &[C]) -> Result<Vec<S>>;
}

/// Both capabilities together.
pub trait Code<S, C>: Encoder<S, C> + Decoder<S, C> {}

impl<S, C, T: Encoder<S, C> + Decoder<S, C> + ?Sized> Code<S, C> for T {}

impl<S, C, T: Encoder<S, C> + ?Sized> Encoder<S, C> for &T {
    fn encode(&self, message: &[S]) -> Result<Vec<C>> {
        (**self).encode(message)
    }

    fn code_table(&self) -> Option<&CodeTable<S, C>> {
        (**self).code_table()
    }
}

impl<S, C, T: Decoder<S, C> + ?Sized> Decoder<S, C> for &T {
    fn decode(&self, encoded: &[C]) -> Result<Vec<S>> {
        (**self).decode(encoded)
    }
}

impl<S, C, T: Encoder<S, C> + ?Sized> Encoder<S, C> for Arc<T> {
    fn encode(&self, message: &[S]) -> Result<Vec<C>> {
        (**self).encode(message)
    }

    fn code_table(&self) -> Option<&CodeTable<S, C>> {
        (**self).code_table()
    }
}

impl<S, C, T: Decoder<S, C> + ?Sized> Decoder<S, C> for Arc<T> {
    fn decode(&self, encoded: &[C]) -> Result<Vec<S>> {
        (**self).decode(encoded)
    }
}

impl<S, C, T: Encoder<S, C> + ?Sized> Encoder<S, C> for Rc<T> {
    fn encode(&self, message: &[S]) -> Result<Vec<C>> {
        (**self).encode(message)
    }

    fn code_table(&self) -> Option<&CodeTable<S, C>> {
        (**self).code_table()
    }
}

impl<S, C, T: Decoder<S, C> + ?Sized> Decoder<S, C> for Rc<T> {
    fn decode(&self, encoded: &[C]) -> Result<Vec<S>> {
        (**self).decode(encoded)
    }
}

/// Strategy that fills an empty tree with one codeword per source symbol.
///
/// Implementations must call [`PrefixCodeTree::insert_code`] exactly once for
/// every source symbol. [`PrefixCode::new`] checks this afterwards.
/// Plain functions and closures with the matching signature are builders.
pub trait TreeBuilder<S, C> {
    fn build(&self, source: &[S], channel: &[C], tree: &mut PrefixCodeTree<S, C>) -> Result<()>;
}

impl<S, C, F> TreeBuilder<S, C> for F
where
    F: Fn(&[S], &[C], &mut PrefixCodeTree<S, C>) -> Result<()>,
{
    fn build(&self, source: &[S], channel: &[C], tree: &mut PrefixCodeTree<S, C>) -> Result<()> {
        self(source, channel, tree)
    }
}

/// Symbol → codeword table, ordered like the source alphabet.
#[derive(Debug, Clone)]
pub struct CodeTable<S, C> {
    entries: Vec<(S, Vec<C>)>,
    index: HashMap<S, usize>,
}

impl<S: Symbol, C: Symbol> CodeTable<S, C> {
    fn new(entries: Vec<(S, Vec<C>)>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, (s, _))| (s.clone(), i))
            .collect();
        Self { entries, index }
    }

    /// Codeword for `symbol`, if it has one.
    pub fn get(&self, symbol: &S) -> Option<&[C]> {
        self.index
            .get(symbol)
            .map(|&i| self.entries[i].1.as_slice())
    }
}

impl<S, C> CodeTable<S, C> {
    pub fn iter(&self) -> impl Iterator<Item = (&S, &[C])> + '_ {
        self.entries.iter().map(|(s, c)| (s, c.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A prefix code: decoding through a tree, encoding through its table.
///
/// Built eagerly in [`PrefixCode::new`]; immutable afterwards.
#[derive(Debug, Clone)]
pub struct PrefixCode<S, C> {
    source_alphabet: Vec<S>,
    channel_alphabet: Vec<C>,
    tree: PrefixCodeTree<S, C>,
    table: CodeTable<S, C>,
}

impl<S: Symbol, C: Symbol> PrefixCode<S, C> {
    /// Build a code by running `builder` once over an empty tree.
    ///
    /// # Errors
    /// - Tree errors raised by the builder, unchanged
    /// - `InvalidConfiguration` if an alphabet is empty or has repeats, or
    ///   the finished tree does not assign exactly one codeword to every
    ///   source symbol using only channel symbols
    pub fn new<B>(source_alphabet: Vec<S>, channel_alphabet: Vec<C>, builder: B) -> Result<Self>
    where
        B: TreeBuilder<S, C>,
    {
        check_alphabet("source", &source_alphabet)?;
        check_alphabet("channel", &channel_alphabet)?;

        let mut tree = PrefixCodeTree::new();
        builder.build(&source_alphabet, &channel_alphabet, &mut tree)?;

        let table = Self::verified_table(&source_alphabet, &channel_alphabet, &tree)?;

        tracing::debug!(
            symbols = source_alphabet.len(),
            nodes = tree.node_count(),
            max_codeword_len = tree.max_depth(),
            "built prefix code"
        );

        Ok(Self {
            source_alphabet,
            channel_alphabet,
            tree,
            table,
        })
    }

    /// Build a code from an explicit symbol → codeword table.
    pub fn from_table<I>(source_alphabet: Vec<S>, channel_alphabet: Vec<C>, table: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<C>)>,
    {
        let builder = crate::builders::from_table(table);
        Self::new(source_alphabet, channel_alphabet, builder)
    }

    fn verified_table(source: &[S], channel: &[C], tree: &PrefixCodeTree<S, C>) -> Result<CodeTable<S, C>> {
        let known: HashSet<&S> = source.iter().collect();
        let mut assigned: HashMap<&S, Vec<C>> = HashMap::with_capacity(source.len());

        for (codeword, symbol) in tree.codewords() {
            if !known.contains(symbol) {
                return Err(Error::InvalidConfiguration(format!(
                    "codeword assigned to {:?}, which is not in the source alphabet",
                    symbol
                )));
            }
            if assigned.insert(symbol, codeword).is_some() {
                return Err(Error::InvalidConfiguration(format!(
                    "symbol {:?} has more than one codeword",
                    symbol
                )));
            }
        }

        if let Some(edge) = tree.edges().find(|e| !channel.contains(e.label)) {
            return Err(Error::InvalidConfiguration(format!(
                "edge label {:?} is not in the channel alphabet",
                edge.label
            )));
        }

        let mut entries = Vec::with_capacity(source.len());
        for symbol in source {
            let codeword = assigned.remove(symbol).ok_or_else(|| {
                Error::InvalidConfiguration(format!("no codeword for {:?}", symbol))
            })?;
            entries.push((symbol.clone(), codeword));
        }

        Ok(CodeTable::new(entries))
    }

    pub fn tree(&self) -> &PrefixCodeTree<S, C> {
        &self.tree
    }

    pub fn source_alphabet(&self) -> &[S] {
        &self.source_alphabet
    }

    pub fn channel_alphabet(&self) -> &[C] {
        &self.channel_alphabet
    }

    /// Codeword for a single symbol.
    pub fn codeword(&self, symbol: &S) -> Option<&[C]> {
        self.table.get(symbol)
    }

    /// Codeword length of a fixed-length code over the same alphabets.
    pub fn baseline_len(&self) -> Option<usize> {
        fixed_length_baseline(self.source_alphabet.len(), self.channel_alphabet.len())
    }

    /// Expected codeword length under a symbol distribution.
    ///
    /// # Errors
    /// `UnknownSymbol` (with the entry index) if a symbol has no codeword.
    pub fn expected_length(&self, probabilities: &[(S, f64)]) -> Result<f64> {
        let mut expected = 0.0;
        for (position, (symbol, p)) in probabilities.iter().enumerate() {
            let codeword = self
                .table
                .get(symbol)
                .ok_or(Error::UnknownSymbol { position })?;
            expected += p * codeword.len() as f64;
        }
        Ok(expected)
    }
}

impl<S: Symbol, C: Symbol> Encoder<S, C> for PrefixCode<S, C> {
    fn encode(&self, message: &[S]) -> Result<Vec<C>> {
        let mut encoded = Vec::new();
        for (position, symbol) in message.iter().enumerate() {
            let codeword = self
                .table
                .get(symbol)
                .ok_or(Error::UnknownSymbol { position })?;
            encoded.extend_from_slice(codeword);
        }
        Ok(encoded)
    }

    fn code_table(&self) -> Option<&CodeTable<S, C>> {
        Some(&self.table)
    }
}

impl<S: Symbol, C: Symbol> Decoder<S, C> for PrefixCode<S, C> {
    fn decode(&self, encoded: &[C]) -> Result<Vec<S>> {
        let mut decoded = Vec::new();
        for step in self.tree.decode_all(encoded) {
            match step {
                Ok((symbol, _)) => decoded.push(symbol),
                Err(source) => {
                    return Err(Error::DecodeFailure {
                        decoded: decoded.len(),
                        source,
                    })
                }
            }
        }
        Ok(decoded)
    }
}

/// Passthrough code for pipelines where source and channel symbols coincide.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCode<S> {
    _symbol: PhantomData<S>,
}

impl<S> IdentityCode<S> {
    pub fn new() -> Self {
        Self {
            _symbol: PhantomData,
        }
    }
}

impl<S: Symbol> Encoder<S, S> for IdentityCode<S> {
    fn encode(&self, message: &[S]) -> Result<Vec<S>> {
        Ok(message.to_vec())
    }
}

impl<S: Symbol> Decoder<S, S> for IdentityCode<S> {
    fn decode(&self, encoded: &[S]) -> Result<Vec<S>> {
        Ok(encoded.to_vec())
    }
}

/// Smallest length `L` with `channel_size^L >= source_size`.
///
/// This is the codeword length of a fixed-length (block) code, at least 1.
/// `None` when the channel alphabet is too small to tell more than one
/// symbol apart.
pub fn fixed_length_baseline(source_size: usize, channel_size: usize) -> Option<usize> {
    if source_size <= 1 {
        return (channel_size >= 1).then_some(1);
    }
    if channel_size < 2 {
        return None;
    }

    let mut len = 1;
    let mut capacity = channel_size;
    while capacity < source_size {
        capacity = capacity.saturating_mul(channel_size);
        len += 1;
    }
    Some(len)
}

/// Shannon entropy in bits of a probability vector.
pub fn entropy(probabilities: impl IntoIterator<Item = f64>) -> f64 {
    probabilities
        .into_iter()
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}

fn check_alphabet<T: Symbol>(role: &str, alphabet: &[T]) -> Result<()> {
    if alphabet.is_empty() {
        return Err(Error::InvalidConfiguration(format!(
            "{} alphabet cannot be empty",
            role
        )));
    }

    let mut seen = HashSet::with_capacity(alphabet.len());
    for symbol in alphabet {
        if !seen.insert(symbol) {
            return Err(Error::InvalidConfiguration(format!(
                "{} alphabet contains {:?} more than once",
                role, symbol
            )));
        }
    }
    Ok(())
}
