//! Tree-building strategies for [`PrefixCode`](crate::code::PrefixCode).
//!
//! Builders are plain data-in/data-out values: they receive the alphabets and
//! an empty tree and insert one codeword per source symbol. Choosing good
//! codewords (Huffman, Shannon-Fano, ...) is up to the caller; the two
//! builders here cover explicit tables and the fixed-length baseline.

use crate::code::{fixed_length_baseline, TreeBuilder};
use crate::error::{Error, Result};
use crate::message::Symbol;
use crate::tree::PrefixCodeTree;

/// Builder that inserts an explicit symbol → codeword table, in order.
#[derive(Debug, Clone)]
pub struct TableBuilder<S, C> {
    entries: Vec<(S, Vec<C>)>,
}

/// Build from an explicit table.
pub fn from_table<S, C, I>(table: I) -> TableBuilder<S, C>
where
    I: IntoIterator<Item = (S, Vec<C>)>,
{
    TableBuilder {
        entries: table.into_iter().collect(),
    }
}

impl<S: Symbol, C: Symbol> TreeBuilder<S, C> for TableBuilder<S, C> {
    fn build(&self, _source: &[S], _channel: &[C], tree: &mut PrefixCodeTree<S, C>) -> Result<()> {
        for (symbol, codeword) in &self.entries {
            tree.insert_code(codeword, symbol.clone())?;
        }
        Ok(())
    }
}

/// Block code: every symbol gets a codeword of the same length.
///
/// The i-th source symbol is assigned the base-r digits of i, most
/// significant first, padded to `ceil(log_r |S|)` digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLength;

/// Build the fixed-length baseline code.
pub fn fixed_length() -> FixedLength {
    FixedLength
}

impl<S: Symbol, C: Symbol> TreeBuilder<S, C> for FixedLength {
    fn build(&self, source: &[S], channel: &[C], tree: &mut PrefixCodeTree<S, C>) -> Result<()> {
        let radix = channel.len();
        let len = fixed_length_baseline(source.len(), radix).ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "a channel alphabet of {} symbol(s) cannot encode {} source symbols",
                radix,
                source.len()
            ))
        })?;

        let mut codeword = Vec::with_capacity(len);
        for (index, symbol) in source.iter().enumerate() {
            codeword.clear();
            let mut rest = index;
            for _ in 0..len {
                codeword.push(channel[rest % radix].clone());
                rest /= radix;
            }
            codeword.reverse();
            tree.insert_code(&codeword, symbol.clone())?;
        }
        Ok(())
    }
}
