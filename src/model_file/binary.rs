use super::{parse_header, ModelFile};
use crate::vectors::{EmbeddingTable, KeyedVectors, Vocabulary};
use anyhow::{anyhow, bail, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};

const MAX_PREALLOC: usize = 1 << 20;

pub fn parse_binary(file: ModelFile) -> Result<KeyedVectors> {
    let reader = BufReader::new(
        File::open(&file.path).with_context(|| format!("open {}", file.path.display()))?,
    );
    read_binary(reader).with_context(|| format!("parse {}", file))
}

/// Reads the word2vec binary layout: a `<count> <dim>\n` header, then per
/// entry the token, a space, `dim` little-endian f32s and an optional `\n`.
///
/// Buffers grow with the data actually read, never with the header alone.
pub fn read_binary<R: BufRead>(mut reader: R) -> Result<KeyedVectors> {
    let mut header = String::new();
    reader.read_line(&mut header).context("read header")?;
    let (count, dim) =
        parse_header(&header).ok_or_else(|| anyhow!("invalid header: {:?}", header.trim()))?;
    debug!("header: count: {}, dim: {}", count, dim);
    let total = count
        .checked_mul(dim)
        .ok_or_else(|| anyhow!("header {} x {} overflows", count, dim))?;
    let vector_bytes = dim
        .checked_mul(4)
        .ok_or_else(|| anyhow!("header dim {} overflows", dim))?;

    let mut tokens = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut data = Vec::with_capacity(total.min(MAX_PREALLOC));
    let mut token_buf = Vec::new();
    let mut vector_buf = Vec::new();

    for i in 0..count {
        token_buf.clear();
        reader
            .read_until(b' ', &mut token_buf)
            .with_context(|| format!("read token of entry {}", i))?;
        if token_buf.pop() != Some(b' ') {
            bail!("truncated at entry {} of {}", i, count);
        }
        tokens.push(token_decode(&token_buf));

        vector_buf.clear();
        (&mut reader)
            .take(vector_bytes as u64)
            .read_to_end(&mut vector_buf)
            .with_context(|| format!("read vector of entry {}", i))?;
        if vector_buf.len() != vector_bytes {
            bail!("truncated at entry {} of {}", i, count);
        }
        let offset = data.len();
        data.resize(offset + dim, 0f32);
        let row = &mut data[offset..];
        LittleEndian::read_f32_into(&vector_buf, row);
        if row.iter().any(|x| !x.is_finite()) {
            bail!("entry {}: non-finite value", i);
        }
    }

    let vocab = Vocabulary::from_tokens(tokens)?;
    let table = EmbeddingTable::from_flat(dim, count, data)?;
    info!("loaded {} binary vectors of dim {}", count, dim);
    Ok(KeyedVectors::new(vocab, table)?)
}

// the newline closing the previous vector is optional, so it lands here
fn token_decode(bytes: &[u8]) -> String {
    let s = String::from_utf8_lossy(bytes);
    s.trim_start_matches('\n').to_string()
}
