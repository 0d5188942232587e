use super::{parse_header, ModelFile};
use crate::vectors::{EmbeddingTable, KeyedVectors, Vocabulary};
use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};

pub fn parse_text(file: ModelFile) -> Result<KeyedVectors> {
    let reader = BufReader::new(
        File::open(&file.path).with_context(|| format!("open {}", file.path.display()))?,
    );
    read_text(reader).with_context(|| format!("parse {}", file))
}

/// Reads `token v1 .. vD` lines, optionally preceded by a `<count> <dim>`
/// header. Blank lines are skipped.
///
/// A leading line of two integers is only taken as the header when the row
/// after it has `dim` values; otherwise it is the first row of a
/// one-dimensional file.
pub fn read_text<R: BufRead>(reader: R) -> Result<KeyedVectors> {
    let mut header = None;
    let mut pending_header = None;
    let mut dim = None;
    let mut tokens = Vec::new();
    let mut data = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let number = number + 1;
        if line.trim().is_empty() {
            continue;
        }
        if tokens.is_empty() && header.is_none() && pending_header.is_none() {
            if let Some(counts) = parse_header(&line) {
                pending_header = Some((number, counts, line));
                continue;
            }
        }

        let (token, row) = parse_row(number, &line)?;
        if let Some((header_number, (count, header_dim), header_line)) = pending_header.take() {
            if row.len() == header_dim {
                debug!("header: count: {}, dim: {}", count, header_dim);
                header = Some(count);
                dim = Some(header_dim);
            } else {
                let (token, row) = parse_row(header_number, &header_line)?;
                push_row(header_number, token, row, &mut dim, &mut tokens, &mut data)?;
            }
        }
        push_row(number, token, row, &mut dim, &mut tokens, &mut data)?;
    }

    // a header with no rows after it
    if let Some((_, (count, header_dim), _)) = pending_header {
        header = Some(count);
        dim = Some(header_dim);
    }
    if let Some(count) = header {
        if count != tokens.len() {
            bail!("header declares {} rows, found {}", count, tokens.len());
        }
    }
    let rows = tokens.len();
    let vocab = Vocabulary::from_tokens(tokens)?;
    let table = EmbeddingTable::from_flat(dim.unwrap_or(0), rows, data)?;
    info!("loaded {} text vectors of dim {}", rows, table.dim());
    Ok(KeyedVectors::new(vocab, table)?)
}

fn parse_row(number: usize, line: &str) -> Result<(String, Vec<f32>)> {
    let mut fields = line.split_whitespace();
    let token = fields
        .next()
        .ok_or_else(|| anyhow!("line {}: missing token", number))?;
    let row = fields
        .map(|field| {
            let value = field
                .parse::<f32>()
                .with_context(|| format!("line {}: invalid value {:?}", number, field))?;
            if !value.is_finite() {
                bail!("line {}: non-finite value {:?}", number, field);
            }
            Ok(value)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((token.to_string(), row))
}

fn push_row(
    number: usize,
    token: String,
    row: Vec<f32>,
    dim: &mut Option<usize>,
    tokens: &mut Vec<String>,
    data: &mut Vec<f32>,
) -> Result<()> {
    let expected = *dim.get_or_insert(row.len());
    if row.len() != expected {
        bail!(
            "line {}: expected {} values, found {}",
            number,
            expected,
            row.len()
        );
    }
    tokens.push(token);
    data.extend(row);
    Ok(())
}
