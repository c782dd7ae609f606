//! Reading keyed CSV files and joining them into one sample matrix.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Joined input, sorted by key. `values` is row-major with `dims` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub keys: Vec<f64>,
    pub values: Vec<f64>,
    pub rows: usize,
    pub dims: usize,
}

type KeyedRows = Vec<(f64, Vec<f64>)>;

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).trim(csv::Trim::All);
    builder
}

/// Read headerless CSV rows; the first column is the key.
pub fn read_keyed<R: io::Read>(mut reader: csv::Reader<R>) -> Result<KeyedRows> {
    let mut rows = Vec::new();
    let mut width = None;
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {}", idx))?;
        let fields = record.iter()
            .map(|f| f.parse::<f64>().with_context(|| format!("row {}: '{}' is not a number", idx, f)))
            .collect::<Result<Vec<f64>>>()?;
        if fields.len() < 2 {
            bail!("row {}: expected a key and at least one value", idx);
        }
        match width {
            None => width = Some(fields.len()),
            Some(w) if w != fields.len() => bail!("row {}: expected {} columns, got {}", idx, w, fields.len()),
            Some(_) => {}
        }
        rows.push((fields[0], fields[1..].to_vec()));
    }
    Ok(rows)
}

fn read_keyed_file(path: &Path) -> Result<KeyedRows> {
    let reader = reader_builder().from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    read_keyed(reader).with_context(|| format!("parsing {}", path.display()))
}

/// Inner join of **left** and **right** on the key, sorted by key.
/// A key that repeats yields one row per matching pair.
/// Without **right**, the rows of **left** are only sorted.
pub fn join(left: KeyedRows, right: Option<KeyedRows>) -> Result<Table> {
    let mut joined: KeyedRows = match right {
        None => left,
        Some(right) => {
            let mut by_key: HashMap<u64, Vec<Vec<f64>>> = HashMap::new();
            for (key, values) in right {
                by_key.entry(key.to_bits()).or_default().push(values);
            }
            // every matching (left, right) pair, in left order, then right order
            left.into_iter()
                .flat_map(|(key, values)| {
                    by_key.get(&key.to_bits()).into_iter().flatten().map(move |other| {
                        let mut row = values.clone();
                        row.extend_from_slice(other);
                        (key, row)
                    })
                })
                .collect()
        }
    };
    if joined.is_empty() {
        bail!("no rows to cluster");
    }
    joined.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    let dims = joined[0].1.len();
    let rows = joined.len();
    let mut keys = Vec::with_capacity(rows);
    let mut values = Vec::with_capacity(rows * dims);
    for (key, row) in joined {
        keys.push(key);
        values.extend(row);
    }
    Ok(Table { keys, values, rows, dims })
}

/// Load one or two files and join them on their key column.
pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Table> {
    match paths {
        [single] => join(read_keyed_file(single.as_ref())?, None),
        [left, right] => join(read_keyed_file(left.as_ref())?, Some(read_keyed_file(right.as_ref())?)),
        _ => bail!("expected one or two input files, got {}", paths.len()),
    }
}
