//! Builders for the analytic endpoints. Every builder reads from a
//! [`RiboHandle`] and returns plain JSON; caching and encoding happen in
//! the routes.

use crate::models::SplitFrame;
use crate::ribo::{Region, RiboError, RiboHandle, Site};
use crate::services::cache::SequenceMap;
use serde_json::{Map, Value, json};

/// Adds the `experiment`, `min` and `totalReads` fields every object
/// response carries.
pub fn inject_metadata(
    value: &mut Value,
    handle: &RiboHandle,
    experiment: &str,
) -> Result<(), RiboError> {
    if let Value::Object(map) = value {
        map.insert("experiment".to_string(), json!(experiment));
        map.insert("min".to_string(), json!(handle.file().minimum_length()));
        map.insert(
            "totalReads".to_string(),
            json!(handle.file().total_reads(experiment)?),
        );
    }
    Ok(())
}

pub fn metadata(handle: &RiboHandle) -> Value {
    let file = handle.file();
    json!({
        "min": file.minimum_length(),
        "max": file.maximum_length(),
        "formatVersion": file.format_version(),
    })
}

/// Counts per read length and region, one row per read length.
pub fn region_counts(handle: &RiboHandle, experiment: &str) -> Result<Value, RiboError> {
    let per_region = Region::ALL
        .iter()
        .map(|region| handle.region_counts_by_length(experiment, *region))
        .collect::<Result<Vec<_>, _>>()?;

    let index = handle.file().read_lengths();
    let data = (0..index.len())
        .map(|row| per_region.iter().map(|counts| counts[row]).collect())
        .collect();

    let frame = SplitFrame {
        index,
        columns: Region::ALL.iter().map(Region::as_str).collect(),
        data,
    };
    Ok(json!(frame))
}

pub fn length_distribution(handle: &RiboHandle, experiment: &str) -> Result<Value, RiboError> {
    let counts = handle.region_counts_by_length(experiment, Region::Cds)?;
    Ok(json!({
        "min": handle.file().minimum_length(),
        "data": counts,
    }))
}

pub fn metagene(handle: &RiboHandle, experiment: &str, site: Site) -> Result<Value, RiboError> {
    let radius = i64::from(handle.file().metagene_radius());
    let frame = SplitFrame {
        index: handle.file().read_lengths(),
        columns: (-radius..=radius).collect::<Vec<i64>>(),
        data: handle.file().metagene(experiment, site)?,
    };
    Ok(json!(frame))
}

/// CDS counts per transcript, highest first. Ties keep transcript order.
pub fn list_genes(handle: &RiboHandle, experiment: &str) -> Result<Value, RiboError> {
    let mut counts = handle.region_counts_by_transcript(experiment, Region::Cds)?;
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let genes: Map<String, Value> = counts
        .into_iter()
        .map(|(name, count)| (name, json!(count)))
        .collect();
    Ok(json!({ "genes": genes }))
}

/// Per-position coverage of one transcript. `cdsRange` is inclusive on
/// both ends.
pub fn coverage(
    handle: &RiboHandle,
    experiment: &str,
    gene: &str,
    sequences: Option<&SequenceMap>,
) -> Result<Value, RiboError> {
    let index = handle.transcript_index(gene)?;
    let [cds_start, cds_end] = handle.cds_range(gene)?;
    let length = handle.file().transcript_lengths()[index];

    let frame = SplitFrame {
        index: handle.file().read_lengths(),
        columns: (0..length).collect::<Vec<u64>>(),
        data: handle.coverage(experiment, gene)?,
    };

    let gene_sequence = sequences.and_then(|map| map.get(gene)).cloned();

    Ok(json!({
        "cdsRange": [cds_start, cds_end.saturating_sub(1)],
        "coverage": frame,
        "gene": gene,
        "geneSequence": gene_sequence,
    }))
}

/// Spearman rank correlation between the CDS counts of every pair of
/// experiments. All handles must share transcript order.
pub fn gene_correlations(
    experiments: &[(String, &RiboHandle, String)],
) -> Result<Value, RiboError> {
    let mut names = Vec::with_capacity(experiments.len());
    let mut ranks = Vec::with_capacity(experiments.len());
    for (label, handle, experiment) in experiments {
        let counts: Vec<f64> = handle
            .region_counts_by_transcript(experiment, Region::Cds)?
            .into_iter()
            .map(|(_, count)| count as f64)
            .collect();
        names.push(label.clone());
        ranks.push(average_ranks(&counts));
    }

    let data = ranks
        .iter()
        .map(|x| ranks.iter().map(|y| pearson(x, y)).collect())
        .collect();

    let frame: SplitFrame<String, String, Option<f64>> = SplitFrame {
        index: names.clone(),
        columns: names,
        data,
    };
    Ok(json!(frame))
}

/// 1-based ranks, with tied values sharing the mean of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for &position in &order[start..end] {
            ranks[position] = rank;
        }
        start = end;
    }
    ranks
}

/// Pearson correlation, `None` when either side has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }

    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let (mut covariance, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x[..n].iter().zip(&y[..n]) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(covariance / (var_x.sqrt() * var_y.sqrt()))
}
