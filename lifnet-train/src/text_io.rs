//! Flat numeric text files, compatible with `numpy.savetxt` / `loadtxt`.
//!
//! - vectors: one value per line
//! - matrices: one row per line, values separated by whitespace or commas
//! - blank lines are ignored
//!
//! Weight files follow the same convention: `weights_fc{1,2}.txt` hold the
//! `[outputs × inputs]` matrix row-major, `bias_fc{1,2}.txt` one bias per line.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use lifnet_core::{Matrix, NetworkConfig, SnnError, SnnResult, SpikingNetwork, SynapticWeights};

pub const WEIGHTS_FC1: &str = "weights_fc1.txt";
pub const BIAS_FC1: &str = "bias_fc1.txt";
pub const WEIGHTS_FC2: &str = "weights_fc2.txt";
pub const BIAS_FC2: &str = "bias_fc2.txt";

fn read_text(path: &Path) -> SnnResult<String> {
    fs::read_to_string(path).map_err(|e| SnnError::io(path, e))
}

fn write_text(path: &Path, text: &str) -> SnnResult<()> {
    fs::write(path, text).map_err(|e| SnnError::io(path, e))
}

fn parse_number(token: &str, source_name: &str, line: usize) -> SnnResult<f64> {
    token
        .parse::<f64>()
        .map_err(|_| SnnError::data_format(source_name, line, format!("cannot parse {:?} as a number", token)))
}

/// One value per non-blank line.
pub fn parse_values(text: &str, source_name: &str) -> SnnResult<Vec<f64>> {
    let mut values = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        values.push(parse_number(line, source_name, i + 1)?);
    }
    Ok(values)
}

/// One row per non-blank line; every row must have the same width.
pub fn parse_matrix(text: &str, source_name: &str) -> SnnResult<Matrix> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| parse_number(t, source_name, i + 1))
            .collect::<SnnResult<Vec<f64>>>()?;
        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                return Err(SnnError::data_format(
                    source_name,
                    i + 1,
                    format!("expected {} values, found {}", first.len(), row.len()),
                ));
            }
        }
        rows.push(row);
    }
    Matrix::from_rows(rows)
}

pub fn format_values(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 8);
    for v in values {
        let _ = writeln!(out, "{}", v);
    }
    out
}

pub fn format_matrix(matrix: &Matrix) -> String {
    let mut out = String::new();
    for row in matrix.iter_rows() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    out
}

pub fn read_values(path: &Path) -> SnnResult<Vec<f64>> {
    parse_values(&read_text(path)?, &path.display().to_string())
}

pub fn read_matrix(path: &Path) -> SnnResult<Matrix> {
    parse_matrix(&read_text(path)?, &path.display().to_string())
}

pub fn write_values(path: &Path, values: &[f64]) -> SnnResult<()> {
    write_text(path, &format_values(values))
}

pub fn write_matrix(path: &Path, matrix: &Matrix) -> SnnResult<()> {
    write_text(path, &format_matrix(matrix))
}

/// Write both projections' weights and biases into `dir`.
pub fn save_network(dir: &Path, network: &SpikingNetwork) -> SnnResult<()> {
    fs::create_dir_all(dir).map_err(|e| SnnError::io(dir, e))?;
    for (syn, weights, bias) in [(network.fc1(), WEIGHTS_FC1, BIAS_FC1), (network.fc2(), WEIGHTS_FC2, BIAS_FC2)] {
        write_matrix(&dir.join(weights), syn.weights())?;
        write_values(&dir.join(bias), syn.bias())?;
    }
    Ok(())
}

/// Load weights written by [`save_network`]; shapes are checked against `config`.
pub fn load_network(dir: &Path, config: &NetworkConfig) -> SnnResult<SpikingNetwork> {
    let load = |weights: &str, bias: &str| -> SnnResult<SynapticWeights> {
        SynapticWeights::new(read_matrix(&dir.join(weights))?, read_values(&dir.join(bias))?)
    };
    let fc1 = load(WEIGHTS_FC1, BIAS_FC1)?;
    let fc2 = load(WEIGHTS_FC2, BIAS_FC2)?;
    SpikingNetwork::new(config, fc1, fc2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn parses_numpy_style_values() {
        let text = "1.000000000000000000e+00\n\n-2.5\n0\n";
        assert_eq!(parse_values(text, "v").unwrap(), vec![1.0, -2.5, 0.0]);
        let err = parse_values("0.1\nabc\n", "labels.txt").unwrap_err();
        assert!(matches!(err, SnnError::DataFormat { line: 2, .. }));
    }

    #[test]
    fn parses_matrices() {
        let m = parse_matrix("1 0 1\n0,1,0\n", "m").unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.row(1), &[0.0, 1.0, 0.0]);
        assert!(matches!(parse_matrix("1 2\n3\n", "m"), Err(SnnError::DataFormat { line: 2, .. })));
    }

    #[test]
    fn formatted_text_parses_back_exactly() {
        let values = vec![0.1, -1.0 / 3.0, 1e-300, 42.0];
        assert_eq!(parse_values(&format_values(&values), "v").unwrap(), values);
        let m = Matrix::from_rows(vec![vec![0.2, 0.7], vec![-3.0, 1.0 / 7.0]]).unwrap();
        assert_eq!(parse_matrix(&format_matrix(&m), "m").unwrap(), m);
    }

    #[test]
    fn network_files_round_trip() {
        let dir = std::env::temp_dir().join(format!("lifnet-text-io-{}", std::process::id()));
        let config = NetworkConfig::default();
        let net = SpikingNetwork::random(&config, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        save_network(&dir, &net).unwrap();
        let back = load_network(&dir, &config).unwrap();
        assert_eq!(back, net);

        let narrow = NetworkConfig { num_hidden: 4, ..config };
        assert!(matches!(load_network(&dir, &narrow), Err(SnnError::ShapeMismatch { .. })));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_values(Path::new("/nonexistent/lifnet/data.txt")).unwrap_err();
        assert!(matches!(err, SnnError::Io { .. }));
    }
}
