use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Names of the columns pulled out of a source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub x: String,
    pub y: String,
    pub extra: Option<String>,
}

impl ColumnSpec {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self::new("concentration", "absorbance")
    }
}

/// Rows of (x, y) in file order, with an optional third column such as time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationTable {
    pub x_name: String,
    pub y_name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub extra: Option<(String, Vec<f64>)>,
}

#[derive(Debug, serde::Serialize)]
struct Row {
    x: f64,
    y: f64,
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| Error::MissingColumn(name.to_string()))
}

fn parse_cell(record: &StringRecord, idx: usize, column: &str, row: usize) -> Result<f64> {
    let raw = record.get(idx).unwrap_or("");

    // `nan` and `inf` parse as f64 but are not measurements
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::ParseValue {
            column: column.to_string(),
            row,
            value: raw.to_string(),
        })
}

impl ObservationTable {
    pub fn from_columns(
        x_name: impl Into<String>,
        x: Vec<f64>,
        y_name: impl Into<String>,
        y: Vec<f64>,
    ) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::LengthMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }

        Ok(Self {
            x_name: x_name.into(),
            y_name: y_name.into(),
            x,
            y,
            extra: None,
        })
    }

    pub fn from_csv_reader<R: Read>(reader: R, spec: &ColumnSpec) -> Result<Self> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let headers = reader.headers()?.clone();

        let x_idx = column_index(&headers, &spec.x)?;
        let y_idx = column_index(&headers, &spec.y)?;
        let extra_idx = spec
            .extra
            .as_deref()
            .map(|name| column_index(&headers, name))
            .transpose()?;

        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut extra = Vec::new();

        for (i, record) in reader.records().enumerate() {
            let record = record?;
            // header is line 1
            let row = i + 2;

            x.push(parse_cell(&record, x_idx, &spec.x, row)?);
            y.push(parse_cell(&record, y_idx, &spec.y, row)?);

            if let (Some(idx), Some(name)) = (extra_idx, spec.extra.as_deref()) {
                extra.push(parse_cell(&record, idx, name, row)?);
            }
        }

        debug!(rows = x.len(), x = %spec.x, y = %spec.y, "parsed observation table");

        Ok(Self {
            x_name: spec.x.clone(),
            y_name: spec.y.clone(),
            x,
            y,
            extra: spec.extra.clone().map(|name| (name, extra)),
        })
    }

    pub fn from_path(path: impl AsRef<Path>, spec: &ColumnSpec) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, spec)
    }

    pub fn from_url(url: &str, spec: &ColumnSpec) -> Result<Self> {
        let fetch_err = |source| Error::Fetch {
            url: url.to_string(),
            source,
        };

        let body = reqwest::blocking::get(url)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(fetch_err)?;

        Self::from_csv_reader(body.as_bytes(), spec)
    }

    /// Loads from a URL when `source` looks like one, otherwise from a file path.
    pub fn load(source: &str, spec: &ColumnSpec) -> Result<Self> {
        let table = if source.starts_with("http://") || source.starts_with("https://") {
            Self::from_url(source, spec)?
        } else {
            Self::from_path(source, spec)?
        };

        info!(source, rows = table.len(), "loaded observations");

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        if name == self.x_name {
            Some(&self.x)
        } else if name == self.y_name {
            Some(&self.y)
        } else {
            self.extra
                .as_ref()
                .filter(|(extra_name, _)| extra_name == name)
                .map(|(_, values)| values.as_slice())
        }
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + Clone + '_ {
        self.x.iter().cloned().zip(self.y.iter().cloned())
    }

    /// Replaces the y column by absorbance computed from transmittance.
    pub fn y_to_absorbance(mut self, percent: bool) -> Result<Self> {
        self.y = self
            .y
            .iter()
            .map(|&t| absorbance_from_transmittance(t, percent))
            .collect::<Result<_>>()?;
        self.y_name = "absorbance".to_string();

        Ok(self)
    }

    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        writer.write_record([self.x_name.as_str(), self.y_name.as_str()])?;
        for (x, y) in self.points() {
            writer.serialize(Row { x, y })?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// `A = -log10(T)`, or `A = 2 - log10(%T)` when `percent` is set.
pub fn absorbance_from_transmittance(transmittance: f64, percent: bool) -> Result<f64> {
    if !(transmittance > 0.) {
        return Err(Error::NonPositiveTransmittance(transmittance));
    }

    Ok(if percent {
        2. - transmittance.log10()
    } else {
        -transmittance.log10()
    })
}

/// Calibration-style data on `y = slope * x + intercept`, with optional gaussian noise.
pub fn synthetic_line(
    slope: f64,
    intercept: f64,
    xs: &[f64],
    noise_sd: f64,
    seed: u64,
) -> Result<ObservationTable> {
    let normal = Normal::new(0., noise_sd).map_err(|e| Error::Distribution(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed);

    let y = xs
        .iter()
        .map(|&x| {
            let noise = if noise_sd > 0. {
                normal.sample(&mut rng)
            } else {
                0.
            };
            slope * x + intercept + noise
        })
        .collect();

    ObservationTable::from_columns("concentration", xs.to_vec(), "absorbance", y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const CSV: &str = "\
concentration, absorbance, Time
0.0, 0.01, 1
0.1, 0.21, 2
0.2, 0.40, 3
";

    #[test]
    fn reads_named_columns_in_file_order() {
        let spec = ColumnSpec::default().with_extra("Time");
        let table = ObservationTable::from_csv_reader(CSV.as_bytes(), &spec).unwrap();

        assert_eq!(table.x, vec![0.0, 0.1, 0.2]);
        assert_eq!(table.y, vec![0.01, 0.21, 0.40]);
        assert_eq!(table.column("Time"), Some(&[1., 2., 3.][..]));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn missing_column_is_reported() {
        let spec = ColumnSpec::new("concentration", "Transmittance");
        let err = ObservationTable::from_csv_reader(CSV.as_bytes(), &spec).unwrap_err();

        assert!(matches!(err, Error::MissingColumn(name) if name == "Transmittance"));
    }

    #[test]
    fn non_numeric_value_reports_row_and_column() {
        let data = "concentration,absorbance\n0.1,0.2\n0.2,abc\n";
        let err = ObservationTable::from_csv_reader(data.as_bytes(), &ColumnSpec::default())
            .unwrap_err();

        match err {
            Error::ParseValue { column, row, value } => {
                assert_eq!(column, "absorbance");
                assert_eq!(row, 3);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nan_and_inf_cells_are_parse_errors() {
        let data = "concentration,absorbance\n0,0.1\n1,nan\n2,0.5\n3,inf\n";
        let err = ObservationTable::from_csv_reader(data.as_bytes(), &ColumnSpec::default())
            .unwrap_err();
        assert!(matches!(err, Error::ParseValue { row: 3, value, .. } if value == "nan"));

        let data = "concentration,absorbance\n0,0.1\n-inf,0.3\n";
        let err = ObservationTable::from_csv_reader(data.as_bytes(), &ColumnSpec::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ParseValue { column, row: 3, .. } if column == "concentration"
        ));
    }

    #[test]
    fn transmittance_conversion() {
        assert_abs_diff_eq!(absorbance_from_transmittance(0.1, false).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(absorbance_from_transmittance(10., true).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(absorbance_from_transmittance(1., false).unwrap(), 0.0, epsilon = 1e-12);
        assert!(absorbance_from_transmittance(0., false).is_err());
        assert!(absorbance_from_transmittance(-5., true).is_err());
    }

    #[test]
    fn synthetic_line_is_reproducible() {
        let xs = [0., 1., 2., 3.];

        let exact = synthetic_line(2., 1., &xs, 0., 7).unwrap();
        assert_eq!(exact.y, vec![1., 3., 5., 7.]);

        let a = synthetic_line(2., 1., &xs, 0.1, 7).unwrap();
        let b = synthetic_line(2., 1., &xs, 0.1, 7).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.y, exact.y);
    }

    #[test]
    fn write_then_read_keeps_values() {
        let table = synthetic_line(0.5, 0.0, &[1., 2.], 0., 0).unwrap();

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();

        let back = ObservationTable::from_csv_reader(out.as_slice(), &ColumnSpec::default()).unwrap();
        assert_eq!(back.x, table.x);
        assert_eq!(back.y, table.y);
    }

    #[test]
    fn mismatched_columns_rejected() {
        let err = ObservationTable::from_columns("x", vec![1., 2.], "y", vec![1.]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { x_len: 2, y_len: 1 }));
    }
}
