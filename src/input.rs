//! Common routines for handling input data.
use crate::units::Dimensionless;
use anyhow::{Context, Result, ensure};
use float_cmp::approx_eq;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod degree;

/// Define a serde default function returning a unit type (e.g. [`Dimensionless`])
macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}
pub(crate) use define_unit_param_default;

/// Define a serde default function returning a plain value
macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}
pub(crate) use define_param_default;

/// The error message attached to errors raised while reading the given input file
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a series of type `T`s from a CSV file.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
///
/// # Returns
///
/// The records in the file or an error if the file could not be read or is empty.
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let records = read_csv_optional(file_path)?;
    ensure!(
        !records.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(records)
}

/// Read a series of type `T`s from a CSV file, allowing the file to have no records
pub fn read_csv_optional<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(file_path).with_context(|| input_err_msg(file_path))?;

    reader
        .deserialize()
        .map(|record| record.with_context(|| input_err_msg(file_path)))
        .collect()
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;

    Ok(toml_data)
}

/// Read a value, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(Dimensionless(value))
}

/// Check that a value lies in the closed interval [0, 1]
pub fn check_proportion(name: &str, value: Dimensionless) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&value.value()),
        "{name} must be between 0 and 1 (got {value})"
    );

    Ok(())
}

/// Check that a series of values sums to one, within a small tolerance
pub fn check_values_sum_to_one<I>(values: I) -> Result<()>
where
    I: Iterator<Item = Dimensionless>,
{
    let sum: Dimensionless = values.sum();
    ensure!(
        approx_eq!(f64, sum.value(), 1.0, epsilon = 1e-6),
        "Sum of values must equal one (got {sum})"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    #[derive(Debug, Deserialize)]
    struct Proportion {
        #[serde(deserialize_with = "deserialise_proportion")]
        value: Dimensionless,
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id,value\nhello,1\nworld,2").unwrap();
        }

        let records: Vec<Record> = read_csv(&file_path).unwrap();
        assert_eq!(
            records,
            [
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );
    }

    #[test]
    fn test_read_csv_empty() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("empty.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id,value").unwrap();
        }

        assert!(read_csv::<Record>(&file_path).is_err());
        assert!(read_csv_optional::<Record>(&file_path).unwrap().is_empty());
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id = \"hello\"\nvalue = 1").unwrap();
        }

        let record: Record = read_toml(&file_path).unwrap();
        assert_eq!(
            record,
            Record {
                id: "hello".to_string(),
                value: 1,
            }
        );

        assert!(read_toml::<Record>(&dir.path().join("missing.toml")).is_err());
    }

    #[rstest]
    #[case(0.01, true)]
    #[case(0.5, true)]
    #[case(1.0, true)]
    #[case(0.0, true)]
    #[case(-1.0, false)]
    #[case(1.5, false)]
    fn test_deserialise_proportion(#[case] value: f64, #[case] valid: bool) {
        let result = toml::from_str::<Proportion>(&format!("value = {value}"));
        assert_eq!(result.is_ok(), valid);
        if let Ok(proportion) = result {
            assert_eq!(proportion.value, Dimensionless(value));
        }
    }

    #[test]
    fn test_check_values_sum_to_one() {
        let values = [0.7, 0.3].map(Dimensionless);
        assert!(check_values_sum_to_one(values.into_iter()).is_ok());

        let values = [0.5, 0.25].map(Dimensionless);
        assert_error!(
            check_values_sum_to_one(values.into_iter()),
            "Sum of values must equal one (got 0.75)"
        );
    }

    #[test]
    fn test_check_proportion() {
        assert!(check_proportion("rate", Dimensionless(0.0)).is_ok());
        assert_error!(
            check_proportion("rate", Dimensionless(1.1)),
            "rate must be between 0 and 1 (got 1.1)"
        );
    }
}
