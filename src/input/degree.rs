//! Code for reading career tracks from a CSV file.
use super::{deserialise_proportion, input_err_msg, read_csv};
use crate::degree::{CompletionTier, DegreeMix, DegreeProfile};
use crate::units::{Dimensionless, HostMoney};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

const DEGREES_FILE_NAME: &str = "degrees.csv";

/// Earnings cap multiple used when the column is left out
const DEFAULT_MAX_EARNINGS_MULTIPLE: f64 = 1.5;

/// A career track record retrieved from a CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct DegreeRaw {
    id: String,
    mean_initial_earnings: f64,
    earnings_stdev: f64,
    annual_growth_rate: f64,
    years_to_complete: u32,
    #[serde(deserialize_with = "deserialise_proportion")]
    home_return_probability: Dimensionless,
    #[serde(deserialize_with = "deserialise_proportion")]
    weight: Dimensionless,
    completion_tier: CompletionTier,
    completes: bool,
    #[serde(default)]
    max_earnings_multiple: Option<f64>,
}

impl DegreeRaw {
    fn into_profile(self) -> (DegreeProfile, Dimensionless) {
        let profile = DegreeProfile {
            id: self.id.into(),
            mean_initial_earnings: HostMoney(self.mean_initial_earnings),
            earnings_stdev: HostMoney(self.earnings_stdev),
            annual_growth_rate: Dimensionless(self.annual_growth_rate),
            years_to_complete: self.years_to_complete,
            home_return_probability: self.home_return_probability,
            max_earnings_multiple: Dimensionless(
                self.max_earnings_multiple
                    .unwrap_or(DEFAULT_MAX_EARNINGS_MULTIPLE),
            ),
            completion_tier: self.completion_tier,
            completes: self.completes,
        };

        (profile, self.weight)
    }
}

/// Build a degree mix from an iterator of raw records
fn read_degrees_from_iter<I>(iter: I) -> Result<DegreeMix>
where
    I: Iterator<Item = DegreeRaw>,
{
    DegreeMix::new(iter.map(DegreeRaw::into_profile))
}

/// Read the career tracks students are enrolled on.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The degree mix, `None` if the file does not exist or an error if it is invalid.
pub fn read_degrees(model_dir: &Path) -> Result<Option<DegreeMix>> {
    let file_path = model_dir.join(DEGREES_FILE_NAME);
    if !file_path.exists() {
        return Ok(None);
    }

    let degrees_csv = read_csv(&file_path)?;
    let mix = read_degrees_from_iter(degrees_csv.into_iter())
        .with_context(|| input_err_msg(&file_path))?;

    Ok(Some(mix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::degree::DegreeID;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_degrees_file(dir_path: &Path, contents: &str) {
        let mut file = File::create(dir_path.join(DEGREES_FILE_NAME)).unwrap();
        write!(file, "{contents}").unwrap();
    }

    fn degree_raw(id: &str, weight: f64) -> DegreeRaw {
        DegreeRaw {
            id: id.into(),
            mean_initial_earnings: 40000.0,
            earnings_stdev: 4000.0,
            annual_growth_rate: 0.02,
            years_to_complete: 4,
            home_return_probability: Dimensionless(0.1),
            weight: Dimensionless(weight),
            completion_tier: CompletionTier::Middle,
            completes: true,
            max_earnings_multiple: None,
        }
    }

    #[test]
    fn test_read_degrees() {
        let dir = tempdir().unwrap();
        create_degrees_file(
            dir.path(),
            "id,mean_initial_earnings,earnings_stdev,annual_growth_rate,years_to_complete,\
home_return_probability,weight,completion_tier,completes
NURSE,40000,4000,0.02,4,0.1,0.75,middle,true
NA,2200,640,0.01,2,1,0.25,lower,false
",
        );

        let mix = read_degrees(dir.path()).unwrap().unwrap();
        assert_eq!(
            mix.ids().into_iter().collect::<Vec<_>>(),
            [DegreeID::from("NURSE"), DegreeID::from("NA")]
        );

        let nurse = mix.get(&"NURSE".into()).unwrap();
        assert_eq!(nurse.mean_initial_earnings, HostMoney(40000.0));
        assert_eq!(nurse.completion_tier, CompletionTier::Middle);
        assert_eq!(nurse.max_earnings_multiple, Dimensionless(1.5));
        assert!(!mix.get(&"NA".into()).unwrap().completes);
    }

    #[test]
    fn test_read_degrees_non_existent() {
        assert!(read_degrees(tempdir().unwrap().path()).unwrap().is_none());
    }

    #[test]
    fn test_read_degrees_bad_tier() {
        let dir = tempdir().unwrap();
        create_degrees_file(
            dir.path(),
            "id,mean_initial_earnings,earnings_stdev,annual_growth_rate,years_to_complete,\
home_return_probability,weight,completion_tier,completes
NURSE,40000,4000,0.02,4,0.1,1,doctoral,true
",
        );
        assert!(read_degrees(dir.path()).is_err());
    }

    #[test]
    fn test_read_degrees_from_iter() {
        let mix =
            read_degrees_from_iter([degree_raw("A", 0.5), degree_raw("B", 0.5)].into_iter())
                .unwrap();
        assert_eq!(mix.ids().len(), 2);
    }

    #[test]
    fn test_read_degrees_from_iter_duplicate() {
        assert_error!(
            read_degrees_from_iter([degree_raw("A", 0.5), degree_raw("A", 0.5)].into_iter()),
            "Duplicate degree ID A"
        );
    }

    #[test]
    fn test_read_degrees_from_iter_bad_weights() {
        assert!(
            read_degrees_from_iter([degree_raw("A", 0.5), degree_raw("B", 0.25)].into_iter())
                .is_err()
        );
    }
}
