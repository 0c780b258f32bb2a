//! Sample batch input.

use crate::export::ExportError;
use serde::Serialize;

/// File name offered for the sample download.
pub const SAMPLE_FILE_NAME: &str = "sample_properties.csv";

#[derive(Debug, Serialize)]
struct SampleProperty {
    brokertitle: &'static str,
    #[serde(rename = "type")]
    property_type: &'static str,
    beds: u32,
    bath: f64,
    propertysqft: f64,
    sublocality: &'static str,
}

const SAMPLES: [SampleProperty; 2] = [
    SampleProperty {
        brokertitle: "Brokered by COMPASS",
        property_type: "Condo for sale",
        beds: 2,
        bath: 1.0,
        propertysqft: 800.0,
        sublocality: "Manhattan",
    },
    SampleProperty {
        brokertitle: "Brokered by Douglas Elliman - 575 Madison Ave",
        property_type: "House for sale",
        beds: 3,
        bath: 2.0,
        propertysqft: 1200.0,
        sublocality: "Brooklyn",
    },
];

/// Two-row CSV in the batch upload layout.
pub fn sample_csv() -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for sample in &SAMPLES {
        wtr.serialize(sample)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_csv_layout() {
        let csv = sample_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "brokertitle,type,beds,bath,propertysqft,sublocality");
        assert_eq!(lines[1], "Brokered by COMPASS,Condo for sale,2,1.0,800.0,Manhattan");
        assert!(lines[2].ends_with("Brooklyn"));
    }
}
