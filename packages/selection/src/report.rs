//! Exported report files.

use bio_risk_models::Selection;

/// A generated PDF report ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    /// Suggested file name, e.g. `Biodiversity_Report_G-12.pdf`.
    pub file_name: String,
    /// Raw PDF bytes.
    pub bytes: Vec<u8>,
}

impl ReportFile {
    /// Wraps `bytes` generated for `selection`.
    #[must_use]
    pub fn new(selection: &Selection, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name(selection),
            bytes,
        }
    }
}

/// Report file name for a selection. Selections without a grid id are
/// named `regional`.
#[must_use]
pub fn file_name(selection: &Selection) -> String {
    let id = selection
        .grid_id()
        .filter(|id| !id.is_empty())
        .unwrap_or("regional");
    format!("Biodiversity_Report_{id}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bio_risk_models::{AnalysisResult, Coordinate, GridCell};

    #[test]
    fn cell_reports_are_named_after_the_cell() {
        let cell = GridCell {
            grid_id: "G-12".to_string(),
            location: None,
            indicators: None,
            rules: None,
            ml: None,
            impacts: vec![],
            interventions: vec![],
        };
        assert_eq!(
            file_name(&Selection::Cell(cell)),
            "Biodiversity_Report_G-12.pdf"
        );
    }

    #[test]
    fn region_without_grid_id_is_regional() {
        let region = AnalysisResult {
            location: Coordinate::new(13.0827, 80.2707),
            grid_id: None,
            grid: vec![],
            indicators: None,
            rules: None,
            ml: None,
            impacts: vec![],
            interventions: vec![],
        };
        assert_eq!(
            file_name(&Selection::Region(region)),
            "Biodiversity_Report_regional.pdf"
        );
    }
}
