//! Row-level header classification.
//!
//! Header labels are overwhelmingly textual, so a row counts as a header when
//! enough of its non-blank cells are free text. The threshold is tunable; the
//! default tolerates one numeric-looking label (a year, say) in five.

use serde::{Deserialize, Serialize};

use crate::{
    cell::{Cell, non_blank_count},
    error::{CaptureError, Result},
};

pub const DEFAULT_TEXT_RATIO: f64 = 0.8;
const MIN_HEADER_CELLS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderClassifier {
    #[serde(default = "HeaderClassifier::default_text_ratio")]
    pub text_ratio: f64,
}

impl Default for HeaderClassifier {
    fn default() -> Self {
        Self {
            text_ratio: DEFAULT_TEXT_RATIO,
        }
    }
}

impl HeaderClassifier {
    pub fn with_text_ratio(text_ratio: f64) -> Result<Self> {
        let classifier = Self { text_ratio };
        classifier.validate()?;
        Ok(classifier)
    }

    pub const fn default_text_ratio() -> f64 {
        DEFAULT_TEXT_RATIO
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.text_ratio > 0.0 && self.text_ratio <= 1.0) {
            return Err(CaptureError::config(format!(
                "textRatio must be within (0, 1], got {}",
                self.text_ratio
            )));
        }
        Ok(())
    }

    pub fn is_likely_header_row(&self, row: &[Cell]) -> bool {
        let non_blank = non_blank_count(row);
        if non_blank < MIN_HEADER_CELLS {
            return false;
        }
        let text = row.iter().filter(|cell| cell.is_text()).count();
        text as f64 / non_blank as f64 >= self.text_ratio
    }
}

/// Classifies `row` with the default threshold.
pub fn is_likely_header_row(row: &[Cell]) -> bool {
    HeaderClassifier::default().is_likely_header_row(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::row_of;

    #[test]
    fn textual_rows_are_headers() {
        assert!(is_likely_header_row(&row_of(["Name", "Email", "Age"])));
    }

    #[test]
    fn numeric_and_empty_rows_are_not_headers() {
        assert!(!is_likely_header_row(&row_of([1, 2, 3])));
        assert!(!is_likely_header_row(&[]));
        assert!(!is_likely_header_row(&row_of(["Only"])));
    }

    #[test]
    fn one_numeric_label_in_five_is_tolerated() {
        let row = row_of(["Region", "Product", "Owner", "Status", "2024"]);
        assert!(is_likely_header_row(&row));
        let row = row_of(["Region", "Product", "Owner", "2023", "2024"]);
        assert!(!is_likely_header_row(&row));
    }

    #[test]
    fn blanks_do_not_count_against_the_ratio() {
        let row = vec![
            Cell::from("Name"),
            Cell::Null,
            Cell::from("  "),
            Cell::from("Email"),
        ];
        assert!(is_likely_header_row(&row));
    }

    #[test]
    fn booleans_are_neither_text_nor_numbers() {
        let row = vec![Cell::from("Active"), Cell::Bool(true)];
        assert!(!is_likely_header_row(&row));
    }

    #[test]
    fn custom_ratio_is_validated() {
        assert!(HeaderClassifier::with_text_ratio(0.0).is_err());
        assert!(HeaderClassifier::with_text_ratio(1.5).is_err());
        let lenient = HeaderClassifier::with_text_ratio(0.5).expect("valid ratio");
        assert!(lenient.is_likely_header_row(&row_of(["Name", "2024"])));
    }
}
