//! Feature adaptation from raw input to model-specific vectors
//!
//! Validates the domain of every field and projects the subset each model
//! version consumes. Pure functions of the input; validation always runs
//! before any model invocation.

use crate::error::ServingError;
use crate::models::{FeatureVectorV1, FeatureVectorV2, RawInput};

/// Serving range for the numeric `area` field.
pub const AREA_RANGE: (f64, f64) = (1000.0, 20000.0);

const BEDROOMS: &[&str] = &["1", "2", "3", "4", "5", "6"];
const BATHROOMS: &[&str] = &["1", "2", "3", "4"];
const STORIES: &[&str] = &["1", "2", "3", "4"];
const PARKING: &[&str] = &["0", "1", "2", "3"];
const YES_NO: &[&str] = &["yes", "no"];
const FURNISHING: &[&str] = &["furnished", "semi-furnished", "unfurnished"];

pub struct FeatureAdapter;

impl FeatureAdapter {
    /// Check every field against its declared domain.
    ///
    /// Fails with the first offending field and its allowed domain, so the
    /// caller can surface it before touching any model.
    pub fn validate(input: &RawInput) -> Result<(), ServingError> {
        if !input.area.is_finite() || input.area < AREA_RANGE.0 || input.area > AREA_RANGE.1 {
            return Err(ServingError::validation(
                "area",
                input.area.to_string(),
                format!("{}..={}", AREA_RANGE.0, AREA_RANGE.1),
            ));
        }

        let categoricals: [(&'static str, &str, &[&str]); 11] = [
            ("bedrooms", &input.bedrooms, BEDROOMS),
            ("bathrooms", &input.bathrooms, BATHROOMS),
            ("stories", &input.stories, STORIES),
            ("parking", &input.parking, PARKING),
            ("mainroad", &input.mainroad, YES_NO),
            ("guestroom", &input.guestroom, YES_NO),
            ("basement", &input.basement, YES_NO),
            ("hotwaterheating", &input.hotwaterheating, YES_NO),
            ("airconditioning", &input.airconditioning, YES_NO),
            ("prefarea", &input.prefarea, YES_NO),
            ("furnishingstatus", &input.furnishingstatus, FURNISHING),
        ];

        for (field, value, domain) in categoricals {
            if !domain.contains(&value) {
                return Err(ServingError::validation(field, value, domain.join(", ")));
            }
        }

        Ok(())
    }

    /// Project the baseline feature vector: area only. Callers validate the
    /// input first; projection itself cannot fail.
    pub fn project_v1(input: &RawInput) -> FeatureVectorV1 {
        FeatureVectorV1 { area: input.area }
    }

    /// Project the full twelve-column vector in the order the v2 artifact
    /// expects.
    pub fn project_v2(input: &RawInput) -> FeatureVectorV2 {
        FeatureVectorV2 {
            area: input.area,
            bedrooms: input.bedrooms.clone(),
            bathrooms: input.bathrooms.clone(),
            stories: input.stories.clone(),
            mainroad: input.mainroad.clone(),
            guestroom: input.guestroom.clone(),
            basement: input.basement.clone(),
            hotwaterheating: input.hotwaterheating.clone(),
            airconditioning: input.airconditioning.clone(),
            parking: input.parking.clone(),
            prefarea: input.prefarea.clone(),
            furnishingstatus: input.furnishingstatus.clone(),
        }
    }
}
