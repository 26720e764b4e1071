//! Samples produced or consumed by growth runs.

use super::Reference;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ThinFilm {
    pub name: String,
    pub lab_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThinFilmStack {
    pub name: String,
    pub lab_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substrate: Option<Reference>,
    pub layers: Vec<Reference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Substrate {
    pub name: String,
    pub lab_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elemental_composition: Vec<ElementalComposition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dopants: Vec<Dopant>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementalComposition {
    pub element: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dopant {
    pub element: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doping_level: Option<f64>,
}

/// Reactor settings that stay fixed across a campaign of growth runs
#[derive(Debug, Clone, Serialize)]
pub struct ConstantParameters {
    pub name: String,
    pub lab_id: String,
    pub data_file: String,
}
