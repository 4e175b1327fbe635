#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use compass::config::ScoringConfig;
use compass::data::profile::StudentProfile;
use compass::data::programs::Catalogue;
use compass::data::taxonomy::Taxonomy;
use compass::embedding::QueryEmbedder;
use compass::matching::Recommender;

/// Path to the sample catalogue shipped in `data/`.
pub fn sample_catalogue_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/programs.json")
}

pub fn sample_catalogue() -> Catalogue {
    Catalogue::from_path(&sample_catalogue_path()).expect("sample catalogue should load")
}

/// A recommender over the sample catalogue with embeddings disabled.
pub fn sample_recommender() -> Recommender {
    Recommender::new(
        Arc::new(Taxonomy::builtin().expect("built-in taxonomy should parse")),
        ScoringConfig::default(),
        Arc::new(sample_catalogue()),
        QueryEmbedder::disabled(),
    )
}

/// Grade 12 student in Toronto interested in robotics.
pub fn robotics_student() -> StudentProfile {
    StudentProfile {
        name: "Ada".to_owned(),
        average: 88.0,
        interests: "robotics and AI".to_owned(),
        subjects: vec!["Advanced Functions".to_owned(), "Physics".to_owned()],
        location: "Toronto, ON".to_owned(),
        ..Default::default()
    }
}
