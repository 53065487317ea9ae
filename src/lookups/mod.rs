pub mod award_types;
pub mod download_columns;
pub mod matview;
pub mod states;
