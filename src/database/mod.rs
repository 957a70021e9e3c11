// Database module
// LanceDB holds the embedded chunks searched for each question

pub mod lancedb;
