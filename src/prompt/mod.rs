/// Lazy, cached loading of newline-delimited atom files
pub mod atoms;
/// Wildcard and variant resolution against the atom store
pub mod resolve;
/// Time-sliced deterministic seed derivation
pub mod seed;
/// Multi-section prompt template parsing
pub mod template;
