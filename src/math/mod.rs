/// Seeded weighted and uniform random selection
pub mod probability;
/// Sunrise and sunset computation from solar geometry
pub mod solar;
