/// Solar-driven theme selection with probabilistic blend windows
pub mod scheduler;

pub use scheduler::{DayPhase, ThemeChoice, ThemeMix, ThemeScheduler};
