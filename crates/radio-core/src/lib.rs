pub mod config;
pub mod directory;
pub mod platform;
pub mod settings;
pub mod station;
pub mod theme;

pub use config::Config;
pub use directory::{DirectorySource, StationDirectory};
pub use station::{NewStation, Station};
pub use theme::Theme;
