use tracing::level_filters::LevelFilter;

/// Log level when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

/// Separator between items of a percentile list.
pub const PERCENTILE_SEPARATOR: char = ',';
