mod stats;

pub use stats::CatalogStatsQuery;
