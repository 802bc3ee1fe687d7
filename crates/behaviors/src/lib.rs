//! `mochi-behaviors` — the stock behavior catalog.
//!
//! Each module is one self-contained [`Behavior`] implementation; hosts call
//! [`default_catalog`] to get the whole set, or register any subset
//! themselves. Registration is an explicit list, assembled at startup.

pub mod decoration;
pub mod joke;
pub mod nap;
pub mod weather;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use mochi_engine::{Behavior, BehaviorCatalog, CatalogError};

pub use decoration::DecorationSweeper;
pub use joke::JokeTeller;
pub use nap::Nap;
pub use weather::WeatherReport;

/// The stock catalog: every behavior this crate ships, in menu order.
pub fn default_catalog() -> Result<BehaviorCatalog, CatalogError> {
    let behaviors: Vec<Arc<dyn Behavior>> = vec![
        Arc::new(JokeTeller::new()),
        Arc::new(WeatherReport::new()),
        Arc::new(Nap::new()),
        Arc::new(DecorationSweeper),
    ];
    BehaviorCatalog::new(behaviors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_builds() {
        let catalog = default_catalog().unwrap();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.get("joke").is_some());
        assert!(catalog.get("weather").is_some());
        assert!(catalog.get("nap").is_some());
        assert!(catalog.get("tidy-decoration").is_some());
    }

    #[test]
    fn catalog_weights_are_sane() {
        let catalog = default_catalog().unwrap();
        for behavior in catalog.iter() {
            assert!(behavior.weight() >= 0.0, "{} has negative weight", behavior.id());
        }
    }
}
