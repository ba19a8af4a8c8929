use std::sync::OnceLock;

use crate::error::Result;

/// Lazily built derived state of a volatility node.
///
/// Empty means dirty: every mutator on the owning node calls [`invalidate`],
/// and the next query rebuilds through [`get_or_build`]. A failed build is
/// cached too, so the same error is replayed until the inputs change.
///
/// [`invalidate`]: FitCache::invalidate
/// [`get_or_build`]: FitCache::get_or_build
#[derive(Debug, Clone)]
pub(crate) struct FitCache<T> {
    cell: OnceLock<Result<T>>,
}

impl<T> Default for FitCache<T> {
    fn default() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }
}

impl<T> FitCache<T> {
    pub fn get_or_build(&self, build: impl FnOnce() -> Result<T>) -> Result<&T> {
        match self.cell.get_or_init(build) {
            Ok(fit) => Ok(fit),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn invalidate(&mut self) {
        self.cell.take();
    }

    pub fn is_built(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;
    use std::cell::Cell;

    #[test]
    fn test_builds_once_until_invalidated() {
        let builds = Cell::new(0);
        let mut cache: FitCache<f64> = FitCache::default();
        let build = || {
            builds.set(builds.get() + 1);
            Ok(1.5)
        };
        assert_eq!(cache.get_or_build(build), Ok(&1.5));
        assert_eq!(cache.get_or_build(build), Ok(&1.5));
        assert_eq!(builds.get(), 1);

        cache.invalidate();
        assert!(!cache.is_built());
        assert_eq!(cache.get_or_build(build), Ok(&1.5));
        assert_eq!(builds.get(), 2);
    }

    #[test]
    fn test_failed_build_is_replayed() {
        let cache: FitCache<f64> = FitCache::default();
        let err = PricingError::DegenerateSmile("bad".into());
        assert_eq!(cache.get_or_build(|| Err(err.clone())), Err(err.clone()));
        // cached failure, the second closure is not run
        assert_eq!(cache.get_or_build(|| Ok(2.0)), Err(err));
        assert!(!cache.is_built());
    }
}
