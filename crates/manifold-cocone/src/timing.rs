//! Zero-cost timing instrumentation for reconstruction phases.
//!
//! With the `timing` feature enabled, phase durations are measured and
//! logged as a summary. Without it, all timing code compiles away.
//!
//! Usage:
//!   cargo run --release --features timing

use std::time::Duration;

#[cfg(feature = "timing")]
fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(feature = "timing")]
fn pct(d: Duration, total: Duration) -> f64 {
    if total.as_nanos() == 0 {
        0.0
    } else {
        d.as_secs_f64() / total.as_secs_f64() * 100.0
    }
}

/// Phase timings of constructor creation.
#[cfg(feature = "timing")]
#[derive(Debug, Clone, Default)]
pub(crate) struct ConstructionTimings {
    delaunay: Duration,
    structure: Duration,
}

#[cfg(feature = "timing")]
impl ConstructionTimings {
    pub(crate) fn set_delaunay(&mut self, d: Duration) {
        self.delaunay = d;
    }

    pub(crate) fn set_structure(&mut self, d: Duration) {
        self.structure = d;
    }

    pub(crate) fn report(&self, n: usize, dimension: usize) {
        let total = self.delaunay + self.structure;
        log::info!("[timing] constructor n={} dim={}", n, dimension);
        log::info!(
            "  delaunay:  {:7.1}ms ({:4.1}%)",
            ms(self.delaunay),
            pct(self.delaunay, total)
        );
        log::info!(
            "  structure: {:7.1}ms ({:4.1}%)",
            ms(self.structure),
            pct(self.structure, total)
        );
        log::info!("  total:     {:7.1}ms", ms(total));
    }
}

/// Phase timings of one Cocone or BoundCocone run.
#[cfg(feature = "timing")]
#[derive(Debug, Clone, Default)]
pub(crate) struct ReconstructionTimings {
    select: Duration,
    prune: Duration,
    extract: Duration,
    assemble: Duration,
}

#[cfg(feature = "timing")]
impl ReconstructionTimings {
    pub(crate) fn set_select(&mut self, d: Duration) {
        self.select = d;
    }

    pub(crate) fn set_prune(&mut self, d: Duration) {
        self.prune = d;
    }

    pub(crate) fn set_extract(&mut self, d: Duration) {
        self.extract = d;
    }

    pub(crate) fn set_assemble(&mut self, d: Duration) {
        self.assemble = d;
    }

    pub(crate) fn report(&self, facets: usize) {
        let total = self.select + self.prune + self.extract + self.assemble;
        log::info!("[timing] reconstruction facets={}", facets);
        for (name, d) in [
            ("select:  ", self.select),
            ("prune:   ", self.prune),
            ("extract: ", self.extract),
            ("assemble:", self.assemble),
        ] {
            log::info!("  {} {:7.1}ms ({:4.1}%)", name, ms(d), pct(d, total));
        }
        log::info!("  total:    {:7.1}ms", ms(total));
    }
}

/// Dummy timings when feature is disabled (zero-sized).
#[cfg(not(feature = "timing"))]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ConstructionTimings;

#[cfg(not(feature = "timing"))]
impl ConstructionTimings {
    #[inline(always)]
    pub(crate) fn set_delaunay(&mut self, _d: Duration) {}

    #[inline(always)]
    pub(crate) fn set_structure(&mut self, _d: Duration) {}

    #[inline(always)]
    pub(crate) fn report(&self, _n: usize, _dimension: usize) {}
}

/// Dummy timings when feature is disabled (zero-sized).
#[cfg(not(feature = "timing"))]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReconstructionTimings;

#[cfg(not(feature = "timing"))]
impl ReconstructionTimings {
    #[inline(always)]
    pub(crate) fn set_select(&mut self, _d: Duration) {}

    #[inline(always)]
    pub(crate) fn set_prune(&mut self, _d: Duration) {}

    #[inline(always)]
    pub(crate) fn set_extract(&mut self, _d: Duration) {}

    #[inline(always)]
    pub(crate) fn set_assemble(&mut self, _d: Duration) {}

    #[inline(always)]
    pub(crate) fn report(&self, _facets: usize) {}
}

/// Timer that tracks elapsed time when timing is enabled.
#[cfg(feature = "timing")]
pub(crate) struct Timer(std::time::Instant);

#[cfg(feature = "timing")]
impl Timer {
    #[inline]
    pub(crate) fn start() -> Self {
        Self(std::time::Instant::now())
    }

    #[inline]
    pub(crate) fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// Dummy timer when feature is disabled (zero-sized).
#[cfg(not(feature = "timing"))]
pub(crate) struct Timer;

#[cfg(not(feature = "timing"))]
impl Timer {
    #[inline(always)]
    pub(crate) fn start() -> Self {
        Self
    }

    #[inline(always)]
    pub(crate) fn elapsed(&self) -> Duration {
        Duration::ZERO
    }
}
