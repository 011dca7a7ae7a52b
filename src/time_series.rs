#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPoint {
    /// seconds since the first interaction
    pub t: f64,
    /// hits landed up to and including `t`
    pub hits: f64,
}

impl HitPoint {
    pub fn new(t: f64, hits: f64) -> Self {
        Self { t, hits }
    }
}

impl From<HitPoint> for (f64, f64) {
    fn from(p: HitPoint) -> Self {
        (p.t, p.hits)
    }
}

/// Cumulative hit count at each hit offset, anchored at (0, 0).
pub fn cumulative_hits(offsets: &[f64]) -> Vec<HitPoint> {
    std::iter::once(HitPoint::new(0.0, 0.0))
        .chain(
            offsets
                .iter()
                .enumerate()
                .map(|(i, &t)| HitPoint::new(t, (i + 1) as f64)),
        )
        .collect()
}
