//! Per-zoom configuration values.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// A setting whose value may depend on the zoom level.
///
/// Evaluated with [`at`](Self::at) once per zoom batch.
#[derive(Clone)]
pub enum ZoomParam<T> {
    /// Same value at every zoom level.
    Constant(T),

    /// A default plus zoom-range overrides; the first matching range wins.
    Schedule {
        default: T,
        overrides: Vec<(RangeInclusive<u8>, T)>,
    },

    /// Arbitrary strategy function.
    Custom(Arc<dyn Fn(u8) -> T + Send + Sync>),
}

impl<T: Clone> ZoomParam<T> {
    /// Wraps a strategy function.
    pub fn from_fn(f: impl Fn(u8) -> T + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Value for `zoom`.
    pub fn at(&self, zoom: u8) -> T {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Schedule { default, overrides } => overrides
                .iter()
                .find(|(range, _)| range.contains(&zoom))
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| default.clone()),
            Self::Custom(f) => f(zoom),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ZoomParam<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Schedule { default, overrides } => f
                .debug_struct("Schedule")
                .field("default", default)
                .field("overrides", overrides)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

impl<T> From<T> for ZoomParam<T> {
    fn from(value: T) -> Self {
        Self::Constant(value)
    }
}
