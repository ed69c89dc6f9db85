use serde::{Deserialize, Serialize};

use crate::domain::{Day, UtcDateTime};
use crate::ValidationError;

/// One named, half-open day-interval `[start, end)`.
///
/// The boundary convention is fixed: left-inclusive, right-exclusive, in
/// whole UTC days counting backward from an anchor instant. The anchor day
/// itself is the exclusive right edge of the newest window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    name: String,
    start: Day,
    end: Day,
}

impl Window {
    pub fn new(name: impl Into<String>, start: Day, end: Day) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyWindowName);
        }
        if end <= start {
            return Err(ValidationError::WindowEmpty { name });
        }
        Ok(Self { name, start, end })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inclusive first day.
    pub const fn start(&self) -> Day {
        self.start
    }

    /// Exclusive end day.
    pub const fn end(&self) -> Day {
        self.end
    }

    pub fn len_days(&self) -> i64 {
        self.end.days_since(self.start)
    }

    pub fn contains_day(&self, day: Day) -> bool {
        self.start <= day && day < self.end
    }

    pub fn contains(&self, ts: UtcDateTime) -> bool {
        self.start.midnight() <= ts && ts < self.end.midnight()
    }

    /// Inclusive last day of the window.
    pub fn last_day(&self) -> Day {
        self.end
            .offset(-1)
            .expect("non-empty window has a previous day")
    }

    /// Iterate every day in `[start, end)`.
    pub fn days(&self) -> impl Iterator<Item = Day> {
        self.start.until(self.last_day())
    }
}

/// Validated ordered set of contiguous, non-overlapping windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    windows: Vec<Window>,
}

impl WindowSpec {
    /// Build a spec from explicit windows. Rejects empty specs, duplicate
    /// names, overlaps, and gaps between consecutive windows.
    pub fn new(windows: Vec<Window>) -> Result<Self, ValidationError> {
        if windows.is_empty() {
            return Err(ValidationError::EmptyWindowSpec);
        }

        for (i, window) in windows.iter().enumerate() {
            if windows[..i].iter().any(|w| w.name == window.name) {
                return Err(ValidationError::DuplicateWindowName {
                    name: window.name.clone(),
                });
            }
        }

        let mut by_start: Vec<&Window> = windows.iter().collect();
        by_start.sort_by_key(|w| w.start);
        for pair in by_start.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if next.start < prev.end {
                return Err(ValidationError::WindowsOverlap {
                    first: prev.name.clone(),
                    second: next.name.clone(),
                });
            }
            if next.start > prev.end {
                return Err(ValidationError::WindowsNotContiguous {
                    first: prev.name.clone(),
                    second: next.name.clone(),
                });
            }
        }

        Ok(Self { windows })
    }

    /// The conventional trailing windows counting backward from `anchor`.
    ///
    /// `trailing_days(anchor, &[30, 60, 90])` yields `d0_30` = the 30 days
    /// before the anchor day, `d31_60`, and `d61_90`, newest first.
    pub fn trailing_days(anchor: UtcDateTime, edges: &[u32]) -> Result<Self, ValidationError> {
        if edges.is_empty() {
            return Err(ValidationError::EmptyWindowSpec);
        }

        let anchor_day = anchor.day();
        let mut windows = Vec::with_capacity(edges.len());
        let mut prev = 0u32;
        for &edge in edges {
            if edge <= prev {
                return Err(ValidationError::WindowEdgesNotAscending);
            }
            let start = anchor_day.offset(-i64::from(edge))?;
            let end = anchor_day.offset(-i64::from(prev))?;
            let lo = if prev == 0 { 0 } else { prev + 1 };
            windows.push(Window::new(format!("d{lo}_{edge}"), start, end)?);
            prev = edge;
        }

        Self::new(windows)
    }

    /// A single trailing window of `days` days before `anchor`.
    pub fn last_days(anchor: UtcDateTime, days: u32) -> Result<Self, ValidationError> {
        Self::trailing_days(anchor, &[days])
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Earliest day covered by any window (inclusive).
    pub fn overall_start(&self) -> Day {
        self.windows
            .iter()
            .map(Window::start)
            .min()
            .expect("spec is never empty")
    }

    /// Day after the last covered day (exclusive).
    pub fn overall_end(&self) -> Day {
        self.windows
            .iter()
            .map(Window::end)
            .max()
            .expect("spec is never empty")
    }

    /// The unique window containing `ts`, if any.
    pub fn claim(&self, ts: UtcDateTime) -> Option<&Window> {
        self.windows.iter().find(|w| w.contains(ts))
    }
}
