//! Pure decision tables for the derived fact sheet fields.

/// Maturity levels in ascending order, as defined by the workspace data model
/// for `currentMaturity` and `targetMaturity`.
pub const MATURITY_LEVELS: [&str; 5] = ["adhoc", "repeatable", "defined", "managed", "optimized"];

/// Gap labels indexed by the absolute distance between two maturity levels.
pub const MATURITY_GAPS: [&str; 5] = ["aligned", "low", "medium", "large", "max"];

pub const OPERATIONAL: &str = "operational";
pub const DEPRECATED: &str = "deprecated";

/// Lifecycle phase that marks an application as deprecated.
pub const END_OF_LIFE: &str = "endOfLife";

fn maturity_index(level: &str) -> Option<usize> {
    MATURITY_LEVELS.iter().position(|known| *known == level)
}

/// Gap between `current` and `target` maturity.
///
/// `None` when either side is unset or not a known level.
pub fn maturity_gap(current: Option<&str>, target: Option<&str>) -> Option<&'static str> {
    let current = maturity_index(current?)?;
    let target = maturity_index(target?)?;
    Some(MATURITY_GAPS[current.abs_diff(target)])
}

/// Operational status implied by an application's lifecycle phase.
pub fn operational_status(lifecycle: Option<&str>) -> Option<&'static str> {
    match lifecycle? {
        "-" => None,
        END_OF_LIFE => Some(DEPRECATED),
        _ => Some(OPERATIONAL),
    }
}
