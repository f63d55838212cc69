pub mod api_coverage;
pub mod compliance;
pub mod dictionary;
pub mod routes;
pub mod tables;
pub mod test_coverage;

pub use api_coverage::*;
pub use compliance::*;
pub use dictionary::*;
pub use tables::*;
pub use test_coverage::*;

/// `part / total` as a percentage rounded to two decimals; 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10_000.0).round() / 100.0
}
