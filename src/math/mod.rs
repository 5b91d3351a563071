//! Mathematical utilities: the truncated ber / Bessel series and covariance
//! estimation from a least-squares Jacobian.

pub mod covariance;
pub mod series;

pub use covariance::*;
pub use series::*;
