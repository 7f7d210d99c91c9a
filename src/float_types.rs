// Our Real scalar type, used for all scene-relative geometry.
// Universal positions (formations, observer, scene origins) are always f64.
#[cfg(feature = "f32")]
pub type Real = f32;
#[cfg(feature = "f64")]
pub type Real = f64;

use core::str::FromStr;
use std::sync::OnceLock;

/// Lazily-initialized length tolerance used to reject degenerate triangles.
/// Defaults depend on precision (`f32` vs `f64`), but can be overridden:
///  1) **Build-time**: set env var `FORMATION_TOLERANCE` (e.g. `FORMATION_TOLERANCE=1e-5 cargo build`)
///  2) **Runtime**: call [`set_tolerance`] once before creating a node buffer
static TOLERANCE_CELL: OnceLock<Real> = OnceLock::new();

#[inline]
const fn default_tolerance() -> Real {
    #[cfg(feature = "f32")]
    {
        1e-4
    }
    #[cfg(feature = "f64")]
    {
        1e-8
    }
}

/// Returns the current tolerance.
/// If not set yet, it tries `FORMATION_TOLERANCE` (parsed as the active `Real`) and
/// falls back to a sensible default.
pub fn tolerance() -> Real {
    *TOLERANCE_CELL.get_or_init(|| {
        if let Some(environment_variable) = option_env!("FORMATION_TOLERANCE") {
            if let Ok(value) = Real::from_str(environment_variable) {
                return value.max(Real::EPSILON);
            }
        }
        default_tolerance()
    })
}

/// Set the tolerance programmatically once (subsequent calls are ignored).
/// Call near program start: `formation::float_types::set_tolerance(1e-5);`
pub fn set_tolerance(value: Real) {
    let _ = TOLERANCE_CELL.set(value.max(Real::EPSILON));
}

/// Narrows a universal (f64) vector into the scene-relative scalar.
#[inline]
pub fn to_real(v: &nalgebra::Vector3<f64>) -> nalgebra::Vector3<Real> {
    nalgebra::Vector3::new(v.x as Real, v.y as Real, v.z as Real)
}
