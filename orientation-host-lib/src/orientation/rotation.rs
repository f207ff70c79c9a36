use nalgebra::{Matrix3, Vector3};

const STANDARD_GRAVITY: f32 = 9.80665;
const FREE_FALL_GRAVITY_SQUARED: f32 = 0.01 * STANDARD_GRAVITY * STANDARD_GRAVITY;
const MIN_HORIZONTAL_FIELD: f32 = 0.1;

/// Logical axis a physical device axis is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
    MinusX,
    MinusY,
    MinusZ,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X | Axis::MinusX => 0,
            Axis::Y | Axis::MinusY => 1,
            Axis::Z | Axis::MinusZ => 2,
        }
    }

    fn sign(self) -> f32 {
        match self {
            Axis::X | Axis::Y | Axis::Z => 1.0,
            Axis::MinusX | Axis::MinusY | Axis::MinusZ => -1.0,
        }
    }
}

/// Rotation matrix taking device coordinates to world coordinates (east,
/// north, up), from a gravity and a geomagnetic vector both in device
/// coordinates.
///
/// Returns `None` in free fall or when the field is (nearly) parallel to
/// gravity, e.g. close to a magnetic pole. Non-finite input also gives `None`.
pub fn rotation_matrix(gravity: &Vector3<f32>, geomagnetic: &Vector3<f32>) -> Option<Matrix3<f32>> {
    if !gravity.iter().chain(geomagnetic.iter()).all(|v| v.is_finite()) {
        return None;
    }
    let gravity_norm_squared = gravity.norm_squared();
    if gravity_norm_squared < FREE_FALL_GRAVITY_SQUARED {
        return None;
    }

    let east = geomagnetic.cross(gravity);
    let east_norm = east.norm();
    if east_norm < MIN_HORIZONTAL_FIELD {
        return None;
    }
    let east = east / east_norm;
    let up = gravity / gravity_norm_squared.sqrt();
    let north = up.cross(&east);

    Some(Matrix3::from_rows(&[
        east.transpose(),
        north.transpose(),
        up.transpose(),
    ]))
}

/// Rewrites `r` so the device's `x` axis becomes the new X axis and `y`
/// becomes the new Y axis. The new Z axis keeps the frame right handed.
///
/// Returns `None` when `x` and `y` refer to the same physical axis.
pub fn remap_coordinate_system(r: &Matrix3<f32>, x: Axis, y: Axis) -> Option<Matrix3<f32>> {
    let (xi, yi) = (x.index(), y.index());
    if xi == yi {
        return None;
    }
    let zi = 3 - xi - yi;
    let cyclic = (xi + 1) % 3 == yi;
    let z_sign = x.sign() * y.sign() * if cyclic { 1.0 } else { -1.0 };

    let mut out = Matrix3::zeros();
    for row in 0..3 {
        out[(row, xi)] = x.sign() * r[(row, 0)];
        out[(row, yi)] = y.sign() * r[(row, 1)];
        out[(row, zi)] = z_sign * r[(row, 2)];
    }
    Some(out)
}

/// (azimuth, pitch, roll) in radians.
pub fn orientation_angles(r: &Matrix3<f32>) -> (f32, f32, f32) {
    let azimuth = r[(0, 1)].atan2(r[(1, 1)]);
    // rounding can push |r21| just past 1
    let pitch = (-r[(2, 1)]).clamp(-1.0, 1.0).asin();
    let roll = (-r[(2, 0)]).atan2(r[(2, 2)]);
    (azimuth, pitch, roll)
}
