//! Special-case handling for CFrame rotations.
//!
//! Axis-aligned rotations are abbreviated on the wire to a single id byte
//! instead of nine floats. The id encodes which world axes the rotation's
//! first two rows point along: `id - 1 = x_axis * 6 + y_axis`, where axes
//! number `+X, +Y, +Z, -X, -Y, -Z`. Of the 36 combinations, the 24 with
//! perpendicular rows name real rotations.

use lazy_static::lazy_static;

use rbxl_types::{Matrix3, Vector3};

lazy_static! {
    /// Every valid (id, rotation) pair, used for exact reverse lookup when
    /// encoding.
    static ref SPECIAL_ROTATIONS: Vec<(u8, Matrix3)> = {
        let mut table = Vec::with_capacity(24);

        for id in 0x02..=0x23 {
            if let Some(rotation) = basic_rotation(id) {
                table.push((id, rotation));
            }
        }

        table
    };
}

fn normal(axis: u8) -> Vector3 {
    match axis {
        0 => Vector3::new(1.0, 0.0, 0.0),
        1 => Vector3::new(0.0, 1.0, 0.0),
        2 => Vector3::new(0.0, 0.0, 1.0),
        3 => Vector3::new(-1.0, 0.0, 0.0),
        4 => Vector3::new(0.0, -1.0, 0.0),
        5 => Vector3::new(0.0, 0.0, -1.0),
        _ => unreachable!("axis ids are always in 0..6"),
    }
}

fn cross(a: Vector3, b: Vector3) -> Vector3 {
    Vector3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

fn basic_rotation(id: u8) -> Option<Matrix3> {
    if !(0x02..=0x23).contains(&id) {
        return None;
    }

    let x_axis = (id - 1) / 6;
    let y_axis = (id - 1) % 6;

    // Parallel rows don't name a rotation; those ids are unused.
    if x_axis % 3 == y_axis % 3 {
        return None;
    }

    let x = normal(x_axis);
    let y = normal(y_axis);
    let z = cross(x, y);

    Some(Matrix3::new(x, y, z))
}

/// The rotation named by a special id. Ids outside the table decode to an
/// all-zero matrix; they do not appear in files written by Roblox.
pub(crate) fn rotation_from_id(id: u8) -> Matrix3 {
    basic_rotation(id).unwrap_or_else(|| {
        Matrix3::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
        )
    })
}

/// The special id for a rotation, if its components are an exact bitwise
/// match for a table entry.
pub(crate) fn id_from_rotation(rotation: &Matrix3) -> Option<u8> {
    SPECIAL_ROTATIONS
        .iter()
        .find(|(_, special)| special == rotation)
        .map(|(id, _)| *id)
}

/// Rebuild a rotation matrix from a unit quaternion, used to decode the
/// quaternion flavor of CFrame values.
pub(crate) fn rotation_from_quaternion(x: f32, y: f32, z: f32, w: f32) -> Matrix3 {
    Matrix3::new(
        Vector3::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - z * w),
            2.0 * (x * z + y * w),
        ),
        Vector3::new(
            2.0 * (x * y + z * w),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - x * w),
        ),
        Vector3::new(
            2.0 * (x * z - y * w),
            2.0 * (y * z + x * w),
            1.0 - 2.0 * (x * x + y * y),
        ),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_has_24_entries() {
        assert_eq!(SPECIAL_ROTATIONS.len(), 24);
    }

    #[test]
    fn identity_is_id_two() {
        assert_eq!(id_from_rotation(&Matrix3::identity()), Some(0x02));
        assert_eq!(rotation_from_id(0x02), Matrix3::identity());
    }

    #[test]
    fn ids_and_rotations_are_a_bijection() {
        for (id, rotation) in SPECIAL_ROTATIONS.iter() {
            assert_eq!(id_from_rotation(rotation), Some(*id));
            assert_eq!(rotation_from_id(*id), *rotation);
        }
    }

    #[test]
    fn rotation_about_x_is_id_three() {
        // x = +X, y = +Z gives z = -Y: a quarter turn about the X axis.
        let rotation = Matrix3::new(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, -1.0, 0.0),
        );

        assert_eq!(id_from_rotation(&rotation), Some(0x03));
        assert_eq!(rotation_from_id(0x03), rotation);
    }

    #[test]
    fn unused_ids_decode_to_zero() {
        let zero = Matrix3::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
        );

        // id 1 would pair +X with +X, which is not a rotation.
        assert_eq!(rotation_from_id(0x01), zero);
        assert_eq!(rotation_from_id(0x24), zero);
    }

    #[test]
    fn non_special_rotation_has_no_id() {
        let rotation = Matrix3::new(
            Vector3::new(0.5, 0.5, 0.0),
            Vector3::new(-0.5, 0.5, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        );

        assert_eq!(id_from_rotation(&rotation), None);
    }

    #[test]
    fn identity_quaternion() {
        assert_eq!(
            rotation_from_quaternion(0.0, 0.0, 0.0, 1.0),
            Matrix3::identity()
        );
    }

    #[test]
    fn quarter_turn_quaternion() {
        let half_sqrt_2 = std::f32::consts::FRAC_1_SQRT_2;
        let rotation = rotation_from_quaternion(half_sqrt_2, 0.0, 0.0, half_sqrt_2);

        // A quarter turn about X maps +Y onto +Z: the rotation named by id
        // 0x06. Compare loosely to allow for float rounding.
        let expected = rotation_from_id(0x06);
        for (row, expected_row) in [rotation.x, rotation.y, rotation.z]
            .iter()
            .zip([expected.x, expected.y, expected.z].iter())
        {
            assert!((row.x - expected_row.x).abs() < 1e-6);
            assert!((row.y - expected_row.y).abs() < 1e-6);
            assert!((row.z - expected_row.z).abs() < 1e-6);
        }
    }
}
