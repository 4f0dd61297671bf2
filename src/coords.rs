//! Axis swap between the game's convention and a z-up host's.
//!
//! The game stores `(x, y, z)` with y up; hosts such as OBJ consumers in
//! this tool use `(x, z, y)`. The swap is its own inverse and is applied
//! once when data enters or leaves the codec, never inside it.

use crate::types::Vec3;

pub fn to_host(v: Vec3) -> [f32; 3] {
    [v.x, v.z, v.y]
}

pub fn from_host(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[0], v[2], v[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_is_an_involution() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(to_host(v), [1.0, 3.0, 2.0]);
        assert_eq!(from_host(to_host(v)), v);
    }
}
