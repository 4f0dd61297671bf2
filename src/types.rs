use crate::codec::{ByteReader, ByteWriter};
use crate::error::Result;
use std::ops::{Add, Mul};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const ONE: Vec3 = Vec3::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn read(reader: &mut ByteReader<'_>, field: &'static str) -> Result<Self> {
        let x = reader.read_f32(field)?;
        let y = reader.read_f32(field)?;
        let z = reader.read_f32(field)?;
        Ok(Self { x, y, z })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_f32(self.x)?;
        writer.write_f32(self.y)?;
        writer.write_f32(self.z)
    }

    pub fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn normalized(self) -> Vec3 {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if len == 0.0 {
            return Vec3::ZERO;
        }
        Vec3::new(self.x / len, self.y / len, self.z / len)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Bit pattern used for exact-record hashing.
    pub(crate) fn bits(self) -> [u32; 3] {
        [self.x.to_bits(), self.y.to_bits(), self.z.to_bits()]
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color4 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color4 {
    pub const WHITE: Color4 = Color4::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn read(reader: &mut ByteReader<'_>, field: &'static str) -> Result<Self> {
        let bytes = reader.read_bytes(field, 4)?;
        Ok(Self::new(bytes[0], bytes[1], bytes[2], bytes[3]))
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_bytes(&[self.r, self.g, self.b, self.a])
    }

    /// Channels scaled to `0.0..=1.0`.
    pub fn to_unit(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a].map(|c| c as f32 / 255.0)
    }

    pub fn from_unit(c: [f32; 4]) -> Self {
        let [r, g, b, a] = c.map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8);
        Self::new(r, g, b, a)
    }
}

impl Default for Color4 {
    fn default() -> Self {
        Color4::WHITE
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn read(reader: &mut ByteReader<'_>, field: &'static str) -> Result<Self> {
        let x = reader.read_f32(field)?;
        let y = reader.read_f32(field)?;
        let z = reader.read_f32(field)?;
        let w = reader.read_f32(field)?;
        Ok(Self { x, y, z, w })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_f32(self.x)?;
        writer.write_f32(self.y)?;
        writer.write_f32(self.z)?;
        writer.write_f32(self.w)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}

/// Row-major 3x3 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3 {
    pub m: [f32; 9],
}

impl Matrix3 {
    pub const IDENTITY: Matrix3 = Matrix3 {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    pub const fn from_rows(m: [f32; 9]) -> Self {
        Self { m }
    }

    pub fn read(reader: &mut ByteReader<'_>, field: &'static str) -> Result<Self> {
        let mut m = [0.0f32; 9];
        for value in &mut m {
            *value = reader.read_f32(field)?;
        }
        Ok(Self { m })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        for value in self.m {
            writer.write_f32(value)?;
        }
        Ok(())
    }

    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.m[row * 3 + col]
    }

    pub fn transform(&self, v: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0] * v.x + m[1] * v.y + m[2] * v.z,
            m[3] * v.x + m[4] * v.y + m[5] * v.z,
            m[6] * v.x + m[7] * v.y + m[8] * v.z,
        )
    }
}

impl Mul for Matrix3 {
    type Output = Matrix3;

    fn mul(self, rhs: Matrix3) -> Matrix3 {
        let mut m = [0.0f32; 9];
        for row in 0..3 {
            for col in 0..3 {
                m[row * 3 + col] = (0..3).map(|k| self.at(row, k) * rhs.at(k, col)).sum();
            }
        }
        Matrix3 { m }
    }
}

impl Default for Matrix3 {
    fn default() -> Self {
        Matrix3::IDENTITY
    }
}

/// Minimal capability shared by static and skinned vertices.
pub trait VertexLike {
    fn position(&self) -> Vec3;
    fn color(&self) -> Color4;
}
