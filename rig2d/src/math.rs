//! 2D vector and affine transform primitives.
//!
//! Angles are expressed in degrees everywhere in this crate and are kept in the canonical range
//! (-180, 180] whenever they are stored.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Per-component tolerance used by [`Vector2`] equality.
pub const VECTOR_EPSILON: f32 = 1.0e-5;

/// Lengths below this are treated as zero when normalizing.
pub const NORMALIZE_EPSILON: f32 = 1.0e-10;

/// Determinants below this make an [`Affine2`] non-invertible.
const DETERMINANT_EPSILON: f32 = 1.0e-10;

/// Wraps an angle in degrees into (-180, 180].
pub fn wrap_degrees(mut degrees: f32) -> f32 {
    degrees = degrees.rem_euclid(360.0);
    if degrees > 180.0 {
        degrees -= 360.0;
    }
    degrees
}

#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `degrees`.
    pub fn from_angle(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, sin)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns the zero vector instead of dividing by a near-zero length.
    pub fn normalize(self) -> Self {
        let length = self.length();
        if length < NORMALIZE_EPSILON {
            return Self::ZERO;
        }
        Self::new(self.x / length, self.y / length)
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    pub fn distance_squared(self, other: Self) -> f32 {
        (other - self).length_squared()
    }

    /// Direction of this vector in degrees, measured from +X.
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x).to_degrees()
    }

    /// Direction in degrees of the vector from `self` to `other`.
    pub fn angle_to(self, other: Self) -> f32 {
        (other - self).angle()
    }

    pub fn rotate(self, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl PartialEq for Vector2 {
    fn eq(&self, other: &Self) -> bool {
        (self.x - other.x).abs() <= VECTOR_EPSILON && (self.y - other.y).abs() <= VECTOR_EPSILON
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vector2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vector2 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<[f32; 2]> for Vector2 {
    fn from([x, y]: [f32; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Vector2> for [f32; 2] {
    fn from(v: Vector2) -> Self {
        [v.x, v.y]
    }
}

/// Local pose of a bone: translation, rotation (degrees) and non-uniform scale.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform2D {
    pub x: f32,
    pub y: f32,
    rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    pub fn new(x: f32, y: f32, rotation: f32, scale_x: f32, scale_y: f32) -> Self {
        Self {
            x,
            y,
            rotation: wrap_degrees(rotation),
            scale_x,
            scale_y,
        }
    }

    pub fn from_translation(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::IDENTITY
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = wrap_degrees(degrees);
    }

    pub fn position(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    pub fn to_affine(&self) -> Affine2 {
        Affine2::from_transform(self)
    }

    /// Applies `child` in the space of `self`.
    ///
    /// The result is decomposed back into translation/rotation/scale, so shear produced by a
    /// rotated child under non-uniform scale is lost. Use [`Affine2::multiply`] when exactness
    /// matters.
    pub fn compose(&self, child: &Transform2D) -> Transform2D {
        self.to_affine().multiply(&child.to_affine()).to_transform()
    }

    pub fn transform_point(&self, point: Vector2) -> Vector2 {
        self.to_affine().transform_point(point)
    }
}

/// Column-major 2x3 affine matrix. `(a, c)` is the transformed X axis, `(b, d)` the transformed Y
/// axis and `(x, y)` the translation.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Affine2 {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub x: f32,
    pub y: f32,
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2 {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        x: 0.0,
        y: 0.0,
    };

    pub fn from_transform(t: &Transform2D) -> Self {
        let rotation_x = t.rotation.to_radians();
        let rotation_y = (t.rotation + 90.0).to_radians();
        Self {
            a: rotation_x.cos() * t.scale_x,
            b: rotation_y.cos() * t.scale_y,
            c: rotation_x.sin() * t.scale_x,
            d: rotation_y.sin() * t.scale_y,
            x: t.x,
            y: t.y,
        }
    }

    /// Returns `self * child`: `child` expressed in the space described by `self`.
    pub fn multiply(&self, child: &Affine2) -> Affine2 {
        Affine2 {
            a: self.a * child.a + self.b * child.c,
            b: self.a * child.b + self.b * child.d,
            c: self.c * child.a + self.d * child.c,
            d: self.c * child.b + self.d * child.d,
            x: self.a * child.x + self.b * child.y + self.x,
            y: self.c * child.x + self.d * child.y + self.y,
        }
    }

    pub fn transform_point(&self, p: Vector2) -> Vector2 {
        Vector2::new(
            self.a * p.x + self.b * p.y + self.x,
            self.c * p.x + self.d * p.y + self.y,
        )
    }

    pub fn transform_vector(&self, v: Vector2) -> Vector2 {
        Vector2::new(self.a * v.x + self.b * v.y, self.c * v.x + self.d * v.y)
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    pub fn inverse(&self) -> Option<Affine2> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < DETERMINANT_EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        let a = self.d * inv;
        let b = -self.b * inv;
        let c = -self.c * inv;
        let d = self.a * inv;
        Some(Affine2 {
            a,
            b,
            c,
            d,
            x: -(a * self.x + b * self.y),
            y: -(c * self.x + d * self.y),
        })
    }

    pub fn translation(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    /// World rotation of the X axis in degrees.
    pub fn rotation(&self) -> f32 {
        self.c.atan2(self.a).to_degrees()
    }

    pub fn scale_x(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }

    /// Length of the Y axis, negative when the matrix is a reflection.
    pub fn scale_y(&self) -> f32 {
        let s = (self.b * self.b + self.d * self.d).sqrt();
        if self.determinant() < 0.0 { -s } else { s }
    }

    pub fn to_transform(&self) -> Transform2D {
        Transform2D::new(
            self.x,
            self.y,
            self.rotation(),
            self.scale_x(),
            self.scale_y(),
        )
    }
}

#[cfg(feature = "glam")]
mod glam_interop {
    use super::{Affine2, Vector2};

    impl From<glam::Vec2> for Vector2 {
        fn from(v: glam::Vec2) -> Self {
            Self::new(v.x, v.y)
        }
    }

    impl From<Vector2> for glam::Vec2 {
        fn from(v: Vector2) -> Self {
            glam::Vec2::new(v.x, v.y)
        }
    }

    impl From<Affine2> for glam::Affine2 {
        fn from(m: Affine2) -> Self {
            glam::Affine2::from_cols_array(&[m.a, m.c, m.b, m.d, m.x, m.y])
        }
    }

    impl From<glam::Affine2> for Affine2 {
        fn from(m: glam::Affine2) -> Self {
            let [a, c, b, d, x, y] = m.to_cols_array();
            Self { a, b, c, d, x, y }
        }
    }
}
