/// 2D affine transform in CSS `matrix(a, b, c, d, tx, ty)` layout.
///
/// 3D transforms are avoided on purpose: the original engine had to collapse
/// them back to 2D because compositing them together with opacity tweens
/// misrendered, so flipkit is natively 2D.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix2d {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Matrix2d {
    pub const IDENTITY: Matrix2d = Matrix2d {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub const fn translate(tx: f32, ty: f32) -> Self {
        Matrix2d {
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    pub const fn translate_x(tx: f32) -> Self {
        Self::translate(tx, 0.0)
    }

    pub const fn translate_y(ty: f32) -> Self {
        Self::translate(0.0, ty)
    }

    pub const fn scale(sx: f32, sy: f32) -> Self {
        Matrix2d {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    pub const fn scale_x(sx: f32) -> Self {
        Self::scale(sx, 1.0)
    }

    pub const fn scale_y(sy: f32) -> Self {
        Self::scale(1.0, sy)
    }

    /// Column-vector composition: the returned matrix applies `other` first,
    /// then `self`.
    pub fn multiply(&self, other: &Matrix2d) -> Matrix2d {
        Matrix2d {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            tx: self.a * other.tx + self.c * other.ty + self.tx,
            ty: self.b * other.tx + self.d * other.ty + self.ty,
        }
    }

    /// Fold a list of transforms into one matrix, first element applied last
    /// (CSS `transform` list order).
    pub fn compose<'a>(transforms: impl IntoIterator<Item = &'a Matrix2d>) -> Matrix2d {
        transforms
            .into_iter()
            .fold(Matrix2d::IDENTITY, |acc, m| acc.multiply(m))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    pub fn to_css(&self) -> String {
        format!(
            "matrix({}, {}, {}, {}, {}, {})",
            self.a, self.b, self.c, self.d, self.tx, self.ty
        )
    }
}

impl Default for Matrix2d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_then_scale_composes() {
        let m = Matrix2d::compose([&Matrix2d::translate(-50.0, 0.0), &Matrix2d::scale(2.0, 1.0)]);
        assert_eq!(m.apply(0.0, 0.0), (-50.0, 0.0));
        assert_eq!(m.apply(10.0, 0.0), (-30.0, 0.0));
    }

    #[test]
    fn compose_of_nothing_is_identity() {
        assert!(Matrix2d::compose([]).is_identity());
    }

    #[test]
    fn css_serialization_matches_transform_syntax() {
        let m = Matrix2d::translate_x(-50.0).multiply(&Matrix2d::scale_y(0.5));
        assert_eq!(m.to_css(), "matrix(1, 0, 0, 0.5, -50, 0)");
    }

    #[test]
    fn scale_then_counter_scale_cancels() {
        let m = Matrix2d::scale_x(2.0).multiply(&Matrix2d::scale_x(0.5));
        assert!(m.is_identity());
    }
}
