use nalgebra::{DMatrix, DVector};

use crate::gcp::GroundControlPoint;
use crate::math::{vec2f, Vec2f};
use crate::Error;

/// Minimum number of control points required to fit an affine transform
/// (6 unknowns, 2 equations per point)
pub const MIN_GCPS: usize = 3;

/// Relative singular value cutoff below which the control point layout is
/// considered collinear and the fit ill-posed
const RANK_EPSILON: f64 = 1e-10;

/// A 2D affine pixel -> geo transform:
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
///
/// (col, row) are pixel coordinates with origin at the top-left corner,
/// (x, y) are coordinates in the target CRS.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    /// Fits the transform to control points by linear least squares.
    ///
    /// Two independent systems share the same design matrix (one row
    /// `[col, row, 1]` per point): one is solved for (a, b, c) against geo x,
    /// the other for (d, e, f) against geo y. With exactly 3 non-collinear
    /// points the solution is exact; with more it minimizes the sum of
    /// squared residuals.
    ///
    /// Fails with `Error::InsufficientGcps` for fewer than [`MIN_GCPS`]
    /// points and with `Error::DegenerateGcps` when the pixel coordinates
    /// are collinear (rank-deficient design matrix), checked on the singular
    /// values before solving so a near-singular layout can never produce a
    /// NaN-valued transform.
    pub fn from_gcps(gcps: &[GroundControlPoint]) -> Result<AffineTransform, Error> {
        if gcps.len() < MIN_GCPS {
            return Err(Error::InsufficientGcps {
                got: gcps.len(),
                required: MIN_GCPS,
            });
        }
        let n = gcps.len();
        let mut design = Vec::with_capacity(n * 3);
        let mut geo_x = Vec::with_capacity(n);
        let mut geo_y = Vec::with_capacity(n);
        for gcp in gcps {
            design.push(gcp.pixel.x);
            design.push(gcp.pixel.y);
            design.push(1.0);
            geo_x.push(gcp.geo.x);
            geo_y.push(gcp.geo.y);
        }
        let design = DMatrix::from_row_slice(n, 3, &design);
        let svd = design.svd(true, true);

        let (s_min, s_max) = svd
            .singular_values
            .iter()
            .fold((f64::INFINITY, 0.0f64), |(lo, hi), s| {
                (lo.min(*s), hi.max(*s))
            });
        if s_max == 0.0 || s_min <= RANK_EPSILON * s_max {
            return Err(Error::DegenerateGcps(format!(
                "control points are collinear in pixel space (singular values min={:e}, max={:e})",
                s_min, s_max
            )));
        }

        let solve = |rhs: Vec<f64>| -> Result<DVector<f64>, Error> {
            svd.solve(&DVector::from_vec(rhs), 0.0)
                .map_err(|e| Error::DegenerateGcps(e.to_string()))
        };
        let px = solve(geo_x)?;
        let py = solve(geo_y)?;

        Ok(AffineTransform {
            a: px[0],
            b: px[1],
            c: px[2],
            d: py[0],
            e: py[1],
            f: py[2],
        })
    }

    /// Maps a pixel (col, row) to (x, y) in the target CRS
    pub fn apply(&self, pixel: Vec2f) -> Vec2f {
        vec2f(
            self.a * pixel.x + self.b * pixel.y + self.c,
            self.d * pixel.x + self.e * pixel.y + self.f,
        )
    }

    /// Root mean square distance between the mapped pixel positions and the
    /// supplied geo positions. Zero (up to float noise) for an exact fit.
    pub fn rms_residual(&self, gcps: &[GroundControlPoint]) -> f64 {
        if gcps.is_empty() {
            return 0.0;
        }
        let mut sum_sq = 0.0;
        for gcp in gcps {
            let mapped = self.apply(gcp.pixel);
            let err = mapped - gcp.geo;
            sum_sq += err.x * err.x + err.y * err.y;
        }
        (sum_sq / gcps.len() as f64).sqrt()
    }

    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

#[cfg(test)]
mod tests {
    use testutils::{assert_f64_slice_eq, assert_float_eq};

    use super::*;
    use crate::math::vec2f;

    fn gcp(col: f64, row: f64, x: f64, y: f64) -> GroundControlPoint {
        GroundControlPoint::new(vec2f(col, row), vec2f(x, y))
    }

    #[test]
    fn test_three_points_exact() {
        // The end-to-end scenario points: a 100x100 image over a 0.1 x 0.1
        // degree box anchored at (10.0, 50.0)
        let gcps = vec![
            gcp(0.0, 0.0, 10.0, 50.0),
            gcp(100.0, 0.0, 10.1, 50.0),
            gcp(0.0, 100.0, 10.0, 49.9),
        ];
        let transform = AffineTransform::from_gcps(&gcps).unwrap();
        for g in &gcps {
            let mapped = transform.apply(g.pixel);
            assert_float_eq(mapped.x, g.geo.x, 1e-9);
            assert_float_eq(mapped.y, g.geo.y, 1e-9);
        }
        assert_f64_slice_eq(
            &transform.coefficients(),
            &[0.001, 0.0, 10.0, 0.0, -0.001, 50.0],
            1e-9,
        );
        assert!(transform.rms_residual(&gcps) < 1e-9);
    }

    #[test]
    fn test_redundant_exact_point_does_not_change_fit() {
        let base = vec![
            gcp(0.0, 0.0, 10.0, 50.0),
            gcp(100.0, 0.0, 10.1, 50.0),
            gcp(0.0, 100.0, 10.0, 49.9),
        ];
        let transform = AffineTransform::from_gcps(&base).unwrap();

        // A 4th point lying exactly on the fitted transform
        let extra_pixel = vec2f(42.0, 31.0);
        let mut extended = base.clone();
        extended.push(GroundControlPoint::new(
            extra_pixel,
            transform.apply(extra_pixel),
        ));
        let transform2 = AffineTransform::from_gcps(&extended).unwrap();
        assert_f64_slice_eq(
            &transform.coefficients(),
            &transform2.coefficients(),
            1e-9,
        );
    }

    #[test]
    fn test_least_squares_with_outlier() {
        // 4 points on an exact transform, one perturbed: the residual of the
        // fit must not exceed the residual of the unperturbed transform
        let exact = AffineTransform {
            a: 0.5,
            b: 0.0,
            c: -3.0,
            d: 0.0,
            e: -0.5,
            f: 7.0,
        };
        let pixels = [
            vec2f(0.0, 0.0),
            vec2f(10.0, 0.0),
            vec2f(0.0, 10.0),
            vec2f(10.0, 10.0),
        ];
        let mut gcps: Vec<GroundControlPoint> = pixels
            .iter()
            .map(|p| GroundControlPoint::new(*p, exact.apply(*p)))
            .collect();
        gcps[3].geo.x += 0.2;
        gcps[3].geo.y -= 0.1;

        let fitted = AffineTransform::from_gcps(&gcps).unwrap();
        assert!(fitted.rms_residual(&gcps) <= exact.rms_residual(&gcps) + 1e-12);
        // The fit should still be close to the generating transform
        assert_f64_slice_eq(&fitted.coefficients(), &exact.coefficients(), 0.2);
    }

    #[test]
    fn test_insufficient_points() {
        for count in 0..MIN_GCPS {
            let gcps: Vec<GroundControlPoint> = (0..count)
                .map(|i| gcp(i as f64, 2.0 * i as f64, 0.0, 0.0))
                .collect();
            match AffineTransform::from_gcps(&gcps) {
                Err(Error::InsufficientGcps { got, required }) => {
                    assert_eq!(got, count);
                    assert_eq!(required, 3);
                }
                other => panic!("expected InsufficientGcps, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_collinear_points_degenerate() {
        // All on row=0, whatever the geo values
        let gcps = vec![
            gcp(0.0, 0.0, 10.0, 50.0),
            gcp(50.0, 0.0, 10.1, 50.0),
            gcp(100.0, 0.0, 10.2, 49.9),
        ];
        assert!(matches!(
            AffineTransform::from_gcps(&gcps),
            Err(Error::DegenerateGcps(_))
        ));

        // A diagonal line, 4 points
        let gcps = vec![
            gcp(0.0, 0.0, 1.0, 2.0),
            gcp(1.0, 1.0, 3.0, 4.0),
            gcp(2.0, 2.0, 5.0, 6.0),
            gcp(3.0, 3.0, 7.0, 8.0),
        ];
        assert!(matches!(
            AffineTransform::from_gcps(&gcps),
            Err(Error::DegenerateGcps(_))
        ));

        // Coincident points
        let gcps = vec![
            gcp(5.0, 5.0, 1.0, 2.0),
            gcp(5.0, 5.0, 1.0, 2.0),
            gcp(5.0, 5.0, 1.0, 2.0),
        ];
        assert!(matches!(
            AffineTransform::from_gcps(&gcps),
            Err(Error::DegenerateGcps(_))
        ));
    }

    #[test]
    fn test_rotation_recovery() {
        // 90 degree rotation plus translation
        let truth = AffineTransform {
            a: 0.0,
            b: -1.0,
            c: 100.0,
            d: 1.0,
            e: 0.0,
            f: -50.0,
        };
        let gcps: Vec<GroundControlPoint> = [
            vec2f(0.0, 0.0),
            vec2f(30.0, 0.0),
            vec2f(0.0, 20.0),
            vec2f(30.0, 20.0),
            vec2f(15.0, 10.0),
        ]
        .iter()
        .map(|p| GroundControlPoint::new(*p, truth.apply(*p)))
        .collect();
        let fitted = AffineTransform::from_gcps(&gcps).unwrap();
        assert_f64_slice_eq(&fitted.coefficients(), &truth.coefficients(), 1e-9);
    }

    #[test]
    fn test_determinism() {
        let gcps = vec![
            gcp(0.3, 0.7, 10.0, 50.0),
            gcp(99.2, 1.4, 10.1, 50.01),
            gcp(3.0, 98.6, 10.005, 49.9),
            gcp(97.0, 95.0, 10.11, 49.91),
        ];
        let t1 = AffineTransform::from_gcps(&gcps).unwrap();
        let t2 = AffineTransform::from_gcps(&gcps).unwrap();
        assert_eq!(t1, t2);
    }
}
