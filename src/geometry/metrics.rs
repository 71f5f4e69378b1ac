//! Polygon and polyhedron metrics with analytic gradients.
//!
//! Everything here works on plain coordinate slices so the force laws can
//! evaluate energies without touching the mesh tables. Polygons are vertex
//! cycles (closing edge implied). 2D quantities read the `x`/`y` components
//! and ignore `z`.
//!
//! Face vector area is `S = ½ Σ xᵢ × xᵢ₊₁`; closed-surface volume is
//! `Σ_f ⅓ c_f · S_f` with `c_f` the vertex mean of the face, which is the
//! exact volume of the surface fan-triangulated about each face mean.

use itertools::Itertools;

pub(crate) const EPS: f64 = 1e-12;

#[inline]
pub fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
pub fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    norm(sub(a, b))
}

#[inline]
pub fn midpoint(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    scale(add(a, b), 0.5)
}

/// Linear interpolation `a + t (b - a)`.
#[inline]
pub fn lerp(a: [f64; 3], b: [f64; 3], t: f64) -> [f64; 3] {
    add(a, scale(sub(b, a), t))
}

/// Vertex mean of a point set.
pub fn mean(points: &[[f64; 3]]) -> [f64; 3] {
    if points.is_empty() {
        return [0.0; 3];
    }
    let sum = points.iter().fold([0.0; 3], |acc, p| add(acc, *p));
    scale(sum, 1.0 / points.len() as f64)
}

#[inline]
fn prev_next(i: usize, n: usize) -> (usize, usize) {
    ((i + n - 1) % n, (i + 1) % n)
}

// ---------------------------------------------------------------------------
// Planar (xy) polygon metrics
// ---------------------------------------------------------------------------

/// Signed shoelace area in the xy plane; positive for counter-clockwise.
pub fn signed_area_xy(points: &[[f64; 3]]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a[0] * b[1] - b[0] * a[1];
    }
    0.5 * twice
}

/// Gradient of [`signed_area_xy`] with respect to each vertex.
pub fn signed_area_gradient_xy(points: &[[f64; 3]]) -> Vec<[f64; 3]> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (p, q) = prev_next(i, n);
            [
                0.5 * (points[q][1] - points[p][1]),
                0.5 * (points[p][0] - points[q][0]),
                0.0,
            ]
        })
        .collect()
}

/// Area-weighted centroid in the xy plane (`z` is the vertex mean).
///
/// Falls back to the vertex mean for polygons with vanishing area.
pub fn centroid_xy(points: &[[f64; 3]]) -> [f64; 3] {
    let n = points.len();
    let m = mean(points);
    let area = signed_area_xy(points);
    if area.abs() < EPS {
        return m;
    }
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        // shift to the mean for conditioning
        let a = sub(points[i], m);
        let b = sub(points[(i + 1) % n], m);
        let w = a[0] * b[1] - b[0] * a[1];
        cx += (a[0] + b[0]) * w;
        cy += (a[1] + b[1]) * w;
    }
    [m[0] + cx / (6.0 * area), m[1] + cy / (6.0 * area), m[2]]
}

/// Central second moments `(Sxx, Sxy, Syy)` of a polygon region.
///
/// Returned with the sign of the orientation removed, so they are
/// non-negative for simple polygons of either winding.
pub fn second_moments_xy(points: &[[f64; 3]]) -> [f64; 3] {
    let n = points.len();
    let c = centroid_xy(points);
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let a = sub(points[i], c);
        let b = sub(points[(i + 1) % n], c);
        let w = a[0] * b[1] - b[0] * a[1];
        sxx += w * (a[0] * a[0] + a[0] * b[0] + b[0] * b[0]);
        syy += w * (a[1] * a[1] + a[1] * b[1] + b[1] * b[1]);
        sxy += w * (a[0] * b[1] + 2.0 * a[0] * a[1] + 2.0 * b[0] * b[1] + b[0] * a[1]);
    }
    let sign = if signed_area_xy(points) < 0.0 { -1.0 } else { 1.0 };
    [sign * sxx / 12.0, sign * sxy / 24.0, sign * syy / 12.0]
}

/// Unit direction of the shortest principal axis of a polygon.
///
/// For an isotropic shape the `x` axis is returned.
pub fn short_axis_xy(points: &[[f64; 3]]) -> [f64; 3] {
    let [a, b, c] = second_moments_xy(points);
    let half_diff = 0.5 * (a - c);
    let lambda = 0.5 * (a + c) - (half_diff * half_diff + b * b).sqrt();
    let candidates = [[b, lambda - a, 0.0], [lambda - c, b, 0.0]];
    let scale_ref = (a.abs() + c.abs()).max(EPS);
    for v in candidates {
        let len = norm(v);
        if len > 1e-9 * scale_ref {
            return scale(v, 1.0 / len);
        }
    }
    [1.0, 0.0, 0.0]
}

/// Even-odd containment test in the xy plane. Points on the boundary may
/// report either answer.
pub fn point_in_polygon_xy(p: [f64; 3], polygon: &[[f64; 3]]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x = (b[0] - a[0]) * (p[1] - a[1]) / (b[1] - a[1]) + a[0];
            if p[0] < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[inline]
fn orient_xy(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

#[inline]
fn on_segment_xy(a: [f64; 3], b: [f64; 3], p: [f64; 3]) -> bool {
    p[0] >= a[0].min(b[0]) - EPS
        && p[0] <= a[0].max(b[0]) + EPS
        && p[1] >= a[1].min(b[1]) - EPS
        && p[1] <= a[1].max(b[1]) + EPS
}

/// Whether closed segments `ab` and `cd` intersect in the xy plane.
pub fn segments_intersect_xy(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> bool {
    let d1 = orient_xy(c, d, a);
    let d2 = orient_xy(c, d, b);
    let d3 = orient_xy(a, b, c);
    let d4 = orient_xy(a, b, d);
    if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
    {
        return true;
    }
    (d1.abs() <= EPS && on_segment_xy(c, d, a))
        || (d2.abs() <= EPS && on_segment_xy(c, d, b))
        || (d3.abs() <= EPS && on_segment_xy(a, b, c))
        || (d4.abs() <= EPS && on_segment_xy(a, b, d))
}

/// Pairs of non-adjacent edges `(i, j)` that cross, in the xy plane.
pub fn self_intersections_xy(points: &[[f64; 3]]) -> Vec<(usize, usize)> {
    let n = points.len();
    let mut hits = Vec::new();
    if n < 4 {
        return hits;
    }
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (a, b) = (points[i], points[(i + 1) % n]);
            let (c, d) = (points[j], points[(j + 1) % n]);
            if segments_intersect_xy(a, b, c, d) {
                hits.push((i, j));
            }
        }
    }
    hits
}

/// Parameter `t ∈ [0, 1]` and point of the closest approach of `p` to `ab`.
pub fn closest_point_on_segment(p: [f64; 3], a: [f64; 3], b: [f64; 3]) -> (f64, [f64; 3]) {
    let ab = sub(b, a);
    let len2 = dot(ab, ab);
    if len2 < EPS * EPS {
        return (0.0, a);
    }
    let t = (dot(sub(p, a), ab) / len2).clamp(0.0, 1.0);
    (t, lerp(a, b, t))
}

// ---------------------------------------------------------------------------
// Lengths
// ---------------------------------------------------------------------------

/// Closed-cycle perimeter.
pub fn perimeter(points: &[[f64; 3]]) -> f64 {
    points
        .iter()
        .circular_tuple_windows()
        .map(|(&a, &b)| distance(a, b))
        .sum()
}

/// Gradient of edge length `|a - b|` with respect to `a`; the gradient with
/// respect to `b` is its negation. Zero for coincident endpoints.
pub fn edge_length_gradient(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    let d = sub(a, b);
    let len = norm(d);
    if len < EPS {
        [0.0; 3]
    } else {
        scale(d, 1.0 / len)
    }
}

/// Gradient of [`perimeter`] with respect to each vertex.
pub fn perimeter_gradient(points: &[[f64; 3]]) -> Vec<[f64; 3]> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (p, q) = prev_next(i, n);
            add(
                edge_length_gradient(points[i], points[p]),
                edge_length_gradient(points[i], points[q]),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Faces in 3D
// ---------------------------------------------------------------------------

/// Vector area `½ Σ xᵢ × xᵢ₊₁`; its direction follows the right-hand rule.
pub fn vector_area(points: &[[f64; 3]]) -> [f64; 3] {
    let n = points.len();
    let mut s = [0.0; 3];
    for i in 0..n {
        s = add(s, cross(points[i], points[(i + 1) % n]));
    }
    scale(s, 0.5)
}

/// Unsigned area of a (possibly non-planar) face.
pub fn face_area(points: &[[f64; 3]]) -> f64 {
    norm(vector_area(points))
}

/// Gradient of [`face_area`]: `½ (xᵢ₊₁ − xᵢ₋₁) × n̂`.
pub fn face_area_gradient(points: &[[f64; 3]]) -> Vec<[f64; 3]> {
    let n = points.len();
    let s = vector_area(points);
    let area = norm(s);
    if area < EPS {
        return vec![[0.0; 3]; n];
    }
    let unit = scale(s, 1.0 / area);
    (0..n)
        .map(|i| {
            let (p, q) = prev_next(i, n);
            scale(cross(sub(points[q], points[p]), unit), 0.5)
        })
        .collect()
}

/// Volume contribution `⅓ c·S` of one outward-oriented face and its
/// gradient with respect to the face vertices.
pub fn face_volume_term(points: &[[f64; 3]]) -> (f64, Vec<[f64; 3]>) {
    let n = points.len();
    if n == 0 {
        return (0.0, Vec::new());
    }
    let c = mean(points);
    let s = vector_area(points);
    let value = dot(c, s) / 3.0;
    let from_mean = scale(s, 1.0 / (3.0 * n as f64));
    let grads = (0..n)
        .map(|i| {
            let (p, q) = prev_next(i, n);
            add(from_mean, scale(cross(sub(points[q], points[p]), c), 1.0 / 6.0))
        })
        .collect();
    (value, grads)
}

/// Enclosed volume of a closed surface given as outward-oriented faces.
pub fn polyhedron_volume(faces: &[Vec<[f64; 3]>]) -> f64 {
    faces.iter().map(|f| dot(mean(f), vector_area(f)) / 3.0).sum()
}

/// Volume-weighted centroid from the fan tetrahedra of each face.
pub fn polyhedron_centroid(faces: &[Vec<[f64; 3]>]) -> [f64; 3] {
    let all: Vec<[f64; 3]> = faces.iter().flatten().copied().collect();
    let origin = mean(&all);
    let mut total = 0.0;
    let mut acc = [0.0; 3];
    for face in faces {
        let n = face.len();
        let c = sub(mean(face), origin);
        for i in 0..n {
            let a = sub(face[i], origin);
            let b = sub(face[(i + 1) % n], origin);
            let v = dot(c, cross(a, b)) / 6.0;
            total += v;
            acc = add(acc, scale(add(add(c, a), b), v / 4.0));
        }
    }
    if total.abs() < EPS {
        return origin;
    }
    add(origin, scale(acc, 1.0 / total))
}
