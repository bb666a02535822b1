use crate::{MeshTriangle, Vector2};

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Returns `None` for an empty point set.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vector2>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            out.min_x = out.min_x.min(p.x);
            out.min_y = out.min_y.min(p.y);
            out.max_x = out.max_x.max(p.x);
            out.max_y = out.max_y.max(p.y);
        }
        Some(out)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    pub fn contains(&self, p: Vector2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// Half-plane containment test, boundary inclusive.
///
/// A point is inside iff the three edge signs never disagree; zero signs agree with anything, so
/// a fully degenerate triangle only rejects points that produce opposing signs. Non-finite
/// inputs are never inside.
pub fn triangle_contains(p: Vector2, a: Vector2, b: Vector2, c: Vector2) -> bool {
    if !(p.is_finite() && a.is_finite() && b.is_finite() && c.is_finite()) {
        return false;
    }
    let d1 = edge_sign(p, a, b);
    let d2 = edge_sign(p, b, c);
    let d3 = edge_sign(p, c, a);

    let has_negative = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_positive = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_negative && has_positive)
}

fn edge_sign(p: Vector2, a: Vector2, b: Vector2) -> f32 {
    (p.x - b.x) * (a.y - b.y) - (a.x - b.x) * (p.y - b.y)
}

/// Whether any triangle contains `p`. Triangles referencing a vertex `position` cannot resolve
/// are skipped.
pub(crate) fn triangles_contain_point<F>(triangles: &[MeshTriangle], position: F, p: Vector2) -> bool
where
    F: Fn(usize) -> Option<Vector2>,
{
    triangles.iter().any(|triangle| {
        let [a, b, c] = triangle.indices;
        match (position(a), position(b), position(c)) {
            (Some(a), Some(b), Some(c)) => triangle_contains(p, a, b, c),
            _ => false,
        }
    })
}

/// Index of the point closest to `p`, if within `max_distance`. A negative or NaN radius matches
/// nothing.
pub(crate) fn nearest_point<I>(points: I, p: Vector2, max_distance: f32) -> Option<usize>
where
    I: IntoIterator<Item = Vector2>,
{
    if max_distance.is_nan() || max_distance < 0.0 {
        return None;
    }
    let max_distance_squared = if max_distance.is_finite() {
        max_distance * max_distance
    } else {
        f32::INFINITY
    };
    let mut best: Option<(usize, f32)> = None;
    for (index, point) in points.into_iter().enumerate() {
        let d = point.distance_squared(p);
        if d > max_distance_squared {
            continue;
        }
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((index, d));
        }
    }
    best.map(|(index, _)| index)
}

/// Signed polygon area, positive for counter-clockwise winding (Y up).
pub fn polygon_signed_area(points: &[Vector2]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0f32;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        area += p.cross(q);
    }
    area * 0.5
}

/// Ear-clipping triangulator for simple polygons.
#[derive(Default)]
pub(crate) struct Triangulator;

impl Triangulator {
    /// Triangulates the outline formed by `points` in order. Either winding is accepted; returned
    /// triangles index into `points`.
    pub(crate) fn triangulate(&self, points: &[Vector2]) -> Vec<[usize; 3]> {
        let vertex_count = points.len();
        if vertex_count < 3 {
            return Vec::new();
        }

        // The ear test below expects clockwise input.
        let mut indices: Vec<usize> = (0..vertex_count).collect();
        if polygon_signed_area(points) > 0.0 {
            indices.reverse();
        }
        let mut is_concave_flags: Vec<bool> = (0..vertex_count)
            .map(|i| is_concave_at(i, vertex_count, points, &indices))
            .collect();

        let mut triangles: Vec<[usize; 3]> = Vec::with_capacity(vertex_count - 2);
        let mut vertex_count = vertex_count;

        while vertex_count > 3 {
            let mut previous = vertex_count - 1;
            let mut next = 1usize;
            let mut i = 0usize;

            loop {
                if !is_concave_flags[i] {
                    let p1 = points[indices[previous]];
                    let p2 = points[indices[i]];
                    let p3 = points[indices[next]];

                    let mut ear = true;
                    let mut ii = (next + 1) % vertex_count;
                    while ii != previous {
                        if is_concave_flags[ii] {
                            let v = points[indices[ii]];
                            if positive_area(p3, p1, v)
                                && positive_area(p1, p2, v)
                                && positive_area(p2, p3, v)
                            {
                                ear = false;
                                break;
                            }
                        }
                        ii = (ii + 1) % vertex_count;
                    }

                    if ear {
                        break;
                    }
                }

                if next == 0 {
                    while i > 0 {
                        if !is_concave_flags[i] {
                            break;
                        }
                        i -= 1;
                    }
                    break;
                }

                previous = i;
                i = next;
                next = (next + 1) % vertex_count;
            }

            triangles.push([
                indices[(vertex_count + i - 1) % vertex_count],
                indices[i],
                indices[(i + 1) % vertex_count],
            ]);

            indices.remove(i);
            is_concave_flags.remove(i);
            vertex_count -= 1;

            let previous_index = (vertex_count + i - 1) % vertex_count;
            let next_index = if i == vertex_count { 0 } else { i };
            is_concave_flags[previous_index] =
                is_concave_at(previous_index, vertex_count, points, &indices);
            is_concave_flags[next_index] =
                is_concave_at(next_index, vertex_count, points, &indices);
        }

        if vertex_count == 3 {
            triangles.push([indices[2], indices[0], indices[1]]);
        }

        triangles
    }
}

fn positive_area(p1: Vector2, p2: Vector2, p3: Vector2) -> bool {
    p1.x * (p3.y - p2.y) + p2.x * (p1.y - p3.y) + p3.x * (p2.y - p1.y) >= 0.0
}

fn is_concave_at(index: usize, vertex_count: usize, points: &[Vector2], indices: &[usize]) -> bool {
    let previous = points[indices[(vertex_count + index - 1) % vertex_count]];
    let current = points[indices[index]];
    let next = points[indices[(index + 1) % vertex_count]];
    !positive_area(previous, current, next)
}
