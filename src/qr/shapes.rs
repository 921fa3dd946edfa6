//! Module and eye geometry.
//!
//! Every dot shape and eye shape maps to a pure function from a bounding box
//! to a list of filled [`Primitive`]s. The mapping is a constant table
//! indexed by the enum discriminant, so adding a shape means adding one enum
//! variant and one table entry.

use image::{Rgba, RgbaImage};

use super::style::{DotShape, EyeShape};
use crate::raster::blend_pixel;

/// Sub-pixel samples per axis used for anti-aliased coverage.
const SUPERSAMPLE: u32 = 4;

/// Line segments used to flatten one cubic bezier.
const CURVE_STEPS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Same center, sides multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Rect {
        let c = self.center();
        let w = self.w * factor;
        let h = self.h * factor;
        Rect::new(c.x - w / 2.0, c.y - h / 2.0, w, h)
    }

    /// Shrinks each side by `by` pixels.
    pub fn inset(&self, by: f32) -> Rect {
        Rect::new(
            self.x + by,
            self.y + by,
            (self.w - 2.0 * by).max(0.0),
            (self.h - 2.0 * by).max(0.0),
        )
    }

    /// Maps a point given in unit coordinates of this box to pixel space.
    pub fn at(&self, u: f32, v: f32) -> Point {
        Point::new(self.x + u * self.w, self.y + v * self.h)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }
}

/// One piece of a closed outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Point),
    Cubic(Point, Point, Point),
}

/// Closed outline starting at `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub start: Point,
    pub segments: Vec<Segment>,
}

impl Path {
    /// Closed polygon through `points`.
    pub fn polygon(points: &[Point]) -> Self {
        let start = points.first().copied().unwrap_or(Point::new(0.0, 0.0));
        Self {
            start,
            segments: points.iter().skip(1).map(|p| Segment::Line(*p)).collect(),
        }
    }

    pub fn has_curves(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Cubic(..)))
    }

    /// Approximates the outline as a polygon.
    pub fn flatten(&self) -> Vec<Point> {
        let mut points = vec![self.start];
        let mut current = self.start;
        for segment in &self.segments {
            match *segment {
                Segment::Line(p) => {
                    points.push(p);
                    current = p;
                }
                Segment::Cubic(c1, c2, end) => {
                    for step in 1..=CURVE_STEPS {
                        let t = step as f32 / CURVE_STEPS as f32;
                        points.push(cubic_point(current, c1, c2, end, t));
                    }
                    current = end;
                }
            }
        }
        points
    }
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

/// A fillable region.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect(Rect),
    RoundedRect { rect: Rect, radius: f32 },
    Ellipse { center: Point, rx: f32, ry: f32 },
    Path(Path),
}

impl Shape {
    pub fn circle(center: Point, r: f32) -> Self {
        Shape::Ellipse { center, rx: r, ry: r }
    }

    /// Pixel bounds as `(x0, y0, x1, y1)`.
    fn bounds(&self) -> (f32, f32, f32, f32) {
        match self {
            Shape::Rect(r) | Shape::RoundedRect { rect: r, .. } => (r.x, r.y, r.x + r.w, r.y + r.h),
            Shape::Ellipse { center, rx, ry } => {
                (center.x - rx, center.y - ry, center.x + rx, center.y + ry)
            }
            Shape::Path(path) => {
                let pts = path.flatten();
                pts.iter().fold(
                    (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
                    |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
                )
            }
        }
    }

    /// Outline as segments. Rectangles come out as four straight edges.
    pub fn outline(&self) -> Path {
        match self {
            Shape::Rect(r) => Path::polygon(&[r.at(0.0, 0.0), r.at(1.0, 0.0), r.at(1.0, 1.0), r.at(0.0, 1.0)]),
            Shape::RoundedRect { rect, radius } => rounded_rect_path(rect, *radius),
            Shape::Ellipse { center, rx, ry } => ellipse_path(*center, *rx, *ry),
            Shape::Path(path) => path.clone(),
        }
    }
}

/// Kappa for approximating a quarter circle with one cubic.
const KAPPA: f32 = 0.552_284_8;

fn ellipse_path(c: Point, rx: f32, ry: f32) -> Path {
    let (kx, ky) = (rx * KAPPA, ry * KAPPA);
    Path {
        start: Point::new(c.x + rx, c.y),
        segments: vec![
            Segment::Cubic(Point::new(c.x + rx, c.y + ky), Point::new(c.x + kx, c.y + ry), Point::new(c.x, c.y + ry)),
            Segment::Cubic(Point::new(c.x - kx, c.y + ry), Point::new(c.x - rx, c.y + ky), Point::new(c.x - rx, c.y)),
            Segment::Cubic(Point::new(c.x - rx, c.y - ky), Point::new(c.x - kx, c.y - ry), Point::new(c.x, c.y - ry)),
            Segment::Cubic(Point::new(c.x + kx, c.y - ry), Point::new(c.x + rx, c.y - ky), Point::new(c.x + rx, c.y)),
        ],
    }
}

fn rounded_rect_path(r: &Rect, radius: f32) -> Path {
    let rad = radius.min(r.w / 2.0).min(r.h / 2.0).max(0.0);
    let k = rad * KAPPA;
    let (x0, y0, x1, y1) = (r.x, r.y, r.x + r.w, r.y + r.h);
    Path {
        start: Point::new(x0 + rad, y0),
        segments: vec![
            Segment::Line(Point::new(x1 - rad, y0)),
            Segment::Cubic(Point::new(x1 - rad + k, y0), Point::new(x1, y0 + rad - k), Point::new(x1, y0 + rad)),
            Segment::Line(Point::new(x1, y1 - rad)),
            Segment::Cubic(Point::new(x1, y1 - rad + k), Point::new(x1 - rad + k, y1), Point::new(x1 - rad, y1)),
            Segment::Line(Point::new(x0 + rad, y1)),
            Segment::Cubic(Point::new(x0 + rad - k, y1), Point::new(x0, y1 - rad + k), Point::new(x0, y1 - rad)),
            Segment::Line(Point::new(x0, y0 + rad)),
            Segment::Cubic(Point::new(x0, y0 + rad - k), Point::new(x0 + rad - k, y0), Point::new(x0 + rad, y0)),
        ],
    }
}

/// What a primitive paints, which decides its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Ordinary data module.
    Module,
    /// Outer ring of a finder pattern.
    EyeOuter,
    /// Inner square of a finder pattern.
    EyeInner,
}

/// A shape, optionally with a hole cut out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub shape: Shape,
    pub hole: Option<Shape>,
    pub role: Role,
}

impl Primitive {
    fn module(shape: Shape) -> Self {
        Self {
            shape,
            hole: None,
            role: Role::Module,
        }
    }

    fn ring(outer: Shape, hole: Shape) -> Self {
        Self {
            shape: outer,
            hole: Some(hole),
            role: Role::EyeOuter,
        }
    }

    fn eye_inner(shape: Shape) -> Self {
        Self {
            shape,
            hole: None,
            role: Role::EyeInner,
        }
    }
}

/// Pure drawing function for one shape.
pub type ShapeFn = fn(Rect) -> Vec<Primitive>;

const DOT_PAINTERS: [ShapeFn; 12] = [
    dot_square,
    dot_rounded,
    dot_circle,
    dot_diamond,
    dot_pixel,
    dot_mosaic,
    dot_microdot,
    dot_star,
    dot_hexagon,
    dot_bevel,
    dot_liquid,
    dot_heart,
];

const EYE_PAINTERS: [ShapeFn; 4] = [eye_square, eye_circular, eye_rounded, eye_diamond];

impl DotShape {
    pub fn painter(self) -> ShapeFn {
        DOT_PAINTERS[self as usize]
    }
}

impl EyeShape {
    /// Painter for a finder pattern whose bounding box is 7x7 modules.
    pub fn painter(self) -> ShapeFn {
        EYE_PAINTERS[self as usize]
    }
}

fn dot_square(b: Rect) -> Vec<Primitive> {
    vec![Primitive::module(Shape::Rect(b))]
}

fn dot_rounded(b: Rect) -> Vec<Primitive> {
    vec![Primitive::module(Shape::RoundedRect {
        rect: b,
        radius: b.w * 0.3,
    })]
}

fn dot_circle(b: Rect) -> Vec<Primitive> {
    vec![Primitive::module(Shape::circle(b.center(), b.w * 0.5))]
}

fn dot_diamond(b: Rect) -> Vec<Primitive> {
    vec![Primitive::module(Shape::Path(Path::polygon(&[
        b.at(0.5, 0.0),
        b.at(1.0, 0.5),
        b.at(0.5, 1.0),
        b.at(0.0, 0.5),
    ])))]
}

fn dot_pixel(b: Rect) -> Vec<Primitive> {
    vec![Primitive::module(Shape::Rect(b.scaled(0.8)))]
}

/// Four quarter tiles plus a center tile, so the module center is always dark.
fn dot_mosaic(b: Rect) -> Vec<Primitive> {
    let (hw, hh) = (b.w / 2.0, b.h / 2.0);
    let mut tiles: Vec<Primitive> = [(0.0, 0.0), (hw, 0.0), (0.0, hh), (hw, hh)]
        .iter()
        .map(|(dx, dy)| {
            let tile = Rect::new(b.x + dx, b.y + dy, hw, hh).scaled(0.8);
            Primitive::module(Shape::Rect(tile))
        })
        .collect();
    tiles.push(Primitive::module(Shape::Rect(b.scaled(0.4))));
    tiles
}

fn dot_microdot(b: Rect) -> Vec<Primitive> {
    vec![Primitive::module(Shape::circle(b.center(), b.w * 0.3))]
}

fn dot_star(b: Rect) -> Vec<Primitive> {
    let c = b.center();
    let outer = b.w * 0.5;
    let inner = outer * 0.4;
    let points: Vec<Point> = (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { outer } else { inner };
            let angle = (-90.0 + 36.0 * i as f32).to_radians();
            Point::new(c.x + r * angle.cos(), c.y + r * angle.sin())
        })
        .collect();
    vec![Primitive::module(Shape::Path(Path::polygon(&points)))]
}

fn dot_hexagon(b: Rect) -> Vec<Primitive> {
    let c = b.center();
    let r = b.w * 0.5;
    let points: Vec<Point> = (0..6)
        .map(|i| {
            let angle = (-90.0 + 60.0 * i as f32).to_radians();
            Point::new(c.x + r * angle.cos(), c.y + r * angle.sin())
        })
        .collect();
    vec![Primitive::module(Shape::Path(Path::polygon(&points)))]
}

fn dot_bevel(b: Rect) -> Vec<Primitive> {
    let k = 0.25;
    vec![Primitive::module(Shape::Path(Path::polygon(&[
        b.at(k, 0.0),
        b.at(1.0 - k, 0.0),
        b.at(1.0, k),
        b.at(1.0, 1.0 - k),
        b.at(1.0 - k, 1.0),
        b.at(k, 1.0),
        b.at(0.0, 1.0 - k),
        b.at(0.0, k),
    ])))]
}

/// Superellipse (|x|^4 + |y|^4 = 1) filling the box.
fn dot_liquid(b: Rect) -> Vec<Primitive> {
    vec![Primitive::module(Shape::Path(superellipse(b, 4.0, 32)))]
}

/// Two cubic lobes meeting at a bottom point, scaled to 90% of the box.
fn dot_heart(b: Rect) -> Vec<Primitive> {
    let h = b.scaled(0.9);
    let path = Path {
        start: h.at(0.5, 0.25),
        segments: vec![
            Segment::Cubic(h.at(0.35, 0.0), h.at(0.0, 0.05), h.at(0.0, 0.35)),
            Segment::Cubic(h.at(0.0, 0.6), h.at(0.35, 0.75), h.at(0.5, 1.0)),
            Segment::Cubic(h.at(0.65, 0.75), h.at(1.0, 0.6), h.at(1.0, 0.35)),
            Segment::Cubic(h.at(1.0, 0.05), h.at(0.65, 0.0), h.at(0.5, 0.25)),
        ],
    };
    vec![Primitive::module(Shape::Path(path))]
}

/// Polygon approximation of a superellipse inscribed in `b`.
pub fn superellipse(b: Rect, n: f32, steps: usize) -> Path {
    let c = b.center();
    let (a, bb) = (b.w / 2.0, b.h / 2.0);
    let points: Vec<Point> = (0..steps)
        .map(|i| {
            let t = i as f32 / steps as f32 * std::f32::consts::TAU;
            let (s, co) = t.sin_cos();
            let x = co.abs().powf(2.0 / n) * a * co.signum();
            let y = s.abs().powf(2.0 / n) * bb * s.signum();
            Point::new(c.x + x, c.y + y)
        })
        .collect();
    Path::polygon(&points)
}

fn eye_square(b: Rect) -> Vec<Primitive> {
    let m = b.w / 7.0;
    vec![
        Primitive::ring(Shape::Rect(b), Shape::Rect(b.inset(m))),
        Primitive::eye_inner(Shape::Rect(b.inset(2.0 * m))),
    ]
}

fn eye_circular(b: Rect) -> Vec<Primitive> {
    let m = b.w / 7.0;
    let c = b.center();
    vec![
        Primitive::ring(Shape::circle(c, 3.5 * m), Shape::circle(c, 2.5 * m)),
        Primitive::eye_inner(Shape::circle(c, 1.5 * m)),
    ]
}

/// Corner radii stay at one module or less so the ring keeps its 1:1:3:1:1 runs.
fn eye_rounded(b: Rect) -> Vec<Primitive> {
    let m = b.w / 7.0;
    vec![
        Primitive::ring(
            Shape::RoundedRect { rect: b, radius: m },
            Shape::RoundedRect { rect: b.inset(m), radius: 0.6 * m },
        ),
        Primitive::eye_inner(Shape::RoundedRect {
            rect: b.inset(2.0 * m),
            radius: 0.5 * m,
        }),
    ]
}

fn eye_diamond(b: Rect) -> Vec<Primitive> {
    let m = b.w / 7.0;
    let diamond = |r: Rect| {
        Shape::Path(Path::polygon(&[r.at(0.5, 0.0), r.at(1.0, 0.5), r.at(0.5, 1.0), r.at(0.0, 0.5)]))
    };
    vec![
        Primitive::ring(diamond(b), diamond(b.inset(m))),
        Primitive::eye_inner(diamond(b.inset(2.0 * m))),
    ]
}

// ---------------------------------------------------------------------------
// Filling
// ---------------------------------------------------------------------------

/// Point-in-region test with curves already flattened.
pub(crate) enum Region {
    Rect(Rect),
    RoundedRect { rect: Rect, radius: f32 },
    Ellipse { center: Point, rx: f32, ry: f32 },
    Polygon(Vec<Point>),
}

impl Region {
    pub(crate) fn new(shape: &Shape) -> Self {
        match shape {
            Shape::Rect(r) => Region::Rect(*r),
            Shape::RoundedRect { rect, radius } => Region::RoundedRect {
                rect: *rect,
                radius: radius.min(rect.w / 2.0).min(rect.h / 2.0).max(0.0),
            },
            Shape::Ellipse { center, rx, ry } => Region::Ellipse {
                center: *center,
                rx: *rx,
                ry: *ry,
            },
            Shape::Path(path) => Region::Polygon(path.flatten()),
        }
    }

    pub(crate) fn contains(&self, p: Point) -> bool {
        match self {
            Region::Rect(r) => r.contains(p),
            Region::RoundedRect { rect, radius } => {
                if !rect.contains(p) {
                    return false;
                }
                let cx = p.x.clamp(rect.x + radius, rect.x + rect.w - radius);
                let cy = p.y.clamp(rect.y + radius, rect.y + rect.h - radius);
                let (dx, dy) = (p.x - cx, p.y - cy);
                dx * dx + dy * dy <= radius * radius
            }
            Region::Ellipse { center, rx, ry } => {
                if *rx <= 0.0 || *ry <= 0.0 {
                    return false;
                }
                let dx = (p.x - center.x) / rx;
                let dy = (p.y - center.y) / ry;
                dx * dx + dy * dy <= 1.0
            }
            Region::Polygon(points) => polygon_contains(points, p),
        }
    }
}

/// Even-odd rule.
fn polygon_contains(points: &[Point], p: Point) -> bool {
    let mut inside = false;
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Fraction of pixel `(x, y)` covered, using a regular sub-pixel grid.
pub(crate) fn pixel_coverage(x: u32, y: u32, inside: impl Fn(Point) -> bool) -> f32 {
    let mut hits = 0;
    for sy in 0..SUPERSAMPLE {
        for sx in 0..SUPERSAMPLE {
            let p = Point::new(
                x as f32 + (sx as f32 + 0.5) / SUPERSAMPLE as f32,
                y as f32 + (sy as f32 + 0.5) / SUPERSAMPLE as f32,
            );
            if inside(p) {
                hits += 1;
            }
        }
    }
    hits as f32 / (SUPERSAMPLE * SUPERSAMPLE) as f32
}

/// Paints `primitive` onto `img` in `color`, anti-aliased.
pub(crate) fn fill_primitive(img: &mut RgbaImage, primitive: &Primitive, color: Rgba<u8>) {
    fill_shape(img, &primitive.shape, primitive.hole.as_ref(), color);
}

/// Paints `shape` minus `hole` onto `img` in `color`, anti-aliased.
pub(crate) fn fill_shape(img: &mut RgbaImage, shape: &Shape, hole: Option<&Shape>, color: Rgba<u8>) {
    let region = Region::new(shape);
    let hole = hole.map(Region::new);
    let (x0, y0, x1, y1) = shape.bounds();
    if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
        return;
    }
    let px0 = x0.floor().max(0.0) as u32;
    let py0 = y0.floor().max(0.0) as u32;
    let px1 = (x1.ceil().max(0.0) as u32).min(img.width());
    let py1 = (y1.ceil().max(0.0) as u32).min(img.height());

    for y in py0..py1 {
        for x in px0..px1 {
            let coverage = pixel_coverage(x, y, |p| {
                region.contains(p) && !hole.as_ref().is_some_and(|h| h.contains(p))
            });
            if coverage > 0.0 {
                blend_pixel(img.get_pixel_mut(x, y), color, coverage);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX: Rect = Rect::new(0.0, 0.0, 20.0, 20.0);

    fn painted(shape: DotShape) -> RgbaImage {
        let mut img = RgbaImage::new(20, 20);
        for p in shape.painter()(BOX) {
            fill_primitive(&mut img, &p, Rgba([0, 0, 0, 255]));
        }
        img
    }

    fn ink(img: &RgbaImage) -> u64 {
        img.pixels().map(|p| u64::from(p.0[3])).sum()
    }

    #[test]
    fn test_tables_follow_enum_order() {
        for (i, shape) in DotShape::ALL.iter().enumerate() {
            assert_eq!(*shape as usize, i);
        }
        for (i, shape) in EyeShape::ALL.iter().enumerate() {
            assert_eq!(*shape as usize, i);
        }
    }

    #[test]
    fn test_heart_uses_curves() {
        let prims = DotShape::Heart.painter()(BOX);
        assert_eq!(prims.len(), 1);
        let outline = prims[0].shape.outline();
        assert!(outline.has_curves());
        assert!(outline.segments.iter().all(|s| matches!(s, Segment::Cubic(..))));
    }

    #[test]
    fn test_square_is_four_straight_edges() {
        let prims = DotShape::Square.painter()(BOX);
        let outline = prims[0].shape.outline();
        assert!(!outline.has_curves());
        // Start point plus three line segments closes back to start: 4 edges.
        assert_eq!(outline.segments.len() + 1, 4);
    }

    #[test]
    fn test_heart_differs_from_square() {
        let heart = painted(DotShape::Heart);
        let square = painted(DotShape::Square);
        assert_ne!(heart, square);
        assert!(ink(&heart) < ink(&square));
        // Bottom point is inside, bottom corners are not.
        assert!(heart.get_pixel(10, 17).0[3] > 0);
        assert_eq!(heart.get_pixel(1, 18).0[3], 0);
        // Notch between the lobes at the top center stays empty.
        assert_eq!(heart.get_pixel(10, 2).0[3], 0);
    }

    #[test]
    fn test_heart_fits_in_ninety_percent_box() {
        let heart = painted(DotShape::Heart);
        for (x, y, p) in heart.enumerate_pixels() {
            if x == 0 || y == 0 || x == 19 || y == 19 {
                assert_eq!(p.0[3], 0, "heart bled into border pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_every_dot_paints_within_its_box() {
        for shape in DotShape::ALL {
            let mut img = RgbaImage::new(40, 40);
            let b = Rect::new(10.0, 10.0, 20.0, 20.0);
            for p in shape.painter()(b) {
                fill_primitive(&mut img, &p, Rgba([0, 0, 0, 255]));
            }
            for (x, y, p) in img.enumerate_pixels() {
                if !(10..30).contains(&x) || !(10..30).contains(&y) {
                    assert_eq!(p.0[3], 0, "{shape:?} painted outside at ({x}, {y})");
                }
            }
            assert!(ink(&img) > 0, "{shape:?} painted nothing");
        }
    }

    #[test]
    fn test_every_dot_covers_module_center() {
        for shape in DotShape::ALL {
            let covered = shape
                .painter()(BOX)
                .iter()
                .any(|p| Region::new(&p.shape).contains(BOX.center()));
            assert!(covered, "{shape:?} leaves the module center empty");
            assert!(painted(shape).get_pixel(10, 10).0[3] > 127, "{shape:?}");
        }
    }

    #[test]
    fn test_rounded_eye_corner_radius_at_most_one_module() {
        let b = Rect::new(0.0, 0.0, 70.0, 70.0);
        for p in EyeShape::Rounded.painter()(b) {
            if let Shape::RoundedRect { radius, .. } = p.shape {
                assert!(radius <= 10.0, "radius {radius}");
            }
        }
    }

    #[test]
    fn test_square_fills_everything() {
        let img = painted(DotShape::Square);
        assert!(img.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn test_circle_leaves_corners() {
        let img = painted(DotShape::Circle);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(10, 10).0[3], 255);
    }

    #[test]
    fn test_eye_ring_has_hole() {
        for eye in EyeShape::ALL {
            let b = Rect::new(0.0, 0.0, 70.0, 70.0);
            let prims = eye.painter()(b);
            assert_eq!(prims.len(), 2);
            assert_eq!(prims[0].role, Role::EyeOuter);
            assert!(prims[0].hole.is_some());
            assert_eq!(prims[1].role, Role::EyeInner);

            let mut img = RgbaImage::new(70, 70);
            fill_primitive(&mut img, &prims[0], Rgba([0, 0, 0, 255]));
            // Center lies in the hole of the ring.
            assert_eq!(img.get_pixel(35, 35).0[3], 0, "{eye:?}");
            fill_primitive(&mut img, &prims[1], Rgba([0, 0, 0, 255]));
            assert_eq!(img.get_pixel(35, 35).0[3], 255, "{eye:?}");
        }
    }

    #[test]
    fn test_polygon_contains() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        assert!(polygon_contains(&square, Point::new(2.0, 2.0)));
        assert!(!polygon_contains(&square, Point::new(5.0, 2.0)));
    }

    #[test]
    fn test_flatten_ends_on_curve_endpoint() {
        let path = Path {
            start: Point::new(0.0, 0.0),
            segments: vec![Segment::Cubic(
                Point::new(1.0, 0.0),
                Point::new(2.0, 1.0),
                Point::new(3.0, 3.0),
            )],
        };
        let pts = path.flatten();
        assert_eq!(pts.len(), 1 + CURVE_STEPS);
        let last = pts[pts.len() - 1];
        assert!((last.x - 3.0).abs() < 1e-5 && (last.y - 3.0).abs() < 1e-5);
    }
}
