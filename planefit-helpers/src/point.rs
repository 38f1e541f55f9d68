use crate::Float;
use std::fmt::{Display, Formatter};

/// One of the two classes a point can belong to.
///
/// The discriminant is the training target: `Blue` is 0, `Red` is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Class {
    #[default]
    Blue = 0,
    Red = 1,
}

impl Class {
    /// The other class.
    pub fn toggled(self) -> Self {
        match self {
            Class::Blue => Class::Red,
            Class::Red => Class::Blue,
        }
    }

    /// Binary training target for this class.
    pub fn label<F: Float>(self) -> F {
        match self {
            Class::Blue => F::zero(),
            Class::Red => F::one(),
        }
    }

    /// Opaque marker colour as `[r, g, b]`.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Class::Blue => [0, 0, 255],
            Class::Red => [255, 0, 0],
        }
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Class::Blue => write!(f, "Blue"),
            Class::Red => write!(f, "Red"),
        }
    }
}

/// A labelled point placed on the canvas, in pixel coordinates.
///
/// Points are never mutated after creation; the owning list is only ever
/// appended to or cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub class: Class,
}

impl Point {
    pub fn new(x: f32, y: f32, class: Class) -> Self {
        Point { x, y, class }
    }

    /// Training features of this point on a `width` x `height` canvas.
    pub fn normalized<F: Float>(&self, width: u32, height: u32) -> [F; 2] {
        normalize(self.x, self.y, width, height)
    }
}

/// Maps a pixel coordinate into `[-1, 1]` using the real canvas size.
///
/// This is the normalization the network is trained with. It divides by
/// width and height separately, unlike the square boundary grid.
pub fn normalize<F: Float>(x: f32, y: f32, width: u32, height: u32) -> [F; 2] {
    let two = F::lit(2.0);
    let nx = F::lit(x as f64) / F::lit(width as f64) * two - F::one();
    let ny = F::lit(y as f64) / F::lit(height as f64) * two - F::one();
    [nx, ny]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_class_toggle_and_label() {
        assert_eq!(Class::Blue.toggled(), Class::Red);
        assert_eq!(Class::Red.toggled().toggled(), Class::Red);
        assert_eq!(Class::Blue.label::<f64>(), 0.0);
        assert_eq!(Class::Red.label::<f32>(), 1.0);
        assert_eq!(Class::default(), Class::Blue);
    }

    #[test]
    fn test_normalize_uses_canvas_size() {
        let [nx, ny]: [f64; 2] = normalize(0.0, 300.0, 800, 600);
        assert_abs_diff_eq!(nx, -1.0);
        assert_abs_diff_eq!(ny, 0.0);

        let p = Point::new(800.0, 150.0, Class::Red);
        let [nx, ny]: [f64; 2] = p.normalized(800, 600);
        assert_abs_diff_eq!(nx, 1.0);
        assert_abs_diff_eq!(ny, -0.5);
    }

    #[test]
    fn test_display() {
        assert_eq!(Class::Blue.to_string(), "Blue");
        assert_eq!(Class::Red.to_string(), "Red");
    }
}
