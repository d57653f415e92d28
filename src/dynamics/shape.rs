//! Shape factor catalog (`spec.md` 4.C).

use crate::errors::{DarkflightError, Result};

/// A catalogued or user-supplied shape factor `A`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere,
    Cylinder,
    Brick,
    Custom(f64),
}

impl Shape {
    /// Parses the `-s {s,c,b,FLOAT}` CLI shape argument (`spec.md` §6).
    pub fn parse(arg: &str) -> Result<Self> {
        match arg {
            "s" => Ok(Shape::Sphere),
            "c" => Ok(Shape::Cylinder),
            "b" => Ok(Shape::Brick),
            other => other
                .parse::<f64>()
                .map(Shape::Custom)
                .map_err(|_| DarkflightError::ArgumentInvalid(format!("invalid shape code: {}", other))),
        }
    }

    /// The shape factor `A` used throughout the drag/lift/mass-loss model.
    pub fn factor(&self) -> f64 {
        match self {
            Shape::Sphere => 1.21,
            Shape::Cylinder => 1.60,
            Shape::Brick => 2.7,
            Shape::Custom(a) => *a,
        }
    }

    /// The single-letter/float code used in output metadata and filenames.
    pub fn code(&self) -> String {
        match self {
            Shape::Sphere => "s".to_string(),
            Shape::Cylinder => "c".to_string(),
            Shape::Brick => "b".to_string(),
            Shape::Custom(a) => format!("{}", a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogued_shapes_match_spec_constants() {
        assert_eq!(Shape::Sphere.factor(), 1.21);
        assert_eq!(Shape::Cylinder.factor(), 1.60);
        assert_eq!(Shape::Brick.factor(), 2.7);
    }

    #[test]
    fn custom_shape_passes_through_verbatim() {
        let shape = Shape::parse("1.85").unwrap();
        assert_eq!(shape.factor(), 1.85);
    }

    #[test]
    fn unparseable_shape_is_argument_invalid() {
        assert!(Shape::parse("x").is_err());
    }
}
