use std::fmt;

use crate::error::CoreError;

/// Block coordinates: `x` and `z` are horizontal, `y` is height.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise minimum.
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// The 16x16 chunk column this block belongs to.
    pub fn chunk(self) -> (i32, i32) {
        (self.x >> 4, self.z >> 4)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// Parses the `"x,y,z"` form written by [`format_position`].
pub fn parse_position(text: &str) -> Result<Position, CoreError> {
    let malformed = |reason: String| CoreError::MalformedPosition {
        text: text.to_string(),
        reason,
    };

    let tokens: Vec<&str> = text.split(',').map(str::trim).collect();
    if tokens.len() != 3 {
        return Err(malformed(format!("expected 3 components, found {}", tokens.len())));
    }

    let mut coords = [0i32; 3];
    for (slot, token) in coords.iter_mut().zip(&tokens) {
        *slot = token
            .parse()
            .map_err(|e| malformed(format!("component {token:?}: {e}")))?;
    }
    Ok(Position::new(coords[0], coords[1], coords[2]))
}

pub fn format_position(pos: Position) -> String {
    pos.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_then_parse_is_identity() {
        let samples = [
            Position::new(0, 0, 0),
            Position::new(-1, 64, 1),
            Position::new(i32::MIN, i32::MAX, -30_000_000),
        ];
        for pos in samples {
            assert_eq!(parse_position(&format_position(pos)).unwrap(), pos);
        }
    }

    #[test]
    fn tolerates_whitespace_between_components() {
        assert_eq!(parse_position(" 3, -4 ,5").unwrap(), Position::new(3, -4, 5));
    }

    #[test]
    fn rejects_wrong_component_count() {
        assert!(parse_position("1,2").is_err());
        assert!(parse_position("1,2,3,4").is_err());
        assert!(parse_position("").is_err());
    }

    #[test]
    fn rejects_non_integer_component() {
        let err = parse_position("1,two,3").unwrap_err();
        match err {
            CoreError::MalformedPosition { text, .. } => assert_eq!(text, "1,two,3"),
            other => panic!("expected MalformedPosition, got {other:?}"),
        }
        assert!(parse_position("1.5,2,3").is_err());
    }

    #[test]
    fn chunk_uses_floor_division() {
        assert_eq!(Position::new(15, 0, 16).chunk(), (0, 1));
        assert_eq!(Position::new(-1, 0, -16).chunk(), (-1, -1));
        assert_eq!(Position::new(-17, 0, 0).chunk(), (-2, 0));
    }
}
