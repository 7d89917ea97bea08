// Typed cell values and the coercion rules for edited grid cells.
use serde::{Deserialize, Serialize};

/// One grid cell after coercion.
///
/// Grid edits arrive as raw text; coercion turns each cell into a typed
/// numeric value or an explicit `Empty`. Text that parses as neither stays
/// `Text` so malformed input remains visible in the packed output instead
/// of being dropped.
///
/// Serializes untagged: `Int`/`Float` as JSON numbers, `Text` as a string,
/// `Empty` as `null`, so a set sequence persists as `[105,110,null]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Int(n) => write!(f, "{n}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Empty => write!(f, "-"),
        }
    }
}

/// Whether raw cell text is the grid's missing marker.
///
/// Blank cells and the textual NaN marker both count as missing; anything
/// else is user input.
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// Coerce a reps cell. Reps are whole numbers: integer, empty, or the raw
/// text unchanged. Never a decimal.
pub fn coerce_reps(raw: &str) -> Cell {
    if let Ok(n) = raw.trim().parse::<i64>() {
        return Cell::Int(n);
    }
    if is_missing(raw) {
        return Cell::Empty;
    }
    Cell::Text(raw.to_string())
}

/// Coerce a weight cell.
///
/// An integer without a decimal separator stays an integer; otherwise a
/// parseable number becomes a decimal. The missing check runs before the
/// decimal parse because the NaN marker would itself parse as a float.
pub fn coerce_weight(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if !trimmed.contains('.') {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Cell::Int(n);
        }
    }
    if is_missing(raw) {
        return Cell::Empty;
    }
    if let Ok(x) = trimmed.parse::<f64>() {
        return Cell::Float(x);
    }
    Cell::Text(raw.to_string())
}

/// Render a set sequence for display, one value per set slot.
pub fn format_cells(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_integer_stays_integer() {
        assert_eq!(coerce_weight("70"), Cell::Int(70));
        assert_eq!(coerce_weight(" 70 "), Cell::Int(70));
    }

    #[test]
    fn weight_with_separator_becomes_decimal() {
        assert_eq!(coerce_weight("70.5"), Cell::Float(70.5));
        assert_eq!(coerce_weight("70.0"), Cell::Float(70.0));
    }

    #[test]
    fn weight_blank_and_nan_are_empty() {
        assert_eq!(coerce_weight(""), Cell::Empty);
        assert_eq!(coerce_weight("   "), Cell::Empty);
        assert_eq!(coerce_weight("nan"), Cell::Empty);
        assert_eq!(coerce_weight("NaN"), Cell::Empty);
    }

    #[test]
    fn weight_free_text_passes_through() {
        assert_eq!(coerce_weight("abc"), Cell::Text("abc".into()));
        assert_eq!(coerce_weight("70kg"), Cell::Text("70kg".into()));
    }

    #[test]
    fn reps_integer_and_empty() {
        assert_eq!(coerce_reps("12"), Cell::Int(12));
        assert_eq!(coerce_reps(""), Cell::Empty);
        assert_eq!(coerce_reps("nan"), Cell::Empty);
    }

    #[test]
    fn reps_never_decimal() {
        assert_eq!(coerce_reps("12.5"), Cell::Text("12.5".into()));
    }

    #[test]
    fn cell_json_roundtrip() {
        let cells = vec![
            Cell::Int(105),
            Cell::Float(72.5),
            Cell::Empty,
            Cell::Text("8-10".into()),
        ];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"[105,72.5,null,"8-10"]"#);
        let back: Vec<Cell> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cells);
    }

    #[test]
    fn format_cells_readable() {
        let cells = vec![Cell::Int(100), Cell::Float(72.5), Cell::Empty];
        assert_eq!(format_cells(&cells), "100, 72.5, -");
    }
}
