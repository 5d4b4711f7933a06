//! Physical units, page sizes and margins.
//!
//! The internal unit is the inch. Design files measure in points and are
//! converted once at extraction time; output units are applied when CSS is
//! written.
use std::fmt;
use std::str::FromStr;

pub const POINTS_PER_INCH: f64 = 72.0;

/// A CSS output unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LengthUnit {
    #[default]
    In,
    Mm,
    Cm,
    Px,
    Pt,
}

impl LengthUnit {
    /// How many of this unit make up one inch.
    pub fn per_inch(&self) -> f64 {
        match self {
            LengthUnit::In => 1.0,
            LengthUnit::Mm => 25.4,
            LengthUnit::Cm => 2.54,
            LengthUnit::Px => 96.0,
            LengthUnit::Pt => POINTS_PER_INCH,
        }
    }

    pub fn from_inches(&self, inches: f64) -> f64 {
        inches * self.per_inch()
    }

    pub fn to_inches(&self, value: f64) -> f64 {
        value / self.per_inch()
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            LengthUnit::In => "in",
            LengthUnit::Mm => "mm",
            LengthUnit::Cm => "cm",
            LengthUnit::Px => "px",
            LengthUnit::Pt => "pt",
        }
    }

    /// Formats an inch value in this unit with at most four decimals.
    pub fn format(&self, inches: f64) -> String {
        format!("{}{}", format_number(self.from_inches(inches)), self.suffix())
    }
}

impl FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" => Ok(LengthUnit::In),
            "mm" => Ok(LengthUnit::Mm),
            "cm" => Ok(LengthUnit::Cm),
            "px" => Ok(LengthUnit::Px),
            "pt" => Ok(LengthUnit::Pt),
            other => Err(format!("Unknown unit: {}", other)),
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Converts points to inches (72pt = 1in).
pub fn points_to_inches(points: f64) -> f64 {
    points / POINTS_PER_INCH
}

/// Rounds to four decimals and drops trailing zeros.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    let text = format!("{:.4}", rounded);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" { "0".to_string() } else { trimmed.to_string() }
}

/// Parse a CSS-style length value with optional unit (e.g., "10pt", "5mm", "1in") into inches.
/// A bare number is taken as points.
pub fn parse_length(input: &str) -> Result<f64, String> {
    let input = input.trim();
    for unit in [LengthUnit::Pt, LengthUnit::Px, LengthUnit::In, LengthUnit::Cm, LengthUnit::Mm] {
        if let Some(val) = input.strip_suffix(unit.suffix()) {
            return val
                .trim()
                .parse::<f64>()
                .map(|v| unit.to_inches(v))
                .map_err(|e| format!("Invalid number: {}", e));
        }
    }
    input
        .parse::<f64>()
        .map(points_to_inches)
        .map_err(|e| format!("Invalid number: {}", e))
}

/// Page margins in inches, clockwise from the top.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn all(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// One, two or four lengths, as in the CSS `margin` shorthand.
    pub fn parse_shorthand(input: &str) -> Result<Self, String> {
        let values = input
            .split_whitespace()
            .map(parse_length)
            .collect::<Result<Vec<_>, _>>()?;
        match values[..] {
            [all] => Ok(Margins::all(all)),
            [vertical, horizontal] => Ok(Margins {
                top: vertical,
                right: horizontal,
                bottom: vertical,
                left: horizontal,
            }),
            [top, right, bottom, left] => Ok(Margins { top, right, bottom, left }),
            _ => Err(format!("expected 1, 2 or 4 margin values, got {}", values.len())),
        }
    }

    pub fn to_css(&self, unit: LengthUnit) -> String {
        let sides = [self.top, self.right, self.bottom, self.left];
        if sides.iter().all(|side| *side == self.top) {
            return unit.format(self.top);
        }
        sides.map(|side| unit.format(side)).join(" ")
    }
}

/// Page sizes accepted for the `@page` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    A4,
    #[default]
    Letter,
    Legal,
}

impl PageSize {
    /// Width and height in inches.
    pub fn dimensions_in(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (210.0 / 25.4, 297.0 / 25.4),
            PageSize::Letter => (8.5, 11.0),
            PageSize::Legal => (8.5, 14.0),
        }
    }

    /// The `size` descriptor, in the unit each size is defined in.
    pub fn css_size(&self) -> &'static str {
        match self {
            PageSize::A4 => "210mm 297mm",
            PageSize::Letter => "8.5in 11in",
            PageSize::Legal => "8.5in 14in",
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            _ => Err(format!("unknown page size '{}' (expected letter, a4 or legal)", s)),
        }
    }
}
