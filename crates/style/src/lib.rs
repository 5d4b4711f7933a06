pub mod dimension;
pub mod profile;

pub use dimension::{format_number, parse_length, points_to_inches, LengthUnit, Margins, PageSize, POINTS_PER_INCH};
pub use profile::{LayoutProfile, ProfileError, RenderingEngine, StyleEntry, StyleMap};
