//! Display colors for duplicate groups.
//!
//! Groups are colored in discovery order, cycling through a small fixed
//! palette. Assignments are stable only within one analysis pass.

/// Palette for intra-scope duplicate groups.
pub const DUPLICATE_PALETTE: [&str; 8] = [
    "#e6534b", // red
    "#4b9de6", // blue
    "#53c26b", // green
    "#e6b84b", // amber
    "#a04be6", // purple
    "#4be6d4", // teal
    "#e64bb0", // magenta
    "#97a63f", // olive
];

/// Palette for cross-package duplicate names. Kept distinct from the
/// intra-scope palette so the two indicator layers don't blend together.
pub const CROSS_PALETTE: [&str; 6] = [
    "#f2a85c", // orange
    "#5cc8f2", // sky
    "#8cf25c", // lime
    "#f25c8a", // rose
    "#c49df2", // lavender
    "#f2e45c", // yellow
];

/// Color for the nth duplicate group discovered in a pass.
pub fn duplicate_color(index: usize) -> &'static str {
    DUPLICATE_PALETTE[index % DUPLICATE_PALETTE.len()]
}

/// Color for the nth distinct cross-package duplicate name.
pub fn cross_color(index: usize) -> &'static str {
    CROSS_PALETTE[index % CROSS_PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_cycles() {
        assert_eq!(duplicate_color(0), duplicate_color(DUPLICATE_PALETTE.len()));
        assert_eq!(cross_color(1), cross_color(CROSS_PALETTE.len() + 1));
    }

    #[test]
    fn test_adjacent_indices_differ() {
        for i in 0..DUPLICATE_PALETTE.len() - 1 {
            assert_ne!(duplicate_color(i), duplicate_color(i + 1));
        }
    }
}
