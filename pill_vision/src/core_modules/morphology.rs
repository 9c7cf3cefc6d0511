// THEORY:
// Pills that touch in the photo are joined in the mask by thin bridges of
// foreground a pixel or two wide. One erosion with a cross-shaped structuring
// element removes every pixel that lacks a full 4-neighbourhood, which cuts
// those bridges while shaving only one pixel off each side of a real pill.
//
// The outer one-pixel ring is always cleared: its missing neighbours count as
// background. Erosion runs exactly once in the standard pipeline; iterating it
// would start deleting small pills.

use crate::core_modules::binary_mask::BinaryMask;
use crate::error::Result;

/// One pass of binary erosion with the 4-neighbourhood cross.
pub fn erode(mask: &BinaryMask) -> Result<BinaryMask> {
    let (width, height) = (mask.width(), mask.height());
    let mut eroded = BinaryMask::zeroed(width, height)?;
    if width < 3 || height < 3 {
        return Ok(eroded);
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let survives = mask.is_foreground(x, y)
                && mask.is_foreground(x - 1, y)
                && mask.is_foreground(x + 1, y)
                && mask.is_foreground(x, y - 1)
                && mask.is_foreground(x, y + 1);
            if survives {
                eroded.set(x, y, true);
            }
        }
    }

    Ok(eroded)
}

/// Applies `passes` rounds of [`erode`]. Zero passes returns a copy of the input.
pub fn erode_repeated(mask: &BinaryMask, passes: u32) -> Result<BinaryMask> {
    let mut current = mask.clone();
    for _ in 0..passes {
        current = erode(&current)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> BinaryMask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let cells: Vec<bool> = rows.iter().flat_map(|r| r.chars().map(|c| c == '#')).collect();
        BinaryMask::from_bools(width, height, &cells).unwrap()
    }

    fn rows_of(mask: &BinaryMask) -> Vec<String> {
        (0..mask.height())
            .map(|y| {
                (0..mask.width())
                    .map(|x| if mask.is_foreground(x, y) { '#' } else { '.' })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn square_loses_one_pixel_per_side() {
        let mask = mask_from_rows(&[
            ".......",
            ".#####.",
            ".#####.",
            ".#####.",
            ".#####.",
            ".#####.",
            ".......",
        ]);
        let eroded = erode(&mask).unwrap();
        assert_eq!(
            rows_of(&eroded),
            vec![
                ".......",
                ".......",
                "..###..",
                "..###..",
                "..###..",
                ".......",
                ".......",
            ]
        );
    }

    #[test]
    fn outer_ring_is_always_cleared() {
        let full = BinaryMask::from_bools(5, 4, &[true; 20]).unwrap();
        let eroded = erode(&full).unwrap();
        assert_eq!(rows_of(&eroded), vec![".....", ".###.", ".###.", "....."]);
    }

    #[test]
    fn one_pixel_bridge_is_cut() {
        let mask = mask_from_rows(&[
            "...........",
            ".###...###.",
            ".#########.",
            ".###...###.",
            "...........",
        ]);
        let eroded = erode(&mask).unwrap();
        assert_eq!(
            rows_of(&eroded),
            vec![
                "...........",
                "...........",
                "..##...##..",
                "...........",
                "...........",
            ]
        );
    }

    #[test]
    fn zero_passes_is_identity() {
        let mask = mask_from_rows(&["#.#", ".#.", "#.#"]);
        assert_eq!(erode_repeated(&mask, 0).unwrap(), mask);
    }

    #[test]
    fn diagonal_neighbours_do_not_count() {
        let mask = mask_from_rows(&[".....", ".#.#.", "..#..", ".#.#.", "....."]);
        assert_eq!(erode(&mask).unwrap().foreground_count(), 0);
    }
}
