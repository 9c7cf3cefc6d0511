// THEORY:
// The labeler turns the eroded mask into discrete objects. It is a plain binary
// connected-component pass: scan row-major, and whenever an unvisited foreground
// pixel turns up, flood the whole 4-connected region it belongs to.
//
// Key architectural principles:
// 1.  **Explicit Stack**: The flood fill keeps its frontier in a `Vec`, never on the
//     call stack. A single pill on a high-resolution photo can span hundreds of
//     thousands of pixels; recursion that deep would overflow.
// 2.  **Visit Once**: A pixel is marked visited when it is pushed, so each pixel
//     enters the frontier at most once and the whole pass is O(width * height).
// 3.  **Streaming Aggregation**: Member pixels are not stored. Only the count and
//     the coordinate sums are accumulated, which is all the centroid needs.
// 4.  **Stable Order**: Blobs come out in the order their first pixel is met in the
//     scan, so two runs over the same mask give the same list.

use crate::core_modules::binary_mask::BinaryMask;
use crate::core_modules::blob::{Blob, Point};
use crate::error::{Result, try_zeroed};
use tracing::debug;

/// 4-connected neighbour offsets (right, left, down, up).
const NEIGHBOURS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Labels every 4-connected foreground region of `mask`.
pub fn label_components(mask: &BinaryMask) -> Result<Vec<Blob>> {
    let (width, height) = (mask.width(), mask.height());
    let mut visited = try_zeroed(width as usize * height as usize)?;
    let mut stack: Vec<(u32, u32)> = Vec::new();
    let mut blobs = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let index = y as usize * width as usize + x as usize;
            if visited[index] != 0 || !mask.is_foreground(x, y) {
                continue;
            }

            visited[index] = 1;
            stack.push((x, y));
            let mut size = 0usize;
            let mut sum_x = 0u64;
            let mut sum_y = 0u64;

            while let Some((px, py)) = stack.pop() {
                size += 1;
                sum_x += px as u64;
                sum_y += py as u64;

                for (dx, dy) in NEIGHBOURS {
                    let nx = px as i64 + dx;
                    let ny = py as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    let (nx, ny) = (nx as u32, ny as u32);
                    let n_index = ny as usize * width as usize + nx as usize;
                    if visited[n_index] == 0 && mask.is_foreground(nx, ny) {
                        visited[n_index] = 1;
                        stack.push((nx, ny));
                    }
                }
            }

            blobs.push(Blob::new(
                size,
                Point::new(sum_x as f64 / size as f64, sum_y as f64 / size as f64),
            ));
        }
    }

    debug!(components = blobs.len(), "labeled connected components");
    Ok(blobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_squares(width: u32, height: u32, squares: &[(u32, u32, u32)]) -> BinaryMask {
        let mut cells = vec![false; (width * height) as usize];
        for &(left, top, side) in squares {
            for y in top..top + side {
                for x in left..left + side {
                    cells[(y * width + x) as usize] = true;
                }
            }
        }
        BinaryMask::from_bools(width, height, &cells).unwrap()
    }

    #[test]
    fn separate_squares_become_separate_blobs() {
        let mask = mask_with_squares(30, 20, &[(1, 1, 5), (8, 1, 6), (20, 10, 7)]);
        let blobs = label_components(&mask).unwrap();
        assert_eq!(blobs.len(), 3);
        assert_eq!(blobs[0], Blob::new(25, Point::new(3.0, 3.0)));
        assert_eq!(blobs[1], Blob::new(36, Point::new(10.5, 3.5)));
        assert_eq!(blobs[2], Blob::new(49, Point::new(23.0, 13.0)));
    }

    #[test]
    fn diagonal_contact_does_not_connect() {
        let mask = BinaryMask::from_bools(2, 2, &[true, false, false, true]).unwrap();
        assert_eq!(label_components(&mask).unwrap().len(), 2);
    }

    #[test]
    fn regions_touching_the_edge_are_labeled() {
        let mask = mask_with_squares(4, 4, &[(0, 0, 4)]);
        let blobs = label_components(&mask).unwrap();
        assert_eq!(blobs, vec![Blob::new(16, Point::new(1.5, 1.5))]);
    }

    #[test]
    fn concave_shape_is_one_component() {
        // A "U": both arms must be reached from the first pixel found.
        let rows = ["#...#", "#...#", "#####"];
        let cells: Vec<bool> = rows.iter().flat_map(|r| r.chars().map(|c| c == '#')).collect();
        let mask = BinaryMask::from_bools(5, 3, &cells).unwrap();
        let blobs = label_components(&mask).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].pixel_count, 9);
    }

    #[test]
    fn huge_component_does_not_overflow_the_stack() {
        let side = 2000;
        let mask = BinaryMask::from_bools(side, side, &vec![true; (side * side) as usize]).unwrap();
        let blobs = label_components(&mask).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].pixel_count, (side * side) as usize);
        assert_eq!(blobs[0].centroid, Point::new(999.5, 999.5));
    }

    #[test]
    fn empty_mask_has_no_blobs() {
        let mask = BinaryMask::from_bools(8, 8, &[false; 64]).unwrap();
        assert!(label_components(&mask).unwrap().is_empty());
    }
}
