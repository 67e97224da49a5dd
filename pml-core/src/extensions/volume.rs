//! Block collision volumes.
//!
//! A block's occupied space is a list of inclusive corner pairs. Each pair
//! expands to the box of integer cells between its corners; corners may be
//! given in any order. No two boxes may share a cell.

use crate::error::{PmlError, PmlResult};
use std::collections::HashSet;

/// One inclusive box, `[start, end]`.
pub type VolumeRange = [[i32; 3]; 2];

/// Expand `ranges` into the cells they cover, in x/y/z order per range.
///
/// Fails with [`PmlError::OverlappingVolume`] at the first cell covered
/// twice.
pub fn rasterize(ranges: &[VolumeRange]) -> PmlResult<Vec<[i32; 3]>> {
    let mut seen = HashSet::new();
    let mut cells = Vec::new();

    for [start, end] in ranges {
        let (min_x, max_x) = (start[0].min(end[0]), start[0].max(end[0]));
        let (min_y, max_y) = (start[1].min(end[1]), start[1].max(end[1]));
        let (min_z, max_z) = (start[2].min(end[2]), start[2].max(end[2]));

        for x in min_x..=max_x {
            for y in min_y..=max_y {
                for z in min_z..=max_z {
                    if !seen.insert([x, y, z]) {
                        return Err(PmlError::OverlappingVolume { x, y, z });
                    }
                    cells.push([x, y, z]);
                }
            }
        }
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_corners_cover_same_box() {
        let a = rasterize(&[[[0, 0, 0], [1, 1, 0]]]).unwrap();
        let b = rasterize(&[[[1, 1, 0], [0, 0, 0]]]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_overlap_reports_first_shared_cell() {
        let err = rasterize(&[[[0, 0, 0], [2, 0, 0]], [[2, 0, 0], [3, 0, 0]]]).unwrap_err();
        assert!(matches!(err, PmlError::OverlappingVolume { x: 2, y: 0, z: 0 }));
    }
}
