//! Integer geometry primitives shared by every coordinate space.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pixel offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const ZERO: Location = Location { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn offset_by(self, other: Location) -> Self {
        self.offset(other.x, other.y)
    }

    pub fn negated(self) -> Self {
        Self::new(-self.x, -self.y)
    }

    /// Scales both coordinates, rounding up.
    pub fn scale(self, factor: f64) -> Self {
        Self::new(scale_ceil(self.x, factor), scale_ceil(self.y, factor))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RectangleSize {
    pub width: i32,
    pub height: i32,
}

impl RectangleSize {
    pub const EMPTY: RectangleSize = RectangleSize {
        width: 0,
        height: 0,
    };

    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Scales both dimensions, rounding up.
    pub fn scale(self, factor: f64) -> Self {
        Self::new(scale_ceil(self.width, factor), scale_ceil(self.height, factor))
    }

    /// True when `self` is at least as large as `other` on both axes.
    pub fn covers(&self, other: RectangleSize) -> bool {
        self.width >= other.width && self.height >= other.height
    }
}

impl fmt::Display for RectangleSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An integer rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Region {
    pub location: Location,
    pub size: RectangleSize,
}

impl Region {
    pub const EMPTY: Region = Region {
        location: Location::ZERO,
        size: RectangleSize::EMPTY,
    };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            location: Location::new(x, y),
            size: RectangleSize::new(width, height),
        }
    }

    pub fn from_parts(location: Location, size: RectangleSize) -> Self {
        Self { location, size }
    }

    pub fn left(&self) -> i32 {
        self.location.x
    }

    pub fn top(&self) -> i32 {
        self.location.y
    }

    pub fn right(&self) -> i32 {
        self.location.x + self.size.width
    }

    pub fn bottom(&self) -> i32 {
        self.location.y + self.size.height
    }

    pub fn width(&self) -> i32 {
        self.size.width
    }

    pub fn height(&self) -> i32 {
        self.size.height
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::from_parts(self.location.offset(dx, dy), self.size)
    }

    pub fn with_location(self, location: Location) -> Self {
        Self::from_parts(location, self.size)
    }

    pub fn scale(self, factor: f64) -> Self {
        Self::from_parts(self.location.scale(factor), self.size.scale(factor))
    }

    pub fn contains(&self, location: Location) -> bool {
        location.x >= self.left()
            && location.x < self.right()
            && location.y >= self.top()
            && location.y < self.bottom()
    }

    /// The overlapping part of both regions, or [`Region::EMPTY`] if they don't overlap.
    pub fn intersect(&self, other: &Region) -> Region {
        if self.is_empty() || other.is_empty() {
            return Region::EMPTY;
        }

        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return Region::EMPTY;
        }

        Region::new(left, top, right - left, bottom - top)
    }

    /// Tiles the region row by row into parts no larger than `part_size`.
    ///
    /// The last row and column are truncated to the region's edge, never padded. A
    /// non-positive part dimension is treated as 1.
    pub fn sub_regions(&self, part_size: RectangleSize) -> Vec<Region> {
        if self.is_empty() {
            return Vec::new();
        }

        let part_width = part_size.width.max(1);
        let part_height = part_size.height.max(1);
        let mut parts = Vec::new();

        let mut y = self.top();
        while y < self.bottom() {
            let height = part_height.min(self.bottom() - y);
            let mut x = self.left();
            while x < self.right() {
                let width = part_width.min(self.right() - x);
                parts.push(Region::new(x, y, width, height));
                x += width;
            }
            y += height;
        }

        parts
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.location, self.size)
    }
}

fn scale_ceil(value: i32, factor: f64) -> i32 {
    (value as f64 * factor).ceil() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_offset_and_scale() {
        let location = Location::new(10, 21);
        assert_eq!(location.offset(-5, 4), Location::new(5, 25));
        assert_eq!(location.scale(0.5), Location::new(5, 11));
        assert_eq!(location.scale(2.0), Location::new(20, 42));
    }

    #[test]
    fn test_intersect_overlapping() {
        let a = Region::new(0, 0, 100, 100);
        let b = Region::new(50, 60, 100, 100);
        assert_eq!(a.intersect(&b), Region::new(50, 60, 50, 40));
    }

    #[test]
    fn test_intersect_disjoint_is_empty() {
        let a = Region::new(0, 0, 10, 10);
        let b = Region::new(10, 0, 10, 10);
        assert!(a.intersect(&b).is_empty());
        assert_eq!(a.intersect(&b), Region::EMPTY);
    }

    #[test]
    fn test_intersect_with_empty_region() {
        let region = Region::new(5, 5, 10, 10);
        assert_eq!(Region::EMPTY.intersect(&region), Region::EMPTY);
        assert_eq!(region.intersect(&Region::new(7, 7, 0, 3)), Region::EMPTY);
    }

    #[test]
    fn test_contains() {
        let region = Region::new(10, 10, 5, 5);
        assert!(region.contains(Location::new(10, 10)));
        assert!(region.contains(Location::new(14, 14)));
        assert!(!region.contains(Location::new(15, 10)));
        assert!(!region.contains(Location::new(9, 12)));
    }

    #[test]
    fn test_sub_regions_two_part_page() {
        let page = Region::new(0, 0, 800, 1000);
        let parts = page.sub_regions(RectangleSize::new(800, 550));
        assert_eq!(
            parts,
            vec![Region::new(0, 0, 800, 550), Region::new(0, 550, 800, 450)]
        );
    }

    #[test]
    fn test_sub_regions_row_major_with_truncated_edges() {
        let region = Region::new(10, 20, 25, 12);
        let parts = region.sub_regions(RectangleSize::new(10, 5));
        assert_eq!(parts.len(), 9);
        assert_eq!(parts[0], Region::new(10, 20, 10, 5));
        assert_eq!(parts[1], Region::new(20, 20, 10, 5));
        assert_eq!(parts[2], Region::new(30, 20, 5, 5));
        assert_eq!(parts[8], Region::new(30, 30, 5, 2));
    }

    #[test]
    fn test_sub_regions_cover_exactly() {
        let sizes = [(1, 1), (7, 3), (100, 100), (13, 250), (300, 7)];
        let regions = [
            Region::new(0, 0, 800, 1000),
            Region::new(-5, 3, 37, 41),
            Region::new(2, 2, 1, 99),
        ];

        for region in regions {
            for (w, h) in sizes {
                let part_size = RectangleSize::new(w, h);
                let parts = region.sub_regions(part_size);

                let mut covered = vec![0u8; (region.width() * region.height()) as usize];
                for part in &parts {
                    assert!(part.width() <= w && part.height() <= h);
                    assert_eq!(part.intersect(&region), *part, "part outside region");
                    for y in part.top()..part.bottom() {
                        for x in part.left()..part.right() {
                            let index =
                                (y - region.top()) * region.width() + (x - region.left());
                            covered[index as usize] += 1;
                        }
                    }
                }
                assert!(
                    covered.iter().all(|&count| count == 1),
                    "gaps or overlaps for {} with parts {}",
                    region,
                    part_size
                );
            }
        }
    }

    #[test]
    fn test_sub_regions_of_empty_region() {
        assert!(Region::EMPTY
            .sub_regions(RectangleSize::new(10, 10))
            .is_empty());
    }
}
