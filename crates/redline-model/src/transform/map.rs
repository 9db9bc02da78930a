/// Which side a position sticks to when content is inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Before,
    After,
}

/// Result of mapping one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The content on the `assoc` side of the position was deleted.
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChangedRange {
    start: usize,
    old_size: usize,
    new_size: usize,
}

/// Position changes made by one step: a sorted list of replaced ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepMap {
    ranges: Vec<ChangedRange>,
    inverted: bool,
}

impl StepMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a map from `(start, old_size, new_size)` triples in document order.
    pub fn new(ranges: &[(usize, usize, usize)]) -> Self {
        Self {
            ranges: ranges
                .iter()
                .filter(|(_, old, new)| old != new || *old > 0)
                .map(|&(start, old_size, new_size)| ChangedRange {
                    start,
                    old_size,
                    new_size,
                })
                .collect(),
            inverted: false,
        }
    }

    pub fn invert(&self) -> StepMap {
        StepMap {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for range in &self.ranges {
            let (old_size, new_size) = if self.inverted {
                (range.new_size, range.old_size)
            } else {
                (range.old_size, range.new_size)
            };
            let start = if self.inverted {
                offset(range.start, -diff)
            } else {
                range.start
            };
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let stick_before = if old_size == 0 {
                    assoc == Assoc::Before
                } else if pos == start {
                    true
                } else if pos == end {
                    false
                } else {
                    assoc == Assoc::Before
                };
                let base = offset(start, diff);
                let mapped = if stick_before { base } else { base + new_size };
                let deleted = match assoc {
                    Assoc::Before => pos != start,
                    Assoc::After => pos != end,
                };
                return MapResult {
                    pos: mapped,
                    deleted,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: offset(pos, diff),
            deleted: false,
        }
    }

    /// Call `f(old_start, old_end, new_start, new_end)` for each changed range.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let mut diff: isize = 0;
        for range in &self.ranges {
            let (old_size, new_size) = if self.inverted {
                (range.new_size, range.old_size)
            } else {
                (range.old_size, range.new_size)
            };
            let start = if self.inverted {
                offset(range.start, -diff)
            } else {
                range.start
            };
            let new_start = offset(start, diff);
            f(start, start + old_size, new_start, new_start + new_size);
            diff += new_size as isize - old_size as isize;
        }
    }
}

fn offset(pos: usize, diff: isize) -> usize {
    pos.saturating_add_signed(diff)
}

/// A sequence of step maps, mapping positions across several steps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_maps(maps: Vec<StepMap>) -> Self {
        Self { maps }
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn append_mapping(&mut self, other: &Mapping) {
        self.maps.extend(other.maps.iter().cloned());
    }

    /// The maps in `from..to`.
    pub fn slice(&self, from: usize, to: usize) -> Mapping {
        let to = to.min(self.maps.len());
        let from = from.min(to);
        Mapping {
            maps: self.maps[from..to].to_vec(),
        }
    }

    /// Maps positions from the end document back to the start document.
    pub fn invert(&self) -> Mapping {
        Mapping {
            maps: self.maps.iter().rev().map(StepMap::invert).collect(),
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut deleted = false;
        let mut pos = pos;
        for map in &self.maps {
            let result = map.map_result(pos, assoc);
            deleted |= result.deleted;
            pos = result.pos;
        }
        MapResult { pos, deleted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Assoc::After, 0)]
    #[case(5, Assoc::Before, 5)]
    #[case(5, Assoc::After, 8)]
    #[case(9, Assoc::After, 12)]
    fn insertion_shifts_following_positions(
        #[case] pos: usize,
        #[case] assoc: Assoc,
        #[case] expected: usize,
    ) {
        let map = StepMap::new(&[(5, 0, 3)]);
        assert_eq!(map.map(pos, assoc), expected);
    }

    #[test]
    fn deletion_collapses_positions_and_reports_them() {
        let map = StepMap::new(&[(2, 4, 0)]);
        assert_eq!(map.map_result(4, Assoc::After), MapResult { pos: 2, deleted: true });
        assert_eq!(map.map_result(2, Assoc::Before), MapResult { pos: 2, deleted: false });
        assert_eq!(map.map(10, Assoc::After), 6);
    }

    #[test]
    fn inverted_mapping_undoes_positions() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(&[(1, 0, 2)]));
        mapping.append_map(StepMap::new(&[(6, 1, 0)]));
        let forth = mapping.map(8, Assoc::After);
        assert_eq!(forth, 9);
        assert_eq!(mapping.invert().map(forth, Assoc::After), 8);
    }
}
