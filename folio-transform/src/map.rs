//! Position mapping.
//!
//! Every step produces a [`StepMap`] describing which ranges it replaced.
//! A [`Mapping`] chains step maps so positions in an old document can be
//! carried forward through any number of steps. Mirror pairs let a position
//! that was deleted by one step and restored by its inverse map back to
//! exactly where it was, which is what makes rebasing lossless.

use std::fmt;

/// Which side a position sticks to when content is inserted at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    /// Stay before inserted content.
    Before,
    /// Move after inserted content.
    After,
}

const DEL_BEFORE: u8 = 1;
const DEL_AFTER: u8 = 2;
const DEL_ACROSS: u8 = 4;
const DEL_SIDE: u8 = 8;

/// Where a position was inside a replaced range, so a mirrored map can
/// restore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recover {
    index: usize,
    offset: usize,
}

/// A mapped position together with deletion information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    /// The mapped position.
    pub pos: usize,
    del_info: u8,
    recover: Option<Recover>,
}

impl MapResult {
    /// Whether the content on the position's associated side was deleted.
    #[must_use]
    pub fn deleted(&self) -> bool {
        self.del_info & DEL_SIDE > 0
    }

    /// Whether the token before the position was deleted.
    #[must_use]
    pub fn deleted_before(&self) -> bool {
        self.del_info & (DEL_BEFORE | DEL_ACROSS) > 0
    }

    /// Whether the token after the position was deleted.
    #[must_use]
    pub fn deleted_after(&self) -> bool {
        self.del_info & (DEL_AFTER | DEL_ACROSS) > 0
    }

    /// Whether a deletion spanned the position.
    #[must_use]
    pub fn deleted_across(&self) -> bool {
        self.del_info & DEL_ACROSS > 0
    }
}

/// One replaced range: `old_size` units at `start` became `new_size` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Range {
    start: usize,
    old_size: usize,
    new_size: usize,
}

/// The position changes made by one step.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<Range>,
    inverted: bool,
}

impl StepMap {
    /// A map that changes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A map replacing `old_size` units at `start` with `new_size` units.
    #[must_use]
    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        if old_size == 0 && new_size == 0 {
            return Self::empty();
        }
        Self {
            ranges: vec![Range {
                start,
                old_size,
                new_size,
            }],
            inverted: false,
        }
    }

    /// A map of several ranges, given in ascending order of `start`.
    #[must_use]
    pub fn from_ranges(ranges: &[(usize, usize, usize)]) -> Self {
        Self {
            ranges: ranges
                .iter()
                .map(|&(start, old_size, new_size)| Range {
                    start,
                    old_size,
                    new_size,
                })
                .collect(),
            inverted: false,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The map that undoes this one.
    #[must_use]
    pub fn invert(&self) -> Self {
        Self {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }

    fn sizes(&self, range: &Range) -> (usize, usize) {
        if self.inverted {
            (range.new_size, range.old_size)
        } else {
            (range.old_size, range.new_size)
        }
    }

    /// Restores a position recorded by the mirrored map.
    #[must_use]
    pub fn recover(&self, recover: Recover) -> usize {
        let mut diff: isize = 0;
        if !self.inverted {
            for range in &self.ranges[..recover.index] {
                diff += range.new_size as isize - range.old_size as isize;
            }
        }
        (self.ranges[recover.index].start as isize + diff) as usize + recover.offset
    }

    /// Maps a position.
    #[must_use]
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    /// Maps a position, reporting whether content around it was deleted.
    #[must_use]
    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for (i, range) in self.ranges.iter().enumerate() {
            let start = if self.inverted {
                (range.start as isize - diff) as usize
            } else {
                range.start
            };
            if start > pos {
                break;
            }
            let (old_size, new_size) = self.sizes(range);
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    Assoc::Before
                } else if pos == end {
                    Assoc::After
                } else {
                    assoc
                };
                let base = (start as isize + diff) as usize;
                let mapped = if side == Assoc::Before { base } else { base + new_size };
                let at_edge = match assoc {
                    Assoc::Before => pos == start,
                    Assoc::After => pos == end,
                };
                let recover = (!at_edge).then_some(Recover {
                    index: i,
                    offset: pos - start,
                });
                // a pure insertion deletes nothing around the position
                let mut del = if old_size == 0 {
                    0
                } else if pos == start {
                    DEL_AFTER
                } else if pos == end {
                    DEL_BEFORE
                } else {
                    DEL_ACROSS
                };
                if !at_edge {
                    del |= DEL_SIDE;
                }
                return MapResult {
                    pos: mapped,
                    del_info: del,
                    recover,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            del_info: 0,
            recover: None,
        }
    }

    /// Calls `f(old_start, old_end, new_start, new_end)` for every range.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let mut diff: isize = 0;
        for range in &self.ranges {
            let (old_size, new_size) = self.sizes(range);
            let old_start = if self.inverted {
                (range.start as isize - diff) as usize
            } else {
                range.start
            };
            let new_start = if self.inverted {
                range.start
            } else {
                (range.start as isize + diff) as usize
            };
            f(old_start, old_start + old_size, new_start, new_start + new_size);
            diff += new_size as isize - old_size as isize;
        }
    }
}

impl fmt::Debug for StepMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ranges
            .iter()
            .map(|r| format!("{}:{}->{}", r.start, r.old_size, r.new_size))
            .collect();
        write!(
            f,
            "StepMap[{}]{}",
            parts.join(", "),
            if self.inverted { " (inverted)" } else { "" }
        )
    }
}

/// A sequence of step maps with optional mirror pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
    mirror: Vec<(usize, usize)>,
    from: usize,
    to: usize,
}

impl Mapping {
    /// An empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapping over the given maps.
    #[must_use]
    pub fn from_maps(maps: Vec<StepMap>) -> Self {
        let to = maps.len();
        Self {
            maps,
            mirror: Vec::new(),
            from: 0,
            to,
        }
    }

    /// The maps this mapping covers.
    #[must_use]
    pub fn maps(&self) -> &[StepMap] {
        &self.maps[self.from..self.to]
    }

    /// Number of maps covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A mapping covering maps `from..to`, sharing mirror information.
    #[must_use]
    pub fn slice(&self, from: usize, to: usize) -> Mapping {
        Mapping {
            maps: self.maps.clone(),
            mirror: self.mirror.clone(),
            from: from.min(self.maps.len()),
            to: to.min(self.maps.len()),
        }
    }

    /// A mapping covering maps `from..`.
    #[must_use]
    pub fn slice_from(&self, from: usize) -> Mapping {
        self.slice(from, self.maps.len())
    }

    /// Appends a map, optionally mirroring the map at index `mirrors`.
    pub fn append_map(&mut self, map: StepMap, mirrors: Option<usize>) {
        self.maps.push(map);
        self.to = self.maps.len();
        if let Some(m) = mirrors {
            self.set_mirror(self.maps.len() - 1, m);
        }
    }

    /// Appends every map of `other`, keeping its internal mirrors.
    pub fn append_mapping(&mut self, other: &Mapping) {
        let start = self.maps.len();
        for (i, map) in other.maps().iter().enumerate() {
            let mirror = other
                .get_mirror(other.from + i)
                .filter(|&m| m < other.from + i && m >= other.from)
                .map(|m| start + m - other.from);
            self.append_map(map.clone(), mirror);
        }
    }

    /// The map paired with map `n`, if any.
    #[must_use]
    pub fn get_mirror(&self, n: usize) -> Option<usize> {
        self.mirror.iter().find_map(|&(a, b)| {
            if a == n {
                Some(b)
            } else if b == n {
                Some(a)
            } else {
                None
            }
        })
    }

    /// Records that maps `n` and `m` undo each other.
    pub fn set_mirror(&mut self, n: usize, m: usize) {
        self.mirror.push((n, m));
    }

    /// Maps a position through every covered map.
    #[must_use]
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    /// Maps a position, collecting deletion information across maps.
    #[must_use]
    pub fn map_result(&self, mut pos: usize, assoc: Assoc) -> MapResult {
        let mut del_info = 0;
        let mut i = self.from;
        while i < self.to {
            let result = self.maps[i].map_result(pos, assoc);
            if let Some(recover) = result.recover {
                if let Some(corr) = self.get_mirror(i).filter(|&c| c > i && c < self.to) {
                    pos = self.maps[corr].recover(recover);
                    i = corr + 1;
                    continue;
                }
            }
            del_info |= result.del_info;
            pos = result.pos;
            i += 1;
        }
        MapResult {
            pos,
            del_info,
            recover: None,
        }
    }
}
