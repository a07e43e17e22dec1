use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::core::{Interval, JaggedArray, search_index};
use crate::error::{ChartError, ChartResult};

/// Ordered collection of mip levels; level 0 is the full-resolution data.
///
/// Levels live side by side in jagged arrays (one for the domain, one per
/// range dimension) and are addressed by index, so "the next coarser level"
/// is simply `level + 1`. Pyramids built by a [`crate::mipmap::MipStrategy`]
/// halve the sample count per level; chains assembled by a zoom dataset do
/// not have that shape and only guarantee that every level is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MipMapChain {
    domain: JaggedArray,
    ranges: Vec<JaggedArray>,
    level_names: Option<IndexMap<String, usize>>,
}

impl MipMapChain {
    pub fn new(domain: JaggedArray, ranges: Vec<JaggedArray>) -> ChartResult<Self> {
        if domain.num_rows() == 0 || domain.num_columns(0) == 0 {
            return Err(ChartError::InvalidArgument(
                "mip chain needs a non-empty level 0".to_owned(),
            ));
        }
        if ranges.is_empty() {
            return Err(ChartError::InvalidArgument(
                "mip chain needs at least one range dimension".to_owned(),
            ));
        }
        for (dimension, range) in ranges.iter().enumerate() {
            if !domain.is_same_size(range) {
                return Err(ChartError::InvalidArgument(format!(
                    "range dimension {dimension} does not match the domain shape"
                )));
            }
        }

        Ok(Self {
            domain,
            ranges,
            level_names: None,
        })
    }

    /// One-level chain, used for tiers and placeholders that are not pyramided.
    pub fn single_level(domain: Vec<f64>, ranges: Vec<Vec<f64>>) -> ChartResult<Self> {
        Self::new(
            JaggedArray::from_row(domain),
            ranges.into_iter().map(JaggedArray::from_row).collect(),
        )
    }

    /// Copies `levels` into a new chain, in iteration order.
    pub fn from_levels<'b, I>(levels: I) -> ChartResult<Self>
    where
        I: IntoIterator<Item = MipMap<'b>>,
    {
        let mut domain = JaggedArray::new();
        let mut ranges: Vec<JaggedArray> = Vec::new();
        for mip_map in levels {
            if domain.num_rows() == 0 {
                ranges = vec![JaggedArray::new(); mip_map.range_tuple_size()];
            } else if ranges.len() != mip_map.range_tuple_size() {
                return Err(ChartError::InvalidArgument(format!(
                    "level {} has {} range dimensions, expected {}",
                    domain.num_rows(),
                    mip_map.range_tuple_size(),
                    ranges.len()
                )));
            }
            domain.push_row(mip_map.domain().to_vec());
            for (dimension, levels) in ranges.iter_mut().enumerate() {
                levels.push_row(mip_map.range(dimension).to_vec());
            }
        }
        Self::new(domain, ranges)
    }

    /// Binds a name to every level, in level order.
    pub fn with_level_names<I, S>(mut self, names: I) -> ChartResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: IndexMap<String, usize> = names
            .into_iter()
            .enumerate()
            .map(|(level, name)| (name.into(), level))
            .collect();
        if names.len() != self.num_levels() {
            return Err(ChartError::InvalidArgument(format!(
                "expected {} distinct level names, got {}",
                self.num_levels(),
                names.len()
            )));
        }
        self.level_names = Some(names);
        Ok(self)
    }

    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.domain.num_rows()
    }

    #[must_use]
    pub fn range_tuple_size(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn mip_map(&self, level: usize) -> Option<MipMap<'_>> {
        (level < self.num_levels()).then_some(MipMap { chain: self, level })
    }

    /// Level 0.
    #[must_use]
    pub fn raw(&self) -> MipMap<'_> {
        MipMap {
            chain: self,
            level: 0,
        }
    }

    /// Coarsest level.
    #[must_use]
    pub fn top(&self) -> MipMap<'_> {
        MipMap {
            chain: self,
            level: self.num_levels() - 1,
        }
    }

    pub fn levels(&self) -> impl Iterator<Item = MipMap<'_>> + '_ {
        (0..self.num_levels()).map(move |level| MipMap { chain: self, level })
    }

    /// Looks up a level by the name bound with [`MipMapChain::with_level_names`].
    pub fn mip_map_by_name(&self, name: &str) -> ChartResult<Option<MipMap<'_>>> {
        let Some(names) = &self.level_names else {
            return Err(ChartError::UnsupportedOperation(
                "named mip levels are not configured for this chain".to_owned(),
            ));
        };
        Ok(names.get(name).and_then(|level| self.mip_map(*level)))
    }

    /// Densest level holding at most `max_points` samples, or the coarsest
    /// level when none qualifies.
    #[must_use]
    pub fn find_highest_resolution(&self, max_points: usize) -> MipMap<'_> {
        self.levels()
            .find(|mip_map| mip_map.len() <= max_points)
            .unwrap_or_else(|| self.top())
    }

    /// Walks from level 0 toward coarser levels and returns the first one in
    /// which `region` spans at most `max_samples` index steps.
    pub fn best_region(&self, region: Interval, max_samples: usize) -> MipMapRegion<'_> {
        let mut mip_map = self.raw();
        loop {
            let candidate = mip_map.region_for(region);
            if candidate.span() <= max_samples {
                return candidate;
            }
            match mip_map.next() {
                Some(next) => mip_map = next,
                None => return candidate,
            }
        }
    }

    #[must_use]
    pub fn domain_levels(&self) -> &JaggedArray {
        &self.domain
    }

    #[must_use]
    pub fn range_levels(&self, dimension: usize) -> Option<&JaggedArray> {
        self.ranges.get(dimension)
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut JaggedArray, &mut [JaggedArray]) {
        (&mut self.domain, &mut self.ranges)
    }
}

/// One resolution level of a [`MipMapChain`].
#[derive(Clone, Copy)]
pub struct MipMap<'a> {
    chain: &'a MipMapChain,
    level: usize,
}

impl<'a> MipMap<'a> {
    /// Ordinal mip level; `0` is the raw data.
    #[must_use]
    pub fn level(self) -> usize {
        self.level
    }

    #[must_use]
    pub fn domain(self) -> &'a [f64] {
        self.chain.domain.row(self.level)
    }

    /// Range values of dimension `dimension`; empty for unknown dimensions.
    #[must_use]
    pub fn range(self, dimension: usize) -> &'a [f64] {
        self.chain
            .ranges
            .get(dimension)
            .map(|levels| levels.row(self.level))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn range_tuple_size(self) -> usize {
        self.chain.range_tuple_size()
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.domain().len()
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.domain().is_empty()
    }

    /// The next coarser level, if any.
    #[must_use]
    pub fn next(self) -> Option<MipMap<'a>> {
        self.chain.mip_map(self.level + 1)
    }

    pub fn tuple(self, index: usize) -> ChartResult<SampleRef<'a>> {
        ChartError::check_index(index, self.len())?;
        Ok(SampleRef {
            mip_map: self,
            index,
        })
    }

    /// Iterates the samples of this level starting at `start_index`.
    pub fn tuples(self, start_index: usize) -> impl Iterator<Item = SampleRef<'a>> {
        (start_index..self.len()).map(move |index| SampleRef {
            mip_map: self,
            index,
        })
    }

    /// Start/end indices of `region` within this level.
    #[must_use]
    pub fn region_for(self, region: Interval) -> MipMapRegion<'a> {
        let domain = self.domain();
        MipMapRegion {
            mip_map: self,
            start_index: search_index(domain, region.start),
            end_index: search_index(domain, region.end),
        }
    }
}

impl fmt::Debug for MipMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MipMap")
            .field("level", &self.level)
            .field("len", &self.len())
            .finish()
    }
}

/// Result of a best-level query: a level plus the index window covering
/// the requested domain region.
#[derive(Debug, Clone, Copy)]
pub struct MipMapRegion<'a> {
    pub mip_map: MipMap<'a>,
    pub start_index: usize,
    pub end_index: usize,
}

impl<'a> MipMapRegion<'a> {
    /// Number of index steps between start and end.
    #[must_use]
    pub fn span(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    /// Samples from `start_index` through `end_index`, inclusive.
    pub fn samples(&self) -> impl Iterator<Item = SampleRef<'a>> + use<'a> {
        let mip_map = self.mip_map;
        let end = self.end_index.min(mip_map.len().saturating_sub(1));
        (self.start_index..=end)
            .filter(move |index| *index < mip_map.len())
            .map(move |index| SampleRef { mip_map, index })
    }
}

/// Borrowed cursor onto one sample of a mip level.
///
/// The cursor reads straight from the level's arrays, so it stays valid only
/// while the dataset is borrowed. Call [`SampleRef::to_sample`] to keep the
/// values around.
#[derive(Debug, Clone, Copy)]
pub struct SampleRef<'a> {
    mip_map: MipMap<'a>,
    index: usize,
}

impl SampleRef<'_> {
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn x(&self) -> f64 {
        self.mip_map.domain()[self.index]
    }

    /// First range dimension.
    #[must_use]
    pub fn y(&self) -> f64 {
        self.range(0)
    }

    /// Value of range dimension `dimension`; NaN when the dimension does not exist.
    #[must_use]
    pub fn range(&self, dimension: usize) -> f64 {
        self.mip_map
            .range(dimension)
            .get(self.index)
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Domain plus range dimensions.
    #[must_use]
    pub fn tuple_len(&self) -> usize {
        1 + self.mip_map.range_tuple_size()
    }

    #[must_use]
    pub fn to_sample(&self) -> Sample {
        Sample {
            x: self.x(),
            ys: (0..self.mip_map.range_tuple_size())
                .map(|dimension| self.range(dimension))
                .collect(),
        }
    }
}

/// Owned copy of a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub ys: SmallVec<[f64; 4]>,
}
