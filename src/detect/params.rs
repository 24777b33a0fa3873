use super::mode::DetectorMode;

/// Upper bound on pyramid levels scanned per image.
pub const MAX_PYRAMID_LEVELS: usize = 64;

/// Rectangle similarity tolerance used by neighbour grouping.
pub const GROUP_EPS: f64 = 0.2;

/// How raw windows are merged into final boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupingPolicy {
    /// Cluster similar rectangles and keep clusters with enough members.
    Neighbors,
    /// Mean-shift over window centre and log-scale.
    MeanShift,
}

/// Search parameters bound to a detector mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    /// Minimum linear margin for a window to count as a hit.
    pub hit_threshold: f64,
    pub win_stride: (u32, u32),
    pub padding: (u32, u32),
    /// Scale factor between pyramid levels.
    pub scale_step: f64,
    /// Neighbour count (or mean-shift weight) a group must exceed to survive.
    pub group_threshold: usize,
    pub grouping: GroupingPolicy,
    pub max_levels: usize,
}

impl DetectionParams {
    pub fn for_mode(mode: DetectorMode) -> Self {
        match mode {
            DetectorMode::Default => Self {
                hit_threshold: 0.0,
                win_stride: (8, 8),
                padding: (32, 32),
                scale_step: 1.05,
                group_threshold: 2,
                grouping: GroupingPolicy::Neighbors,
                max_levels: MAX_PYRAMID_LEVELS,
            },
            DetectorMode::Daimler => Self {
                hit_threshold: 0.5,
                win_stride: (8, 8),
                padding: (32, 32),
                scale_step: 1.05,
                group_threshold: 2,
                grouping: GroupingPolicy::MeanShift,
                max_levels: MAX_PYRAMID_LEVELS,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_differ_only_in_threshold_and_grouping() {
        let default = DetectionParams::for_mode(DetectorMode::Default);
        let daimler = DetectionParams::for_mode(DetectorMode::Daimler);

        assert_eq!(default.hit_threshold, 0.0);
        assert_eq!(daimler.hit_threshold, 0.5);
        assert_eq!(default.grouping, GroupingPolicy::Neighbors);
        assert_eq!(daimler.grouping, GroupingPolicy::MeanShift);

        for params in [default, daimler] {
            assert_eq!(params.win_stride, (8, 8));
            assert_eq!(params.padding, (32, 32));
            assert_eq!(params.scale_step, 1.05);
            assert_eq!(params.group_threshold, 2);
        }
    }
}
