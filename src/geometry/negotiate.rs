//! Preview and picture size negotiation.
//!
//! Picks one `(preview, picture)` pair sharing a single aspect ratio out of
//! the two lists a device reports. Two selection policies are available:
//!
//! - **Mid-rank**: collect every matching pair, sort by picture width and take
//!   the upper-middle entry. Avoids both the smallest offering (poor quality)
//!   and the largest one (slow, memory hungry).
//! - **Threshold**: for each list on its own, take the smallest size at least as
//!   large as an expected size, or the largest size if none reaches it.

use super::size::{AspectMode, AspectRatio, Size};
use serde::{Deserialize, Serialize};

/// A preview size and a picture size with the same aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeCandidate {
    pub preview: Size,
    pub picture: Size,
}

impl SizeCandidate {
    pub fn new(preview: Size, picture: Size) -> Self {
        Self { preview, picture }
    }
}

/// How a single pair is chosen from the matching sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SizePolicy {
    #[default]
    MidRank,
    Threshold {
        preview: Size,
        picture: Size,
    },
}

/// Tries each mode in priority order and returns the first one that matches.
pub fn negotiate_any(
    previews: &[Size],
    pictures: &[Size],
    modes: &[AspectMode],
    policy: &SizePolicy,
) -> Option<(AspectMode, SizeCandidate)> {
    modes.iter().find_map(|&mode| {
        let found = negotiate(previews, pictures, mode, policy);
        tracing::debug!(%mode, ?found, "Size negotiation attempt");
        found.map(|candidate| (mode, candidate))
    })
}

/// Negotiates one pair for a single aspect mode.
///
/// Returns `None` when either list is empty or nothing matches.
pub fn negotiate(
    previews: &[Size],
    pictures: &[Size],
    mode: AspectMode,
    policy: &SizePolicy,
) -> Option<SizeCandidate> {
    if previews.is_empty() || pictures.is_empty() {
        return None;
    }

    match policy {
        SizePolicy::MidRank => pick_mid_rank(candidates(previews, pictures, mode)),
        SizePolicy::Threshold { preview, picture } => {
            let ratio = match mode {
                AspectMode::Fixed(ratio) => ratio,
                // The sensor's native ratio is the one its largest still size has.
                AspectMode::Auto => pictures
                    .iter()
                    .filter(|s| !s.is_empty())
                    .max_by_key(|s| s.area())
                    .and_then(|s| AspectRatio::try_from(*s).ok())?,
            };
            let preview = pick_threshold(previews, ratio, *preview)?;
            let picture = pick_threshold(pictures, ratio, *picture)?;
            Some(SizeCandidate::new(preview, picture))
        }
    }
}

/// Every pair whose preview and picture sizes share a ratio, sorted by
/// picture width ascending.
///
/// For a fixed mode the preview sizes are first restricted to the target ratio.
/// In auto mode any ratio the two sizes agree on is accepted.
pub fn candidates(previews: &[Size], pictures: &[Size], mode: AspectMode) -> Vec<SizeCandidate> {
    let mut found: Vec<SizeCandidate> = previews
        .iter()
        .filter(|preview| !preview.is_empty())
        .filter(|preview| match mode {
            AspectMode::Auto => true,
            AspectMode::Fixed(ratio) => ratio.accepts(preview),
        })
        .flat_map(|preview| {
            pictures
                .iter()
                .filter(move |picture| preview.same_aspect_as(picture))
                .map(move |picture| SizeCandidate::new(*preview, *picture))
        })
        .collect();

    // Stable, so equal widths keep device order.
    found.sort_by_key(|c| c.picture.width);
    found
}

/// Picks from candidates already sorted by picture width.
///
/// One or two candidates: the largest. Three or more: index `(n + 1) / 2`.
pub fn pick_mid_rank(candidates: Vec<SizeCandidate>) -> Option<SizeCandidate> {
    let n = candidates.len();
    match n {
        0 => None,
        1 | 2 => candidates.last().copied(),
        _ => candidates.get((n + 1) / 2).copied(),
    }
}

/// Smallest size of `ratio` covering `expected`, else the largest size of `ratio`.
pub fn pick_threshold(sizes: &[Size], ratio: AspectRatio, expected: Size) -> Option<Size> {
    let matching = sizes.iter().filter(|s| !s.is_empty() && ratio.accepts(s));

    let covering = matching
        .clone()
        .filter(|s| s.width >= expected.width && s.height >= expected.height)
        .min_by_key(|s| (s.area(), s.width));

    covering
        .or_else(|| matching.max_by_key(|s| (s.area(), s.width)))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sizes(list: &[(u32, u32)]) -> Vec<Size> {
        list.iter().map(|&(w, h)| Size::new(w, h)).collect()
    }

    fn four_three() -> AspectMode {
        AspectMode::Fixed(AspectRatio::STANDARD)
    }

    #[test]
    fn test_mid_rank_picks_upper_middle() {
        let list: Vec<SizeCandidate> = [100, 200, 300, 400, 500]
            .iter()
            .map(|&w| SizeCandidate::new(Size::new(w, w), Size::new(w, w)))
            .collect();

        let chosen = pick_mid_rank(list).unwrap();
        assert_eq!(chosen.picture.width, 400);
    }

    #[test]
    fn test_mid_rank_small_sets_take_largest() {
        let one = vec![SizeCandidate::new(Size::new(4, 3), Size::new(8, 6))];
        assert_eq!(pick_mid_rank(one).unwrap().picture.width, 8);

        let two = vec![
            SizeCandidate::new(Size::new(4, 3), Size::new(8, 6)),
            SizeCandidate::new(Size::new(4, 3), Size::new(16, 12)),
        ];
        assert_eq!(pick_mid_rank(two).unwrap().picture.width, 16);
    }

    #[test]
    fn test_empty_lists_do_not_match() {
        let previews = sizes(&[(640, 480)]);
        assert!(negotiate(&[], &previews, AspectMode::Auto, &SizePolicy::MidRank).is_none());
        assert!(negotiate(&previews, &[], four_three(), &SizePolicy::MidRank).is_none());
        assert!(pick_mid_rank(Vec::new()).is_none());
    }

    #[test]
    fn test_fixed_ratio_filters_previews() {
        let previews = sizes(&[(1920, 1080), (1280, 720), (640, 480)]);
        let pictures = sizes(&[(4000, 3000), (3840, 2160), (1600, 1200)]);

        let found = candidates(&previews, &pictures, four_three());
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.preview == Size::new(640, 480)));
        assert_eq!(found[0].picture, Size::new(1600, 1200));
    }

    #[test]
    fn test_auto_pairs_any_shared_ratio() {
        let previews = sizes(&[(1280, 720), (640, 480)]);
        let pictures = sizes(&[(3840, 2160), (2048, 1536), (1000, 1000)]);

        let found = candidates(&previews, &pictures, AspectMode::Auto);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].picture, Size::new(2048, 1536));
        assert_eq!(found[1].picture, Size::new(3840, 2160));
    }

    #[test]
    fn test_priority_list_falls_through() {
        let previews = sizes(&[(1280, 720)]);
        let pictures = sizes(&[(1920, 1080)]);
        let modes = [
            AspectMode::Fixed(AspectRatio::SQUARE),
            AspectMode::Fixed(AspectRatio::WIDE),
        ];

        let (mode, chosen) =
            negotiate_any(&previews, &pictures, &modes, &SizePolicy::MidRank).unwrap();
        assert_eq!(mode, AspectMode::Fixed(AspectRatio::WIDE));
        assert_eq!(chosen.picture, Size::new(1920, 1080));
    }

    #[test]
    fn test_unsupported_ratio_is_none() {
        let previews = sizes(&[(1280, 720)]);
        let pictures = sizes(&[(1920, 1080)]);
        let modes = [AspectMode::Fixed(AspectRatio::SQUARE)];
        assert!(negotiate_any(&previews, &pictures, &modes, &SizePolicy::MidRank).is_none());
    }

    #[test]
    fn test_threshold_smallest_covering() {
        let list = sizes(&[(640, 480), (1280, 960), (1600, 1200), (1920, 1080)]);
        let chosen = pick_threshold(&list, AspectRatio::STANDARD, Size::new(1000, 700));
        assert_eq!(chosen, Some(Size::new(1280, 960)));
    }

    #[test]
    fn test_threshold_falls_back_to_largest() {
        let list = sizes(&[(640, 480), (1280, 960)]);
        let chosen = pick_threshold(&list, AspectRatio::STANDARD, Size::new(4000, 3000));
        assert_eq!(chosen, Some(Size::new(1280, 960)));
    }

    #[test]
    fn test_degenerate_device_sizes_are_skipped() {
        let previews = sizes(&[(0, 0), (640, 480), (0, 480)]);
        let pictures = sizes(&[(0, 0), (1600, 1200)]);

        let found = candidates(&previews, &pictures, AspectMode::Auto);
        assert_eq!(
            found,
            vec![SizeCandidate::new(Size::new(640, 480), Size::new(1600, 1200))]
        );

        let only_zero = sizes(&[(0, 0)]);
        let policy = SizePolicy::Threshold {
            preview: Size::new(1, 1),
            picture: Size::new(1, 1),
        };
        assert_eq!(negotiate(&only_zero, &pictures, AspectMode::Auto, &SizePolicy::MidRank), None);
        assert_eq!(negotiate(&only_zero, &pictures, AspectMode::Auto, &policy), None);
        // No usable picture size leaves no ratio to target.
        assert_eq!(negotiate(&previews, &only_zero, AspectMode::Auto, &policy), None);
        assert_eq!(
            pick_threshold(&only_zero, AspectRatio::SQUARE, Size::new(1, 1)),
            None
        );
    }

    #[test]
    fn test_threshold_policy_negotiates_both_lists() {
        let previews = sizes(&[(640, 480), (1440, 1080), (1920, 1080)]);
        let pictures = sizes(&[(1600, 1200), (3264, 2448), (4000, 3000)]);
        let policy = SizePolicy::Threshold {
            preview: Size::new(1280, 720),
            picture: Size::new(3000, 2000),
        };

        let chosen = negotiate(&previews, &pictures, four_three(), &policy).unwrap();
        assert_eq!(chosen.preview, Size::new(1440, 1080));
        assert_eq!(chosen.picture, Size::new(3264, 2448));
    }

    #[test]
    fn test_threshold_auto_uses_largest_picture_ratio() {
        let previews = sizes(&[(1280, 720), (640, 480)]);
        let pictures = sizes(&[(1920, 1080), (4000, 3000)]);
        let policy = SizePolicy::Threshold {
            preview: Size::new(1, 1),
            picture: Size::new(1, 1),
        };

        let chosen = negotiate(&previews, &pictures, AspectMode::Auto, &policy).unwrap();
        assert_eq!(chosen.preview, Size::new(640, 480));
        assert_eq!(chosen.picture, Size::new(4000, 3000));
    }

    fn size_strategy() -> impl Strategy<Value = Size> {
        (1u32..40, 1u32..40, 1u32..80).prop_map(|(x, y, k)| Size::new(x * k, y * k))
    }

    proptest! {
        #[test]
        fn prop_fixed_ratio_pairs_match_target(
            previews in prop::collection::vec(size_strategy(), 0..12),
            pictures in prop::collection::vec(size_strategy(), 0..12),
            x in 1u32..20,
            y in 1u32..20,
        ) {
            let ratio = AspectRatio::new(x, y).unwrap();
            if let Some(c) = negotiate(&previews, &pictures, ratio.into(), &SizePolicy::MidRank) {
                prop_assert!(ratio.accepts(&c.preview));
                prop_assert!(ratio.accepts(&c.picture));
            }
        }

        #[test]
        fn prop_auto_pairs_share_ratio(
            previews in prop::collection::vec(size_strategy(), 0..12),
            pictures in prop::collection::vec(size_strategy(), 0..12),
        ) {
            if let Some(c) = negotiate(&previews, &pictures, AspectMode::Auto, &SizePolicy::MidRank) {
                prop_assert!(c.preview.same_aspect_as(&c.picture));
            }
        }
    }
}
