//! Geometric finger-count classifiers.
//!
//! Two pure classifiers over one hand's 21 landmarks:
//!
//! - [`count_extended_fingers`] — squared-distance model with aspect-ratio
//!   correction. This is the classifier the detection scheduler runs.
//! - [`count_extended_fingers_angular`] — hybrid PIP-angle + distance model.
//!   Slightly less sensitive near the extension threshold; kept as the
//!   alternative for callers that prefer angle-based behaviour.
//!
//! Both return 0 for inputs with fewer than 21 points — malformed input is
//! "no hand", not an error.

use super::{index, Landmark, LANDMARK_COUNT};

/// Margin factor for the thumb abduction check: tip-to-pinky-base squared
/// distance must exceed IP-to-pinky-base squared distance × 1.3225 (1.15²).
const THUMB_ABDUCTION_MARGIN: f32 = 1.3225;

/// Thumb tip must be at least this factor of the MCP-to-wrist squared
/// distance away from the wrist.
const THUMB_WRIST_MARGIN: f32 = 0.7;

/// Thumb tip must be farther from the index MCP than the thumb MCP is, by
/// this factor (squared).
const THUMB_INDEX_MARGIN: f32 = 1.1;

/// A finger counts as extended when its tip is ≥ 1.35× farther from the
/// wrist than its own MCP (1.8225 = 1.35² on squared distances).
const FINGER_EXTENSION_MARGIN: f32 = 1.8225;

/// The four non-thumb fingers as (MCP, TIP) index pairs.
const FINGERS: [(usize, usize); 4] = [
    (index::INDEX_MCP, index::INDEX_TIP),
    (index::MIDDLE_MCP, index::MIDDLE_TIP),
    (index::RING_MCP, index::RING_TIP),
    (index::PINKY_MCP, index::PINKY_TIP),
];

/// Squared 3-D distance with `x` and `z` scaled by the frame aspect ratio.
///
/// `y` is never scaled: landmark coordinates are normalized per-axis, so on
/// a non-square frame one unit of x covers more pixels than one unit of y.
/// Scaling x (and the x-scaled z) by width/height restores isotropy.
fn distance_sq(a: &Landmark, b: &Landmark, ratio: f32) -> f32 {
    let dx = (a.x - b.x) * ratio;
    let dy = a.y - b.y;
    let dz = (a.z - b.z) * ratio;
    dx * dx + dy * dy + dz * dz
}

/// Count extended fingers using the squared-distance model.
///
/// `aspect_ratio` is the source frame's width / height. Returns 0–5; inputs
/// with fewer than [`LANDMARK_COUNT`] points yield 0.
///
/// The thumb is tested separately because it flexes laterally: it counts
/// only when it has swung outward from the palm (tip clears the pinky base
/// by [`THUMB_ABDUCTION_MARGIN`]) *and* both secondary reach checks pass.
pub fn count_extended_fingers(landmarks: &[Landmark], aspect_ratio: f32) -> u8 {
    if landmarks.len() < LANDMARK_COUNT {
        return 0;
    }

    let wrist = &landmarks[index::WRIST];
    let pinky_mcp = &landmarks[index::PINKY_MCP];
    let mut count = 0u8;

    // --- Thumb ---
    let thumb_mcp = &landmarks[index::THUMB_MCP];
    let thumb_ip = &landmarks[index::THUMB_IP];
    let thumb_tip = &landmarks[index::THUMB_TIP];
    let index_mcp = &landmarks[index::INDEX_MCP];

    let tip_to_pinky = distance_sq(thumb_tip, pinky_mcp, aspect_ratio);
    let ip_to_pinky = distance_sq(thumb_ip, pinky_mcp, aspect_ratio);

    if tip_to_pinky > ip_to_pinky * THUMB_ABDUCTION_MARGIN {
        let tip_to_wrist = distance_sq(thumb_tip, wrist, aspect_ratio);
        let mcp_to_wrist = distance_sq(thumb_mcp, wrist, aspect_ratio);
        let tip_to_index = distance_sq(thumb_tip, index_mcp, aspect_ratio);
        let mcp_to_index = distance_sq(thumb_mcp, index_mcp, aspect_ratio);

        if tip_to_wrist > mcp_to_wrist * THUMB_WRIST_MARGIN
            && tip_to_index > mcp_to_index * THUMB_INDEX_MARGIN
        {
            count += 1;
        }
    }

    // --- Index / middle / ring / pinky ---
    for (mcp, tip) in FINGERS {
        let wrist_to_tip = distance_sq(wrist, &landmarks[tip], aspect_ratio);
        let wrist_to_mcp = distance_sq(wrist, &landmarks[mcp], aspect_ratio);
        if wrist_to_tip > wrist_to_mcp * FINGER_EXTENSION_MARGIN {
            count += 1;
        }
    }

    count
}

// ---------------------------------------------------------------------------
// Angular variant
// ---------------------------------------------------------------------------

/// Minimum interior PIP angle (degrees) for a finger to read as straight.
const STRAIGHT_ANGLE_DEG: f32 = 160.0;

/// Tip must be at least 20 % farther from the wrist than the MCP.
const ANGULAR_TIP_MARGIN: f32 = 1.2;

/// Thumb linearity threshold: MCP→tip distance over the two-segment path.
const THUMB_LINEARITY: f32 = 0.85;

/// Thumb tip must clear the index knuckle by half the palm scale.
const THUMB_PALM_CLEARANCE: f32 = 0.5;

fn hypot2(a: &Landmark, b: &Landmark) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Interior angle at `b` (degrees) between the 2-D vectors `b→a` and `b→c`.
///
/// Degenerate zero-length vectors read as 180° (straight) so a collapsed
/// joint never flips a finger to "curled" on its own.
fn joint_angle_deg(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let (abx, aby) = (a.x - b.x, a.y - b.y);
    let (cbx, cby) = (c.x - b.x, c.y - b.y);
    let mag_ab = abx.hypot(aby);
    let mag_cb = cbx.hypot(cby);
    if mag_ab == 0.0 || mag_cb == 0.0 {
        return 180.0;
    }
    let cos = ((abx * cbx + aby * cby) / (mag_ab * mag_cb)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Count extended fingers using the hybrid angle + distance model.
///
/// Each non-thumb finger must be straight at the PIP joint (interior angle
/// above [`STRAIGHT_ANGLE_DEG`]) *and* have its tip at least
/// [`ANGULAR_TIP_MARGIN`]× farther from the wrist than its MCP. The thumb is
/// tested by segment linearity plus clearance from the index knuckle.
///
/// Distances here are plain 2-D distances; no aspect correction is applied.
pub fn count_extended_fingers_angular(landmarks: &[Landmark]) -> u8 {
    if landmarks.len() < LANDMARK_COUNT {
        return 0;
    }

    let wrist = &landmarks[index::WRIST];
    let index_mcp = &landmarks[index::INDEX_MCP];

    // Palm scale: wrist to index knuckle.
    let scale = hypot2(index_mcp, wrist);

    let mut count = 0u8;

    // --- Thumb ---
    let thumb_mcp = &landmarks[index::THUMB_MCP];
    let thumb_ip = &landmarks[index::THUMB_IP];
    let thumb_tip = &landmarks[index::THUMB_TIP];

    let mcp_ip = hypot2(thumb_ip, thumb_mcp);
    let ip_tip = hypot2(thumb_tip, thumb_ip);
    let mcp_tip = hypot2(thumb_tip, thumb_mcp);
    let path = mcp_ip + ip_tip;
    let linearity = if path == 0.0 { 0.0 } else { mcp_tip / path };

    let tip_clearance = hypot2(thumb_tip, index_mcp);

    if linearity > THUMB_LINEARITY && tip_clearance > scale * THUMB_PALM_CLEARANCE {
        count += 1;
    }

    // --- Index / middle / ring / pinky ---
    const JOINTS: [(usize, usize, usize); 4] = [
        (index::INDEX_MCP, index::INDEX_PIP, index::INDEX_TIP),
        (index::MIDDLE_MCP, index::MIDDLE_PIP, index::MIDDLE_TIP),
        (index::RING_MCP, index::RING_PIP, index::RING_TIP),
        (index::PINKY_MCP, index::PINKY_PIP, index::PINKY_TIP),
    ];

    for (mcp, pip, tip) in JOINTS {
        let angle = joint_angle_deg(&landmarks[mcp], &landmarks[pip], &landmarks[tip]);
        let wrist_tip = hypot2(&landmarks[tip], wrist);
        let wrist_mcp = hypot2(&landmarks[mcp], wrist);

        if angle > STRAIGHT_ANGLE_DEG && wrist_tip > wrist_mcp * ANGULAR_TIP_MARGIN {
            count += 1;
        }
    }

    count
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::synthetic::{closed_fist, open_hand};

    fn lm(x: f32, y: f32) -> Landmark {
        Landmark::new(x, y, 0.0)
    }

    // ---- Malformed input --------------------------------------------------

    #[test]
    fn fewer_than_21_points_counts_zero() {
        let short = vec![Landmark::default(); LANDMARK_COUNT - 1];
        assert_eq!(count_extended_fingers(&short, 1.0), 0);
        assert_eq!(count_extended_fingers_angular(&short), 0);
    }

    #[test]
    fn empty_input_counts_zero() {
        assert_eq!(count_extended_fingers(&[], 1.0), 0);
        assert_eq!(count_extended_fingers_angular(&[]), 0);
    }

    // ---- Canonical poses, distance model ----------------------------------

    #[test]
    fn open_hand_counts_five() {
        assert_eq!(count_extended_fingers(&open_hand(), 1.0), 5);
    }

    #[test]
    fn closed_fist_counts_zero() {
        assert_eq!(count_extended_fingers(&closed_fist(), 1.0), 0);
    }

    #[test]
    fn open_hand_counts_five_on_wide_frame() {
        // 4:3 frame: x and z shrink relative to y but the pose still reads
        // as fully open.
        assert_eq!(count_extended_fingers(&open_hand(), 4.0 / 3.0), 5);
    }

    #[test]
    fn curled_thumb_is_not_counted() {
        // Open hand but with the thumb folded across the palm.
        let mut h = open_hand();
        h[index::THUMB_IP] = lm(0.44, 0.70);
        h[index::THUMB_TIP] = lm(0.52, 0.64);
        assert_eq!(count_extended_fingers(&h, 1.0), 4);
    }

    #[test]
    fn single_curled_finger_drops_count_by_one() {
        let mut h = open_hand();
        // Fold the middle finger down onto its knuckle.
        h[index::MIDDLE_TIP] = lm(0.50, 0.60);
        assert_eq!(count_extended_fingers(&h, 1.0), 4);
    }

    #[test]
    fn output_never_exceeds_five() {
        // Property sweep over a few degenerate all-same-point hands.
        let degenerate = vec![lm(0.5, 0.5); LANDMARK_COUNT];
        assert!(count_extended_fingers(&degenerate, 1.0) <= 5);
        assert!(count_extended_fingers(&open_hand(), 10.0) <= 5);
    }

    // ---- Canonical poses, angular model ------------------------------------

    #[test]
    fn angular_open_hand_counts_five() {
        assert_eq!(count_extended_fingers_angular(&open_hand()), 5);
    }

    #[test]
    fn angular_closed_fist_counts_zero() {
        assert_eq!(count_extended_fingers_angular(&closed_fist()), 0);
    }

    #[test]
    fn angular_bent_finger_fails_angle_check() {
        let mut h = open_hand();
        // Kink the index finger 90° at the PIP while keeping the tip far
        // from the wrist: distance check alone would pass, the angle must
        // veto it.
        h[index::INDEX_PIP] = lm(0.43, 0.38);
        h[index::INDEX_DIP] = lm(0.33, 0.38);
        h[index::INDEX_TIP] = lm(0.23, 0.38);
        assert_eq!(count_extended_fingers_angular(&h), 4);
    }

    // ---- joint_angle_deg helper --------------------------------------------

    #[test]
    fn straight_joint_is_180_degrees() {
        let a = lm(0.0, 0.0);
        let b = lm(0.5, 0.0);
        let c = lm(1.0, 0.0);
        assert!((joint_angle_deg(&a, &b, &c) - 180.0).abs() < 1e-3);
    }

    #[test]
    fn right_angle_joint_is_90_degrees() {
        let a = lm(0.0, 0.0);
        let b = lm(0.5, 0.0);
        let c = lm(0.5, 0.5);
        assert!((joint_angle_deg(&a, &b, &c) - 90.0).abs() < 1e-3);
    }

    #[test]
    fn degenerate_joint_reads_straight() {
        let p = lm(0.5, 0.5);
        assert_eq!(joint_angle_deg(&p, &p, &p), 180.0);
    }

    // ---- Aspect-ratio sensitivity ------------------------------------------

    #[test]
    fn distance_sq_scales_x_and_z_only() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(1.0, 1.0, 1.0);
        let d1 = distance_sq(&a, &b, 1.0);
        let d2 = distance_sq(&a, &b, 2.0);
        // x² + y² + z² = 3 at ratio 1; 4 + 1 + 4 = 9 at ratio 2.
        assert!((d1 - 3.0).abs() < 1e-6);
        assert!((d2 - 9.0).abs() < 1e-6);
    }
}
