//! Synthetic hand poses.
//!
//! Used by the hardware-free simulation mode (scripted backend) and by the
//! classifier tests. Coordinates are image-normalized with y growing
//! downward, the way detection backends deliver them.

use super::{index, Landmark, LANDMARK_COUNT};

fn lm(x: f32, y: f32) -> Landmark {
    Landmark::new(x, y, 0.0)
}

fn lerp(a: Landmark, b: Landmark, t: f32) -> Landmark {
    Landmark::new(
        a.x + (b.x - a.x) * t,
        a.y + (b.y - a.y) * t,
        a.z + (b.z - a.z) * t,
    )
}

/// Fill indices `base..base+4` (MCP, PIP, DIP, TIP) along a straight
/// segment from `mcp` to `tip`.
fn fill_finger(out: &mut [Landmark], base: usize, mcp: Landmark, tip: Landmark) {
    out[base] = mcp;
    out[base + 1] = lerp(mcp, tip, 1.0 / 3.0);
    out[base + 2] = lerp(mcp, tip, 2.0 / 3.0);
    out[base + 3] = tip;
}

/// Canonical flat open hand: four fingers straight up from the palm, thumb
/// abducted far to the side. Classifies as 5.
pub fn open_hand() -> Vec<Landmark> {
    let mut h = vec![Landmark::default(); LANDMARK_COUNT];
    h[index::WRIST] = lm(0.5, 0.9);

    h[index::THUMB_CMC] = lm(0.44, 0.82);
    h[index::THUMB_MCP] = lm(0.38, 0.75);
    h[index::THUMB_IP] = lm(0.30, 0.68);
    h[index::THUMB_TIP] = lm(0.18, 0.60);

    fill_finger(&mut h, index::INDEX_MCP, lm(0.45, 0.55), lm(0.43, 0.20));
    fill_finger(&mut h, index::MIDDLE_MCP, lm(0.50, 0.53), lm(0.50, 0.15));
    fill_finger(&mut h, index::RING_MCP, lm(0.55, 0.55), lm(0.57, 0.20));
    fill_finger(&mut h, index::PINKY_MCP, lm(0.60, 0.58), lm(0.63, 0.28));
    h
}

/// Canonical closed fist: tips curled back toward the palm, thumb adducted
/// across it. Classifies as 0.
pub fn closed_fist() -> Vec<Landmark> {
    let mut h = vec![Landmark::default(); LANDMARK_COUNT];
    h[index::WRIST] = lm(0.5, 0.9);

    h[index::THUMB_CMC] = lm(0.46, 0.82);
    h[index::THUMB_MCP] = lm(0.42, 0.76);
    h[index::THUMB_IP] = lm(0.42, 0.70);
    h[index::THUMB_TIP] = lm(0.50, 0.65);

    // MCP knuckles stay put; the PIP rises and the tip folds back down to
    // the palm.
    for (base, mcp_x) in [
        (index::INDEX_MCP, 0.45),
        (index::MIDDLE_MCP, 0.50),
        (index::RING_MCP, 0.55),
        (index::PINKY_MCP, 0.60),
    ] {
        let mcp = lm(mcp_x, 0.55);
        let pip = lm(mcp_x, 0.45);
        let tip = lm(mcp_x, 0.62);
        h[base] = mcp;
        h[base + 1] = pip;
        h[base + 2] = lerp(pip, tip, 0.5);
        h[base + 3] = tip;
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poses_have_full_topology() {
        assert_eq!(open_hand().len(), LANDMARK_COUNT);
        assert_eq!(closed_fist().len(), LANDMARK_COUNT);
    }

    #[test]
    fn poses_stay_in_normalized_range() {
        for p in open_hand().iter().chain(closed_fist().iter()) {
            assert!((0.0..=1.0).contains(&p.x));
            assert!((0.0..=1.0).contains(&p.y));
        }
    }
}
