//! Feature templates (Zhang & Nivre 2011) and their hashed keys.
//!
//! Each template's salt is its enum discriminant, so two templates can never
//! share a salt. A key is the FxHash of `(salt, values)` passed through a
//! 64-bit finalizer so its low bits are usable as a table index.

use super::context::{StateContext, TokenView};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// One feature template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Template {
    // single words
    S0wp,
    S0w,
    S0p,
    N0wp,
    N0w,
    N0p,
    N1wp,
    N1w,
    N1p,
    N2wp,
    N2w,
    N2p,
    // word pairs
    S0wpN0wp,
    S0wpN0w,
    S0wN0wp,
    S0wpN0p,
    S0pN0wp,
    S0wN0w,
    S0pN0p,
    N0pN1p,
    // three words
    N0pN1pN2p,
    S0pN0pN1p,
    S0hpS0pN0p,
    S0pS0lpN0p,
    S0pS0rpN0p,
    S0pN0pN0lp,
    // distance
    S0wd,
    S0pd,
    N0wd,
    N0pd,
    S0wN0wd,
    S0pN0pd,
    // valency
    S0wVr,
    S0pVr,
    S0wVl,
    S0pVl,
    N0wVl,
    N0pVl,
    // first-order neighbours
    S0hw,
    S0hp,
    S0lw,
    S0lp,
    S0rw,
    S0rp,
    N0lw,
    N0lp,
    // second-order neighbours
    S0h2w,
    S0h2p,
    S0l2w,
    S0l2p,
    S0r2w,
    S0r2p,
    N0l2w,
    N0l2p,
    S0pS0lpS0l2p,
    S0pS0rpS0r2p,
    S0pS0hpS0h2p,
    N0pN0lpN0l2p,
}

impl Template {
    /// Hash salt distinguishing this template from every other
    pub fn salt(self) -> u16 {
        self as u16
    }

    /// Hashed feature key of this template at a configuration
    pub fn key(self, ctx: &StateContext, tokens: &TokenView<'_>) -> u64 {
        let s0 = Some(ctx.s0);
        let n0 = Some(ctx.n0);
        let n1 = Some(ctx.n0 + 1);
        let n2 = Some(ctx.n0 + 2);
        let (w, p) = (|i: Option<usize>| tokens.word(i), |i: Option<usize>| tokens.tag(i));
        let d = ctx.distance();
        let vr = ctx.s0_right_valency as i64;
        let vl = ctx.s0_left_valency as i64;
        let n0vl = ctx.n0_left_valency as i64;

        use Template::*;
        match self {
            S0wp => mix(self, &[w(s0), p(s0)]),
            S0w => mix(self, &[w(s0)]),
            S0p => mix(self, &[p(s0)]),
            N0wp => mix(self, &[w(n0), p(n0)]),
            N0w => mix(self, &[w(n0)]),
            N0p => mix(self, &[p(n0)]),
            N1wp => mix(self, &[w(n1), p(n1)]),
            N1w => mix(self, &[w(n1)]),
            N1p => mix(self, &[p(n1)]),
            N2wp => mix(self, &[w(n2), p(n2)]),
            N2w => mix(self, &[w(n2)]),
            N2p => mix(self, &[p(n2)]),

            S0wpN0wp => mix(self, &[w(s0), p(s0), w(n0), p(n0)]),
            S0wpN0w => mix(self, &[w(s0), p(s0), w(n0)]),
            S0wN0wp => mix(self, &[w(s0), w(n0), p(n0)]),
            S0wpN0p => mix(self, &[w(s0), p(s0), p(n0)]),
            S0pN0wp => mix(self, &[p(s0), w(n0), p(n0)]),
            S0wN0w => mix(self, &[w(s0), w(n0)]),
            S0pN0p => mix(self, &[p(s0), p(n0)]),
            N0pN1p => mix(self, &[p(n0), p(n1)]),

            N0pN1pN2p => mix(self, &[p(n0), p(n1), p(n2)]),
            S0pN0pN1p => mix(self, &[p(s0), p(n0), p(n1)]),
            S0hpS0pN0p => mix(self, &[p(ctx.s0_head), p(s0), p(n0)]),
            S0pS0lpN0p => mix(self, &[p(s0), p(ctx.s0_left), p(n0)]),
            S0pS0rpN0p => mix(self, &[p(s0), p(ctx.s0_right), p(n0)]),
            S0pN0pN0lp => mix(self, &[p(s0), p(n0), p(ctx.n0_left)]),

            S0wd => mix(self, &[w(s0), d]),
            S0pd => mix(self, &[p(s0), d]),
            N0wd => mix(self, &[w(n0), d]),
            N0pd => mix(self, &[p(n0), d]),
            S0wN0wd => mix(self, &[w(s0), w(n0), d]),
            S0pN0pd => mix(self, &[p(s0), p(n0), d]),

            S0wVr => mix(self, &[w(s0), vr]),
            S0pVr => mix(self, &[p(s0), vr]),
            S0wVl => mix(self, &[w(s0), vl]),
            S0pVl => mix(self, &[p(s0), vl]),
            N0wVl => mix(self, &[w(n0), n0vl]),
            N0pVl => mix(self, &[p(n0), n0vl]),

            S0hw => mix(self, &[w(ctx.s0_head)]),
            S0hp => mix(self, &[p(ctx.s0_head)]),
            S0lw => mix(self, &[w(ctx.s0_left)]),
            S0lp => mix(self, &[p(ctx.s0_left)]),
            S0rw => mix(self, &[w(ctx.s0_right)]),
            S0rp => mix(self, &[p(ctx.s0_right)]),
            N0lw => mix(self, &[w(ctx.n0_left)]),
            N0lp => mix(self, &[p(ctx.n0_left)]),

            S0h2w => mix(self, &[w(ctx.s0_head2)]),
            S0h2p => mix(self, &[p(ctx.s0_head2)]),
            S0l2w => mix(self, &[w(ctx.s0_left2)]),
            S0l2p => mix(self, &[p(ctx.s0_left2)]),
            S0r2w => mix(self, &[w(ctx.s0_right2)]),
            S0r2p => mix(self, &[p(ctx.s0_right2)]),
            N0l2w => mix(self, &[w(ctx.n0_left2)]),
            N0l2p => mix(self, &[p(ctx.n0_left2)]),
            S0pS0lpS0l2p => mix(self, &[p(s0), p(ctx.s0_left), p(ctx.s0_left2)]),
            S0pS0rpS0r2p => mix(self, &[p(s0), p(ctx.s0_right), p(ctx.s0_right2)]),
            S0pS0hpS0h2p => mix(self, &[p(s0), p(ctx.s0_head), p(ctx.s0_head2)]),
            N0pN0lpN0l2p => mix(self, &[p(n0), p(ctx.n0_left), p(ctx.n0_left2)]),
        }
    }
}

fn mix(template: Template, values: &[i64]) -> u64 {
    let mut hasher = FxHasher::default();
    template.salt().hash(&mut hasher);
    values.hash(&mut hasher);
    finalize(hasher.finish())
}

// murmur3 fmix64
fn finalize(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}
