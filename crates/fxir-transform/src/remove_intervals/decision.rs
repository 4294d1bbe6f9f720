/*! Static range checks for saturate and wrap lowering.
 *
 * Emitting the general clamp or modulo for every `clip` and `wrap` wastes comparators when the input
 * range already fits. These tables pick the smallest sequence of checks the adjusted bounds allow, in
 * a fixed priority order that can be read and tested on its own.
 */

use num_bigint::BigInt;
use serde::Serialize;

/// Adjusted bounds of the target range and of the incoming value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeCheck {
    pub lo: BigInt,
    pub hi: BigInt,
    pub in_lo: BigInt,
    pub in_hi: BigInt,
}

impl RangeCheck {
    pub fn new(
        lo: impl Into<BigInt>,
        hi: impl Into<BigInt>,
        in_lo: impl Into<BigInt>,
        in_hi: impl Into<BigInt>,
    ) -> Self {
        Self {
            lo: lo.into(),
            hi: hi.into(),
            in_lo: in_lo.into(),
            in_hi: in_hi.into(),
        }
    }

    /// `hi - lo`; the modulus of a wrap is one more than this.
    pub fn range(&self) -> BigInt {
        &self.hi - &self.lo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SaturateAction {
    PassThrough,
    ClampLow,
    ClampHigh,
    ClampBoth,
}

/// Keyed on `(hi >= in_hi, lo <= in_lo)`.
const SATURATE_TABLE: [((bool, bool), SaturateAction); 4] = [
    ((true, true), SaturateAction::PassThrough),
    ((true, false), SaturateAction::ClampLow),
    ((false, true), SaturateAction::ClampHigh),
    ((false, false), SaturateAction::ClampBoth),
];

impl SaturateAction {
    pub fn decide(check: &RangeCheck) -> Self {
        let key = (check.hi >= check.in_hi, check.lo <= check.in_lo);
        SATURATE_TABLE
            .iter()
            .find(|(row, _)| *row == key)
            .map(|(_, action)| *action)
            .unwrap_or(SaturateAction::ClampBoth)
    }

    /// Which sides need a comparison: `(low, high)`.
    pub fn checks(self) -> (bool, bool) {
        match self {
            SaturateAction::PassThrough => (false, false),
            SaturateAction::ClampLow => (true, false),
            SaturateAction::ClampHigh => (false, true),
            SaturateAction::ClampBoth => (true, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WrapAction {
    PassThrough,
    CorrectLow,
    CorrectHigh,
    CorrectBoth,
    /// No single correction suffices; reduce with a remainder.
    Remainder,
}

/// Rows over `[P1, P2, P3, P4]`, first match wins; `None` is "don't care".
///
/// - P1: `hi >= in_hi`
/// - P2: `lo <= in_lo`
/// - P3: `in_hi - range <= hi`
/// - P4: `in_lo + range >= lo`
const WRAP_TABLE: [([Option<bool>; 4], WrapAction); 4] = [
    ([Some(true), Some(true), None, None], WrapAction::PassThrough),
    ([Some(true), Some(false), None, Some(true)], WrapAction::CorrectLow),
    ([Some(false), Some(true), Some(true), None], WrapAction::CorrectHigh),
    ([Some(false), Some(false), Some(true), Some(true)], WrapAction::CorrectBoth),
];

impl WrapAction {
    pub fn predicates(check: &RangeCheck) -> [bool; 4] {
        let range = check.range();
        [
            check.hi >= check.in_hi,
            check.lo <= check.in_lo,
            &check.in_hi - &range <= check.hi,
            &check.in_lo + &range >= check.lo,
        ]
    }

    pub fn decide(check: &RangeCheck) -> Self {
        let predicates = Self::predicates(check);
        WRAP_TABLE
            .iter()
            .find(|(row, _)| {
                row.iter()
                    .zip(predicates)
                    .all(|(cell, p)| cell.map_or(true, |want| want == p))
            })
            .map(|(_, action)| *action)
            .unwrap_or(WrapAction::Remainder)
    }

    /// Which sides get a single correction, or `None` for the remainder form.
    pub fn checks(self) -> Option<(bool, bool)> {
        match self {
            WrapAction::PassThrough => Some((false, false)),
            WrapAction::CorrectLow => Some((true, false)),
            WrapAction::CorrectHigh => Some((false, true)),
            WrapAction::CorrectBoth => Some((true, true)),
            WrapAction::Remainder => None,
        }
    }
}
