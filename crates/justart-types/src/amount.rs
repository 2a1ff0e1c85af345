//! Display conversion between micro-units and whole currency units.

use crate::ProtocolError;

pub const MICRO_UNITS_DECIMALS: u32 = 6;
const SCALE: u64 = 10u64.pow(MICRO_UNITS_DECIMALS);

/// `2_500_000` → `"2.5"`. Trailing zeros are trimmed.
pub fn format_amount(micro: u64) -> String {
    let whole = micro / SCALE;
    let frac = micro % SCALE;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}", width = MICRO_UNITS_DECIMALS as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// `"2.5"` → `2_500_000`. Rejects signs, overflow and sub-micro precision.
pub fn parse_amount(s: &str) -> Result<u64, ProtocolError> {
    let s = s.trim();
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(ProtocolError::Range(format!("not a non-negative amount: {s:?}")));
    }
    if frac.len() > MICRO_UNITS_DECIMALS as usize {
        return Err(ProtocolError::Range(format!(
            "at most {MICRO_UNITS_DECIMALS} decimal places: {s:?}"
        )));
    }
    let overflow = || ProtocolError::Range(format!("amount exceeds uint64: {s:?}"));
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = MICRO_UNITS_DECIMALS as usize);
        padded.parse().map_err(|_| overflow())?
    };
    whole
        .checked_mul(SCALE)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(overflow)
}
