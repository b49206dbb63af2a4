use std::cmp::Ordering;

use crate::error::{Result, ShapefileError};
use crate::number::bigint::BigInt;

/// Exact powers of ten representable as `f64`.
const SMALL_10_POW: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
    1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];
const BIG_10_POW: [f64; 5] = [1e16, 1e32, 1e64, 1e128, 1e256];
const TINY_10_POW: [f64; 5] = [1e-16, 1e-32, 1e-64, 1e-128, 1e-256];

const MAX_SMALL_TEN: i32 = 22;
/// Digits that always fit in the 53-bit mantissa.
const MAX_EXACT_DIGITS: usize = 15;
/// Digits gathered into the `u64` seed of the estimate.
const MAX_SEED_DIGITS: usize = 16;
/// Enough digits to decide the rounding of any decimal; the tail is replaced by a sticky digit.
const MAX_DIGITS: usize = 1100;

/// Decimal exponents (of `0.d1d2... x 10^e`) outside this range overflow or underflow.
const MAX_DECIMAL_EXPONENT: i64 = 309;
const MIN_DECIMAL_EXPONENT: i64 = -324;
/// Margin past the digit count at which an explicit exponent stops mattering.
const EXPONENT_MARGIN: i64 = 1000;

const EXP_SHIFT: u32 = 52;
const FRACT_MASK: u64 = (1 << EXP_SHIFT) - 1;
const HIDDEN_BIT: u64 = 1 << EXP_SHIFT;

/// Characters removed from both ends of numeric text.
pub(crate) fn is_padding(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\t' | '\r' | '\0')
}

#[derive(Debug, Clone, PartialEq)]
enum Numeral {
    NaN,
    Infinity { negative: bool },
    Finite(Decimal),
}

/// `0.d1d2...dn x 10^dec_exponent`, with no leading or trailing zero digits. An empty digit
/// list is zero.
#[derive(Debug, Clone, PartialEq)]
struct Decimal {
    negative: bool,
    digits: Vec<u8>,
    dec_exponent: i64,
}

/// Parse decimal text into the nearest `f64`, rounding ties to even.
///
/// Accepts an optional sign, the literals `NaN` and `Infinity`, digits with an optional decimal
/// point, an optional `e`/`E` exponent and an optional trailing `f`/`F`/`d`/`D` type suffix.
/// Whitespace and NUL padding around the number is ignored.
///
/// ```
/// use geoshape::number::parse_f64;
///
/// assert_eq!(parse_f64("3.14159").unwrap(), 3.14159);
/// assert_eq!(parse_f64("  -1e308 ").unwrap(), -1e308);
/// assert!(parse_f64("1e400").unwrap().is_infinite());
/// assert!(parse_f64("1.2.3").is_err());
/// ```
pub fn parse_f64(text: &str) -> Result<f64> {
    match scan(text)? {
        Numeral::NaN => Ok(f64::NAN),
        Numeral::Infinity { negative } => Ok(signed(negative, f64::INFINITY)),
        Numeral::Finite(decimal) => Ok(signed(
            decimal.negative,
            decimal_to_f64(&decimal.digits, decimal.dec_exponent),
        )),
    }
}

/// Parse decimal text into an `i32`, failing on empty input, non-digits or overflow.
pub fn parse_i32(text: &str) -> Result<i32> {
    let value = parse_integer(text, i64::from(i32::MIN), i64::from(i32::MAX))?;
    Ok(value as i32)
}

/// Parse decimal text into an `i64`, failing on empty input, non-digits or overflow.
pub fn parse_i64(text: &str) -> Result<i64> {
    parse_integer(text, i64::MIN, i64::MAX)
}

fn signed(negative: bool, value: f64) -> f64 {
    if negative {
        -value
    } else {
        value
    }
}

fn not_a_number(text: &str) -> ShapefileError {
    ShapefileError::NumberFormat(format!("\"{text}\""))
}

/// Accumulate digits negatively so that the minimum value, whose magnitude exceeds the
/// maximum, parses without overflow.
fn parse_integer(text: &str, min: i64, max: i64) -> Result<i64> {
    let trimmed = text.trim_matches(is_padding);
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    if digits.is_empty() {
        return Err(not_a_number(text));
    }

    let limit = if negative { min } else { -max };
    let mult_min = limit / 10;
    let mut result = 0i64;
    for byte in digits.bytes() {
        let digit = match byte {
            b'0'..=b'9' => i64::from(byte - b'0'),
            _ => return Err(not_a_number(text)),
        };
        if result < mult_min {
            return Err(not_a_number(text));
        }
        result *= 10;
        if result < limit + digit {
            return Err(not_a_number(text));
        }
        result -= digit;
    }
    Ok(if negative { result } else { -result })
}

fn scan(text: &str) -> Result<Numeral> {
    let trimmed = text.trim_matches(is_padding);
    let bytes = trimmed.as_bytes();

    let mut i = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            i = 1;
            true
        }
        Some(b'+') => {
            i = 1;
            false
        }
        _ => false,
    };
    match &trimmed[i..] {
        "NaN" => return Ok(Numeral::NaN),
        "Infinity" => return Ok(Numeral::Infinity { negative }),
        _ => {}
    }

    let mut digits = Vec::with_capacity(bytes.len());
    let mut point = None;
    while i < bytes.len() {
        match bytes[i] {
            b @ b'0'..=b'9' => digits.push(b),
            b'.' if point.is_none() => point = Some(digits.len()),
            b'.' => return Err(not_a_number(text)),
            _ => break,
        }
        i += 1;
    }
    if digits.is_empty() {
        return Err(not_a_number(text));
    }

    let mut exponent = 0i64;
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        let exp_negative = match bytes.get(i) {
            Some(b'-') => {
                i += 1;
                true
            }
            Some(b'+') => {
                i += 1;
                false
            }
            _ => false,
        };
        // Leading zeros and the point shift the exponent by at most the digit count, so past
        // this cap the value overflows or underflows whatever the digits are.
        let cap = i64::try_from(digits.len())
            .unwrap_or(i64::MAX)
            .saturating_add(EXPONENT_MARGIN);
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            exponent = exponent
                .saturating_mul(10)
                .saturating_add(i64::from(bytes[i] - b'0'))
                .min(cap);
            i += 1;
        }
        if i == start {
            return Err(not_a_number(text));
        }
        if exp_negative {
            exponent = -exponent;
        }
    }
    if i < bytes.len() && matches!(bytes[i], b'f' | b'F' | b'd' | b'D') {
        i += 1;
    }
    if i != bytes.len() {
        return Err(not_a_number(text));
    }

    let lead = digits.iter().take_while(|&&d| d == b'0').count();
    if lead == digits.len() {
        return Ok(Numeral::Finite(Decimal {
            negative,
            digits: Vec::new(),
            dec_exponent: 0,
        }));
    }
    let trail = digits.iter().rev().take_while(|&&d| d == b'0').count();
    let point = point.unwrap_or(digits.len()) as i64;
    let dec_exponent = point - lead as i64 + exponent;

    let mut significant = digits[lead..digits.len() - trail].to_vec();
    if significant.len() > MAX_DIGITS {
        // The dropped tail ends in a non-zero digit, so a sticky 1 keeps the rounding direction.
        significant.truncate(MAX_DIGITS - 1);
        significant.push(b'1');
    }

    Ok(Numeral::Finite(Decimal {
        negative,
        digits: significant,
        dec_exponent,
    }))
}

/// The magnitude `0.digits x 10^dec_exponent`, correctly rounded.
fn decimal_to_f64(digits: &[u8], dec_exponent: i64) -> f64 {
    if digits.is_empty() {
        return 0.0;
    }
    if dec_exponent > MAX_DECIMAL_EXPONENT {
        return f64::INFINITY;
    }
    if dec_exponent < MIN_DECIMAL_EXPONENT {
        return 0.0;
    }
    let dec_exponent = dec_exponent as i32;

    let n_digits = digits.len();
    let k_digits = n_digits.min(MAX_SEED_DIGITS);
    let seed = digits[..k_digits]
        .iter()
        .fold(0u64, |acc, &d| acc * 10 + u64::from(d - b'0'));
    let mut value = seed as f64;
    let exp = dec_exponent - k_digits as i32;

    if n_digits <= MAX_EXACT_DIGITS {
        // The seed is exact; one multiplication or division by an exact power of ten rounds once.
        if exp == 0 {
            return value;
        }
        if exp > 0 {
            if exp <= MAX_SMALL_TEN {
                return value * SMALL_10_POW[exp as usize];
            }
            // Spare digits of precision let part of the exponent be applied exactly first.
            let slop = (MAX_EXACT_DIGITS - k_digits) as i32;
            if exp <= MAX_SMALL_TEN + slop {
                value *= SMALL_10_POW[slop as usize];
                return value * SMALL_10_POW[(exp - slop) as usize];
            }
        } else if exp >= -MAX_SMALL_TEN {
            return value / SMALL_10_POW[(-exp) as usize];
        }
    }

    value = match estimate(value, exp) {
        Estimate::Value(v) => v,
        Estimate::Final(v) => return v,
    };

    let exact_digits = BigInt::from_digits(seed, &digits[k_digits..]);
    correct(value, &exact_digits, dec_exponent - n_digits as i32)
}

enum Estimate {
    Value(f64),
    /// Certain overflow or underflow.
    Final(f64),
}

/// Scale the seed by `10^exp` in floating point. The result is within a few ULPs.
fn estimate(mut value: f64, exp: i32) -> Estimate {
    if exp > 0 {
        if exp & 15 != 0 {
            value *= SMALL_10_POW[(exp & 15) as usize];
        }
        let mut exp = exp >> 4;
        if exp != 0 {
            let mut j = 0;
            while exp > 1 {
                if exp & 1 != 0 {
                    value *= BIG_10_POW[j];
                }
                j += 1;
                exp >>= 1;
            }
            let scaled = value * BIG_10_POW[j];
            if scaled.is_infinite() {
                if (value / 2.0 * BIG_10_POW[j]).is_infinite() {
                    return Estimate::Final(f64::INFINITY);
                }
                value = f64::MAX;
            } else {
                value = scaled;
            }
        }
    } else if exp < 0 {
        let exp = -exp;
        if exp & 15 != 0 {
            value /= SMALL_10_POW[(exp & 15) as usize];
        }
        let mut exp = exp >> 4;
        if exp != 0 {
            let mut j = 0;
            while exp > 1 {
                if exp & 1 != 0 {
                    value *= TINY_10_POW[j];
                }
                j += 1;
                exp >>= 1;
            }
            let scaled = value * TINY_10_POW[j];
            if scaled == 0.0 {
                if value * 2.0 * TINY_10_POW[j] == 0.0 {
                    return Estimate::Final(0.0);
                }
                value = f64::from_bits(1);
            } else {
                value = scaled;
            }
        }
    }
    Estimate::Value(value)
}

/// Decompose a positive finite `value` into `(m, e, bits)` with `value == m * 2^e`, `m` odd and
/// `bits` its bit length.
fn to_big_int(value: f64) -> (BigInt, i32, i32) {
    let raw = value.to_bits();
    let biased = ((raw >> EXP_SHIFT) & 0x7ff) as i32;
    let fraction = raw & FRACT_MASK;
    let (mantissa, exp2) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | HIDDEN_BIT, biased - 1075)
    };
    let zeros = mantissa.trailing_zeros();
    let mantissa = mantissa >> zeros;
    let bits = 64 - mantissa.leading_zeros() as i32;
    (BigInt::from_u64(mantissa), exp2 + zeros as i32, bits)
}

/// Move one ULP towards zero (`down`) or towards infinity.
fn step(value: f64, down: bool) -> f64 {
    let raw = value.to_bits();
    if down {
        f64::from_bits(raw - 1)
    } else {
        f64::from_bits(raw + 1)
    }
}

/// Refine `value` until it is the double nearest to `exact_digits x 10^exp`.
///
/// Each pass compares the candidate and the exact value as big integers scaled by the same
/// powers of two and five, and steps one ULP towards the exact value while they differ by more
/// than half an ULP.
fn correct(mut value: f64, exact_digits: &BigInt, exp: i32) -> f64 {
    loop {
        let (candidate, big_exp, big_bits) = to_big_int(value);

        let (mut b2, b5, mut d2, d5) = if exp >= 0 {
            (0, 0, exp, exp)
        } else {
            (-exp, -exp, 0, 0)
        };
        if big_exp >= 0 {
            b2 += big_exp;
        } else {
            d2 -= big_exp;
        }
        let mut ulp2 = b2;

        // Half an ULP of the candidate, expressed in the common scale.
        let half_ulp_bias = if big_exp + big_bits <= -1022 {
            // subnormal
            big_exp + 1075
        } else {
            54 - big_bits
        };
        b2 += half_ulp_bias;
        d2 += half_ulp_bias;

        let common = b2.min(d2).min(ulp2);
        b2 -= common;
        d2 -= common;
        ulp2 -= common;

        let big_b = candidate.mul_pow52(b5 as u32, b2 as u32);
        let big_d = exact_digits.mul_pow52(d5 as u32, d2 as u32);

        let (diff, overvalue) = match big_b.cmp(&big_d) {
            Ordering::Greater => {
                let mut diff = big_b.sub(&big_d);
                if big_bits == 1 && big_exp > -1022 {
                    // An exact power of two: the next value down is only half an ULP away.
                    ulp2 -= 1;
                    if ulp2 < 0 {
                        ulp2 = 0;
                        diff.shl_assign(1);
                    }
                }
                (diff, true)
            }
            Ordering::Less => (big_d.sub(&big_b), false),
            Ordering::Equal => break,
        };

        let half_ulp = BigInt::pow52(b5 as u32, ulp2 as u32);
        match diff.cmp(&half_ulp) {
            Ordering::Less => break,
            Ordering::Equal => {
                // Halfway: keep the candidate only if its mantissa is even.
                if value.to_bits() & 1 == 1 {
                    value = step(value, overvalue);
                }
                break;
            }
            Ordering::Greater => {
                value = step(value, overvalue);
                if value == 0.0 || value.is_infinite() {
                    break;
                }
            }
        }
    }
    value
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_same(text: &str) {
        let expected: f64 = text.parse().unwrap();
        let actual = parse_f64(text).unwrap();
        assert_eq!(
            actual.to_bits(),
            expected.to_bits(),
            "{text}: got {actual:e}, expected {expected:e}"
        );
    }

    /// xorshift64*, enough to spread test inputs over the whole bit space.
    struct Xorshift(u64);

    impl Xorshift {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 >> 12;
            self.0 ^= self.0 << 25;
            self.0 ^= self.0 >> 27;
            self.0.wrapping_mul(0x2545_f491_4f6c_dd1d)
        }
    }

    #[test]
    fn simple_values() {
        assert_eq!(parse_f64("3.14159").unwrap(), 3.14159);
        assert_eq!(parse_f64("0").unwrap(), 0.0);
        assert_eq!(parse_f64("-0.0").unwrap().to_bits(), (-0.0f64).to_bits());
        assert_eq!(parse_f64("12.5").unwrap(), 12.5);
        assert_eq!(parse_f64(".5").unwrap(), 0.5);
        assert_eq!(parse_f64("5.").unwrap(), 5.0);
        assert_eq!(parse_f64("+7").unwrap(), 7.0);
        assert_eq!(parse_f64("1200").unwrap(), 1200.0);
        assert_eq!(parse_f64("0.00123").unwrap(), 0.00123);
    }

    #[test]
    fn padding_and_suffix() {
        assert_eq!(parse_f64("  42.0\t\r\n").unwrap(), 42.0);
        assert_eq!(parse_f64("\0\01.5\0").unwrap(), 1.5);
        assert_eq!(parse_f64("2.5d").unwrap(), 2.5);
        assert_eq!(parse_f64("2.5F").unwrap(), 2.5);
    }

    #[test]
    fn literals() {
        assert!(parse_f64("NaN").unwrap().is_nan());
        assert_eq!(parse_f64("Infinity").unwrap(), f64::INFINITY);
        assert_eq!(parse_f64("-Infinity").unwrap(), f64::NEG_INFINITY);
        assert!(parse_f64("inf").is_err());
    }

    #[test]
    fn rejects_malformed_text() {
        for text in ["", "   ", "-", ".", "1.2.3", "1e", "1e+", "abc", "12a", "1,5", "--1", "1ff"] {
            assert!(
                matches!(parse_f64(text), Err(ShapefileError::NumberFormat(_))),
                "{text:?} should not parse"
            );
        }
    }

    #[test]
    fn extremes_stay_finite() {
        assert_eq!(parse_f64("1e308").unwrap(), 1e308);
        assert_eq!(parse_f64("-1e308").unwrap(), -1e308);
        assert!(parse_f64("1e308").unwrap().is_finite());
        assert_eq!(parse_f64("1e400").unwrap(), f64::INFINITY);
        assert_eq!(parse_f64("-1e400").unwrap(), f64::NEG_INFINITY);
        assert_eq!(parse_f64("1e-400").unwrap(), 0.0);
        assert_eq!(parse_f64("1e99999999999999999999").unwrap(), f64::INFINITY);
        assert_eq!(parse_f64("1e-99999999999999999999").unwrap(), 0.0);
    }

    #[test]
    fn long_zero_runs_offset_large_exponents() {
        let zeros = "0".repeat(1_100_000);
        assert_eq!(parse_f64(&format!("0.{zeros}1e1100005")).unwrap(), 10000.0);
        assert_eq!(parse_f64(&format!("1{zeros}e-1100000")).unwrap(), 1.0);
        assert_eq!(parse_f64(&format!("0.{zeros}1e9{zeros}")).unwrap(), f64::INFINITY);
    }

    #[test]
    fn boundary_cases() {
        for text in [
            "1.7976931348623157e308",
            "1.7976931348623158e308",
            "1.7976931348623159e308",
            "2.2250738585072012e-308",
            "2.2250738585072011e-308",
            "2.2250738585072014e-308",
            "4.9e-324",
            "5e-324",
            "2.4703282292062327e-324",
            "2.4703282292062328e-324",
            "7.4109846876186982e-324",
            "9007199254740993",
            "9007199254740995",
            "9007199254740992.5",
            "1e23",
            "8.98846567431158e307",
            "123456789012345678901234567890",
            "0.1",
            "0.30000000000000004",
            "1.00000000000000011102230246251565404236316680908203125",
            "1.00000000000000011102230246251565404236316680908203124",
            "1.00000000000000011102230246251565404236316680908203126",
            "4503599627370496.5",
            "4503599627370497.5",
            "3.0540623483e-313",
            "1e-320",
            "9.999999999999999e22",
            "1e22",
            "1.5e-322",
        ] {
            assert_same(text);
        }
    }

    #[test]
    fn many_digits() {
        let mut text = String::from("0.");
        text.push_str(&"3".repeat(2000));
        assert_same(&text);

        let mut text = String::from("1");
        text.push_str(&"0".repeat(300));
        text.push_str("e-300");
        assert_same(&text);

        let mut text = "9".repeat(1200);
        text.push_str("e-1000");
        assert_same(&text);
    }

    #[test]
    fn shortest_representations_round_trip() {
        let mut rng = Xorshift(0x9e37_79b9_7f4a_7c15);
        for _ in 0..20_000 {
            let value = f64::from_bits(rng.next());
            if !value.is_finite() {
                continue;
            }
            for text in [format!("{value:e}"), format!("{value}")] {
                assert_eq!(parse_f64(&text).unwrap().to_bits(), value.to_bits(), "{text}");
            }
        }
    }

    #[test]
    fn random_long_decimals_match_std() {
        let mut rng = Xorshift(0x0123_4567_89ab_cdef);
        for _ in 0..5_000 {
            let n_digits = 16 + (rng.next() % 30) as usize;
            let digits: String = (0..n_digits)
                .map(|_| char::from(b'0' + (rng.next() % 10) as u8))
                .collect();
            let exponent = (rng.next() % 700) as i64 - 350;
            assert_same(&format!("{digits}e{exponent}"));
        }
    }

    #[test]
    fn integers() {
        assert_eq!(parse_i32("42").unwrap(), 42);
        assert_eq!(parse_i32(" -17 ").unwrap(), -17);
        assert_eq!(parse_i32("2147483647").unwrap(), i32::MAX);
        assert_eq!(parse_i32("-2147483648").unwrap(), i32::MIN);
        assert!(parse_i32("2147483648").is_err());
        assert!(parse_i32("-2147483649").is_err());
        assert_eq!(parse_i64("9223372036854775807").unwrap(), i64::MAX);
        assert_eq!(parse_i64("-9223372036854775808").unwrap(), i64::MIN);
        assert!(parse_i64("9223372036854775808").is_err());
        assert_eq!(parse_i64("2147483648").unwrap(), 2_147_483_648);
    }

    #[test]
    fn integers_reject_malformed_text() {
        for text in ["", "-", "1.5", "1e3", "+5", "12 3", "x"] {
            assert!(
                matches!(parse_i32(text), Err(ShapefileError::NumberFormat(_))),
                "{text:?} should not parse"
            );
        }
    }
}
