use std::cmp::Ordering;

use crate::number::bigint::BigInt;

const EXP_SHIFT: u32 = 52;
const FRACT_MASK: u64 = (1 << EXP_SHIFT) - 1;
const HIDDEN_BIT: u64 = 1 << EXP_SHIFT;

/// Render a double as the shortest decimal text that parses back to the same value.
///
/// Values with a decimal exponent between 10^-3 and 10^7 are written in plain notation and
/// everything else in scientific notation, always with at least one digit after the point:
///
/// ```
/// use geoshape::number::format_f64;
///
/// assert_eq!(format_f64(3.14159), "3.14159");
/// assert_eq!(format_f64(100.0), "100.0");
/// assert_eq!(format_f64(0.00123), "0.00123");
/// assert_eq!(format_f64(1e10), "1.0E10");
/// assert_eq!(format_f64(f64::NAN), "NaN");
/// ```
pub fn format_f64(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    let mut out = String::with_capacity(24);
    if value.is_sign_negative() {
        out.push('-');
    }
    if value.is_infinite() {
        out.push_str("Infinity");
    } else if value == 0.0 {
        out.push_str("0.0");
    } else {
        let (digits, dec_exponent) = shortest_digits(value.abs());
        layout(&mut out, &digits, dec_exponent);
    }
    out
}

fn uses_scientific(dec_exponent: i32) -> bool {
    !(-3 < dec_exponent && dec_exponent < 8)
}

/// Digits `d1d2...dn` and exponent `e` with `value ~ 0.d1d2...dn x 10^e`, using the fewest
/// digits that still identify `value`.
fn shortest_digits(value: f64) -> (Vec<u8>, i32) {
    let raw = value.to_bits();
    let biased = ((raw >> EXP_SHIFT) & 0x7ff) as i32;
    let fraction = raw & FRACT_MASK;
    let (mantissa, ulp_exp) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | HIDDEN_BIT, biased - 1075)
    };
    let zeros = mantissa.trailing_zeros();
    let f = mantissa >> zeros;
    let e = ulp_exp + zeros as i32;

    // Half an ULP. Below an exact power of two the spacing halves, so be conservative on both
    // sides.
    let mut m_exp = ulp_exp - 1;
    if fraction == 0 && biased > 1 {
        m_exp -= 1;
    }

    // value = B/S x 10^k with B/S in [1, 10) once the estimate of k is fixed up.
    let mut k = value.log10().floor() as i32;
    let b5 = (-k).max(0);
    let s5 = k.max(0);
    let mut b2 = e + b5;
    let mut s2 = s5;
    let mut m2 = m_exp + b5;
    let shift = (-b2.min(s2).min(m2)).max(0);
    b2 += shift;
    s2 += shift;
    m2 += shift;
    let common = b2.min(s2).min(m2);
    b2 -= common;
    s2 -= common;
    m2 -= common;

    let mut b = BigInt::from_u64(f).mul_pow52(b5 as u32, b2 as u32);
    let mut s = BigInt::pow52(s5 as u32, s2 as u32);
    let mut m = BigInt::pow52(b5 as u32, m2 as u32);

    while b >= s.mul_small(10) {
        s = s.mul_small(10);
        k += 1;
    }
    while b.mul_small(10) < s {
        b = b.mul_small(10);
        m = m.mul_small(10);
        k -= 1;
    }

    let shift = s.normalize();
    b.shl_assign(shift);
    m.shl_assign(shift);
    let ten_s = s.mul_small(10);
    let scientific = uses_scientific(k + 1);

    let mut digits = Vec::with_capacity(20);
    let (low, high) = loop {
        let q = b.quo_rem_iteration(&s);
        debug_assert!(q < 10);
        digits.push(b'0' + q as u8);
        m = m.mul_small(10);

        let mut low = b < m;
        let mut high = b.add(&m) > ten_s;
        if digits.len() == 1 && scientific {
            // Scientific notation always shows a digit after the point, so make it a real one.
            low = false;
            high = false;
        }
        if low || high {
            break (low, high);
        }
    };

    if high {
        let round_up = if low {
            let mut twice = b.clone();
            twice.shl_assign(1);
            match twice.cmp(&ten_s) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => digits.last().is_some_and(|d| (d - b'0') % 2 == 1),
            }
        } else {
            true
        };
        if round_up && increment(&mut digits) {
            k += 1;
        }
    }
    (digits, k + 1)
}

/// Add one unit in the last digit, dropping trailing nines. Returns true when every digit was
/// a nine and the result is a single `1` one decade up.
fn increment(digits: &mut Vec<u8>) -> bool {
    while let Some(&last) = digits.last() {
        if last == b'9' {
            digits.pop();
        } else {
            if let Some(last) = digits.last_mut() {
                *last += 1;
            }
            return false;
        }
    }
    digits.push(b'1');
    true
}

fn layout(out: &mut String, digits: &[u8], dec_exponent: i32) {
    let push_digits = |out: &mut String, digits: &[u8]| {
        out.extend(digits.iter().map(|&d| char::from(d)));
    };

    if !uses_scientific(dec_exponent) {
        if dec_exponent > 0 {
            let int_len = dec_exponent as usize;
            if digits.len() <= int_len {
                push_digits(out, digits);
                out.extend(std::iter::repeat('0').take(int_len - digits.len()));
                out.push_str(".0");
            } else {
                push_digits(out, &digits[..int_len]);
                out.push('.');
                push_digits(out, &digits[int_len..]);
            }
        } else {
            out.push_str("0.");
            out.extend(std::iter::repeat('0').take((-dec_exponent) as usize));
            push_digits(out, digits);
        }
    } else {
        push_digits(out, &digits[..1]);
        out.push('.');
        if digits.len() > 1 {
            push_digits(out, &digits[1..]);
        } else {
            out.push('0');
        }
        out.push('E');
        out.push_str(&(dec_exponent - 1).to_string());
    }
}
