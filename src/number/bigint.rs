//! Arbitrary-precision unsigned integers used by the decimal converter.
//!
//! Values are little-endian vectors of 32-bit limbs. Operations return new values, except the
//! few used in the inner loops of conversion (`shl_assign`, `normalize`, `mul_add_assign`,
//! `quo_rem_iteration`), which update in place.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

/// Powers of five that fit in a `u32`.
const SMALL_5_POW: [u32; 14] = [
    1,
    5,
    25,
    125,
    625,
    3_125,
    15_625,
    78_125,
    390_625,
    1_953_125,
    9_765_625,
    48_828_125,
    244_140_625,
    1_220_703_125,
];

/// Powers of five that fit in a `u64`.
const LONG_5_POW: [u64; 28] = [
    1,
    5,
    25,
    125,
    625,
    3_125,
    15_625,
    78_125,
    390_625,
    1_953_125,
    9_765_625,
    48_828_125,
    244_140_625,
    1_220_703_125,
    6_103_515_625,
    30_517_578_125,
    152_587_890_625,
    762_939_453_125,
    3_814_697_265_625,
    19_073_486_328_125,
    95_367_431_640_625,
    476_837_158_203_125,
    2_384_185_791_015_625,
    11_920_928_955_078_125,
    59_604_644_775_390_625,
    298_023_223_876_953_125,
    1_490_116_119_384_765_625,
    7_450_580_596_923_828_125,
];

thread_local! {
    /// Powers of five too large for `LONG_5_POW`, filled on demand. Each thread keeps its own
    /// cache so no locking is needed.
    static BIG_5_POW: RefCell<Vec<Option<Rc<BigInt>>>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BigInt {
    /// Little-endian limbs. Never empty and never has a zero high limb, except for the value
    /// zero which is a single zero limb.
    limbs: Vec<u32>,
}

impl BigInt {
    pub(crate) fn from_u64(value: u64) -> Self {
        let mut out = Self {
            limbs: vec![value as u32, (value >> 32) as u32],
        };
        out.trim();
        out
    }

    /// Build the integer spelled by `seed` followed by the ASCII digits `digits`.
    pub(crate) fn from_digits(seed: u64, digits: &[u8]) -> Self {
        let mut out = Self::from_u64(seed);
        for chunk in digits.chunks(5) {
            let mut multiplier = 1u32;
            let mut addend = 0u32;
            for &digit in chunk {
                multiplier *= 10;
                addend = addend * 10 + u32::from(digit - b'0');
            }
            out.mul_add_assign(multiplier, addend);
        }
        out
    }

    /// `5^p5 * 2^p2`.
    pub(crate) fn pow52(p5: u32, p2: u32) -> Self {
        let mut out = match pow5(p5) {
            Some(cached) => (*cached).clone(),
            None => small_pow5(p5),
        };
        out.shl_assign(p2);
        out
    }

    /// `self * 5^p5 * 2^p2`.
    pub(crate) fn mul_pow52(&self, p5: u32, p2: u32) -> Self {
        let mut out = if p5 == 0 {
            self.clone()
        } else if (p5 as usize) < SMALL_5_POW.len() {
            self.mul_small(SMALL_5_POW[p5 as usize])
        } else {
            match pow5(p5) {
                Some(cached) => self.mul(&cached),
                None => self.mul(&small_pow5(p5)),
            }
        };
        out.shl_assign(p2);
        out
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.limbs.len() == 1 && self.limbs[0] == 0
    }

    fn trim(&mut self) {
        while self.limbs.len() > 1 && self.limbs[self.limbs.len() - 1] == 0 {
            self.limbs.pop();
        }
    }

    /// Shift left by `bits`, in place.
    pub(crate) fn shl_assign(&mut self, bits: u32) {
        if bits == 0 || self.is_zero() {
            return;
        }
        let words = (bits / 32) as usize;
        let bits = bits % 32;
        let mut out = vec![0u32; self.limbs.len() + words + 1];
        if bits == 0 {
            out[words..words + self.limbs.len()].copy_from_slice(&self.limbs);
        } else {
            for (i, &limb) in self.limbs.iter().enumerate() {
                out[i + words] |= limb << bits;
                out[i + words + 1] |= limb >> (32 - bits);
            }
        }
        self.limbs = out;
        self.trim();
    }

    /// Shift left, in place, so that the high limb lies in `0x0800_0000..=0x0fff_ffff`, leaving
    /// four clear bits of headroom for `quo_rem_iteration`. Returns the shift applied.
    pub(crate) fn normalize(&mut self) -> u32 {
        debug_assert!(!self.is_zero());
        let leading = self.limbs[self.limbs.len() - 1].leading_zeros();
        let shift = if leading >= 4 {
            leading - 4
        } else {
            28 + leading
        };
        self.shl_assign(shift);
        shift
    }

    pub(crate) fn mul_small(&self, multiplier: u32) -> Self {
        let mut out = Vec::with_capacity(self.limbs.len() + 1);
        let mut carry = 0u64;
        for &limb in &self.limbs {
            let product = u64::from(limb) * u64::from(multiplier) + carry;
            out.push(product as u32);
            carry = product >> 32;
        }
        out.push(carry as u32);
        let mut out = Self { limbs: out };
        out.trim();
        out
    }

    /// `self = self * multiplier + addend`, in place.
    pub(crate) fn mul_add_assign(&mut self, multiplier: u32, addend: u32) {
        let mut carry = u64::from(addend);
        for limb in self.limbs.iter_mut() {
            let product = u64::from(*limb) * u64::from(multiplier) + carry;
            *limb = product as u32;
            carry = product >> 32;
        }
        if carry != 0 {
            self.limbs.push(carry as u32);
        }
        self.trim();
    }

    pub(crate) fn mul(&self, other: &BigInt) -> Self {
        let mut out = vec![0u32; self.limbs.len() + other.limbs.len()];
        for (i, &a) in self.limbs.iter().enumerate() {
            if a == 0 {
                continue;
            }
            let mut carry = 0u64;
            for (j, &b) in other.limbs.iter().enumerate() {
                let product = u64::from(a) * u64::from(b) + u64::from(out[i + j]) + carry;
                out[i + j] = product as u32;
                carry = product >> 32;
            }
            let mut k = i + other.limbs.len();
            while carry != 0 {
                let sum = u64::from(out[k]) + carry;
                out[k] = sum as u32;
                carry = sum >> 32;
                k += 1;
            }
        }
        let mut out = Self { limbs: out };
        out.trim();
        out
    }

    pub(crate) fn add(&self, other: &BigInt) -> Self {
        let (long, short) = if self.limbs.len() >= other.limbs.len() {
            (&self.limbs, &other.limbs)
        } else {
            (&other.limbs, &self.limbs)
        };
        let mut out = Vec::with_capacity(long.len() + 1);
        let mut carry = 0u64;
        for (i, &limb) in long.iter().enumerate() {
            let sum = u64::from(limb) + u64::from(short.get(i).copied().unwrap_or(0)) + carry;
            out.push(sum as u32);
            carry = sum >> 32;
        }
        out.push(carry as u32);
        let mut out = Self { limbs: out };
        out.trim();
        out
    }

    /// `self - other`. The caller guarantees `self >= other`.
    pub(crate) fn sub(&self, other: &BigInt) -> Self {
        debug_assert!(*self >= *other);
        let mut out = Vec::with_capacity(self.limbs.len());
        let mut borrow = 0i64;
        for (i, &limb) in self.limbs.iter().enumerate() {
            let mut diff =
                i64::from(limb) - i64::from(other.limbs.get(i).copied().unwrap_or(0)) - borrow;
            if diff < 0 {
                diff += 1 << 32;
                borrow = 1;
            } else {
                borrow = 0;
            }
            out.push(diff as u32);
        }
        let mut out = Self { limbs: out };
        out.trim();
        out
    }

    /// Produce one decimal digit of `self / divisor` and replace `self` with ten times the
    /// remainder.
    ///
    /// `divisor` must have been normalized and `self` must be less than ten times `divisor`.
    pub(crate) fn quo_rem_iteration(&mut self, divisor: &BigInt) -> u32 {
        let n = divisor.limbs.len();
        debug_assert!(self.limbs.len() <= n);
        self.limbs.resize(n, 0);

        // The top-limb quotient never underestimates the true quotient, and overestimates it by
        // a small amount at most; the add-back loop below corrects that.
        let mut q = i64::from(self.limbs[n - 1] / divisor.limbs[n - 1]);
        let mut diff = 0i64;
        for i in 0..n {
            diff += i64::from(self.limbs[i]) - q * i64::from(divisor.limbs[i]);
            self.limbs[i] = diff as u32;
            diff >>= 32;
        }
        if diff != 0 {
            // The remainder went negative: add the divisor back until it wraps past zero.
            let mut carry = 0u64;
            while carry == 0 {
                for i in 0..n {
                    let sum = u64::from(self.limbs[i]) + u64::from(divisor.limbs[i]) + carry;
                    self.limbs[i] = sum as u32;
                    carry = sum >> 32;
                }
                debug_assert!(carry == 0 || carry == 1);
                q -= 1;
            }
        }

        let mut carry = 0u64;
        for limb in self.limbs.iter_mut() {
            let product = u64::from(*limb) * 10 + carry;
            *limb = product as u32;
            carry = product >> 32;
        }
        debug_assert_eq!(carry, 0);
        self.trim();
        q as u32
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.limbs
            .len()
            .cmp(&other.limbs.len())
            .then_with(|| self.limbs.iter().rev().cmp(other.limbs.iter().rev()))
    }
}

/// `5^p` for exponents covered by the `u64` table.
fn small_pow5(p: u32) -> BigInt {
    debug_assert!((p as usize) < LONG_5_POW.len());
    BigInt::from_u64(LONG_5_POW[p as usize])
}

/// `5^p` from the per-thread cache, or `None` when `p` fits the `u64` table.
fn pow5(p: u32) -> Option<Rc<BigInt>> {
    let p = p as usize;
    if p < LONG_5_POW.len() {
        return None;
    }
    BIG_5_POW.with(|cache| {
        let mut cache = cache.borrow_mut();
        Some(pow5_cached(&mut cache, p))
    })
}

fn pow5_cached(cache: &mut Vec<Option<Rc<BigInt>>>, p: usize) -> Rc<BigInt> {
    if let Some(Some(hit)) = cache.get(p) {
        return Rc::clone(hit);
    }
    let value = if p < LONG_5_POW.len() {
        BigInt::from_u64(LONG_5_POW[p])
    } else {
        // 5^p = 5^q * 5^(p - q) with q = p / 2
        let q = p / 2;
        let low = pow5_cached(cache, q);
        let high = pow5_cached(cache, p - q);
        low.mul(&high)
    };
    let value = Rc::new(value);
    if cache.len() <= p {
        cache.resize(p + 1, None);
    }
    cache[p] = Some(Rc::clone(&value));
    value
}
