//! Vectorized scan for special units.
//!
//! The tokenizer spends almost all of its time walking plain field content
//! looking for the next unit that can change its state: the delimiter, the
//! quote, CR, or LF (plus the escape character when one is configured).
//! This module answers exactly that question, "where is the next special
//! unit?", so the state machine only executes its scalar logic at the
//! positions that matter.
//!
//! # Architecture
//!
//! For each chunk, four equality masks are built (delimiter, quote, LF, CR)
//! and ORed into a single "specials" mask, one bit per lane. The first set
//! bit is located with a trailing-zeros count. Chunk widths, in preference
//! order on `x86_64`: 32 bytes (AVX2, runtime-detected), 16 bytes (SSE2),
//! then a scalar tail. 16-bit code units use 16-lane AVX2 or 8-lane SSE2
//! vectors with the comparison results narrowed to a byte mask.
//!
//! The vector path is skipped when an escape character is configured:
//! escape semantics need strict sequential look-ahead, and the scalar loop
//! provides it. Non-`x86_64` targets always use the scalar loop. Either
//! way the result is identical; the vector path only skips the
//! non-interesting units faster.

use crate::unit::BufferUnit;

/// The set of units the tokenizer must inspect one at a time.
#[derive(Debug, Clone, Copy)]
pub struct Specials {
    /// Field delimiter.
    pub delimiter: u8,
    /// Quote character. Included in the mask even when quoting is
    /// disabled; the state machine then treats the hit as plain content.
    pub quote: u8,
    /// Optional escape character. Its presence forces the scalar loop.
    pub escape: Option<u8>,
}

/// Scalar search shared by every fallback and tail path.
#[inline]
fn next_special_scalar<U: BufferUnit>(buf: &[U], from: usize, sp: &Specials) -> usize {
    let mut i = from;
    while i < buf.len() {
        let u = buf[i];
        if u.eq_ascii(sp.delimiter)
            || u.eq_ascii(sp.quote)
            || u.eq_ascii(b'\n')
            || u.eq_ascii(b'\r')
            || sp.escape.is_some_and(|e| u.eq_ascii(e))
        {
            return i;
        }
        i += 1;
    }
    buf.len()
}

/// Position of the next special byte at or after `from`, or `buf.len()`.
#[inline]
pub(crate) fn next_special_u8(buf: &[u8], from: usize, sp: &Specials, use_simd: bool) -> usize {
    #[cfg(target_arch = "x86_64")]
    {
        if use_simd && sp.escape.is_none() {
            // SAFETY: SSE2 is architecturally guaranteed on x86_64, and the
            // AVX2 path is gated on runtime detection inside.
            return unsafe { next_special_u8_x86(buf, from, sp.delimiter, sp.quote) };
        }
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = use_simd;
    next_special_scalar(buf, from, sp)
}

/// Position of the next special code unit at or after `from`, or
/// `buf.len()`.
#[inline]
pub(crate) fn next_special_u16(buf: &[u16], from: usize, sp: &Specials, use_simd: bool) -> usize {
    #[cfg(target_arch = "x86_64")]
    {
        if use_simd && sp.escape.is_none() {
            // SAFETY: SSE2 is architecturally guaranteed on x86_64, and the
            // AVX2 path is gated on runtime detection inside.
            return unsafe { next_special_u16_x86(buf, from, sp.delimiter, sp.quote) };
        }
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = use_simd;
    next_special_scalar(buf, from, sp)
}

#[cfg(target_arch = "x86_64")]
fn avx2_available() -> bool {
    use std::sync::OnceLock;
    static AVX2: OnceLock<bool> = OnceLock::new();
    *AVX2.get_or_init(|| std::arch::is_x86_feature_detected!("avx2"))
}

#[cfg(target_arch = "x86_64")]
unsafe fn next_special_u8_x86(buf: &[u8], from: usize, delimiter: u8, quote: u8) -> usize {
    let len = buf.len();
    let mut i = from;

    if avx2_available() && len - i >= 32 {
        // SAFETY: callers reach here only after runtime AVX2 detection.
        if let Some(hit) = unsafe { next_special_u8_avx2(buf, i, delimiter, quote) } {
            return hit;
        }
        i = len - (len - i) % 32;
    }

    unsafe {
        use core::arch::x86_64::*;

        let delim_vec = _mm_set1_epi8(delimiter as i8);
        let quote_vec = _mm_set1_epi8(quote as i8);
        let lf_vec = _mm_set1_epi8(b'\n' as i8);
        let cr_vec = _mm_set1_epi8(b'\r' as i8);

        while i + 16 <= len {
            // SAFETY: i + 16 <= len, so the unaligned 16-byte load is in
            // bounds.
            let data = _mm_loadu_si128(buf.as_ptr().add(i) as *const __m128i);

            let specials = _mm_or_si128(
                _mm_or_si128(
                    _mm_cmpeq_epi8(data, delim_vec),
                    _mm_cmpeq_epi8(data, quote_vec),
                ),
                _mm_or_si128(_mm_cmpeq_epi8(data, lf_vec), _mm_cmpeq_epi8(data, cr_vec)),
            );

            let mask = _mm_movemask_epi8(specials) as u32;
            if mask != 0 {
                return i + mask.trailing_zeros() as usize;
            }
            i += 16;
        }
    }

    next_special_scalar(
        buf,
        i,
        &Specials {
            delimiter,
            quote,
            escape: None,
        },
    )
}

/// 32-byte AVX2 sweep. Returns `Some(position)` on a hit, `None` when the
/// remaining whole chunks are clean (the SSE2/scalar tail takes over).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn next_special_u8_avx2(
    buf: &[u8],
    from: usize,
    delimiter: u8,
    quote: u8,
) -> Option<usize> {
    use core::arch::x86_64::*;

    let len = buf.len();
    let mut i = from;

    let delim_vec = _mm256_set1_epi8(delimiter as i8);
    let quote_vec = _mm256_set1_epi8(quote as i8);
    let lf_vec = _mm256_set1_epi8(b'\n' as i8);
    let cr_vec = _mm256_set1_epi8(b'\r' as i8);

    while i + 32 <= len {
        // SAFETY: i + 32 <= len, so the unaligned 32-byte load is in bounds.
        let data = unsafe { _mm256_loadu_si256(buf.as_ptr().add(i) as *const __m256i) };

        let specials = _mm256_or_si256(
            _mm256_or_si256(
                _mm256_cmpeq_epi8(data, delim_vec),
                _mm256_cmpeq_epi8(data, quote_vec),
            ),
            _mm256_or_si256(
                _mm256_cmpeq_epi8(data, lf_vec),
                _mm256_cmpeq_epi8(data, cr_vec),
            ),
        );

        let mask = _mm256_movemask_epi8(specials) as u32;
        if mask != 0 {
            return Some(i + mask.trailing_zeros() as usize);
        }
        i += 32;
    }

    None
}

#[cfg(target_arch = "x86_64")]
unsafe fn next_special_u16_x86(buf: &[u16], from: usize, delimiter: u8, quote: u8) -> usize {
    let len = buf.len();
    let mut i = from;

    if avx2_available() && len - i >= 32 {
        // SAFETY: callers reach here only after runtime AVX2 detection.
        if let Some(hit) = unsafe { next_special_u16_avx2(buf, i, delimiter, quote) } {
            return hit;
        }
        i = len - (len - i) % 32;
    }

    unsafe {
        use core::arch::x86_64::*;

        let delim_vec = _mm_set1_epi16(delimiter as i16);
        let quote_vec = _mm_set1_epi16(quote as i16);
        let lf_vec = _mm_set1_epi16(b'\n' as i16);
        let cr_vec = _mm_set1_epi16(b'\r' as i16);

        // Two 8-lane vectors per iteration, narrowed to one 16-bit mask.
        while i + 16 <= len {
            // SAFETY: i + 16 <= len, so both unaligned 8-unit loads are in
            // bounds.
            let lo = _mm_loadu_si128(buf.as_ptr().add(i) as *const __m128i);
            let hi = _mm_loadu_si128(buf.as_ptr().add(i + 8) as *const __m128i);

            let lo_specials = _mm_or_si128(
                _mm_or_si128(
                    _mm_cmpeq_epi16(lo, delim_vec),
                    _mm_cmpeq_epi16(lo, quote_vec),
                ),
                _mm_or_si128(_mm_cmpeq_epi16(lo, lf_vec), _mm_cmpeq_epi16(lo, cr_vec)),
            );
            let hi_specials = _mm_or_si128(
                _mm_or_si128(
                    _mm_cmpeq_epi16(hi, delim_vec),
                    _mm_cmpeq_epi16(hi, quote_vec),
                ),
                _mm_or_si128(_mm_cmpeq_epi16(hi, lf_vec), _mm_cmpeq_epi16(hi, cr_vec)),
            );

            // The pack must saturate as *signed*: match lanes are 0xFFFF,
            // which is -1 as i16 and narrows to -1 as i8 (0xFF), keeping
            // the high bit that movemask extracts. An unsigned pack would
            // clamp -1 to 0 and erase every match.
            let packed = _mm_packs_epi16(lo_specials, hi_specials);
            let mask = _mm_movemask_epi8(packed) as u32;
            if mask != 0 {
                return i + mask.trailing_zeros() as usize;
            }
            i += 16;
        }
    }

    next_special_scalar(
        buf,
        i,
        &Specials {
            delimiter,
            quote,
            escape: None,
        },
    )
}

/// 32-unit AVX2 sweep over 16-bit code units.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn next_special_u16_avx2(
    buf: &[u16],
    from: usize,
    delimiter: u8,
    quote: u8,
) -> Option<usize> {
    use core::arch::x86_64::*;

    let len = buf.len();
    let mut i = from;

    let delim_vec = _mm256_set1_epi16(delimiter as i16);
    let quote_vec = _mm256_set1_epi16(quote as i16);
    let lf_vec = _mm256_set1_epi16(b'\n' as i16);
    let cr_vec = _mm256_set1_epi16(b'\r' as i16);

    while i + 32 <= len {
        // SAFETY: i + 32 <= len, so both unaligned 16-unit loads are in
        // bounds.
        let lo = unsafe { _mm256_loadu_si256(buf.as_ptr().add(i) as *const __m256i) };
        let hi = unsafe { _mm256_loadu_si256(buf.as_ptr().add(i + 16) as *const __m256i) };

        let lo_specials = _mm256_or_si256(
            _mm256_or_si256(
                _mm256_cmpeq_epi16(lo, delim_vec),
                _mm256_cmpeq_epi16(lo, quote_vec),
            ),
            _mm256_or_si256(
                _mm256_cmpeq_epi16(lo, lf_vec),
                _mm256_cmpeq_epi16(lo, cr_vec),
            ),
        );
        let hi_specials = _mm256_or_si256(
            _mm256_or_si256(
                _mm256_cmpeq_epi16(hi, delim_vec),
                _mm256_cmpeq_epi16(hi, quote_vec),
            ),
            _mm256_or_si256(
                _mm256_cmpeq_epi16(hi, lf_vec),
                _mm256_cmpeq_epi16(hi, cr_vec),
            ),
        );

        // Signed saturating pack, same sign-bit argument as the SSE2 path:
        // 0xFFFF must narrow to 0xFF, not clamp to 0. The AVX2 pack also
        // interleaves its two inputs per 128-bit lane (a₀ b₀ a₁ b₁ as
        // 64-bit blocks), so a cross-lane permute restores the natural
        // a₀ a₁ b₀ b₁ order before the movemask.
        let packed = _mm256_packs_epi16(lo_specials, hi_specials);
        let fixed = _mm256_permute4x64_epi64(packed, 0b1101_1000);
        let mask = _mm256_movemask_epi8(fixed) as u32;
        if mask != 0 {
            return Some(i + mask.trailing_zeros() as usize);
        }
        i += 32;
    }

    None
}
