//! VR-directed endianness conversion.
//!
//! Values are byte strings of fixed-width numeric units; conversion
//! reverses the bytes of each unit in place. The unit width is taken
//! from the VR (16-bit for US/SS/OW, 32-bit for UL/SL/FL/OF/OL/AT,
//! 64-bit for FD/OD); string VRs and byte-granular VRs are untouched.
//!
//! Bulk buffers dispatch to the widest SIMD implementation available on
//! the running CPU. The capability probe runs once; every path produces
//! output identical to the scalar loop.
use once_cell::sync::Lazy;
use pacs_core::VR;

/// The instruction set selected for bulk byte swapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdLevel {
    #[cfg(target_arch = "x86_64")]
    Avx2,
    #[cfg(target_arch = "x86_64")]
    Ssse3,
    #[cfg(target_arch = "aarch64")]
    Neon,
    Scalar,
}

static LEVEL: Lazy<SimdLevel> = Lazy::new(detect_level);

#[cfg(target_arch = "x86_64")]
fn detect_level() -> SimdLevel {
    if is_x86_feature_detected!("avx2") {
        SimdLevel::Avx2
    } else if is_x86_feature_detected!("ssse3") {
        SimdLevel::Ssse3
    } else {
        SimdLevel::Scalar
    }
}

#[cfg(target_arch = "aarch64")]
fn detect_level() -> SimdLevel {
    if std::arch::is_aarch64_feature_detected!("neon") {
        SimdLevel::Neon
    } else {
        SimdLevel::Scalar
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_level() -> SimdLevel {
    SimdLevel::Scalar
}

/// The instruction set in use on this machine.
pub fn simd_level() -> SimdLevel {
    *LEVEL
}

/// Convert a value from the canonical little endian form to big endian.
/// Any trailing bytes smaller than the unit width are left untouched.
pub fn swap_to_big_endian(vr: VR, data: &mut [u8]) {
    swap_units(vr.swap_width(), data);
}

/// Convert a value from big endian wire form to the canonical little
/// endian form. Byte reversal is an involution, so this is the same
/// permutation as [`swap_to_big_endian`].
pub fn swap_from_big_endian(vr: VR, data: &mut [u8]) {
    swap_units(vr.swap_width(), data);
}

/// Reverse the bytes of each `width`-sized unit of `data` in place.
pub fn swap_units(width: usize, data: &mut [u8]) {
    if width <= 1 || data.len() < width {
        return;
    }
    match *LEVEL {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 => unsafe { x86::swap_avx2(width, data) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Ssse3 => unsafe { x86::swap_ssse3(width, data) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => unsafe { neon::swap_neon(width, data) },
        SimdLevel::Scalar => swap_scalar(width, data),
    }
}

/// The scalar fallback: reverse each unit with a plain loop.
/// Every SIMD path must produce output identical to this one.
pub fn swap_scalar(width: usize, data: &mut [u8]) {
    for chunk in data.chunks_exact_mut(width) {
        chunk.reverse();
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::swap_scalar;
    use std::arch::x86_64::*;

    // shuffle masks reversing 2/4/8-byte units within a 16-byte lane
    const MASK16: [u8; 16] = [1, 0, 3, 2, 5, 4, 7, 6, 9, 8, 11, 10, 13, 12, 15, 14];
    const MASK32: [u8; 16] = [3, 2, 1, 0, 7, 6, 5, 4, 11, 10, 9, 8, 15, 14, 13, 12];
    const MASK64: [u8; 16] = [7, 6, 5, 4, 3, 2, 1, 0, 15, 14, 13, 12, 11, 10, 9, 8];

    fn lane_mask(width: usize) -> &'static [u8; 16] {
        match width {
            2 => &MASK16,
            4 => &MASK32,
            _ => &MASK64,
        }
    }

    #[target_feature(enable = "avx2")]
    pub unsafe fn swap_avx2(width: usize, data: &mut [u8]) {
        let mask128 = lane_mask(width);
        let mask = _mm256_broadcastsi128_si256(_mm_loadu_si128(mask128.as_ptr() as *const __m128i));
        let mut chunks = data.chunks_exact_mut(32);
        for chunk in &mut chunks {
            let v = _mm256_loadu_si256(chunk.as_ptr() as *const __m256i);
            let swapped = _mm256_shuffle_epi8(v, mask);
            _mm256_storeu_si256(chunk.as_mut_ptr() as *mut __m256i, swapped);
        }
        swap_scalar(width, chunks.into_remainder());
    }

    #[target_feature(enable = "ssse3")]
    pub unsafe fn swap_ssse3(width: usize, data: &mut [u8]) {
        let mask = _mm_loadu_si128(lane_mask(width).as_ptr() as *const __m128i);
        let mut chunks = data.chunks_exact_mut(16);
        for chunk in &mut chunks {
            let v = _mm_loadu_si128(chunk.as_ptr() as *const __m128i);
            let swapped = _mm_shuffle_epi8(v, mask);
            _mm_storeu_si128(chunk.as_mut_ptr() as *mut __m128i, swapped);
        }
        swap_scalar(width, chunks.into_remainder());
    }
}

#[cfg(target_arch = "aarch64")]
mod neon {
    use super::swap_scalar;
    use std::arch::aarch64::*;

    #[target_feature(enable = "neon")]
    pub unsafe fn swap_neon(width: usize, data: &mut [u8]) {
        let mut chunks = data.chunks_exact_mut(16);
        for chunk in &mut chunks {
            let v = vld1q_u8(chunk.as_ptr());
            let swapped = match width {
                2 => vrev16q_u8(v),
                4 => vrev32q_u8(v),
                _ => vrev64q_u8(v),
            };
            vst1q_u8(chunk.as_mut_ptr(), swapped);
        }
        swap_scalar(width, chunks.into_remainder());
    }
}
