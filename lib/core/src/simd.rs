// Dot products for the similarity scan.
// Feature vectors are stored L2-normalized, so cosine similarity is a plain
// dot product and the scan never computes a norm.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

// Below these sizes the scalar loop wins over the SIMD setup cost
#[cfg(target_arch = "x86_64")]
const MIN_DIM_SIZE_AVX: usize = 32;

#[cfg(target_arch = "aarch64")]
const MIN_DIM_SIZE_NEON: usize = 16;

/// Dense dot product, dispatching to AVX2/FMA or NEON when available.
/// Returns 0.0 for slices of different length.
#[inline]
pub fn dot_product_simd(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if a.len() >= MIN_DIM_SIZE_AVX
            && is_x86_feature_detected!("avx2")
            && is_x86_feature_detected!("fma")
        {
            return unsafe { dot_product_avx2(a, b) };
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if a.len() >= MIN_DIM_SIZE_NEON && std::arch::is_aarch64_feature_detected!("neon") {
            return unsafe { dot_product_neon(a, b) };
        }
    }

    dot_product_scalar(a, b)
}

/// Two 8-lane accumulators, 16 floats per iteration
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
#[inline]
unsafe fn dot_product_avx2(a: &[f32], b: &[f32]) -> f32 {
    let dim = a.len();
    let mut i = 0;

    let mut acc0 = _mm256_setzero_ps();
    let mut acc1 = _mm256_setzero_ps();

    while i + 16 <= dim {
        let a0 = _mm256_loadu_ps(a.as_ptr().add(i));
        let b0 = _mm256_loadu_ps(b.as_ptr().add(i));
        let a1 = _mm256_loadu_ps(a.as_ptr().add(i + 8));
        let b1 = _mm256_loadu_ps(b.as_ptr().add(i + 8));
        acc0 = _mm256_fmadd_ps(a0, b0, acc0);
        acc1 = _mm256_fmadd_ps(a1, b1, acc1);
        i += 16;
    }

    let acc = _mm256_add_ps(acc0, acc1);
    let high = _mm256_extractf128_ps(acc, 1);
    let low = _mm256_castps256_ps128(acc);
    let mut sum = _mm_add_ps(high, low);
    sum = _mm_hadd_ps(sum, sum);
    sum = _mm_hadd_ps(sum, sum);

    let mut dot = _mm_cvtss_f32(sum);
    while i < dim {
        dot += a[i] * b[i];
        i += 1;
    }
    dot
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
#[inline]
unsafe fn dot_product_neon(a: &[f32], b: &[f32]) -> f32 {
    let dim = a.len();
    let mut i = 0;

    let mut acc0 = vdupq_n_f32(0.0);
    let mut acc1 = vdupq_n_f32(0.0);

    while i + 8 <= dim {
        acc0 = vfmaq_f32(acc0, vld1q_f32(a.as_ptr().add(i)), vld1q_f32(b.as_ptr().add(i)));
        acc1 = vfmaq_f32(acc1, vld1q_f32(a.as_ptr().add(i + 4)), vld1q_f32(b.as_ptr().add(i + 4)));
        i += 8;
    }

    let mut dot = vaddvq_f32(vaddq_f32(acc0, acc1));
    while i < dim {
        dot += a[i] * b[i];
        i += 1;
    }
    dot
}

#[inline]
fn dot_product_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut acc0 = 0.0f32;
    let mut acc1 = 0.0f32;

    let a_chunks = a.chunks_exact(4);
    let b_chunks = b.chunks_exact(4);
    let tail = a_chunks.remainder().len();

    for (x, y) in a_chunks.zip(b_chunks) {
        acc0 += x[0] * y[0] + x[1] * y[1];
        acc1 += x[2] * y[2] + x[3] * y[3];
    }

    for i in (a.len() - tail)..a.len() {
        acc0 += a[i] * b[i];
    }

    acc0 + acc1
}

/// Dot product accumulated in f64.
///
/// Each f32 product is exact in f64, so sums of the same products in a
/// different order agree once rounded back to f32. Returns 0.0 for slices of
/// different length.
#[inline]
pub fn dot_product_f64(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if a.len() >= MIN_DIM_SIZE_AVX
            && is_x86_feature_detected!("avx2")
            && is_x86_feature_detected!("fma")
        {
            return unsafe { dot_product_f64_avx2(a, b) };
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if a.len() >= MIN_DIM_SIZE_NEON && std::arch::is_aarch64_feature_detected!("neon") {
            return unsafe { dot_product_f64_neon(a, b) };
        }
    }

    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| x as f64 * y as f64)
        .sum()
}

/// Widens 4 floats per load into f64 lanes
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
#[inline]
unsafe fn dot_product_f64_avx2(a: &[f32], b: &[f32]) -> f64 {
    let dim = a.len();
    let mut i = 0;

    let mut acc0 = _mm256_setzero_pd();
    let mut acc1 = _mm256_setzero_pd();

    while i + 8 <= dim {
        let a0 = _mm256_cvtps_pd(_mm_loadu_ps(a.as_ptr().add(i)));
        let b0 = _mm256_cvtps_pd(_mm_loadu_ps(b.as_ptr().add(i)));
        let a1 = _mm256_cvtps_pd(_mm_loadu_ps(a.as_ptr().add(i + 4)));
        let b1 = _mm256_cvtps_pd(_mm_loadu_ps(b.as_ptr().add(i + 4)));
        acc0 = _mm256_fmadd_pd(a0, b0, acc0);
        acc1 = _mm256_fmadd_pd(a1, b1, acc1);
        i += 8;
    }

    let acc = _mm256_add_pd(acc0, acc1);
    let mut lanes = [0.0f64; 4];
    _mm256_storeu_pd(lanes.as_mut_ptr(), acc);
    let mut dot = (lanes[0] + lanes[1]) + (lanes[2] + lanes[3]);

    while i < dim {
        dot += a[i] as f64 * b[i] as f64;
        i += 1;
    }
    dot
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
#[inline]
unsafe fn dot_product_f64_neon(a: &[f32], b: &[f32]) -> f64 {
    let dim = a.len();
    let mut i = 0;

    let mut acc0 = vdupq_n_f64(0.0);
    let mut acc1 = vdupq_n_f64(0.0);

    while i + 4 <= dim {
        acc0 = vfmaq_f64(acc0, vcvt_f64_f32(vld1_f32(a.as_ptr().add(i))), vcvt_f64_f32(vld1_f32(b.as_ptr().add(i))));
        acc1 = vfmaq_f64(
            acc1,
            vcvt_f64_f32(vld1_f32(a.as_ptr().add(i + 2))),
            vcvt_f64_f32(vld1_f32(b.as_ptr().add(i + 2))),
        );
        i += 4;
    }

    let mut dot = vaddvq_f64(vaddq_f64(acc0, acc1));
    while i < dim {
        dot += a[i] as f64 * b[i] as f64;
        i += 1;
    }
    dot
}

#[inline]
pub fn norm_squared_simd(v: &[f32]) -> f32 {
    dot_product_simd(v, v)
}

#[inline]
pub fn norm_simd(v: &[f32]) -> f32 {
    norm_squared_simd(v).sqrt()
}
