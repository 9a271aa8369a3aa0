//! Re-weighted SNR ("newsnr") and the single-detector reducer built on it.

use cr_core::{Result, TriggerBatch, fields};

/// Default newsnr exponent `q`.
pub const NEWSNR_Q: f64 = 6.0;
/// Default newsnr exponent `n`.
pub const NEWSNR_N: f64 = 2.0;

/// Re-weighted SNR with explicit exponents.
///
/// `snr` is returned unchanged when `reduced_x2 <= 1`; above that it is scaled
/// by `(0.5 * (1 + reduced_x2^(q/n)))^(-1/q)`. A NaN reduced chi-square never
/// exceeds 1 and therefore leaves `snr` untouched.
#[inline]
pub fn newsnr_with(snr: f64, reduced_x2: f64, q: f64, n: f64) -> f64 {
    if reduced_x2 > 1.0 {
        snr * (0.5 * (1.0 + reduced_x2.powf(q / n))).powf(-1.0 / q)
    } else {
        snr
    }
}

/// Re-weighted SNR with the standard exponents `q = 6`, `n = 2`.
#[inline]
pub fn newsnr(snr: f64, reduced_x2: f64) -> f64 {
    newsnr_with(snr, reduced_x2, NEWSNR_Q, NEWSNR_N)
}

/// Effective power chi-square degrees of freedom for `chisq_dof` bins.
#[inline]
pub fn reduced_dof(chisq_dof: f64) -> f64 {
    2.0 * chisq_dof - 2.0
}

/// Per-trigger newsnr of a batch, as `f32`.
///
/// Requires the `snr`, `chisq` and `chisq_dof` columns. The reduced chi-square
/// is `chisq / (2 * chisq_dof - 2)`. The output always has one entry per
/// trigger, even for a single-trigger batch.
pub fn get_newsnr(trigs: &TriggerBatch) -> Result<Vec<f32>> {
    let snr = trigs.require(fields::SNR)?;
    let chisq = trigs.require(fields::CHISQ)?;
    let dof = trigs.require(fields::CHISQ_DOF)?;
    Ok(snr
        .iter()
        .zip(chisq)
        .zip(dof)
        .map(|((&s, &c), &d)| newsnr(s, c / reduced_dof(d)) as f32)
        .collect())
}

/// Per-trigger newsnr using the auto chi-square columns, as `f64`.
///
/// Requires `snr`, `cont_chisq` and `cont_chisq_dof`; the auto chi-square dof
/// is used as given.
pub(crate) fn autochisq_newsnr(trigs: &TriggerBatch) -> Result<Vec<f64>> {
    let snr = trigs.require(fields::SNR)?;
    let chisq = trigs.require(fields::CONT_CHISQ)?;
    let dof = trigs.require(fields::CONT_CHISQ_DOF)?;
    Ok(snr.iter().zip(chisq).zip(dof).map(|((&s, &c), &d)| newsnr(s, c / d)).collect())
}
