//! Shamir secret sharing over GF(256).
//!
//! The content key is split byte-wise: each byte of the secret becomes the
//! constant term of a random polynomial of degree `threshold - 1`, and share
//! `i` holds the polynomial evaluated at `x = i`. Any `threshold` shares
//! reconstruct the byte by Lagrange interpolation at zero; fewer reveal
//! nothing. Field arithmetic uses the AES reduction polynomial (0x11B).

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SealError};

/// Length of the secrets this module splits (a symmetric key).
pub const SECRET_LEN: usize = 32;

/// One share of a split secret: a nonzero evaluation point plus one field
/// element per secret byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Evaluation point, in `1..=total`. Never zero: x = 0 is the secret.
    pub index: u8,
    /// Polynomial evaluations, one per secret byte.
    pub data: Vec<u8>,
}

/// Multiply in GF(256) with the AES reduction polynomial.
fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        let carry = a & 0x80;
        a <<= 1;
        if carry != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    product
}

/// Multiplicative inverse via Fermat: a^254 = a^-1 for nonzero a.
fn gf_inv(a: u8) -> u8 {
    debug_assert_ne!(a, 0, "zero has no inverse");
    let mut result = 1u8;
    let mut base = a;
    let mut exp = 254u8;
    while exp != 0 {
        if exp & 1 != 0 {
            result = gf_mul(result, base);
        }
        base = gf_mul(base, base);
        exp >>= 1;
    }
    result
}

/// Evaluate a polynomial (coefficients lowest-degree first) at x by Horner.
fn eval_poly(coefficients: &[u8], x: u8) -> u8 {
    let mut acc = 0u8;
    for &coefficient in coefficients.iter().rev() {
        acc = gf_mul(acc, x) ^ coefficient;
    }
    acc
}

/// Split a secret into `total` shares, any `threshold` of which recover it.
pub fn split(secret: &[u8; SECRET_LEN], threshold: u8, total: u8) -> Result<Vec<Share>> {
    if threshold == 0 || threshold > total {
        return Err(SealError::InvalidThreshold { threshold, total });
    }

    let mut rng = rand::thread_rng();
    let mut shares: Vec<Share> = (1..=total)
        .map(|index| Share {
            index,
            data: Vec::with_capacity(SECRET_LEN),
        })
        .collect();

    let mut coefficients = vec![0u8; threshold as usize];
    for &secret_byte in secret {
        coefficients[0] = secret_byte;
        if threshold > 1 {
            rng.fill_bytes(&mut coefficients[1..]);
        }
        for share in &mut shares {
            share.data.push(eval_poly(&coefficients, share.index));
        }
    }
    Ok(shares)
}

/// Recover the secret from at least `threshold` distinct shares.
///
/// Extra shares beyond the first `threshold` are ignored. Shares with
/// duplicate indices or the wrong length are rejected; a share with valid
/// structure but corrupted data yields a wrong secret, which the envelope's
/// authentication tag catches downstream.
pub fn combine(shares: &[Share], threshold: u8) -> Result<[u8; SECRET_LEN]> {
    if (shares.len() as u64) < threshold as u64 {
        return Err(SealError::InsufficientShares {
            got: shares.len(),
            need: threshold,
        });
    }

    let shares = &shares[..threshold as usize];
    for (i, share) in shares.iter().enumerate() {
        if share.index == 0 {
            return Err(SealError::InvalidShare("share index zero".into()));
        }
        if share.data.len() != SECRET_LEN {
            return Err(SealError::InvalidShare(format!(
                "share {} has length {}, expected {SECRET_LEN}",
                share.index,
                share.data.len()
            )));
        }
        if shares[..i].iter().any(|s| s.index == share.index) {
            return Err(SealError::InvalidShare(format!(
                "duplicate share index {}",
                share.index
            )));
        }
    }

    // Lagrange basis at x = 0 depends only on the indices.
    let mut basis = Vec::with_capacity(shares.len());
    for share in shares {
        let mut coefficient = 1u8;
        for other in shares {
            if other.index != share.index {
                coefficient = gf_mul(
                    coefficient,
                    gf_mul(other.index, gf_inv(share.index ^ other.index)),
                );
            }
        }
        basis.push(coefficient);
    }

    let mut secret = [0u8; SECRET_LEN];
    for (byte_index, secret_byte) in secret.iter_mut().enumerate() {
        for (share, &coefficient) in shares.iter().zip(&basis) {
            *secret_byte ^= gf_mul(share.data[byte_index], coefficient);
        }
    }
    Ok(secret)
}
