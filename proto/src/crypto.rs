use crate::Vec;
#[cfg(feature = "crypto")]
use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
#[cfg(feature = "crypto")]
use hmac::{Hmac, Mac};
#[cfg(feature = "crypto")]
use sha1::Sha1;
#[cfg(feature = "crypto")]
use sha2::Sha256;
use subtle::ConstantTimeEq;
#[cfg(feature = "crypto")]
use zeroize::Zeroize;

#[derive(Debug, PartialEq, Eq)]
pub enum CryptoError {
    /// Integrity check failed (ICV mismatch or tag rejection).
    /// Context indicates where the failure occurred (e.g., "hmac-sha1 verify").
    AuthFailed {
        context: &'static str,
    },
    /// A primitive rejected its input: bad alignment, wrong IV length,
    /// mismatched buffer sizes, or geometry the wire format cannot carry.
    Primitive {
        context: &'static str,
    },
}

/// Block encryption interface for the confidentiality half of the transform.
///
/// Implementations must support in-place encryption; the caller guarantees
/// `data` is a whole number of blocks.
pub trait Crypter {
    fn block_size(&self) -> usize;

    fn iv_size(&self) -> usize;

    /// Encrypt `data` in place with the given IV.
    fn encrypt(&self, data: &mut [u8], iv: &[u8]) -> Result<(), CryptoError>;

    /// Decrypt `data` into `out`; both slices must have equal, block-aligned
    /// length.
    fn decrypt(&self, data: &[u8], iv: &[u8], out: &mut [u8]) -> Result<(), CryptoError>;
}

/// Integrity interface for the authentication half of the transform.
///
/// `parts` are processed as one logical byte string, so callers can pass
/// header, IV, and ciphertext slices without concatenating them first.
pub trait Signer {
    fn icv_size(&self) -> usize;

    /// Compute the ICV over `parts` into `icv_out` (`icv_size` bytes).
    fn sign(&self, parts: &[&[u8]], icv_out: &mut [u8]) -> Result<(), CryptoError>;

    /// Verify `icv` against the computed value. The comparison must not
    /// short-circuit on the first differing byte.
    fn verify(&self, parts: &[&[u8]], icv: &[u8]) -> Result<(), CryptoError>;
}

/// Deterministic, non-cryptographic crypter for simulations and tests.
///
/// # WARNING: NOT FOR PRODUCTION USE
///
/// This is a keyed XOR mixer that provides NO confidentiality. It exists so
/// the datagram pipelines can be exercised with arbitrary block/IV geometry
/// and without pulling in real cipher implementations:
/// - Testing and development
/// - Host-side simulation of tunnel traffic
/// - Wire-layout validation without real encryption
///
/// **NEVER use DummyCrypter with real traffic.** Always use
/// `Aes128CbcCrypter` for production deployments.
pub struct DummyCrypter {
    key: [u8; 16],
    block: usize,
    iv: usize,
}

impl DummyCrypter {
    /// Create a dummy crypter with the given block and IV geometry.
    ///
    /// # Warning
    /// Provides NO confidentiality. Only use for testing/simulation.
    pub fn new(key: [u8; 16], block_size: usize, iv_size: usize) -> Self {
        Self {
            key,
            block: block_size,
            iv: iv_size,
        }
    }

    fn keystream_byte(&self, iv: &[u8], i: usize) -> u8 {
        let k = self.key[i % self.key.len()];
        let v = if iv.is_empty() { 0 } else { iv[i % iv.len()] };
        k ^ v ^ (i as u8).wrapping_mul(0x9D).rotate_left((i % 7) as u32)
    }
}

impl Crypter for DummyCrypter {
    fn block_size(&self) -> usize {
        self.block
    }

    fn iv_size(&self) -> usize {
        self.iv
    }

    fn encrypt(&self, data: &mut [u8], iv: &[u8]) -> Result<(), CryptoError> {
        if iv.len() != self.iv || data.len() % self.block != 0 {
            return Err(CryptoError::Primitive {
                context: "dummy encrypt",
            });
        }
        for (i, b) in data.iter_mut().enumerate() {
            *b ^= self.keystream_byte(iv, i);
        }
        Ok(())
    }

    fn decrypt(&self, data: &[u8], iv: &[u8], out: &mut [u8]) -> Result<(), CryptoError> {
        if iv.len() != self.iv || data.len() % self.block != 0 || out.len() != data.len() {
            return Err(CryptoError::Primitive {
                context: "dummy decrypt",
            });
        }
        for (i, b) in out.iter_mut().enumerate() {
            *b = data[i] ^ self.keystream_byte(iv, i);
        }
        Ok(())
    }
}

/// Deterministic, non-cryptographic signer for simulations and tests.
///
/// Same caveats as [`DummyCrypter`]: the rolling tag is trivially forgeable
/// and only suitable for exercising the pipelines. Verification still runs
/// in constant time so timing behaviour matches the real signers.
pub struct DummySigner {
    key: [u8; 16],
    icv: usize,
}

impl DummySigner {
    pub fn new(key: [u8; 16], icv_size: usize) -> Self {
        Self { key, icv: icv_size }
    }

    fn tag(&self, parts: &[&[u8]]) -> Vec<u8> {
        let mut state: u32 = 0x5A5A_A5A5;
        for b in self.key.iter().chain(parts.iter().flat_map(|p| p.iter())) {
            state = state.rotate_left(5) ^ (*b as u32);
            state = state.wrapping_mul(0x45d9f3b);
        }
        let mut out = Vec::with_capacity(self.icv);
        let mut bytes = state.to_le_bytes();
        while out.len() < self.icv {
            out.extend_from_slice(&bytes);
            state = state.rotate_left(7) ^ 0xA5A5_A5A5;
            bytes = state.to_le_bytes();
        }
        out.truncate(self.icv);
        out
    }
}

impl Signer for DummySigner {
    fn icv_size(&self) -> usize {
        self.icv
    }

    fn sign(&self, parts: &[&[u8]], icv_out: &mut [u8]) -> Result<(), CryptoError> {
        if icv_out.len() != self.icv {
            return Err(CryptoError::Primitive {
                context: "dummy sign",
            });
        }
        icv_out.copy_from_slice(&self.tag(parts));
        Ok(())
    }

    fn verify(&self, parts: &[&[u8]], icv: &[u8]) -> Result<(), CryptoError> {
        let expected = self.tag(parts);
        // Constant-time comparison; slices of unequal length compare unequal
        // without leaking a prefix.
        if expected.as_slice().ct_eq(icv).into() {
            Ok(())
        } else {
            Err(CryptoError::AuthFailed {
                context: "dummy verify",
            })
        }
    }
}

#[cfg(feature = "crypto")]
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
#[cfg(feature = "crypto")]
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES-128 in CBC mode. Block 16, IV 16, no cipher-level padding: the
/// self-describing trailer already aligns the plaintext.
#[cfg(feature = "crypto")]
pub struct Aes128CbcCrypter {
    key: [u8; 16],
}

#[cfg(feature = "crypto")]
impl Aes128CbcCrypter {
    pub fn new(key: [u8; 16]) -> Self {
        Self { key }
    }
}

#[cfg(feature = "crypto")]
impl Drop for Aes128CbcCrypter {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(feature = "crypto")]
impl Crypter for Aes128CbcCrypter {
    fn block_size(&self) -> usize {
        16
    }

    fn iv_size(&self) -> usize {
        16
    }

    fn encrypt(&self, data: &mut [u8], iv: &[u8]) -> Result<(), CryptoError> {
        if data.len() % 16 != 0 {
            return Err(CryptoError::Primitive {
                context: "aes-cbc encrypt alignment",
            });
        }
        let len = data.len();
        Aes128CbcEnc::new_from_slices(&self.key, iv)
            .map_err(|_| CryptoError::Primitive {
                context: "aes-cbc iv length",
            })?
            .encrypt_padded_mut::<NoPadding>(data, len)
            .map_err(|_| CryptoError::Primitive {
                context: "aes-cbc encrypt",
            })?;
        Ok(())
    }

    fn decrypt(&self, data: &[u8], iv: &[u8], out: &mut [u8]) -> Result<(), CryptoError> {
        if data.len() % 16 != 0 || out.len() != data.len() {
            return Err(CryptoError::Primitive {
                context: "aes-cbc decrypt alignment",
            });
        }
        Aes128CbcDec::new_from_slices(&self.key, iv)
            .map_err(|_| CryptoError::Primitive {
                context: "aes-cbc iv length",
            })?
            .decrypt_padded_b2b_mut::<NoPadding>(data, out)
            .map_err(|_| CryptoError::Primitive {
                context: "aes-cbc decrypt",
            })?;
        Ok(())
    }
}

/// HMAC-SHA1 truncated to 96 bits, the classic ESP integrity transform.
#[cfg(feature = "crypto")]
pub struct HmacSha1Signer {
    key: Vec<u8>,
}

#[cfg(feature = "crypto")]
impl HmacSha1Signer {
    pub fn new(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }

    fn mac(&self, parts: &[&[u8]]) -> Result<Hmac<Sha1>, CryptoError> {
        let mut mac =
            Hmac::<Sha1>::new_from_slice(&self.key).map_err(|_| CryptoError::Primitive {
                context: "hmac-sha1 key",
            })?;
        for part in parts {
            mac.update(part);
        }
        Ok(mac)
    }
}

#[cfg(feature = "crypto")]
impl Drop for HmacSha1Signer {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(feature = "crypto")]
impl Signer for HmacSha1Signer {
    fn icv_size(&self) -> usize {
        12
    }

    fn sign(&self, parts: &[&[u8]], icv_out: &mut [u8]) -> Result<(), CryptoError> {
        if icv_out.len() != self.icv_size() {
            return Err(CryptoError::Primitive {
                context: "hmac-sha1 icv length",
            });
        }
        let tag = self.mac(parts)?.finalize().into_bytes();
        icv_out.copy_from_slice(&tag[..self.icv_size()]);
        Ok(())
    }

    fn verify(&self, parts: &[&[u8]], icv: &[u8]) -> Result<(), CryptoError> {
        if icv.len() != self.icv_size() {
            return Err(CryptoError::AuthFailed {
                context: "hmac-sha1 icv length",
            });
        }
        self.mac(parts)?
            .verify_truncated_left(icv)
            .map_err(|_| CryptoError::AuthFailed {
                context: "hmac-sha1 verify",
            })
    }
}

/// HMAC-SHA2-256 truncated to 128 bits.
#[cfg(feature = "crypto")]
pub struct HmacSha256Signer {
    key: Vec<u8>,
}

#[cfg(feature = "crypto")]
impl HmacSha256Signer {
    pub fn new(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }

    fn mac(&self, parts: &[&[u8]]) -> Result<Hmac<Sha256>, CryptoError> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.key).map_err(|_| CryptoError::Primitive {
                context: "hmac-sha256 key",
            })?;
        for part in parts {
            mac.update(part);
        }
        Ok(mac)
    }
}

#[cfg(feature = "crypto")]
impl Drop for HmacSha256Signer {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(feature = "crypto")]
impl Signer for HmacSha256Signer {
    fn icv_size(&self) -> usize {
        16
    }

    fn sign(&self, parts: &[&[u8]], icv_out: &mut [u8]) -> Result<(), CryptoError> {
        if icv_out.len() != self.icv_size() {
            return Err(CryptoError::Primitive {
                context: "hmac-sha256 icv length",
            });
        }
        let tag = self.mac(parts)?.finalize().into_bytes();
        icv_out.copy_from_slice(&tag[..self.icv_size()]);
        Ok(())
    }

    fn verify(&self, parts: &[&[u8]], icv: &[u8]) -> Result<(), CryptoError> {
        if icv.len() != self.icv_size() {
            return Err(CryptoError::AuthFailed {
                context: "hmac-sha256 icv length",
            });
        }
        self.mac(parts)?
            .verify_truncated_left(icv)
            .map_err(|_| CryptoError::AuthFailed {
                context: "hmac-sha256 verify",
            })
    }
}
