//! AES-CBC with the IV carried in the first block of the ciphertext.
//!
//! The body is decrypted in fixed windows. Intermediate windows are
//! processed without unpadding and chain their IV from the last ciphertext
//! block; the final window is PKCS#7-unpadded. The key length selects
//! AES-128 or AES-256.

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::{Aes128, Aes256};
use tracing::trace;

use crate::error::DecryptError;

/// AES block size, which is also the IV size.
pub const IV_SIZE: usize = 16;

/// Size of one decryption window. A multiple of the block size.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Decrypt `IV || ciphertext` with `key`.
///
/// Returns the unpadded plaintext or an error; never a partial result.
pub fn decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, DecryptError> {
    if data.len() < IV_SIZE {
        return Err(DecryptError::MissingIv(data.len()));
    }
    let (iv, body) = data.split_at(IV_SIZE);
    if body.is_empty() {
        return Err(DecryptError::BadPadding);
    }
    if body.len() % IV_SIZE != 0 {
        return Err(DecryptError::MisalignedInput(body.len()));
    }

    match key.len() {
        16 => decrypt_windows::<Aes128>(key, iv, body),
        32 => decrypt_windows::<Aes256>(key, iv, body),
        n => Err(DecryptError::InvalidKeyLength(n)),
    }
}

fn decrypt_windows<C>(key: &[u8], iv: &[u8], body: &[u8]) -> Result<Vec<u8>, DecryptError>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    let mut iv_block = [0u8; IV_SIZE];
    iv_block.copy_from_slice(iv);

    let mut out = Vec::with_capacity(body.len());
    let mut windows = body.chunks(CHUNK_SIZE).peekable();

    while let Some(window) = windows.next() {
        let is_last = windows.peek().is_none();
        let start = out.len();
        out.extend_from_slice(window);

        let decryptor = cbc::Decryptor::<C>::new_from_slices(key, &iv_block)
            .map_err(|_| DecryptError::InvalidKeyLength(key.len()))?;

        if is_last {
            let written = decryptor
                .decrypt_padded_mut::<Pkcs7>(&mut out[start..])
                .map_err(|_| DecryptError::BadPadding)?
                .len();
            out.truncate(start + written);
            trace!(encrypted = window.len(), decrypted = written, "last window decrypted");
        } else {
            decryptor
                .decrypt_padded_mut::<NoPadding>(&mut out[start..])
                .map_err(|_| DecryptError::MisalignedInput(window.len()))?;
            iv_block.copy_from_slice(&window[window.len() - IV_SIZE..]);
        }
    }

    Ok(out)
}

/// Encrypt `plaintext` under `key` and `iv`, returning `IV || ciphertext`.
///
/// Only used to produce licenses and resources for tests and tooling.
pub fn encrypt(key: &[u8], iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<Vec<u8>, DecryptError> {
    match key.len() {
        16 => encrypt_padded::<Aes128>(key, iv, plaintext),
        32 => encrypt_padded::<Aes256>(key, iv, plaintext),
        n => Err(DecryptError::InvalidKeyLength(n)),
    }
}

fn encrypt_padded<C>(key: &[u8], iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<Vec<u8>, DecryptError>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| DecryptError::InvalidKeyLength(key.len()))?;

    let padded_len = plaintext.len() + (IV_SIZE - plaintext.len() % IV_SIZE);
    let mut buf = vec![0u8; IV_SIZE + padded_len];
    buf[..IV_SIZE].copy_from_slice(iv);
    buf[IV_SIZE..IV_SIZE + plaintext.len()].copy_from_slice(plaintext);

    encryptor
        .encrypt_padded_mut::<Pkcs7>(&mut buf[IV_SIZE..], plaintext.len())
        .map_err(|_| DecryptError::BadPadding)?;
    Ok(buf)
}
