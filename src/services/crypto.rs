//! # 凭据加密
//!
//! 远程存储中的 API 密钥以 OpenSSL / CryptoJS 兼容格式加密保存，
//! 以便与已有数据互通：
//!
//! ```text
//! base64( "Salted__" || salt[8] || AES-256-CBC(PKCS7, plaintext) )
//! ```
//!
//! 密钥与 IV 由 `EVP_BytesToKey(MD5, 1 次迭代)` 从应用密钥和随机盐派生。
//! 编码结果总是以 `U2FsdGVkX1`（`"Salted__"` 的 base64 前缀）开头，
//! 解密时据此区分密文与历史遗留的明文。

use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// `"Salted__"` 的 base64 编码前缀
pub const CIPHERTEXT_MARKER: &str = "U2FsdGVkX1";

const SALT_HEADER: &[u8; 8] = b"Salted__";
const SALT_LEN: usize = 8;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// 对称加解密器，持有应用密钥
#[derive(Clone)]
pub struct Cipher {
    secret: String,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

impl Cipher {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// 加密明文
    ///
    /// 空字符串返回空字符串；加密失败时记录日志并返回原文。
    pub fn encrypt(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }

        let salt: [u8; SALT_LEN] = rand::random();
        let (key, iv) = derive_key_iv(self.secret.as_bytes(), &salt);

        let encryptor = match Aes256CbcEnc::new_from_slices(&key, &iv) {
            Ok(encryptor) => encryptor,
            Err(e) => {
                log::error!("初始化加密器失败: {}", e);
                return plaintext.to_string();
            }
        };
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut payload = Vec::with_capacity(SALT_HEADER.len() + SALT_LEN + ciphertext.len());
        payload.extend_from_slice(SALT_HEADER);
        payload.extend_from_slice(&salt);
        payload.extend_from_slice(&ciphertext);
        STANDARD.encode(payload)
    }

    /// 解密密文
    ///
    /// - 空字符串 → 空字符串
    /// - 不以 `U2FsdGVkX1` 开头（历史明文）→ 原样返回
    /// - 解密失败或明文为空（例如密钥不匹配）→ 原样返回密文
    pub fn decrypt(&self, ciphertext: &str) -> String {
        if ciphertext.is_empty() {
            return String::new();
        }
        if !ciphertext.starts_with(CIPHERTEXT_MARKER) {
            return ciphertext.to_string();
        }

        match self.try_decrypt(ciphertext) {
            Some(plaintext) if !plaintext.is_empty() => plaintext,
            Some(_) => ciphertext.to_string(),
            None => {
                log::error!("凭据解密失败，保留原始密文");
                ciphertext.to_string()
            }
        }
    }

    fn try_decrypt(&self, ciphertext: &str) -> Option<String> {
        let payload = STANDARD.decode(ciphertext).ok()?;
        let body = payload.strip_prefix(SALT_HEADER.as_slice())?;
        if body.len() <= SALT_LEN {
            return None;
        }
        let (salt, encrypted) = body.split_at(SALT_LEN);

        let (key, iv) = derive_key_iv(self.secret.as_bytes(), salt);
        let decryptor = Aes256CbcDec::new_from_slices(&key, &iv).ok()?;
        let plaintext = decryptor.decrypt_padded_vec_mut::<Pkcs7>(encrypted).ok()?;
        String::from_utf8(plaintext).ok()
    }
}

/// OpenSSL `EVP_BytesToKey`（MD5，单次迭代）
///
/// `D_i = MD5(D_{i-1} || password || salt)`，拼接直到得到 32 字节密钥 + 16 字节 IV。
fn derive_key_iv(password: &[u8], salt: &[u8]) -> ([u8; KEY_LEN], [u8; IV_LEN]) {
    let mut derived = Vec::with_capacity(KEY_LEN + IV_LEN + 16);
    let mut previous: Vec<u8> = Vec::new();

    while derived.len() < KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&previous);
        hasher.update(password);
        hasher.update(salt);
        previous = hasher.finalize().to_vec();
        derived.extend_from_slice(&previous);
    }

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    key.copy_from_slice(&derived[..KEY_LEN]);
    iv.copy_from_slice(&derived[KEY_LEN..KEY_LEN + IV_LEN]);
    (key, iv)
}
