//! Standard security handler algorithms (spec §4.7): password padding/normalization, the R≤4
//! "Algorithm 2" file-key derivation, the R=6 iterated hash ("Algorithm 2.B"), and the `/O`,
//! `/U`, `/OE`, `/UE`, `/Perms` computations built from them.

use super::CryptMethod;
use crate::crypto::{
    self, aes_cbc_no_padding_decrypt_256, aes_cbc_no_padding_encrypt_128_explicit_key, aes_cbc_no_padding_encrypt_256,
    arc4::Arc4, SymmetricCipher,
};
use crate::document::Document;
use crate::error::{EncryptionError, Error, Result};
use crate::object::{Dictionary, Object};

/// The fixed 32-byte padding string (spec §4.7 "Password preparation", ISO 32000-1 Algorithm 2).
const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08, 0x2E, 0x2E, 0x00,
    0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// SASLprep-normalizes an R=6 password (spec §4.7 "Algorithm 2.A") and truncates to the first
/// 127 bytes of the prepared UTF-8 form. Inputs SASLprep rejects outright (e.g. unassigned
/// codepoints) are passed through as-is — Adobe's own Acrobat does the same rather than
/// rejecting the password.
fn prepare_password(password: &str) -> Vec<u8> {
    let prepared = stringprep::saslprep(password).map(|cow| cow.into_owned()).unwrap_or_else(|_| password.to_string());
    let bytes = prepared.into_bytes();
    bytes[..bytes.len().min(127)].to_vec()
}

struct EncryptParams {
    r: u8,
    o: Vec<u8>,
    u: Vec<u8>,
    oe: Vec<u8>,
    ue: Vec<u8>,
    perms: Vec<u8>,
    p: i32,
    key_len_bytes: usize,
    encrypt_metadata: bool,
    id0: Vec<u8>,
    stm_method: CryptMethod,
    str_method: CryptMethod,
}

fn cfm_from_name(name: &[u8]) -> CryptMethod {
    match name {
        b"AESV2" => CryptMethod::Aes128,
        b"AESV3" => CryptMethod::Aes256,
        b"V2" => CryptMethod::Rc4,
        _ => CryptMethod::Identity,
    }
}

fn read_params(encrypt: &Dictionary, id0: Vec<u8>) -> Result<EncryptParams> {
    let v = encrypt.get(b"V").and_then(|o| o.as_i64()).unwrap_or(0);
    let r = encrypt
        .get(b"R")
        .and_then(|o| o.as_i64())
        .map_err(|_| Error::Encryption(EncryptionError::UnsupportedVersion(v)))? as u8;
    let o = encrypt.get(b"O").and_then(|o| o.as_str()).map(|s| s.to_vec()).unwrap_or_default();
    let u = encrypt.get(b"U").and_then(|o| o.as_str()).map(|s| s.to_vec()).unwrap_or_default();
    let oe = encrypt.get(b"OE").and_then(|o| o.as_str()).map(|s| s.to_vec()).unwrap_or_default();
    let ue = encrypt.get(b"UE").and_then(|o| o.as_str()).map(|s| s.to_vec()).unwrap_or_default();
    let perms = encrypt.get(b"Perms").and_then(|o| o.as_str()).map(|s| s.to_vec()).unwrap_or_default();
    let p = encrypt.get(b"P").and_then(|o| o.as_i64()).unwrap_or(-1) as i32;
    let bits = encrypt.get(b"Length").and_then(|o| o.as_i64()).unwrap_or(40);
    let key_len_bytes = (bits / 8).max(5) as usize;
    let encrypt_metadata = encrypt.get(b"EncryptMetadata").and_then(|o| o.as_bool()).unwrap_or(true);

    let (mut stm_method, mut str_method) = match r {
        2 | 3 => (CryptMethod::Rc4, CryptMethod::Rc4),
        _ => (CryptMethod::Identity, CryptMethod::Identity),
    };

    if v >= 4 {
        if let Ok(cf) = encrypt.get(b"CF").and_then(|o| o.as_dict()) {
            if let Ok(std_cf) = cf.get(b"StdCF").and_then(|o| o.as_dict()) {
                if let Ok(cfm) = std_cf.get(b"CFM").and_then(|o| o.as_name()) {
                    let method = cfm_from_name(cfm);
                    stm_method = method;
                    str_method = method;
                }
            }
        }
        if let Ok(b"Identity") = encrypt.get(b"StmF").and_then(|o| o.as_name()) {
            stm_method = CryptMethod::Identity;
        }
        if let Ok(b"Identity") = encrypt.get(b"StrF").and_then(|o| o.as_name()) {
            str_method = CryptMethod::Identity;
        }
    }

    Ok(EncryptParams {
        r,
        o,
        u,
        oe,
        ue,
        perms,
        p,
        key_len_bytes,
        encrypt_metadata,
        id0,
        stm_method,
        str_method,
    })
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let n = password.len().min(32);
    out[..n].copy_from_slice(&password[..n]);
    out[n..].copy_from_slice(&PADDING[..32 - n]);
    out
}

/// Algorithm 2: computes the file encryption key from a padded password, `/O`, `/P` and `ID[0]`.
fn compute_file_key(padded_password: &[u8; 32], params: &EncryptParams) -> Vec<u8> {
    let mut input = Vec::with_capacity(32 + 32 + 4 + params.id0.len() + 4);
    input.extend_from_slice(padded_password);
    input.extend_from_slice(&params.o);
    input.extend_from_slice(&params.p.to_le_bytes());
    input.extend_from_slice(&params.id0);
    if params.r >= 4 && !params.encrypt_metadata {
        input.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut digest = crypto::md5(&input).to_vec();
    if params.r >= 3 {
        for _ in 0..50 {
            digest = crypto::md5(&digest[..params.key_len_bytes]).to_vec();
        }
    }
    digest.truncate(params.key_len_bytes);
    digest
}

/// Algorithm 4/5: computes the expected `/U` value for a derived file key.
fn compute_u(file_key: &[u8], params: &EncryptParams) -> Vec<u8> {
    if params.r == 2 {
        return Arc4::encrypt(file_key, &PADDING).unwrap_or_default();
    }
    let mut hash_input = Vec::with_capacity(32 + params.id0.len());
    hash_input.extend_from_slice(&PADDING);
    hash_input.extend_from_slice(&params.id0);
    let mut value = crypto::md5(&hash_input).to_vec();
    value = Arc4::encrypt(file_key, &value).unwrap_or(value);
    for i in 1u8..=19 {
        let round_key: Vec<u8> = file_key.iter().map(|&b| b ^ i).collect();
        value = Arc4::encrypt(&round_key, &value).unwrap_or(value);
    }
    value.resize(32, 0);
    value
}

/// Algorithm 3 (owner-key derivation) followed by Algorithm 7 in reverse: decrypts `/O` with
/// the owner-password-derived RC4 key(s) to recover the padded user password.
fn recover_user_password(owner_padded: &[u8; 32], params: &EncryptParams) -> Vec<u8> {
    let mut digest = crypto::md5(owner_padded).to_vec();
    if params.r >= 3 {
        for _ in 0..50 {
            digest = crypto::md5(&digest[..params.key_len_bytes]).to_vec();
        }
    }
    let owner_key = &digest[..params.key_len_bytes];

    if params.r == 2 {
        return Arc4::decrypt(owner_key, &params.o).unwrap_or_default();
    }
    let mut value = params.o.clone();
    for i in (1u8..=19).rev() {
        let round_key: Vec<u8> = owner_key.iter().map(|&b| b ^ i).collect();
        value = Arc4::decrypt(&round_key, &value).unwrap_or(value);
    }
    value
}

fn verify_r_le4(candidate_key: &[u8], params: &EncryptParams) -> bool {
    let expected = compute_u(candidate_key, params);
    if params.r == 2 {
        expected == params.u
    } else {
        expected.len() >= 16 && params.u.len() >= 16 && expected[..16] == params.u[..16]
    }
}

/// R=6 "Algorithm 2.B": an iterated SHA-256/384/512 + AES-128-CBC hash over
/// `password || K || user_key`, looping at least 64 rounds until the last output byte of the
/// round's AES ciphertext is small enough relative to the round count (spec §4.7).
fn hash_2b(password: &[u8], salt: &[u8], user_key: &[u8]) -> Vec<u8> {
    let mut seed = Vec::with_capacity(password.len() + salt.len() + user_key.len());
    seed.extend_from_slice(password);
    seed.extend_from_slice(salt);
    seed.extend_from_slice(user_key);
    let mut k = crypto::sha256(&seed).to_vec();

    let mut round = 0u32;
    loop {
        let mut k1 = Vec::with_capacity((password.len() + k.len() + user_key.len()) * 64);
        for _ in 0..64 {
            k1.extend_from_slice(password);
            k1.extend_from_slice(&k);
            k1.extend_from_slice(user_key);
        }
        let e = aes_cbc_no_padding_encrypt_128_explicit_key(&k[0..16], &k[16..32], &k1);
        let modulus: u32 = e[0..16].iter().map(|&b| b as u32).sum::<u32>() % 3;
        k = match modulus {
            0 => crypto::sha256(&e).to_vec(),
            1 => crypto::sha384(&e).to_vec(),
            _ => crypto::sha512(&e).to_vec(),
        };
        round += 1;
        if round >= 64 && (*e.last().unwrap() as u32) <= round.saturating_sub(32) {
            break;
        }
    }
    k.truncate(32);
    k
}

fn verify_r6_user(password: &[u8], params: &EncryptParams) -> Option<Vec<u8>> {
    if params.u.len() < 48 {
        return None;
    }
    let validation_salt = &params.u[32..40];
    let key_salt = &params.u[40..48];
    let hash = hash_2b(password, validation_salt, &[]);
    if hash != params.u[0..32] {
        return None;
    }
    let intermediate = hash_2b(password, key_salt, &[]);
    let mut key32 = [0u8; 32];
    key32.copy_from_slice(&intermediate);
    let zero_iv = [0u8; 16];
    Some(aes_cbc_no_padding_decrypt_256(&key32, &zero_iv, &params.ue))
}

fn verify_r6_owner(password: &[u8], params: &EncryptParams) -> Option<Vec<u8>> {
    if params.o.len() < 48 || params.u.len() < 48 {
        return None;
    }
    let validation_salt = &params.o[32..40];
    let key_salt = &params.o[40..48];
    let hash = hash_2b(password, validation_salt, &params.u[..48]);
    if hash != params.o[0..32] {
        return None;
    }
    let intermediate = hash_2b(password, key_salt, &params.u[..48]);
    let mut key32 = [0u8; 32];
    key32.copy_from_slice(&intermediate);
    let zero_iv = [0u8; 16];
    Some(aes_cbc_no_padding_decrypt_256(&key32, &zero_iv, &params.oe))
}

/// Decrypts and validates `/Perms` against the derived file key (spec §4.7, property 4): bytes
/// 9..12 must read `"adb"`, and the leading 4 bytes must equal `/P` as little-endian `i32`.
fn verify_perms(file_key: &[u8], params: &EncryptParams) -> Result<()> {
    if params.perms.len() != 16 {
        return Err(Error::Encryption(EncryptionError::PermsMismatch));
    }
    let mut key32 = [0u8; 32];
    key32.copy_from_slice(file_key);
    let zero_iv = [0u8; 16];
    let plain = aes_cbc_no_padding_decrypt_256(&key32, &zero_iv, &params.perms);
    let p = i32::from_le_bytes([plain[0], plain[1], plain[2], plain[3]]);
    if p != params.p || &plain[9..12] != b"adb" {
        return Err(Error::Encryption(EncryptionError::PermsMismatch));
    }
    let metadata_flag = plain[8] == b'T';
    if metadata_flag != params.encrypt_metadata {
        return Err(Error::Encryption(EncryptionError::PermsMismatch));
    }
    Ok(())
}

fn encrypt_dict(document: &Document) -> Result<Dictionary> {
    let value = document.trailer.get(b"Encrypt").map_err(|_| Error::Encryption(EncryptionError::NotEncrypted))?;
    let (_, resolved) = document.dereference(value)?;
    resolved.as_dict().map(Dictionary::clone)
}

fn id0(document: &Document) -> Vec<u8> {
    document
        .trailer
        .get(b"ID")
        .and_then(|o| o.as_array())
        .ok()
        .and_then(|arr| arr.first())
        .and_then(|o| o.as_str().ok())
        .map(|s| s.to_vec())
        .unwrap_or_default()
}

/// Tries `password` as both the user and the owner password, returning the resulting
/// [`super::EncryptionState`] on success (spec §4.7 "Revisions and derivations").
pub(super) fn derive_state(document: &Document, password: &str) -> Result<super::EncryptionState> {
    let encrypt = encrypt_dict(document)?;
    let id0 = id0(document);
    let params = read_params(&encrypt, id0)?;

    if params.r == 6 {
        let pwd_bytes = prepare_password(password);

        let file_key = verify_r6_user(&pwd_bytes, &params).or_else(|| verify_r6_owner(&pwd_bytes, &params));
        let file_key = file_key.ok_or(Error::Encryption(EncryptionError::InvalidPassword))?;
        verify_perms(&file_key, &params)?;

        return Ok(super::EncryptionState {
            file_key,
            r: params.r,
            stm_method: params.stm_method,
            str_method: params.str_method,
            encrypt_metadata: params.encrypt_metadata,
            strict_aes_padding: document.config.strict_aes_padding,
        });
    }

    if params.r < 2 || params.r > 4 {
        return Err(Error::Encryption(EncryptionError::UnsupportedRevision(params.r)));
    }

    let padded = pad_password(password.as_bytes());
    let user_key = compute_file_key(&padded, &params);
    if verify_r_le4(&user_key, &params) {
        return Ok(super::EncryptionState {
            file_key: user_key,
            r: params.r,
            stm_method: params.stm_method,
            str_method: params.str_method,
            encrypt_metadata: params.encrypt_metadata,
            strict_aes_padding: document.config.strict_aes_padding,
        });
    }

    let recovered_user_password = recover_user_password(&padded, &params);
    let mut recovered_padded = [0u8; 32];
    let n = recovered_user_password.len().min(32);
    recovered_padded[..n].copy_from_slice(&recovered_user_password[..n]);
    let owner_key = compute_file_key(&recovered_padded, &params);
    if verify_r_le4(&owner_key, &params) {
        return Ok(super::EncryptionState {
            file_key: owner_key,
            r: params.r,
            stm_method: params.stm_method,
            str_method: params.str_method,
            encrypt_metadata: params.encrypt_metadata,
            strict_aes_padding: document.config.strict_aes_padding,
        });
    }

    Err(Error::Encryption(EncryptionError::InvalidPassword))
}

/// Re-derives `/O`, `/U`, `/OE`, `/UE`, `/Perms` for a freshly set-up encrypted document (writer
/// path, spec §4.8 step 5): used when the caller asks to encrypt a new or rewritten document
/// rather than open an existing one.
pub fn set_up_encryption(
    user_password: &str, owner_password: &str, permissions: i32, encrypt_metadata: bool, r: u8, key_len_bytes: usize,
    id0: &[u8],
) -> Result<(Vec<u8>, Dictionary)> {
    if r == 6 {
        return set_up_encryption_r6(user_password, owner_password, permissions, encrypt_metadata);
    }

    let user_padded = pad_password(user_password.as_bytes());
    let owner_password_or_user = if owner_password.is_empty() { user_password } else { owner_password };
    let owner_padded = pad_password(owner_password_or_user.as_bytes());

    let mut placeholder = EncryptParams {
        r,
        o: Vec::new(),
        u: Vec::new(),
        oe: Vec::new(),
        ue: Vec::new(),
        perms: Vec::new(),
        p: permissions,
        key_len_bytes,
        encrypt_metadata,
        id0: id0.to_vec(),
        stm_method: CryptMethod::Rc4,
        str_method: CryptMethod::Rc4,
    };

    let mut owner_digest = crypto::md5(&owner_padded).to_vec();
    if r >= 3 {
        for _ in 0..50 {
            owner_digest = crypto::md5(&owner_digest[..key_len_bytes]).to_vec();
        }
    }
    let owner_key = &owner_digest[..key_len_bytes];
    let mut o_value = Arc4::encrypt(owner_key, &user_padded).unwrap_or_default();
    if r >= 3 {
        for i in 1u8..=19 {
            let round_key: Vec<u8> = owner_key.iter().map(|&b| b ^ i).collect();
            o_value = Arc4::encrypt(&round_key, &o_value).unwrap_or(o_value);
        }
    }
    placeholder.o = o_value;

    let file_key = compute_file_key(&user_padded, &placeholder);
    let u_value = compute_u(&file_key, &placeholder);

    let mut dict = Dictionary::new();
    dict.set("Filter", Object::Name(b"Standard".to_vec()));
    dict.set("V", Object::Integer(if r == 4 { 4 } else { 1 }));
    dict.set("R", Object::Integer(r as i64));
    dict.set("O", Object::string_literal(placeholder.o.clone()));
    dict.set("U", Object::string_literal(u_value));
    dict.set("P", Object::Integer(permissions as i64));
    dict.set("Length", Object::Integer((key_len_bytes * 8) as i64));
    dict.set("EncryptMetadata", Object::Boolean(encrypt_metadata));

    Ok((file_key, dict))
}

fn set_up_encryption_r6(
    user_password: &str, owner_password: &str, permissions: i32, encrypt_metadata: bool,
) -> Result<(Vec<u8>, Dictionary)> {
    let mut file_key = [0u8; 32];
    crypto::fill_random(&mut file_key);

    let user_bytes = prepare_password(user_password);
    let mut validation_salt = [0u8; 8];
    let mut key_salt = [0u8; 8];
    crypto::fill_random(&mut validation_salt);
    crypto::fill_random(&mut key_salt);

    let u_hash = hash_2b(&user_bytes, &validation_salt, &[]);
    let mut u_value = Vec::with_capacity(48);
    u_value.extend_from_slice(&u_hash);
    u_value.extend_from_slice(&validation_salt);
    u_value.extend_from_slice(&key_salt);

    let u_intermediate = hash_2b(&user_bytes, &key_salt, &[]);
    let mut u_intermediate_key = [0u8; 32];
    u_intermediate_key.copy_from_slice(&u_intermediate);
    let zero_iv = [0u8; 16];
    let ue_value = aes_cbc_no_padding_encrypt_256(&u_intermediate_key, &zero_iv, &file_key);

    let owner = if owner_password.is_empty() { user_password } else { owner_password };
    let owner_bytes = prepare_password(owner);
    let mut o_validation_salt = [0u8; 8];
    let mut o_key_salt = [0u8; 8];
    crypto::fill_random(&mut o_validation_salt);
    crypto::fill_random(&mut o_key_salt);

    let o_hash = hash_2b(&owner_bytes, &o_validation_salt, &u_value);
    let mut o_value = Vec::with_capacity(48);
    o_value.extend_from_slice(&o_hash);
    o_value.extend_from_slice(&o_validation_salt);
    o_value.extend_from_slice(&o_key_salt);

    let o_intermediate = hash_2b(&owner_bytes, &o_key_salt, &u_value);
    let mut o_intermediate_key = [0u8; 32];
    o_intermediate_key.copy_from_slice(&o_intermediate);
    let oe_value = aes_cbc_no_padding_encrypt_256(&o_intermediate_key, &zero_iv, &file_key);

    let mut perms_plain = [0u8; 16];
    perms_plain[0..4].copy_from_slice(&permissions.to_le_bytes());
    perms_plain[4..8].copy_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
    perms_plain[8] = if encrypt_metadata { b'T' } else { b'F' };
    perms_plain[9..12].copy_from_slice(b"adb");
    crypto::fill_random(&mut perms_plain[12..16]);
    let mut perms_key = [0u8; 32];
    perms_key.copy_from_slice(&file_key);
    let perms_value = aes_cbc_no_padding_encrypt_256(&perms_key, &zero_iv, &perms_plain);

    let mut dict = Dictionary::new();
    dict.set("Filter", Object::Name(b"Standard".to_vec()));
    dict.set("V", Object::Integer(5));
    dict.set("R", Object::Integer(6));
    dict.set("O", Object::string_literal(o_value));
    dict.set("U", Object::string_literal(u_value));
    dict.set("OE", Object::string_literal(oe_value));
    dict.set("UE", Object::string_literal(ue_value));
    dict.set("Perms", Object::string_literal(perms_value.to_vec()));
    dict.set("P", Object::Integer(permissions as i64));
    dict.set("Length", Object::Integer(256));
    dict.set("EncryptMetadata", Object::Boolean(encrypt_metadata));

    let mut cf = Dictionary::new();
    let mut std_cf = Dictionary::new();
    std_cf.set("CFM", Object::Name(b"AESV3".to_vec()));
    std_cf.set("AuthEvent", Object::Name(b"DocOpen".to_vec()));
    std_cf.set("Length", Object::Integer(32));
    cf.set("StdCF", Object::Dictionary(std_cf));
    dict.set("CF", Object::Dictionary(cf));
    dict.set("StmF", Object::Name(b"StdCF".to_vec()));
    dict.set("StrF", Object::Name(b"StdCF".to_vec()));

    Ok((file_key.to_vec(), dict))
}
