//! Transaction wire format: building, signing, and decoding.
//!
//! Transactions use a compact binary layout, built here by hand:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```
//!
//! The signed bytes are exactly the serialized message; signatures are
//! written into slots before it. Decoding reverses the whole layout and is
//! used wherever submitted wire bytes must be inspected (signature checks,
//! instruction dispatch in test ledgers).

use ed25519_dalek::Signer;
use zeroize::Zeroize;

use crate::codec::ByteReader;
use crate::error::WireError;

/// The System Program public key: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` in the compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 from the reader's current position.
pub fn read_compact_u16(reader: &mut ByteReader<'_>) -> Result<u16, WireError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;

    for i in 0..3 {
        let byte = reader.read_u8().map_err(|_| {
            WireError::Serialization("unexpected end of data while decoding compact-u16".into())
        })?;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            break;
        }
        if i == 2 {
            return Err(WireError::Serialization(
                "compact-u16 encoding too long".into(),
            ));
        }
    }

    if value > u16::MAX as u32 {
        return Err(WireError::Serialization("compact-u16 value overflow".into()));
    }

    Ok(value as u16)
}

// ---------------------------------------------------------------------------
// Instruction model
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(pubkey: [u8; 32], is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: [u8; 32], is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A program instruction before compilation into a transaction.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled transaction: account references replaced by u8 indices into
/// `account_keys`, ready for message serialization.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// All account keys in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<[u8; 32]>,

    /// The first N accounts are signers.
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    pub recent_blockhash: [u8; 32],

    pub instructions: Vec<CompiledInstruction>,
}

/// An instruction with account references compiled to indices.
#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compile instructions into a transaction with a single fee payer.
///
/// Deduplicates account keys (merging permission bits), sorts them into
/// canonical order with the fee payer at index 0, and rewrites each
/// instruction's account references as indices.
pub fn compile_transaction(
    instructions: &[Instruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<Transaction, WireError> {
    struct Entry {
        pubkey: [u8; 32],
        is_signer: bool,
        is_writable: bool,
    }

    // Instruction account lists are tiny, so a Vec scan beats a map here.
    let mut entries: Vec<Entry> = Vec::new();
    let mut upsert = |pubkey: [u8; 32], signer: bool, writable: bool| {
        match entries.iter_mut().find(|e| e.pubkey == pubkey) {
            Some(entry) => {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            }
            None => entries.push(Entry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            }),
        }
    };

    // Fee payer is always a writable signer and is inserted first; the sort
    // below is stable, so it stays at index 0 within its category.
    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        // Program ids are non-signer, read-only accounts.
        upsert(ix.program_id, false, false);
    }

    if entries.len() > u8::MAX as usize + 1 {
        return Err(WireError::TransactionBuild(format!(
            "too many accounts: {}",
            entries.len()
        )));
    }

    fn rank(e: &Entry) -> u8 {
        match (e.is_signer, e.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        }
    }
    entries.sort_by_key(rank);

    let num_required_signatures = entries.iter().filter(|e| e.is_signer).count() as u8;
    let num_readonly_signed = entries
        .iter()
        .filter(|e| e.is_signer && !e.is_writable)
        .count() as u8;
    let num_readonly_unsigned = entries
        .iter()
        .filter(|e| !e.is_signer && !e.is_writable)
        .count() as u8;

    let account_keys: Vec<[u8; 32]> = entries.iter().map(|e| e.pubkey).collect();

    let index_of = |pubkey: &[u8; 32], what: &str| -> Result<u8, WireError> {
        account_keys
            .iter()
            .position(|k| k == pubkey)
            .map(|i| i as u8)
            .ok_or_else(|| WireError::TransactionBuild(format!("{what} not in account keys")))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let program_id_index = index_of(&ix.program_id, "program id")?;
        let mut account_indices = Vec::with_capacity(ix.accounts.len());
        for meta in &ix.accounts {
            account_indices.push(index_of(&meta.pubkey, "account")?);
        }
        compiled.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(Transaction {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        instructions: compiled,
    })
}

// ---------------------------------------------------------------------------
// Serialization and signing
// ---------------------------------------------------------------------------

/// Serialize the transaction message, the bytes that get signed.
pub fn serialize_message(tx: &Transaction) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::with_capacity(256);

    buf.push(tx.num_required_signatures);
    buf.push(tx.num_readonly_signed);
    buf.push(tx.num_readonly_unsigned);

    buf.extend_from_slice(&encode_compact_u16(tx.account_keys.len() as u16));
    for key in &tx.account_keys {
        buf.extend_from_slice(key);
    }

    buf.extend_from_slice(&tx.recent_blockhash);

    buf.extend_from_slice(&encode_compact_u16(tx.instructions.len() as u16));
    for ix in &tx.instructions {
        buf.push(ix.program_id_index);

        buf.extend_from_slice(&encode_compact_u16(ix.account_indices.len() as u16));
        buf.extend_from_slice(&ix.account_indices);

        buf.extend_from_slice(&encode_compact_u16(ix.data.len() as u16));
        buf.extend_from_slice(&ix.data);
    }

    Ok(buf)
}

/// Sign a single-signer transaction and assemble the full wire bytes.
///
/// `seed` is the signer's 32-byte Ed25519 seed; the signer must be the
/// transaction's fee payer. The returned bytes are ready for a
/// `sendTransaction` broadcast.
pub fn sign_transaction(tx: &Transaction, seed: &[u8; 32]) -> Result<Vec<u8>, WireError> {
    let message = serialize_message(tx)?;

    let mut seed_copy = *seed;
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed_copy);
    seed_copy.zeroize();

    let pubkey = signing_key.verifying_key().to_bytes();
    if tx.account_keys.first() != Some(&pubkey) {
        return Err(WireError::Signing(
            "signer is not the transaction fee payer".into(),
        ));
    }
    if tx.num_required_signatures != 1 {
        return Err(WireError::Signing(format!(
            "transaction requires {} signatures, single-signer path provides 1",
            tx.num_required_signatures
        )));
    }

    let signature = signing_key.sign(&message);

    let mut wire = Vec::with_capacity(1 + 64 + message.len());
    wire.extend_from_slice(&encode_compact_u16(1));
    wire.extend_from_slice(&signature.to_bytes());
    wire.extend_from_slice(&message);

    Ok(wire)
}

// ---------------------------------------------------------------------------
// Wire decoding
// ---------------------------------------------------------------------------

/// An instruction recovered from wire bytes, with indices resolved back to
/// account keys.
#[derive(Debug, Clone)]
pub struct DecodedInstruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

/// A transaction recovered from wire bytes.
#[derive(Debug, Clone)]
pub struct DecodedTransaction {
    pub signatures: Vec<[u8; 64]>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub account_keys: Vec<[u8; 32]>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<DecodedInstruction>,
    /// The exact message bytes the signatures cover.
    pub message: Vec<u8>,
}

impl DecodedTransaction {
    /// The fee payer is always the first account key.
    pub fn fee_payer(&self) -> [u8; 32] {
        self.account_keys[0]
    }

    /// Position of `key` in the account table.
    pub fn account_index(&self, key: &[u8; 32]) -> Option<usize> {
        self.account_keys.iter().position(|k| k == key)
    }

    /// Whether the account at `index` must sign, per the message header.
    pub fn is_signer(&self, index: usize) -> bool {
        index < self.num_required_signatures as usize
    }

    /// Whether the account at `index` may be written, per the message header.
    ///
    /// Signed accounts occupy the front of the table with their readonly
    /// tail last, then unsigned accounts with theirs.
    pub fn is_writable(&self, index: usize) -> bool {
        let signed = self.num_required_signatures as usize;
        if index < signed {
            index < signed.saturating_sub(self.num_readonly_signed as usize)
        } else {
            index
                < self
                    .account_keys
                    .len()
                    .saturating_sub(self.num_readonly_unsigned as usize)
        }
    }

    /// Verify every required signature against its account key.
    ///
    /// Fails if the signature count does not match the message header, if a
    /// signer key is not a valid Ed25519 point, or if any signature does not
    /// verify over the message bytes.
    pub fn verify_signatures(&self) -> Result<(), WireError> {
        if self.signatures.len() != self.num_required_signatures as usize {
            return Err(WireError::Signing(format!(
                "expected {} signatures, found {}",
                self.num_required_signatures,
                self.signatures.len()
            )));
        }

        for (i, sig_bytes) in self.signatures.iter().enumerate() {
            let key = ed25519_dalek::VerifyingKey::from_bytes(&self.account_keys[i])
                .map_err(|e| WireError::Signing(format!("signer {i} is not a valid key: {e}")))?;
            let signature = ed25519_dalek::Signature::from_bytes(sig_bytes);
            key.verify_strict(&self.message, &signature)
                .map_err(|_| WireError::Signing(format!("signature {i} does not verify")))?;
        }

        Ok(())
    }
}

/// Decode full wire-format transaction bytes.
pub fn decode_transaction(wire: &[u8]) -> Result<DecodedTransaction, WireError> {
    let mut reader = ByteReader::new(wire);

    let num_signatures = read_compact_u16(&mut reader)?;
    if num_signatures == 0 {
        return Err(WireError::Serialization(
            "transaction has zero signatures".into(),
        ));
    }

    let mut signatures = Vec::with_capacity(num_signatures as usize);
    for _ in 0..num_signatures {
        signatures.push(reader.read_array::<64>()?);
    }

    // Everything after the signature slots is the signed message.
    let message = reader.read_bytes(reader.remaining())?.to_vec();

    let mut msg = ByteReader::new(&message);
    let num_required_signatures = msg.read_u8()?;
    let num_readonly_signed = msg.read_u8()?;
    let num_readonly_unsigned = msg.read_u8()?;

    let num_accounts = read_compact_u16(&mut msg)?;
    let mut account_keys = Vec::with_capacity(num_accounts as usize);
    for _ in 0..num_accounts {
        account_keys.push(msg.read_pubkey()?);
    }
    if account_keys.is_empty() {
        return Err(WireError::Serialization(
            "transaction has no account keys".into(),
        ));
    }
    if num_readonly_signed as usize > num_required_signatures as usize
        || num_required_signatures as usize + num_readonly_unsigned as usize > account_keys.len()
    {
        return Err(WireError::Serialization(
            "message header counts exceed the account table".into(),
        ));
    }

    let recent_blockhash = msg.read_pubkey()?;

    let key_at = |idx: u8| -> Result<[u8; 32], WireError> {
        account_keys
            .get(idx as usize)
            .copied()
            .ok_or_else(|| WireError::Serialization(format!("account index {idx} out of range")))
    };

    let num_instructions = read_compact_u16(&mut msg)?;
    let mut instructions = Vec::with_capacity(num_instructions as usize);
    for _ in 0..num_instructions {
        let program_id = key_at(msg.read_u8()?)?;

        let num_ix_accounts = read_compact_u16(&mut msg)?;
        let mut accounts = Vec::with_capacity(num_ix_accounts as usize);
        for _ in 0..num_ix_accounts {
            accounts.push(key_at(msg.read_u8()?)?);
        }

        let data_len = read_compact_u16(&mut msg)?;
        let data = msg.read_bytes(data_len as usize)?.to_vec();

        instructions.push(DecodedInstruction {
            program_id,
            accounts,
            data,
        });
    }

    Ok(DecodedTransaction {
        signatures,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        account_keys,
        recent_blockhash,
        instructions,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(seed: u8) -> (ed25519_dalek::SigningKey, [u8; 32]) {
        let key = ed25519_dalek::SigningKey::from_bytes(&[seed; 32]);
        let pubkey = key.verifying_key().to_bytes();
        (key, pubkey)
    }

    fn sample_instruction(program_id: [u8; 32], payer: [u8; 32]) -> Instruction {
        Instruction {
            program_id,
            accounts: vec![
                AccountMeta::writable(payer, true),
                AccountMeta::writable([0x02; 32], false),
                AccountMeta::readonly([0x03; 32], false),
            ],
            data: vec![1, 2, 3],
        }
    }

    // -- compact-u16 --------------------------------------------------------

    #[test]
    fn compact_u16_single_byte_range() {
        assert_eq!(encode_compact_u16(0), vec![0x00]);
        assert_eq!(encode_compact_u16(0x7f), vec![0x7f]);
    }

    #[test]
    fn compact_u16_two_byte_boundary() {
        // 128 -> (0x00 | 0x80), 0x01
        assert_eq!(encode_compact_u16(128), vec![0x80, 0x01]);
        assert_eq!(encode_compact_u16(16383), vec![0xff, 0x7f]);
    }

    #[test]
    fn compact_u16_three_byte_boundary() {
        assert_eq!(encode_compact_u16(16384), vec![0x80, 0x80, 0x01]);
        assert_eq!(encode_compact_u16(u16::MAX), vec![0xff, 0xff, 0x03]);
    }

    #[test]
    fn compact_u16_roundtrip() {
        for value in [0u16, 1, 127, 128, 255, 256, 16383, 16384, 65535] {
            let encoded = encode_compact_u16(value);
            let mut reader = ByteReader::new(&encoded);
            assert_eq!(read_compact_u16(&mut reader).unwrap(), value);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn compact_u16_decode_empty_fails() {
        let mut reader = ByteReader::new(&[]);
        assert!(read_compact_u16(&mut reader).is_err());
    }

    #[test]
    fn compact_u16_decode_truncated_fails() {
        // Continuation bit set but no next byte.
        let mut reader = ByteReader::new(&[0x80]);
        assert!(read_compact_u16(&mut reader).is_err());
    }

    // -- compilation --------------------------------------------------------

    #[test]
    fn compile_orders_accounts_canonically() {
        let payer = [0x01; 32];
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0xCC; 32]).unwrap();

        // writable signer, writable, readonly, program (readonly)
        assert_eq!(
            tx.account_keys,
            vec![payer, [0x02; 32], [0x03; 32], [0xAA; 32]]
        );
        assert_eq!(tx.num_required_signatures, 1);
        assert_eq!(tx.num_readonly_signed, 0);
        assert_eq!(tx.num_readonly_unsigned, 2);
    }

    #[test]
    fn compile_deduplicates_and_merges_permissions() {
        let payer = [0x01; 32];
        // The fee payer also appears as a plain readonly meta; the merged
        // entry must stay signer + writable.
        let ix = Instruction {
            program_id: [0xAA; 32],
            accounts: vec![
                AccountMeta::readonly(payer, false),
                AccountMeta::writable([0x02; 32], false),
                AccountMeta::writable([0x02; 32], false),
            ],
            data: vec![],
        };
        let tx = compile_transaction(&[ix], &payer, &[0u8; 32]).unwrap();

        assert_eq!(tx.account_keys.len(), 3); // payer, 0x02, program
        assert_eq!(tx.account_keys[0], payer);
        assert_eq!(tx.num_required_signatures, 1);
    }

    #[test]
    fn compile_maps_instruction_indices() {
        let payer = [0x01; 32];
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0u8; 32]).unwrap();

        assert_eq!(tx.instructions.len(), 1);
        let cix = &tx.instructions[0];
        assert_eq!(cix.program_id_index, 3);
        assert_eq!(cix.account_indices, vec![0, 1, 2]);
        assert_eq!(cix.data, vec![1, 2, 3]);
    }

    #[test]
    fn compile_fee_payer_stays_first_among_signers() {
        let payer = [0x09; 32];
        // Another writable signer appears in the instruction before the
        // payer would; insertion order still keeps the payer at index 0.
        let ix = Instruction {
            program_id: [0xAA; 32],
            accounts: vec![
                AccountMeta::writable([0x05; 32], true),
                AccountMeta::writable(payer, true),
            ],
            data: vec![],
        };
        let tx = compile_transaction(&[ix], &payer, &[0u8; 32]).unwrap();

        assert_eq!(tx.account_keys[0], payer);
        assert_eq!(tx.account_keys[1], [0x05; 32]);
        assert_eq!(tx.num_required_signatures, 2);
    }

    #[test]
    fn compile_rejects_too_many_accounts() {
        let payer = [0x01; 32];
        let mut accounts = Vec::new();
        for i in 0..300u16 {
            let mut key = [0u8; 32];
            key[0] = (i & 0xff) as u8;
            key[1] = (i >> 8) as u8;
            accounts.push(AccountMeta::writable(key, false));
        }
        let ix = Instruction {
            program_id: [0xAA; 32],
            accounts,
            data: vec![],
        };
        assert!(compile_transaction(&[ix], &payer, &[0u8; 32]).is_err());
    }

    // -- message serialization ----------------------------------------------

    #[test]
    fn serialized_message_matches_fixture() {
        let payer = [0x01; 32];
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0xCC; 32]).unwrap();
        let msg = serialize_message(&tx).unwrap();

        // Full expected layout: header and key count, then one line per
        // 32-byte section (payer, 0x02, 0x03, program, blockhash), then the
        // instruction.
        let expected = "01000204\
            0101010101010101010101010101010101010101010101010101010101010101\
            0202020202020202020202020202020202020202020202020202020202020202\
            0303030303030303030303030303030303030303030303030303030303030303\
            aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\
            cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc\
            01030300010203010203";
        assert_eq!(hex::encode(&msg), expected);
        assert_eq!(msg.len(), 174);
    }

    #[test]
    fn serialized_message_header_and_blockhash_offsets() {
        let payer = [0x01; 32];
        let blockhash = [0xEE; 32];
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &blockhash).unwrap();
        let msg = serialize_message(&tx).unwrap();

        assert_eq!(msg[0], tx.num_required_signatures);
        assert_eq!(msg[1], tx.num_readonly_signed);
        assert_eq!(msg[2], tx.num_readonly_unsigned);

        let compact_len = encode_compact_u16(tx.account_keys.len() as u16).len();
        let offset = 3 + compact_len + 32 * tx.account_keys.len();
        assert_eq!(&msg[offset..offset + 32], &blockhash);
    }

    // -- signing ------------------------------------------------------------

    #[test]
    fn sign_transaction_produces_verifiable_wire() {
        let (_, payer) = keypair(0x42);
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0xCC; 32]).unwrap();

        let wire = sign_transaction(&tx, &[0x42; 32]).unwrap();
        assert_eq!(wire[0], 0x01); // one signature

        let decoded = decode_transaction(&wire).unwrap();
        decoded.verify_signatures().unwrap();
    }

    #[test]
    fn sign_transaction_is_deterministic() {
        let (_, payer) = keypair(0x55);
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0x99; 32]).unwrap();

        let wire1 = sign_transaction(&tx, &[0x55; 32]).unwrap();
        let wire2 = sign_transaction(&tx, &[0x55; 32]).unwrap();
        assert_eq!(wire1, wire2);
    }

    #[test]
    fn sign_transaction_wrong_fee_payer_fails() {
        let (_, payer) = keypair(0x42);
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0u8; 32]).unwrap();

        // A different key than the fee payer cannot take the single slot.
        let err = sign_transaction(&tx, &[0x43; 32]).unwrap_err();
        assert!(err.to_string().contains("fee payer"));
    }

    // -- decoding -----------------------------------------------------------

    #[test]
    fn decode_roundtrips_built_transaction() {
        let (_, payer) = keypair(0x42);
        let blockhash = [0xDD; 32];
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &blockhash).unwrap();
        let wire = sign_transaction(&tx, &[0x42; 32]).unwrap();

        let decoded = decode_transaction(&wire).unwrap();
        assert_eq!(decoded.account_keys, tx.account_keys);
        assert_eq!(decoded.recent_blockhash, blockhash);
        assert_eq!(decoded.num_required_signatures, 1);
        assert_eq!(decoded.fee_payer(), payer);

        assert_eq!(decoded.instructions.len(), 1);
        let dix = &decoded.instructions[0];
        assert_eq!(dix.program_id, [0xAA; 32]);
        assert_eq!(dix.accounts, vec![payer, [0x02; 32], [0x03; 32]]);
        assert_eq!(dix.data, vec![1, 2, 3]);
    }

    #[test]
    fn decode_resolves_multiple_instructions() {
        let (_, payer) = keypair(0x42);
        let ix1 = sample_instruction([0xAA; 32], payer);
        let ix2 = Instruction {
            program_id: [0xBB; 32],
            accounts: vec![AccountMeta::readonly([0x07; 32], false)],
            data: vec![9],
        };
        let tx = compile_transaction(&[ix1, ix2], &payer, &[0u8; 32]).unwrap();
        let wire = sign_transaction(&tx, &[0x42; 32]).unwrap();

        let decoded = decode_transaction(&wire).unwrap();
        assert_eq!(decoded.instructions.len(), 2);
        assert_eq!(decoded.instructions[1].program_id, [0xBB; 32]);
        assert_eq!(decoded.instructions[1].accounts, vec![[0x07; 32]]);
        assert_eq!(decoded.instructions[1].data, vec![9]);
    }

    #[test]
    fn decode_recovers_header_permissions() {
        let (_, payer) = keypair(0x42);
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0xCC; 32]).unwrap();
        let wire = sign_transaction(&tx, &[0x42; 32]).unwrap();

        let decoded = decode_transaction(&wire).unwrap();
        assert_eq!(decoded.num_readonly_signed, 0);
        assert_eq!(decoded.num_readonly_unsigned, 2);

        // payer, then writable 0x02, readonly 0x03, readonly program
        assert!(decoded.is_signer(0) && decoded.is_writable(0));
        assert!(!decoded.is_signer(1) && decoded.is_writable(1));
        assert!(!decoded.is_signer(2) && !decoded.is_writable(2));
        assert!(!decoded.is_signer(3) && !decoded.is_writable(3));
        assert_eq!(decoded.account_index(&[0x03; 32]), Some(2));
        assert_eq!(decoded.account_index(&[0x77; 32]), None);
    }

    #[test]
    fn decode_readonly_signer_is_not_writable() {
        let payer = [0x01; 32];
        let ix = Instruction {
            program_id: [0xAA; 32],
            accounts: vec![
                AccountMeta::writable(payer, true),
                AccountMeta::readonly([0x07; 32], true),
            ],
            data: vec![],
        };
        let tx = compile_transaction(&[ix], &payer, &[0xCC; 32]).unwrap();
        assert_eq!(tx.num_required_signatures, 2);
        assert_eq!(tx.num_readonly_signed, 1);

        // Two-signer wire assembled by hand; decoding does not verify.
        let message = serialize_message(&tx).unwrap();
        let mut wire = encode_compact_u16(2);
        wire.extend_from_slice(&[0u8; 64]);
        wire.extend_from_slice(&[0u8; 64]);
        wire.extend_from_slice(&message);

        let decoded = decode_transaction(&wire).unwrap();
        assert!(decoded.is_signer(0) && decoded.is_writable(0));
        assert!(decoded.is_signer(1) && !decoded.is_writable(1));
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let (_, payer) = keypair(0x42);
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0u8; 32]).unwrap();
        let mut wire = sign_transaction(&tx, &[0x42; 32]).unwrap();

        wire[10] ^= 0x01; // flip a bit inside the signature slot

        let decoded = decode_transaction(&wire).unwrap();
        assert!(decoded.verify_signatures().is_err());
    }

    #[test]
    fn verify_rejects_unsigned_slot() {
        let (_, payer) = keypair(0x42);
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0u8; 32]).unwrap();
        let mut wire = sign_transaction(&tx, &[0x42; 32]).unwrap();

        for b in &mut wire[1..65] {
            *b = 0;
        }

        let decoded = decode_transaction(&wire).unwrap();
        assert!(decoded.verify_signatures().is_err());
    }

    #[test]
    fn decode_zero_signatures_fails() {
        let err = decode_transaction(&[0x00, 0x01, 0x00, 0x00]).unwrap_err();
        assert!(err.to_string().contains("zero signatures"));
    }

    #[test]
    fn decode_truncated_wire_fails() {
        let (_, payer) = keypair(0x42);
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0u8; 32]).unwrap();
        let wire = sign_transaction(&tx, &[0x42; 32]).unwrap();

        assert!(decode_transaction(&wire[..40]).is_err());
        assert!(decode_transaction(&wire[..wire.len() - 5]).is_err());
        assert!(decode_transaction(&[]).is_err());
    }

    #[test]
    fn decode_out_of_range_account_index_fails() {
        let (_, payer) = keypair(0x42);
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0u8; 32]).unwrap();
        let mut wire = sign_transaction(&tx, &[0x42; 32]).unwrap();

        // The program id index is the first byte of the instruction body;
        // point it past the key table. Layout from the end: 3 data bytes,
        // data_len, 3 account indices, num_accounts, program_id_index.
        let pos = wire.len() - 9;
        wire[pos] = 0xF0;
        assert!(decode_transaction(&wire).is_err());
    }

    #[test]
    fn decode_rejects_inconsistent_header_counts() {
        let (_, payer) = keypair(0x42);
        let ix = sample_instruction([0xAA; 32], payer);
        let tx = compile_transaction(&[ix], &payer, &[0u8; 32]).unwrap();
        let wire = sign_transaction(&tx, &[0x42; 32]).unwrap();

        // Message starts after the compact count and one signature slot;
        // bytes 1 and 2 of the header are the readonly counts.
        let mut claimed_signed = wire.clone();
        claimed_signed[66] = 9; // more readonly signers than signers
        assert!(decode_transaction(&claimed_signed).is_err());

        let mut claimed_unsigned = wire;
        claimed_unsigned[67] = 9; // readonly tail larger than the table
        assert!(decode_transaction(&claimed_unsigned).is_err());
    }
}
