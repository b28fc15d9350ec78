//! On-chain poll program interface: ids, derived addresses, account
//! layouts, and instruction builders.
//!
//! The program follows Anchor conventions. Accounts carry an 8-byte
//! discriminator `sha256("account:<Name>")[..8]`; instruction data starts
//! with `sha256("global:<name>")[..8]` followed by borsh-encoded arguments.
//! Everything multi-byte is little-endian.

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use sol_wire::codec::ByteReader;
use sol_wire::pda::find_program_address;
use sol_wire::transaction::{AccountMeta, Instruction, SYSTEM_PROGRAM_ID};

use crate::error::CoreError;

/// The deployed poll program, Base58 form.
pub const PROGRAM_ADDRESS: &str = "e1QaxL4ubetdfvhpndqJnjWvkfzU4LT5NJeGM46LTdf";

/// The deployed poll program, decoded. Must match [`PROGRAM_ADDRESS`].
pub const PROGRAM_ID: [u8; 32] = [
    0x09, 0x7a, 0xf3, 0x21, 0x8e, 0xc1, 0x8d, 0xc8, 0x3f, 0xa9, 0xd5, 0xde, 0xe3, 0x68, 0x8c,
    0x08, 0x9f, 0xcd, 0xac, 0x21, 0x45, 0x7a, 0x5f, 0x32, 0x30, 0x1c, 0x28, 0xc2, 0xb7, 0x74,
    0x1e, 0x9e,
];

/// Seed of the singleton counter PDA.
pub const COUNTER_SEED: &[u8] = b"counter";

/// First seed of each poll PDA; the second is the poll id, little-endian.
pub const POLL_SEED: &[u8] = b"poll";

/// Maximum poll description length in bytes, fixed by the program's
/// account allocation.
pub const MAX_DESCRIPTION_LEN: usize = 256;

// ---------------------------------------------------------------------------
// Discriminators
// ---------------------------------------------------------------------------

fn discriminator(preimage: &str) -> [u8; 8] {
    let hash = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// Tag at offset 0 of every counter account.
pub fn counter_discriminator() -> [u8; 8] {
    discriminator("account:Counter")
}

/// Tag at offset 0 of every poll account.
pub fn poll_discriminator() -> [u8; 8] {
    discriminator("account:Poll")
}

/// Tag at offset 0 of `initialize` instruction data.
pub fn initialize_discriminator() -> [u8; 8] {
    discriminator("global:initialize")
}

/// Tag at offset 0 of `create_poll` instruction data.
pub fn create_poll_discriminator() -> [u8; 8] {
    discriminator("global:create_poll")
}

// ---------------------------------------------------------------------------
// Derived addresses
// ---------------------------------------------------------------------------

/// Address of the singleton counter account.
pub fn counter_pda() -> Result<[u8; 32], CoreError> {
    let (address, _bump) = find_program_address(&[COUNTER_SEED], &PROGRAM_ID)?;
    Ok(address)
}

/// Address of the poll account for `poll_id`.
pub fn poll_pda(poll_id: u64) -> Result<[u8; 32], CoreError> {
    let (address, _bump) =
        find_program_address(&[POLL_SEED, &poll_id.to_le_bytes()], &PROGRAM_ID)?;
    Ok(address)
}

// ---------------------------------------------------------------------------
// Account layouts
// ---------------------------------------------------------------------------

/// The global poll counter.
///
/// `count` is the number of polls ever created and doubles as the id the
/// next created poll will receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    pub count: u64,
}

impl Counter {
    /// Discriminator + count.
    pub const LEN: usize = 8 + 8;

    /// Decode account bytes. Tolerates trailing padding beyond [`Self::LEN`].
    pub fn decode(data: &[u8]) -> Result<Self, CoreError> {
        let mut reader = ByteReader::new(data);
        let tag = reader
            .read_array::<8>()
            .map_err(|_| CoreError::Decode("counter account too short".into()))?;
        if tag != counter_discriminator() {
            return Err(CoreError::Decode(
                "counter account has wrong discriminator".into(),
            ));
        }
        let count = reader
            .read_u64_le()
            .map_err(|_| CoreError::Decode("counter account missing count".into()))?;
        Ok(Counter { count })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        out.extend_from_slice(&counter_discriminator());
        out.extend_from_slice(&self.count.to_le_bytes());
        out
    }
}

/// One poll record.
///
/// `start` is inclusive, `end` exclusive, both Unix seconds; `start < end`
/// holds for the lifetime of the poll. Only `candidate_count` ever changes
/// after creation, and not through this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Poll {
    pub id: u64,
    pub description: String,
    pub start: i64,
    pub end: i64,
    pub candidate_count: u64,
    #[serde(serialize_with = "serialize_pubkey")]
    pub owner: [u8; 32],
}

fn serialize_pubkey<S: Serializer>(key: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&bs58::encode(key).into_string())
}

impl Poll {
    /// Decode account bytes. The account is allocated at maximum description
    /// size, so trailing padding after `owner` is expected and ignored.
    pub fn decode(data: &[u8]) -> Result<Self, CoreError> {
        let mut reader = ByteReader::new(data);
        let decode_err = |what: &str| CoreError::Decode(format!("poll account: {what}"));

        let tag = reader
            .read_array::<8>()
            .map_err(|_| decode_err("too short"))?;
        if tag != poll_discriminator() {
            return Err(decode_err("wrong discriminator"));
        }

        let id = reader.read_u64_le().map_err(|_| decode_err("missing id"))?;
        let description = reader
            .read_string()
            .map_err(|e| decode_err(&format!("bad description: {e}")))?;
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(decode_err("description exceeds maximum length"));
        }
        let start = reader
            .read_i64_le()
            .map_err(|_| decode_err("missing start"))?;
        let end = reader.read_i64_le().map_err(|_| decode_err("missing end"))?;
        let candidate_count = reader
            .read_u64_le()
            .map_err(|_| decode_err("missing candidate count"))?;
        let owner = reader
            .read_pubkey()
            .map_err(|_| decode_err("missing owner"))?;

        Ok(Poll {
            id,
            description,
            start,
            end,
            candidate_count,
            owner,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 8 + 4 + self.description.len() + 8 + 8 + 8 + 32);
        out.extend_from_slice(&poll_discriminator());
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&(self.description.len() as u32).to_le_bytes());
        out.extend_from_slice(self.description.as_bytes());
        out.extend_from_slice(&self.start.to_le_bytes());
        out.extend_from_slice(&self.end.to_le_bytes());
        out.extend_from_slice(&self.candidate_count.to_le_bytes());
        out.extend_from_slice(&self.owner);
        out
    }
}

// ---------------------------------------------------------------------------
// Instruction builders
// ---------------------------------------------------------------------------

/// Build the one-time `initialize` instruction.
///
/// Creates the counter account with `count = 0`; the program rejects it if
/// the counter already exists.
pub fn initialize_instruction(authority: &[u8; 32]) -> Result<Instruction, CoreError> {
    let counter = counter_pda()?;

    Ok(Instruction {
        program_id: PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*authority, true),
            AccountMeta::writable(counter, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: initialize_discriminator().to_vec(),
    })
}

/// Build a `create_poll` instruction.
///
/// `id` must equal the counter value at execution time; the program rejects
/// a mismatch, which is the duplicate-id guard under concurrent creators.
/// Input validation (`start < end`, non-empty description) is the caller's
/// responsibility.
pub fn create_poll_instruction(
    creator: &[u8; 32],
    id: u64,
    description: &str,
    start: i64,
    end: i64,
) -> Result<Instruction, CoreError> {
    let counter = counter_pda()?;
    let poll = poll_pda(id)?;

    let mut data = Vec::with_capacity(8 + 8 + 4 + description.len() + 8 + 8);
    data.extend_from_slice(&create_poll_discriminator());
    data.extend_from_slice(&id.to_le_bytes());
    data.extend_from_slice(&(description.len() as u32).to_le_bytes());
    data.extend_from_slice(description.as_bytes());
    data.extend_from_slice(&start.to_le_bytes());
    data.extend_from_slice(&end.to_le_bytes());

    Ok(Instruction {
        program_id: PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*creator, true),
            AccountMeta::writable(counter, false),
            AccountMeta::writable(poll, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data,
    })
}
