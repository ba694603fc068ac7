// A transaction moves value from one previous output to one recipient.
// Its id is the SHA-256 of its canonical bytes; the signature covers the same
// bytes with the signature field emptied.

use crate::core::monetary::{block_subsidy, MAX_MONEY, PROTOCOL_VERSION};
use crate::error::{BlockchainError, Result};
use crate::utils::{
    deserialize, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    public_key_from_pkcs8, serialize, sha256_digest, Hash, ZERO_HASH,
};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

/// Output index a coinbase input points at
const COINBASE_PREV_INDEX: u32 = u32::MAX;

// The input names the output being spent and carries the value that output
// holds, so the fee can be computed without a UTXO lookup
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxInput {
    prev_tx: Hash,      // Id of the transaction holding the spent output
    prev_index: u32,    // Index of the output in that transaction
    value: u64,         // Value of the spent output
    sender: Vec<u8>,    // Sender public key (uncompressed P-256)
    signature: Vec<u8>, // Signature over the signable digest
    sequence: u64,      // Sequence number; the block height for a coinbase
}

impl TxInput {
    pub fn new(prev_tx: Hash, prev_index: u32, value: u64) -> TxInput {
        TxInput {
            prev_tx,
            prev_index,
            value,
            sender: vec![],
            signature: vec![],
            sequence: 0,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> TxInput {
        self.sequence = sequence;
        self
    }

    pub fn get_prev_tx(&self) -> &Hash {
        &self.prev_tx
    }

    pub fn get_prev_index(&self) -> u32 {
        self.prev_index
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_sender(&self) -> &[u8] {
        self.sender.as_slice()
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_sequence(&self) -> u64 {
        self.sequence
    }

    fn write_canonical(&self, out: &mut Vec<u8>, with_signature: bool) {
        out.extend_from_slice(&self.prev_tx);
        out.extend(self.prev_index.to_be_bytes());
        out.extend(self.value.to_be_bytes());
        write_len_prefixed(out, &self.sender);
        if with_signature {
            write_len_prefixed(out, &self.signature);
        } else {
            write_len_prefixed(out, &[]);
        }
        out.extend(self.sequence.to_be_bytes());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxOutput {
    value: u64,         // Amount credited to the recipient
    recipient: Vec<u8>, // Recipient public key
}

impl TxOutput {
    pub fn new(value: u64, recipient: &[u8]) -> TxOutput {
        TxOutput {
            value,
            recipient: recipient.to_vec(),
        }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_recipient(&self) -> &[u8] {
        self.recipient.as_slice()
    }

    fn write_canonical(&self, out: &mut Vec<u8>) {
        out.extend(self.value.to_be_bytes());
        write_len_prefixed(out, &self.recipient);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    version: u32,   // Protocol version at creation
    timestamp: i64, // Creation time (ms)
    locktime: i64,  // Earliest time (ms) the transaction may enter a block
    input: TxInput,
    output: TxOutput,
}

impl Transaction {
    /// Build an unsigned transaction
    pub fn new(input: TxInput, output: TxOutput, timestamp: i64, locktime: i64) -> Transaction {
        Transaction {
            version: PROTOCOL_VERSION,
            timestamp,
            locktime,
            input,
            output,
        }
    }

    /// Build and sign a transfer, rejecting out-of-range amounts up front
    pub fn new_transfer(
        input: TxInput,
        output: TxOutput,
        timestamp: i64,
        locktime: i64,
        pkcs8: &[u8],
    ) -> Result<Transaction> {
        check_amounts(input.value, output.value)?;

        let mut tx = Transaction::new(input, output, timestamp, locktime);
        tx.sign(pkcs8)?;
        tx.validate()?;
        Ok(tx)
    }

    /// The reward transaction for the block at `height`
    pub fn new_coinbase(height: u64, recipient: &[u8], timestamp: i64) -> Transaction {
        let input = TxInput::new(ZERO_HASH, COINBASE_PREV_INDEX, 0).with_sequence(height);
        let output = TxOutput::new(block_subsidy(height), recipient);
        Transaction::new(input, output, timestamp, 0)
    }

    /// Sign with a PKCS#8 key pair, stamping its public key as the sender
    pub fn sign(&mut self, pkcs8: &[u8]) -> Result<()> {
        self.input.sender = public_key_from_pkcs8(pkcs8)?;
        let digest = self.signable_digest();
        self.input.signature = ecdsa_p256_sha256_sign_digest(pkcs8, &digest)?;
        Ok(())
    }

    /// Canonical bytes: header fields, then input, then output
    pub fn canonical_bytes(&self) -> Vec<u8> {
        self.encode(true)
    }

    fn encode(&self, with_signature: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.input.sender.len());
        out.extend(self.version.to_be_bytes());
        out.extend(self.timestamp.to_be_bytes());
        out.extend(self.locktime.to_be_bytes());
        self.input.write_canonical(&mut out, with_signature);
        self.output.write_canonical(&mut out);
        out
    }

    /// Content-addressed id
    pub fn hash(&self) -> Hash {
        sha256_digest(&self.canonical_bytes())
    }

    /// Digest the sender signs: the canonical bytes without the signature
    pub fn signable_digest(&self) -> Hash {
        sha256_digest(&self.encode(false))
    }

    pub fn is_coinbase(&self) -> bool {
        self.input.prev_tx == ZERO_HASH
            && self.input.prev_index == COINBASE_PREV_INDEX
            && self.input.sender.is_empty()
    }

    /// Check signature and amounts, naming the first rule that fails
    pub fn validate(&self) -> Result<()> {
        if self.is_coinbase() {
            return self.validate_coinbase();
        }

        check_amounts(self.input.value, self.output.value)?;

        if self.input.sender.is_empty() {
            return Err(BlockchainError::InvalidTransaction(
                "missing sender public key".to_string(),
            ));
        }
        if self.input.signature.is_empty() {
            return Err(BlockchainError::InvalidTransaction(
                "missing signature".to_string(),
            ));
        }

        let digest = self.signable_digest();
        if !ecdsa_p256_sha256_sign_verify(&self.input.sender, &self.input.signature, &digest) {
            return Err(BlockchainError::InvalidTransaction(
                "signature does not verify against the sender key".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_coinbase(&self) -> Result<()> {
        if !self.input.signature.is_empty() || self.input.value != 0 {
            return Err(BlockchainError::InvalidTransaction(
                "coinbase input must be empty".to_string(),
            ));
        }

        let expected = block_subsidy(self.input.sequence);
        if self.output.value != expected {
            return Err(BlockchainError::InvalidTransaction(format!(
                "coinbase pays {} but the subsidy at height {} is {}",
                self.output.value, self.input.sequence, expected
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Fee accrued to the miner that includes this transaction
    pub fn fee_earnings(&self) -> u64 {
        if self.is_coinbase() {
            return 0;
        }
        self.input.value.saturating_sub(self.output.value)
    }

    pub fn get_input(&self) -> &TxInput {
        &self.input
    }

    pub fn get_output(&self) -> &TxOutput {
        &self.output
    }

    pub fn get_locktime(&self) -> i64 {
        self.locktime
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_version(&self) -> u32 {
        self.version
    }

    /// Height a coinbase claims its reward for
    pub fn coinbase_height(&self) -> Option<u64> {
        self.is_coinbase().then_some(self.input.sequence)
    }

    pub fn id_hex(&self) -> String {
        HEXLOWER.encode(&self.hash())
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Transaction {}

fn check_amounts(input_value: u64, output_value: u64) -> Result<()> {
    if input_value > MAX_MONEY || output_value > MAX_MONEY {
        return Err(BlockchainError::InvalidTransaction(format!(
            "amount exceeds the coin cap of {MAX_MONEY}"
        )));
    }
    if output_value > input_value {
        return Err(BlockchainError::InvalidTransaction(format!(
            "output value {output_value} exceeds input value {input_value}"
        )));
    }
    Ok(())
}

fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend((bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}
