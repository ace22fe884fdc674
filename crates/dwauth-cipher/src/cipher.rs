//! The XOR transform and its key table.

use std::fmt;
use std::sync::Arc;

use crate::CipherSwitch;

/// Number of entries in the key table.
pub const KEY_TABLE_LEN: usize = 256;

/// Frames shorter than this pass through the cipher untouched.
pub const MIN_CIPHER_LEN: usize = 4;

/// The length header is never transformed.
const HEADER_LEN: usize = 2;

// ---------------------------------------------------------------------------
// KeyTable
// ---------------------------------------------------------------------------

/// A fixed 256-byte key table.
///
/// The default table is `key[i] = (i * 7 + 13) mod 256`. Clients ship the
/// same table, so it must never be regenerated per process.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyTable([u8; KEY_TABLE_LEN]);

impl KeyTable {
    /// Builds the standard derived table.
    pub fn derived() -> Self {
        let mut table = [0u8; KEY_TABLE_LEN];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = ((i * 7 + 13) % KEY_TABLE_LEN) as u8;
        }
        Self(table)
    }

    /// Wraps a custom table.
    pub fn from_bytes(bytes: [u8; KEY_TABLE_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw table bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_TABLE_LEN] {
        &self.0
    }

    /// Key byte for frame offset `index` (`index >= 2`).
    #[inline]
    fn at(&self, index: usize) -> u8 {
        self.0[(index - HEADER_LEN) % KEY_TABLE_LEN]
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::derived()
    }
}

impl fmt::Debug for KeyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyTable({:02x?}..)", &self.0[..8])
    }
}

// ---------------------------------------------------------------------------
// Cipher
// ---------------------------------------------------------------------------

/// The frame cipher: a key table plus the shared on/off switch.
///
/// Cloning is cheap and every clone observes the same switch, so a toggle
/// from the operator console is seen by the next frame on every connection.
#[derive(Debug, Clone)]
pub struct Cipher {
    key: Arc<KeyTable>,
    switch: CipherSwitch,
}

impl Cipher {
    /// Creates a cipher over the derived key table.
    pub fn new(switch: CipherSwitch) -> Self {
        Self::with_key(KeyTable::derived(), switch)
    }

    /// Creates a cipher over a custom key table.
    pub fn with_key(key: KeyTable, switch: CipherSwitch) -> Self {
        Self {
            key: Arc::new(key),
            switch,
        }
    }

    /// Encrypts a complete frame in place.
    ///
    /// No-op when the switch is off or the frame is shorter than
    /// [`MIN_CIPHER_LEN`].
    pub fn encrypt(&self, frame: &mut [u8]) {
        if self.applies_to(frame) {
            encrypt_in_place(&self.key, frame);
        }
    }

    /// Decrypts a complete frame in place. Inverse of [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, frame: &mut [u8]) {
        if self.applies_to(frame) {
            decrypt_in_place(&self.key, frame);
        }
    }

    /// Returns `true` if frames are currently being transformed.
    pub fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    /// The shared switch controlling this cipher.
    pub fn switch(&self) -> &CipherSwitch {
        &self.switch
    }

    /// Returns a copy of the key table, for syncing with a client build.
    pub fn key_table(&self) -> KeyTable {
        (*self.key).clone()
    }

    fn applies_to(&self, frame: &[u8]) -> bool {
        frame.len() >= MIN_CIPHER_LEN && self.switch.is_enabled()
    }
}

/// Forward pass: each byte is keyed, then chained against the previous
/// already-encrypted byte.
fn encrypt_in_place(key: &KeyTable, buf: &mut [u8]) {
    for i in HEADER_LEN..buf.len() {
        let mut b = buf[i] ^ key.at(i);
        if i > HEADER_LEN {
            b ^= buf[i - 1];
        }
        buf[i] = b;
    }
}

/// Backward pass. Must run from the end: `buf[i - 1]` has to still hold
/// ciphertext when byte `i` is recovered.
fn decrypt_in_place(key: &KeyTable, buf: &mut [u8]) {
    for i in (HEADER_LEN..buf.len()).rev() {
        let mut b = buf[i] ^ key.at(i);
        if i > HEADER_LEN {
            b ^= buf[i - 1];
        }
        buf[i] = b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> Cipher {
        Cipher::new(CipherSwitch::in_memory(true))
    }

    #[test]
    fn test_key_table_derived_matches_formula() {
        let key = KeyTable::derived();
        assert_eq!(key.as_bytes()[0], 13);
        assert_eq!(key.as_bytes()[1], 20);
        assert_eq!(key.as_bytes()[255], ((255 * 7 + 13) % 256) as u8);
    }

    #[test]
    fn test_encrypt_header_untouched() {
        let cipher = enabled();
        let mut frame = vec![0x08, 0x00, 0xff, 0xff, 1, 2, 3, 4];
        cipher.encrypt(&mut frame);
        assert_eq!(&frame[..2], &[0x08, 0x00]);
        assert_ne!(&frame[2..], &[0xff, 0xff, 1, 2, 3, 4]);
    }

    #[test]
    fn test_encrypt_known_vector() {
        // in[2] = 0 -> out[2] = key[0] = 13
        // in[3] = 0 -> out[3] = key[1] ^ out[2] = 20 ^ 13 = 25
        let cipher = enabled();
        let mut frame = vec![4, 0, 0, 0];
        cipher.encrypt(&mut frame);
        assert_eq!(frame, vec![4, 0, 13, 25]);
    }

    #[test]
    fn test_decrypt_inverts_encrypt() {
        let cipher = enabled();
        let original: Vec<u8> = (0..600u32).map(|i| (i * 31 % 251) as u8).collect();
        let mut frame = original.clone();
        cipher.encrypt(&mut frame);
        cipher.decrypt(&mut frame);
        assert_eq!(frame, original);
    }

    #[test]
    fn test_decrypt_ascending_order_would_corrupt() {
        // Sanity check that the chain really runs forward: undoing it in
        // ascending order does not recover the plaintext.
        let key = KeyTable::derived();
        let original = vec![6, 0, 10, 20, 30, 40];
        let mut frame = original.clone();
        encrypt_in_place(&key, &mut frame);
        for i in HEADER_LEN..frame.len() {
            let mut b = frame[i] ^ key.at(i);
            if i > HEADER_LEN {
                b ^= frame[i - 1];
            }
            frame[i] = b;
        }
        assert_ne!(frame, original);
    }

    #[test]
    fn test_encrypt_short_frame_passthrough() {
        let cipher = enabled();
        let mut frame = vec![3, 0, 9];
        cipher.encrypt(&mut frame);
        assert_eq!(frame, vec![3, 0, 9]);
    }

    #[test]
    fn test_encrypt_disabled_passthrough() {
        let cipher = Cipher::new(CipherSwitch::in_memory(false));
        let mut frame = vec![6, 0, 1, 2, 3, 4];
        cipher.encrypt(&mut frame);
        assert_eq!(frame, vec![6, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_toggle_observed_by_clones() {
        let cipher = enabled();
        let clone = cipher.clone();
        cipher.switch().disable().expect("memory switch");
        assert!(!clone.is_enabled());
    }

    #[test]
    fn test_with_key_custom_table_used() {
        let cipher = Cipher::with_key(
            KeyTable::from_bytes([0u8; KEY_TABLE_LEN]),
            CipherSwitch::in_memory(true),
        );
        let mut frame = vec![4, 0, 5, 0];
        cipher.encrypt(&mut frame);
        // zero key: out[2] = 5, out[3] = 0 ^ 5
        assert_eq!(frame, vec![4, 0, 5, 5]);
        assert_eq!(cipher.key_table().as_bytes(), &[0u8; KEY_TABLE_LEN]);
    }
}
