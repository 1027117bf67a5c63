//! RC5-32/12/16

use byteorder::{ByteOrder, LittleEndian};

use crate::{error::Result, BlockCipher};

/// Number of rounds
pub const ROUNDS: usize = 12;

/// Key length in bytes
pub const KEY_SIZE: usize = 16;

const KEY_WORDS: usize = KEY_SIZE / 4;
const SUBKEYS: usize = 2 * ROUNDS + 2;

const P32: u32 = 0xB7E1_5163;
const Q32: u32 = 0x9E37_79B9;

/// Key the client encrypts its own files with
pub const RC5_PASSWORD_KEY: [u8; KEY_SIZE] = [
    0x3C, 0xDC, 0xFE, 0xE8, 0xC4, 0x54, 0xD6, 0x7E, 0x16, 0xA6, 0xF8, 0x1A, 0xE8, 0xD0, 0x38, 0xBE,
];

/// RC5 with 32 bit words, 12 rounds and a 16 byte key
#[derive(Clone)]
pub struct Rc5 {
    subkeys: [u32; SUBKEYS],
}

impl Rc5 {
    /// Expands `key` into the round subkeys
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        let mut words = [0u32; KEY_WORDS];
        LittleEndian::read_u32_into(key, &mut words);

        let mut subkeys = [0u32; SUBKEYS];
        subkeys[0] = P32;
        for i in 1..SUBKEYS {
            subkeys[i] = subkeys[i - 1].wrapping_add(Q32);
        }

        let (mut i, mut j) = (0, 0);
        let (mut a, mut b) = (0u32, 0u32);
        for _ in 0..3 * SUBKEYS.max(KEY_WORDS) {
            subkeys[i] = subkeys[i].wrapping_add(a).wrapping_add(b).rotate_left(3);
            a = subkeys[i];
            i = (i + 1) % SUBKEYS;

            let mix = a.wrapping_add(b);
            words[j] = words[j].wrapping_add(mix).rotate_left(mix);
            b = words[j];
            j = (j + 1) % KEY_WORDS;
        }

        Self { subkeys }
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        let s = &self.subkeys;
        let mut a = LittleEndian::read_u32(&block[..4]).wrapping_add(s[0]);
        let mut b = LittleEndian::read_u32(&block[4..]).wrapping_add(s[1]);

        for round in 1..=ROUNDS {
            a = (a ^ b).rotate_left(b).wrapping_add(s[2 * round]);
            b = (b ^ a).rotate_left(a).wrapping_add(s[2 * round + 1]);
        }

        LittleEndian::write_u32(&mut block[..4], a);
        LittleEndian::write_u32(&mut block[4..], b);
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        let s = &self.subkeys;
        let mut a = LittleEndian::read_u32(&block[..4]);
        let mut b = LittleEndian::read_u32(&block[4..]);

        for round in (1..=ROUNDS).rev() {
            b = b.wrapping_sub(s[2 * round + 1]).rotate_right(a) ^ a;
            a = a.wrapping_sub(s[2 * round]).rotate_right(b) ^ b;
        }

        LittleEndian::write_u32(&mut block[..4], a.wrapping_sub(s[0]));
        LittleEndian::write_u32(&mut block[4..], b.wrapping_sub(s[1]));
    }
}

impl Default for Rc5 {
    /// A cipher keyed with [`RC5_PASSWORD_KEY`]
    fn default() -> Self {
        Self::new(&RC5_PASSWORD_KEY)
    }
}

impl std::fmt::Debug for Rc5 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rc5").finish_non_exhaustive()
    }
}

impl BlockCipher for Rc5 {
    const BLOCK_SIZE: usize = 8;

    fn encrypt(&self, data: &mut [u8]) -> Result<()> {
        Self::check_length(data)?;
        data.chunks_exact_mut(Self::BLOCK_SIZE)
            .for_each(|block| self.encrypt_block(block));
        Ok(())
    }

    fn decrypt(&self, data: &mut [u8]) -> Result<()> {
        Self::check_length(data)?;
        data.chunks_exact_mut(Self::BLOCK_SIZE)
            .for_each(|block| self.decrypt_block(block));
        Ok(())
    }
}
