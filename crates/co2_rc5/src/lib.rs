//! This library implements the **RC5-32/12/16** block cipher that *Conquer Online* protects some
//! of its client files with.
//!
//! RC5-32/12/16 works on 64 bit blocks split into two little-endian 32 bit words, runs 12 rounds
//! and takes a 16 byte key. The key the client uses for its own files is [`RC5_PASSWORD_KEY`].
//!
//! ```
//! use co2_rc5::{BlockCipher, Rc5, RC5_PASSWORD_KEY};
//!
//! let cipher = Rc5::new(&RC5_PASSWORD_KEY);
//!
//! let mut data = *b"Conquer Online!!";
//! cipher.encrypt(&mut data)?;
//! assert_ne!(&data, b"Conquer Online!!");
//!
//! cipher.decrypt(&mut data)?;
//! assert_eq!(&data, b"Conquer Online!!");
//! # Ok::<(), co2_rc5::error::Error>(())
//! ```

pub mod error;
pub mod rc5;

pub use rc5::{Rc5, RC5_PASSWORD_KEY};

use error::{Error, Result};

/// A stateless block cipher working in place
pub trait BlockCipher {
    /// Size of one block in bytes
    const BLOCK_SIZE: usize;

    /// Encrypts every block of `data`
    ///
    /// Fails without touching `data` unless it holds whole blocks. Empty data is left as is.
    fn encrypt(&self, data: &mut [u8]) -> Result<()>;

    /// Decrypts every block of `data`
    ///
    /// Fails without touching `data` unless it holds whole blocks. Empty data is left as is.
    fn decrypt(&self, data: &mut [u8]) -> Result<()>;

    /// Checks that `data` holds whole blocks
    fn check_length(data: &[u8]) -> Result<()> {
        if data.len() % Self::BLOCK_SIZE != 0 {
            return Err(Error::InvalidLength {
                len: data.len(),
                block_size: Self::BLOCK_SIZE,
            });
        }
        Ok(())
    }
}
