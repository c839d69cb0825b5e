//! Persisted mixer settings
//!
//! Captures the tool table and both controller configs so they survive a
//! reboot. The board decides where the bytes live; this module only builds,
//! validates and (with the `serde` feature) encodes them with postcard.

use heapless::Vec;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::{GradientConfig, RandomConfig};
use crate::mixer::{ColorVector, Mixer, Precision};

/// Magic number to identify valid mixer settings
pub const SETTINGS_MAGIC: u32 = 0x4D495843; // "MIXC"

/// Current settings format version
pub const SETTINGS_VERSION: u8 = 1;

/// Settings errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Magic number does not match
    BadMagic,
    /// Written by a different format version
    VersionMismatch,
    /// Checksum does not match the contents
    CrcMismatch,
    /// Tool or motor count differs from this build
    ShapeMismatch,
    /// Buffer too small to encode into
    Serialize,
    /// Bytes are not a settings image
    Deserialize,
}

/// Mixer settings image
///
/// Tool colors are stored as raw components, so an image only restores into
/// a mixer with the same width, motor count and tool count.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixerSettings<const N: usize, const TOOLS: usize> {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    /// Raw components of every tool, system tools included
    pub tools: Vec<Vec<u16, N>, TOOLS>,
    /// Gradient configuration
    pub gradient: GradientConfig,
    /// Random remix configuration
    pub random: RandomConfig,
    /// CRC32 checksum (calculated over magic..random)
    pub crc: u32,
}

impl<const N: usize, const TOOLS: usize> MixerSettings<N, TOOLS> {
    /// Snapshot a mixer, with a valid CRC
    pub fn capture<P: Precision>(mixer: &Mixer<P, N, TOOLS>) -> Self {
        let tools: Vec<Vec<u16, N>, TOOLS> = mixer
            .table()
            .iter()
            .map(|color| {
                color
                    .weights()
                    .iter()
                    .map(|&w| w as u16)
                    .collect::<Vec<u16, N>>()
            })
            .collect();

        let mut settings = Self {
            magic: SETTINGS_MAGIC,
            version: SETTINGS_VERSION,
            tools,
            gradient: *mixer.gradient_config(),
            random: *mixer.random_config(),
            crc: 0,
        };
        settings.update_crc();
        settings
    }

    /// Check header, checksum and shape
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.magic != SETTINGS_MAGIC {
            return Err(SettingsError::BadMagic);
        }
        if self.version != SETTINGS_VERSION {
            return Err(SettingsError::VersionMismatch);
        }
        if !self.verify_crc() {
            return Err(SettingsError::CrcMismatch);
        }
        if self.tools.len() != TOOLS || self.tools.iter().any(|t| t.len() != N) {
            return Err(SettingsError::ShapeMismatch);
        }
        Ok(())
    }

    /// Restore into a mixer
    ///
    /// The mixer is left untouched if validation fails.
    pub fn apply<P: Precision>(
        &self,
        mixer: &mut Mixer<P, N, TOOLS>,
    ) -> Result<(), SettingsError> {
        if let Err(e) = self.validate() {
            warn!("settings: rejected {}", e);
            return Err(e);
        }

        for (index, stored) in self.tools.iter().enumerate() {
            let mut values = [0u16; N];
            values.copy_from_slice(stored);
            mixer.set_tool_color(index, ColorVector::from_stored(&values));
        }
        mixer.set_gradient(self.gradient);
        mixer.set_random(self.random);
        info!("settings: restored {=usize} tools", self.tools.len());
        Ok(())
    }

    /// Calculate CRC32 for the data (excluding the crc field itself)
    pub fn calculate_crc(&self) -> u32 {
        let mut crc: u32 = 0xFFFFFFFF;

        crc = crc32_update(crc, &self.magic.to_le_bytes());
        crc = crc32_update(crc, &[self.version]);

        for tool in &self.tools {
            crc = crc32_update(crc, &[tool.len() as u8]);
            for value in tool {
                crc = crc32_update(crc, &value.to_le_bytes());
            }
        }

        let g = &self.gradient;
        crc = crc32_update(crc, &g.start_z.to_bits().to_le_bytes());
        crc = crc32_update(crc, &g.end_z.to_bits().to_le_bytes());
        crc = crc32_update(crc, &[g.start_tool, g.end_tool]);
        crc = match g.vtool {
            Some(vtool) => crc32_update(crc, &[1, vtool]),
            None => crc32_update(crc, &[0, 0]),
        };

        let r = &self.random;
        crc = crc32_update(crc, &r.start_z.to_bits().to_le_bytes());
        crc = crc32_update(crc, &r.end_z.to_bits().to_le_bytes());
        crc = crc32_update(crc, &r.height.to_bits().to_le_bytes());
        crc = crc32_update(crc, &[r.extruders]);

        !crc
    }

    /// Update the CRC field
    pub fn update_crc(&mut self) {
        self.crc = self.calculate_crc();
    }

    /// Verify the CRC is correct
    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }
}

#[cfg(feature = "serde")]
impl<const N: usize, const TOOLS: usize> MixerSettings<N, TOOLS> {
    /// Encode into `buf`, returning the used prefix
    pub fn to_bytes<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], SettingsError> {
        postcard::to_slice(self, buf).map_err(|_| SettingsError::Serialize)
    }

    /// Decode and validate
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SettingsError> {
        let settings: Self =
            postcard::from_bytes(bytes).map_err(|_| SettingsError::Deserialize)?;
        settings.validate()?;
        Ok(settings)
    }
}

/// CRC32 update (IEEE 802.3 polynomial, reflected)
fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB88320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}
