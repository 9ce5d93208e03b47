//! Decoding of `WAVEFORMATEX` / `WAVEFORMATEXTENSIBLE` buffers.
//!
//! The layout is the packed, little-endian platform ABI:
//!
//! ```text
//! offset  size  field
//!      0     2  wFormatTag
//!      2     2  nChannels
//!      4     4  nSamplesPerSec
//!      8     4  nAvgBytesPerSec
//!     12     2  nBlockAlign
//!     14     2  wBitsPerSample
//!     16     2  cbSize
//!     18     2  wValidBitsPerSample   (extensible only)
//!     20     4  dwChannelMask         (extensible only)
//!     24    16  SubFormat             (extensible only)
//! ```

use std::fmt;

use crate::{Error, Result};

/// Size of the base `WAVEFORMATEX` header.
pub const BASE_SIZE: usize = 18;
/// Size of the extension that follows the base header of a `WAVEFORMATEXTENSIBLE`.
pub const EXTENSION_SIZE: usize = 22;

pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    Pcm,
    IeeeFloat,
    Extensible,
    Other(u16),
}

impl From<u16> for FormatTag {
    fn from(tag: u16) -> Self {
        match tag {
            WAVE_FORMAT_PCM => FormatTag::Pcm,
            WAVE_FORMAT_IEEE_FLOAT => FormatTag::IeeeFloat,
            WAVE_FORMAT_EXTENSIBLE => FormatTag::Extensible,
            other => FormatTag::Other(other),
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatTag::Pcm => f.write_str("PCM"),
            FormatTag::IeeeFloat => f.write_str("IEEE_FLOAT"),
            FormatTag::Extensible => f.write_str("EXTENSIBLE"),
            FormatTag::Other(tag) => write!(f, "{:#x}", tag),
        }
    }
}

/// The trailing part of a `WAVEFORMATEXTENSIBLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatExtension {
    pub valid_bits_per_sample: u16,
    pub channel_mask: u32,
    /// Sub-format GUID in its on-wire byte order.
    pub sub_format: [u8; 16],
}

impl FormatExtension {
    fn decode(buf: &[u8]) -> Self {
        let mut sub_format = [0u8; 16];
        sub_format.copy_from_slice(&buf[6..22]);

        Self {
            valid_bits_per_sample: read_u16(buf, 0),
            channel_mask: read_u32(buf, 2),
            sub_format,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.valid_bits_per_sample.to_le_bytes());
        out.extend_from_slice(&self.channel_mask.to_le_bytes());
        out.extend_from_slice(&self.sub_format);
    }
}

/// A snapshot of a device mix format.
///
/// Two snapshots are equal when the header fields and the reported bit depth
/// match. The raw container width and the extension are carried along but
/// do not take part in the comparison.
#[derive(Debug, Clone)]
pub struct AudioFormatDescriptor {
    pub format_tag: u16,
    pub channel_count: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    /// Bit depth as reported to the user: the extension's valid bits when the
    /// format is extensible and that field is nonzero, otherwise the container width.
    pub bits_per_sample: u16,
    /// `wBitsPerSample` exactly as it appears in the base header.
    pub container_bits_per_sample: u16,
    pub extra_size: u16,
    pub extension: Option<FormatExtension>,
}

impl AudioFormatDescriptor {
    /// Decodes a descriptor from a raw `WAVEFORMATEX` pointer.
    ///
    /// # Safety
    /// `ptr` must be null or point to at least 18 readable bytes. If the header
    /// declares an extensible format with `cbSize >= 22`, 40 bytes must be readable.
    /// The header is trusted; the allocation length is not known here.
    pub unsafe fn from_ptr(ptr: *const u8) -> Result<Self> {
        if ptr.is_null() {
            return Err(Error::NullBuffer);
        }

        let header = std::slice::from_raw_parts(ptr, BASE_SIZE);
        let len = declared_len(header);

        Self::from_bytes(std::slice::from_raw_parts(ptr, len))
    }

    /// Decodes a descriptor from a byte slice. Fails instead of reading past
    /// the end of `buf` when the header declares more than is available.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < BASE_SIZE {
            return Err(Error::Truncated {
                needed: BASE_SIZE,
                available: buf.len(),
            });
        }

        let format_tag = read_u16(buf, 0);
        let container_bits_per_sample = read_u16(buf, 14);
        let extra_size = read_u16(buf, 16);

        let extension = if has_extension(format_tag, extra_size) {
            let needed = BASE_SIZE + EXTENSION_SIZE;
            if buf.len() < needed {
                return Err(Error::Truncated {
                    needed,
                    available: buf.len(),
                });
            }
            Some(FormatExtension::decode(&buf[BASE_SIZE..needed]))
        } else {
            None
        };

        let bits_per_sample = match extension {
            Some(ext) if ext.valid_bits_per_sample != 0 => ext.valid_bits_per_sample,
            _ => container_bits_per_sample,
        };

        Ok(Self {
            format_tag,
            channel_count: read_u16(buf, 2),
            sample_rate: read_u32(buf, 4),
            avg_bytes_per_sec: read_u32(buf, 8),
            block_align: read_u16(buf, 12),
            bits_per_sample,
            container_bits_per_sample,
            extra_size,
            extension,
        })
    }

    /// Encodes the descriptor back into its wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BASE_SIZE + EXTENSION_SIZE);
        out.extend_from_slice(&self.format_tag.to_le_bytes());
        out.extend_from_slice(&self.channel_count.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&self.avg_bytes_per_sec.to_le_bytes());
        out.extend_from_slice(&self.block_align.to_le_bytes());
        out.extend_from_slice(&self.container_bits_per_sample.to_le_bytes());
        out.extend_from_slice(&self.extra_size.to_le_bytes());

        if let Some(ext) = &self.extension {
            ext.encode(&mut out);
        }

        out
    }

    pub fn tag(&self) -> FormatTag {
        FormatTag::from(self.format_tag)
    }
}

impl PartialEq for AudioFormatDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.format_tag == other.format_tag
            && self.channel_count == other.channel_count
            && self.sample_rate == other.sample_rate
            && self.avg_bytes_per_sec == other.avg_bytes_per_sec
            && self.block_align == other.block_align
            && self.bits_per_sample == other.bits_per_sample
            && self.extra_size == other.extra_size
    }
}

impl Eq for AudioFormatDescriptor {}

impl fmt::Display for AudioFormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sample Rate: {} Hz | Bit Depth: {} | Channels: {} | Format: {}",
            self.sample_rate,
            self.bits_per_sample,
            self.channel_count,
            self.tag()
        )
    }
}

fn has_extension(format_tag: u16, extra_size: u16) -> bool {
    format_tag == WAVE_FORMAT_EXTENSIBLE && extra_size as usize >= EXTENSION_SIZE
}

/// Number of bytes the header says are part of the descriptor we decode.
fn declared_len(header: &[u8]) -> usize {
    if has_extension(read_u16(header, 0), read_u16(header, 16)) {
        BASE_SIZE + EXTENSION_SIZE
    } else {
        BASE_SIZE
    }
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

#[cfg(test)]
mod test {
    use super::*;

    // KSDATAFORMAT_SUBTYPE_IEEE_FLOAT
    const SUBTYPE_FLOAT: [u8; 16] = [
        0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B,
        0x71,
    ];

    fn header(tag: u16, channels: u16, rate: u32, bits: u16, extra: u16) -> Vec<u8> {
        let block_align = channels * (bits / 8);
        let mut buf = vec![];
        buf.extend_from_slice(&tag.to_le_bytes());
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&rate.to_le_bytes());
        buf.extend_from_slice(&(rate * block_align as u32).to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits.to_le_bytes());
        buf.extend_from_slice(&extra.to_le_bytes());
        buf
    }

    fn extensible(container_bits: u16, valid_bits: u16, extra: u16) -> Vec<u8> {
        let mut buf = header(WAVE_FORMAT_EXTENSIBLE, 2, 48000, container_bits, extra);
        buf.extend_from_slice(&valid_bits.to_le_bytes());
        buf.extend_from_slice(&0x3u32.to_le_bytes());
        buf.extend_from_slice(&SUBTYPE_FLOAT);
        buf
    }

    fn parse_ptr(buf: &[u8]) -> AudioFormatDescriptor {
        unsafe { AudioFormatDescriptor::from_ptr(buf.as_ptr()) }.unwrap()
    }

    #[test]
    fn test_plain_formats_report_header_bits() {
        for tag in [WAVE_FORMAT_PCM, WAVE_FORMAT_IEEE_FLOAT] {
            for extra in [0u16, 10, 22, 64] {
                let mut buf = header(tag, 2, 44100, 16, extra);
                buf.extend_from_slice(&[0xAB; 64]);

                let fmt = parse_ptr(&buf);
                assert_eq!(fmt.bits_per_sample, 16);
                assert_eq!(fmt.container_bits_per_sample, 16);
                assert_eq!(fmt.extra_size, extra);
                assert_eq!(fmt.extension, None);
            }
        }
    }

    #[test]
    fn test_extensible_zero_valid_bits_keeps_container() {
        let fmt = parse_ptr(&extensible(32, 0, 22));
        assert_eq!(fmt.bits_per_sample, 32);
        assert_eq!(fmt.extension.unwrap().valid_bits_per_sample, 0);
    }

    #[test]
    fn test_extensible_valid_bits_override() {
        let fmt = parse_ptr(&extensible(32, 20, 22));
        assert_eq!(fmt.bits_per_sample, 20);
        assert_eq!(fmt.container_bits_per_sample, 32);

        let ext = fmt.extension.unwrap();
        assert_eq!(ext.channel_mask, 0x3);
        assert_eq!(ext.sub_format, SUBTYPE_FLOAT);
    }

    #[test]
    fn test_extensible_short_extra_size_skips_extension() {
        // Exactly the base header: reading the extension here would go out of bounds.
        let buf = header(WAVE_FORMAT_EXTENSIBLE, 2, 48000, 32, 10);
        assert_eq!(buf.len(), BASE_SIZE);

        let fmt = parse_ptr(&buf);
        assert_eq!(fmt.bits_per_sample, 32);
        assert_eq!(fmt.extension, None);
    }

    #[test]
    fn test_other_tag_ignores_extension() {
        let mut buf = header(0x55, 2, 48000, 16, 22);
        buf.extend_from_slice(&20u16.to_le_bytes());
        buf.extend_from_slice(&[0; 20]);

        let fmt = parse_ptr(&buf);
        assert_eq!(fmt.bits_per_sample, 16);
        assert_eq!(fmt.extension, None);
    }

    #[test]
    fn test_null_pointer() {
        let res = unsafe { AudioFormatDescriptor::from_ptr(std::ptr::null()) };
        assert!(matches!(res, Err(Error::NullBuffer)));
    }

    #[test]
    fn test_truncated_slice() {
        let buf = header(WAVE_FORMAT_PCM, 2, 48000, 16, 0);
        assert!(matches!(
            AudioFormatDescriptor::from_bytes(&buf[..10]),
            Err(Error::Truncated {
                needed: 18,
                available: 10
            })
        ));

        let buf = header(WAVE_FORMAT_EXTENSIBLE, 2, 48000, 32, 22);
        assert!(matches!(
            AudioFormatDescriptor::from_bytes(&buf),
            Err(Error::Truncated {
                needed: 40,
                available: 18
            })
        ));
    }

    #[test]
    fn test_tag_labels() {
        assert_eq!(FormatTag::from(1).to_string(), "PCM");
        assert_eq!(FormatTag::from(3).to_string(), "IEEE_FLOAT");
        assert_eq!(FormatTag::from(0xFFFE).to_string(), "EXTENSIBLE");
        assert_eq!(FormatTag::from(0x55).to_string(), "0x55");
    }

    #[test]
    fn test_base_round_trip() {
        let original = AudioFormatDescriptor {
            format_tag: WAVE_FORMAT_PCM,
            channel_count: 6,
            sample_rate: 96000,
            avg_bytes_per_sec: 96000 * 12,
            block_align: 12,
            bits_per_sample: 16,
            container_bits_per_sample: 16,
            extra_size: 0,
            extension: None,
        };

        let bytes = original.to_bytes();
        assert_eq!(bytes.len(), BASE_SIZE);
        assert_eq!(AudioFormatDescriptor::from_bytes(&bytes).unwrap(), original);
    }

    #[test]
    fn test_extensible_encode_matches_input() {
        let buf = extensible(32, 24, 22);
        let fmt = AudioFormatDescriptor::from_bytes(&buf).unwrap();
        assert_eq!(fmt.to_bytes(), buf);
    }

    #[test]
    fn test_equality_ignores_extension_and_container() {
        let a = AudioFormatDescriptor::from_bytes(&extensible(32, 24, 22)).unwrap();

        let mut b = a.clone();
        b.container_bits_per_sample = 24;
        if let Some(ext) = b.extension.as_mut() {
            ext.channel_mask = 0x33;
            ext.sub_format = [0; 16];
        }
        assert_eq!(a, b);

        let mut c = a.clone();
        c.bits_per_sample = 32;
        assert_ne!(a, c);
    }

    #[test]
    fn test_display() {
        let fmt = parse_ptr(&extensible(32, 24, 22));
        assert_eq!(
            fmt.to_string(),
            "Sample Rate: 48000 Hz | Bit Depth: 24 | Channels: 2 | Format: EXTENSIBLE"
        );
    }
}
