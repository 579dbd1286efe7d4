use crate::error::{ArchiveError, Result};
use crate::reader::ByteReader;
use crate::text::{TextEncoding, decode};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }

    /// Human-readable method name, used by unsupported-compression errors.
    pub fn name(&self) -> String {
        let code = self.as_u16();
        match code {
            0 => "STORED".into(),
            1 => "SHRUNK".into(),
            2..=5 => format!("REDUCED_{}", code - 1),
            6 => "IMPLODE".into(),
            8 => "DEFLATE".into(),
            9 => "DEFLATE64".into(),
            10 => "TERSE_OLD".into(),
            12 => "BZIP2".into(),
            14 => "LZMA".into(),
            18 => "TERSE_NEW".into(),
            19 => "LZ77".into(),
            97 => "WAVPACK".into(),
            98 => "PPMD".into(),
            _ => format!("unknown ({code})"),
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes plus comment.
///
/// The archive's top-level index pointer, located by a backward scan from
/// the end of the buffer.
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    /// Disk holding the start of the central directory.
    pub cd_disk_number: u16,
    /// Entries in the central directory on this disk.
    pub disk_entry_count: u16,
    /// Total entries in the central directory.
    pub total_entry_count: u16,
    /// Central directory size in bytes.
    pub cd_size: u32,
    /// Central directory offset from the start of the archive.
    pub cd_offset: u32,
    /// Archive comment. The format leaves the encoding unspecified; UTF-8
    /// is assumed.
    pub comment: String,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x06054b50;
    pub const SIZE: usize = 22;

    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let mut r = ByteReader::at(data, offset)?;
        let signature = r.read_u32()?;
        if signature != Self::SIGNATURE {
            return Err(ArchiveError::Format(format!(
                "end of central directory record has invalid signature: {signature:#010x}"
            )));
        }
        let disk_number = r.read_u16()?;
        let cd_disk_number = r.read_u16()?;
        let disk_entry_count = r.read_u16()?;
        let total_entry_count = r.read_u16()?;
        let cd_size = r.read_u32()?;
        let cd_offset = r.read_u32()?;
        let comment_len = r.read_u16()? as usize;
        // A comment claiming to extend past the buffer is clamped, not fatal.
        let available = data.len() - r.position();
        let comment_bytes = r.bytes(comment_len.min(available))?;
        Ok(Self {
            disk_number,
            cd_disk_number,
            disk_entry_count,
            total_entry_count,
            cd_size,
            cd_offset,
            comment: decode(comment_bytes, TextEncoding::Utf8),
        })
    }
}

/// Central directory file record - 46 bytes plus name, extra, comment.
///
/// One per archived file, holding the authoritative metadata. `name` always
/// uses forward slashes; backslash names from Windows encoders are
/// normalized during parsing.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Low byte of "version made by": encoder's ZIP specification version.
    pub zip_version: u8,
    /// High byte of "version made by": host system, which determines the
    /// external attribute layout.
    pub attribute_compat: u8,
    pub version_needed: u16,
    /// General-purpose flag bits. Bit 0 = encrypted, bit 11 = UTF-8 names.
    pub flags: u16,
    pub method: CompressionMethod,
    /// MS-DOS format modification time.
    pub time: u16,
    /// MS-DOS format modification date.
    pub date: u16,
    /// Recorded but not verified against decoded data.
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub disk_number_start: u16,
    pub internal_attributes: u16,
    /// Host-dependent. For MS-DOS compatible hosts the low byte carries the
    /// DOS attribute byte, whose bit 4 marks directories.
    pub external_attributes: u32,
    /// Offset of this file's local header from the start of the archive.
    pub header_relative_offset: u32,
    /// Decoded file name with forward slashes.
    pub name: String,
    /// Per-file comment.
    pub comment: String,
    name_len: u16,
    extra_len: u16,
    comment_len: u16,
}

impl FileEntry {
    pub const SIGNATURE: u32 = 0x02014b50;
    pub const FIXED_SIZE: usize = 46;

    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let mut r = ByteReader::at(data, offset)?;
        let signature = r.read_u32()?;
        if signature != Self::SIGNATURE {
            return Err(ArchiveError::Format(format!(
                "central directory record has invalid signature: {signature:#010x}"
            )));
        }
        let zip_version = r.read_u8()?;
        let attribute_compat = r.read_u8()?;
        let version_needed = r.read_u16()?;
        let flags = r.read_u16()?;
        let method = CompressionMethod::from_u16(r.read_u16()?);
        let time = r.read_u16()?;
        let date = r.read_u16()?;
        let crc32 = r.read_u32()?;
        let compressed_size = r.read_u32()?;
        let uncompressed_size = r.read_u32()?;
        let name_len = r.read_u16()?;
        let extra_len = r.read_u16()?;
        let comment_len = r.read_u16()?;
        let disk_number_start = r.read_u16()?;
        let internal_attributes = r.read_u16()?;
        let external_attributes = r.read_u32()?;
        let header_relative_offset = r.read_u32()?;

        let encoding = if flags & (1 << 11) != 0 {
            TextEncoding::Utf8
        } else {
            TextEncoding::ExtendedAscii
        };
        let name_bytes = r.bytes(name_len as usize)?;
        r.skip(extra_len as usize)?;
        let comment_bytes = r.bytes(comment_len as usize)?;

        Ok(Self {
            zip_version,
            attribute_compat,
            version_needed,
            flags,
            method,
            time,
            date,
            crc32,
            compressed_size,
            uncompressed_size,
            disk_number_start,
            internal_attributes,
            external_attributes,
            header_relative_offset,
            name: decode(name_bytes, encoding).replace('\\', "/"),
            comment: decode(comment_bytes, encoding),
            name_len,
            extra_len,
            comment_len,
        })
    }

    /// Serialized size: fixed header plus the three variable-length fields.
    pub fn total_size(&self) -> usize {
        Self::FIXED_SIZE
            + self.name_len as usize
            + self.extra_len as usize
            + self.comment_len as usize
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & 1 != 0
    }

    /// DOS attribute convention, with a name-based fallback: directory
    /// records commonly end in '/' even when the attribute byte is absent.
    pub fn is_directory(&self) -> bool {
        self.external_attributes & 16 != 0 || self.name.ends_with('/')
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory()
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.date & 0x1F) as u8;
        let month = ((self.date >> 5) & 0x0F) as u8;
        let year = ((self.date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.time & 0x1F) * 2) as u8;
        let minute = ((self.time >> 5) & 0x3F) as u8;
        let hour = ((self.time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }

    /// Modification time as seconds since the Unix epoch. A nonsense DOS
    /// timestamp yields 0 rather than an error.
    pub fn modified_unix(&self) -> i64 {
        let (year, month, day) = self.mod_date();
        let (hour, minute, second) = self.mod_time();
        let Ok(month) = time::Month::try_from(month) else {
            return 0;
        };
        let Ok(date) = time::Date::from_calendar_date(year as i32, month, day) else {
            return 0;
        };
        let Ok(dt) = date.with_hms(hour, minute, second) else {
            return 0;
        };
        dt.assume_utc().unix_timestamp()
    }
}

/// Local file header - 30 bytes plus name and extra field.
///
/// Stored immediately before each file's compressed bytes. Consulted only to
/// find where the data starts; the central directory's sizes and compression
/// method are authoritative, not this header's.
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub method: CompressionMethod,
    pub time: u16,
    pub date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    name_len: u16,
    extra_len: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x04034b50;
    pub const SIZE: usize = 30;

    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let mut r = ByteReader::at(data, offset)?;
        let signature = r.read_u32()?;
        if signature != Self::SIGNATURE {
            return Err(ArchiveError::Format(format!(
                "local file header has invalid signature: {signature:#010x}"
            )));
        }
        Ok(Self {
            version_needed: r.read_u16()?,
            flags: r.read_u16()?,
            method: CompressionMethod::from_u16(r.read_u16()?),
            time: r.read_u16()?,
            date: r.read_u16()?,
            crc32: r.read_u32()?,
            compressed_size: r.read_u32()?,
            uncompressed_size: r.read_u32()?,
            name_len: r.read_u16()?,
            extra_len: r.read_u16()?,
        })
    }

    /// Header size including the variable-length name and extra field; the
    /// file's data starts this many bytes after the header offset.
    pub fn total_size(&self) -> usize {
        Self::SIZE + self.name_len as usize + self.extra_len as usize
    }
}
