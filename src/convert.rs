use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::codec::{self, Codec};
use crate::error::{ConvertError, ConvertResult, DecodeError};

const BACKUP_SUFFIX: &str = ".old";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Overwrite the file directly, keeping no backup.
    pub in_place: bool,
    /// Replace an existing backup. Ignored when `in_place` is set.
    pub backup_anyway: bool,
}

/// Backup location for `path`: the full path with `.old` appended.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Re-encodes files from one codec to another.
pub struct Converter<'a> {
    source: &'a dyn Codec,
    target: &'a dyn Codec,
}

impl<'a> Converter<'a> {
    pub fn new(source: &'a dyn Codec, target: &'a dyn Codec) -> Self {
        Self { source, target }
    }

    /// Decode `bytes` under the source codec and encode them under the target.
    pub fn transcode(&self, bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let text = self.source.decode(bytes)?;
        Ok(self.target.encode(&text))
    }

    /// Convert one file.
    ///
    /// Steps run in order and the first failure stops the rest:
    /// read, transcode, move the original to the backup path (unless
    /// `in_place`), write the new content. Nothing on disk changes before
    /// the transcode succeeds and the backup check passes. The rename is
    /// not atomic with the final write.
    pub fn convert(&self, path: &Path, options: ConvertOptions) -> ConvertResult<()> {
        let original = read_source(path)?;
        debug!("{}: read {} bytes", path.display(), original.len());

        let converted = self.transcode(&original)?;

        if !options.in_place {
            let backup = backup_path(path);
            if backup.exists() && !options.backup_anyway {
                return Err(ConvertError::BackupExists(backup));
            }
            // rename replaces an existing backup on every supported platform.
            fs::rename(path, &backup)?;
            debug!("{}: moved original to {}", path.display(), backup.display());
        }

        fs::write(path, &converted)?;
        info!(
            "{}: wrote {} bytes as {}",
            path.display(),
            converted.len(),
            self.target.name()
        );
        Ok(())
    }

    /// Convert every path in order, reporting each outcome.
    ///
    /// A failure never stops the batch. Returns the number of failed files.
    pub fn convert_all<P, F>(&self, paths: &[P], options: ConvertOptions, mut report: F) -> usize
    where
        P: AsRef<Path>,
        F: FnMut(&Path, &ConvertResult<()>),
    {
        let mut failed = 0;
        for path in paths {
            let path = path.as_ref();
            let outcome = self.convert(path, options);
            if let Err(ref e) = outcome {
                debug!("{}: {e}", path.display());
                failed += 1;
            }
            report(path, &outcome);
        }
        failed
    }
}

impl Converter<'static> {
    pub fn gbk_to_utf8() -> Self {
        Self::new(&codec::GBK, &codec::UTF_8)
    }
}

impl Default for Converter<'static> {
    fn default() -> Self {
        Self::gbk_to_utf8()
    }
}

/// Convert `path` from GBK to UTF-8.
pub fn convert(path: impl AsRef<Path>, in_place: bool, backup_anyway: bool) -> ConvertResult<()> {
    let options = ConvertOptions {
        in_place,
        backup_anyway,
    };
    Converter::gbk_to_utf8().convert(path.as_ref(), options)
}

/// Convert every path from GBK to UTF-8. See [`Converter::convert_all`].
pub fn convert_all<P, F>(paths: &[P], options: ConvertOptions, report: F) -> usize
where
    P: AsRef<Path>,
    F: FnMut(&Path, &ConvertResult<()>),
{
    Converter::gbk_to_utf8().convert_all(paths, options, report)
}

fn read_source(path: &Path) -> ConvertResult<Vec<u8>> {
    let mut file = File::open(path)?;
    // Opening a directory succeeds on some platforms.
    if file.metadata()?.is_dir() {
        return Err(ConvertError::IsADirectory(io::Error::new(
            io::ErrorKind::IsADirectory,
            format!("{} is a directory", path.display()),
        )));
    }
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}
