// cache.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! Frame cache storage
use crate::error::{Error, Result};
use crate::image::ImageMap;
use crate::private::Decoder;
use crate::record::FrameRecord;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Storage for decoded frame records and the image map.
///
/// Frames are numbered from 1.  The image map is written after every frame,
/// so its presence means the cache is complete.
pub trait Store {
    /// Write one frame record
    fn write_record(
        &mut self,
        number: usize,
        record: &FrameRecord,
    ) -> Result<()>;

    /// Read one frame record, or `None` if it does not exist
    fn read_record(&self, number: usize) -> Result<Option<FrameRecord>>;

    /// Write the image map
    fn write_table(&mut self, map: &ImageMap) -> Result<()>;

    /// Read the image map (`MissingCache` if it does not exist)
    fn read_table(&self) -> Result<ImageMap>;

    /// Check if the image map exists
    fn has_table(&self) -> bool;

    /// Remove all records and the image map
    fn discard(&mut self) -> Result<()>;
}

/// Cache stored as files in a directory.
///
/// Records are `<dir>/<name>_<n>.bin`; the image map is `<dir>/<name>.map`.
#[derive(Clone, Debug)]
pub struct DirStore {
    /// Cache directory
    dir: PathBuf,
    /// Base name of cache files
    name: String,
}

impl DirStore {
    /// Create a directory store
    pub fn new<P: Into<PathBuf>>(dir: P, name: &str) -> Self {
        DirStore {
            dir: dir.into(),
            name: name.to_string(),
        }
    }

    /// Create a store for a GIF file, in `cache_<stem>` next to it
    pub fn for_gif(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                let msg = format!("no file name: {}", path.display());
                Error::StorageFailure(io::Error::new(
                    ErrorKind::InvalidInput,
                    msg,
                ))
            })?;
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(Self::new(parent.join(format!("cache_{name}")), name))
    }

    /// Use a different cache directory
    pub fn with_dir<P: Into<PathBuf>>(self, dir: P) -> Self {
        DirStore {
            dir: dir.into(),
            ..self
        }
    }

    /// Get the cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, number: usize) -> PathBuf {
        self.dir.join(format!("{}_{}.bin", self.name, number))
    }

    fn table_path(&self) -> PathBuf {
        self.dir.join(format!("{}.map", self.name))
    }

    /// Check if a file name is `<name>_<n>.bin`
    fn is_record(&self, file_name: &OsStr) -> bool {
        file_name
            .to_str()
            .and_then(|n| n.strip_prefix(self.name.as_str()))
            .and_then(|n| n.strip_prefix('_'))
            .and_then(|n| n.strip_suffix(".bin"))
            .map_or(false, |n| n.parse::<usize>().is_ok())
    }

    /// Create a file, and the directory if needed
    fn create(&self, path: &Path) -> Result<BufWriter<File>> {
        fs::create_dir_all(&self.dir).map_err(Error::StorageFailure)?;
        let file = File::create(path).map_err(Error::StorageFailure)?;
        Ok(BufWriter::new(file))
    }

    /// Open a file, or `None` if it does not exist
    fn open(path: &Path) -> Result<Option<BufReader<File>>> {
        match File::open(path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::StorageFailure(e)),
        }
    }

    /// Remove a file if it exists; returns `false` if not found
    fn remove(path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::StorageFailure(e)),
        }
    }
}

impl Store for DirStore {
    fn write_record(
        &mut self,
        number: usize,
        record: &FrameRecord,
    ) -> Result<()> {
        let mut w = self.create(&self.record_path(number))?;
        record.write_to(&mut w)?;
        w.flush().map_err(Error::StorageFailure)
    }

    fn read_record(&self, number: usize) -> Result<Option<FrameRecord>> {
        match Self::open(&self.record_path(number))? {
            Some(r) => Ok(Some(FrameRecord::read_from(r)?)),
            None => Ok(None),
        }
    }

    fn write_table(&mut self, map: &ImageMap) -> Result<()> {
        let mut w = self.create(&self.table_path())?;
        map.write_to(&mut w)?;
        w.flush().map_err(Error::StorageFailure)
    }

    fn read_table(&self) -> Result<ImageMap> {
        let path = self.table_path();
        match Self::open(&path)? {
            Some(r) => ImageMap::read_from(r),
            None => Err(Error::MissingCache(path)),
        }
    }

    fn has_table(&self) -> bool {
        self.table_path().is_file()
    }

    fn discard(&mut self) -> Result<()> {
        Self::remove(&self.table_path())?;
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::StorageFailure(e)),
        };
        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(Error::StorageFailure)?;
            let path = entry.path();
            if self.is_record(&entry.file_name()) && Self::remove(&path)? {
                count += 1;
            }
        }
        debug!("discarded {} records in {:?}", count, self.dir);
        Ok(())
    }
}

/// Cache stored in memory
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    /// Encoded records
    records: HashMap<usize, Vec<u8>>,
    /// Encoded image map
    table: Option<Vec<u8>>,
}

impl MemStore {
    /// Create an empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no records are stored
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Store for MemStore {
    fn write_record(
        &mut self,
        number: usize,
        record: &FrameRecord,
    ) -> Result<()> {
        let mut buf = Vec::new();
        record.write_to(&mut buf)?;
        self.records.insert(number, buf);
        Ok(())
    }

    fn read_record(&self, number: usize) -> Result<Option<FrameRecord>> {
        match self.records.get(&number) {
            Some(buf) => Ok(Some(FrameRecord::read_from(&buf[..])?)),
            None => Ok(None),
        }
    }

    fn write_table(&mut self, map: &ImageMap) -> Result<()> {
        let mut buf = Vec::new();
        map.write_to(&mut buf)?;
        self.table = Some(buf);
        Ok(())
    }

    fn read_table(&self) -> Result<ImageMap> {
        match &self.table {
            Some(buf) => ImageMap::read_from(&buf[..]),
            None => Err(Error::MissingCache(PathBuf::from("memory.map"))),
        }
    }

    fn has_table(&self) -> bool {
        self.table.is_some()
    }

    fn discard(&mut self) -> Result<()> {
        self.records.clear();
        self.table = None;
        Ok(())
    }
}

/// Decode a GIF into a store.
///
/// Anything already in the store is discarded first.  Every frame record is
/// written as it is decoded, then the image map.  On error, anything already
/// written is discarded.  Returns the number of frames.
pub fn build_cache<R, S>(decoder: Decoder<R>, store: &mut S) -> Result<usize>
where
    R: Read,
    S: Store,
{
    store.discard()?;
    match write_frames(decoder, store) {
        Ok(count) => Ok(count),
        Err(e) => {
            warn!("decode failed: {}", e);
            if let Err(de) = store.discard() {
                warn!("discard failed: {}", de);
            }
            Err(e)
        }
    }
}

/// Write all frames, then the image map
fn write_frames<R, S>(decoder: Decoder<R>, store: &mut S) -> Result<usize>
where
    R: Read,
    S: Store,
{
    let mut frames = decoder.into_frames();
    let mut count = 0;
    for frame in frames.by_ref() {
        let (number, record) = frame?;
        store.write_record(number, &record)?;
        info!(
            "frame {} cached: {}x{} at {},{}, {} indices",
            number,
            record.width,
            record.height,
            record.left,
            record.top,
            record.image_data.len()
        );
        count = number;
    }
    let map = frames.into_image_map();
    store.write_table(&map)?;
    info!("image map cached: {} blocks", map.len());
    Ok(count)
}

/// Read the image map from a store, building the cache from a GIF file
/// first if the map is missing
pub fn open_or_build<S>(path: &Path, store: &mut S) -> Result<ImageMap>
where
    S: Store,
{
    match store.read_table() {
        Err(Error::MissingCache(p)) => {
            info!("{} not found, decoding {}", p.display(), path.display());
            let file = File::open(path)?;
            build_cache(Decoder::new(file), store)?;
            store.read_table()
        }
        res => res,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PATTERN: &[u8] = include_bytes!("../res/pattern.gif");

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("monogif-{}-{}", name, std::process::id()))
    }

    #[test]
    fn mem_store() -> Result<()> {
        let mut store = MemStore::new();
        assert!(!store.has_table());
        assert!(matches!(store.read_table(), Err(Error::MissingCache(_))));
        let count = build_cache(Decoder::new(PATTERN), &mut store)?;
        assert_eq!(count, 4);
        assert_eq!(store.len(), 4);
        assert!(store.has_table());
        assert_eq!(store.read_table()?.len(), 244);
        let rec = store.read_record(4)?.ok_or(Error::MalformedCache)?;
        assert_eq!((rec.width, rec.height), (16, 8));
        assert!(store.read_record(5)?.is_none());
        assert!(store.read_record(0)?.is_none());
        Ok(())
    }

    #[test]
    fn corrupt_discards() {
        let mut store = MemStore::new();
        // cut inside the last frame
        let gif = &PATTERN[..PATTERN.len() - 12];
        let res = build_cache(Decoder::new(gif), &mut store);
        assert!(matches!(res, Err(ref e) if e.is_corrupt_stream()));
        assert!(store.is_empty());
        assert!(!store.has_table());
    }

    #[test]
    fn dir_store() -> Result<()> {
        let dir = temp_dir("dir_store");
        let mut store = DirStore::new(&dir, "pattern");
        assert!(matches!(
            store.read_table(),
            Err(Error::MissingCache(p)) if p == dir.join("pattern.map")
        ));
        build_cache(Decoder::new(PATTERN), &mut store)?;
        assert!(dir.join("pattern_1.bin").is_file());
        assert!(dir.join("pattern_4.bin").is_file());
        assert!(!dir.join("pattern_5.bin").exists());
        assert!(store.has_table());
        let map = store.read_table()?;
        let rec = store.read_record(2)?.ok_or(Error::MalformedCache)?;
        assert_eq!(rec.expand(&map)?.len(), 64 * 32);
        store.discard()?;
        assert!(!store.has_table());
        assert!(store.read_record(1)?.is_none());
        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }

    #[test]
    fn rebuild_removes_stale() -> Result<()> {
        let dir = temp_dir("rebuild");
        let _ = fs::remove_dir_all(&dir);
        let mut store = DirStore::new(&dir, "pattern");
        let stale = FrameRecord {
            width: 1,
            height: 1,
            image_data: vec![300],
            ..FrameRecord::default()
        };
        for number in [5, 6, 12] {
            store.write_record(number, &stale)?;
        }
        let other = dir.join("pattern_notes.bin");
        fs::write(&other, b"keep").map_err(Error::StorageFailure)?;
        assert_eq!(build_cache(Decoder::new(PATTERN), &mut store)?, 4);
        assert!(store.read_record(4)?.is_some());
        assert!(store.read_record(5)?.is_none());
        assert!(store.read_record(6)?.is_none());
        assert!(store.read_record(12)?.is_none());
        assert!(other.is_file());
        // records with gaps are all discarded
        store.write_record(9, &stale)?;
        store.discard()?;
        for number in [1, 4, 9] {
            assert!(store.read_record(number)?.is_none());
        }
        assert!(other.is_file());
        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }

    #[test]
    fn for_gif() -> Result<()> {
        let store = DirStore::for_gif(Path::new("gifs/dance.gif"))?;
        assert_eq!(store.dir(), Path::new("gifs/cache_dance"));
        assert_eq!(
            store.record_path(3),
            Path::new("gifs/cache_dance/dance_3.bin")
        );
        assert_eq!(store.table_path(), Path::new("gifs/cache_dance/dance.map"));
        let store = store.with_dir("/tmp/c");
        assert_eq!(store.table_path(), Path::new("/tmp/c/dance.map"));
        assert!(DirStore::for_gif(Path::new("")).is_err());
        Ok(())
    }

    #[test]
    fn open_or_build_once() -> Result<()> {
        let dir = temp_dir("open_or_build");
        fs::create_dir_all(&dir).map_err(Error::StorageFailure)?;
        let gif = dir.join("pattern.gif");
        fs::write(&gif, PATTERN).map_err(Error::StorageFailure)?;
        let mut store = DirStore::for_gif(&gif)?;
        assert_eq!(open_or_build(&gif, &mut store)?.len(), 244);
        // built cache is used even once the GIF is gone
        fs::remove_file(&gif).map_err(Error::StorageFailure)?;
        assert_eq!(open_or_build(&gif, &mut store)?.len(), 244);
        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }
}
