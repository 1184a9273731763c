use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use sled::Config;
use tracing::debug;

use datalith_core::datom::Datom;
use datalith_core::error::{CommitError, MatchError};
use datalith_core::identity::Identity;
use datalith_core::indexing::{codec, IndexType};
use datalith_core::keyword::Keyword;
use datalith_core::storage::{DatomIter, Store, StoreTx};
use datalith_core::value::{Value, ValueType};

use crate::error::{io_err, SledStoreError};
use crate::metrics::ScanMetrics;

const TREE_DATOMS: &str = "datoms";
const TREE_META: &str = "meta";
const KEY_LAST_TX: &[u8] = b"last_tx";
const ATTR_PREFIX: &str = "attr:";

/// Per-key metadata kept in the value slot; everything else lives in the
/// key itself.
#[derive(Debug, Serialize, Deserialize)]
struct DatomMeta {
    added: bool,
}

/// A datom store over one sled tree. Each logical write fans out to five
/// physical keys, one per index namespace; a meta tree carries the
/// transaction counter and the per-attribute value types.
pub struct SledStore {
    db: sled::Db,
    datoms: sled::Tree,
    meta: sled::Tree,
    metrics: ScanMetrics,
    attrs: RwLock<HashMap<Keyword, ValueType>>,
}

impl SledStore {
    pub fn with_path(path: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&path)?;
        let db = sled::open(path.join("sled"))?;
        Self::open(db)
    }

    pub fn with_homedir_folder(folder_name: &str) -> anyhow::Result<Self> {
        let dir = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to get home directory"))?.join(folder_name);
        Self::with_path(dir)
    }

    pub fn new() -> anyhow::Result<Self> { Self::with_homedir_folder(".datalith") }

    /// An ephemeral store for tests and benchmarks.
    pub fn new_test() -> anyhow::Result<Self> {
        let db = Config::new().temporary(true).flush_every_ms(None).open()?;
        Self::open(db)
    }

    fn open(db: sled::Db) -> anyhow::Result<Self> {
        let datoms = db.open_tree(TREE_DATOMS)?;
        let meta = db.open_tree(TREE_META)?;
        Ok(Self { db, datoms, meta, metrics: ScanMetrics::new(), attrs: RwLock::new(HashMap::new()) })
    }

    /// The scan instrumentation every iterator of this store reports into.
    pub fn metrics(&self) -> ScanMetrics { self.metrics.clone() }

    fn last_tx(&self) -> Result<u64, SledStoreError> {
        Ok(self.meta.get(KEY_LAST_TX)?.map(|ivec| parse_u64(&ivec)).unwrap_or(0))
    }

    /// Record (or verify) the value type an attribute pins. First write
    /// wins; later writes with another type are rejected.
    fn check_attribute(&self, datom: &Datom) -> Result<(), CommitError> {
        let got = datom.v.value_type();
        if let Some(expected) = self.lookup_attribute(&datom.a).map_err(|e| CommitError::Storage(Box::new(e)))? {
            if expected != got {
                return Err(CommitError::TypeMismatch { attribute: datom.a.clone(), expected, got });
            }
            return Ok(());
        }
        self.meta
            .insert(attr_key(&datom.a), vec![type_code(got)])
            .map_err(|e| CommitError::Storage(Box::new(e)))?;
        self.attrs.write().unwrap().insert(datom.a.clone(), got);
        Ok(())
    }

    fn lookup_attribute(&self, attribute: &Keyword) -> Result<Option<ValueType>, SledStoreError> {
        if let Some(found) = self.attrs.read().unwrap().get(attribute) {
            return Ok(Some(*found));
        }
        let Some(ivec) = self.meta.get(attr_key(attribute))? else { return Ok(None) };
        let value_type =
            ivec.first().copied().and_then(type_from_code).ok_or(SledStoreError::MalformedMeta("attribute type"))?;
        self.attrs.write().unwrap().insert(attribute.clone(), value_type);
        Ok(Some(value_type))
    }

    fn write_datoms(&self, datoms: &[Datom]) -> Result<(), CommitError> {
        if datoms.is_empty() {
            return Ok(());
        }
        let mut last = self.last_tx().map_err(CommitError::from)?;
        for datom in datoms {
            if datom.tx < last {
                return Err(CommitError::NonMonotonicTx { got: datom.tx, last });
            }
            last = datom.tx;
            self.check_attribute(datom)?;
        }

        let mut batch = sled::Batch::default();
        for datom in datoms {
            let meta = bincode::serialize(&DatomMeta { added: datom.added }).map_err(SledStoreError::from)?;
            for index in IndexType::ALL {
                batch.insert(codec::encode_key(index, datom), meta.clone());
            }
        }
        self.datoms.apply_batch(batch).map_err(SledStoreError::from)?;
        self.meta.insert(KEY_LAST_TX, &last.to_be_bytes()).map_err(SledStoreError::from)?;
        debug!(count = datoms.len(), last_tx = last, "datoms written");
        Ok(())
    }

    fn open_iter(&self, index: IndexType, start: &[u8], end: &[u8], keys_only: bool) -> Box<dyn DatomIter> {
        Box::new(SledIter {
            tree: self.datoms.clone(),
            index,
            end: end.to_vec(),
            iter: self.datoms.range(start.to_vec()..end.to_vec()),
            keys_only,
            current: None,
            last_key: None,
            terminal: None,
            closed: false,
            metrics: self.metrics.clone(),
        })
    }
}

impl Store for SledStore {
    fn assert(&self, datoms: &[Datom]) -> Result<(), CommitError> { self.write_datoms(datoms) }

    fn retract(&self, datoms: &[Datom]) -> Result<(), CommitError> { self.write_datoms(datoms) }

    fn scan(&self, index: IndexType, start: &[u8], end: &[u8]) -> Result<Box<dyn DatomIter>, MatchError> {
        Ok(self.open_iter(index, start, end, false))
    }

    fn scan_keys_only(&self, index: IndexType, start: &[u8], end: &[u8]) -> Result<Box<dyn DatomIter>, MatchError> {
        Ok(self.open_iter(index, start, end, true))
    }

    fn get(&self, index: IndexType, key: &[u8]) -> Result<Option<Datom>, MatchError> {
        match self.datoms.get(key).map_err(io_err)? {
            None => Ok(None),
            Some(meta) => {
                let mut datom = codec::decode_datom(index, key)?;
                datom.added = decode_meta(&meta)?.added;
                Ok(Some(datom))
            }
        }
    }

    fn begin_tx(&self) -> Result<Box<dyn StoreTx + '_>, CommitError> {
        let ivec = self
            .meta
            .update_and_fetch(KEY_LAST_TX, |old| {
                let last = old.map(parse_u64).unwrap_or(0);
                Some(last.saturating_add(1).to_be_bytes().to_vec())
            })
            .map_err(SledStoreError::from)?;
        let tx = ivec.map(|ivec| parse_u64(&ivec)).unwrap_or(1);
        Ok(Box::new(SledTx { store: self, tx, pending: Vec::new() }))
    }

    fn attribute_type(&self, attribute: &Keyword) -> Result<Option<ValueType>, MatchError> {
        self.lookup_attribute(attribute).map_err(MatchError::from)
    }

    fn close(&self) -> Result<(), MatchError> {
        self.db.flush().map_err(io_err)?;
        Ok(())
    }
}

pub struct SledTx<'a> {
    store: &'a SledStore,
    tx: u64,
    pending: Vec<Datom>,
}

impl StoreTx for SledTx<'_> {
    fn tx_id(&self) -> u64 { self.tx }

    fn assert(&mut self, e: Identity, a: Keyword, v: Value) -> Result<(), CommitError> {
        self.pending.push(Datom::new(e, a, v, self.tx));
        Ok(())
    }

    fn retract(&mut self, e: Identity, a: Keyword, v: Value) -> Result<(), CommitError> {
        self.pending.push(Datom::retraction(e, a, v, self.tx));
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<u64, CommitError> {
        self.store.write_datoms(&self.pending)?;
        Ok(self.tx)
    }
}

struct Current {
    key: sled::IVec,
    meta: Option<sled::IVec>,
    decoded: Option<Datom>,
}

/// Cursor over one keyspace range. In keys-only mode both decoding and the
/// value-slot read wait for `datom()`: keys skipped undecoded (the reuse
/// strategy's moved-past test) pay for raw key comparisons only, while a
/// key that is actually decoded still reports its true polarity.
struct SledIter {
    tree: sled::Tree,
    index: IndexType,
    end: Vec<u8>,
    iter: sled::Iter,
    keys_only: bool,
    current: Option<Current>,
    last_key: Option<Vec<u8>>,
    terminal: Option<MatchError>,
    closed: bool,
    metrics: ScanMetrics,
}

impl SledIter {
    fn fail(&mut self, err: MatchError) -> MatchError {
        self.current = None;
        self.terminal = Some(err.clone());
        err
    }
}

impl DatomIter for SledIter {
    fn next(&mut self) -> bool {
        if self.closed || self.terminal.is_some() {
            self.current = None;
            return false;
        }
        match self.iter.next() {
            None => {
                self.current = None;
                false
            }
            Some(Err(e)) => {
                self.fail(io_err(e));
                false
            }
            Some(Ok((key, meta))) => {
                self.metrics.record_key();
                self.last_key = Some(key.to_vec());
                if self.keys_only {
                    self.current = Some(Current { key, meta: None, decoded: None });
                    return true;
                }
                match decode_entry(self.index, &key, Some(&meta)) {
                    Ok(datom) => {
                        self.current = Some(Current { key, meta: Some(meta), decoded: Some(datom) });
                        true
                    }
                    Err(e) => {
                        self.fail(e);
                        false
                    }
                }
            }
        }
    }

    fn datom(&mut self) -> Result<Datom, MatchError> {
        if self.closed {
            return Err(MatchError::ClosedIterator);
        }
        let Some(current) = &mut self.current else {
            return Err(self.terminal.clone().unwrap_or(MatchError::ClosedIterator));
        };
        if let Some(datom) = &current.decoded {
            return Ok(datom.clone());
        }
        // A keys-only cursor deferred the value-slot read too; pay for it
        // now that the datom is actually wanted, so polarity stays exact.
        if current.meta.is_none() {
            match self.tree.get(&current.key) {
                Ok(meta) => current.meta = meta,
                Err(e) => {
                    let err = io_err(e);
                    return Err(self.fail(err));
                }
            }
        }
        match decode_entry(self.index, &current.key, current.meta.as_ref()) {
            Ok(datom) => {
                current.decoded = Some(datom.clone());
                Ok(datom)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn key(&self) -> Option<&[u8]> {
        if self.closed {
            return None;
        }
        self.current.as_ref().map(|c| c.key.as_ref())
    }

    fn seek(&mut self, key: &[u8]) {
        if self.closed || self.terminal.is_some() {
            return;
        }
        // Seeking backwards is a no-op; cursors only move forward.
        if let Some(last) = &self.last_key {
            if key <= last.as_slice() {
                return;
            }
        }
        self.metrics.record_seek();
        self.iter = self.tree.range(key.to_vec()..self.end.clone());
        self.current = None;
    }

    fn close(&mut self) -> Result<(), MatchError> {
        self.closed = true;
        self.current = None;
        Ok(())
    }

    fn error(&self) -> Option<&MatchError> { self.terminal.as_ref() }
}

fn decode_entry(index: IndexType, key: &[u8], meta: Option<&sled::IVec>) -> Result<Datom, MatchError> {
    let mut datom = codec::decode_datom(index, key)?;
    if let Some(meta) = meta {
        datom.added = decode_meta(meta)?.added;
    }
    Ok(datom)
}

fn decode_meta(bytes: &[u8]) -> Result<DatomMeta, MatchError> {
    bincode::deserialize(bytes).map_err(|e| MatchError::Io(e.to_string()))
}

fn parse_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    for (i, b) in bytes.iter().take(8).enumerate() {
        raw[i] = *b;
    }
    u64::from_be_bytes(raw)
}

fn attr_key(attribute: &Keyword) -> Vec<u8> {
    let mut key = ATTR_PREFIX.as_bytes().to_vec();
    key.extend_from_slice(attribute.canonical().as_bytes());
    key
}

fn type_code(value_type: ValueType) -> u8 {
    match value_type {
        ValueType::Bool => 0,
        ValueType::Int => 1,
        ValueType::Float => 2,
        ValueType::Str => 3,
        ValueType::Instant => 4,
        ValueType::Ref => 5,
        ValueType::Keyword => 6,
        ValueType::Bytes => 7,
    }
}

fn type_from_code(code: u8) -> Option<ValueType> {
    match code {
        0 => Some(ValueType::Bool),
        1 => Some(ValueType::Int),
        2 => Some(ValueType::Float),
        3 => Some(ValueType::Str),
        4 => Some(ValueType::Instant),
        5 => Some(ValueType::Ref),
        6 => Some(ValueType::Keyword),
        7 => Some(ValueType::Bytes),
        _ => None,
    }
}
