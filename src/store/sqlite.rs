//! SQLite-backed triple store
//!
//! Terms are normalized into a `terms` table and statements reference them
//! by id, with one index per access path. Inserts are idempotent:
//! re-inserting a stored statement is a no-op.
//!
//! ```ignore
//! use kgmirror::store::{IsolationLevel, LocalStore};
//!
//! let store = LocalStore::open("data/kgmirror.sqlite")?;
//! store.insert_batch(&triples, IsolationLevel::ReadUncommitted)?;
//!
//! // Concurrent observer on the same file
//! let reader = LocalStore::open_reader("data/kgmirror.sqlite")?;
//! println!("{} statements", reader.len()?);
//! ```

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use fnv::FnvHashMap;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, TransactionBehavior};

use super::{IsolationLevel, StoreError, StoreResult};
use crate::term::{Bindings, Datatype, Iri, Term, Triple, Variable};

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on each in-memory term cache
pub const DEFAULT_TERM_CACHE_CAPACITY: usize = 100_000;

const SCHEMA: &str = r#"
    -- 0 = IRI, 1 = plain literal, 2 = language literal, 3 = typed literal, 4 = blank node
    CREATE TABLE IF NOT EXISTS terms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        term_type INTEGER NOT NULL,
        value TEXT NOT NULL,
        extra TEXT NOT NULL DEFAULT '',
        UNIQUE(term_type, value, extra)
    );

    CREATE TABLE IF NOT EXISTS triples (
        subject_id INTEGER NOT NULL REFERENCES terms(id),
        predicate_id INTEGER NOT NULL REFERENCES terms(id),
        object_id INTEGER NOT NULL REFERENCES terms(id),
        PRIMARY KEY (subject_id, predicate_id, object_id)
    ) WITHOUT ROWID;

    CREATE INDEX IF NOT EXISTS idx_triples_po ON triples(predicate_id, object_id);
    CREATE INDEX IF NOT EXISTS idx_triples_os ON triples(object_id, subject_id);
"#;

const COLUMNS: [&str; 3] = ["subject_id", "predicate_id", "object_id"];

/// Connection plus the term caches that are only valid for it
struct Inner {
    conn: Connection,
    /// term -> id, only holds committed terms
    ids: FnvHashMap<Term, i64>,
    /// id -> term
    terms: FnvHashMap<i64, Term>,
}

/// SQLite-backed triple store
pub struct LocalStore {
    inner: Mutex<Inner>,
    read_only: bool,
    /// Both caches are cleared rather than grown past this
    cache_capacity: usize,
}

impl LocalStore {
    /// Open (or create) a writable store at the given path
    ///
    /// Parent directories are created as needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an existing store read-only
    ///
    /// Readers see every committed batch, including those of a run that is
    /// still in progress.
    pub fn open_reader<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self::wrap(conn, true))
    }

    /// Create an in-memory store
    ///
    /// Data is lost when the store is dropped.
    pub fn in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self::wrap(conn, false))
    }

    fn wrap(conn: Connection, read_only: bool) -> Self {
        LocalStore {
            inner: Mutex::new(Inner {
                conn,
                ids: FnvHashMap::default(),
                terms: FnvHashMap::default(),
            }),
            read_only,
            cache_capacity: DEFAULT_TERM_CACHE_CAPACITY,
        }
    }

    /// Bound the term caches; 0 disables caching
    pub fn with_term_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert a batch of statements in a single transaction
    ///
    /// Returns the number of statements that were not already present. On
    /// failure the transaction is rolled back and nothing from the batch is
    /// visible.
    pub fn insert_batch(&self, triples: &[Triple], isolation: IsolationLevel) -> StoreResult<usize> {
        if let Some(t) = triples.iter().find(|t| !t.is_ground()) {
            return Err(StoreError::NonGround(t.to_string()));
        }
        if triples.is_empty() {
            return Ok(0);
        }

        let mut guard = self.lock()?;
        let Inner { conn, ids, terms } = &mut *guard;

        if isolation == IsolationLevel::ReadUncommitted {
            conn.execute_batch("PRAGMA read_uncommitted = 1;")?;
        }
        let behavior = match isolation {
            IsolationLevel::ReadUncommitted => TransactionBehavior::Deferred,
            IsolationLevel::ReadCommitted => TransactionBehavior::Immediate,
            IsolationLevel::Serializable => TransactionBehavior::Exclusive,
        };

        // Ids created inside the transaction are cached only once it commits.
        let mut created: FnvHashMap<Term, i64> = FnvHashMap::default();
        let tx = conn.transaction_with_behavior(behavior)?;
        let mut inserted = 0;
        {
            let mut insert = tx.prepare_cached(
                "INSERT OR IGNORE INTO triples (subject_id, predicate_id, object_id) VALUES (?1, ?2, ?3)",
            )?;
            for triple in triples {
                let s = term_id_or_create(&tx, ids, &mut created, &triple.subject)?;
                let p = term_id_or_create(&tx, ids, &mut created, &triple.predicate)?;
                let o = term_id_or_create(&tx, ids, &mut created, &triple.object)?;
                inserted += insert.execute(params![s, p, o])?;
            }
        }
        tx.commit()?;

        if ids.len() + created.len() > self.cache_capacity {
            ids.clear();
            terms.clear();
        }
        for (term, id) in created.into_iter().take(self.cache_capacity) {
            terms.insert(id, term.clone());
            ids.insert(term, id);
        }
        Ok(inserted)
    }

    /// Evaluate a basic graph pattern
    ///
    /// Every pattern is joined against the statement table in one SQL query;
    /// a variable that occurs more than once must bind the same term
    /// everywhere. Blank nodes in patterns match only themselves.
    pub fn query(&self, patterns: &[Triple]) -> StoreResult<Vec<Bindings>> {
        if patterns.is_empty() {
            return Ok(vec![Bindings::default()]);
        }

        let mut guard = self.lock()?;
        let Inner { conn, ids, terms } = &mut *guard;

        let mut vars: Vec<(Variable, String)> = Vec::new();
        let mut conditions: Vec<String> = Vec::new();
        let mut args: Vec<i64> = Vec::new();

        for (i, pattern) in patterns.iter().enumerate() {
            let positions = [&pattern.subject, &pattern.predicate, &pattern.object];
            for (term, column) in positions.into_iter().zip(COLUMNS) {
                let col = format!("t{}.{}", i, column);
                match term {
                    Term::Variable(v) => {
                        let first = vars.iter().find(|(seen, _)| seen == v).map(|(_, c)| c.clone());
                        match first {
                            Some(first) => conditions.push(format!("{} = {}", col, first)),
                            None => vars.push((v.clone(), col)),
                        }
                    }
                    ground => match find_term_id(conn, ids, ground)? {
                        Some(id) => {
                            conditions.push(format!("{} = ?", col));
                            args.push(id);
                        }
                        // A term that was never stored matches nothing
                        None => return Ok(Vec::new()),
                    },
                }
            }
        }

        let select = if vars.is_empty() {
            "1".to_string()
        } else {
            vars.iter().map(|(_, c)| c.as_str()).collect::<Vec<_>>().join(", ")
        };
        let from = (0..patterns.len())
            .map(|i| format!("triples t{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT DISTINCT {} FROM {}", select, from);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        let rows: Vec<Vec<i64>> = {
            let mut stmt = conn.prepare(&sql)?;
            let width = vars.len();
            let mapped = stmt.query_map(params_from_iter(args.iter()), |row| {
                (0..width).map(|i| row.get::<_, i64>(i)).collect::<Result<Vec<_>, _>>()
            })?;
            mapped.collect::<Result<_, _>>()?
        };

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let mut bindings = Bindings::default();
            for ((var, _), id) in vars.iter().zip(row) {
                bindings.insert(var.clone(), term_by_id(conn, terms, self.cache_capacity, id)?);
            }
            results.push(bindings);
        }
        Ok(results)
    }

    /// Check whether a statement is stored
    pub fn contains(&self, triple: &Triple) -> StoreResult<bool> {
        Ok(!self.query(std::slice::from_ref(triple))?.is_empty())
    }

    /// Distinct IRI subjects of statements with the given predicate
    pub fn subjects_with(&self, predicate: &Iri) -> StoreResult<Vec<Iri>> {
        let s = Variable::new("s");
        let pattern = Triple::new(Term::Variable(s.clone()), Term::Iri(predicate.clone()), Term::var("o"));
        let mut subjects: Vec<Iri> = self
            .query(&[pattern])?
            .into_iter()
            .filter_map(|b| b.get(&s).and_then(|t| t.as_iri()).cloned())
            .collect();
        subjects.sort();
        subjects.dedup();
        Ok(subjects)
    }

    /// Number of stored statements
    pub fn len(&self) -> StoreResult<usize> {
        let guard = self.lock()?;
        let count: i64 = guard.conn.query_row("SELECT COUNT(*) FROM triples", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Get statistics about the store
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let guard = self.lock()?;
        let triple_count: i64 = guard.conn.query_row("SELECT COUNT(*) FROM triples", [], |row| row.get(0))?;
        let term_count: i64 = guard.conn.query_row("SELECT COUNT(*) FROM terms", [], |row| row.get(0))?;
        Ok(StoreStats {
            triple_count: triple_count as usize,
            term_count: term_count as usize,
            term_cache_size: guard.ids.len().max(guard.terms.len()),
        })
    }

    /// Fold the write-ahead log back into the main database file
    pub fn checkpoint(&self) -> StoreResult<()> {
        if self.read_only {
            return Ok(());
        }
        let guard = self.lock()?;
        guard
            .conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .optional()?;
        Ok(())
    }
}

/// Statistics about the local store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of statements
    pub triple_count: usize,
    /// Number of distinct terms
    pub term_count: usize,
    /// Entries in the larger of the two term caches
    pub term_cache_size: usize,
}

/// Storage encoding: (term_type, value, extra)
fn encode(term: &Term) -> StoreResult<(i32, &str, &str)> {
    match term {
        Term::Iri(iri) => Ok((0, iri.as_str(), "")),
        Term::Literal(lit) => Ok(match lit.datatype() {
            Datatype::Plain => (1, lit.value(), ""),
            Datatype::Language(lang) => (2, lit.value(), lang.as_str()),
            Datatype::Typed(dt) => (3, lit.value(), dt.as_str()),
        }),
        Term::BlankNode(b) => Ok((4, b.label(), "")),
        Term::Variable(v) => Err(StoreError::NonGround(v.to_string())),
    }
}

fn decode(term_type: i32, value: String, extra: String) -> StoreResult<Term> {
    match term_type {
        0 => Ok(Term::iri(value)),
        1 => Ok(Term::literal(value)),
        2 => Ok(Term::lang_literal(value, extra)),
        3 => Ok(Term::typed_literal(value, extra)),
        4 => Ok(Term::blank(value)),
        other => Err(StoreError::Serialization(format!("unknown term type {}", other))),
    }
}

/// Look up a term id without creating it
fn find_term_id(conn: &Connection, ids: &FnvHashMap<Term, i64>, term: &Term) -> StoreResult<Option<i64>> {
    if let Some(&id) = ids.get(term) {
        return Ok(Some(id));
    }
    let (term_type, value, extra) = encode(term)?;
    let id = conn
        .prepare_cached("SELECT id FROM terms WHERE term_type = ?1 AND value = ?2 AND extra = ?3")?
        .query_row(params![term_type, value, extra], |row| row.get(0))
        .optional()?;
    Ok(id)
}

fn term_id_or_create(
    conn: &Connection,
    ids: &FnvHashMap<Term, i64>,
    created: &mut FnvHashMap<Term, i64>,
    term: &Term,
) -> StoreResult<i64> {
    if let Some(&id) = created.get(term) {
        return Ok(id);
    }
    let id = match find_term_id(conn, ids, term)? {
        Some(id) => id,
        None => {
            let (term_type, value, extra) = encode(term)?;
            conn.prepare_cached("INSERT INTO terms (term_type, value, extra) VALUES (?1, ?2, ?3)")?
                .execute(params![term_type, value, extra])?;
            conn.last_insert_rowid()
        }
    };
    if !ids.contains_key(term) {
        created.insert(term.clone(), id);
    }
    Ok(id)
}

fn term_by_id(conn: &Connection, terms: &mut FnvHashMap<i64, Term>, capacity: usize, id: i64) -> StoreResult<Term> {
    if let Some(term) = terms.get(&id) {
        return Ok(term.clone());
    }
    let (term_type, value, extra): (i32, String, String) = conn
        .prepare_cached("SELECT term_type, value, extra FROM terms WHERE id = ?1")?
        .query_row(params![id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
    let term = decode(term_type, value, extra)?;
    if terms.len() >= capacity {
        terms.clear();
    }
    if capacity > 0 {
        terms.insert(id, term.clone());
    }
    Ok(term)
}
