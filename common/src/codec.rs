use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;
use tracing::warn;

/// Par clave/valor que emite la función map y consume la función reduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/* =========================
   Hash y particionado
   ========================= */

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// FNV-1a de 32 bits sobre los bytes de la clave, recortado a 31 bits.
/// Es el mismo valor en cualquier proceso y en cualquier máquina.
pub fn ihash(key: &str) -> u32 {
    let mut h = FNV32_OFFSET;
    for b in key.as_bytes() {
        h ^= u32::from(*b);
        h = h.wrapping_mul(FNV32_PRIME);
    }
    h & 0x7fff_ffff
}

/// Partición de destino de una clave: ihash(key) % n_reduce.
pub fn partition_for(key: &str, n_reduce: u32) -> u32 {
    ihash(key) % n_reduce.max(1)
}

/// Reparte los registros en `n_reduce` buckets, conservando el orden relativo.
pub fn partition_records(records: Vec<KeyValue>, n_reduce: u32) -> Vec<Vec<KeyValue>> {
    let n = n_reduce.max(1);
    let mut buckets: Vec<Vec<KeyValue>> = (0..n).map(|_| Vec::new()).collect();
    for kv in records {
        let pid = partition_for(&kv.key, n) as usize;
        buckets[pid].push(kv);
    }
    buckets
}

/* =========================
   Nombres de archivos
   ========================= */

/// Nombre del archivo intermedio para (map, partición).
pub fn intermediate_name(map_id: usize, partition: u32) -> String {
    format!("mr-{}-{}", map_id, partition)
}

/// Nombre del archivo de salida de una partición reduce.
pub fn output_name(partition: u32) -> String {
    format!("mr-out-{}", partition)
}

/* =========================
   Escritura / lectura JSONL
   ========================= */

/// Escribe registros como JSON lines (un objeto por línea).
pub struct RecordWriter<W: Write> {
    inner: W,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn append(&mut self, kv: &KeyValue) -> io::Result<()> {
        serde_json::to_writer(&mut self.inner, kv)?;
        self.inner.write_all(b"\n")
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Lee registros JSON lines de forma incremental.
/// Se detiene en el primer registro malformado (p. ej. una cola truncada)
/// sin devolver error; los errores de E/S sí se propagan.
pub struct RecordReader<R: BufRead> {
    lines: io::Lines<R>,
    stopped: bool,
    malformed: bool,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            lines: inner.lines(),
            stopped: false,
            malformed: false,
        }
    }

    /// true si la lectura se cortó por un registro inválido.
    pub fn hit_malformed(&self) -> bool {
        self.malformed
    }

    fn stop_malformed(&mut self) -> Option<io::Result<KeyValue>> {
        self.stopped = true;
        self.malformed = true;
        None
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = io::Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.stopped {
            let line = match self.lines.next()? {
                Ok(l) => l,
                // bytes cortados a mitad de un carácter UTF-8
                Err(e) if e.kind() == io::ErrorKind::InvalidData => return self.stop_malformed(),
                Err(e) => {
                    self.stopped = true;
                    return Some(Err(e));
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            return match serde_json::from_str::<KeyValue>(&line) {
                Ok(kv) => Some(Ok(kv)),
                Err(_) => self.stop_malformed(),
            };
        }
        None
    }
}

/// Lee un archivo intermedio completo.
pub fn read_records(path: &str) -> io::Result<Vec<KeyValue>> {
    let file = File::open(path)?;
    let mut reader = RecordReader::new(BufReader::new(file));

    let mut out = Vec::new();
    for kv in reader.by_ref() {
        out.push(kv?);
    }

    if reader.hit_malformed() {
        warn!(
            "registro malformado en {}, se usan los {} registros anteriores",
            path,
            out.len()
        );
    }
    Ok(out)
}

/// Escribe `path` de forma atómica: primero un temporal en el mismo directorio,
/// después rename. Un lector nunca ve un archivo a medio escribir.
pub fn write_atomic<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Escribe un archivo intermedio con todos los registros de un bucket.
pub fn write_records(path: &Path, records: &[KeyValue]) -> io::Result<()> {
    write_atomic(path, |w| {
        let mut rw = RecordWriter::new(w);
        for kv in records {
            rw.append(kv)?;
        }
        rw.finish()?;
        Ok(())
    })
}
