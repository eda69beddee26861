use common::{
    codec::{intermediate_name, output_name, partition_records, read_records, write_atomic, write_records},
    KeyValue, MapFn, ReduceFn, TaskDescriptor,
};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Ejecuta una tarea map en un hilo bloqueante:
/// 1. Lee el archivo de entrada completo.
/// 2. Aplica `mapf(nombre, contenido)`.
/// 3. Reparte los registros en n_reduce buckets por hash(key).
/// 4. Escribe cada bucket no vacío en `<work_dir>/mr-<map>-<partición>`.
///
/// Devuelve (partición, ubicación) de cada archivo escrito.
pub fn run_map(task: &TaskDescriptor, mapf: MapFn, work_dir: &Path) -> io::Result<Vec<(u32, String)>> {
    let input_path = task.input_path.as_deref().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("tarea map {} sin archivo de entrada", task.id),
        )
    })?;

    // bytes que no son UTF-8 (p. ej. Latin-1) se reemplazan, no cortan la tarea
    let bytes = fs::read(input_path)?;
    let contents = String::from_utf8_lossy(&bytes);
    let records = mapf(input_path, &contents);

    let mut written = Vec::new();
    for (pid, bucket) in partition_records(records, task.n_reduce).iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        let partition = pid as u32;
        let path = work_dir.join(intermediate_name(task.id, partition));
        write_records(&path, bucket)?;
        written.push((partition, path.to_string_lossy().to_string()));
    }

    Ok(written)
}

/// Ordena por clave (orden estable), agrupa claves iguales consecutivas
/// y llama a `reducef` una vez por grupo.
pub fn reduce_sorted(mut records: Vec<KeyValue>, reducef: ReduceFn) -> Vec<(String, String)> {
    records.sort_by(|a, b| a.key.cmp(&b.key));

    records
        .chunk_by(|a, b| a.key == b.key)
        .map(|group| {
            let key = &group[0].key;
            let values: Vec<String> = group.iter().map(|kv| kv.value.clone()).collect();
            (key.clone(), reducef(key, &values))
        })
        .collect()
}

/// Ejecuta una tarea reduce sobre las ubicaciones que registraron los maps
/// y escribe `<work_dir>/mr-out-<partición>` con una línea "clave valor" por clave.
pub fn run_reduce(
    partition: u32,
    locations: &[String],
    reducef: ReduceFn,
    work_dir: &Path,
) -> io::Result<PathBuf> {
    let mut records = Vec::new();
    for location in locations {
        records.extend(read_records(location)?);
    }

    let lines = reduce_sorted(records, reducef);

    let path = work_dir.join(output_name(partition));
    write_atomic(&path, |w| {
        for (key, value) in &lines {
            writeln!(w, "{} {}", key, value)?;
        }
        Ok(())
    })?;

    Ok(path)
}
