use clap::Parser;
use glob::glob;
use std::{collections::HashSet, net::SocketAddr, time::Duration};

use common::endpoint;

#[derive(Parser, Debug, Clone)]
#[command(name = "coordinator")]
#[command(about = "Coordinador map/reduce: reparte tareas a los workers hasta terminar el job")]
pub struct Config {
    /// Archivos de entrada, uno por tarea map (se aceptan patrones glob)
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Cantidad de particiones / tareas reduce
    #[arg(long, default_value_t = 10)]
    pub n_reduce: u32,

    /// Dirección de escucha; por defecto 127.0.0.1 con un puerto derivado del usuario
    #[arg(long)]
    pub addr: Option<SocketAddr>,

    /// Segundos antes de devolver a Idle una tarea sin reporte
    #[arg(long, env = "MR_TASK_TIMEOUT_SECS", default_value_t = 10)]
    pub task_timeout_secs: u64,

    /// Tiempo que se sigue respondiendo "done" antes de apagar el servidor
    #[arg(long, default_value_t = 2000)]
    pub shutdown_grace_ms: u64,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        self.addr.unwrap_or_else(endpoint::default_bind_addr)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn input_files(&self) -> Vec<String> {
        expand_inputs(&self.inputs)
    }
}

/// Expande los patrones de entrada:
/// - cada patrón glob aporta sus archivos en orden alfabético
/// - un patrón sin matches (o inválido) se usa tal cual, el worker fallará al abrirlo
/// - se eliminan repetidos conservando la primera aparición
pub fn expand_inputs(patterns: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for pattern in patterns {
        let mut matched: Vec<String> = match glob(pattern) {
            Ok(paths) => paths
                .flatten()
                .filter(|p| p.is_file())
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        };

        if matched.is_empty() {
            matched.push(pattern.clone());
        }

        for file in matched {
            if seen.insert(file.clone()) {
                out.push(file);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn expand_inputs_expande_globs_y_deduplica() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.csv"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let base = dir.path().to_string_lossy().to_string();

        let patterns = vec![
            format!("{}/*.txt", base),
            format!("{}/a.txt", base),
            format!("{}/no_existe.txt", base),
        ];
        let files = expand_inputs(&patterns);

        assert_eq!(
            files,
            vec![
                format!("{}/a.txt", base),
                format!("{}/b.txt", base),
                format!("{}/no_existe.txt", base),
            ]
        );
    }

    #[test]
    fn config_valores_por_defecto() {
        let cfg = Config::try_parse_from(["coordinator", "pg-1.txt", "pg-2.txt"]).unwrap();
        assert_eq!(cfg.inputs, vec!["pg-1.txt", "pg-2.txt"]);
        assert_eq!(cfg.n_reduce, 10);
        assert_eq!(cfg.shutdown_grace(), Duration::from_secs(2));
        assert_eq!(cfg.bind_addr(), endpoint::default_bind_addr());
    }

    #[test]
    fn config_acepta_flags() {
        let cfg = Config::try_parse_from([
            "coordinator",
            "--n-reduce",
            "3",
            "--addr",
            "127.0.0.1:4000",
            "--task-timeout-secs",
            "5",
            "in.txt",
        ])
        .unwrap();
        assert_eq!(cfg.n_reduce, 3);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:4000".parse().unwrap());
        assert_eq!(cfg.task_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn config_exige_al_menos_un_input() {
        assert!(Config::try_parse_from(["coordinator"]).is_err());
    }
}
